//! Windows installer packages built with MSBuild and `setup.py bdist_msi`.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::helper::{
    python_version, remove_unless, source_directory, BuildContext, BuildError, BuildHelper,
};
use crate::download_helpers::ZlibDownloadHelper;
use crate::sources::{SourceHelper, SourcePackageHelper};
use crate::util::fs::{glob_paths, move_file, read_to_string, remove_path, write_string};
use crate::util::process::{find_python, ProcessBuilder};

const PATCH_EXE_PATHS: &[&str] = &[
    r"C:\GnuWin\bin\patch.exe",
    r"C:\GnuWin32\bin\patch.exe",
    r"C:\Program Files (x86)\GnuWin\bin\patch.exe",
    r"C:\Program Files (x86)\GnuWin32\bin\patch.exe",
    r"C:\ProgramData\chocolatey\bin\patch.exe",
];

/// Visual Studio versions by the environment variable that identifies
/// them. VS90COMNTOOLS is checked last since the build exports it for the
/// newer versions.
const VISUAL_STUDIO_VERSIONS: &[(&str, &str)] = &[
    ("VS150COMNTOOLS", "2017"),
    ("VS140COMNTOOLS", "2015"),
    ("VS120COMNTOOLS", "2013"),
    ("VS110COMNTOOLS", "2012"),
    ("VS100COMNTOOLS", "2010"),
    ("VS90COMNTOOLS", "2008"),
    ("VCINSTALLDIR", "python"),
];

/// How the msi is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsiFlavor {
    /// MSBuild of the `msvscpp` solution followed by the Python bindings.
    ConfigureMake {
        /// Visual Studio version, such as "2017" or "python"
        visual_studio: String,
    },
    /// `setup.py bdist_msi`
    SetupPy,
}

/// Builds msi packages.
#[derive(Debug)]
pub struct MsiBuildHelper {
    context: BuildContext,
    flavor: MsiFlavor,
    architecture: String,
}

impl MsiBuildHelper {
    pub fn new(context: BuildContext, flavor: MsiFlavor) -> Self {
        let architecture = context
            .architecture
            .clone()
            .unwrap_or_else(|| default_architecture().to_string());

        MsiBuildHelper {
            context,
            flavor,
            architecture,
        }
    }

    /// Helper for configure_make projects, using the Visual Studio version
    /// of the environment.
    pub fn configure_make(context: BuildContext) -> Result<Self, BuildError> {
        let visual_studio =
            visual_studio_version(|name| std::env::var(name).ok()).ok_or(BuildError::MissingVisualStudio)?;
        Ok(Self::new(context, MsiFlavor::ConfigureMake { visual_studio }))
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    fn python_version_suffix(&self) -> String {
        format!("py{}", python_version(&self.context))
    }

    /// msi name and version of a setup.py project.
    fn setup_py_information(&self, source: &mut dyn SourceHelper) -> (String, Option<String>) {
        let definition = &self.context.definition;
        let name = definition
            .msi_name
            .clone()
            .or_else(|| definition.setup_name.clone())
            .unwrap_or_else(|| source.project_name().to_string());

        let version = source.project_version().map(|version| {
            if source.project_name() == "dfvfs" {
                format!("{}.1", version)
            } else {
                version
            }
        });
        (name, version)
    }

    /// Suffix of setup.py built msi files.
    fn setup_py_suffix(&self, name: &str) -> String {
        if self.context.definition.architecture_dependent && name != "coverage" {
            format!("-{}", self.python_version_suffix())
        } else {
            String::new()
        }
    }

    fn apply_patches(&self, source_directory: &Path) -> bool {
        let Some(patch_exe) = PATCH_EXE_PATHS.iter().map(Path::new).find(|path| path.exists()) else {
            tracing::error!("Unable to find patch.exe");
            return false;
        };

        for patch in &self.context.definition.patches {
            let path = self.context.data_path.join("patches").join(patch);
            if !path.exists() {
                tracing::warn!("Missing patch file: {}", path.display());
                continue;
            }

            let applied = ProcessBuilder::new(patch_exe)
                .args(["--force", "--binary", "--input"])
                .arg(&path)
                .cwd(source_directory)
                .run();
            if !applied {
                return false;
            }
        }
        true
    }

    fn run_prebuild_script(&self, script: &str, source_directory: &Path) -> bool {
        let path = self.context.data_path.join("msi_prebuild").join(script);
        let command = match path.extension().and_then(|extension| extension.to_str()) {
            Some("ps1") => ProcessBuilder::new("Powershell.exe")
                .args(["-ExecutionPolicy", "ByPass"])
                .arg(&path),
            Some("py") => ProcessBuilder::new(find_python()).arg(&path),
            _ => {
                tracing::error!("Unsupported prebuild script: {}", script);
                return false;
            }
        };
        command.cwd(source_directory).run()
    }

    /// Move the single `dist/{name}-*.msi` into the build directory.
    fn move_msi(&self, directory: &Path, name: &str) -> Result<bool> {
        let pattern = format!("dist/{}-*.msi", glob::Pattern::escape(name));
        let paths = glob_paths(directory, &pattern)?;
        let [path] = paths.as_slice() else {
            tracing::error!("Unable to find MSI file: {}.", directory.join(&pattern).display());
            return Ok(false);
        };

        let Some(file_name) = path.file_name() else {
            return Ok(false);
        };
        let destination = self.context.build_directory.join(file_name);
        if destination.exists() {
            tracing::warn!("MSI file already exists.");
        } else {
            tracing::info!("Moving: {}", path.display());
            move_file(path, &destination)?;
        }
        Ok(true)
    }

    fn build_setup_py(&self, source: &mut dyn SourceHelper, source_directory: &Path) -> Result<bool> {
        if let Some(ref script) = self.context.definition.msi_prebuild {
            if !self.run_prebuild_script(script, source_directory) {
                return Ok(false);
            }
        }

        let mut command = ProcessBuilder::new(find_python())
            .args(["setup.py", "bdist_msi"])
            .cwd(source_directory)
            .log_to(self.context.log_path());

        if source.project_name() == "pycrypto" {
            if let Ok(vc_install_dir) = std::env::var("VCINSTALLDIR") {
                let include_path = Path::new(&vc_install_dir)
                    .join("Tools")
                    .join("MSVC")
                    .join("14.14.26428")
                    .join("include")
                    .join("stdint.h");
                command = command.env("CL", format!("-FI\"{}\"", include_path.display()));
            }
        }

        if !command.run() {
            return Ok(false);
        }

        let (name, _) = self.setup_py_information(source);
        self.move_msi(source_directory, &name)
    }

    fn build_configure_make(
        &self,
        visual_studio: &str,
        source: &mut dyn SourceHelper,
        source_directory: &Path,
    ) -> Result<bool> {
        let module_name = source_module_name(source_directory);

        if !source_directory.join("setup.py").exists() {
            return self.build_msbuild(visual_studio, source, source_directory);
        }

        let Some(version) = source.project_version() else {
            return Ok(false);
        };
        let msi_filename = format!(
            "{}-python-{}.1.{}-{}.msi",
            module_name,
            version,
            self.architecture,
            self.python_version_suffix()
        );
        if source_directory.join("dist").join(msi_filename).exists() {
            tracing::warn!("MSI file already exists.");
            return Ok(true);
        }

        if !self.run_bdist_msi(visual_studio, source_directory) {
            return Ok(false);
        }
        self.move_msi(source_directory, &module_name)
    }

    fn build_msbuild(
        &self,
        visual_studio: &str,
        source: &mut dyn SourceHelper,
        source_directory: &Path,
    ) -> Result<bool> {
        let framework = match visual_studio {
            "2008" => Some("v3.5"),
            "2010" | "2012" | "2013" | "2015" | "2017" => Some("v4.0.30319"),
            _ => None,
        };
        let msbuild = framework
            .map(|framework| {
                PathBuf::from(r"C:\Windows\Microsoft.NET\Framework")
                    .join(framework)
                    .join("MSBuild.exe")
            })
            .filter(|path| path.exists());
        let Some(msbuild) = msbuild else {
            tracing::error!("Unable to find MSBuild.exe");
            return Ok(false);
        };

        if let Some(variable) = visual_studio_variable(visual_studio) {
            if std::env::var(variable).map(|value| value.is_empty()).unwrap_or(true) {
                tracing::error!("Missing {} environment variable.", variable);
                return Ok(false);
            }
        }

        let parent_directory = source_directory.parent().unwrap_or(Path::new("."));
        for dependency in ["zlib", "dokan"] {
            let project_file = source_directory
                .join("msvscpp")
                .join(dependency)
                .join(format!("{}.vcproj", dependency));
            if project_file.exists() && !parent_directory.join(dependency).exists() {
                tracing::error!("Missing dependency: {}.", dependency);
                return Ok(false);
            }
        }

        let winver = if visual_studio == "2008" || source.project_name() == "libbde" {
            "0x0501"
        } else {
            "0x0600"
        };
        let mut config_path = source_directory.join("common").join("config_winapi.h");
        if !config_path.exists() {
            config_path = source_directory.join("common").join("config_msc.h");
        }
        if config_path.exists() {
            patch_winver(&config_path, winver)?;
        }

        let platform = std::env::var("Platform")
            .ok()
            .filter(|value| !value.is_empty())
            .or_else(|| std::env::var("TARGET_CPU").ok());
        let platform = match platform.as_deref() {
            None | Some("") | Some("x86") => "Win32".to_string(),
            Some(platform) => platform.to_string(),
        };
        if platform != "Win32" && platform != "x64" {
            tracing::error!("Unsupported build platform: {}", platform);
            return Ok(false);
        }
        if visual_studio == "2008" && platform == "x64" {
            tracing::error!("Unsupported 64-build platform for vs2008.");
            return Ok(false);
        }

        let solutions = glob_paths(source_directory, "msvscpp/*.sln")?;
        let [solution] = solutions.as_slice() else {
            tracing::error!("Unable to find Visual Studio solution file");
            return Ok(false);
        };

        let built = ProcessBuilder::new(&msbuild)
            .args([
                "/p:Configuration=Release".to_string(),
                format!("/p:Platform={}", platform),
                "/noconsolelogger".to_string(),
                "/fileLogger".to_string(),
                "/maxcpucount".to_string(),
            ])
            .arg(solution)
            .cwd(source_directory)
            .run();
        if !built {
            return Ok(false);
        }

        let library_name = source_module_name(source_directory);
        let python_module = format!("py{}", library_name.get(3..).unwrap_or_default());
        let python_module_directory = source_directory.join(&python_module);
        if python_module_directory.join("dist").exists() {
            return Ok(true);
        }

        if !self.run_bdist_msi(visual_studio, &python_module_directory) {
            return Ok(false);
        }
        self.move_msi(&python_module_directory, &python_module)
    }

    /// Run `setup.py bdist_msi` with VS90COMNTOOLS pointing at the
    /// Visual Studio in use.
    fn run_bdist_msi(&self, visual_studio: &str, directory: &Path) -> bool {
        let mut command = ProcessBuilder::new(find_python())
            .args(["setup.py", "bdist_msi"])
            .cwd(directory)
            .append_to_log(self.context.log_path());

        if visual_studio != "2008" {
            if let Some(value) = visual_studio_variable(visual_studio).and_then(|name| std::env::var(name).ok()) {
                command = command.env("VS90COMNTOOLS", value);
            }
        }
        command.run()
    }

    fn setup_zlib(&self) -> Result<bool> {
        let Some(ref client) = self.context.http_client else {
            tracing::error!("Unable to download zlib without a HTTP client");
            return Ok(false);
        };

        let download_helper = ZlibDownloadHelper::new("http://www.zlib.net", client.clone())?;
        let mut source = SourcePackageHelper::new(
            "zlib",
            None,
            &self.context.downloads_directory,
            &self.context.build_directory,
            Box::new(download_helper),
        );

        let Some(source_directory) = source.create()? else {
            tracing::error!("Extraction of source package of: zlib failed");
            return Ok(false);
        };

        let zlib_directory = self.context.build_directory.join("zlib");
        if !zlib_directory.exists() {
            std::fs::rename(&source_directory, &zlib_directory)?;
        }
        Ok(true)
    }
}

impl BuildHelper for MsiBuildHelper {
    fn context(&self) -> &BuildContext {
        &self.context
    }

    fn check_build_dependencies(&self) -> Vec<String> {
        let dependencies = &self.context.definition.build_dependencies;
        match self.flavor {
            MsiFlavor::ConfigureMake { .. } => {
                let mut missing = Vec::new();
                for name in dependencies {
                    match name.as_str() {
                        "zlib" => match self.setup_zlib() {
                            Ok(true) => {}
                            Ok(false) => tracing::warn!("Unable to set up build dependency: zlib"),
                            Err(e) => {
                                tracing::warn!("Unable to set up build dependency: zlib: {:#}", e)
                            }
                        },
                        "fuse" | "zeromq" => {
                            tracing::debug!("Build dependency: {} is not set up automatically", name)
                        }
                        "libcrypto" => {}
                        _ => missing.push(name.clone()),
                    }
                }
                missing
            }
            MsiFlavor::SetupPy => dependencies
                .iter()
                .filter(|name| *name != "sqlite")
                .cloned()
                .collect(),
        }
    }

    fn check_build_required(&self, source: &mut dyn SourceHelper) -> bool {
        let filename = match self.flavor {
            MsiFlavor::ConfigureMake { .. } => {
                let Some(version) = source.project_version() else {
                    return true;
                };
                format!(
                    "{}-python-{}.1.{}-{}.msi",
                    source.project_name(),
                    version,
                    self.architecture,
                    self.python_version_suffix()
                )
            }
            MsiFlavor::SetupPy => {
                let (name, version) = self.setup_py_information(source);
                let Some(version) = version else {
                    return true;
                };
                format!(
                    "{}-{}.{}{}.msi",
                    name,
                    msi_version(&version),
                    self.architecture,
                    self.setup_py_suffix(&name)
                )
            }
        };
        !self.context.build_directory.join(filename).exists()
    }

    fn build(&self, source: &mut dyn SourceHelper) -> Result<bool> {
        let Some(source_package) = source.source_package_path()? else {
            tracing::info!("Missing source package of: {}", source.project_name());
            return Ok(false);
        };
        let source_directory = source_directory(source)?;
        let package_filename = source_package
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match self.flavor {
            MsiFlavor::ConfigureMake { ref visual_studio } => tracing::info!(
                "Building: {} with Visual Studio {}",
                package_filename,
                visual_studio
            ),
            MsiFlavor::SetupPy => tracing::info!("Building msi of: {}", package_filename),
        }

        if !self.context.definition.patches.is_empty() && !self.apply_patches(&source_directory) {
            return Ok(false);
        }

        match self.flavor {
            MsiFlavor::ConfigureMake { ref visual_studio } => {
                self.build_configure_make(visual_studio, source, &source_directory)
            }
            MsiFlavor::SetupPy => self.build_setup_py(source, &source_directory),
        }
    }

    fn clean(&self, source: &mut dyn SourceHelper) -> Result<()> {
        let build_directory = &self.context.build_directory;

        match self.flavor {
            MsiFlavor::ConfigureMake { .. } => {
                let Some(version) = source.project_version() else {
                    return Ok(());
                };
                let name = source.project_name();
                let suffix = self.python_version_suffix();
                let module = format!("py{}", name.get(3..).unwrap_or_default());

                remove_unless(
                    build_directory,
                    &[format!("{}-*.1.{}-{}.msi", module, self.architecture, suffix)],
                    &format!(
                        "{}-.*{}.1.{}-{}",
                        regex::escape(&module),
                        regex::escape(&version),
                        regex::escape(&self.architecture),
                        regex::escape(&suffix)
                    ),
                )?;
                remove_unless(
                    build_directory,
                    &[format!("{}-python-*.1.{}-{}.msi", name, self.architecture, suffix)],
                    &format!(
                        "{}-python-.*{}.1.{}-{}.msi",
                        regex::escape(name),
                        regex::escape(&version),
                        regex::escape(&self.architecture),
                        regex::escape(&suffix)
                    ),
                )
            }
            MsiFlavor::SetupPy => {
                for name in ["build", "dist"] {
                    let path = build_directory.join(name);
                    if path.exists() {
                        remove_path(&path)?;
                    }
                }

                let (name, version) = self.setup_py_information(source);
                let Some(version) = version else {
                    return Ok(());
                };
                let version = msi_version(&version);
                let suffix = self.setup_py_suffix(&name);

                remove_unless(
                    build_directory,
                    &[format!(
                        "{}-*.{}{}.msi",
                        glob::Pattern::escape(&name),
                        self.architecture,
                        suffix
                    )],
                    &format!(
                        "{}-.*{}.{}{}.msi",
                        regex::escape(&name),
                        regex::escape(&version),
                        regex::escape(&self.architecture),
                        regex::escape(&suffix)
                    ),
                )
            }
        }
    }
}

/// Architecture name used in msi file names for the pointer width of the
/// build.
pub fn default_architecture() -> &'static str {
    if cfg!(target_pointer_width = "64") {
        "win-amd64"
    } else {
        "win32"
    }
}

/// Visual Studio version of the first set environment variable.
pub fn visual_studio_version<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    VISUAL_STUDIO_VERSIONS
        .iter()
        .find(|(variable, _)| lookup(variable).is_some())
        .map(|(_, version)| version.to_string())
}

fn visual_studio_variable(version: &str) -> Option<&'static str> {
    VISUAL_STUDIO_VERSIONS
        .iter()
        .find(|(_, candidate)| *candidate == version)
        .map(|(variable, _)| *variable)
}

/// Version as accepted in msi file names.
///
/// MSI needs at least two and at most three components and does not
/// accept a `-`.
pub fn msi_version(version: &str) -> String {
    if !version.contains('.') {
        format!("{}.1", version)
    } else if version.split('.').count() == 4 {
        version
            .rsplit_once('.')
            .map(|(head, _)| head.to_string())
            .unwrap_or_else(|| version.to_string())
    } else if let Some((head, _)) = version.rsplit_once('-') {
        head.to_string()
    } else {
        version.to_string()
    }
}

/// Name part of a `{name}-{version}` source directory.
fn source_module_name(source_directory: &Path) -> String {
    let directory_name = source_directory
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match directory_name.split_once('-') {
        Some((name, _)) => name.to_string(),
        None => directory_name,
    }
}

/// Define WINVER right after the `#define _CONFIG_` line, unless it is
/// already defined there.
pub fn patch_winver(config_path: &Path, winver: &str) -> Result<()> {
    let content = read_to_string(config_path)?;
    let define = format!("#define WINVER {}", winver);

    let mut output = String::with_capacity(content.len() + define.len() + 2);
    let mut after_config = false;
    let mut done = false;

    for line in content.lines() {
        let line = line.trim_end();
        if after_config && !done {
            if !line.starts_with(&define) {
                output.push_str(&define);
                output.push_str("\n\n");
            }
            done = true;
        } else if !done && line.starts_with("#define _CONFIG_") {
            after_config = true;
        }
        output.push_str(line);
        output.push('\n');
    }

    write_string(config_path, &output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProjectDefinition;
    use crate::test_support::FakeSourceHelper;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn setup_py_helper(tmp: &TempDir, definition: ProjectDefinition) -> MsiBuildHelper {
        let context = BuildContext::new(definition, tmp.path().join("data"), tmp.path())
            .with_architecture("win32")
            .with_python_version("3.12");
        MsiBuildHelper::new(context, MsiFlavor::SetupPy)
    }

    #[test]
    fn test_msi_version() {
        assert_eq!(msi_version("20190517"), "20190517.1");
        assert_eq!(msi_version("1.2.3.4"), "1.2.3");
        assert_eq!(msi_version("1.2.3-4"), "1.2.3");
        assert_eq!(msi_version("1.2.3"), "1.2.3");
    }

    #[test]
    fn test_visual_studio_version() {
        let env: HashMap<&str, &str> =
            HashMap::from([("VS90COMNTOOLS", "C:\\vs9"), ("VS140COMNTOOLS", "C:\\vs14")]);
        let lookup = |name: &str| env.get(name).map(|value| value.to_string());
        assert_eq!(visual_studio_version(lookup), Some("2015".to_string()));

        assert_eq!(visual_studio_version(|_| None), None);
    }

    #[test]
    fn test_check_build_dependencies() {
        let tmp = TempDir::new().unwrap();
        let helper = setup_py_helper(&tmp, ProjectDefinition::new("dfdatetime"));
        assert!(helper.check_build_dependencies().is_empty());

        let mut definition = ProjectDefinition::new("pysqlite");
        definition.build_dependencies = vec!["sqlite".to_string(), "zlib".to_string()];
        let helper = setup_py_helper(&tmp, definition);
        assert_eq!(helper.check_build_dependencies(), vec!["zlib".to_string()]);
    }

    #[test]
    fn test_check_build_required() {
        let tmp = TempDir::new().unwrap();
        let context = BuildContext::new(ProjectDefinition::new("dfdatetime"), tmp.path(), tmp.path())
            .with_architecture("all");
        let helper = MsiBuildHelper::new(context, MsiFlavor::SetupPy);
        let mut source = FakeSourceHelper::new("dfdatetime", "20190517");

        assert!(helper.check_build_required(&mut source));
        fs::write(tmp.path().join("dfdatetime-20190517.1.all.msi"), "").unwrap();
        assert!(!helper.check_build_required(&mut source));
    }

    #[test]
    fn test_check_build_required_architecture_dependent() {
        let tmp = TempDir::new().unwrap();
        let mut definition = ProjectDefinition::new("pytsk3");
        definition.architecture_dependent = true;
        let helper = setup_py_helper(&tmp, definition);
        let mut source = FakeSourceHelper::new("pytsk3", "20240101");

        fs::write(tmp.path().join("pytsk3-20240101.1.win32-py3.12.msi"), "").unwrap();
        assert!(!helper.check_build_required(&mut source));
    }

    #[test]
    fn test_clean() {
        let tmp = TempDir::new().unwrap();
        let helper = setup_py_helper(&tmp, ProjectDefinition::new("dfdatetime"));
        fs::write(tmp.path().join("dfdatetime-20180101.1.win32.msi"), "").unwrap();
        fs::write(tmp.path().join("dfdatetime-20190517.1.win32.msi"), "").unwrap();

        let mut source = FakeSourceHelper::new("dfdatetime", "20190517");
        helper.clean(&mut source).unwrap();

        assert!(!tmp.path().join("dfdatetime-20180101.1.win32.msi").exists());
        assert!(tmp.path().join("dfdatetime-20190517.1.win32.msi").exists());
    }

    #[test]
    fn test_check_build_required_configure_make() {
        let tmp = TempDir::new().unwrap();
        let context = BuildContext::new(ProjectDefinition::new("libbde"), tmp.path(), tmp.path())
            .with_architecture("win32")
            .with_python_version("3.12");
        let helper = MsiBuildHelper::new(
            context,
            MsiFlavor::ConfigureMake {
                visual_studio: "2017".to_string(),
            },
        );
        let mut source = FakeSourceHelper::new("libbde", "20240101");

        assert!(helper.check_build_required(&mut source));
        fs::write(
            tmp.path().join("libbde-python-20240101.1.win32-py3.12.msi"),
            "",
        )
        .unwrap();
        assert!(!helper.check_build_required(&mut source));
    }

    #[test]
    fn test_patch_winver() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config_winapi.h");
        fs::write(
            &path,
            "#if !defined( _CONFIG_WINAPI_H )\n#define _CONFIG_WINAPI_H\n\n#endif\n",
        )
        .unwrap();

        patch_winver(&path, "0x0600").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "#if !defined( _CONFIG_WINAPI_H )\n#define _CONFIG_WINAPI_H\n#define WINVER 0x0600\n\n\n#endif\n"
        );

        patch_winver(&path, "0x0600").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn test_source_module_name() {
        assert_eq!(source_module_name(Path::new("build/libbde-20240101")), "libbde");
        assert_eq!(source_module_name(Path::new("zlib")), "zlib");
    }
}
