//! Debian packages built with dpkg-buildpackage or debuild.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::helper::{
    filename_safe_version, machine, package_installed, remove_older_source_directories,
    remove_older_source_packages, remove_unless, source_directory, BuildContext, BuildHelper,
};
use crate::core::BuildSystem;
use crate::generators::{DpkgBuildConfiguration, DpkgBuildFilesGenerator};
use crate::sources::archive::zip_to_tar_gz;
use crate::sources::SourceHelper;
use crate::util::config::DEFAULT_DISTRIBUTION;
use crate::util::fs::{copy_dir_all, copy_file, glob_paths, remove_path};
use crate::util::process::{find_python, ProcessBuilder};

/// Packages needed to build any dpkg package.
const BUILD_DEPENDENCIES: &[&str] = &[
    "git",
    "build-essential",
    "autotools-dev",
    "autoconf",
    "automake",
    "autopoint",
    "dh-autoreconf",
    "libtool",
    "gettext",
    "flex",
    "byacc",
    "debhelper",
    "devscripts",
    "dpkg-dev",
    "fakeroot",
    "quilt",
    "python3-all",
    "python3-all-dev",
    "python3-setuptools",
];

/// dpkg name of a build dependency.
pub fn build_dependency_package_name(name: &str) -> &str {
    match name {
        "bzip2" => "libbz2-dev",
        "fuse" => "libfuse-dev",
        "libcrypto" => "libssl-dev",
        "liblzma" => "liblzma-dev",
        "sqlite" => "libsqlite3-dev",
        "zeromq" => "libzmq3-dev",
        "zlib" => "zlib1g-dev",
        _ => name,
    }
}

/// How the `debian/rules` of the project build it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpkgFlavor {
    /// autotools with dh
    ConfigureMake,
    /// Python with dh-python and pybuild
    Pybuild,
}

/// Whether binary packages or a source package for a PPA are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpkgPackageKind {
    Binary,
    Source,
}

/// Builds dpkg packages.
#[derive(Debug)]
pub struct DpkgBuildHelper {
    context: BuildContext,
    flavor: DpkgFlavor,
    kind: DpkgPackageKind,
    architecture: String,
    distribution: String,
    version_suffix: String,
    build_host_distribution: Option<String>,
}

impl DpkgBuildHelper {
    pub fn new(context: BuildContext, flavor: DpkgFlavor, kind: DpkgPackageKind) -> Self {
        let (architecture, distribution, version_suffix) = match kind {
            DpkgPackageKind::Binary => {
                let architecture = match context.architecture {
                    Some(ref architecture) => architecture.clone(),
                    None if flavor == DpkgFlavor::Pybuild
                        && !context.definition.architecture_dependent =>
                    {
                        "all".to_string()
                    }
                    None => dpkg_architecture(machine()).to_string(),
                };
                (architecture, String::new(), String::new())
            }
            DpkgPackageKind::Source => (
                "source".to_string(),
                context
                    .distribution
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DISTRIBUTION.to_string()),
                context.version_suffix.clone(),
            ),
        };

        DpkgBuildHelper {
            context,
            flavor,
            kind,
            architecture,
            distribution,
            version_suffix,
            build_host_distribution: build_host_distribution(),
        }
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    pub fn distribution(&self) -> &str {
        &self.distribution
    }

    fn scripts(&self) -> (&'static str, &'static str) {
        match self.kind {
            DpkgPackageKind::Binary => ("prep-dpkg.sh", "post-dpkg.sh"),
            DpkgPackageKind::Source => ("prep-dpkg-source.sh", "post-dpkg-source.sh"),
        }
    }

    /// Package name and filename safe version of the project.
    fn package_information(&self, source: &mut dyn SourceHelper) -> (String, Option<String>) {
        let version = source
            .project_version()
            .map(|version| filename_safe_version(&version).to_string());

        let name = match self.flavor {
            DpkgFlavor::ConfigureMake => source.project_name().to_string(),
            DpkgFlavor::Pybuild => match self.context.definition.dpkg_name {
                Some(ref dpkg_name) => dpkg_name.clone(),
                None if source.project_name().starts_with("python3-") => {
                    source.project_name().to_string()
                }
                None => format!("python3-{}", source.project_name()),
            },
        };
        (name, version)
    }

    /// Run a prep or post script from the build directory when it exists.
    fn run_script(&self, script: &str, source_directory: &Path, name: &str, version: &str) -> bool {
        if !self.context.build_directory.join(script).exists() {
            return true;
        }

        ProcessBuilder::new("sh")
            .arg(format!("../{}", script))
            .args([
                name,
                version,
                self.version_suffix.as_str(),
                self.distribution.as_str(),
                self.architecture.as_str(),
            ])
            .cwd(source_directory)
            .run()
    }

    fn create_original_source_package(&self, source_package: &Path, version: &str) -> Result<()> {
        let filename = format!(
            "{}_{}.orig.tar.gz",
            self.context.definition.dpkg_source_name(),
            version
        );
        let path = self.context.build_directory.join(filename);
        if path.exists() {
            return Ok(());
        }

        let is_zip = source_package
            .extension()
            .is_some_and(|extension| extension == "zip");
        if is_zip {
            zip_to_tar_gz(source_package, &path)
        } else {
            copy_file(source_package, &path)
        }
    }

    fn create_packaging_files(&self, source_directory: &Path, version: &str) -> Result<bool> {
        let debian_directory = source_directory.join("debian");
        if debian_directory.exists() {
            remove_path(&debian_directory)?;
        }

        let mut dpkg_directory = source_directory.join("dpkg");
        if !dpkg_directory.exists() {
            dpkg_directory = source_directory.join("config").join("dpkg");
        }

        if dpkg_directory.exists() {
            copy_dir_all(&dpkg_directory, &debian_directory)?;
        } else {
            let build_configuration = match self.flavor {
                DpkgFlavor::Pybuild => determine_build_configuration(source_directory)?,
                DpkgFlavor::ConfigureMake => None,
            };

            let mut generator =
                DpkgBuildFilesGenerator::new(&self.context.definition, version, &self.context.data_path)
                    .with_build_configuration(build_configuration.as_ref());
            if self.kind == DpkgPackageKind::Source {
                generator = generator.with_distribution(self.distribution.clone());
            }
            generator.generate_files(&debian_directory)?;
        }

        if !debian_directory.exists() {
            tracing::error!(
                "Missing debian sub directory in: {}",
                source_directory.display()
            );
            return Ok(false);
        }
        Ok(true)
    }

    fn remove_older_original_source_packages(&self, version: &str) -> Result<()> {
        let name = self.context.definition.dpkg_source_name();
        let escaped = glob::Pattern::escape(name);
        let keep = format!(
            "^{}_{}.orig.tar.gz",
            regex::escape(name),
            regex::escape(version)
        );

        let mut patterns = vec![format!("{}_[0-9]*.orig.tar.gz", escaped)];
        if !self.version_suffix.is_empty() && !self.distribution.is_empty() {
            patterns.push(format!(
                "{}_[0-9]*{}~{}.orig.tar.gz",
                escaped, self.version_suffix, self.distribution
            ));
        }
        remove_unless(&self.context.build_directory, &patterns, &keep)
    }

    fn remove_older_dpkg_packages(&self, name: &str, version: &str) -> Result<()> {
        let name = self
            .context
            .definition
            .dpkg_source_name
            .as_deref()
            .unwrap_or(name);
        let escaped = glob::Pattern::escape(name);
        let keep = format!("^{}[-_].*{}", regex::escape(name), regex::escape(version));

        let patterns = match self.kind {
            DpkgPackageKind::Binary => vec![
                format!("{}*[-_][0-9]*-[1-9]_{}.*", escaped, self.architecture),
                format!("{}[-_][0-9]*-[1-9].*", escaped),
            ],
            DpkgPackageKind::Source => vec![
                format!(
                    "{}[-_][0-9]*-[1-9]{}~{}_{}.*",
                    escaped, self.version_suffix, self.distribution, self.architecture
                ),
                format!(
                    "{}[-_][0-9]*-[1-9]{}~{}.*",
                    escaped, self.version_suffix, self.distribution
                ),
            ],
        };
        remove_unless(&self.context.build_directory, &patterns, &keep)
    }
}

impl BuildHelper for DpkgBuildHelper {
    fn context(&self) -> &BuildContext {
        &self.context
    }

    fn check_build_dependencies(&self) -> Vec<String> {
        let mut missing: Vec<String> = BUILD_DEPENDENCIES
            .iter()
            .filter(|name| !package_installed("dpkg-query", &["-s"], name))
            .map(|name| name.to_string())
            .collect();

        for name in dpkg_build_dependencies(&self.context) {
            if !package_installed("dpkg-query", &["-s"], &name) {
                missing.push(name);
            }
        }
        missing
    }

    fn check_build_required(&self, source: &mut dyn SourceHelper) -> bool {
        let (name, version) = self.package_information(source);
        let Some(version) = version else {
            return true;
        };

        let filename = match self.kind {
            DpkgPackageKind::Binary => format!("{}_{}-1_{}.deb", name, version, self.architecture),
            DpkgPackageKind::Source => format!(
                "{}_{}-1{}~{}_{}.changes",
                name, version, self.version_suffix, self.distribution, self.architecture
            ),
        };
        !self.context.build_directory.join(filename).exists()
    }

    fn build(&self, source: &mut dyn SourceHelper) -> Result<bool> {
        let Some(source_package) = source.source_package_path()? else {
            tracing::info!("Missing source package of: {}", source.project_name());
            return Ok(false);
        };
        let source_directory = source_directory(source)?;

        let (name, version) = self.package_information(source);
        let Some(version) = version else {
            tracing::error!("Missing version of: {}", source.project_name());
            return Ok(false);
        };

        self.create_original_source_package(&source_package, &version)?;

        let package_filename = source_package
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.kind {
            DpkgPackageKind::Binary => {
                if let Some(ref host) = self.build_host_distribution {
                    tracing::debug!("Build host distribution: {}", host);
                }
                tracing::info!("Building deb of: {}", package_filename);
            }
            DpkgPackageKind::Source => tracing::info!(
                "Building source deb of: {} for: {}",
                package_filename,
                self.distribution
            ),
        }

        if !self.create_packaging_files(&source_directory, &version)? {
            return Ok(false);
        }

        let temporary_directory = source_directory.join("tmp");
        if temporary_directory.exists() {
            remove_path(&temporary_directory)?;
        }

        let (prep_script, post_script) = self.scripts();
        if !self.run_script(prep_script, &source_directory, &name, &version) {
            return Ok(false);
        }

        let command = match self.kind {
            DpkgPackageKind::Binary => {
                ProcessBuilder::new("dpkg-buildpackage").args(["-uc", "-us", "-rfakeroot"])
            }
            DpkgPackageKind::Source => ProcessBuilder::new("debuild").args(["-S", "-sa"]),
        };
        if !command
            .cwd(&source_directory)
            .log_to(self.context.log_path())
            .run()
        {
            return Ok(false);
        }

        Ok(self.run_script(post_script, &source_directory, &name, &version))
    }

    fn clean(&self, source: &mut dyn SourceHelper) -> Result<()> {
        let (name, version) = self.package_information(source);
        let Some(version) = version else {
            return Ok(());
        };
        let build_directory = &self.context.build_directory;

        remove_older_source_directories(build_directory, source.project_name(), &version)?;
        remove_older_source_packages(build_directory, source.project_name(), &version)?;
        self.remove_older_original_source_packages(&version)?;
        self.remove_older_dpkg_packages(&name, &version)?;

        if self.flavor == DpkgFlavor::Pybuild {
            let module_name = ["python-", "python2-", "python3-"]
                .iter()
                .find_map(|prefix| name.strip_prefix(prefix));
            if let Some(module_name) = module_name {
                let python3_name = format!("python3-{}", module_name);
                if python3_name != name {
                    self.remove_older_dpkg_packages(&python3_name, &version)?;
                }
            }
        }
        Ok(())
    }

    /// All build dependencies should be listed as dpkg build dependencies.
    fn check_project_configuration(&self) -> bool {
        let mut result = true;
        for name in &self.context.definition.build_dependencies {
            let package_name = build_dependency_package_name(name);
            if !self
                .context
                .definition
                .dpkg_build_dependencies
                .iter()
                .any(|dependency| dependency == package_name)
            {
                tracing::warn!(
                    "Build dependency: {} not defined as dpkg build dependency: {}.",
                    name,
                    package_name
                );
                result = false;
            }
        }
        result
    }
}

/// dpkg build dependencies of the project, including the mapped names of
/// its generic build dependencies.
pub fn dpkg_build_dependencies(context: &BuildContext) -> Vec<String> {
    let mut dependencies = context.definition.dpkg_build_dependencies.clone();
    for name in &context.definition.build_dependencies {
        let package_name = build_dependency_package_name(name);
        if !dependencies.iter().any(|dependency| dependency == package_name) {
            dependencies.push(package_name.to_string());
        }
    }
    dependencies
}

/// dpkg architecture name of a machine name.
pub fn dpkg_architecture(machine: &str) -> &str {
    match machine {
        "i686" => "i386",
        "x86_64" => "amd64",
        other => other,
    }
}

/// Codename of the Debian or Ubuntu release of the build host.
pub fn build_host_distribution() -> Option<String> {
    let lsb_release = Path::new("/etc/lsb-release");
    if let Ok(content) = std::fs::read_to_string(lsb_release) {
        if let Some(codename) = parse_lsb_release_codename(&content) {
            return Some(codename);
        }
    }

    let lsb_release_command = Path::new("/usr/bin/lsb_release");
    if !lsb_release_command.exists() {
        return None;
    }
    let output = ProcessBuilder::new(lsb_release_command).arg("-sc").exec().ok()?;
    if !output.status.success() {
        return None;
    }
    let codename = String::from_utf8(output.stdout).ok()?;
    let codename = codename.trim();
    (!codename.is_empty()).then(|| codename.to_string())
}

fn parse_lsb_release_codename(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("distrib_codename") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Install the Python project into a scratch root and inspect what it
/// installs.
fn determine_build_configuration(source_directory: &Path) -> Result<Option<DpkgBuildConfiguration>> {
    let python = find_python();
    let command = if source_directory.join("setup.py").is_file() {
        ProcessBuilder::new(&python).args(["setup.py", "install", "--root=installroot"])
    } else if source_directory.join("pyproject.toml").is_file() {
        ProcessBuilder::new(&python).args(["-m", "pip", "install", "--no-deps", "-t", "installroot", "."])
    } else {
        return Ok(None);
    };

    let command = command.cwd(source_directory);
    let installroot = source_directory.join("installroot");
    let configuration = match command.exec() {
        Ok(output) if output.status.success() => Some(inspect_installroot(&installroot)?),
        _ => {
            tracing::error!("Running: \"{}\" failed.", command.display_command());
            None
        }
    };

    if installroot.exists() {
        remove_path(&installroot)?;
    }
    Ok(configuration)
}

fn inspect_installroot(installroot: &Path) -> Result<DpkgBuildConfiguration> {
    let mut configuration = DpkgBuildConfiguration::default();

    if installroot.join("usr").join("bin").exists() {
        configuration.has_bin_directory = true;
    }

    let dist_packages: Vec<PathBuf> =
        glob_paths(installroot, "usr/local/lib/python3.*/dist-packages")?;
    if let Some(dist_packages) = dist_packages.first() {
        let mut entries: Vec<_> = std::fs::read_dir(dist_packages)?
            .filter_map(|entry| entry.ok())
            .collect();
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();

            if name.ends_with(".egg-info") {
                if path.is_dir() {
                    configuration.has_egg_info_directory = true;
                } else {
                    configuration.has_egg_info_file = true;
                }
            } else if path.is_dir() {
                if name != "__pycache__" {
                    configuration.module_directories.push(name);
                }
            } else if name.ends_with(".py") {
                configuration.has_module_source_files = true;
            } else if name.ends_with(".so") {
                configuration.has_module_shared_object = true;
            }
        }
    }

    if !glob_paths(installroot, "usr/local/bin/*.py")?.is_empty() {
        configuration.has_bin_directory = true;
    }
    Ok(configuration)
}

impl DpkgFlavor {
    /// Flavor used for a build system, if dpkg packages can be built for it.
    pub fn for_build_system(build_system: &BuildSystem) -> Option<Self> {
        match build_system {
            BuildSystem::ConfigureMake => Some(DpkgFlavor::ConfigureMake),
            BuildSystem::SetupPy | BuildSystem::Pyproject | BuildSystem::Poetry => {
                Some(DpkgFlavor::Pybuild)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProjectDefinition;
    use crate::test_support::FakeSourceHelper;
    use std::fs;
    use tempfile::TempDir;

    fn context(tmp: &TempDir, definition: ProjectDefinition) -> BuildContext {
        BuildContext::new(definition, tmp.path().join("data"), tmp.path())
    }

    #[test]
    fn test_build_dependency_package_name() {
        assert_eq!(build_dependency_package_name("zlib"), "zlib1g-dev");
        assert_eq!(build_dependency_package_name("libcrypto"), "libssl-dev");
        assert_eq!(build_dependency_package_name("libfoo-dev"), "libfoo-dev");
    }

    #[test]
    fn test_dpkg_build_dependencies() {
        let tmp = TempDir::new().unwrap();
        let mut definition = ProjectDefinition::new("libewf");
        definition.build_dependencies = vec!["zlib".to_string(), "bzip2".to_string()];
        definition.dpkg_build_dependencies = vec!["zlib1g-dev".to_string()];

        assert_eq!(
            dpkg_build_dependencies(&context(&tmp, definition)),
            vec!["zlib1g-dev".to_string(), "libbz2-dev".to_string()]
        );
    }

    #[test]
    fn test_check_project_configuration() {
        let tmp = TempDir::new().unwrap();
        let mut definition = ProjectDefinition::new("libewf");
        definition.build_dependencies = vec!["zlib".to_string()];

        let helper = DpkgBuildHelper::new(
            context(&tmp, definition.clone()),
            DpkgFlavor::ConfigureMake,
            DpkgPackageKind::Binary,
        );
        assert!(!helper.check_project_configuration());

        definition.dpkg_build_dependencies = vec!["zlib1g-dev".to_string()];
        let helper = DpkgBuildHelper::new(
            context(&tmp, definition),
            DpkgFlavor::ConfigureMake,
            DpkgPackageKind::Binary,
        );
        assert!(helper.check_project_configuration());
    }

    #[test]
    fn test_dpkg_architecture() {
        assert_eq!(dpkg_architecture("i686"), "i386");
        assert_eq!(dpkg_architecture("x86_64"), "amd64");
        assert_eq!(dpkg_architecture("aarch64"), "aarch64");
    }

    #[test]
    fn test_parse_lsb_release_codename() {
        let content = "DISTRIB_ID=Ubuntu\nDISTRIB_RELEASE=22.04\nDISTRIB_CODENAME=jammy\n";
        assert_eq!(parse_lsb_release_codename(content), Some("jammy".to_string()));
        assert_eq!(parse_lsb_release_codename("DISTRIB_ID=Ubuntu\n"), None);
    }

    #[test]
    fn test_check_build_required() {
        let tmp = TempDir::new().unwrap();
        let definition = ProjectDefinition::new("libbde");
        let helper = DpkgBuildHelper::new(
            context(&tmp, definition).with_architecture("amd64"),
            DpkgFlavor::ConfigureMake,
            DpkgPackageKind::Binary,
        );
        let mut source = FakeSourceHelper::new("libbde", "20240101");

        assert!(helper.check_build_required(&mut source));
        fs::write(tmp.path().join("libbde_20240101-1_amd64.deb"), "").unwrap();
        assert!(!helper.check_build_required(&mut source));
    }

    #[test]
    fn test_check_build_required_pybuild() {
        let tmp = TempDir::new().unwrap();
        let helper = DpkgBuildHelper::new(
            context(&tmp, ProjectDefinition::new("dfdatetime")),
            DpkgFlavor::Pybuild,
            DpkgPackageKind::Binary,
        );
        assert_eq!(helper.architecture(), "all");

        let mut source = FakeSourceHelper::new("dfdatetime", "1!20240101");
        fs::write(tmp.path().join("python3-dfdatetime_20240101-1_all.deb"), "").unwrap();
        assert!(!helper.check_build_required(&mut source));
    }

    #[test]
    fn test_check_build_required_source() {
        let tmp = TempDir::new().unwrap();
        let helper = DpkgBuildHelper::new(
            context(&tmp, ProjectDefinition::new("libbde")).with_distribution(Some("focal".to_string())),
            DpkgFlavor::ConfigureMake,
            DpkgPackageKind::Source,
        );
        assert_eq!(helper.architecture(), "source");
        assert_eq!(helper.distribution(), "focal");

        let mut source = FakeSourceHelper::new("libbde", "20240101");
        assert!(helper.check_build_required(&mut source));
        fs::write(
            tmp.path().join("libbde_20240101-1ppa1~focal_source.changes"),
            "",
        )
        .unwrap();
        assert!(!helper.check_build_required(&mut source));
    }

    #[test]
    fn test_clean() {
        let tmp = TempDir::new().unwrap();
        let helper = DpkgBuildHelper::new(
            context(&tmp, ProjectDefinition::new("libbde")).with_architecture("amd64"),
            DpkgFlavor::ConfigureMake,
            DpkgPackageKind::Binary,
        );
        for name in [
            "libbde_20190101-1_amd64.deb",
            "libbde-tools_20190101-1_amd64.deb",
            "libbde_20190101-1.dsc",
            "libbde_20190101.orig.tar.gz",
            "libbde_20240101-1_amd64.deb",
            "libbde-tools_20240101-1_amd64.deb",
            "libbde_20240101.orig.tar.gz",
        ] {
            fs::write(tmp.path().join(name), "").unwrap();
        }
        fs::create_dir(tmp.path().join("libbde-20190101")).unwrap();

        let mut source = FakeSourceHelper::new("libbde", "20240101");
        helper.clean(&mut source).unwrap();

        assert!(!tmp.path().join("libbde_20190101-1_amd64.deb").exists());
        assert!(!tmp.path().join("libbde-tools_20190101-1_amd64.deb").exists());
        assert!(!tmp.path().join("libbde_20190101-1.dsc").exists());
        assert!(!tmp.path().join("libbde_20190101.orig.tar.gz").exists());
        assert!(!tmp.path().join("libbde-20190101").exists());
        assert!(tmp.path().join("libbde_20240101-1_amd64.deb").exists());
        assert!(tmp.path().join("libbde-tools_20240101-1_amd64.deb").exists());
        assert!(tmp.path().join("libbde_20240101.orig.tar.gz").exists());
    }

    #[test]
    fn test_create_packaging_files_from_dpkg_directory() {
        let tmp = TempDir::new().unwrap();
        let source_directory = tmp.path().join("libbde-20240101");
        fs::create_dir_all(source_directory.join("dpkg")).unwrap();
        fs::create_dir_all(source_directory.join("debian")).unwrap();
        fs::write(source_directory.join("debian").join("stale"), "").unwrap();
        fs::write(source_directory.join("dpkg").join("compat"), "10\n").unwrap();

        let helper = DpkgBuildHelper::new(
            context(&tmp, ProjectDefinition::new("libbde")),
            DpkgFlavor::ConfigureMake,
            DpkgPackageKind::Binary,
        );
        assert!(helper
            .create_packaging_files(&source_directory, "20240101")
            .unwrap());

        assert!(source_directory.join("debian").join("compat").exists());
        assert!(!source_directory.join("debian").join("stale").exists());
    }

    #[test]
    fn test_create_original_source_package() {
        let tmp = TempDir::new().unwrap();
        let package = crate::test_support::create_tar_gz(
            &tmp.path().join("libbde-20240101.tar.gz"),
            &[("libbde-20240101/configure", "#!/bin/sh\n")],
        );

        let mut definition = ProjectDefinition::new("libbde");
        definition.dpkg_source_name = Some("libbde-source".to_string());
        let helper = DpkgBuildHelper::new(
            context(&tmp, definition),
            DpkgFlavor::ConfigureMake,
            DpkgPackageKind::Binary,
        );
        helper
            .create_original_source_package(&package, "20240101")
            .unwrap();

        assert!(tmp.path().join("libbde-source_20240101.orig.tar.gz").exists());
    }
}
