//! MacOS packages (.pkg) and distributable disk images (.dmg).

use std::path::{Path, PathBuf};

use anyhow::Result;
use walkdir::WalkDir;

use crate::builder::helper::{remove_unless, source_directory, BuildContext, BuildHelper};
use crate::sources::SourceHelper;
use crate::util::fs::{copy_file, ensure_dir, glob_paths};
use crate::util::process::{find_python, ProcessBuilder};

const PKGBUILD: &str = "/usr/bin/pkgbuild";

const SDKS_PATH: &str =
    "/Applications/Xcode.app/Contents/Developer/Platforms/MacOSX.platform/Developer/SDKs";

const SDK_VERSIONS: &[&str] = &["10.7", "10.8", "10.9", "10.10", "10.11", "10.12"];

const DOC_FILENAMES: &[&str] = &[
    "AUTHORS",
    "AUTHORS.txt",
    "COPYING",
    "COPYING.txt",
    "LICENSE",
    "LICENSE.txt",
    "NEWS",
    "NEWS.txt",
    "README",
    "README.md",
    "README.txt",
];

const LICENSE_FILENAMES: &[&str] = &["COPYING", "LICENSE", "LICENSE.TXT", "LICENSE.txt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkgFlavor {
    ConfigureMake,
    SetupPy,
}

/// Builds a pkg from a staging root in `{source}/tmp` and wraps it in a
/// dmg.
#[derive(Debug)]
pub struct PkgBuildHelper {
    context: BuildContext,
    flavor: PkgFlavor,
}

impl PkgBuildHelper {
    pub fn new(context: BuildContext, flavor: PkgFlavor) -> Self {
        PkgBuildHelper { context, flavor }
    }

    fn file_path(&self, name: &str, version: &str, extension: &str) -> PathBuf {
        self.context
            .build_directory
            .join(format!("{}-{}.{}", name, version, extension))
    }

    fn build_dmg(&self, pkg_path: &Path, dmg_path: &Path) -> bool {
        ProcessBuilder::new("hdiutil")
            .arg("create")
            .arg(dmg_path)
            .arg("-srcfolder")
            .arg(pkg_path)
            .args(["-fs", "HFS+"])
            .run()
    }

    fn build_pkg(&self, source_directory: &Path, identifier: &str, version: &str, pkg_path: &Path) -> bool {
        ProcessBuilder::new(PKGBUILD)
            .arg("--root")
            .arg(format!("{}/tmp/", source_directory.display()))
            .args(["--identifier", identifier, "--version", version])
            .args(["--ownership", "recommended"])
            .arg(pkg_path)
            .run()
    }

    fn stage_configure_make(&self, project_name: &str, source_directory: &Path) -> Result<bool> {
        let log_path = self.context.log_path();
        let definition = &self.context.definition;

        let configure_options = if definition.pkg_configure_options.is_empty() {
            definition.configure_options.join(" ")
        } else {
            definition.pkg_configure_options.join(" ")
        };

        let mut configure = ProcessBuilder::new("./configure")
            .arg("--prefix=/usr/local")
            .split_args(&configure_options)
            .cwd(source_directory)
            .log_to(&log_path);

        if let Some(sdk_path) = sdk_path() {
            configure = configure
                .env("CFLAGS", format!("-isysroot {}", sdk_path.display()))
                .env("LDFLAGS", format!("-Wl,-syslibroot,{}", sdk_path.display()))
                .arg("--disable-dependency-tracking");
        }
        if !configure.run() {
            return Ok(false);
        }

        if !ProcessBuilder::new("make")
            .cwd(source_directory)
            .append_to_log(&log_path)
            .run()
        {
            return Ok(false);
        }

        let destination = std::path::absolute(source_directory)?.join("tmp");
        if !ProcessBuilder::new("make")
            .arg("install")
            .arg(format!("DESTDIR={}", destination.display()))
            .cwd(source_directory)
            .append_to_log(&log_path)
            .run()
        {
            return Ok(false);
        }

        copy_documentation(source_directory, project_name)?;
        Ok(true)
    }

    fn stage_setup_py(&self, source_directory: &Path) -> Result<bool> {
        let log_path = self.context.log_path();

        if !ProcessBuilder::new(find_python())
            .args(["setup.py", "build"])
            .cwd(source_directory)
            .log_to(&log_path)
            .run()
        {
            return Ok(false);
        }

        let root = std::path::absolute(source_directory)?.join("tmp");
        if !ProcessBuilder::new(find_python())
            .args(["setup.py", "install"])
            .arg(format!("--root={}", root.display()))
            .arg("--install-data=/usr/local")
            .cwd(source_directory)
            .append_to_log(&log_path)
            .run()
        {
            return Ok(false);
        }

        copy_licenses_to_egg_info(source_directory)?;
        Ok(true)
    }
}

impl BuildHelper for PkgBuildHelper {
    fn context(&self) -> &BuildContext {
        &self.context
    }

    fn check_build_dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    fn check_build_required(&self, source: &mut dyn SourceHelper) -> bool {
        let Some(version) = source.project_version() else {
            return true;
        };
        !self.file_path(source.project_name(), &version, "dmg").exists()
    }

    fn build(&self, source: &mut dyn SourceHelper) -> Result<bool> {
        let Some(source_package) = source.source_package_path()? else {
            tracing::info!("Missing source package of: {}", source.project_name());
            return Ok(false);
        };
        let Some(version) = source.project_version() else {
            tracing::error!("Missing version of: {}", source.project_name());
            return Ok(false);
        };
        let source_directory = source_directory(source)?;
        let project_name = source.project_name().to_string();

        tracing::info!("Building pkg of: {}", source_package.display());

        let dmg_path = self.file_path(&project_name, &version, "dmg");
        let pkg_path = self.file_path(&project_name, &version, "pkg");

        if !pkg_path.exists() {
            let (staged, identifier) = match self.flavor {
                PkgFlavor::ConfigureMake => (
                    self.stage_configure_make(&project_name, &source_directory)?,
                    Some(format!("com.github.libyal.{}", project_name)),
                ),
                PkgFlavor::SetupPy => (
                    self.stage_setup_py(&source_directory)?,
                    source.project_identifier(),
                ),
            };
            if !staged {
                return Ok(false);
            }

            let Some(identifier) = identifier else {
                tracing::error!("Unable to determine project identifier of: {}", project_name);
                return Ok(false);
            };
            if !self.build_pkg(&source_directory, &identifier, &version, &pkg_path) {
                return Ok(false);
            }
        }

        Ok(self.build_dmg(&pkg_path, &dmg_path))
    }

    fn clean(&self, source: &mut dyn SourceHelper) -> Result<()> {
        let Some(version) = source.project_version() else {
            return Ok(());
        };
        let name = source.project_name();
        let escaped = glob::Pattern::escape(name);

        remove_unless(
            &self.context.build_directory,
            &[format!("{}-*.dmg", escaped), format!("{}-*.pkg", escaped)],
            &format!("^{}-.*{}", regex::escape(name), regex::escape(&version)),
        )
    }
}

/// First MacOS SDK of the supported versions that is installed.
fn sdk_path() -> Option<PathBuf> {
    SDK_VERSIONS
        .iter()
        .map(|version| Path::new(SDKS_PATH).join(format!("MacOSX{}.sdk", version)))
        .find(|path| path.is_dir())
}

/// Copy the documentation and license files into the staged doc directory.
fn copy_documentation(source_directory: &Path, project_name: &str) -> Result<()> {
    let share_doc = source_directory
        .join("tmp")
        .join("usr")
        .join("local")
        .join("share")
        .join("doc")
        .join(project_name);
    ensure_dir(&share_doc)?;

    for name in DOC_FILENAMES {
        let path = source_directory.join(name);
        if path.exists() {
            copy_file(&path, &share_doc.join(name))?;
        }
    }

    let licenses = source_directory.join("licenses");
    if licenses.is_dir() {
        for path in glob_paths(&licenses, "*")? {
            if let Some(file_name) = path.file_name() {
                copy_file(&path, &share_doc.join(file_name))?;
            }
        }
    }
    Ok(())
}

fn copy_licenses_to_egg_info(source_directory: &Path) -> Result<()> {
    let licenses: Vec<&str> = LICENSE_FILENAMES
        .iter()
        .copied()
        .filter(|name| source_directory.join(name).exists())
        .collect();
    if licenses.is_empty() {
        return Ok(());
    }

    let egg_info_directories: Vec<PathBuf> = WalkDir::new(source_directory.join("tmp"))
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".egg-info"))
        .map(|entry| entry.into_path())
        .collect();

    for directory in egg_info_directories {
        for name in &licenses {
            copy_file(&source_directory.join(name), &directory.join(name))?;
        }
    }
    Ok(())
}
