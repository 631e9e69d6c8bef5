//! Packages committed to the openSUSE build service with osc.

use std::path::{Path, PathBuf};

use anyhow::Result;
use regex::Regex;

use crate::builder::helper::{source_directory, BuildContext, BuildHelper};
use crate::generators::RpmSpecFileGenerator;
use crate::sources::SourceHelper;
use crate::util::fs::{copy_file, glob_paths, write_string};
use crate::util::process::ProcessBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscFlavor {
    /// The source package ships its own spec file.
    ConfigureMake,
    /// The spec file is generated from setup.py.
    SetupPy,
}

/// Builds osc packages from a checkout of the osc project in the build
/// directory.
#[derive(Debug)]
pub struct OscBuildHelper {
    context: BuildContext,
    flavor: OscFlavor,
}

impl OscBuildHelper {
    pub fn new(context: BuildContext, flavor: OscFlavor) -> Self {
        OscBuildHelper { context, flavor }
    }

    fn project(&self) -> &str {
        &self.context.osc_project
    }

    /// Checkout of the osc project.
    pub fn project_path(&self) -> PathBuf {
        self.context.build_directory.join(self.project())
    }

    fn package_path(&self, name: &str) -> PathBuf {
        self.project_path().join(name)
    }

    fn osc(&self, args: &[&str], cwd: &Path) -> bool {
        ProcessBuilder::new("osc")
            .arg("-q")
            .args(args)
            .cwd(cwd)
            .append_to_log(self.context.log_path())
            .run()
    }

    /// Add a file, relative to the project checkout.
    fn add(&self, path: &str) -> bool {
        self.osc(&["add", path], &self.project_path())
    }

    fn commit(&self, name: &str) -> bool {
        self.osc(&["commit", "-n"], &self.package_path(name))
    }

    fn update(&self) -> bool {
        self.osc(&["update"], &self.project_path())
    }

    fn create_package(&self, name: &str) -> bool {
        let metadata = package_metadata(name, self.project());
        ProcessBuilder::new("osc")
            .args(["-q", "meta", "pkg", "-F", "-", self.project(), name])
            .stdin(metadata)
            .cwd(self.project_path())
            .append_to_log(self.context.log_path())
            .run()
    }

    /// Check out or update the project and create the package if needed.
    fn prepare(&self, name: &str) -> bool {
        let prepared = if self.project_path().exists() {
            self.update()
        } else {
            self.osc(&["checkout", self.project()], &self.context.build_directory)
        };
        if !prepared {
            return false;
        }

        if self.package_path(name).exists() {
            return true;
        }
        self.create_package(name) && self.update()
    }

    fn prepare_configure_make(
        &self,
        name: &str,
        version: &str,
        source_package: &Path,
    ) -> Result<Option<String>> {
        let package_path = self.package_path(name);
        let tarball = format!("{}-{}.tar.gz", name, version);
        copy_file(source_package, &package_path.join(&tarball))?;
        if !self.add(&format!("{}/{}", name, tarball)) {
            return Ok(None);
        }

        let spec_filename = format!("{}.spec", name);
        let output = ProcessBuilder::new("tar")
            .arg("xfO")
            .arg(&tarball)
            .arg(format!("{}-{}/{}", name, version, spec_filename))
            .cwd(&package_path)
            .exec()?;
        if !output.status.success() {
            tracing::error!(
                "Running: \"tar xfO {} {}-{}/{}\" failed.",
                tarball,
                name,
                version,
                spec_filename
            );
            return Ok(None);
        }
        write_string(
            &package_path.join(&spec_filename),
            &String::from_utf8_lossy(&output.stdout),
        )?;
        Ok(Some(spec_filename))
    }

    fn prepare_setup_py(
        &self,
        source: &mut dyn SourceHelper,
        source_package: &Path,
    ) -> Result<Option<String>> {
        let project_name = source.project_name().to_string();
        let package_path = self.package_path(&project_name);
        let source_directory = source_directory(source)?;
        let source_filename = source_package
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let osc_source_path = package_path.join(&source_filename);
        if !osc_source_path.exists() {
            copy_file(source_package, &osc_source_path)?;
            if !self.add(&format!("{}/{}", project_name, source_filename)) {
                return Ok(None);
            }
        }

        let generator = RpmSpecFileGenerator::new(&self.context.data_path);
        if !generator.generate_with_setup_py(&source_directory, &self.context.log_path()) {
            return Ok(None);
        }

        let name = match project_name.strip_prefix("python-") {
            Some(name) if project_name != "python-gflags" => name,
            _ => project_name.as_str(),
        };
        let Some(version) = source.project_version() else {
            return Ok(None);
        };

        let setup_name = self.context.definition.setup_name.as_deref().unwrap_or(&project_name);
        let input_path = source_directory
            .join("dist")
            .join(format!("{}.spec", setup_name));
        let spec_filename = format!("{}.spec", name);

        generator.rewrite_setup_py_generated_file(
            &self.context.definition,
            &source_directory,
            &source_filename,
            name,
            &version,
            &input_path,
            &package_path.join(&spec_filename),
        )?;
        Ok(Some(spec_filename))
    }
}

impl BuildHelper for OscBuildHelper {
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
        let name = source.project_name();
        !self
            .package_path(name)
            .join(format!("{}-{}.tar.gz", name, version))
            .exists()
    }

    fn build(&self, source: &mut dyn SourceHelper) -> Result<bool> {
        let Some(source_package) = source.source_package_path()? else {
            tracing::info!("Missing source package of: {}", source.project_name());
            return Ok(false);
        };
        source_directory(source)?;
        let Some(version) = source.project_version() else {
            tracing::error!("Missing version of: {}", source.project_name());
            return Ok(false);
        };
        let name = source.project_name().to_string();

        tracing::info!(
            "Preparing osc build of: {}",
            source_package
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default()
        );

        if !self.prepare(&name) {
            return Ok(false);
        }

        // Whether the spec file is new is decided before it is written.
        let spec_name = match self.flavor {
            OscFlavor::ConfigureMake => name.clone(),
            OscFlavor::SetupPy => match name.strip_prefix("python-") {
                Some(stripped) if name != "python-gflags" => stripped.to_string(),
                _ => name.clone(),
            },
        };
        let spec_exists = self
            .package_path(&name)
            .join(format!("{}.spec", spec_name))
            .exists();

        let spec_filename = match self.flavor {
            OscFlavor::ConfigureMake => self.prepare_configure_make(&name, &version, &source_package)?,
            OscFlavor::SetupPy => self.prepare_setup_py(source, &source_package)?,
        };
        let Some(spec_filename) = spec_filename else {
            return Ok(false);
        };

        let generator = RpmSpecFileGenerator::new(&self.context.data_path);
        generator.rewrite_setup_py_generated_file_for_osc(&self.package_path(&name).join(&spec_filename))?;

        if !spec_exists && !self.add(&format!("{}/{}", name, spec_filename)) {
            return Ok(false);
        }
        Ok(self.commit(&name))
    }

    fn clean(&self, source: &mut dyn SourceHelper) -> Result<()> {
        let Some(version) = source.project_version() else {
            return Ok(());
        };
        let name = source.project_name();
        let package_path = self.package_path(name);
        if !package_path.exists() {
            return Ok(());
        }

        let keep = Regex::new(&format!(
            "^{}-{}\\.tar\\.gz",
            regex::escape(name),
            regex::escape(&version)
        ))?;
        let pattern = format!("{}-*.tar.gz", glob::Pattern::escape(name));

        for path in glob_paths(&package_path, &pattern)? {
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if keep.is_match(file_name) {
                continue;
            }
            tracing::info!("Removing: {}", path.display());
            self.osc(&["remove", file_name], &package_path);
        }
        Ok(())
    }

    fn check_project_configuration(&self) -> bool {
        let command = ProcessBuilder::new("osc")
            .arg("status")
            .arg(self.project())
            .cwd(&self.context.build_directory);

        match command.exec() {
            Ok(output) if output.status.success() => {
                if output.stdout.iter().all(u8::is_ascii_whitespace) {
                    true
                } else {
                    tracing::error!("Unable to continue with pending changes.");
                    false
                }
            }
            Ok(output) => {
                tracing::error!(
                    "Running: \"{}\" failed with error: {}.",
                    command.display_command(),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                false
            }
            Err(e) => {
                tracing::error!("Running: \"{}\" failed: {:#}", command.display_command(), e);
                false
            }
        }
    }
}

/// Package metadata passed to `osc meta pkg`.
pub fn package_metadata(name: &str, project: &str) -> String {
    format!(
        "<package name=\"{name}\" project=\"{project}\">\n  <title>{name}</title>\n  <description>{name}</description>\n</package>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProjectDefinition;
    use crate::test_support::FakeSourceHelper;
    use std::fs;
    use tempfile::TempDir;

    fn helper(tmp: &TempDir) -> OscBuildHelper {
        let context = BuildContext::new(ProjectDefinition::new("libewf"), tmp.path(), tmp.path())
            .with_osc_project("home:test:testing");
        OscBuildHelper::new(context, OscFlavor::ConfigureMake)
    }

    #[test]
    fn test_package_metadata() {
        assert_eq!(
            package_metadata("libewf", "home:test:testing"),
            "<package name=\"libewf\" project=\"home:test:testing\">\n  \
             <title>libewf</title>\n  <description>libewf</description>\n</package>\n"
        );
    }

    #[test]
    fn test_check_build_dependencies() {
        let tmp = TempDir::new().unwrap();
        assert!(helper(&tmp).check_build_dependencies().is_empty());
    }

    #[test]
    fn test_check_build_required() {
        let tmp = TempDir::new().unwrap();
        let helper = helper(&tmp);
        let mut source = FakeSourceHelper::new("libewf", "20240101");
        assert!(helper.check_build_required(&mut source));

        let package_path = tmp.path().join("home:test:testing").join("libewf");
        fs::create_dir_all(&package_path).unwrap();
        fs::write(package_path.join("libewf-20240101.tar.gz"), "").unwrap();
        assert!(!helper.check_build_required(&mut source));
    }

    #[test]
    fn test_clean_without_checkout() {
        let tmp = TempDir::new().unwrap();
        let mut source = FakeSourceHelper::new("libewf", "20240101");
        helper(&tmp).clean(&mut source).unwrap();
    }
}
