//! RPM and source RPM packages built with rpmbuild.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::helper::{
    filename_safe_version, machine, move_matching, package_installed,
    remove_older_source_directories, remove_older_source_packages, remove_unless,
    source_directory, BuildContext, BuildHelper,
};
use crate::core::BuildSystem;
use crate::generators::RpmSpecFileGenerator;
use crate::sources::SourceHelper;
use crate::util::fs::{copy_file, ensure_dir, remove_path};
use crate::util::process::ProcessBuilder;

/// Packages needed to build any rpm.
const BUILD_DEPENDENCIES: &[&str] = &[
    "git",
    "binutils",
    "autoconf",
    "automake",
    "libtool",
    "gettext-devel",
    "make",
    "pkgconf",
    "gcc",
    "gcc-c++",
    "flex",
    "byacc",
    "rpm-build",
    "python3-dateutil",
    "python3-devel",
    "python3-setuptools",
    "python3-test",
];

/// rpm name of a build dependency.
pub fn build_dependency_package_name(name: &str) -> &str {
    match name {
        "bzip2" => "bzip2-devel",
        "fuse" => "fuse-devel",
        "libcrypto" => "openssl-devel",
        "liblzma" => "xz-devel",
        "pytest-runner" => "python3-pytest-runner",
        "sqlite" => "sqlite-devel",
        "zeromq" => "libzmq3-devel",
        "zlib" => "zlib-devel",
        _ => name,
    }
}

/// Where the spec file comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpmFlavor {
    /// The source package ships its own spec file.
    ConfigureMake,
    /// The spec file is generated from setup.py.
    SetupPy,
}

impl RpmFlavor {
    pub fn for_build_system(build_system: &BuildSystem) -> Option<Self> {
        match build_system {
            BuildSystem::ConfigureMake => Some(RpmFlavor::ConfigureMake),
            build_system if build_system.is_python() => Some(RpmFlavor::SetupPy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpmPackageKind {
    Binary,
    Source,
}

/// Builds rpm packages in the rpmbuild tree and moves them into the build
/// directory.
#[derive(Debug)]
pub struct RpmBuildHelper {
    context: BuildContext,
    flavor: RpmFlavor,
    kind: RpmPackageKind,
    architecture: String,
}

impl RpmBuildHelper {
    pub fn new(context: BuildContext, flavor: RpmFlavor, kind: RpmPackageKind) -> Self {
        let architecture = match context.architecture {
            Some(ref architecture) => architecture.clone(),
            None if flavor == RpmFlavor::SetupPy && !context.definition.architecture_dependent => {
                "noarch".to_string()
            }
            None => machine().to_string(),
        };

        RpmBuildHelper {
            context,
            flavor,
            kind,
            architecture,
        }
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    fn rpmbuild_directory(&self, name: &str) -> PathBuf {
        self.context.rpmbuild_path.join(name)
    }

    fn setup_name<'a>(&'a self, project_name: &'a str) -> &'a str {
        self.context
            .definition
            .setup_name
            .as_deref()
            .unwrap_or(project_name)
    }

    /// Name of the packages built from the project, without a python prefix.
    fn package_name<'a>(&'a self, project_name: &'a str) -> &'a str {
        let name = match self.kind {
            RpmPackageKind::Binary => self.context.definition.rpm_name.as_deref(),
            RpmPackageKind::Source => self.context.definition.srpm_name.as_deref(),
        }
        .unwrap_or(project_name);

        match self.flavor {
            RpmFlavor::ConfigureMake if self.kind == RpmPackageKind::Binary => name,
            _ => strip_python_prefix(name),
        }
    }

    /// Copy the source package into the rpmbuild SOURCES directory and
    /// generate the spec file into SPECS.
    fn prepare_spec_file(
        &self,
        source: &mut dyn SourceHelper,
        source_package: &Path,
        version: &str,
    ) -> Result<Option<PathBuf>> {
        let source_directory = source_directory(source)?;
        let sources = self.rpmbuild_directory("SOURCES");
        let specs = self.rpmbuild_directory("SPECS");
        ensure_dir(&sources)?;
        ensure_dir(&specs)?;

        let source_filename = file_name(source_package);
        let rpm_source_package = sources.join(&source_filename);
        if !rpm_source_package.exists() {
            copy_file(source_package, &rpm_source_package)?;
        }

        let project_name = source.project_name();
        let name = project_name.strip_prefix("python-").unwrap_or(project_name);
        let spec_path = specs.join(format!("{}.spec", name));

        let generator = RpmSpecFileGenerator::new(&self.context.data_path);
        if self.context.definition.rpm_template_spec.is_none()
            && !generator.generate_with_setup_py(&source_directory, &self.context.log_path())
        {
            return Ok(None);
        }

        let input_path = source_directory
            .join("dist")
            .join(format!("{}.spec", self.setup_name(project_name)));
        generator.rewrite_setup_py_generated_file(
            &self.context.definition,
            &source_directory,
            &source_filename,
            name,
            version,
            &input_path,
            &spec_path,
        )?;
        Ok(Some(spec_path))
    }

    fn rpmbuild(&self, flags: &str, path: &str, cwd: &Path) -> bool {
        ProcessBuilder::new("rpmbuild")
            .args([flags, path])
            .cwd(cwd)
            .append_to_log(self.context.log_path())
            .run()
    }

    fn move_packages(&self, project_name: &str, version: &str) -> Result<()> {
        let build_directory = &self.context.build_directory;
        let name = self.package_name(project_name);

        match self.kind {
            RpmPackageKind::Binary => {
                let rpms = self.rpmbuild_directory("RPMS").join(&self.architecture);
                if self.flavor == RpmFlavor::SetupPy {
                    let pattern = format!("python*-{}-*{}-1.{}.rpm", name, version, self.architecture);
                    move_matching(&rpms, &pattern, build_directory)?;
                }
                let pattern = format!("{}-*{}-1.{}.rpm", name, version, self.architecture);
                move_matching(&rpms, &pattern, build_directory)?;
            }
            RpmPackageKind::Source => {
                let pattern = format!("{}-*{}-1.src.rpm", name, version);
                move_matching(&self.rpmbuild_directory("SRPMS"), &pattern, build_directory)?;
            }
        }
        Ok(())
    }

    fn remove_older_build_directories(&self, setup_name: &str, version: &str) -> Result<()> {
        let pattern = format!("{}-*", glob::Pattern::escape(setup_name));
        let keep = format!(
            "^{}-{}$",
            regex::escape(setup_name),
            regex::escape(version)
        );
        remove_unless(&self.rpmbuild_directory("BUILD"), &[pattern], &keep)
    }

    fn remove_older_packages(&self, project_name: &str, version: &str) -> Result<()> {
        let escaped = glob::Pattern::escape(project_name);
        let (pattern, keep, directory) = match self.kind {
            RpmPackageKind::Binary => (
                format!("*{}-*-1.{}.rpm", escaped, self.architecture),
                format!(
                    ".*{}-.*{}-1.{}.rpm",
                    regex::escape(project_name),
                    regex::escape(version),
                    regex::escape(&self.architecture)
                ),
                self.rpmbuild_directory("RPMS").join(&self.architecture),
            ),
            RpmPackageKind::Source => (
                format!("{}-*-1.src.rpm", escaped),
                format!(
                    "{}-.*{}-1.src.rpm",
                    regex::escape(project_name),
                    regex::escape(version)
                ),
                self.rpmbuild_directory("SRPMS"),
            ),
        };

        let patterns = [pattern];
        remove_unless(&self.context.build_directory, &patterns, &keep)?;
        remove_unless(&directory, &patterns, &keep)
    }
}

impl BuildHelper for RpmBuildHelper {
    fn context(&self) -> &BuildContext {
        &self.context
    }

    fn check_build_dependencies(&self) -> Vec<String> {
        let mut missing: Vec<String> = BUILD_DEPENDENCIES
            .iter()
            .filter(|name| !package_installed("rpm", &["-qi"], name))
            .map(|name| name.to_string())
            .collect();

        for name in &self.context.definition.build_dependencies {
            let package_name = build_dependency_package_name(name);
            if !package_installed("rpm", &["-qi"], package_name) {
                missing.push(package_name.to_string());
            }
        }
        missing
    }

    fn check_build_required(&self, source: &mut dyn SourceHelper) -> bool {
        let Some(version) = source.project_version() else {
            return true;
        };
        let version = filename_safe_version(&version);

        let filename = match self.kind {
            RpmPackageKind::Binary => format!(
                "{}-{}-1.{}.rpm",
                source.project_name(),
                version,
                self.architecture
            ),
            RpmPackageKind::Source => format!("{}-{}-1.src.rpm", source.project_name(), version),
        };
        !self.context.build_directory.join(filename).exists()
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
        let version = filename_safe_version(&version).to_string();
        let project_name = source.project_name().to_string();

        match self.kind {
            RpmPackageKind::Binary => {
                tracing::info!("Building rpm of: {}", file_name(&source_package))
            }
            RpmPackageKind::Source => {
                tracing::info!("Building source rpm of: {}", file_name(&source_package))
            }
        }

        let successful = match self.flavor {
            RpmFlavor::ConfigureMake => {
                let filename = format!("{}-{}.tar.gz", project_name, version);
                let path = self.context.build_directory.join(&filename);
                if self.kind == RpmPackageKind::Source || !path.exists() {
                    copy_file(&source_package, &path)?;
                }

                let flags = match self.kind {
                    RpmPackageKind::Binary => "-tb",
                    RpmPackageKind::Source => "-ts",
                };
                self.rpmbuild(flags, &filename, &self.context.build_directory)
            }
            RpmFlavor::SetupPy => {
                let Some(spec_path) = self.prepare_spec_file(source, &source_package, &version)?
                else {
                    tracing::error!("Unable to generate rpm spec file.");
                    return Ok(false);
                };

                let flags = match self.kind {
                    RpmPackageKind::Binary => "-bb",
                    RpmPackageKind::Source => "-bs",
                };
                let spec_filename = format!("SPECS/{}", file_name(&spec_path));
                self.rpmbuild(flags, &spec_filename, &self.context.rpmbuild_path)
            }
        };

        if successful {
            self.move_packages(&project_name, &version)?;

            if self.kind == RpmPackageKind::Binary {
                let build_path = self
                    .rpmbuild_directory("BUILD")
                    .join(format!("{}-{}", self.setup_name(&project_name), version));
                if build_path.exists() {
                    remove_path(&build_path)?;
                }
            }
        }
        Ok(successful)
    }

    fn clean(&self, source: &mut dyn SourceHelper) -> Result<()> {
        let Some(version) = source.project_version() else {
            return Ok(());
        };
        let version = filename_safe_version(&version);
        let project_name = source.project_name();
        let setup_name = self.setup_name(project_name);
        let build_directory = &self.context.build_directory;

        if self.flavor == RpmFlavor::SetupPy && self.kind == RpmPackageKind::Binary {
            for name in ["build", "dist"] {
                let path = build_directory.join(name);
                if path.exists() {
                    remove_path(&path)?;
                }
            }
            remove_older_source_directories(build_directory, setup_name, version)?;
        } else {
            remove_older_source_directories(build_directory, project_name, version)?;
        }
        remove_older_source_packages(build_directory, project_name, version)?;

        if self.kind == RpmPackageKind::Binary {
            self.remove_older_build_directories(setup_name, version)?;
        }
        self.remove_older_packages(project_name, version)
    }
}

fn strip_python_prefix(name: &str) -> &str {
    ["python-", "python2-", "python3-"]
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
