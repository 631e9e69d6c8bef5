//! Build helper trait and the context shared by all packaging formats.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;
use thiserror::Error;

use crate::core::ProjectDefinition;
use crate::sources::package::SOURCE_PACKAGE_EXTENSIONS;
use crate::sources::SourceHelper;
use crate::util::config::{DEFAULT_OSC_PROJECT, DEFAULT_VERSION_SUFFIX};
use crate::util::fs::{glob_paths, move_file, remove_path};
use crate::util::process::ProcessBuilder;
use crate::util::url_lib::HttpClient;

/// Name of the file the output of the packaging tools is written to.
pub const LOG_FILENAME: &str = "build.log";

/// Documented build failures.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Missing setup.py cannot build wheel")]
    MissingSetupPy,

    #[error("Unable to determine Visual Studio version")]
    MissingVisualStudio,

    #[error("Missing source directory of: {0}")]
    MissingSourceDirectory(String),
}

/// Everything a build helper needs to know besides the source.
#[derive(Clone)]
pub struct BuildContext {
    /// Definition of the project to build
    pub definition: ProjectDefinition,

    /// Directory with the dpkg/rpm templates, patches, licenses and
    /// msi_prebuild scripts
    pub data_path: PathBuf,

    /// Definitions of all projects, by name
    pub dependency_definitions: BTreeMap<String, ProjectDefinition>,

    /// Directory the sources are extracted into and artifacts are written to
    pub build_directory: PathBuf,

    /// Directory source packages of build dependencies are downloaded to
    pub downloads_directory: PathBuf,

    /// Distribution of dpkg source packages
    pub distribution: Option<String>,

    /// Suffix of dpkg source package versions
    pub version_suffix: String,

    /// Open Build Service project
    pub osc_project: String,

    /// Root of the rpmbuild tree
    pub rpmbuild_path: PathBuf,

    /// Architecture override, detected from the host when unset
    pub architecture: Option<String>,

    /// Python `major.minor` version, detected from the interpreter when unset
    pub python_version: Option<String>,

    /// Client used to download build dependencies
    pub http_client: Option<Arc<dyn HttpClient>>,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("project", &self.definition.name)
            .field("data_path", &self.data_path)
            .field("build_directory", &self.build_directory)
            .field("distribution", &self.distribution)
            .field("version_suffix", &self.version_suffix)
            .field("osc_project", &self.osc_project)
            .field("rpmbuild_path", &self.rpmbuild_path)
            .field("architecture", &self.architecture)
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    /// Create a new build context.
    pub fn new(
        definition: ProjectDefinition,
        data_path: impl Into<PathBuf>,
        build_directory: impl Into<PathBuf>,
    ) -> Self {
        let build_directory = build_directory.into();
        BuildContext {
            definition,
            data_path: data_path.into(),
            dependency_definitions: BTreeMap::new(),
            downloads_directory: build_directory.clone(),
            build_directory,
            distribution: None,
            version_suffix: DEFAULT_VERSION_SUFFIX.to_string(),
            osc_project: DEFAULT_OSC_PROJECT.to_string(),
            rpmbuild_path: default_rpmbuild_path(),
            architecture: None,
            python_version: None,
            http_client: None,
        }
    }

    /// Set the definitions of all projects.
    pub fn with_dependency_definitions(
        mut self,
        definitions: BTreeMap<String, ProjectDefinition>,
    ) -> Self {
        self.dependency_definitions = definitions;
        self
    }

    /// Set the downloads directory.
    pub fn with_downloads_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.downloads_directory = path.into();
        self
    }

    /// Set the distribution.
    pub fn with_distribution(mut self, distribution: Option<String>) -> Self {
        self.distribution = distribution;
        self
    }

    /// Set the version suffix.
    pub fn with_version_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.version_suffix = suffix.into();
        self
    }

    /// Set the Open Build Service project.
    pub fn with_osc_project(mut self, project: impl Into<String>) -> Self {
        self.osc_project = project.into();
        self
    }

    /// Set the rpmbuild tree.
    pub fn with_rpmbuild_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rpmbuild_path = path.into();
        self
    }

    /// Set the architecture.
    pub fn with_architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = Some(architecture.into());
        self
    }

    /// Set the Python version.
    pub fn with_python_version(mut self, version: impl Into<String>) -> Self {
        self.python_version = Some(version.into());
        self
    }

    /// Set the HTTP client.
    pub fn with_http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Path of the build log.
    pub fn log_path(&self) -> PathBuf {
        self.build_directory.join(LOG_FILENAME)
    }
}

/// Builds the packages of one project for one packaging format.
pub trait BuildHelper {
    /// The context the helper was created with.
    fn context(&self) -> &BuildContext;

    /// Names of the build dependencies that are not available.
    fn check_build_dependencies(&self) -> Vec<String> {
        self.context().definition.build_dependencies.clone()
    }

    /// Whether the build is required, that is the packages of the current
    /// version were not built before.
    fn check_build_required(&self, _source: &mut dyn SourceHelper) -> bool {
        true
    }

    /// Build the packages.
    ///
    /// Returns `Ok(false)` when a packaging tool failed. The failing command
    /// is logged.
    fn build(&self, source: &mut dyn SourceHelper) -> Result<bool>;

    /// Remove the packages of previous versions.
    fn clean(&self, source: &mut dyn SourceHelper) -> Result<()>;

    /// Whether the environment allows building, for example there are no
    /// uncommitted changes.
    fn check_project_configuration(&self) -> bool {
        true
    }
}

fn default_rpmbuild_path() -> PathBuf {
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join("rpmbuild"),
        None => PathBuf::from("rpmbuild"),
    }
}

/// Source directory of a created source.
pub(crate) fn source_directory(source: &dyn SourceHelper) -> Result<PathBuf> {
    source
        .source_directory_path()
        .map(Path::to_path_buf)
        .ok_or_else(|| BuildError::MissingSourceDirectory(source.project_name().to_string()).into())
}

/// Version without a `1!` epoch, for use in file names.
pub fn filename_safe_version(version: &str) -> &str {
    version.strip_prefix("1!").unwrap_or(version)
}

/// Remove everything matching `patterns` in `directory` unless its file name
/// matches `keep`. Patterns are glob patterns relative to `directory`.
pub(crate) fn remove_unless(directory: &Path, patterns: &[String], keep: &str) -> Result<()> {
    let keep = Regex::new(keep).with_context(|| format!("invalid expression: {}", keep))?;
    crate::util::fs::remove_stale(directory, patterns, &keep)
}

/// Remove source directories of previous versions.
pub fn remove_older_source_directories(directory: &Path, name: &str, version: &str) -> Result<()> {
    let keep = Regex::new(&format!("^{}-.*{}", regex::escape(name), regex::escape(version)))?;
    let pattern = format!("{}-[0-9]*", glob::Pattern::escape(name));

    for path in glob_paths(directory, &pattern)? {
        if !path.is_dir() {
            continue;
        }
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !keep.is_match(&file_name) {
            remove_path(&path)?;
        }
    }
    Ok(())
}

/// Remove source packages of previous versions.
pub fn remove_older_source_packages(directory: &Path, name: &str, version: &str) -> Result<()> {
    let escaped = glob::Pattern::escape(name);
    let patterns: Vec<String> = SOURCE_PACKAGE_EXTENSIONS
        .iter()
        .map(|extension| format!("{}-[0-9]*.{}", escaped, extension))
        .collect();

    // Anchor the version on the extension dot since `tar.bz2` ends in a digit.
    remove_unless(
        directory,
        &patterns,
        &format!("^{}-.*{}\\.", regex::escape(name), regex::escape(version)),
    )
}

/// Move every file matching `pattern` in `from` into `to`.
///
/// Returns the paths the files were moved to.
pub(crate) fn move_matching(from: &Path, pattern: &str, to: &Path) -> Result<Vec<PathBuf>> {
    let mut moved = Vec::new();
    for path in glob_paths(from, pattern)? {
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let destination = to.join(file_name);
        tracing::info!("Moving: {} to: {}", path.display(), to.display());
        move_file(&path, &destination)?;
        moved.push(destination);
    }
    Ok(moved)
}

/// Machine name of the host as reported by `uname -m`.
pub fn machine() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "i686",
        arch => arch,
    }
}

/// Whether a native package is installed according to a query command such
/// as `dpkg-query -s`.
pub(crate) fn package_installed(program: &str, args: &[&str], package: &str) -> bool {
    ProcessBuilder::new(program)
        .args(args)
        .arg(package)
        .exec()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// `major.minor` version of the Python interpreter.
pub(crate) fn python_version(context: &BuildContext) -> String {
    if let Some(ref version) = context.python_version {
        return version.clone();
    }

    let output = ProcessBuilder::new(crate::util::process::find_python())
        .args([
            "-c",
            "import sys; print('{0}.{1}'.format(*sys.version_info[:2]))",
        ])
        .exec();

    match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        _ => {
            tracing::warn!("Unable to determine Python version");
            "3".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_filename_safe_version() {
        assert_eq!(filename_safe_version("1!2.1"), "2.1");
        assert_eq!(filename_safe_version("20240101"), "20240101");
    }

    #[test]
    fn test_remove_older_source_directories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("libbde-20190101")).unwrap();
        fs::create_dir(tmp.path().join("libbde-20200101")).unwrap();
        fs::write(tmp.path().join("libbde-20190101.tar.gz"), "").unwrap();

        remove_older_source_directories(tmp.path(), "libbde", "20200101").unwrap();

        assert!(!tmp.path().join("libbde-20190101").exists());
        assert!(tmp.path().join("libbde-20200101").exists());
        assert!(tmp.path().join("libbde-20190101.tar.gz").exists());
    }

    #[test]
    fn test_remove_older_source_packages() {
        let tmp = TempDir::new().unwrap();
        for name in [
            "dfvfs-20190101.tar.gz",
            "dfvfs-20190101.zip",
            "dfvfs-20200101.tar.gz",
            "dfvfs-tools.tar.gz",
        ] {
            fs::write(tmp.path().join(name), "").unwrap();
        }

        remove_older_source_packages(tmp.path(), "dfvfs", "20200101").unwrap();

        assert!(!tmp.path().join("dfvfs-20190101.tar.gz").exists());
        assert!(!tmp.path().join("dfvfs-20190101.zip").exists());
        assert!(tmp.path().join("dfvfs-20200101.tar.gz").exists());
        assert!(tmp.path().join("dfvfs-tools.tar.gz").exists());
    }

    #[test]
    fn test_remove_older_source_packages_tar_bz2() {
        let tmp = TempDir::new().unwrap();
        for name in ["project-1.tar.bz2", "project-2.tar.bz2", "project-1.tgz"] {
            fs::write(tmp.path().join(name), "").unwrap();
        }

        remove_older_source_packages(tmp.path(), "project", "2").unwrap();

        assert!(!tmp.path().join("project-1.tar.bz2").exists());
        assert!(!tmp.path().join("project-1.tgz").exists());
        assert!(tmp.path().join("project-2.tar.bz2").exists());
    }

    #[test]
    fn test_move_matching() {
        let tmp = TempDir::new().unwrap();
        let dist = tmp.path().join("dist");
        fs::create_dir(&dist).unwrap();
        fs::write(dist.join("plaso-20240101-py3-none-any.whl"), "").unwrap();
        fs::write(dist.join("plaso-20240101.tar.gz"), "").unwrap();

        let moved = move_matching(&dist, "plaso-*.whl", tmp.path()).unwrap();

        assert_eq!(moved, vec![tmp.path().join("plaso-20240101-py3-none-any.whl")]);
        assert!(dist.join("plaso-20240101.tar.gz").exists());
    }

    #[test]
    fn test_context_builder() {
        let context = BuildContext::new(ProjectDefinition::new("libyal"), "data", "build")
            .with_distribution(Some("focal".to_string()))
            .with_architecture("amd64");

        assert_eq!(context.distribution.as_deref(), Some("focal"));
        assert_eq!(context.architecture.as_deref(), Some("amd64"));
        assert_eq!(context.version_suffix, "ppa1");
        assert_eq!(context.log_path(), Path::new("build").join("build.log"));
    }
}
