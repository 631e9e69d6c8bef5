//! Source helper trait - common interface for project source code.

use std::path::{Path, PathBuf};

use anyhow::Result;

/// Provides the source directory of a project to the build helpers.
pub trait SourceHelper {
    /// Name of the project.
    fn project_name(&self) -> &str;

    /// Version of the source, if known.
    fn project_version(&mut self) -> Option<String>;

    /// Remove previous versions of the source.
    fn clean(&mut self) -> Result<()>;

    /// Create the source directory.
    ///
    /// Returns the path of the source directory or `None` on failure.
    fn create(&mut self) -> Result<Option<PathBuf>>;

    /// Path of the source directory after a successful [`create`].
    ///
    /// [`create`]: SourceHelper::create
    fn source_directory_path(&self) -> Option<&Path>;

    /// Path of the source package, downloading it first when needed.
    ///
    /// Sources that are not packaged return `None`.
    fn source_package_path(&mut self) -> Result<Option<PathBuf>>;

    /// Reverse domain style project identifier, if the source has one.
    fn project_identifier(&self) -> Option<String>;
}
