//! Source code from a downloaded source package.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;

use crate::core::ProjectDefinition;
use crate::download_helpers::DownloadHelper;
use crate::sources::archive;
use crate::sources::source::SourceHelper;
use crate::util::fs::{glob_paths, remove_path, remove_stale};

/// Extensions of source packages that are cleaned up.
/// Extensions of the source packages that are downloaded.
pub const SOURCE_PACKAGE_EXTENSIONS: &[&str] = &["tar.gz", "tgz", "zip", "tar.bz2"];

/// Manages the source package of a project.
///
/// Packages are downloaded into the downloads directory and extracted into
/// the build directory.
pub struct SourcePackageHelper {
    project_name: String,
    definition: Option<ProjectDefinition>,
    downloads_directory: PathBuf,
    build_directory: PathBuf,
    download_helper: Box<dyn DownloadHelper>,
    project_version: Option<String>,
    source_package_path: Option<PathBuf>,
    source_directory_path: Option<PathBuf>,
}

impl std::fmt::Debug for SourcePackageHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourcePackageHelper")
            .field("project_name", &self.project_name)
            .field("project_version", &self.project_version)
            .field("source_package_path", &self.source_package_path)
            .field("source_directory_path", &self.source_directory_path)
            .finish_non_exhaustive()
    }
}

impl SourcePackageHelper {
    pub fn new(
        project_name: impl Into<String>,
        definition: Option<ProjectDefinition>,
        downloads_directory: impl Into<PathBuf>,
        build_directory: impl Into<PathBuf>,
        download_helper: Box<dyn DownloadHelper>,
    ) -> Self {
        SourcePackageHelper {
            project_name: project_name.into(),
            definition,
            downloads_directory: downloads_directory.into(),
            build_directory: build_directory.into(),
            download_helper,
            project_version: None,
            source_package_path: None,
            source_directory_path: None,
        }
    }

    pub fn downloads_directory(&self) -> &Path {
        &self.downloads_directory
    }

    /// Download the source package, unless it was downloaded before.
    pub fn download(&mut self) -> Result<Option<PathBuf>> {
        if self.source_package_path.is_none() {
            let Some(project_version) = self.project_version() else {
                return Ok(None);
            };

            std::fs::create_dir_all(&self.downloads_directory).with_context(|| {
                format!(
                    "failed to create directory: {}",
                    self.downloads_directory.display()
                )
            })?;

            self.source_package_path = self.download_helper.download(
                &self.project_name,
                &project_version,
                &self.downloads_directory,
            )?;
        }

        Ok(self.source_package_path.clone())
    }

    /// File name of the source package, downloading it first when needed.
    pub fn source_package_filename(&mut self) -> Result<Option<String>> {
        Ok(self.download()?.and_then(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        }))
    }

    fn keep_expression(&self, project_version: &str) -> Result<Regex> {
        let expression = format!(
            "^{}-.*{}",
            regex::escape(&self.project_name),
            regex::escape(project_version)
        );
        Regex::new(&expression).with_context(|| format!("invalid expression: {}", expression))
    }
}

impl SourceHelper for SourcePackageHelper {
    fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Resolved once through the download helper and cached.
    fn project_version(&mut self) -> Option<String> {
        if self.project_version.is_none() {
            let version_definition = self.definition.as_ref().map(|d| &d.version);
            self.project_version = self
                .download_helper
                .get_latest_version(&self.project_name, version_definition);
        }
        self.project_version.clone()
    }

    /// Remove older source packages and extracted source directories.
    fn clean(&mut self) -> Result<()> {
        let Some(project_version) = self.project_version() else {
            return Ok(());
        };
        let keep = self.keep_expression(&project_version)?;

        let patterns: Vec<String> = SOURCE_PACKAGE_EXTENSIONS
            .iter()
            .map(|extension| format!("{}-*[0-9]*.{}", self.project_name, extension))
            .collect();
        remove_stale(&self.downloads_directory, &patterns, &keep)?;

        let pattern = format!("{}-[0-9]*", self.project_name);
        for path in glob_paths(&self.build_directory, &pattern)? {
            let is_current = path
                .file_name()
                .map(|name| keep.is_match(&name.to_string_lossy()))
                .unwrap_or(false);
            if path.is_dir() && !is_current {
                remove_path(&path)?;
            }
        }

        Ok(())
    }

    /// Extract the source package into the build directory.
    fn create(&mut self) -> Result<Option<PathBuf>> {
        let source_package_path = match &self.source_package_path {
            Some(path) if path.exists() => path.clone(),
            _ => {
                tracing::info!("Missing source package of: {}", self.project_name);
                return Ok(None);
            }
        };

        std::fs::create_dir_all(&self.build_directory).with_context(|| {
            format!("failed to create directory: {}", self.build_directory.display())
        })?;

        self.source_directory_path = archive::extract(&source_package_path, &self.build_directory)?
            .map(|name| self.build_directory.join(name));

        Ok(self.source_directory_path.clone())
    }

    fn source_directory_path(&self) -> Option<&Path> {
        self.source_directory_path.as_deref()
    }

    fn source_package_path(&mut self) -> Result<Option<PathBuf>> {
        self.download()
    }

    fn project_identifier(&self) -> Option<String> {
        Some(self.download_helper.get_project_identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download_helpers::ZlibDownloadHelper;
    use crate::test_support::{create_tar_gz, MockHttpClient, MockHttpResponse};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn zlib_helper(tmp: &TempDir, client: Arc<MockHttpClient>) -> SourcePackageHelper {
        let download_helper = ZlibDownloadHelper::new("http://www.zlib.net", client).unwrap();
        SourcePackageHelper::new(
            "zlib",
            None,
            tmp.path().join("downloads"),
            tmp.path().join("build"),
            Box::new(download_helper),
        )
    }

    fn zlib_client(archive: Vec<u8>) -> Arc<MockHttpClient> {
        let client = Arc::new(MockHttpClient::new());
        client.mock_url(
            "http://www.zlib.net",
            MockHttpResponse::ok(r#"<A HREF="zlib-1.2.11.tar.gz">zlib</A>"#),
        );
        client.mock_url("http://zlib.net/zlib-1.2.11.tar.gz", MockHttpResponse::ok(archive));
        client
    }

    fn zlib_archive(tmp: &TempDir) -> Vec<u8> {
        let path = create_tar_gz(
            &tmp.path().join("archive.tar.gz"),
            &[("zlib-1.2.11/configure", "#!/bin/sh\n")],
        );
        std::fs::read(path).unwrap()
    }

    #[test]
    fn test_project_version_is_cached() {
        let tmp = TempDir::new().unwrap();
        let client = zlib_client(Vec::new());
        let mut helper = zlib_helper(&tmp, client.clone());

        assert_eq!(helper.project_version(), Some("1.2.11".to_string()));
        assert_eq!(helper.project_version(), Some("1.2.11".to_string()));
        assert_eq!(client.request_count("http://www.zlib.net"), 1);
        assert_eq!(helper.project_identifier().as_deref(), Some("net.zlib.zlib"));
    }

    #[test]
    fn test_download_and_create() {
        let tmp = TempDir::new().unwrap();
        let client = zlib_client(zlib_archive(&tmp));
        let mut helper = zlib_helper(&tmp, client);

        assert!(helper.create().unwrap().is_none());

        let path = helper.download().unwrap().unwrap();
        assert_eq!(path, tmp.path().join("downloads/zlib-1.2.11.tar.gz"));
        assert_eq!(
            helper.source_package_filename().unwrap().as_deref(),
            Some("zlib-1.2.11.tar.gz")
        );

        let source_directory = helper.create().unwrap().unwrap();
        assert_eq!(source_directory, tmp.path().join("build/zlib-1.2.11"));
        assert!(source_directory.join("configure").exists());
        assert_eq!(helper.source_directory_path(), Some(source_directory.as_path()));
    }

    #[test]
    fn test_clean_keeps_current_version() {
        let tmp = TempDir::new().unwrap();
        let downloads = tmp.path().join("downloads");
        let build = tmp.path().join("build");
        std::fs::create_dir_all(&downloads).unwrap();
        std::fs::create_dir_all(build.join("zlib-1.2.8")).unwrap();
        std::fs::create_dir_all(build.join("zlib-1.2.11")).unwrap();
        for name in ["zlib-1.2.8.tar.gz", "zlib-1.2.9.zip", "zlib-1.2.11.tar.gz", "zlibc-1.0.tar.gz"] {
            std::fs::write(downloads.join(name), "").unwrap();
        }

        let mut helper = zlib_helper(&tmp, zlib_client(Vec::new()));
        helper.clean().unwrap();

        assert!(!downloads.join("zlib-1.2.8.tar.gz").exists());
        assert!(!downloads.join("zlib-1.2.9.zip").exists());
        assert!(downloads.join("zlib-1.2.11.tar.gz").exists());
        assert!(downloads.join("zlibc-1.0.tar.gz").exists());
        assert!(!build.join("zlib-1.2.8").exists());
        assert!(build.join("zlib-1.2.11").exists());
    }

    #[test]
    fn test_download_without_version() {
        let tmp = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::new());
        let mut helper = zlib_helper(&tmp, client);

        assert!(helper.download().unwrap().is_none());
        helper.clean().unwrap();
    }
}
