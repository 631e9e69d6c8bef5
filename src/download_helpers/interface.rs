//! Download helper trait and the page and file downloading it builds on.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};

use crate::core::ProjectVersionDefinition;
use crate::download_helpers::project::normalize_archive_filename;
use crate::util::url_lib::{request, HttpClient};

/// Fetches release pages and source packages for one download URL.
///
/// The last page is kept in memory, so resolving the latest version and
/// then the download URL costs a single request.
pub struct PageDownloader {
    client: Arc<dyn HttpClient>,
    cached_url: Option<String>,
    cached_page_content: String,
}

impl std::fmt::Debug for PageDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageDownloader")
            .field("cached_url", &self.cached_url)
            .finish_non_exhaustive()
    }
}

impl PageDownloader {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        PageDownloader {
            client,
            cached_url: None,
            cached_page_content: String::new(),
        }
    }

    /// Download the content of a page, using the cache for a repeated URL.
    ///
    /// Returns `None` if the page is not available.
    pub fn download_page_content(&mut self, url: &str) -> Option<&str> {
        if url.is_empty() {
            return None;
        }

        if self.cached_url.as_deref() != Some(url) {
            let body = match request(self.client.as_ref(), url) {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("{}", e);
                    return None;
                }
            };

            self.cached_page_content = String::from_utf8_lossy(&body).into_owned();
            self.cached_url = Some(url.to_string());
        }

        Some(&self.cached_page_content)
    }

    /// Download a file into `directory`, named after the last URL segment.
    ///
    /// An already downloaded file is not fetched again. Network failures
    /// are logged and yield `None`.
    pub fn download_file(&self, url: &str, directory: &Path) -> Result<Option<PathBuf>> {
        let filename = url.rsplit('/').next().unwrap_or(url);
        let path = directory.join(filename);

        if path.exists() {
            return Ok(Some(path));
        }

        tracing::info!("Downloading: {}", url);

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("Downloading {}", filename));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let result = request(self.client.as_ref(), url);
        spinner.finish_and_clear();

        let body = match result {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Unable to download URL: {}", e);
                return Ok(None);
            }
        };

        std::fs::create_dir_all(directory)
            .with_context(|| format!("failed to create directory: {}", directory.display()))?;
        std::fs::write(&path, &body)
            .with_context(|| format!("failed to write file: {}", path.display()))?;

        tracing::debug!(
            "Downloaded {} (sha256: {})",
            filename,
            hex::encode(Sha256::digest(&body))
        );

        Ok(Some(path))
    }
}

/// Resolves versions and downloads source packages of a project.
pub trait DownloadHelper {
    /// Retrieve the download URL of a specific version.
    fn get_download_url(&mut self, project_name: &str, project_version: &str) -> Option<String>;

    /// Retrieve the latest version that satisfies the version definition.
    fn get_latest_version(
        &mut self,
        project_name: &str,
        version_definition: Option<&ProjectVersionDefinition>,
    ) -> Option<String>;

    /// Reverse domain style identifier, such as `com.github.log2timeline.plaso`.
    fn get_project_identifier(&self) -> String;

    /// The downloader used for pages and files.
    fn downloader(&self) -> &PageDownloader;

    /// Download a version of the project into `downloads_directory`.
    ///
    /// GitHub archive names such as `v1.2.tar.gz` are renamed to
    /// `{project}-{version}.tar.gz`.
    fn download(
        &mut self,
        project_name: &str,
        project_version: &str,
        downloads_directory: &Path,
    ) -> Result<Option<PathBuf>> {
        let Some(download_url) = self.get_download_url(project_name, project_version) else {
            tracing::warn!("Unable to determine download URL for: {}", project_name);
            return Ok(None);
        };

        let Some(path) = self
            .downloader()
            .download_file(&download_url, downloads_directory)?
        else {
            return Ok(None);
        };

        normalize_archive_filename(&path, project_name, project_version).map(Some)
    }
}
