//! Download helper for projects hosted on SourceForge.
//!
//! Only the release layout of pyparsing is recognized.

use std::sync::Arc;

use anyhow::{bail, Result};
use regex::RegexBuilder;

use crate::core::{version_tuple, ProjectVersionDefinition};
use crate::download_helpers::interface::{DownloadHelper, PageDownloader};
use crate::download_helpers::project::{pinned_version, AvailableVersions};
use crate::util::url_lib::HttpClient;

#[derive(Debug)]
pub struct SourceForgeDownloadHelper {
    downloader: PageDownloader,
    project_name: String,
}

impl SourceForgeDownloadHelper {
    /// Create a helper for a `sourceforge.net/projects/{name}/files` URL.
    pub fn new(download_url: &str, client: Arc<dyn HttpClient>) -> Result<Self> {
        let segments: Vec<&str> = download_url.split('/').collect();
        if segments.len() < 6
            || segments[2] != "sourceforge.net"
            || segments[3] != "projects"
            || segments[5] != "files"
        {
            bail!("Unsupported download URL: {}", download_url);
        }

        Ok(SourceForgeDownloadHelper {
            downloader: PageDownloader::new(client),
            project_name: segments[4].to_string(),
        })
    }

    fn files_url(&self) -> String {
        format!(
            "https://sourceforge.net/projects/{0}/files/{0}/",
            self.project_name
        )
    }

    fn release_expression(&self, version: &str) -> String {
        let project = regex::escape(&self.project_name);
        format!(r#"<a href="/projects/{project}/files/{project}/{project}-({version})/""#)
    }
}

impl DownloadHelper for SourceForgeDownloadHelper {
    fn get_latest_version(
        &mut self,
        _project_name: &str,
        version_definition: Option<&ProjectVersionDefinition>,
    ) -> Option<String> {
        if let Some(version) = pinned_version(version_definition) {
            return Some(version);
        }

        if self.project_name != "pyparsing" {
            return None;
        }

        let expression = self.release_expression("[0-9]+[.][0-9]+[.][0-9]+");
        let regex = RegexBuilder::new(&expression)
            .case_insensitive(true)
            .build()
            .ok()?;

        let url = self.files_url();
        let content = self.downloader.download_page_content(&url)?;

        let mut available = AvailableVersions::new();
        for captures in regex.captures_iter(content) {
            let version = &captures[1];
            if let Some(parts) = version_tuple(version) {
                available.insert(version, parts);
            }
        }

        available.latest(None, None, false)
    }

    fn get_download_url(&mut self, _project_name: &str, project_version: &str) -> Option<String> {
        if self.project_name != "pyparsing" {
            return None;
        }

        let expression = self.release_expression(&regex::escape(project_version));
        let regex = RegexBuilder::new(&expression)
            .case_insensitive(true)
            .build()
            .ok()?;

        let url = self.files_url();
        let content = self.downloader.download_page_content(&url)?;
        if !regex.is_match(content) {
            return None;
        }

        Some(format!(
            "https://downloads.sourceforge.net/project/{0}/{0}/{0}-{1}/{0}-{1}.tar.gz",
            self.project_name, project_version
        ))
    }

    fn get_project_identifier(&self) -> String {
        format!("net.sourceforge.projects.{}", self.project_name)
    }

    fn downloader(&self) -> &PageDownloader {
        &self.downloader
    }
}
