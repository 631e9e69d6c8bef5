//! Download helper for zlib.

use std::sync::{Arc, LazyLock};

use anyhow::{bail, Result};
use regex::Regex;

use crate::core::{version_tuple, ProjectVersionDefinition};
use crate::download_helpers::interface::{DownloadHelper, PageDownloader};
use crate::download_helpers::project::AvailableVersions;
use crate::util::url_lib::HttpClient;

static RELEASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<A HREF="zlib-([0-9]+.[0-9]+.[0-9]+).tar.gz""#).unwrap());

const HOMEPAGE_URL: &str = "http://www.zlib.net";

#[derive(Debug)]
pub struct ZlibDownloadHelper {
    downloader: PageDownloader,
}

impl ZlibDownloadHelper {
    pub fn new(download_url: &str, client: Arc<dyn HttpClient>) -> Result<Self> {
        let segments: Vec<&str> = download_url.split('/').collect();
        if segments.len() < 3 || segments[2] != "www.zlib.net" {
            bail!("Unsupported download URL: {}", download_url);
        }

        Ok(ZlibDownloadHelper {
            downloader: PageDownloader::new(client),
        })
    }
}

impl DownloadHelper for ZlibDownloadHelper {
    /// The version definition is not used, zlib is always the latest release.
    fn get_latest_version(
        &mut self,
        _project_name: &str,
        _version_definition: Option<&ProjectVersionDefinition>,
    ) -> Option<String> {
        let content = self.downloader.download_page_content(HOMEPAGE_URL)?;

        let mut available = AvailableVersions::new();
        for captures in RELEASE_RE.captures_iter(content) {
            let version = &captures[1];
            if let Some(parts) = version_tuple(version) {
                available.insert(version, parts);
            }
        }

        available.latest(None, None, false)
    }

    fn get_download_url(&mut self, _project_name: &str, project_version: &str) -> Option<String> {
        Some(format!("http://zlib.net/zlib-{}.tar.gz", project_version))
    }

    fn get_project_identifier(&self) -> String {
        "net.zlib.zlib".to_string()
    }

    fn downloader(&self) -> &PageDownloader {
        &self.downloader
    }
}
