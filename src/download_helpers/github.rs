//! Download helper for projects released on GitHub.

use std::sync::Arc;

use anyhow::{bail, Result};
use regex::{Regex, RegexBuilder};

use crate::core::{version_tuple, ProjectVersionDefinition};
use crate::download_helpers::interface::{DownloadHelper, PageDownloader};
use crate::download_helpers::project::{pinned_version, AvailableVersions};
use crate::util::url_lib::HttpClient;

/// Version notations used in release tags and asset names.
const VERSION_EXPRESSIONS: &[&str] = &[
    "[0-9]+",
    "[0-9]+-pre",
    "[0-9]+[.][0-9]+",
    "[0-9]+[.][0-9]+[.][0-9]+",
    "release-[0-9]+[.][0-9]+[.][0-9]+",
    "v[0-9]+[.][0-9]",
    "v[0-9]+[.][0-9]+[.][0-9]+",
    "[0-9]+[.][0-9]+[.][0-9]+[-][0-9]+",
];

fn case_insensitive(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!("Invalid expression: {}: {}", pattern, e);
            None
        }
    }
}

/// Collect the first capture group of every match.
fn find_all(pattern: &str, content: &str) -> Vec<String> {
    let Some(regex) = case_insensitive(pattern) else {
        return Vec::new();
    };
    regex
        .captures_iter(content)
        .filter_map(|captures| captures.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Helps in downloading a project with GitHub releases.
#[derive(Debug)]
pub struct GitHubReleasesDownloadHelper {
    downloader: PageDownloader,
    organization: String,
    repository: String,
}

impl GitHubReleasesDownloadHelper {
    /// Create a helper for a `github.com/{organization}/{repository}/...` URL.
    pub fn new(download_url: &str, client: Arc<dyn HttpClient>) -> Result<Self> {
        let segments: Vec<&str> = download_url.split('/').collect();
        if segments.len() < 5 || segments[2] != "github.com" {
            bail!("Unsupported download URL: {}", download_url);
        }

        Ok(GitHubReleasesDownloadHelper {
            downloader: PageDownloader::new(client),
            organization: segments[3].to_string(),
            repository: segments[4].to_string(),
        })
    }

    fn releases_url(&self) -> String {
        format!(
            "https://github.com/{}/{}/releases",
            self.organization, self.repository
        )
    }

    fn prefix(&self) -> String {
        format!(
            "/{}/{}",
            regex::escape(&self.organization),
            regex::escape(&self.repository)
        )
    }

    /// Strip `release-`, `v` and `-pre` from matched versions and split the
    /// remainder into numbers.
    fn available_versions(version_strings: &[String]) -> AvailableVersions {
        let mut available = AvailableVersions::new();

        for version_string in version_strings {
            let mut version = version_string.as_str();
            if let Some(stripped) = version.strip_prefix("release-") {
                version = stripped;
            } else if let Some(stripped) = version.strip_prefix('v') {
                version = stripped;
            }
            if let Some(stripped) = version.strip_suffix("-pre") {
                version = stripped;
            }
            if version.is_empty() {
                continue;
            }

            match version_tuple(version) {
                Some(parts) => available.insert(version, parts),
                None => tracing::debug!("Ignoring non-numeric version: {}", version_string),
            }
        }

        available
    }
}

impl DownloadHelper for GitHubReleasesDownloadHelper {
    fn get_latest_version(
        &mut self,
        project_name: &str,
        version_definition: Option<&ProjectVersionDefinition>,
    ) -> Option<String> {
        if let Some(version) = pinned_version(version_definition) {
            return Some(version);
        }

        let prefix = self.prefix();
        let project = regex::escape(project_name);
        let versions = VERSION_EXPRESSIONS.join("|");
        let url = self.releases_url();
        let content = self.downloader.download_page_content(&url)?;

        let expressions = [
            format!(r#"<a href="{prefix}/releases/tag/([^"]*)"[^>]*>[^<]*</a>"#),
            format!(r"{prefix}/releases/download/[^/]*/{project}-[a-z-]*({versions})[.]tar[.]gz[^.]"),
            format!(r"{prefix}/archive/refs/tags/({versions})[.]tar[.]gz[^.]"),
            format!(r"{prefix}/archive/refs/tags/{project}[-]({versions})[.]tar[.]gz[^.]"),
        ];

        let matches = expressions
            .iter()
            .map(|expression| find_all(expression, content))
            .find(|matches| !matches.is_empty())?;

        let available = Self::available_versions(&matches);
        let earliest = version_definition.and_then(|d| d.earliest_version());
        let latest = version_definition.and_then(|d| d.latest_version());
        available.latest(earliest, latest, false)
    }

    fn get_download_url(&mut self, project_name: &str, project_version: &str) -> Option<String> {
        let prefix = self.prefix();
        let project = regex::escape(project_name);
        let version = regex::escape(project_version);
        let organization = self.organization.clone();
        let repository = self.repository.clone();
        let url = self.releases_url();
        let content = self.downloader.download_page_content(&url)?;

        // A release tag link naming the version points at the release asset.
        let expression = format!(r#"<a href="{prefix}/releases/tag/(.*{version}[^"]*)"[^>]*>([^<]*)</a>"#);
        if let Some(regex) = case_insensitive(&expression) {
            let matches: Vec<(String, String)> = regex
                .captures_iter(content)
                .filter_map(|c| Some((c.get(1)?.as_str().to_string(), c.get(2)?.as_str().to_string())))
                .collect();
            if let [(tag, text)] = matches.as_slice() {
                return Some(format!(
                    "https://github.com/{}/{}/releases/download/{}/{}.tar.gz",
                    organization,
                    repository,
                    tag,
                    text.replace(' ', "-")
                ));
            }
        }

        // Release assets with and without a status suffix.
        let mut matches = find_all(
            &format!(r"({prefix}/releases/download/[^/]*/{project}-[a-z-]*{version}[.]tar[.]gz)[^.]"),
            content,
        );
        if matches.len() != 1 {
            matches = find_all(
                &format!(r"({prefix}/releases/download/[^/]*/{project}-*{version}[.]tar[.]gz)[^.]"),
                content,
            );
        }
        match matches.len() {
            0 => {}
            1 => return Some(format!("https://github.com{}", matches[0])),
            _ => return None,
        }

        // Source archives of tags.
        let tag_expressions = [
            format!(r"({prefix}/archive/refs/tags/{version}[.]tar[.]gz)[^.]"),
            format!(r"({prefix}/archive/refs/tags/release-{version}[.]tar[.]gz)[^.]"),
            format!(r"({prefix}/archive/refs/tags/v{version}[.]tar[.]gz)[^.]"),
            format!(r"({prefix}/archive/refs/tags/{project}[-]{version}[.]tar[.]gz)[^.]"),
            format!(r"({prefix}/archive/refs/tags/{version}-pre[.]tar[.]gz)[^.]"),
        ];
        for expression in &tag_expressions {
            let matches = find_all(expression, content);
            if let [path] = matches.as_slice() {
                return Some(format!("https://github.com{}", path));
            }
        }

        None
    }

    fn get_project_identifier(&self) -> String {
        format!("com.github.{}.{}", self.organization, self.repository)
    }

    fn downloader(&self) -> &PageDownloader {
        &self.downloader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockHttpClient, MockHttpResponse};

    const RELEASES_URL: &str = "https://github.com/log2timeline/dfvfs/releases";

    fn helper(page: &str) -> (GitHubReleasesDownloadHelper, Arc<MockHttpClient>) {
        let client = Arc::new(MockHttpClient::new());
        client.mock_url(RELEASES_URL, MockHttpResponse::ok(page));
        let helper =
            GitHubReleasesDownloadHelper::new("http://github.com/log2timeline/dfvfs/releases", client.clone())
                .unwrap();
        (helper, client)
    }

    #[test]
    fn test_new_rejects_other_hosts() {
        let client: Arc<dyn HttpClient> = Arc::new(MockHttpClient::new());
        assert!(GitHubReleasesDownloadHelper::new("http://gitlab.com/a/b/releases", client.clone()).is_err());
        assert!(GitHubReleasesDownloadHelper::new("http://github.com/a", client).is_err());
    }

    #[test]
    fn test_project_identifier() {
        let (helper, _) = helper("");
        assert_eq!(helper.get_project_identifier(), "com.github.log2timeline.dfvfs");
    }

    #[test]
    fn test_latest_version_from_tags() {
        let page = concat!(
            r#"<a href="/log2timeline/dfvfs/releases/tag/20190128" class="x">20190128</a>"#,
            "\n",
            r#"<a href="/log2timeline/dfvfs/releases/tag/20200101">dfvfs 20200101</a>"#,
            "\n",
            r#"<a href="/log2timeline/dfvfs/releases/tag/v20191231">v20191231</a>"#,
        );
        let (mut helper, _) = helper(page);

        assert_eq!(
            helper.get_latest_version("dfvfs", None),
            Some("20200101".to_string())
        );

        let definition = ProjectVersionDefinition::new(">=20190101,<20200101");
        assert_eq!(
            helper.get_latest_version("dfvfs", Some(&definition)),
            Some("20191231".to_string())
        );
    }

    #[test]
    fn test_latest_version_pinned_without_network() {
        let (mut helper, client) = helper("");
        let definition = ProjectVersionDefinition::new("==20180101");

        assert_eq!(
            helper.get_latest_version("dfvfs", Some(&definition)),
            Some("20180101".to_string())
        );
        assert!(client.requests().is_empty());
    }

    #[test]
    fn test_latest_version_from_archives() {
        let page = concat!(
            r#"<a href="/log2timeline/dfvfs/archive/refs/tags/v1.2.3.tar.gz" rel="nofollow">"#,
            "\n",
            r#"<a href="/log2timeline/dfvfs/archive/refs/tags/v1.10.0.tar.gz" rel="nofollow">"#,
        );
        let (mut helper, _) = helper(page);

        assert_eq!(
            helper.get_latest_version("dfvfs", None),
            Some("1.10.0".to_string())
        );
    }

    #[test]
    fn test_download_url_from_tag_link() {
        let page = r#"<a href="/log2timeline/dfvfs/releases/tag/20200101">dfvfs 20200101</a>"#;
        let (mut helper, _) = helper(page);

        assert_eq!(
            helper.get_download_url("dfvfs", "20200101"),
            Some(
                "https://github.com/log2timeline/dfvfs/releases/download/20200101/dfvfs-20200101.tar.gz"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_download_url_from_release_asset() {
        let page = r#"<a href="/log2timeline/dfvfs/releases/download/20200101/dfvfs-alpha-20200101.tar.gz" rel="nofollow">"#;
        let (mut helper, _) = helper(page);

        assert_eq!(
            helper.get_download_url("dfvfs", "20200101"),
            Some(
                "https://github.com/log2timeline/dfvfs/releases/download/20200101/dfvfs-alpha-20200101.tar.gz"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_download_url_from_archive_tag() {
        let page = r#"<a href="/log2timeline/dfvfs/archive/refs/tags/v1.2.3.tar.gz" rel="nofollow">"#;
        let (mut helper, client) = helper(page);

        assert_eq!(
            helper.get_download_url("dfvfs", "1.2.3"),
            Some("https://github.com/log2timeline/dfvfs/archive/refs/tags/v1.2.3.tar.gz".to_string())
        );
        assert!(helper.get_download_url("dfvfs", "9.9.9").is_none());
        assert_eq!(client.request_count(RELEASES_URL), 1);
    }
}
