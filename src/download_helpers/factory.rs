//! Selection of the download helper for a project definition.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::core::ProjectDefinition;
use crate::download_helpers::github::GitHubReleasesDownloadHelper;
use crate::download_helpers::interface::DownloadHelper;
use crate::download_helpers::pypi::PyPIDownloadHelper;
use crate::download_helpers::sourceforge::SourceForgeDownloadHelper;
use crate::download_helpers::zlib::ZlibDownloadHelper;
use crate::util::url_lib::HttpClient;

/// Unify a download URL for the helper check: no trailing `/`, `http`
/// scheme and no query.
pub fn normalize_download_url(download_url: &str) -> String {
    let url = download_url.strip_suffix('/').unwrap_or(download_url);
    let url = match url.strip_prefix("https://") {
        Some(rest) => format!("http://{}", rest),
        None => url.to_string(),
    };
    match url.split_once('?') {
        Some((url, _)) => url.to_string(),
        None => url,
    }
}

/// Create the download helper that handles the project's download URL.
pub fn new_download_helper(
    definition: &ProjectDefinition,
    client: Arc<dyn HttpClient>,
) -> Result<Box<dyn DownloadHelper>> {
    let download_url = normalize_download_url(&definition.download_url);

    if download_url.starts_with("http://pypi.org/project/") {
        let helper = PyPIDownloadHelper::new(
            &download_url,
            definition.pypi_source_name.as_deref(),
            client,
        )?;
        return Ok(Box::new(helper));
    }

    if download_url.starts_with("http://sourceforge.net/projects/")
        && download_url.ends_with("/files")
    {
        return Ok(Box::new(SourceForgeDownloadHelper::new(&download_url, client)?));
    }

    if download_url.starts_with("http://github.com/") && download_url.ends_with("/releases") {
        return Ok(Box::new(GitHubReleasesDownloadHelper::new(&download_url, client)?));
    }

    if download_url.starts_with("http://www.zlib.net") {
        return Ok(Box::new(ZlibDownloadHelper::new(&download_url, client)?));
    }

    bail!("Unsupported download URL: {}", definition.download_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockHttpClient;

    fn identifier(download_url: &str) -> Result<String> {
        let mut definition = ProjectDefinition::new("project");
        definition.download_url = download_url.to_string();
        let helper = new_download_helper(&definition, Arc::new(MockHttpClient::new()))?;
        Ok(helper.get_project_identifier())
    }

    #[test]
    fn test_normalize_download_url() {
        assert_eq!(
            normalize_download_url("https://github.com/log2timeline/plaso/releases/?page=2"),
            "http://github.com/log2timeline/plaso/releases"
        );
        assert_eq!(normalize_download_url("http://www.zlib.net/"), "http://www.zlib.net");
    }

    #[test]
    fn test_selects_helper() {
        assert_eq!(
            identifier("https://github.com/log2timeline/plaso/releases").unwrap(),
            "com.github.log2timeline.plaso"
        );
        assert_eq!(
            identifier("https://pypi.org/project/construct/").unwrap(),
            "org.pypi.construct"
        );
        assert_eq!(
            identifier("https://sourceforge.net/projects/pyparsing/files").unwrap(),
            "net.sourceforge.projects.pyparsing"
        );
        assert_eq!(identifier("http://www.zlib.net").unwrap(), "net.zlib.zlib");
    }

    #[test]
    fn test_unsupported_url() {
        let err = identifier("https://example.com/downloads").unwrap_err();
        assert!(err.to_string().contains("Unsupported download URL"));

        assert!(identifier("https://github.com/log2timeline/plaso").is_err());
    }
}
