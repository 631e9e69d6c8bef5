//! Download helper for projects published on PyPI.

use std::sync::Arc;

use anyhow::{bail, Result};
use regex::RegexBuilder;
use serde_json::Value;

use crate::core::{version_tuple, ProjectVersionDefinition};
use crate::download_helpers::interface::{DownloadHelper, PageDownloader};
use crate::download_helpers::project::{pinned_version, AvailableVersions};
use crate::util::url_lib::HttpClient;

/// Collect every `url` string in the JSON project metadata.
fn release_urls(page_content: &str) -> Vec<String> {
    fn collect(value: &Value, urls: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (key, value) in map {
                    match value {
                        Value::String(url) if key == "url" => urls.push(url.clone()),
                        _ => collect(value, urls),
                    }
                }
            }
            Value::Array(values) => values.iter().for_each(|value| collect(value, urls)),
            _ => {}
        }
    }

    let mut urls = Vec::new();
    match serde_json::from_str::<Value>(page_content) {
        Ok(value) => collect(&value, &mut urls),
        Err(e) => tracing::warn!("Unable to parse PyPI project metadata: {}", e),
    }
    urls
}

/// Split a PEP 440 version such as `1!2.0.post3` into its epoch and
/// numeric base version. The epoch defaults to 0.
fn comparable_version(version_string: &str) -> Option<Vec<u64>> {
    let (epoch, version) = match version_string.split_once('!') {
        Some((epoch, version)) => (epoch.parse::<u64>().ok()?, version),
        None => (0, version_string),
    };

    let base = match version.find("post") {
        Some(index) => &version[..index],
        None => version,
    };
    let base = base.trim_end_matches('.');
    if base.is_empty() {
        return None;
    }

    let mut parts = vec![epoch];
    parts.extend(version_tuple(base)?);
    Some(parts)
}

/// Helps in downloading a PyPI project.
#[derive(Debug)]
pub struct PyPIDownloadHelper {
    downloader: PageDownloader,
    project_name: String,
    source_name: String,
}

impl PyPIDownloadHelper {
    /// Create a helper for a `pypi.org/project/{name}` URL.
    ///
    /// `source_name` is the name of the source package when it differs from
    /// the PyPI project name.
    pub fn new(
        download_url: &str,
        source_name: Option<&str>,
        client: Arc<dyn HttpClient>,
    ) -> Result<Self> {
        let segments: Vec<&str> = download_url.split('/').collect();
        if segments.len() < 5 || segments[2] != "pypi.org" || segments[3] != "project" {
            bail!("Unsupported download URL: {}", download_url);
        }

        let project_name = segments[4].to_string();
        let source_name = source_name
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| project_name.clone());

        Ok(PyPIDownloadHelper {
            downloader: PageDownloader::new(client),
            project_name,
            source_name,
        })
    }

    fn metadata_url(&self) -> String {
        format!("https://pypi.org/pypi/{}/json", self.project_name)
    }
}

impl DownloadHelper for PyPIDownloadHelper {
    fn get_latest_version(
        &mut self,
        _project_name: &str,
        version_definition: Option<&ProjectVersionDefinition>,
    ) -> Option<String> {
        if let Some(version) = pinned_version(version_definition) {
            return Some(version);
        }

        let expression = format!(
            r"^https://files\.pythonhosted\.org/packages/.*/.*/.*/{}-([\d.!]*(post\d+)?)\.(tar\.bz2|tar\.gz|zip)$",
            regex::escape(&self.source_name)
        );
        let regex = RegexBuilder::new(&expression)
            .case_insensitive(true)
            .build()
            .ok()?;

        let url = self.metadata_url();
        let content = self.downloader.download_page_content(&url)?;

        let mut available = AvailableVersions::new();
        for url in release_urls(content) {
            let Some(captures) = regex.captures(&url) else {
                continue;
            };
            let version = &captures[1];
            if version.is_empty() {
                continue;
            }
            match comparable_version(version) {
                Some(parts) => available.insert(version, parts),
                None => tracing::debug!("Ignoring unsupported version: {}", version),
            }
        }

        let earliest = version_definition.and_then(|d| d.earliest_version());
        let latest = version_definition.and_then(|d| d.latest_version());
        available.latest(earliest, latest, true)
    }

    fn get_download_url(&mut self, _project_name: &str, project_version: &str) -> Option<String> {
        let expression = format!(
            r"^https://files\.pythonhosted\.org/packages/[0-9a-f]*/[0-9a-f]*/[0-9a-f]*/{}-{}[.](tar[.]bz2|tar[.]gz|zip)$",
            regex::escape(&self.source_name),
            regex::escape(project_version)
        );
        let regex = RegexBuilder::new(&expression)
            .case_insensitive(true)
            .build()
            .ok()?;

        let url = self.metadata_url();
        let content = self.downloader.download_page_content(&url)?;

        release_urls(content).into_iter().find(|url| regex.is_match(url))
    }

    fn get_project_identifier(&self) -> String {
        format!("org.pypi.{}", self.project_name)
    }

    fn downloader(&self) -> &PageDownloader {
        &self.downloader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockHttpClient, MockHttpResponse};
    use tempfile::TempDir;

    const METADATA_URL: &str = "https://pypi.org/pypi/construct/json";

    const METADATA: &str = r#"{
  "info": {"name": "construct", "project_url": "https://pypi.org/project/construct/"},
  "releases": {
    "2.9.45": [
      {"filename": "construct-2.9.45.tar.gz",
       "url": "https://files.pythonhosted.org/packages/a1/b2/c3d4/construct-2.9.45.tar.gz"}
    ],
    "2.10.68": [
      {"filename": "construct-2.10.68.tar.gz",
       "url": "https://files.pythonhosted.org/packages/e5/f6/a7b8/construct-2.10.68.tar.gz"},
      {"filename": "construct-2.10.68-py3-none-any.whl",
       "url": "https://files.pythonhosted.org/packages/00/11/2233/construct-2.10.68-py3-none-any.whl"}
    ],
    "2.10.70.post1": [
      {"filename": "construct-2.10.70.post1.zip",
       "url": "https://files.pythonhosted.org/packages/99/88/7766/construct-2.10.70.post1.zip"}
    ]
  },
  "urls": []
}"#;

    fn helper() -> (PyPIDownloadHelper, Arc<MockHttpClient>) {
        let client = Arc::new(MockHttpClient::new());
        client.mock_url(METADATA_URL, MockHttpResponse::ok(METADATA));
        let helper =
            PyPIDownloadHelper::new("https://pypi.org/project/construct", None, client.clone()).unwrap();
        (helper, client)
    }

    #[test]
    fn test_new_rejects_other_urls() {
        let client: Arc<dyn HttpClient> = Arc::new(MockHttpClient::new());
        assert!(PyPIDownloadHelper::new("https://pypi.org/simple/construct", None, client.clone()).is_err());
        assert!(PyPIDownloadHelper::new("https://example.com/project/construct", None, client).is_err());
    }

    #[test]
    fn test_project_identifier() {
        let (helper, _) = helper();
        assert_eq!(helper.get_project_identifier(), "org.pypi.construct");
    }

    #[test]
    fn test_comparable_version() {
        assert_eq!(comparable_version("2.10.68"), Some(vec![0, 2, 10, 68]));
        assert_eq!(comparable_version("1!2.0"), Some(vec![1, 2, 0]));
        assert_eq!(comparable_version("2.10.70.post1"), Some(vec![0, 2, 10, 70]));
        assert_eq!(comparable_version("!"), None);
    }

    #[test]
    fn test_latest_version() {
        let (mut helper, _) = helper();
        assert_eq!(
            helper.get_latest_version("construct", None),
            Some("2.10.70.post1".to_string())
        );

        let definition = ProjectVersionDefinition::new(">=2.9,<2.10");
        assert_eq!(
            helper.get_latest_version("construct", Some(&definition)),
            Some("2.9.45".to_string())
        );
    }

    #[test]
    fn test_latest_version_pinned() {
        let (mut helper, client) = helper();
        let definition = ProjectVersionDefinition::new("==2.5.3");

        assert_eq!(
            helper.get_latest_version("construct", Some(&definition)),
            Some("2.5.3".to_string())
        );
        assert!(client.requests().is_empty());
    }

    #[test]
    fn test_download_url() {
        let (mut helper, client) = helper();

        assert_eq!(
            helper.get_download_url("construct", "2.10.68"),
            Some("https://files.pythonhosted.org/packages/e5/f6/a7b8/construct-2.10.68.tar.gz".to_string())
        );
        assert!(helper.get_download_url("construct", "3.0").is_none());
        assert_eq!(client.request_count(METADATA_URL), 1);
    }

    #[test]
    fn test_download_url_unavailable() {
        let client = Arc::new(MockHttpClient::new());
        let mut helper =
            PyPIDownloadHelper::new("https://pypi.org/project/construct", None, client).unwrap();
        assert!(helper.get_download_url("construct", "2.10.68").is_none());
    }

    #[test]
    fn test_source_name() {
        let client = Arc::new(MockHttpClient::new());
        client.mock_url(
            "https://pypi.org/pypi/PyYAML/json",
            MockHttpResponse::ok(
                r#"{"urls": [{"url": "https://files.pythonhosted.org/packages/ab/cd/ef01/pyyaml-6.0.1.tar.gz"}]}"#,
            ),
        );
        let mut helper =
            PyPIDownloadHelper::new("https://pypi.org/project/PyYAML", Some("pyyaml"), client).unwrap();

        assert_eq!(
            helper.get_latest_version("PyYAML", None),
            Some("6.0.1".to_string())
        );
    }

    #[test]
    fn test_pinned_dfvfs_version_and_download_url() {
        let metadata_url = "https://pypi.org/pypi/dfvfs/json";
        let client = Arc::new(MockHttpClient::new());
        client.mock_url(
            metadata_url,
            MockHttpResponse::ok(
                r#"{"releases": {
  "20230407": [
    {"filename": "dfvfs-20230407.tar.gz",
     "url": "https://files.pythonhosted.org/packages/3c/9e/0d1f/dfvfs-20230407.tar.gz"}
  ],
  "20240505": [
    {"filename": "dfvfs-20240505.tar.gz",
     "url": "https://files.pythonhosted.org/packages/a4/b2/77e0/dfvfs-20240505.tar.gz"}
  ]
}}"#,
            ),
        );
        let mut helper =
            PyPIDownloadHelper::new("https://pypi.org/project/dfvfs", None, client.clone()).unwrap();

        let definition = ProjectVersionDefinition::new("==20230407");
        assert_eq!(
            helper.get_latest_version("dfvfs", Some(&definition)),
            Some("20230407".to_string())
        );
        assert!(client.requests().is_empty());

        assert_eq!(
            helper.get_download_url("dfvfs", "20230407"),
            Some("https://files.pythonhosted.org/packages/3c/9e/0d1f/dfvfs-20230407.tar.gz".to_string())
        );
        assert_eq!(client.request_count(metadata_url), 1);
    }

    #[test]
    fn test_download() {
        let tmp = TempDir::new().unwrap();
        let (mut helper, client) = helper();
        client.mock_url(
            "https://files.pythonhosted.org/packages/e5/f6/a7b8/construct-2.10.68.tar.gz",
            MockHttpResponse::ok("archive"),
        );

        let path = helper
            .download("construct", "2.10.68", tmp.path())
            .unwrap()
            .unwrap();
        assert_eq!(path, tmp.path().join("construct-2.10.68.tar.gz"));
    }
}
