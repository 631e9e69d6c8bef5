//! Test utilities and mocks for l2tdevtools unit tests.
//!
//! Provides a mock [`HttpClient`] so download helpers can be exercised
//! without network access, plus fixtures for definitions and archives.
//!
//! # Example
//!
//! ```rust,ignore
//! use l2tdevtools::test_support::{MockHttpClient, MockHttpResponse};
//!
//! #[test]
//! fn test_example() {
//!     let client = MockHttpClient::new();
//!     client.mock_url("http://www.zlib.net", MockHttpResponse::ok("<html>"));
//!
//!     // Hand the client to a download helper...
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;

use crate::sources::SourceHelper;
use crate::util::url_lib::{HttpClient, HttpResponse, UrlError};

// Re-export fixtures for convenience
pub use fixtures::*;

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockHttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl MockHttpResponse {
    /// Create a successful response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        MockHttpResponse {
            status: 200,
            body: body.into(),
        }
    }

    /// Create a not found response.
    pub fn not_found() -> Self {
        MockHttpResponse {
            status: 404,
            body: b"Not Found".to_vec(),
        }
    }

    /// Create a server error response.
    pub fn server_error(message: &str) -> Self {
        MockHttpResponse {
            status: 500,
            body: message.as_bytes().to_vec(),
        }
    }
}

/// Mock HTTP client for release page and source package requests.
///
/// URLs without a registered response fail with a network error, the same
/// way an unreachable host would.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    responses: Mutex<HashMap<String, MockHttpResponse>>,
    requests: Mutex<Vec<String>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        MockHttpClient::default()
    }

    /// Add a response for a URL.
    pub fn mock_url(&self, url: &str, response: MockHttpResponse) -> &Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(url.to_string(), response);
        }
        self
    }

    /// Get all requested URLs.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Number of requests made for a URL.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| *r == url).count()
    }
}

impl HttpClient for MockHttpClient {
    fn get(&self, url: &str) -> Result<HttpResponse, UrlError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }

        let responses = self.responses.lock().map_err(|_| UrlError::Network {
            url: url.to_string(),
            message: "mock poisoned".to_string(),
        })?;

        match responses.get(url) {
            Some(response) => Ok(HttpResponse {
                status: response.status,
                body: response.body.clone(),
            }),
            None => Err(UrlError::Network {
                url: url.to_string(),
                message: "no mock response".to_string(),
            }),
        }
    }
}

/// Source helper with a fixed version and source directory, for build
/// helper tests.
#[derive(Debug, Clone)]
pub struct FakeSourceHelper {
    pub name: String,
    pub version: Option<String>,
    pub source_directory: Option<PathBuf>,
    pub source_package: Option<PathBuf>,
    pub identifier: Option<String>,
}

impl FakeSourceHelper {
    pub fn new(name: &str, version: &str) -> Self {
        FakeSourceHelper {
            name: name.to_string(),
            version: Some(version.to_string()),
            source_directory: None,
            source_package: None,
            identifier: None,
        }
    }

    pub fn with_source_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_directory = Some(path.into());
        self
    }

    pub fn with_source_package(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_package = Some(path.into());
        self
    }
}

impl SourceHelper for FakeSourceHelper {
    fn project_name(&self) -> &str {
        &self.name
    }

    fn project_version(&mut self) -> Option<String> {
        self.version.clone()
    }

    fn clean(&mut self) -> Result<()> {
        Ok(())
    }

    fn create(&mut self) -> Result<Option<PathBuf>> {
        Ok(self.source_directory.clone())
    }

    fn source_directory_path(&self) -> Option<&Path> {
        self.source_directory.as_deref()
    }

    fn source_package_path(&mut self) -> Result<Option<PathBuf>> {
        Ok(self.source_package.clone())
    }

    fn project_identifier(&self) -> Option<String> {
        self.identifier.clone()
    }
}
