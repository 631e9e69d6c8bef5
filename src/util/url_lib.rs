//! Blocking HTTP client used to fetch release pages and source packages.

use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::util::config::NetConfig;

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("l2tdevtools/", env!("CARGO_PKG_VERSION"));

/// Error while retrieving a URL.
#[derive(Debug, Error)]
pub enum UrlError {
    /// The request could not be sent or the body could not be read.
    #[error("unable to retrieve {url}: {message}")]
    Network { url: String, message: String },

    /// The server answered with a status other than 200 or 201.
    #[error("unable to retrieve {url}: HTTP status {status}")]
    HttpStatus { url: String, status: u16 },
}

impl UrlError {
    /// The URL the error relates to.
    pub fn url(&self) -> &str {
        match self {
            UrlError::Network { url, .. } | UrlError::HttpStatus { url, .. } => url,
        }
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Performs HTTP GET requests.
///
/// Implementations report transport failures as [`UrlError::Network`] and
/// return every response that was received, whatever its status.
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, UrlError>;
}

/// Retrieve the body of a URL.
///
/// Only status 200 and 201 count as success.
pub fn request(client: &dyn HttpClient, url: &str) -> Result<Vec<u8>, UrlError> {
    let response = client.get(url)?;

    if response.status != 200 && response.status != 201 {
        return Err(UrlError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    Ok(response.body)
}

/// [`HttpClient`] backed by blocking reqwest.
#[derive(Debug)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Create a client from the network configuration.
    pub fn new(config: &NetConfig) -> Result<Self> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let mut builder = reqwest::blocking::Client::builder().user_agent(user_agent);
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder
            .build()
            .with_context(|| "failed to create HTTP client")?;

        Ok(ReqwestClient { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<HttpResponse, UrlError> {
        let network_error = |e: reqwest::Error| UrlError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().map_err(network_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(network_error)?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockHttpClient, MockHttpResponse};

    #[test]
    fn test_request_success() {
        let client = MockHttpClient::new();
        client.mock_url("http://www.zlib.net", MockHttpResponse::ok("<html>"));

        let body = request(&client, "http://www.zlib.net").unwrap();
        assert_eq!(body, b"<html>");
    }

    #[test]
    fn test_request_http_status() {
        let client = MockHttpClient::new();
        client.mock_url("http://www.zlib.net", MockHttpResponse::not_found());

        let err = request(&client, "http://www.zlib.net").unwrap_err();
        assert!(matches!(err, UrlError::HttpStatus { status: 404, .. }));
        assert_eq!(err.url(), "http://www.zlib.net");
    }

    #[test]
    fn test_request_network_error() {
        let client = MockHttpClient::new();

        let err = request(&client, "http://unreachable.invalid").unwrap_err();
        assert!(matches!(err, UrlError::Network { .. }));
    }

    #[test]
    fn test_reqwest_client_new() {
        let config = NetConfig {
            user_agent: Some("test-agent".to_string()),
            timeout_secs: Some(5),
        };
        assert!(ReqwestClient::new(&config).is_ok());
    }
}
