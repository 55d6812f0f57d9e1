//! HTTP transport shared by the REST drivers

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::config::DriverConfig;
use crate::error::{ExecutorError, Result};

/// A configured reqwest client bound to one scheduler's base URL
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Base URL without trailing slash (e.g., "http://localhost:6820")
    base_url: String,
    client: Client,
}

impl HttpTransport {
    /// Builds a transport from driver configuration
    ///
    /// # Arguments
    /// * `config` - Driver configuration (timeout, TLS verification, URL override)
    /// * `default_url` - Base URL used when the configuration has no override
    pub fn new(config: &DriverConfig, default_url: &str) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;

        Ok(Self {
            base_url: config.resolve_base_url(default_url),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Joins `path` onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Joins `path` plus one escaped segment (usually a job id) onto the base URL
    ///
    /// The segment is percent-encoded, so `/`, `?` and `#` cannot reach
    /// another endpoint. Empty, `.` and `..` segments are refused.
    pub fn segment_url(&self, path: &str, segment: &str) -> Result<Url> {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(ExecutorError::precondition(format!(
                "Invalid job ID for a URL path: {:?}",
                segment
            )));
        }

        let mut url = Url::parse(&self.url(path)).map_err(|e| {
            ExecutorError::InvalidConfig(format!("invalid base URL {}: {}", self.base_url, e))
        })?;
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty().push(segment);
            }
            Err(()) => {
                return Err(ExecutorError::InvalidConfig(format!(
                    "base URL cannot carry a path: {}",
                    self.base_url
                )));
            }
        }

        Ok(url)
    }

    /// Handle an API response and deserialize JSON
    ///
    /// Non-success status codes become [`ExecutorError::Api`]; a body that
    /// does not decode becomes [`ExecutorError::Protocol`].
    pub async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ExecutorError::protocol(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content (e.g., DELETE operations)
    pub async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        Self::check_status(response).await.map(|_| ())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ExecutorError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_uses_default_url() {
        let transport = HttpTransport::new(&DriverConfig::default(), "http://localhost:6820/").unwrap();
        assert_eq!(transport.base_url(), "http://localhost:6820");
    }

    #[test]
    fn test_transport_prefers_override() {
        let config = DriverConfig::default().with_base_url("https://example.org/api/");
        let transport = HttpTransport::new(&config, "http://localhost:6820").unwrap();
        assert_eq!(transport.url("/jobs"), "https://example.org/api/jobs");
        assert_eq!(transport.url("jobs"), "https://example.org/api/jobs");
    }

    #[test]
    fn test_segment_url_escapes_job_id() {
        let transport = HttpTransport::new(&DriverConfig::default(), "http://localhost:6820").unwrap();

        let url = transport.segment_url("slurm/v0.0.40/job", "42").unwrap();
        assert_eq!(url.as_str(), "http://localhost:6820/slurm/v0.0.40/job/42");

        let url = transport.segment_url("slurm/v0.0.40/job", "../jobs?x#y").unwrap();
        assert_eq!(url.as_str(), "http://localhost:6820/slurm/v0.0.40/job/..%2Fjobs%3Fx%23y");

        for bad in ["", ".", ".."] {
            assert!(transport.segment_url("slurm/v0.0.40/job", bad).unwrap_err().is_precondition());
        }
    }

    #[test]
    fn test_transport_rejects_invalid_config() {
        let config = DriverConfig::default().with_base_url("localhost");
        let err = HttpTransport::new(&config, "http://localhost").unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_non_success_becomes_api_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/thing")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let config = DriverConfig::default().with_base_url(server.url());
        let transport = HttpTransport::new(&config, "http://unused").unwrap();
        let response = transport
            .client()
            .get(transport.url("thing"))
            .send()
            .await
            .unwrap();
        let err = transport.handle_empty_response(response).await.unwrap_err();

        mock.assert_async().await;
        match err {
            ExecutorError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body_is_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/thing")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let config = DriverConfig::default().with_base_url(server.url());
        let transport = HttpTransport::new(&config, "http://unused").unwrap();
        let response = transport
            .client()
            .get(transport.url("thing"))
            .send()
            .await
            .unwrap();
        let err = transport
            .handle_response::<serde_json::Value>(response)
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutorError::Protocol(_)));
    }
}
