//! Network access for the worker.
//!
//! The [`Network`] trait is the seam between strategies and the real
//! network. [`FetchClient`] implements it with reqwest:
//!
//! - Any status is returned as a response; strategies decide what "ok" means
//! - Transport failures map to `NETWORK_ERROR`, timeouts to `FETCH_TIMEOUT`
//! - Max redirects: 5
//! - Max body bytes: configurable

pub mod url;

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};

pub use self::url::{UrlError, resolve, same_origin};

use crate::request::WorkerRequest;
use crate::response::WorkerResponse;
use soluce_core::{AppConfig, Error};

/// Performs a request against the network.
#[async_trait]
pub trait Network: Send + Sync {
    /// Send the request. Non-success statuses are responses, not errors.
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "soluce-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "soluce-sw/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP client backing the worker's network access.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("no response within {}ms", timeout.as_millis()))
    } else {
        Error::Network(format!("network error: {}", err))
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
        let start = Instant::now();

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.config.timeout))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(e, self.config.timeout))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(WorkerResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "soluce-sw/0.1");
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { timeout_ms: 1500, user_agent: "custom/1.0".into(), ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.user_agent, "custom/1.0");
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_network_error() {
        let client = FetchClient::new(FetchConfig { timeout: Duration::from_secs(2), ..Default::default() }).unwrap();
        let request = WorkerRequest::get(::url::Url::parse("http://127.0.0.1:9/unreachable").unwrap());
        let err = client.fetch(&request).await.unwrap_err();
        assert!(err.is_network_failure());
    }
}
