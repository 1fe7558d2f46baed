//! Intercepted request model.

use std::str::FromStr;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use soluce_core::{Error, cache::compute_cache_key};
use url::Url;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

impl FromStr for RequestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "navigate" => Ok(Self::Navigate),
            "same-origin" => Ok(Self::SameOrigin),
            "no-cors" => Ok(Self::NoCors),
            "cors" => Ok(Self::Cors),
            other => Err(Error::InvalidInput(format!("unknown request mode: {other}"))),
        }
    }
}

/// A request seen by the worker before it reaches the network.
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl WorkerRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, mode: RequestMode::default(), headers: HeaderMap::new(), body: None }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// A top-level navigation that accepts HTML.
    pub fn navigate(url: Url) -> Self {
        Self::get(url)
            .with_mode(RequestMode::Navigate)
            .with_header(header::ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml"))
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Whether the `Accept` header asks for HTML.
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("text/html"))
    }

    /// Request identity used as the cache key.
    pub fn cache_key(&self) -> String {
        compute_cache_key(self.method.as_str(), self.url.as_str())
    }
}
