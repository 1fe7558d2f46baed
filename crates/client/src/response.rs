//! Responses produced by the worker, and their stored snapshots.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use soluce_core::StoredResponse;
use soluce_core::cache::entries::http_date;

use crate::request::WorkerRequest;

/// A response handed back to the page.
#[derive(Debug, Clone)]
pub struct WorkerResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl WorkerResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { status, headers: HeaderMap::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Success status (200-299), the same test `Response.ok` applies.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Rebuild a response from a stored snapshot.
    ///
    /// Headers that are no longer valid HTTP tokens are dropped.
    pub fn from_stored(stored: &StoredResponse) -> Self {
        let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::OK);
        let mut headers = HeaderMap::new();
        for (name, value) in &stored.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::debug!("dropping invalid stored header {} on {}", name, stored.url),
            }
        }
        Self { status, headers, body: Bytes::from(stored.body.clone()) }
    }

    /// Snapshot this response for storage under `request`.
    ///
    /// A `date` header is stamped with `now` when the network did not send one,
    /// so freshness can be computed later.
    pub fn to_stored(&self, request: &WorkerRequest, now: DateTime<Utc>) -> StoredResponse {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();
        if !self.headers.contains_key(header::DATE) {
            headers.push((header::DATE.as_str().to_string(), http_date(now)));
        }

        StoredResponse {
            cache_key: request.cache_key(),
            method: request.method.as_str().to_string(),
            url: request.url.to_string(),
            status: self.status.as_u16(),
            status_text: self.status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body: self.body.to_vec(),
            stored_at: now.to_rfc3339(),
        }
    }
}
