//! cache_get tool implementation.
//!
//! Looks up the stored response for a GET request.

use chrono::{DateTime, Utc};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use soluce_client::fetch::resolve;
use soluce_core::{CacheDb, Error, StoredResponse, cache::compute_cache_key};
use url::Url;

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// Only look in this partition. Without it, partitions are searched oldest first.
    #[serde(default)]
    pub partition: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub body_bytes: usize,
    pub stored_at: String,
    /// Seconds since the `date` header, when it parses.
    pub age_secs: Option<i64>,
}

impl CacheGetOutput {
    fn new(stored: StoredResponse, now: DateTime<Utc>) -> Self {
        let age_secs = stored.age(now).map(|age| age.num_seconds());
        Self {
            body: String::from_utf8_lossy(&stored.body).into_owned(),
            body_bytes: stored.body.len(),
            url: stored.url,
            status: stored.status,
            status_text: stored.status_text,
            headers: stored.headers,
            stored_at: stored.stored_at,
            age_secs,
        }
    }
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, origin: &Url, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(origin, &params.url).map_err(Error::from)?;
    let key = compute_cache_key("GET", url.as_str());

    let stored = match &params.partition {
        Some(partition) => cache.match_in(partition, &key).await?,
        None => cache.match_request(&key).await?,
    }
    .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    json_result(&CacheGetOutput::new(stored, Utc::now()))
}
