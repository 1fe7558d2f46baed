//! sw_fetch tool implementation.
//!
//! Hands a request to the worker the way a page would issue it. Requests the
//! worker passes through are sent to the network by the host.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use soluce_client::fetch::resolve;
use soluce_client::header::{self, HeaderValue};
use soluce_client::{DirectOutcome, Interception, Method, OfflineWorker, RequestMode, WorkerRequest, WorkerResponse};

use super::json_result;
use crate::error::HostError;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Request mode: "navigate", "same-origin", "no-cors" (default) or "cors".
    #[serde(default)]
    pub mode: Option<String>,

    /// Accept header. Navigations default to text/html.
    #[serde(default)]
    pub accept: Option<String>,

    /// Request body for writes.
    #[serde(default)]
    pub body: Option<String>,
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    /// "worker" when a strategy answered, "network" for passthrough, "queued" when a write was deferred.
    pub handled_by: String,
    /// Classification chosen by the worker, if it intercepted the request.
    pub classification: Option<String>,
    pub status: Option<u16>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    /// Background sync queue id for deferred writes.
    pub queued_id: Option<u64>,
}

impl SwFetchOutput {
    fn response(url: &str, handled_by: &str, classification: Option<&str>, response: &WorkerResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();
        Self {
            url: url.to_string(),
            handled_by: handled_by.to_string(),
            classification: classification.map(str::to_string),
            status: Some(response.status.as_u16()),
            headers,
            body: Some(response.text()),
            queued_id: None,
        }
    }
}

fn build_request(worker: &OfflineWorker, params: SwFetchParams) -> Result<WorkerRequest, McpError> {
    let url = resolve(&worker.config().origin, &params.url).map_err(soluce_core::Error::from)?;

    let method = match params.method.as_deref() {
        Some(m) => Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| HostError::InvalidInput(format!("invalid method: {m}")))?,
        None => Method::GET,
    };
    let mode = match params.mode.as_deref() {
        Some(m) => m.parse::<RequestMode>()?,
        None => RequestMode::default(),
    };

    let mut request = WorkerRequest::new(method, url).with_mode(mode);
    match params.accept {
        Some(accept) => {
            let value = HeaderValue::from_str(&accept)
                .map_err(|_| HostError::InvalidInput(format!("invalid accept header: {accept}")))?;
            request = request.with_header(header::ACCEPT, value);
        }
        None if mode == RequestMode::Navigate => {
            request = request.with_header(header::ACCEPT, HeaderValue::from_static("text/html"));
        }
        None => {}
    }
    if let Some(body) = params.body {
        request = request.with_body(body);
    }
    Ok(request)
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &OfflineWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(worker, params)?;
    let url = request.url.to_string();

    let output = match worker.on_fetch(&request).await? {
        Interception::Responded { classification, response } => {
            SwFetchOutput::response(&url, "worker", Some(classification.as_str()), &response)
        }
        Interception::Passthrough => match worker.fetch_direct(&request).await? {
            DirectOutcome::Response(response) => SwFetchOutput::response(&url, "network", None, &response),
            DirectOutcome::Queued { id, reason } => {
                tracing::info!("deferred {} {} ({})", request.method, url, reason);
                SwFetchOutput {
                    url,
                    handled_by: "queued".to_string(),
                    classification: None,
                    status: None,
                    headers: BTreeMap::new(),
                    body: None,
                    queued_id: Some(id),
                }
            }
        },
    };

    json_result(&output)
}
