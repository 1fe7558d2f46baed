//! Synthesized responses for requests that neither the network nor the
//! cache can answer.

use reqwest::StatusCode;
use reqwest::header::{self, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::response::WorkerResponse;

/// Header added to API responses served from cache while offline.
pub const SERVED_BY_HEADER: HeaderName = HeaderName::from_static("x-served-by");

/// Value of [`SERVED_BY_HEADER`].
pub const SERVED_BY_CACHE: &str = "ServiceWorker-Cache";

const PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200" viewBox="0 0 200 200"><rect width="200" height="200" fill="#f3f4f6"/><text x="100" y="100" text-anchor="middle" dominant-baseline="middle" fill="#9ca3af" font-family="system-ui, sans-serif" font-size="14">Image unavailable</text></svg>"##;

/// JSON body returned for API requests that fail while offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineApiError {
    pub error: String,
    pub message: String,
    pub offline: bool,
}

impl Default for OfflineApiError {
    fn default() -> Self {
        Self {
            error: "Network unavailable".to_string(),
            message: "This request requires an internet connection. Please check your connection and try again."
                .to_string(),
            offline: true,
        }
    }
}

/// 503 JSON envelope `{error, message, offline: true}`.
pub fn offline_api_error() -> WorkerResponse {
    let body = serde_json::to_vec(&OfflineApiError::default()).unwrap_or_default();
    WorkerResponse::new(StatusCode::SERVICE_UNAVAILABLE, body)
        .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
}

/// Inline HTML page shown to navigations when neither network nor app shell is available.
pub fn offline_page(brand_name: &str) -> WorkerResponse {
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Offline - {brand_name}</title>
  <style>
    body {{ font-family: system-ui, sans-serif; display: flex; align-items: center; justify-content: center; min-height: 100vh; margin: 0; background: #f9fafb; color: #111827; }}
    main {{ text-align: center; padding: 2rem; }}
    button {{ margin-top: 1rem; padding: 0.75rem 1.5rem; border: 0; border-radius: 0.5rem; background: #2563eb; color: #fff; font-size: 1rem; cursor: pointer; }}
  </style>
</head>
<body>
  <main>
    <h1>You're offline</h1>
    <p>{brand_name} can't reach the network right now. Check your connection and try again.</p>
    <button type="button" onclick="window.location.reload()">Try again</button>
  </main>
</body>
</html>
"#
    );
    WorkerResponse::new(StatusCode::OK, html)
        .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"))
}

/// Gray placeholder graphic for images that cannot be loaded.
pub fn placeholder_image() -> WorkerResponse {
    WorkerResponse::new(StatusCode::OK, PLACEHOLDER_SVG)
        .with_header(header::CONTENT_TYPE, HeaderValue::from_static("image/svg+xml"))
}

/// Plain-text 503 for uncategorized requests.
pub fn offline_text() -> WorkerResponse {
    WorkerResponse::new(StatusCode::SERVICE_UNAVAILABLE, "Offline")
        .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))
}
