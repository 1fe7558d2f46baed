//! Request classification.
//!
//! Every intercepted request is sorted into exactly one [`Classification`],
//! which selects the strategy that answers it. Rules apply in a fixed
//! priority order and the first match wins.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::request::{RequestMode, WorkerRequest};

static STATIC_ASSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(js|css|png|jpe?g|gif|svg|webp|ico|woff2?|ttf|eot|otf)$").expect("static asset pattern")
});

static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(png|jpe?g|gif|svg|webp|ico)$").expect("image pattern"));

/// URL schemes owned by browser extensions; never intercepted.
const EXTENSION_SCHEMES: &[&str] =
    &["chrome-extension", "moz-extension", "safari-extension", "safari-web-extension", "ms-browser-extension"];

/// Strategy selector for an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    /// Scripts, styles, images, fonts, icons: cache-first.
    StaticAsset,
    /// API calls and network-first routes.
    Api,
    /// Document loads: network with app-shell fallback.
    Navigation,
    /// Everything else: network with cache fallback.
    Dynamic,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaticAsset => "static-asset",
            Self::Api => "api",
            Self::Navigation => "navigation",
            Self::Dynamic => "dynamic",
        }
    }
}

/// Path prefixes that steer classification.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    /// Paths always treated as [`Classification::Api`].
    pub network_first: Vec<String>,
    /// Marketing pages earmarked for cache-first. Carried for configuration
    /// parity; [`classify`] does not read it.
    pub cache_first: Vec<String>,
}

pub fn is_static_asset_path(path: &str) -> bool {
    STATIC_ASSET.is_match(path)
}

pub fn is_image_path(path: &str) -> bool {
    IMAGE.is_match(path)
}

pub fn is_extension_scheme(scheme: &str) -> bool {
    EXTENSION_SCHEMES.contains(&scheme)
}

/// Classify a request, or return `None` if it must bypass the worker.
///
/// Bypassed requests (non-GET, extension schemes) go straight to the network.
pub fn classify(request: &WorkerRequest, routes: &RoutingTable) -> Option<Classification> {
    if !request.is_get() {
        return None;
    }
    if is_extension_scheme(request.url.scheme()) {
        return None;
    }

    let path = request.url.path();
    if is_static_asset_path(path) {
        return Some(Classification::StaticAsset);
    }

    let api_host = request.url.host_str().is_some_and(|host| host.contains("api."));
    let network_first = routes.network_first.iter().any(|prefix| path.starts_with(prefix.as_str()));
    if path.starts_with("/api/") || api_host || network_first {
        return Some(Classification::Api);
    }

    if request.mode == RequestMode::Navigate || request.accepts_html() {
        return Some(Classification::Navigation);
    }

    Some(Classification::Dynamic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use reqwest::header::{ACCEPT, HeaderValue};
    use url::Url;

    fn routes() -> RoutingTable {
        RoutingTable {
            network_first: vec!["/api/".into(), "/assessment".into(), "/dashboard".into()],
            cache_first: vec!["/about".into(), "/pricing".into()],
        }
    }

    fn get(url: &str) -> WorkerRequest {
        WorkerRequest::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_non_get_bypasses() {
        let request = WorkerRequest::new(Method::POST, Url::parse("https://example.com/api/scores").unwrap());
        assert_eq!(classify(&request, &routes()), None);
    }

    #[test]
    fn test_extension_scheme_bypasses() {
        let request = get("chrome-extension://abcdef/content.js");
        assert_eq!(classify(&request, &routes()), None);
    }

    #[test]
    fn test_static_assets() {
        for url in [
            "https://example.com/assets/index-abc.js",
            "https://example.com/style.css",
            "https://example.com/cybersoluce.png",
            "https://example.com/photo.JPEG",
            "https://example.com/fonts/inter.woff2",
            "https://example.com/favicon.ico",
        ] {
            assert_eq!(classify(&get(url), &routes()), Some(Classification::StaticAsset), "{url}");
        }
    }

    #[test]
    fn test_static_wins_over_api_prefix() {
        let request = get("https://example.com/api/widget.js");
        assert_eq!(classify(&request, &routes()), Some(Classification::StaticAsset));
    }

    #[test]
    fn test_api_rules() {
        assert_eq!(classify(&get("https://example.com/api/assessments"), &routes()), Some(Classification::Api));
        assert_eq!(classify(&get("https://api.example.com/v1/users"), &routes()), Some(Classification::Api));
        assert_eq!(classify(&get("https://example.com/dashboard/overview"), &routes()), Some(Classification::Api));
    }

    #[test]
    fn test_network_first_wins_over_navigation() {
        let request = WorkerRequest::navigate(Url::parse("https://example.com/assessment/nist-csf").unwrap());
        assert_eq!(classify(&request, &routes()), Some(Classification::Api));
    }

    #[test]
    fn test_navigation_by_mode_or_accept() {
        let request = WorkerRequest::navigate(Url::parse("https://example.com/pricing").unwrap());
        assert_eq!(classify(&request, &routes()), Some(Classification::Navigation));

        let request = get("https://example.com/about").with_header(ACCEPT, HeaderValue::from_static("text/html"));
        assert_eq!(classify(&request, &routes()), Some(Classification::Navigation));
    }

    #[test]
    fn test_cache_first_routes_are_not_consulted() {
        let request = get("https://example.com/pricing");
        assert_eq!(classify(&request, &routes()), Some(Classification::Dynamic));
    }

    #[test]
    fn test_dynamic_fallthrough() {
        assert_eq!(classify(&get("https://example.com/manifest.json"), &routes()), Some(Classification::Dynamic));
    }

    #[test]
    fn test_image_path() {
        assert!(is_image_path("/img/logo.png"));
        assert!(is_image_path("/img/hero.webp"));
        assert!(!is_image_path("/app.js"));
        assert!(!is_image_path("/fonts/inter.woff2"));
    }
}
