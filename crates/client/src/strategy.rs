//! Caching strategies.
//!
//! One strategy per [`Classification`]:
//!
//! | classification | strategy |
//! |----------------|----------|
//! | static asset   | cache-first while fresh, network otherwise, stale copy or placeholder on failure |
//! | api            | network-first, cached copy or JSON 503 on failure |
//! | navigation     | network, app shell or offline page on failure |
//! | dynamic        | network-first, cached copy or text 503 on failure |
//!
//! Cache writes are awaited before a strategy returns, so the host can keep
//! the worker alive until they settle. Storage errors on this path are
//! logged and never fail the request.

use std::sync::Arc;

use chrono::Utc;
use reqwest::header::HeaderValue;
use soluce_core::{Error, StoredResponse};

use crate::classify::{Classification, is_image_path};
use crate::config::WorkerConfig;
use crate::fallback::{self, SERVED_BY_CACHE, SERVED_BY_HEADER};
use crate::fetch::Network;
use crate::request::WorkerRequest;
use crate::response::WorkerResponse;
use crate::store::CacheStore;

/// Runs the strategy selected by a request's classification.
#[derive(Clone)]
pub struct StrategyExecutor {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    config: Arc<WorkerConfig>,
}

impl StrategyExecutor {
    pub fn new(store: Arc<dyn CacheStore>, network: Arc<dyn Network>, config: Arc<WorkerConfig>) -> Self {
        Self { store, network, config }
    }

    /// Answer `request` with the strategy for `classification`.
    pub async fn execute(
        &self, request: &WorkerRequest, classification: Classification,
    ) -> Result<WorkerResponse, Error> {
        match classification {
            Classification::StaticAsset => self.cache_first(request).await,
            Classification::Api => self.network_first_api(request).await,
            Classification::Navigation => self.navigation(request).await,
            Classification::Dynamic => self.network_first(request).await,
        }
    }

    async fn cache_first(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
        let cached = self.lookup(request).await;

        if let Some(hit) = &cached
            && self.is_fresh(hit)
        {
            tracing::debug!("cache hit for {}", request.url);
            return Ok(WorkerResponse::from_stored(hit));
        }

        match self.fetch_network(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_response(&self.config.cache_names.static_assets, request, &response)
                        .await;
                }
                Ok(response)
            }
            Err(err) => {
                if let Some(stale) = cached {
                    tracing::debug!("network failed for {}, serving stale copy", request.url);
                    return Ok(WorkerResponse::from_stored(&stale));
                }
                if is_image_path(request.url.path()) {
                    tracing::debug!("network failed for {}, serving placeholder image", request.url);
                    return Ok(fallback::placeholder_image());
                }
                Err(err)
            }
        }
    }

    async fn network_first_api(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
        match self.fetch_network(request).await {
            Ok(response) => {
                if request.is_get() && response.is_ok() {
                    self.store_dynamic(request, &response).await;
                }
                Ok(response)
            }
            Err(err) => {
                tracing::debug!("api request {} failed: {}", request.url, err);
                if request.is_get()
                    && let Some(hit) = self.lookup(request).await
                {
                    return Ok(WorkerResponse::from_stored(&hit)
                        .with_header(SERVED_BY_HEADER, HeaderValue::from_static(SERVED_BY_CACHE)));
                }
                Ok(fallback::offline_api_error())
            }
        }
    }

    async fn navigation(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
        match self.fetch_network(request).await {
            Ok(response) => Ok(response),
            Err(err) => {
                tracing::debug!("navigation to {} failed: {}", request.url, err);
                if let Some(shell) = self.app_shell().await {
                    return Ok(WorkerResponse::from_stored(&shell));
                }
                Ok(fallback::offline_page(&self.config.branding.name))
            }
        }
    }

    async fn network_first(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
        match self.fetch_network(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_dynamic(request, &response).await;
                }
                Ok(response)
            }
            Err(err) => {
                tracing::debug!("request {} failed: {}", request.url, err);
                match self.lookup(request).await {
                    Some(hit) => Ok(WorkerResponse::from_stored(&hit)),
                    None => Ok(fallback::offline_text()),
                }
            }
        }
    }

    /// Fetch with the configured timeout; a timeout counts as a network failure.
    async fn fetch_network(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
        let timeout = self.config.network_timeout;
        match tokio::time::timeout(timeout, self.network.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchTimeout(format!(
                "{} gave no response within {}ms",
                request.url,
                timeout.as_millis()
            ))),
        }
    }

    fn is_fresh(&self, stored: &StoredResponse) -> bool {
        let Ok(max_age) = chrono::Duration::from_std(self.config.max_cache_age) else {
            return true;
        };
        stored.age(Utc::now()).is_some_and(|age| age < max_age)
    }

    /// Cache lookup that treats storage errors as a miss.
    async fn lookup(&self, request: &WorkerRequest) -> Option<StoredResponse> {
        match self.store.match_any(&request.cache_key()).await {
            Ok(hit) => hit,
            Err(err) => {
                tracing::warn!("cache lookup for {} failed: {}", request.url, err);
                None
            }
        }
    }

    async fn app_shell(&self) -> Option<StoredResponse> {
        let shell_url = match self.config.app_shell_url() {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!("app shell unavailable: {}", err);
                return None;
            }
        };
        let key = WorkerRequest::get(shell_url).cache_key();
        match self.store.match_in(&self.config.cache_names.static_assets, &key).await {
            Ok(hit) => hit,
            Err(err) => {
                tracing::warn!("app shell lookup failed: {}", err);
                None
            }
        }
    }

    /// Store a response; failures are logged and ignored.
    async fn store_response(&self, partition: &str, request: &WorkerRequest, response: &WorkerResponse) -> bool {
        let stored = response.to_stored(request, Utc::now());
        match self.store.put(partition, &stored).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("failed to cache {} in {}: {}", request.url, partition, err);
                false
            }
        }
    }

    async fn store_dynamic(&self, request: &WorkerRequest, response: &WorkerResponse) {
        let partition = &self.config.cache_names.dynamic;
        if !self.store_response(partition, request, response).await {
            return;
        }
        match self.store.evict_oldest(partition, self.config.max_dynamic_entries).await {
            Ok(0) => {}
            Ok(evicted) => tracing::debug!("evicted {} entries from {}", evicted, partition),
            Err(err) => tracing::warn!("eviction in {} failed: {}", partition, err),
        }
    }
}
