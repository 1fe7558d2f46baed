//! The offline worker: one object per installed version, exposing the
//! events a host dispatches to it.

use std::sync::Arc;

use serde::Serialize;
use soluce_core::Error;

use crate::classify::{Classification, classify};
use crate::clients::Clients;
use crate::config::WorkerConfig;
use crate::fetch::Network;
use crate::lifecycle::{ActivateReport, InstallReport, LifecycleController, WorkerState};
use crate::push::{ClickOutcome, Notification, Notifier, handle_click, parse_push};
use crate::request::WorkerRequest;
use crate::response::WorkerResponse;
use crate::store::CacheStore;
use crate::strategy::StrategyExecutor;
use crate::sync::{OfflineQueue, SYNC_TAG, SyncReport};

/// What the worker did with an intercepted request.
#[derive(Debug, Clone)]
pub enum Interception {
    /// Not handled; the host performs the request itself.
    Passthrough,
    Responded { classification: Classification, response: WorkerResponse },
}

/// Result of a request the host sent straight to the network.
#[derive(Debug, Clone)]
pub enum DirectOutcome {
    Response(WorkerResponse),
    /// The network failed and the write was queued for background sync.
    Queued { id: u64, reason: String },
}

/// What a sync event did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Replayed(SyncReport),
    IgnoredTag { tag: String },
}

/// Composes the strategies, lifecycle and event handlers behind one API.
pub struct OfflineWorker {
    config: Arc<WorkerConfig>,
    network: Arc<dyn Network>,
    clients: Arc<dyn Clients>,
    notifier: Arc<dyn Notifier>,
    strategies: StrategyExecutor,
    lifecycle: LifecycleController,
    queue: OfflineQueue,
}

impl OfflineWorker {
    pub fn new(
        config: WorkerConfig, store: Arc<dyn CacheStore>, network: Arc<dyn Network>, clients: Arc<dyn Clients>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let config = Arc::new(config);
        let strategies = StrategyExecutor::new(store.clone(), network.clone(), config.clone());
        let lifecycle = LifecycleController::new(store, network.clone(), clients.clone(), config.clone());
        Self { config, network, clients, notifier, strategies, lifecycle, queue: OfflineQueue::new() }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub async fn state(&self) -> WorkerState {
        self.lifecycle.state().await
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        self.lifecycle.install().await
    }

    pub async fn on_activate(&self) -> Result<ActivateReport, Error> {
        self.lifecycle.activate().await
    }

    /// Intercept a request. Requests the classifier bypasses are left to the host.
    pub async fn on_fetch(&self, request: &WorkerRequest) -> Result<Interception, Error> {
        let Some(classification) = classify(request, &self.config.routes) else {
            tracing::trace!("passing through {} {}", request.method, request.url);
            return Ok(Interception::Passthrough);
        };

        tracing::debug!(classification = classification.as_str(), "intercepted {}", request.url);
        let response = self.strategies.execute(request, classification).await?;
        Ok(Interception::Responded { classification, response })
    }

    /// Send a passthrough request to the network.
    ///
    /// Writes (non-GET) that fail on the network are queued for the next
    /// background sync instead of failing.
    pub async fn fetch_direct(&self, request: &WorkerRequest) -> Result<DirectOutcome, Error> {
        let result = tokio::time::timeout(self.config.network_timeout, self.network.fetch(request))
            .await
            .unwrap_or_else(|_| Err(Error::FetchTimeout(format!("{} gave no response", request.url))));

        match result {
            Ok(response) => Ok(DirectOutcome::Response(response)),
            Err(err) if !request.is_get() && err.is_network_failure() => {
                let id = self.queue.enqueue(request).await;
                Ok(DirectOutcome::Queued { id, reason: err.to_string() })
            }
            Err(err) => Err(err),
        }
    }

    /// Handle a sync event; only [`SYNC_TAG`] replays the queue.
    pub async fn on_sync(&self, tag: &str) -> SyncOutcome {
        if tag != SYNC_TAG {
            tracing::debug!("ignoring sync tag {}", tag);
            return SyncOutcome::IgnoredTag { tag: tag.to_string() };
        }
        let report = self.queue.replay(self.network.as_ref(), self.config.network_timeout).await;
        tracing::info!(replayed = report.replayed, failed = report.failed, "background sync finished");
        SyncOutcome::Replayed(report)
    }

    /// Handle a push event; returns the notification shown, if any.
    pub async fn on_push(&self, data: Option<&[u8]>) -> Result<Option<Notification>, Error> {
        let Some(notification) = parse_push(data, &self.config.branding) else {
            return Ok(None);
        };
        self.notifier.show(&notification).await?;
        Ok(Some(notification))
    }

    pub async fn on_notification_click(&self, action: Option<&str>) -> Result<ClickOutcome, Error> {
        handle_click(action, &self.config.origin, self.clients.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryClients;
    use crate::fallback::{SERVED_BY_CACHE, SERVED_BY_HEADER};
    use crate::fetch::resolve;
    use crate::push::InMemoryNotifier;
    use crate::testing::ScriptedNetwork;
    use reqwest::{Method, StatusCode};
    use soluce_core::{CacheDb, StoredResponse};
    use url::Url;

    const ORIGIN: &str = "https://cybersoluce.example";

    struct Harness {
        db: CacheDb,
        network: Arc<ScriptedNetwork>,
        clients: Arc<InMemoryClients>,
        notifier: Arc<InMemoryNotifier>,
        worker: OfflineWorker,
    }

    async fn harness() -> Harness {
        let mut config = WorkerConfig::for_origin(ORIGIN).unwrap();
        config.precache = vec!["/".into(), "/index.html".into(), "/cybersoluce.png".into()];
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(ScriptedNetwork::new());
        let clients = Arc::new(InMemoryClients::new());
        let notifier = Arc::new(InMemoryNotifier::new());
        let worker =
            OfflineWorker::new(config, Arc::new(db.clone()), network.clone(), clients.clone(), notifier.clone());
        Harness { db, network, clients, notifier, worker }
    }

    fn url(path: &str) -> Url {
        Url::parse(&format!("{ORIGIN}{path}")).unwrap()
    }

    async fn installed(h: &Harness) {
        for entry in &h.worker.config().precache {
            let target = resolve(&h.worker.config().origin, entry).unwrap();
            h.network.respond(target.as_str(), StatusCode::OK, "<html>shell</html>");
        }
        h.worker.on_install().await.unwrap();
        h.worker.on_activate().await.unwrap();
    }

    fn responded(interception: Interception) -> (Classification, WorkerResponse) {
        match interception {
            Interception::Responded { classification, response } => (classification, response),
            Interception::Passthrough => panic!("expected a response"),
        }
    }

    #[tokio::test]
    async fn test_full_lifecycle_then_offline_navigation() {
        let h = harness().await;
        installed(&h).await;
        assert_eq!(h.worker.state().await, WorkerState::Activated);

        h.network.set_offline(true);
        let (classification, response) =
            responded(h.worker.on_fetch(&WorkerRequest::navigate(url("/pricing"))).await.unwrap());

        assert_eq!(classification, Classification::Navigation);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text(), "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_precached_image_served_offline() {
        let h = harness().await;
        installed(&h).await;
        h.network.set_offline(true);

        let (classification, response) =
            responded(h.worker.on_fetch(&WorkerRequest::get(url("/cybersoluce.png"))).await.unwrap());
        assert_eq!(classification, Classification::StaticAsset);
        assert_eq!(response.text(), "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_api_offline_uses_cached_copy() {
        let h = harness().await;
        let scores = url("/api/scores");
        h.network.respond(scores.as_str(), StatusCode::OK, "{\"score\":72}");

        let (_, online) = responded(h.worker.on_fetch(&WorkerRequest::get(scores.clone())).await.unwrap());
        assert_eq!(online.text(), "{\"score\":72}");

        h.network.set_offline(true);
        let (classification, offline) = responded(h.worker.on_fetch(&WorkerRequest::get(scores)).await.unwrap());
        assert_eq!(classification, Classification::Api);
        assert_eq!(offline.text(), "{\"score\":72}");
        assert_eq!(offline.header(SERVED_BY_HEADER.as_str()), Some(SERVED_BY_CACHE));
    }

    #[tokio::test]
    async fn test_non_get_passes_through() {
        let h = harness().await;
        let request = WorkerRequest::new(Method::POST, url("/api/assessments"));
        assert!(matches!(h.worker.on_fetch(&request).await.unwrap(), Interception::Passthrough));
        assert!(h.network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_is_queued_and_replayed() {
        let h = harness().await;
        let target = url("/api/assessments");
        let request = WorkerRequest::new(Method::POST, target.clone()).with_body("{\"answers\":[]}");

        h.network.set_offline(true);
        let outcome = h.worker.fetch_direct(&request).await.unwrap();
        assert!(matches!(outcome, DirectOutcome::Queued { id: 1, .. }));
        assert_eq!(h.worker.queue().len().await, 1);

        h.network.set_offline(false);
        h.network.respond(target.as_str(), StatusCode::CREATED, "{}");
        let outcome = h.worker.on_sync(SYNC_TAG).await;

        assert_eq!(outcome, SyncOutcome::Replayed(SyncReport { replayed: 1, failed: 0 }));
        assert!(h.worker.queue().is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_read_is_not_queued() {
        let h = harness().await;
        let request = WorkerRequest::get(url("/healthz"));
        assert!(h.worker.fetch_direct(&request).await.is_err());
        assert!(h.worker.queue().is_empty().await);
    }

    #[tokio::test]
    async fn test_hanging_sync_does_not_block_writes() {
        let mut config = WorkerConfig::for_origin(ORIGIN).unwrap();
        config.network_timeout = std::time::Duration::from_millis(100);
        let network = Arc::new(ScriptedNetwork::new());
        let worker = Arc::new(OfflineWorker::new(
            config,
            Arc::new(CacheDb::open_in_memory().await.unwrap()),
            network.clone(),
            Arc::new(InMemoryClients::new()),
            Arc::new(InMemoryNotifier::new()),
        ));
        let slow = url("/api/slow");

        network.set_offline(true);
        let request = WorkerRequest::new(Method::POST, slow.clone()).with_body("{}");
        worker.fetch_direct(&request).await.unwrap();
        network.set_offline(false);
        network.hang(slow.as_str());

        let sync = {
            let worker = worker.clone();
            tokio::spawn(async move { worker.on_sync(SYNC_TAG).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let other = WorkerRequest::new(Method::POST, url("/api/other"));
        let queued = tokio::time::timeout(std::time::Duration::from_secs(2), worker.fetch_direct(&other)).await;
        assert!(matches!(queued, Ok(Ok(DirectOutcome::Queued { .. }))));

        let outcome = tokio::time::timeout(std::time::Duration::from_secs(2), sync).await.unwrap().unwrap();
        assert_eq!(outcome, SyncOutcome::Replayed(SyncReport { replayed: 0, failed: 1 }));
        assert_eq!(worker.queue().len().await, 2);
    }

    #[tokio::test]
    async fn test_other_sync_tags_ignored() {
        let h = harness().await;
        let outcome = h.worker.on_sync("periodic-refresh").await;
        assert_eq!(outcome, SyncOutcome::IgnoredTag { tag: "periodic-refresh".into() });
    }

    #[tokio::test]
    async fn test_push_shows_notification() {
        let h = harness().await;
        let shown = h.worker.on_push(Some(b"{\"body\":\"Report ready\"}")).await.unwrap().unwrap();

        assert_eq!(shown.title, "CyberSoluce");
        assert_eq!(shown.body, "Report ready");
        assert_eq!(h.notifier.shown().await.len(), 1);

        assert!(h.worker.on_push(None).await.unwrap().is_none());
        assert!(h.worker.on_push(Some(b"{broken")).await.unwrap().is_none());
        assert_eq!(h.notifier.shown().await.len(), 1);
    }

    #[tokio::test]
    async fn test_notification_click_opens_root() {
        let h = harness().await;
        let outcome = h.worker.on_notification_click(None).await.unwrap();
        assert!(matches!(outcome, ClickOutcome::Opened { .. }));
        assert_eq!(h.clients.match_all().await.unwrap()[0].url, url("/"));
    }

    #[tokio::test]
    async fn test_activate_drops_previous_version() {
        let h = harness().await;
        h.db.put("cybersoluce-dynamic-v0.9.0", &StoredResponse::ok("GET", url("/api/x").as_str(), b"old"))
            .await
            .unwrap();
        installed(&h).await;
        assert!(!h.db.has_partition("cybersoluce-dynamic-v0.9.0").await.unwrap());
    }
}
