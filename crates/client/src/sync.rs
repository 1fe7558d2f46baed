//! Background sync: actions queued while offline and replayed later.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::Serialize;
use tokio::sync::Mutex;
use url::Url;

use crate::fetch::Network;
use crate::request::WorkerRequest;

/// The only sync tag the worker acts on.
pub const SYNC_TAG: &str = "background-sync";

/// A write the page attempted while offline.
#[derive(Debug, Clone)]
pub struct QueuedAction {
    pub id: u64,
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub queued_at: DateTime<Utc>,
}

impl QueuedAction {
    fn to_request(&self) -> WorkerRequest {
        let mut request = WorkerRequest::new(self.method.clone(), self.url.clone());
        request.headers = self.headers.clone();
        request.body = self.body.clone();
        request
    }
}

/// Outcome of one replay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub replayed: usize,
    /// Actions that failed again and remain queued.
    pub failed: usize,
}

/// FIFO queue of offline actions.
#[derive(Debug, Default)]
pub struct OfflineQueue {
    actions: Mutex<VecDeque<QueuedAction>>,
    next_id: AtomicU64,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request for later replay; returns its id.
    pub async fn enqueue(&self, request: &WorkerRequest) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let action = QueuedAction {
            id,
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
            queued_at: Utc::now(),
        };
        tracing::info!(id, "queued {} {} for background sync", action.method, action.url);
        self.actions.lock().await.push_back(action);
        id
    }

    pub async fn len(&self) -> usize {
        self.actions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.actions.lock().await.is_empty()
    }

    pub async fn pending(&self) -> Vec<QueuedAction> {
        self.actions.lock().await.iter().cloned().collect()
    }

    /// Replay every queued action in order, each bounded by `timeout`.
    ///
    /// An action is done once the server answers with a 2xx status. Transport
    /// failures, timeouts and other statuses keep it queued for the next sync,
    /// ahead of anything enqueued while the replay ran. The queue is not
    /// locked during network attempts.
    pub async fn replay(&self, network: &dyn Network, timeout: Duration) -> SyncReport {
        let pending: Vec<QueuedAction> = self.actions.lock().await.drain(..).collect();
        let mut report = SyncReport::default();
        let mut failed = Vec::new();

        for action in pending {
            let attempt = tokio::time::timeout(timeout, network.fetch(&action.to_request())).await;
            match attempt {
                Ok(Ok(response)) if response.is_ok() => {
                    tracing::debug!(id = action.id, "replayed {} {}", action.method, action.url);
                    report.replayed += 1;
                }
                Ok(Ok(response)) => {
                    tracing::warn!(id = action.id, "replay of {} answered {}", action.url, response.status);
                    failed.push(action);
                }
                Ok(Err(err)) => {
                    tracing::warn!(id = action.id, "replay of {} failed: {}", action.url, err);
                    failed.push(action);
                }
                Err(_) => {
                    tracing::warn!(
                        id = action.id,
                        "replay of {} gave no response within {}ms",
                        action.url,
                        timeout.as_millis()
                    );
                    failed.push(action);
                }
            }
        }

        report.failed = failed.len();
        if !failed.is_empty() {
            let mut actions = self.actions.lock().await;
            for action in failed.into_iter().rev() {
                actions.push_front(action);
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedNetwork;
    use reqwest::StatusCode;
    use std::sync::Arc;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn post(url: &str, body: &str) -> WorkerRequest {
        WorkerRequest::new(Method::POST, Url::parse(url).unwrap()).with_body(body.to_string())
    }

    #[tokio::test]
    async fn test_enqueue_assigns_increasing_ids() {
        let queue = OfflineQueue::new();
        let a = queue.enqueue(&post("https://example.com/api/a", "1")).await;
        let b = queue.enqueue(&post("https://example.com/api/b", "2")).await;
        assert!(b > a);
        assert_eq!(queue.len().await, 2);
        assert_eq!(queue.pending().await[0].body.as_deref(), Some(&b"1"[..]));
    }

    #[tokio::test]
    async fn test_replay_removes_successful_actions() {
        let queue = OfflineQueue::new();
        let network = ScriptedNetwork::new();
        network.respond("https://example.com/api/a", StatusCode::CREATED, "ok");
        network.respond("https://example.com/api/b", StatusCode::INTERNAL_SERVER_ERROR, "boom");
        queue.enqueue(&post("https://example.com/api/a", "1")).await;
        queue.enqueue(&post("https://example.com/api/b", "2")).await;
        queue.enqueue(&post("https://example.com/api/c", "3")).await;

        let report = queue.replay(&network, TIMEOUT).await;

        assert_eq!(report, SyncReport { replayed: 1, failed: 2 });
        let pending: Vec<String> = queue.pending().await.iter().map(|a| a.url.to_string()).collect();
        assert_eq!(pending, vec!["https://example.com/api/b", "https://example.com/api/c"]);
    }

    #[tokio::test]
    async fn test_hanging_replay_times_out_without_blocking_enqueue() {
        let queue = Arc::new(OfflineQueue::new());
        let network = Arc::new(ScriptedNetwork::new());
        network.hang("https://example.com/api/slow");
        queue.enqueue(&post("https://example.com/api/slow", "1")).await;

        let replay = {
            let (queue, network) = (queue.clone(), network.clone());
            tokio::spawn(async move { queue.replay(network.as_ref(), Duration::from_millis(200)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let enqueued =
            tokio::time::timeout(Duration::from_millis(100), queue.enqueue(&post("https://example.com/api/b", "2")))
                .await;
        assert!(enqueued.is_ok());

        let report = tokio::time::timeout(Duration::from_secs(2), replay).await.unwrap().unwrap();
        assert_eq!(report, SyncReport { replayed: 0, failed: 1 });

        let pending: Vec<String> = queue.pending().await.iter().map(|a| a.url.to_string()).collect();
        assert_eq!(pending, vec!["https://example.com/api/slow", "https://example.com/api/b"]);
    }

    #[tokio::test]
    async fn test_replay_empty_queue() {
        let queue = OfflineQueue::new();
        let network = ScriptedNetwork::new();
        assert_eq!(queue.replay(&network, TIMEOUT).await, SyncReport::default());
        assert!(network.calls().is_empty());
        assert!(queue.is_empty().await);
    }
}
