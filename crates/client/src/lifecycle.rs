//! Worker lifecycle: install and activate.
//!
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Activated
//!               |
//!               +-> Redundant (precache failed)
//! ```

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use soluce_core::Error;
use tokio::sync::RwLock;

use crate::clients::Clients;
use crate::config::WorkerConfig;
use crate::fetch::{Network, resolve};
use crate::request::WorkerRequest;
use crate::response::WorkerResponse;
use crate::store::CacheStore;

/// Lifecycle state of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    /// Number of precached entries written to the static partition.
    pub precached: usize,
    /// The worker asks to activate without waiting for old clients to close.
    pub skip_waiting: bool,
}

/// Result of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateReport {
    /// Partitions from previous versions that were deleted.
    pub deleted_partitions: Vec<String>,
    /// Number of clients now controlled by this worker.
    pub claimed_clients: usize,
}

/// Drives install and activate against the cache store.
pub struct LifecycleController {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    clients: Arc<dyn Clients>,
    config: Arc<WorkerConfig>,
    state: RwLock<WorkerState>,
}

impl LifecycleController {
    pub fn new(
        store: Arc<dyn CacheStore>, network: Arc<dyn Network>, clients: Arc<dyn Clients>, config: Arc<WorkerConfig>,
    ) -> Self {
        Self { store, network, clients, config, state: RwLock::new(WorkerState::Parsed) }
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Precache the manifest into the static partition.
    ///
    /// All-or-nothing: every manifest URL is fetched before anything is
    /// stored, and a single transport failure or non-ok status rejects the
    /// install and leaves the worker redundant. If storing fails partway,
    /// the static partition is dropped so no partial precache survives.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(&[WorkerState::Parsed, WorkerState::Redundant], WorkerState::Installing)
            .await?;

        match self.precache().await {
            Ok(precached) => {
                self.set_state(WorkerState::Installed).await;
                tracing::info!(precached, "worker installed, skipping wait");
                Ok(InstallReport { precached, skip_waiting: true })
            }
            Err(err) => {
                self.set_state(WorkerState::Redundant).await;
                tracing::warn!("worker install failed: {}", err);
                Err(err)
            }
        }
    }

    async fn precache(&self) -> Result<usize, Error> {
        let partition = &self.config.cache_names.static_assets;
        self.store
            .open(partition)
            .await
            .map_err(|e| Error::InstallFailed(format!("cannot open {partition}: {e}")))?;

        let requests = self
            .config
            .precache
            .iter()
            .map(|entry| {
                resolve(&self.config.origin, entry)
                    .map(WorkerRequest::get)
                    .map_err(|e| Error::InstallFailed(format!("{entry}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let responses = try_join_all(requests.iter().map(|request| self.fetch_manifest_entry(request))).await?;

        let now = Utc::now();
        for (request, response) in requests.iter().zip(&responses) {
            if let Err(err) = self.store.put(partition, &response.to_stored(request, now)).await {
                self.discard_partial(partition).await;
                return Err(Error::InstallFailed(format!("cannot store {}: {err}", request.url)));
            }
        }

        Ok(requests.len())
    }

    async fn discard_partial(&self, partition: &str) {
        if let Err(err) = self.store.delete_partition(partition).await {
            tracing::warn!("could not drop partial precache in {}: {}", partition, err);
        }
    }

    async fn fetch_manifest_entry(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
        let timeout = self.config.network_timeout;
        let response = tokio::time::timeout(timeout, self.network.fetch(request))
            .await
            .map_err(|_| {
                Error::InstallFailed(format!("{}: no response within {}ms", request.url, timeout.as_millis()))
            })?
            .map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;

        if !response.is_ok() {
            return Err(Error::InstallFailed(format!("{}: status {}", request.url, response.status.as_u16())));
        }
        Ok(response)
    }

    /// Delete partitions from other versions, then claim all clients.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(&[WorkerState::Installed], WorkerState::Activating).await?;

        let keep = self.config.cache_names.keep_set();
        let deleted_partitions = match self.store.delete_partitions_except(&keep).await {
            Ok(deleted) => deleted,
            Err(err) => {
                self.set_state(WorkerState::Installed).await;
                return Err(err);
            }
        };
        for name in &deleted_partitions {
            tracing::info!("deleted old cache partition {}", name);
        }

        let claimed_clients = match self.clients.claim().await {
            Ok(claimed) => claimed,
            Err(err) => {
                self.set_state(WorkerState::Installed).await;
                return Err(err);
            }
        };
        self.set_state(WorkerState::Activated).await;
        tracing::info!(claimed_clients, "worker activated");

        Ok(ActivateReport { deleted_partitions, claimed_clients })
    }

    async fn transition(&self, from: &[WorkerState], to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !from.contains(&*state) {
            return Err(Error::InvalidState(format!("cannot move from {:?} to {:?}", *state, to)));
        }
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        *self.state.write().await = to;
    }
}
