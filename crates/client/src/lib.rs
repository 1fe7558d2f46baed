//! Offline worker for the CyberSoluce site.
//!
//! This crate classifies intercepted requests, answers them with a caching
//! strategy backed by `soluce-core`'s partitioned store, and drives the
//! install/activate lifecycle plus sync, push and notification events.

pub mod classify;
pub mod clients;
pub mod config;
pub mod fallback;
pub mod fetch;
pub mod lifecycle;
pub mod push;
pub mod request;
pub mod response;
pub mod store;
pub mod strategy;
pub mod sync;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod worker;

pub use classify::{Classification, RoutingTable, classify};
pub use clients::{ClientWindow, Clients, InMemoryClients};
pub use config::{Branding, WorkerConfig};
pub use fetch::{FetchClient, FetchConfig, Network};
pub use lifecycle::{ActivateReport, InstallReport, LifecycleController, WorkerState};
pub use push::{ClickOutcome, InMemoryNotifier, Notification, Notifier};
pub use request::{RequestMode, WorkerRequest};
pub use response::WorkerResponse;
pub use store::CacheStore;
pub use strategy::StrategyExecutor;
pub use sync::{OfflineQueue, SYNC_TAG, SyncReport};
pub use worker::{DirectOutcome, Interception, OfflineWorker, SyncOutcome};

pub use reqwest::{Method, StatusCode, header};
