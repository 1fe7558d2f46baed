//! Test doubles for the worker's seams.
//!
//! Available to this crate's tests and, with the `test-util` feature, to
//! dependent crates.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderValue};
use soluce_core::{Error, StoredResponse};

use crate::fetch::Network;
use crate::request::WorkerRequest;
use crate::response::WorkerResponse;
use crate::store::CacheStore;

#[derive(Debug, Clone)]
enum Scripted {
    Respond(WorkerResponse),
    Fail(String),
    Hang,
}

/// In-memory network whose answers are scripted per URL.
///
/// Unscripted URLs fail like a refused connection. Every call is recorded.
#[derive(Debug, Default)]
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `response`.
    pub fn respond_with(&self, url: &str, response: WorkerResponse) {
        self.routes
            .lock()
            .expect("routes lock")
            .insert(url.to_string(), Scripted::Respond(response));
    }

    /// Answer `url` with `status` and a body.
    pub fn respond(&self, url: &str, status: StatusCode, body: &str) {
        let response = WorkerResponse::new(status, body.to_string())
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        self.respond_with(url, response);
    }

    /// Make `url` fail with a transport error.
    pub fn fail(&self, url: &str) {
        self.routes
            .lock()
            .expect("routes lock")
            .insert(url.to_string(), Scripted::Fail("connection reset".to_string()));
    }

    /// Make `url` never answer.
    pub fn hang(&self, url: &str) {
        self.routes.lock().expect("routes lock").insert(url.to_string(), Scripted::Hang);
    }

    /// Fail every request regardless of script.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().expect("calls lock").iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
        let url = request.url.to_string();
        self.calls.lock().expect("calls lock").push(url.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {url}")));
        }

        let scripted = self.routes.lock().expect("routes lock").get(&url).cloned();
        match scripted {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(reason)) => Err(Error::Network(format!("{reason}: {url}"))),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(Error::Network(format!("connection refused: {url}"))),
        }
    }
}

/// Store that rejects every operation, as when quota is exceeded or storage is disabled.
#[derive(Debug, Default)]
pub struct FailingStore;

fn unavailable() -> Error {
    Error::StorageUnavailable("quota exceeded".to_string())
}

#[async_trait]
impl CacheStore for FailingStore {
    async fn open(&self, _partition: &str) -> Result<(), Error> {
        Err(unavailable())
    }

    async fn match_any(&self, _cache_key: &str) -> Result<Option<StoredResponse>, Error> {
        Err(unavailable())
    }

    async fn match_in(&self, _partition: &str, _cache_key: &str) -> Result<Option<StoredResponse>, Error> {
        Err(unavailable())
    }

    async fn put(&self, _partition: &str, _response: &StoredResponse) -> Result<(), Error> {
        Err(unavailable())
    }

    async fn evict_oldest(&self, _partition: &str, _max_entries: usize) -> Result<u64, Error> {
        Err(unavailable())
    }

    async fn delete_partition(&self, _partition: &str) -> Result<bool, Error> {
        Err(unavailable())
    }

    async fn delete_partitions_except(&self, _keep: &[String]) -> Result<Vec<String>, Error> {
        Err(unavailable())
    }
}
