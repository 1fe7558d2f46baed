//! Client windows controlled by the worker.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use soluce_core::Error;
use tokio::sync::RwLock;
use url::Url;

/// A page (window) the worker can control, focus, or open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientWindow {
    pub id: String,
    pub url: Url,
    pub focused: bool,
    /// Whether this worker controls the page.
    pub controlled: bool,
}

/// Window management provided by the host.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Take control of every open client; returns how many are now controlled.
    async fn claim(&self) -> Result<usize, Error>;

    /// Every open window, including uncontrolled ones.
    async fn match_all(&self) -> Result<Vec<ClientWindow>, Error>;

    async fn focus(&self, id: &str) -> Result<ClientWindow, Error>;

    async fn open_window(&self, url: Url) -> Result<ClientWindow, Error>;
}

/// Host-side registry of windows kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryClients {
    windows: RwLock<Vec<ClientWindow>>,
    next_id: AtomicU64,
}

impl InMemoryClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened, uncontrolled, unfocused window.
    pub async fn register(&self, url: Url) -> ClientWindow {
        let window = ClientWindow { id: self.allocate_id(), url, focused: false, controlled: false };
        self.windows.write().await.push(window.clone());
        window
    }

    fn allocate_id(&self) -> String {
        format!("client-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl Clients for InMemoryClients {
    async fn claim(&self) -> Result<usize, Error> {
        let mut windows = self.windows.write().await;
        for window in windows.iter_mut() {
            window.controlled = true;
        }
        Ok(windows.len())
    }

    async fn match_all(&self) -> Result<Vec<ClientWindow>, Error> {
        Ok(self.windows.read().await.clone())
    }

    async fn focus(&self, id: &str) -> Result<ClientWindow, Error> {
        let mut windows = self.windows.write().await;
        if !windows.iter().any(|w| w.id == id) {
            return Err(Error::InvalidInput(format!("no client with id {id}")));
        }
        let mut focused = None;
        for window in windows.iter_mut() {
            window.focused = window.id == id;
            if window.focused {
                focused = Some(window.clone());
            }
        }
        focused.ok_or_else(|| Error::InvalidInput(format!("no client with id {id}")))
    }

    async fn open_window(&self, url: Url) -> Result<ClientWindow, Error> {
        let mut windows = self.windows.write().await;
        for window in windows.iter_mut() {
            window.focused = false;
        }
        let window = ClientWindow { id: self.allocate_id(), url, focused: true, controlled: true };
        windows.push(window.clone());
        Ok(window)
    }
}
