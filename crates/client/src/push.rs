//! Push notifications and notification clicks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use soluce_core::Error;
use tokio::sync::RwLock;
use url::Url;

use crate::clients::Clients;
use crate::config::Branding;
use crate::fetch::same_origin;

/// Push message body. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub tag: Option<String>,
    pub require_interaction: Option<bool>,
    #[serde(default)]
    pub actions: Vec<NotificationAction>,
    pub data: Option<serde_json::Value>,
}

/// A button shown on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A notification ready to display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
    pub data: Option<serde_json::Value>,
}

impl Notification {
    /// Fill missing payload fields from the platform branding.
    pub fn from_payload(payload: PushPayload, branding: &Branding) -> Self {
        Self {
            title: payload.title.unwrap_or_else(|| branding.name.clone()),
            body: payload.body.unwrap_or_else(|| format!("New notification from {}", branding.name)),
            icon: payload.icon.unwrap_or_else(|| branding.icon.clone()),
            badge: payload.badge.unwrap_or_else(|| branding.icon.clone()),
            tag: payload.tag.unwrap_or_else(|| format!("{}-notification", branding.name.to_lowercase())),
            require_interaction: payload.require_interaction.unwrap_or(false),
            actions: payload.actions,
            data: payload.data,
        }
    }
}

/// Parse a push body into a notification.
///
/// Returns None when there is no body, or when the body is not valid
/// payload JSON; the malformed case is logged and the event dropped.
pub fn parse_push(data: Option<&[u8]>, branding: &Branding) -> Option<Notification> {
    let data = data?;
    match serde_json::from_slice::<PushPayload>(data) {
        Ok(payload) => Some(Notification::from_payload(payload, branding)),
        Err(err) => {
            tracing::warn!("dropping push event with malformed payload: {}", err);
            None
        }
    }
}

/// Displays notifications on behalf of the worker.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), Error>;
}

/// Notifier that logs and keeps every shown notification.
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    shown: RwLock<Vec<Notification>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn shown(&self) -> Vec<Notification> {
        self.shown.read().await.clone()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(tag = %notification.tag, "showing notification: {}", notification.title);
        self.shown.write().await.push(notification.clone());
        Ok(())
    }
}

/// What a notification click did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// An action button was clicked; only logged.
    Action { action: String },
    /// An existing window on the origin was focused.
    Focused { client_id: String },
    /// No window was open; a new one was opened at the root.
    Opened { client_id: String },
}

/// Handle a notification click.
pub async fn handle_click(action: Option<&str>, origin: &Url, clients: &dyn Clients) -> Result<ClickOutcome, Error> {
    if let Some(action) = action.filter(|a| !a.is_empty()) {
        tracing::info!("notification action clicked: {}", action);
        return Ok(ClickOutcome::Action { action: action.to_string() });
    }

    let windows = clients.match_all().await?;
    if let Some(window) = windows.iter().find(|w| same_origin(&w.url, origin)) {
        let focused = clients.focus(&window.id).await?;
        return Ok(ClickOutcome::Focused { client_id: focused.id });
    }

    let root = origin.join("/").map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let opened = clients.open_window(root).await?;
    Ok(ClickOutcome::Opened { client_id: opened.id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryClients;

    fn branding() -> Branding {
        Branding { name: "CyberSoluce".into(), icon: "/cybersoluce.png".into() }
    }

    fn origin() -> Url {
        Url::parse("https://cybersoluce.example").unwrap()
    }

    #[test]
    fn test_parse_full_payload() {
        let body = br#"{
            "title": "Assessment ready",
            "body": "Your NIST CSF results are in",
            "tag": "assessment",
            "requireInteraction": true,
            "actions": [{"action": "view", "title": "View results"}]
        }"#;

        let notification = parse_push(Some(body), &branding()).unwrap();
        assert_eq!(notification.title, "Assessment ready");
        assert_eq!(notification.tag, "assessment");
        assert!(notification.require_interaction);
        assert_eq!(notification.actions.len(), 1);
        assert_eq!(notification.icon, "/cybersoluce.png");
    }

    #[test]
    fn test_parse_defaults_to_branding() {
        let notification = parse_push(Some(b"{}"), &branding()).unwrap();
        assert_eq!(notification.title, "CyberSoluce");
        assert_eq!(notification.body, "New notification from CyberSoluce");
        assert_eq!(notification.badge, "/cybersoluce.png");
        assert!(!notification.require_interaction);
        assert!(notification.actions.is_empty());
    }

    #[test]
    fn test_parse_missing_or_malformed() {
        assert!(parse_push(None, &branding()).is_none());
        assert!(parse_push(Some(b"not json"), &branding()).is_none());
        assert!(parse_push(Some(b"[1, 2]"), &branding()).is_none());
    }

    #[tokio::test]
    async fn test_click_action_only_logs() {
        let clients = InMemoryClients::new();
        let outcome = handle_click(Some("dismiss"), &origin(), &clients).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Action { action: "dismiss".into() });
        assert!(clients.match_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_click_focuses_existing_window() {
        let clients = InMemoryClients::new();
        clients.register(Url::parse("https://elsewhere.example/").unwrap()).await;
        let ours = clients.register(Url::parse("https://cybersoluce.example/dashboard").unwrap()).await;

        let outcome = handle_click(None, &origin(), &clients).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Focused { client_id: ours.id });
    }

    #[tokio::test]
    async fn test_click_opens_root_when_no_window() {
        let clients = InMemoryClients::new();
        let outcome = handle_click(None, &origin(), &clients).await.unwrap();

        let ClickOutcome::Opened { client_id } = outcome else {
            panic!("expected a new window");
        };
        let windows = clients.match_all().await.unwrap();
        assert_eq!(windows[0].id, client_id);
        assert_eq!(windows[0].url.as_str(), "https://cybersoluce.example/");
    }

    #[tokio::test]
    async fn test_in_memory_notifier_records() {
        let notifier = InMemoryNotifier::new();
        let notification = parse_push(Some(b"{\"title\":\"Hi\"}"), &branding()).unwrap();
        notifier.show(&notification).await.unwrap();
        assert_eq!(notifier.shown().await, vec![notification]);
    }
}
