//! sw_sync, sw_push and sw_notification_click tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use soluce_client::{Notification, OfflineWorker};

use super::json_result;

/// Parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync tag; only "background-sync" replays queued writes.
    pub tag: String,
}

pub async fn sync_impl(worker: &OfflineWorker, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let outcome = worker.on_sync(&params.tag).await;
    json_result(&outcome)
}

/// Parameters for the sw_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Raw push payload, normally JSON. Omit for an empty push.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Output from the sw_push tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwPushOutput {
    /// Whether a notification was shown.
    pub shown: bool,
    pub notification: Option<Notification>,
}

pub async fn push_impl(worker: &OfflineWorker, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let notification = worker.on_push(params.payload.as_deref().map(str::as_bytes)).await?;
    json_result(&SwPushOutput { shown: notification.is_some(), notification })
}

/// Parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// Action button id, if an action (rather than the notification body) was clicked.
    #[serde(default)]
    pub action: Option<String>,
}

pub async fn notification_click_impl(
    worker: &OfflineWorker, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let outcome = worker.on_notification_click(params.action.as_deref()).await?;
    json_result(&outcome)
}
