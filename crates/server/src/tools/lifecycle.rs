//! sw_install and sw_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use soluce_client::{ActivateReport, OfflineWorker, WorkerState};

use super::json_result;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutput {
    /// Lifecycle state after the call.
    pub state: String,
    /// Number of precached manifest entries.
    pub precached: usize,
    /// Present when the worker skipped waiting and activated in the same call.
    pub activation: Option<ActivationOutput>,
}

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivationOutput {
    pub state: String,
    /// Old-version partitions that were deleted.
    pub deleted_partitions: Vec<String>,
    pub claimed_clients: usize,
}

fn state_name(state: WorkerState) -> String {
    serde_json::to_value(state)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{state:?}").to_lowercase())
}

impl ActivationOutput {
    fn new(state: WorkerState, report: ActivateReport) -> Self {
        Self {
            state: state_name(state),
            deleted_partitions: report.deleted_partitions,
            claimed_clients: report.claimed_clients,
        }
    }
}

/// Precache the manifest; activates straight away when the worker skips waiting.
pub async fn install_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let report = worker.on_install().await?;

    let activation = if report.skip_waiting {
        let activated = worker.on_activate().await?;
        Some(ActivationOutput::new(worker.state().await, activated))
    } else {
        None
    };

    let output = InstallOutput { state: state_name(worker.state().await), precached: report.precached, activation };
    json_result(&output)
}

pub async fn activate_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let report = worker.on_activate().await?;
    json_result(&ActivationOutput::new(worker.state().await, report))
}
