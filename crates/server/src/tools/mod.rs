//! MCP tool implementations.
//!
//! Worker tools dispatch lifecycle, fetch and notification events; cache
//! tools inspect and purge partitions directly.

pub mod cache;
pub mod events;
pub mod fetch;
pub mod lifecycle;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::HostError;

/// Encode a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| HostError::SerializeFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
