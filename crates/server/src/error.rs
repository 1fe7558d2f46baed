//! Errors raised by the host adapter itself, before a worker event runs.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Host-side failures translating tool parameters into worker events.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A tool parameter could not be turned into a request or event.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A tool result could not be encoded.
    #[error("SERIALIZE_FAILED: {0}")]
    SerializeFailed(String),
}

impl From<HostError> for McpError {
    fn from(err: HostError) -> Self {
        let (code, message) = match &err {
            HostError::InvalidInput(_) => (-32602, err.to_string()),
            HostError::SerializeFailed(_) => (-32603, err.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
