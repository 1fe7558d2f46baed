//! Unified error types for the soluce offline worker.
//!
//! Each variant carries a stable code prefix so host adapters can map
//! failures without string matching on the free-form message.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown request mode).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unresolvable URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No cache entry found for the given request.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Storage refused the operation (quota exceeded, storage disabled).
    #[error("CACHE_ERROR: storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A stored row could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// The network could not be reached (connection refused, DNS, abort).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// The network did not answer within the configured timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Precaching failed; the install step is rejected.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// A lifecycle event arrived in a state that cannot accept it.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),
}

impl Error {
    /// Whether this error means the network attempt itself failed.
    ///
    /// Strategies use this to decide between a cache fallback and
    /// propagating the error unchanged.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Error::Network(_) | Error::FetchTimeout(_) | Error::FetchTooLarge(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Network(msg) => (-32004, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::InstallFailed(msg) => (-32009, msg.clone()),
            Error::InvalidState(msg) => (-32010, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::CorruptEntry(msg) => (-32002, msg.clone()),
            Error::StorageUnavailable(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("GET https://example.com/".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("example.com"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::InstallFailed("/manifest.json: status 404".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32009);
    }

    #[test]
    fn test_network_failure_classification() {
        assert!(Error::Network("refused".into()).is_network_failure());
        assert!(Error::FetchTimeout("20000ms".into()).is_network_failure());
        assert!(!Error::CacheMiss("x".into()).is_network_failure());
        assert!(!Error::InvalidState("x".into()).is_network_failure());
    }
}
