//! Core types and shared functionality for the soluce offline worker.
//!
//! This crate provides:
//! - Cache partitions with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, StoredResponse};
pub use config::{AppConfig, CacheNames, ConfigError};
pub use error::Error;
