//! SQLite-backed cache partitions for intercepted responses.
//!
//! This module provides named cache partitions using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Idempotent open-or-create of named partitions
//! - Request-keyed response snapshots with overwrite semantics
//! - FIFO eviction by insertion order
//! - Whole-partition deletion for version upgrades
//! - Automatic schema migrations

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredResponse;
pub use hash::compute_cache_key;
