//! Cache-related MCP tools.
//!
//! These read and purge partitions directly, without going through a
//! worker strategy.

pub mod get;
pub mod partitions;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use partitions::partitions_impl;
pub use purge::{CachePurgeParams, purge_impl};
