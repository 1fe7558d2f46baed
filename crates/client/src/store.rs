//! Cache store seam used by the worker.
//!
//! Strategies and the lifecycle controller only see [`CacheStore`]; the
//! SQLite-backed [`CacheDb`] is the production implementation.

use async_trait::async_trait;
use soluce_core::{CacheDb, Error, StoredResponse};

/// Partitioned response storage.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open-or-create a partition. Idempotent.
    async fn open(&self, partition: &str) -> Result<(), Error>;

    /// Look up a request identity across all partitions.
    async fn match_any(&self, cache_key: &str) -> Result<Option<StoredResponse>, Error>;

    /// Look up a request identity inside one partition.
    async fn match_in(&self, partition: &str, cache_key: &str) -> Result<Option<StoredResponse>, Error>;

    /// Store a snapshot, overwriting any entry with the same key.
    async fn put(&self, partition: &str, response: &StoredResponse) -> Result<(), Error>;

    /// Drop the oldest entries beyond `max_entries`; returns how many were dropped.
    async fn evict_oldest(&self, partition: &str, max_entries: usize) -> Result<u64, Error>;

    /// Delete one partition and its entries; returns whether it existed.
    async fn delete_partition(&self, partition: &str) -> Result<bool, Error>;

    /// Delete every partition not named in `keep`; returns the deleted names.
    async fn delete_partitions_except(&self, keep: &[String]) -> Result<Vec<String>, Error>;
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        self.open_partition(partition).await
    }

    async fn match_any(&self, cache_key: &str) -> Result<Option<StoredResponse>, Error> {
        self.match_request(cache_key).await
    }

    async fn match_in(&self, partition: &str, cache_key: &str) -> Result<Option<StoredResponse>, Error> {
        CacheDb::match_in(self, partition, cache_key).await
    }

    async fn put(&self, partition: &str, response: &StoredResponse) -> Result<(), Error> {
        CacheDb::put(self, partition, response).await
    }

    async fn evict_oldest(&self, partition: &str, max_entries: usize) -> Result<u64, Error> {
        CacheDb::evict_oldest(self, partition, max_entries).await
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, Error> {
        CacheDb::delete_partition(self, partition).await
    }

    async fn delete_partitions_except(&self, keep: &[String]) -> Result<Vec<String>, Error> {
        CacheDb::delete_partitions_except(self, keep).await
    }
}
