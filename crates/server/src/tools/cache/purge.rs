//! cache_purge tool implementation.
//!
//! Purges cache entries by age or count, or drops a whole partition.

use chrono::{Duration, Utc};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use soluce_core::{CacheDb, Error};

use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Limit the purge to this partition. Given alone, the partition is deleted.
    pub partition: Option<String>,

    /// Keep only the newest N entries in each affected partition.
    pub max_entries: Option<usize>,

    /// Purge entries stored more than this many days ago.
    pub older_than_days: Option<i64>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
    /// Partitions removed entirely.
    pub deleted_partitions: Vec<String>,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &CacheDb, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.partition.is_none() && params.older_than_days.is_none() && params.max_entries.is_none() {
        return Err(Error::InvalidInput(
            "At least one of partition, older_than_days, or max_entries must be specified".to_string(),
        )
        .into());
    }

    if let Some(days) = params.older_than_days
        && days < 0
    {
        return Err(Error::InvalidInput(format!("older_than_days must not be negative, got {days}")).into());
    }

    let mut output = CachePurgeOutput { deleted: 0, deleted_partitions: Vec::new() };

    if params.older_than_days.is_none() && params.max_entries.is_none() {
        if let Some(partition) = params.partition {
            let entries = cache.entry_count(&partition).await?;
            if !cache.delete_partition(&partition).await? {
                return Err(Error::CacheMiss(format!("no partition named {partition}")).into());
            }
            output.deleted = entries;
            output.deleted_partitions.push(partition);
        }
        return json_result(&output);
    }

    if let Some(days) = params.older_than_days {
        let cutoff = Duration::try_days(days)
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .ok_or_else(|| Error::InvalidInput(format!("older_than_days is out of range: {days}")))?;
        output.deleted += cache.purge_older_than(params.partition.as_deref(), cutoff).await?;
    }

    if let Some(max_entries) = params.max_entries {
        let targets = match &params.partition {
            Some(partition) => vec![partition.clone()],
            None => cache.partition_names().await?,
        };
        for partition in targets {
            output.deleted += cache.evict_oldest(&partition, max_entries).await?;
        }
    }

    tracing::info!(deleted = output.deleted, "purged cache entries");
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{output, url};
    use soluce_core::StoredResponse;

    const DYNAMIC: &str = "cybersoluce-dynamic-v1.0.0";
    const STATIC: &str = "cybersoluce-static-v1.0.0";

    async fn seeded() -> CacheDb {
        let cache = CacheDb::open_in_memory().await.unwrap();
        for path in ["/api/a", "/api/b", "/api/c"] {
            cache.put(DYNAMIC, &StoredResponse::ok("GET", &url(path), b"{}")).await.unwrap();
        }
        cache.put(STATIC, &StoredResponse::ok("GET", &url("/app.js"), b"x")).await.unwrap();
        cache
    }

    #[tokio::test]
    async fn test_purge_max_entries_in_partition() {
        let cache = seeded().await;
        let params = CachePurgeParams { partition: Some(DYNAMIC.into()), max_entries: Some(1), ..Default::default() };

        let out: CachePurgeOutput = output(&purge_impl(&cache, params).await.unwrap());

        assert_eq!(out.deleted, 2);
        assert_eq!(cache.keys(DYNAMIC).await.unwrap(), vec![url("/api/c")]);
        assert_eq!(cache.entry_count(STATIC).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_max_entries_everywhere() {
        let cache = seeded().await;
        let params = CachePurgeParams { max_entries: Some(0), ..Default::default() };

        let out: CachePurgeOutput = output(&purge_impl(&cache, params).await.unwrap());
        assert_eq!(out.deleted, 4);
    }

    #[tokio::test]
    async fn test_purge_older_than_keeps_recent() {
        let cache = seeded().await;
        let params = CachePurgeParams { older_than_days: Some(1), ..Default::default() };

        let out: CachePurgeOutput = output(&purge_impl(&cache, params).await.unwrap());
        assert_eq!(out.deleted, 0);
    }

    #[tokio::test]
    async fn test_purge_whole_partition() {
        let cache = seeded().await;
        let params = CachePurgeParams { partition: Some(DYNAMIC.into()), ..Default::default() };

        let out: CachePurgeOutput = output(&purge_impl(&cache, params).await.unwrap());

        assert_eq!(out.deleted, 3);
        assert_eq!(out.deleted_partitions, vec![DYNAMIC]);
        assert!(!cache.has_partition(DYNAMIC).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let result = purge_impl(&cache, CachePurgeParams::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_purge_out_of_range_days() {
        let cache = seeded().await;
        let params = CachePurgeParams { older_than_days: Some(i64::MAX / 2), ..Default::default() };

        assert!(purge_impl(&cache, params).await.is_err());
        assert_eq!(cache.entry_count(DYNAMIC).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_purge_negative_days() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CachePurgeParams { older_than_days: Some(-1), ..Default::default() };
        assert!(purge_impl(&cache, params).await.is_err());
    }
}
