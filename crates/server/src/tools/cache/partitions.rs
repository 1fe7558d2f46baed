//! cache_partitions tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use soluce_core::{CacheDb, CacheNames};

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionInfo {
    pub name: String,
    pub entries: u64,
    /// Whether the partition belongs to the running version.
    pub current: bool,
}

/// Output from the cache_partitions tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePartitionsOutput {
    pub partitions: Vec<PartitionInfo>,
}

/// List partitions in creation order with their entry counts.
pub async fn partitions_impl(cache: &CacheDb, names: &CacheNames) -> Result<CallToolResult, McpError> {
    let mut partitions = Vec::new();
    for name in cache.partition_names().await? {
        let entries = cache.entry_count(&name).await?;
        partitions.push(PartitionInfo { current: names.contains(&name), name, entries });
    }
    json_result(&CachePartitionsOutput { partitions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{output, url};
    use soluce_core::StoredResponse;

    #[tokio::test]
    async fn test_lists_partitions_with_counts() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let names = CacheNames::new("cybersoluce", "v1.0.0");
        cache.put("cybersoluce-v0.9.0", &StoredResponse::ok("GET", &url("/"), b"old")).await.unwrap();
        cache.put(&names.dynamic, &StoredResponse::ok("GET", &url("/a"), b"a")).await.unwrap();
        cache.put(&names.dynamic, &StoredResponse::ok("GET", &url("/b"), b"b")).await.unwrap();

        let out: CachePartitionsOutput = output(&partitions_impl(&cache, &names).await.unwrap());

        assert_eq!(out.partitions.len(), 2);
        assert_eq!(out.partitions[0].name, "cybersoluce-v0.9.0");
        assert!(!out.partitions[0].current);
        assert_eq!(out.partitions[1].entries, 2);
        assert!(out.partitions[1].current);
    }

    #[tokio::test]
    async fn test_empty_cache() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let names = CacheNames::new("cybersoluce", "v1.0.0");
        let out: CachePartitionsOutput = output(&partitions_impl(&cache, &names).await.unwrap());
        assert!(out.partitions.is_empty());
    }
}
