//! Partition management.
//!
//! A partition is a named bucket of stored responses. Partitions are created
//! on first use and deleted wholesale when a new worker version activates.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::{params, rusqlite};

/// Look up a partition id, creating the partition if it does not exist.
pub(crate) fn ensure_partition(conn: &rusqlite::Connection, name: &str) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    conn.query_row("SELECT id FROM partitions WHERE name = ?1", params![name], |row| row.get(0))
}

impl CacheDb {
    /// Open a partition, creating it if needed. Idempotent.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_partition(conn, &name)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Whether a partition with this name exists.
    pub async fn has_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All partition names in creation order.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and every entry in it.
    ///
    /// Returns false if no partition had that name.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every partition whose name is not in `keep`.
    ///
    /// Returns the deleted names in creation order.
    pub async fn delete_partitions_except(&self, keep: &[String]) -> Result<Vec<String>, Error> {
        let keep = keep.to_vec();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction()?;
                let stale: Vec<String> = {
                    let mut stmt = tx.prepare("SELECT name FROM partitions ORDER BY id ASC")?;
                    stmt.query_map([], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, _>>()?
                        .into_iter()
                        .filter(|name| !keep.contains(name))
                        .collect()
                };
                for name in &stale {
                    tx.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                }
                tx.commit()?;
                Ok(stale)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries stored in a partition (0 if it does not exist).
    pub async fn entry_count(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries e JOIN partitions p ON p.id = e.partition_id
                     WHERE p.name = ?1",
                    params![partition],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in a partition, oldest insertion first.
    pub async fn keys(&self, partition: &str) -> Result<Vec<String>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.url FROM entries e JOIN partitions p ON p.id = e.partition_id
                     WHERE p.name = ?1 ORDER BY e.id ASC",
                )?;
                let urls = stmt
                    .query_map(params![partition], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the oldest entries until the partition holds at most `max_entries`.
    ///
    /// Order is insertion order (FIFO); reads do not refresh an entry.
    /// Returns the number of deleted entries.
    pub async fn evict_oldest(&self, partition: &str, max_entries: usize) -> Result<u64, Error> {
        let partition = partition.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries e JOIN partitions p ON p.id = e.partition_id
                     WHERE p.name = ?1",
                    params![partition],
                    |row| row.get(0),
                )?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE id IN (
                        SELECT e.id FROM entries e JOIN partitions p ON p.id = e.partition_id
                        WHERE p.name = ?1 ORDER BY e.id ASC LIMIT ?2
                    )",
                    params![partition, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries stored before `cutoff`, optionally limited to one partition.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_older_than(
        &self, partition: Option<&str>, cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, Error> {
        let partition = partition.map(str::to_string);
        let cutoff = cutoff.to_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let deleted = match partition {
                    Some(name) => conn.execute(
                        "DELETE FROM entries WHERE stored_at < ?1 AND partition_id IN (
                            SELECT id FROM partitions WHERE name = ?2
                        )",
                        params![cutoff, name],
                    )?,
                    None => conn.execute("DELETE FROM entries WHERE stored_at < ?1", params![cutoff])?,
                };
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::{CacheDb, StoredResponse};

    #[tokio::test]
    async fn test_open_partition_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("cybersoluce-static-v1.0.0").await.unwrap();
        db.open_partition("cybersoluce-static-v1.0.0").await.unwrap();

        assert_eq!(db.partition_names().await.unwrap(), vec!["cybersoluce-static-v1.0.0"]);
        assert!(db.has_partition("cybersoluce-static-v1.0.0").await.unwrap());
        assert!(!db.has_partition("cybersoluce-dynamic-v1.0.0").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_partitions_except_keeps_current() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["cybersoluce-v0.9.0", "cybersoluce-v1.0.0", "cybersoluce-static-v1.0.0", "other-cache"] {
            db.open_partition(name).await.unwrap();
        }
        db.put("cybersoluce-v0.9.0", &StoredResponse::ok("GET", "https://example.com/old.js", b"old"))
            .await
            .unwrap();

        let keep = vec!["cybersoluce-v1.0.0".to_string(), "cybersoluce-static-v1.0.0".to_string()];
        let deleted = db.delete_partitions_except(&keep).await.unwrap();

        assert_eq!(deleted, vec!["cybersoluce-v0.9.0", "other-cache"]);
        assert_eq!(db.partition_names().await.unwrap(), keep);
        assert_eq!(db.entry_count("cybersoluce-v0.9.0").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_evict_oldest_is_fifo() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for i in 0..5 {
            let url = format!("https://example.com/api/items/{i}");
            db.put("dynamic", &StoredResponse::ok("GET", &url, b"{}")).await.unwrap();
        }

        let deleted = db.evict_oldest("dynamic", 3).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(
            db.keys("dynamic").await.unwrap(),
            vec![
                "https://example.com/api/items/2",
                "https://example.com/api/items/3",
                "https://example.com/api/items/4",
            ]
        );
    }

    #[tokio::test]
    async fn test_evict_under_cap_is_noop() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put("dynamic", &StoredResponse::ok("GET", "https://example.com/a", b"a"))
            .await
            .unwrap();
        assert_eq!(db.evict_oldest("dynamic", 50).await.unwrap(), 0);
        assert_eq!(db.evict_oldest("missing", 50).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut old = StoredResponse::ok("GET", "https://example.com/old", b"old");
        old.stored_at = (chrono::Utc::now() - chrono::Duration::days(30)).to_rfc3339();
        db.put("dynamic", &old).await.unwrap();
        db.put("dynamic", &StoredResponse::ok("GET", "https://example.com/new", b"new"))
            .await
            .unwrap();
        db.put("static", &old).await.unwrap();

        let cutoff = chrono::Utc::now() - chrono::Duration::days(7);
        assert_eq!(db.purge_older_than(Some("dynamic"), cutoff).await.unwrap(), 1);
        assert_eq!(db.keys("dynamic").await.unwrap(), vec!["https://example.com/new"]);
        assert_eq!(db.purge_older_than(None, cutoff).await.unwrap(), 1);
        assert_eq!(db.entry_count("static").await.unwrap(), 0);
    }
}
