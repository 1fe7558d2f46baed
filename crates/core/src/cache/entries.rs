//! Stored response snapshots.
//!
//! Provides the snapshot type and the put/match operations used by the
//! worker's strategies.

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use super::partitions::ensure_partition;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// Format a timestamp as an HTTP-date (IMF-fixdate).
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Immutable snapshot of a network response at store time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub cache_key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub status_text: String,
    /// Header pairs in response order; names are stored lowercase.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    /// Build a 200 snapshot stamped with the current time in its `date` header.
    pub fn ok(method: &str, url: &str, body: &[u8]) -> Self {
        let now = Utc::now();
        Self {
            cache_key: compute_cache_key(method, url),
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            status: 200,
            status_text: "OK".to_string(),
            headers: vec![("date".to_string(), http_date(now))],
            body: body.to_vec(),
            stored_at: now.to_rfc3339(),
        }
    }

    /// First header value with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace (or add) a header.
    pub fn set_header(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        self.headers.retain(|(k, _)| *k != name);
        self.headers.push((name, value.to_string()));
    }

    /// The parsed `date` header, if present and well-formed.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.header("date")
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|d| d.with_timezone(&Utc))
    }

    /// Age relative to `now` according to the `date` header.
    ///
    /// None when the header is missing or unparseable.
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.date().map(|date| now - date)
    }
}

struct EntryRow {
    cache_key: String,
    method: String,
    url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    const COLUMNS: &'static str =
        "e.cache_key, e.method, e.url, e.status, e.status_text, e.headers_json, e.body, e.stored_at";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            cache_key: row.get(0)?,
            method: row.get(1)?,
            url: row.get(2)?,
            status: row.get(3)?,
            status_text: row.get(4)?,
            headers_json: row.get(5)?,
            body: row.get(6)?,
            stored_at: row.get(7)?,
        })
    }

    fn into_response(self) -> Result<StoredResponse, Error> {
        let headers = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::CorruptEntry(format!("{}: {e}", self.url)))?;
        Ok(StoredResponse {
            cache_key: self.cache_key,
            method: self.method,
            url: self.url,
            status: self.status,
            status_text: self.status_text,
            headers,
            body: self.body,
            stored_at: self.stored_at,
        })
    }
}

fn optional_row(result: rusqlite::Result<EntryRow>) -> Result<Option<StoredResponse>, Error> {
    match result {
        Ok(row) => row.into_response().map(Some),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl CacheDb {
    /// Store a response in a partition, keyed by its request identity.
    ///
    /// Opens the partition if needed. An existing entry with the same key is
    /// replaced and becomes the newest entry for eviction purposes.
    pub async fn put(&self, partition: &str, response: &StoredResponse) -> Result<(), Error> {
        let partition = partition.to_string();
        let response = response.clone();
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let partition_id = ensure_partition(&tx, &partition)?;
                tx.execute(
                    "INSERT OR REPLACE INTO entries (
                        partition_id, cache_key, method, url, status, status_text,
                        headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        partition_id,
                        &response.cache_key,
                        &response.method,
                        &response.url,
                        response.status,
                        &response.status_text,
                        headers_json,
                        &response.body,
                        &response.stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request across all partitions, oldest partition first.
    pub async fn match_request(&self, cache_key: &str) -> Result<Option<StoredResponse>, Error> {
        let cache_key = cache_key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let sql = format!(
                    "SELECT {} FROM entries e JOIN partitions p ON p.id = e.partition_id
                     WHERE e.cache_key = ?1 ORDER BY p.id ASC LIMIT 1",
                    EntryRow::COLUMNS
                );
                optional_row(conn.query_row(&sql, params![cache_key], EntryRow::from_row))
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request inside a single partition.
    pub async fn match_in(&self, partition: &str, cache_key: &str) -> Result<Option<StoredResponse>, Error> {
        let partition = partition.to_string();
        let cache_key = cache_key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let sql = format!(
                    "SELECT {} FROM entries e JOIN partitions p ON p.id = e.partition_id
                     WHERE p.name = ?1 AND e.cache_key = ?2",
                    EntryRow::COLUMNS
                );
                optional_row(conn.query_row(&sql, params![partition, cache_key], EntryRow::from_row))
            })
            .await
            .map_err(Error::from)
    }
}
