//! SQLite-backed cache store.
//!
//! One row per URL:
//! `url TEXT PRIMARY KEY, headers TEXT NOT NULL, body BLOB NOT NULL`,
//! with the header block stored as a JSON array of `[name, value]`
//! pairs so order and duplicates survive the round trip.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use proxima_http::Headers;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};
use tokio_rusqlite::{Connection, params};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::record::CacheRecord;
use crate::store::CacheStore;

/// Persistent store over a `tokio-rusqlite` connection.
///
/// The `try_*` methods report failures; the `CacheStore` impl logs them
/// and degrades to "absent".
#[derive(Clone, Debug)]
pub struct SqliteStore {
    conn: Connection,
    table: Arc<str>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and the cache table.
    pub async fn open(path: impl AsRef<Path>, table: &str) -> Result<Self, StoreError> {
        check_table_name(table)?;
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;
        Self::init(conn, table).await
    }

    /// In-memory database with the same schema, for tests.
    pub async fn open_in_memory(table: &str) -> Result<Self, StoreError> {
        check_table_name(table)?;
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Database(e.into()))?;
        Self::init(conn, table).await
    }

    async fn init(conn: Connection, table: &str) -> Result<Self, StoreError> {
        let ddl = format!(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             CREATE TABLE IF NOT EXISTS {table} (
                 url     TEXT PRIMARY KEY,
                 headers TEXT NOT NULL,
                 body    BLOB NOT NULL
             );"
        );

        conn.call(move |conn| -> rusqlite::Result<()> {
            conn.execute_batch(&ddl)?;
            Ok(())
        })
        .await?;

        debug!(target: "proxima::store", table, "SQLite cache table ready");

        Ok(Self {
            conn,
            table: Arc::from(table),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn try_get(&self, key: &str) -> Result<Option<CacheRecord>, StoreError> {
        let sql = format!("SELECT headers, body FROM {} WHERE url = ?1", self.table);
        let url = key.to_string();

        let row = self
            .conn
            .call(move |conn| -> rusqlite::Result<Option<(String, Vec<u8>)>> {
                conn.query_row(&sql, params![url], |row| Ok((row.get(0)?, row.get(1)?)))
                    .optional()
            })
            .await?;

        let Some((headers_json, body)) = row else {
            return Ok(None);
        };

        let pairs: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
        Ok(Some(CacheRecord::new(
            key,
            Headers::from(pairs),
            Bytes::from(body),
        )))
    }

    pub async fn try_put(&self, key: &str, record: &CacheRecord) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (url, headers, body) VALUES (?1, ?2, ?3)
             ON CONFLICT(url) DO UPDATE SET
                 headers = excluded.headers,
                 body = excluded.body",
            self.table
        );
        let url = key.to_string();
        let headers_json = serde_json::to_string(record.headers.as_pairs())?;
        let body = record.body.to_vec();

        self.conn
            .call(move |conn| -> rusqlite::Result<()> {
                conn.execute(&sql, params![url, headers_json, body])?;
                Ok(())
            })
            .await
            .map_err(StoreError::from)
    }

    pub async fn try_delete(&self, key: &str) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE url = ?1", self.table);
        let url = key.to_string();

        self.conn
            .call(move |conn| -> rusqlite::Result<()> {
                conn.execute(&sql, params![url])?;
                Ok(())
            })
            .await
            .map_err(StoreError::from)
    }

    pub async fn try_exists(&self, key: &str) -> Result<bool, StoreError> {
        let sql = format!("SELECT 1 FROM {} WHERE url = ?1", self.table);
        let url = key.to_string();

        let found = self
            .conn
            .call(move |conn| -> rusqlite::Result<Option<i64>> {
                conn.query_row(&sql, params![url], |row| row.get(0)).optional()
            })
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn get(&self, key: &str) -> Option<CacheRecord> {
        match self.try_get(key).await {
            Ok(record) => record,
            Err(e) => {
                warn!(target: "proxima::store", url = key, error = %e, "Cache read failed; treating as absent");
                None
            }
        }
    }

    async fn put(&self, key: &str, record: CacheRecord) {
        if let Err(e) = self.try_put(key, &record).await {
            warn!(target: "proxima::store", url = key, error = %e, "Cache write failed; skipped");
        }
    }

    async fn delete(&self, key: &str) {
        if let Err(e) = self.try_delete(key).await {
            warn!(target: "proxima::store", url = key, error = %e, "Cache delete failed; skipped");
        }
    }

    async fn exists(&self, key: &str) -> bool {
        match self.try_exists(key).await {
            Ok(found) => found,
            Err(e) => {
                warn!(target: "proxima::store", url = key, error = %e, "Cache lookup failed; treating as absent");
                false
            }
        }
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

// The table name is spliced into SQL text, so only plain identifiers pass.
fn check_table_name(table: &str) -> Result<(), StoreError> {
    let mut chars = table.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(StoreError::InvalidTable(table.to_string()))
    }
}
