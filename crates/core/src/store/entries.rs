//! Entry CRUD operations.
//!
//! Keys are resource URLs exactly as the caller passed them. Values are
//! either the fetched body or a marker recording that the fetch failed.

use super::connection::CacheStore;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Raw fetched body, possibly empty.
    Body(Vec<u8>),
    /// The fetch for this key failed; nothing to serve.
    Failed,
}

impl Payload {
    /// Body bytes, or `None` for a failure marker.
    pub fn into_body(self) -> Option<Vec<u8>> {
        match self {
            Payload::Body(body) => Some(body),
            Payload::Failed => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Payload::Failed)
    }
}

/// Listing row for a stored entry, without the body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntrySummary {
    pub key: String,
    pub size: u64,
    pub failed: bool,
    pub stored_at: String,
}

impl CacheStore {
    /// Get the value stored under `key`.
    ///
    /// Returns None if the key doesn't exist in the store.
    pub async fn get(&self, key: &str) -> Result<Option<Payload>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Payload>, Error> {
                let result = conn.query_row(
                    "SELECT body, failed FROM entries WHERE key = ?1",
                    params![key],
                    |row| {
                        let body: Option<Vec<u8>> = row.get(0)?;
                        let failed: bool = row.get::<_, i32>(1)? == 1;
                        Ok((body, failed))
                    },
                );

                match result {
                    Ok((_, true)) => Ok(Some(Payload::Failed)),
                    Ok((body, false)) => Ok(Some(Payload::Body(body.unwrap_or_default()))),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the value under `key`. Last write wins.
    pub async fn put(&self, key: &str, payload: &Payload) -> Result<(), Error> {
        let key = key.to_string();
        let (body, failed) = match payload {
            Payload::Body(body) => (Some(body.clone()), false),
            Payload::Failed => (None, true),
        };
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (key, body, failed, stored_at) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(key) DO UPDATE SET
                        body = excluded.body,
                        failed = excluded.failed,
                        stored_at = excluded.stored_at",
                    params![key, body, failed as i32, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a single key. Returns whether anything was removed.
    pub async fn delete(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM entries WHERE key = ?1", params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_key(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM entries WHERE key = ?1)",
                    params![key],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM entries ORDER BY key")?;
                let keys = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every key in `keys` inside one transaction.
    ///
    /// Returns the number of deleted entries.
    pub async fn delete_keys(&self, keys: Vec<String>) -> Result<u64, Error> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let mut deleted = 0u64;
                {
                    let mut stmt = tx.prepare("DELETE FROM entries WHERE key = ?1")?;
                    for key in &keys {
                        deleted += stmt.execute(params![key])? as u64;
                    }
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of stored entries.
    pub async fn len(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Summaries of all entries, sorted by key.
    pub async fn list_entries(&self) -> Result<Vec<EntrySummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, COALESCE(LENGTH(body), 0), failed, stored_at
                     FROM entries ORDER BY key",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(EntrySummary {
                            key: row.get(0)?,
                            size: row.get::<_, i64>(1)? as u64,
                            failed: row.get::<_, i32>(2)? == 1,
                            stored_at: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }
}
