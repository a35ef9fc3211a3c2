//! Store connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas,
//! and running migrations. Handles are meant to be short-lived: open one
//! around an operation and close it right after.

use super::migrations;
use crate::Error;
use std::path::{Path, PathBuf};
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;";

/// Store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Dropping the handle releases the connection.
#[derive(Debug)]
pub struct CacheStore {
    pub(crate) conn: Connection,
    path: Option<PathBuf>,
}

impl CacheStore {
    /// Open the store at the specified path.
    ///
    /// Creates the parent directory and the file if they don't exist,
    /// applies pragmas, and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = Connection::open(&path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(&conn).await?;

        Ok(Self { conn, path: Some(path) })
    }

    /// Open an in-memory store for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::prepare(&conn).await?;

        Ok(Self { conn, path: None })
    }

    async fn prepare(conn: &Connection) -> Result<(), Error> {
        conn.call(|conn| conn.execute_batch(PRAGMAS))
            .await
            .map_err(Error::Database)?;

        migrations::run(conn).await
    }

    /// Path of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the connection, waiting for the background thread to finish.
    pub async fn close(self) -> Result<(), Error> {
        self.conn.close().await.map_err(Error::Database)
    }
}
