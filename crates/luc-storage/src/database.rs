// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use luc_core::LucError;
use tracing::debug;

use crate::migrations;

/// Map a tokio-rusqlite error onto the storage variant of [`LucError`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> LucError {
    LucError::storage(e)
}

/// Outcome of a closure run on the writer thread: SQL failures abort the
/// call, domain failures are returned alongside a committed or rolled-back
/// transaction.
pub type Staged<T> = rusqlite::Result<Result<T, LucError>>;

/// Handle to the ledger database.
///
/// Wraps a single `tokio_rusqlite::Connection`; every query in this crate
/// goes through it.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, LucError> {
        Self::open_with_options(path, true).await
    }

    /// Open a private in-memory database. Used by tests and the memory-backed guard.
    pub async fn open_in_memory() -> Result<Self, LucError> {
        Self::open_with_options(":memory:", false).await
    }

    /// Open the database with explicit journal settings.
    pub async fn open_with_options(path: &str, wal_mode: bool) -> Result<Self, LucError> {
        if path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(LucError::storage)?;
                }
            }
        }

        let conn = if path == ":memory:" {
            tokio_rusqlite::Connection::open_in_memory().await
        } else {
            tokio_rusqlite::Connection::open(path).await
        }
        .map_err(LucError::storage)?;

        let journal = if wal_mode { "WAL" } else { "DELETE" };
        conn.call(move |conn| -> Staged<()> {
            conn.query_row(&format!("PRAGMA journal_mode = {journal}"), [], |_| Ok(()))?;
            conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;")?;
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(migrations::run_migrations(conn))
        })
        .await
        .map_err(map_tr_err)??;

        debug!(path, wal_mode, "ledger database opened");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    /// The single writer connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run `f` on the writer thread, passing domain errors through.
    pub async fn call<T, F>(&self, f: F) -> Result<T, LucError>
    where
        T: Send + 'static,
        F: FnOnce(&mut rusqlite::Connection) -> Staged<T> + Send + 'static,
    {
        self.conn.call(f).await.map_err(map_tr_err)?
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), LucError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE);", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(path = %self.path, "WAL checkpoint complete");
        Ok(())
    }

    /// Checkpoint and close the connection.
    pub async fn close(self) -> Result<(), LucError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(LucError::storage)
    }
}
