// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! Do NOT create additional Connection instances for writes.

use std::path::Path;
use std::time::Duration;

use parlor_config::model::StorageConfig;
use parlor_core::ParlorError;
use tracing::debug;

/// Handle to the single SQLite writer thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, ParlorError> {
        Self::open_with(path, true).await
    }

    /// Open the database described by the storage section of the config.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, ParlorError> {
        Self::open_with(&config.database_path, config.wal_mode).await
    }

    async fn open_with(path: &str, wal_mode: bool) -> Result<Self, ParlorError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(ParlorError::store)?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(ParlorError::store)?;

        conn.call(move |conn| -> Result<(), ParlorError> {
            let journal = if wal_mode { "WAL" } else { "DELETE" };
            conn.pragma_update_and_check(None, "journal_mode", journal, |row| {
                row.get::<_, String>(0)
            })
            .map_err(ParlorError::store)?;
            conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;")
                .map_err(ParlorError::store)?;
            conn.busy_timeout(Duration::from_secs(5))
                .map_err(ParlorError::store)?;
            crate::migrations::run_migrations(conn)
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(inner) => inner,
            other => ParlorError::StoreUnavailable {
                source: other.to_string().into(),
            },
        })?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying connection. Every query goes through its `call()`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), ParlorError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Convert a tokio-rusqlite error into a `ParlorError`.
///
/// Uniqueness violations become [`ParlorError::Conflict`]; everything else is
/// a store failure.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ParlorError {
    if let tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(err, msg)) = &e {
        if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        {
            return ParlorError::Conflict(
                msg.clone()
                    .unwrap_or_else(|| "uniqueness constraint violated".to_string()),
            );
        }
    }
    ParlorError::store(e)
}
