// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread; the `Database` struct IS the single writer. Query modules accept
//! `&Database` and go through `connection().call()`. This is what makes the
//! read-decide-write sequences in the query layer (idempotent inserts,
//! monotonic status updates, the round-robin cursor) atomic.

use atende_core::AtendeError;
use tracing::debug;

/// Handle to the SQLite database, wrapping a single serialized connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path`, applies PRAGMAs,
    /// and runs pending migrations.
    pub async fn open(path: &str) -> Result<Self, AtendeError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| AtendeError::Storage {
                source: Box::new(e),
            })?;
        }

        // Migrations run on a short-lived blocking connection before the
        // serialized async handle opens.
        let migration_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), AtendeError> {
            let mut conn =
                rusqlite::Connection::open(&migration_path).map_err(|e| AtendeError::Storage {
                    source: Box::new(e),
                })?;
            crate::migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| AtendeError::Storage {
            source: Box::new(e),
        })??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| AtendeError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// The underlying serialized connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL; call before shutdown.
    pub async fn close(&self) -> Result<(), AtendeError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Maps tokio-rusqlite errors into the platform storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> AtendeError {
    AtendeError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("open.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());

        // Schema exists after migration.
        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                let n = conn.query_row(
                    "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'messages'",
                    [],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dirs/atende.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.db");
        {
            let db = Database::open(path.to_str().unwrap()).await.unwrap();
            db.close().await.unwrap();
        }
        // Second open must not re-run applied migrations.
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }
}
