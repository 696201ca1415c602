//! Shared application state handed to every HTTP handler.
//!
//! Holds the database location rather than a connection: each request opens
//! its own `rusqlite::Connection`, which keeps handlers `Send` and lets
//! SQLite arbitrate concurrent writers (WAL + busy timeout).

use std::path::{Path, PathBuf};
use std::time::Instant;

use rusqlite::Connection;

use crate::db::{self, DatabaseError};

pub struct CoreState {
    db_path: PathBuf,
    started_at: Instant,
}

impl CoreState {
    /// Create state for `db_path` without touching the file.
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            db_path,
            started_at: Instant::now(),
        }
    }

    /// Create state and open the database once so migrations run at startup
    /// instead of on the first request.
    pub fn initialize(db_path: PathBuf) -> Result<Self, CoreError> {
        db::open_database(&db_path)?;
        tracing::info!(path = %db_path.display(), "Database ready");
        Ok(Self::new(db_path))
    }

    /// Open a database connection. Most common operation in handlers.
    pub fn open_db(&self) -> Result<Connection, CoreError> {
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
