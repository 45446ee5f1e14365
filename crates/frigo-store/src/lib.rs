//! Persistence layer for the frigorifico ledger
//!
//! Provides:
//! - A string key/value store with per-key versions
//! - Conditional multi-key commits (compare-and-swap on versions)
//! - SQLite and in-memory backends
//! - Tolerant JSON document helpers and capped, append-only logs

mod audit;
mod json;
mod keys;
mod memory;
mod sqlite;
mod traits;

pub use audit::*;
pub use json::*;
pub use keys::*;
pub use memory::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Version conflict on key '{0}'")]
    VersionConflict(String),

    #[error("Storage quota exceeded")]
    QuotaExceeded,
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::DiskFull => {
                StoreError::QuotaExceeded
            }
            _ => StoreError::Database(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
