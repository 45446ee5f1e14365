//! Error types for the frigorifico ledger

use thiserror::Error;

/// Shared error type for parsing and lookups outside the ledger itself
#[derive(Debug, Error)]
pub enum FrigoError {
    #[error("Unknown crate id: {0}")]
    UnknownCrate(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl FrigoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }
}
