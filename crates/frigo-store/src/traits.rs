//! Store trait definitions

use crate::StoreResult;

/// A stored value together with the version it was written at.
///
/// Versions come from a store-wide counter, so a key that is removed and
/// written again never reuses an old version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub value: String,
    pub version: u64,
}

/// Version reported for a key that holds no value
pub const ABSENT_VERSION: u64 = 0;

/// One write of a conditional commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalWrite {
    pub key: String,
    /// Version the caller read; `ABSENT_VERSION` if the key was missing
    pub expected_version: u64,
    pub value: String,
}

impl ConditionalWrite {
    pub fn new(key: impl Into<String>, expected_version: u64, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            expected_version,
            value: value.into(),
        }
    }
}

/// String key/value store
pub trait Store: Send + Sync {
    /// Read a value and its version
    fn get(&self, key: &str) -> StoreResult<Option<Versioned>>;

    /// Write a value unconditionally, returning its new version
    fn set(&self, key: &str, value: &str) -> StoreResult<u64>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Apply every write atomically, but only if each key is still at the
    /// version the caller expects. Fails with `StoreError::VersionConflict`
    /// naming the first stale key, leaving the store untouched.
    fn commit(&self, writes: &[ConditionalWrite]) -> StoreResult<()>;

    /// Read just the value
    fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.get(key)?.map(|v| v.value))
    }
}
