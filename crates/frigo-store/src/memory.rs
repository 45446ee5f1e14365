//! In-memory store, used by tests and throwaway sessions

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{ConditionalWrite, Store, StoreError, StoreResult, Versioned, ABSENT_VERSION};

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, Versioned>,
    last_version: u64,
}

impl MemoryState {
    fn bytes_with(&self, key: &str, value: &str) -> usize {
        let others: usize = self
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.value.len())
            .sum();
        others + key.len() + value.len()
    }

    fn write(&mut self, key: &str, value: &str) -> u64 {
        self.last_version += 1;
        let version = self.last_version;
        self.entries.insert(
            key.to_string(),
            Versioned {
                value: value.to_string(),
                version,
            },
        );
        version
    }
}

/// Store that keeps everything in a `HashMap`.
///
/// An optional byte quota makes writes fail with `StoreError::QuotaExceeded`
/// once the total size of keys and values would go over it.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    quota_bytes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            quota_bytes: AtomicUsize::new(usize::MAX),
        }
    }

    pub fn with_quota(bytes: usize) -> Self {
        let store = Self::new();
        store.set_quota(Some(bytes));
        store
    }

    /// Change the quota; `None` removes it
    pub fn set_quota(&self, bytes: Option<usize>) {
        self.quota_bytes
            .store(bytes.unwrap_or(usize::MAX), Ordering::SeqCst);
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn check_quota(&self, state: &MemoryState, key: &str, value: &str) -> StoreResult<()> {
        let quota = self.quota_bytes.load(Ordering::SeqCst);
        if state.bytes_with(key, value) > quota {
            warn!(key, quota, "Write rejected, quota exceeded");
            return Err(StoreError::QuotaExceeded);
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Versioned>> {
        Ok(self.lock()?.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<u64> {
        let mut state = self.lock()?;
        self.check_quota(&state, key, value)?;
        let version = state.write(key, value);
        debug!(key, version, "Value stored");
        Ok(version)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.lock()?.entries.remove(key);
        Ok(())
    }

    fn commit(&self, writes: &[ConditionalWrite]) -> StoreResult<()> {
        let mut state = self.lock()?;

        for write in writes {
            let current = state
                .entries
                .get(&write.key)
                .map(|v| v.version)
                .unwrap_or(ABSENT_VERSION);
            if current != write.expected_version {
                return Err(StoreError::VersionConflict(write.key.clone()));
            }
            self.check_quota(&state, &write.key, &write.value)?;
        }

        for write in writes {
            state.write(&write.key, &write.value);
        }
        Ok(())
    }
}
