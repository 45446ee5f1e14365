//! JSON document helpers on top of a `Store`
//!
//! Reads are tolerant: a missing key or a value that is not valid JSON
//! yields an empty document (the latter with a warning). Backend failures
//! are still returned as errors.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::{Store, StorageKey, StoreResult, ABSENT_VERSION};

/// A parsed JSON document and the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub value: Value,
    pub version: u64,
}

impl Document {
    fn empty(version: u64) -> Self {
        Self {
            value: Value::Null,
            version,
        }
    }

    /// Array elements, or nothing when the document is not an array
    pub fn elements(&self) -> &[Value] {
        self.value.as_array().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Deserialize each array element, skipping the ones that do not fit `T`
    pub fn list<T: DeserializeOwned>(&self, key: StorageKey) -> Vec<T> {
        let mut items = Vec::new();
        for (index, element) in self.elements().iter().enumerate() {
            match serde_json::from_value::<T>(element.clone()) {
                Ok(item) => items.push(item),
                Err(e) => warn!(%key, index, error = %e, "Skipping malformed stored entry"),
            }
        }
        items
    }
}

/// Load a document. Missing keys and malformed JSON come back as `Value::Null`.
pub fn load_document(store: &dyn Store, key: StorageKey) -> StoreResult<Document> {
    let Some(stored) = store.get(key.as_str())? else {
        return Ok(Document::empty(ABSENT_VERSION));
    };

    match serde_json::from_str::<Value>(&stored.value) {
        Ok(value) => Ok(Document {
            value,
            version: stored.version,
        }),
        Err(e) => {
            warn!(%key, error = %e, "Stored value is not valid JSON, using empty default");
            Ok(Document::empty(stored.version))
        }
    }
}

/// Load an array of `T`, tolerating missing keys and malformed entries
pub fn load_list<T: DeserializeOwned>(store: &dyn Store, key: StorageKey) -> StoreResult<Vec<T>> {
    Ok(load_document(store, key)?.list(key))
}

/// Serialize and store a value unconditionally
pub fn save_json<T: Serialize + ?Sized>(store: &dyn Store, key: StorageKey, value: &T) -> StoreResult<u64> {
    let json = serde_json::to_string(value)?;
    store.set(key.as_str(), &json)
}

/// Append an entry to a list and keep only the most recent `cap` entries
pub fn append_capped<T: Serialize + DeserializeOwned>(
    store: &dyn Store,
    key: StorageKey,
    entry: T,
    cap: usize,
) -> StoreResult<()> {
    let mut entries: Vec<T> = load_list(store, key)?;
    entries.push(entry);
    let excess = entries.len().saturating_sub(cap);
    entries.drain(..excess);
    save_json(store, key, &entries)?;
    Ok(())
}
