//! Shared state blackboard
//!
//! A thread-safe, string-keyed value store shared by every step in a run:
//! - Typed get/set through serde
//! - A "public" filtered view for diagnostics (keys prefixed `_` are private)
//! - All access serialized through an internal reader/writer lock
//!
//! Individual get/set calls are atomic. Multi-step read-compute-write
//! sequences are not; composite invariants across keys belong to the calling
//! steps.

use crate::error::{json_type_name, StateError};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Keys starting with this prefix are omitted from the public view
pub const PRIVATE_PREFIX: &str = "_";

/// The mutable blackboard shared across one run's steps
///
/// Cloning is cheap; clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl SharedState {
    /// Create an empty state
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the state from initial values, overwriting existing keys
    pub fn seed(&self, values: HashMap<String, Value>) {
        let mut map = self.inner.write();
        for (key, value) in values {
            map.insert(key, value);
        }
    }

    /// Store a value under `key`
    ///
    /// # Errors
    /// - `StateError::Unserializable` if the value cannot be represented as JSON
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<(), StateError> {
        let value = serde_json::to_value(value).map_err(|e| StateError::Unserializable {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.inner.write().insert(key.to_string(), value);
        Ok(())
    }

    /// Read the value under `key` as `T`
    ///
    /// Returns `Ok(None)` for an absent key. A present value that does not
    /// deserialize as `T` is a hard error, not a silent miss.
    ///
    /// # Errors
    /// - `StateError::WrongType` if the stored value is not a `T`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StateError> {
        let value = match self.inner.read().get(key) {
            Some(v) => v.clone(),
            None => return Ok(None),
        };
        let found = json_type_name(&value);
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StateError::WrongType {
                key: key.to_string(),
                found,
                message: e.to_string(),
            })
    }

    /// Read the raw JSON value under `key`
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.inner.read().get(key).cloned()
    }

    /// Remove and return the value under `key`
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.write().remove(key)
    }

    /// Whether `key` is present
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Number of stored keys, private ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the state holds no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// The public view: every key not prefixed `_`
    #[must_use]
    pub fn public_view(&self) -> HashMap<String, Value> {
        self.inner
            .read()
            .iter()
            .filter(|(k, _)| !k.starts_with(PRIVATE_PREFIX))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// The public view as a single JSON object, for log snapshots
    #[must_use]
    pub fn snapshot(&self) -> Value {
        Value::Object(
            self.inner
                .read()
                .iter()
                .filter(|(k, _)| !k.starts_with(PRIVATE_PREFIX))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}
