use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use thiserror::Error;

/// Errors surfaced by a [`KvBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The key exists but holds a value of the wrong type for the
    /// requested operation (a set where a hash was expected, or the
    /// reverse).
    #[error("key holds the wrong value type for this operation")]
    WrongType,
    /// Any other backend failure.
    #[error("backend failure: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Capability set required from the external key-value store.
///
/// This is the complete storage surface of the engine: a hash increment,
/// a hash scan, a set add, a set read, and an absolute expiry. Keys,
/// hash fields, and set members are opaque byte strings because the
/// candidate-set keys embed a binary pack mid-key.
pub trait KvBackend: Send + Sync {
    /// Increment a hash field by `delta`, creating the hash and the
    /// field on demand. Returns the value after the increment.
    fn hincrby(&self, key: &[u8], field: &[u8], delta: i64) -> Result<i64, StorageError>;

    /// Return every field/value pair of the hash at `key`. A missing
    /// key yields an empty list.
    fn hgetall(&self, key: &[u8]) -> Result<Vec<(Vec<u8>, i64)>, StorageError>;

    /// Add `members` to the set at `key`, creating it on demand.
    /// Returns the number of members that were not already present.
    fn sadd(&self, key: &[u8], members: &[&[u8]]) -> Result<usize, StorageError>;

    /// Return every member of the set at `key`. A missing key yields an
    /// empty list. Member order is unspecified.
    fn smembers(&self, key: &[u8]) -> Result<Vec<Vec<u8>>, StorageError>;

    /// Set the absolute expiration time of `key`. Idempotent; a missing
    /// key is a no-op.
    fn expireat(&self, key: &[u8], deadline: i64) -> Result<(), StorageError>;
}

impl<T: KvBackend + ?Sized> KvBackend for Arc<T> {
    fn hincrby(&self, key: &[u8], field: &[u8], delta: i64) -> Result<i64, StorageError> {
        (**self).hincrby(key, field, delta)
    }

    fn hgetall(&self, key: &[u8]) -> Result<Vec<(Vec<u8>, i64)>, StorageError> {
        (**self).hgetall(key)
    }

    fn sadd(&self, key: &[u8], members: &[&[u8]]) -> Result<usize, StorageError> {
        (**self).sadd(key, members)
    }

    fn smembers(&self, key: &[u8]) -> Result<Vec<Vec<u8>>, StorageError> {
        (**self).smembers(key)
    }

    fn expireat(&self, key: &[u8], deadline: i64) -> Result<(), StorageError> {
        (**self).expireat(key, deadline)
    }
}

/// Configuration for selecting and building a backend.
#[derive(Clone, Debug, Default)]
pub enum BackendConfig {
    /// Use an in-memory store. Suitable for tests and ephemeral
    /// deployments; real deployments implement [`KvBackend`] against
    /// their own store and use [`crate::KvBackend`] directly.
    #[default]
    InMemory,
}

impl BackendConfig {
    /// Create an in-memory backend configuration.
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    /// Build the backend described by this configuration.
    pub fn build(&self) -> Result<Box<dyn KvBackend>, StorageError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
        }
    }
}

/// One typed entry in the in-memory store.
enum Entry {
    Hash(HashMap<Vec<u8>, i64>),
    Set(HashSet<Vec<u8>>),
}

/// An in-memory [`KvBackend`] with typed entries and absolute expiry
/// stamps.
///
/// Expiration is passive: `expireat` records the deadline and
/// [`sweep`](InMemoryBackend::sweep) drops every key whose deadline has
/// passed. Reads do not consult the stamps, so tests drive time
/// explicitly.
pub struct InMemoryBackend {
    entries: RwLock<HashMap<Vec<u8>, Entry>>,
    expirations: RwLock<HashMap<Vec<u8>, i64>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            expirations: RwLock::new(HashMap::new()),
        }
    }

    /// The expiration deadline currently stamped on `key`, if any.
    pub fn expiration(&self, key: &[u8]) -> Result<Option<i64>, StorageError> {
        let expirations = self
            .expirations
            .read()
            .map_err(|_| StorageError::backend("poisoned lock"))?;
        Ok(expirations.get(key).copied())
    }

    /// Drop every key whose expiration deadline is at or before `now`.
    /// Returns the number of keys removed.
    pub fn sweep(&self, now: i64) -> Result<usize, StorageError> {
        let mut expirations = self
            .expirations
            .write()
            .map_err(|_| StorageError::backend("poisoned lock"))?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::backend("poisoned lock"))?;
        let expired: Vec<Vec<u8>> = expirations
            .iter()
            .filter(|(_, &deadline)| deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            expirations.remove(key);
            entries.remove(key);
        }
        Ok(expired.len())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KvBackend for InMemoryBackend {
    fn hincrby(&self, key: &[u8], field: &[u8], delta: i64) -> Result<i64, StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::backend("poisoned lock"))?;
        let entry = entries
            .entry(key.to_vec())
            .or_insert_with(|| Entry::Hash(HashMap::new()));
        match entry {
            Entry::Hash(fields) => {
                let value = fields.entry(field.to_vec()).or_insert(0);
                *value += delta;
                Ok(*value)
            }
            Entry::Set(_) => Err(StorageError::WrongType),
        }
    }

    fn hgetall(&self, key: &[u8]) -> Result<Vec<(Vec<u8>, i64)>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::backend("poisoned lock"))?;
        match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::Hash(fields)) => Ok(fields
                .iter()
                .map(|(field, value)| (field.clone(), *value))
                .collect()),
            Some(Entry::Set(_)) => Err(StorageError::WrongType),
        }
    }

    fn sadd(&self, key: &[u8], members: &[&[u8]]) -> Result<usize, StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::backend("poisoned lock"))?;
        let entry = entries
            .entry(key.to_vec())
            .or_insert_with(|| Entry::Set(HashSet::new()));
        match entry {
            Entry::Set(set) => {
                let mut added = 0;
                for member in members {
                    if set.insert(member.to_vec()) {
                        added += 1;
                    }
                }
                Ok(added)
            }
            Entry::Hash(_) => Err(StorageError::WrongType),
        }
    }

    fn smembers(&self, key: &[u8]) -> Result<Vec<Vec<u8>>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::backend("poisoned lock"))?;
        match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(Entry::Hash(_)) => Err(StorageError::WrongType),
        }
    }

    fn expireat(&self, key: &[u8], deadline: i64) -> Result<(), StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::backend("poisoned lock"))?;
        if !entries.contains_key(key) {
            return Ok(());
        }
        drop(entries);
        self.expirations
            .write()
            .map_err(|_| StorageError::backend("poisoned lock"))?
            .insert(key.to_vec(), deadline);
        Ok(())
    }
}
