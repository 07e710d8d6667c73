//! State store seen by the chaincode: a flat key-value space keyed by account name.

use rocksdb::{Options, WriteBatch, DB};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::StoreError;

/// Key-value interface supplied by the host runtime.
///
/// `get` returns `Ok(None)` for an absent key; an `Err` always means the
/// backend failed, regardless of whether the key exists.
pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Writes entries in order. The default is a plain sequence of `put`s, so
    /// entries written before a failing one stay written.
    fn put_batch(&mut self, entries: &[(String, Vec<u8>)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }
}

/// In-memory store, ordered by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Persistent store backed by RocksDB.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path.as_ref())?;
        debug!("Opened state store at {}", path.as_ref().display());
        Ok(RocksStore { db })
    }
}

impl StateStore for RocksStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key.as_bytes())?)
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        Ok(self.db.put(key.as_bytes(), value)?)
    }

    // One WriteBatch: either every entry lands or none does.
    fn put_batch(&mut self, entries: &[(String, Vec<u8>)]) -> Result<(), StoreError> {
        let mut batch = WriteBatch::default();
        for (key, value) in entries {
            batch.put(key.as_bytes(), value);
        }
        Ok(self.db.write(batch)?)
    }
}

/// Test double that fails reads or writes on demand.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FailingStore {
    pub inner: MemoryStore,
    pub fail_get_on: Option<String>,
    pub fail_put_on: Option<String>,
    pub puts: Vec<String>,
}

#[cfg(test)]
impl StateStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if self.fail_get_on.as_deref() == Some(key) {
            return Err(StoreError::Backend(format!("read of {} refused", key)));
        }
        self.inner.get(key)
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if self.fail_put_on.as_deref() == Some(key) {
            return Err(StoreError::Backend(format!("write of {} refused", key)));
        }
        self.puts.push(key.to_string());
        self.inner.put(key, value)
    }
}
