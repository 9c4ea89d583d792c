//! Consumable Log Adapter
//!
//! Persists the consumable transaction log as a JSON array under one key.

use crate::domain::{ConsumableTransactionLog, KVStoreError};
use crate::ports::outbound::KeyValueStore;
use parking_lot::Mutex;
use shared_types::TransactionId;
use tracing::debug;

/// Durable consumable transaction log.
pub struct ConsumableLogStore {
    store: Mutex<Box<dyn KeyValueStore>>,
    key: String,
}

impl ConsumableLogStore {
    /// Wrap a key-value store, keeping the log under `key`.
    pub fn new(store: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store: Mutex::new(store),
            key: key.into(),
        }
    }

    /// Key the log is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the persisted log. A missing entry is an empty log.
    pub fn load(&self) -> Result<ConsumableTransactionLog, KVStoreError> {
        let store = self.store.lock();
        self.read(&**store)
    }

    /// Append an identifier and persist. Returns the updated log.
    pub fn append(&self, id: TransactionId) -> Result<ConsumableTransactionLog, KVStoreError> {
        let mut store = self.store.lock();
        let mut log = self.read(&**store)?;
        log.append(id);

        let bytes = serde_json::to_vec(&log).map_err(|e| KVStoreError::Corrupted {
            key: self.key.clone(),
            message: e.to_string(),
        })?;
        store.put(self.key.as_bytes(), &bytes)?;

        debug!(
            transaction_id = id,
            entries = log.len(),
            "[store] Consumable transaction recorded"
        );
        Ok(log)
    }

    fn read(&self, store: &dyn KeyValueStore) -> Result<ConsumableTransactionLog, KVStoreError> {
        match store.get(self.key.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| KVStoreError::Corrupted {
                key: self.key.clone(),
                message: e.to_string(),
            }),
            None => Ok(ConsumableTransactionLog::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FileBackedKVStore, InMemoryKVStore};
    use tempfile::tempdir;

    #[test]
    fn test_empty_by_default() {
        let log = ConsumableLogStore::new(Box::new(InMemoryKVStore::new()), "log");
        assert!(log.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.kv");

        {
            let store = FileBackedKVStore::open(&path).unwrap();
            let log = ConsumableLogStore::new(Box::new(store), "store.consumableTransactionIDs");
            log.append(11).unwrap();
            let updated = log.append(12).unwrap();
            assert_eq!(updated.ids(), &[11, 12]);
        }

        let store = FileBackedKVStore::open(&path).unwrap();
        let log = ConsumableLogStore::new(Box::new(store), "store.consumableTransactionIDs");
        assert_eq!(log.load().unwrap().ids(), &[11, 12]);
    }

    #[test]
    fn test_corrupted_entry_reported() {
        let mut store = InMemoryKVStore::new();
        store.put(b"log", b"not json").unwrap();
        let log = ConsumableLogStore::new(Box::new(store), "log");
        assert!(matches!(log.load(), Err(KVStoreError::Corrupted { .. })));
    }
}
