use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use super::{validate_id, KeyRecord, KeyStore, PersistenceError};

/// In-memory key store, for tests and for embedding the pipeline
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyStore {
    inner: Arc<RwLock<BTreeMap<String, KeyRecord>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> PersistenceError {
    PersistenceError::Lock(e.to_string())
}

impl KeyStore for MemoryKeyStore {
    fn write(&self, record: &KeyRecord) -> Result<PathBuf, PersistenceError> {
        validate_id(&record.fingerprint_id)?;
        let mut records = self.inner.write().map_err(poisoned)?;
        records.insert(record.fingerprint_id.clone(), record.clone());
        Ok(PathBuf::from(record.file_name()))
    }

    fn read(&self, id: &str) -> Result<Option<KeyRecord>, PersistenceError> {
        validate_id(id)?;
        let records = self.inner.read().map_err(poisoned)?;
        Ok(records.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<String>, PersistenceError> {
        let records = self.inner.read().map_err(poisoned)?;
        Ok(records.keys().cloned().collect())
    }
}
