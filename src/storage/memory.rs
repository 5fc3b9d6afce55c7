//! In-memory store, for dry runs and tests

use crate::resource::Resource;
use crate::storage::traits::{Store, StoreError, StoreResult};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Store that keeps every resource in a map for the life of the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    resources: RwLock<BTreeMap<String, Resource>>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Resource> {
        self.resources
            .read()
            .ok()
            .and_then(|resources| resources.get(key).cloned())
    }

    /// Keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.resources
            .read()
            .map(|resources| resources.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.resources.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Store for MemoryStore {
    fn write(&self, key: &str, resource: &Resource) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }

        let mut resources = self
            .resources
            .write()
            .map_err(|_| StoreError::Database("memory store lock poisoned".to_string()))?;
        resources.insert(key.to_string(), resource.clone());
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
