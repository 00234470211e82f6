//! Store directory adapter.

use std::collections::HashMap;
use std::sync::RwLock;

use returnflow_core::StoreName;
use returnflow_returns::{CollaboratorError, Store, StoreDirectory};

/// In-memory store directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStoreDirectory {
    stores: RwLock<HashMap<StoreName, Store>>,
}

impl InMemoryStoreDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(self, store: Store) -> Self {
        self.insert(store);
        self
    }

    pub fn insert(&self, store: Store) {
        if let Ok(mut stores) = self.stores.write() {
            stores.insert(store.name.clone(), store);
        }
    }
}

impl StoreDirectory for InMemoryStoreDirectory {
    fn find_store(&self, name: &StoreName) -> Result<Option<Store>, CollaboratorError> {
        let stores = self
            .stores
            .read()
            .map_err(|_| CollaboratorError::new("in_memory_store_directory", "lock poisoned"))?;
        Ok(stores.get(name).cloned())
    }
}
