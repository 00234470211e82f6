//! In-memory wiring of every port the engine consumes.

use std::sync::Arc;

use returnflow_returns::{ReturnModule, ReturnModuleBuilder, ReturnsConfig};

use crate::order::InMemoryOrderSubsystem;
use crate::storage::InMemoryReturnStorage;
use crate::stores::InMemoryStoreDirectory;

/// Shared in-memory adapters. Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    pub storage: Arc<InMemoryReturnStorage>,
    pub orders: Arc<InMemoryOrderSubsystem>,
    pub stores: Arc<InMemoryStoreDirectory>,
}

impl InMemoryBackend {
    pub fn new(
        storage: InMemoryReturnStorage,
        orders: InMemoryOrderSubsystem,
        stores: InMemoryStoreDirectory,
    ) -> Self {
        Self {
            storage: Arc::new(storage),
            orders: Arc::new(orders),
            stores: Arc::new(stores),
        }
    }

    /// Module builder over these adapters; the order subsystem serves both
    /// item lookups and event triggers.
    pub fn module_builder(&self, config: ReturnsConfig) -> ReturnModuleBuilder {
        ReturnModule::builder(
            config,
            self.storage.clone(),
            self.orders.clone(),
            self.stores.clone(),
            self.orders.clone(),
        )
    }

    pub fn module(&self, config: ReturnsConfig) -> ReturnModule {
        self.module_builder(config).build()
    }
}
