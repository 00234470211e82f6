//! Infrastructure layer: in-memory adapters for the return lifecycle engine
//! ports, plus configuration loading.

pub mod backend;
pub mod config;
pub mod order;
pub mod storage;
pub mod stores;

pub use backend::InMemoryBackend;
pub use order::InMemoryOrderSubsystem;
pub use storage::InMemoryReturnStorage;
pub use stores::InMemoryStoreDirectory;
