//! Current-state record storage boundary.

pub mod in_memory;
pub mod store;

pub use in_memory::InMemoryDataStore;
pub use store::DataStore;
