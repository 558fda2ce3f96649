//! Persistence layer: event-sourced and snapshotting stores, the storage
//! boundaries they sit on, and the in-memory backends used for tests/dev.

pub mod config;
pub mod data_store;
pub mod error;
pub mod event_sourced;
pub mod event_store;
pub mod query;
pub mod snapshot;


pub use config::StoreOptions;
pub use data_store::{DataStore, InMemoryDataStore};
pub use error::{BackendError, StoreError, StoreResult};
pub use event_sourced::EventSourcedStore;
pub use event_store::{EventStore, InMemoryEventStore, stream_name};
pub use query::{Direction, Filter, Join, JoinKind, JoinedField, Operator, QueryClause, QueryEngine};
pub use snapshot::{DtoSnapshotStore, EntitySnapshotStore, ReadOnlySnapshotStore, SnapshotCore};
