use std::sync::Arc;

use async_trait::async_trait;

use strata_core::EntityId;
use strata_events::ChangeEvent;

use crate::error::BackendError;

/// Physical stream name of one aggregate instance: `"{entity}-{id}"`.
pub fn stream_name(entity: &str, id: &EntityId) -> String {
    format!("{entity}-{id}")
}

/// Append-only event store boundary.
///
/// Events are organized into **streams**, one per aggregate instance, keyed by
/// `(entity, id)`. Within a stream versions are consecutive (1, 2, 3, ...).
///
/// ## Append Semantics
///
/// `append_events()`:
/// - checks optimistic concurrency: the first appended version must be
///   `current last version + 1` (else [`BackendError::Concurrency`])
/// - requires the batch itself to be consecutive
/// - persists the batch atomically (all or nothing)
/// - returns the physical stream name
///
/// ## Load Semantics
///
/// `load_events()` returns the stream in version order, or an empty vector
/// when the stream does not exist.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn load_events(&self, entity: &str, id: &EntityId) -> Result<Vec<ChangeEvent>, BackendError>;

    async fn append_events(
        &self,
        entity: &str,
        id: &EntityId,
        events: Vec<ChangeEvent>,
    ) -> Result<String, BackendError>;

    /// Drop every stream of `entity` (maintenance).
    async fn destroy_all(&self, entity: &str) -> Result<(), BackendError>;
}

#[async_trait]
impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    async fn load_events(&self, entity: &str, id: &EntityId) -> Result<Vec<ChangeEvent>, BackendError> {
        (**self).load_events(entity, id).await
    }

    async fn append_events(
        &self,
        entity: &str,
        id: &EntityId,
        events: Vec<ChangeEvent>,
    ) -> Result<String, BackendError> {
        (**self).append_events(entity, id, events).await
    }

    async fn destroy_all(&self, entity: &str) -> Result<(), BackendError> {
        (**self).destroy_all(entity).await
    }
}
