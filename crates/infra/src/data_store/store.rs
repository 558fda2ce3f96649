use std::sync::Arc;

use async_trait::async_trait;

use strata_core::{CommandEntity, DomainFactory, EntityId, GenericEntity, SchemaMetadata};

use crate::error::StoreResult;
use crate::query::QueryClause;

/// Current-state record storage, scoped by container.
///
/// One record per identity. Implementations provide atomic single-record
/// writes; everything above this boundary (merge, soft delete) is done by the
/// snapshot stores.
///
/// Reads take the caller's `schema` and `factory`: stored value objects are
/// validated against the registry of the store that asked for them.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Load one record, decoded with `schema`.
    async fn retrieve(
        &self,
        container: &str,
        id: &EntityId,
        schema: &SchemaMetadata,
        factory: &DomainFactory,
    ) -> StoreResult<Option<GenericEntity>>;

    /// Insert a new record ([`BackendError::Conflict`](crate::BackendError::Conflict) if present).
    async fn add(&self, container: &str, entity: &CommandEntity) -> StoreResult<()>;

    /// Overwrite a record as a whole ([`BackendError::NotFound`](crate::BackendError::NotFound) if absent).
    async fn replace(&self, container: &str, entity: &CommandEntity) -> StoreResult<()>;

    /// Physically remove a record; `false` when there was nothing to remove.
    async fn remove(&self, container: &str, id: &EntityId) -> StoreResult<bool>;

    async fn query(
        &self,
        container: &str,
        clause: &QueryClause,
        schema: &SchemaMetadata,
        factory: &DomainFactory,
    ) -> StoreResult<Vec<GenericEntity>>;

    /// Rows matching the clause's joins and filters, ignoring paging.
    async fn count(
        &self,
        container: &str,
        clause: &QueryClause,
        schema: &SchemaMetadata,
        factory: &DomainFactory,
    ) -> StoreResult<usize>;

    /// Drop every record of the container (maintenance).
    async fn destroy_all(&self, container: &str) -> StoreResult<()>;
}

#[async_trait]
impl<D> DataStore for Arc<D>
where
    D: DataStore + ?Sized,
{
    async fn retrieve(
        &self,
        container: &str,
        id: &EntityId,
        schema: &SchemaMetadata,
        factory: &DomainFactory,
    ) -> StoreResult<Option<GenericEntity>> {
        (**self).retrieve(container, id, schema, factory).await
    }

    async fn add(&self, container: &str, entity: &CommandEntity) -> StoreResult<()> {
        (**self).add(container, entity).await
    }

    async fn replace(&self, container: &str, entity: &CommandEntity) -> StoreResult<()> {
        (**self).replace(container, entity).await
    }

    async fn remove(&self, container: &str, id: &EntityId) -> StoreResult<bool> {
        (**self).remove(container, id).await
    }

    async fn query(
        &self,
        container: &str,
        clause: &QueryClause,
        schema: &SchemaMetadata,
        factory: &DomainFactory,
    ) -> StoreResult<Vec<GenericEntity>> {
        (**self).query(container, clause, schema, factory).await
    }

    async fn count(
        &self,
        container: &str,
        clause: &QueryClause,
        schema: &SchemaMetadata,
        factory: &DomainFactory,
    ) -> StoreResult<usize> {
        (**self).count(container, clause, schema, factory).await
    }

    async fn destroy_all(&self, container: &str) -> StoreResult<()> {
        (**self).destroy_all(container).await
    }
}
