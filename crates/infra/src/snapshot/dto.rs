//! Typed snapshot store for DTOs and read models.

use std::marker::PhantomData;

use strata_core::{CommandEntity, DomainFactory, EntityId, Persistable};

use super::{SnapshotCore, rehydrate_all};
use crate::config::StoreOptions;
use crate::data_store::DataStore;
use crate::error::StoreResult;
use crate::query::QueryClause;

/// Snapshot store for plain DTOs and read models.
///
/// A DTO written without an identity is assigned a fresh one, which is
/// returned alongside the persisted value.
#[derive(Debug)]
pub struct DtoSnapshotStore<T, D> {
    core: SnapshotCore<D>,
    _dto: PhantomData<fn() -> T>,
}

impl<T, D> DtoSnapshotStore<T, D>
where
    T: Persistable,
    D: DataStore,
{
    pub fn new(backend: D, factory: DomainFactory) -> Self {
        Self::with_options(backend, factory, &StoreOptions::default())
    }

    pub fn with_options(backend: D, factory: DomainFactory, options: &StoreOptions) -> Self {
        let container = options.container_or(T::container_name());
        Self {
            core: SnapshotCore::new(backend, container, T::schema(), factory),
            _dto: PhantomData,
        }
    }

    pub fn container(&self) -> &str {
        self.core.container()
    }

    /// Untyped access, for projections that do not fit `T`.
    pub fn core(&self) -> &SnapshotCore<D> {
        &self.core
    }

    pub async fn get(&self, id: &EntityId, error_if_not_found: bool, include_deleted: bool) -> StoreResult<Option<T>> {
        match self.core.get(id, error_if_not_found, include_deleted).await? {
            Some(entity) => Ok(Some(entity.reconstruct(self.core.factory())?)),
            None => Ok(None),
        }
    }

    pub async fn upsert(&self, value: &T, include_deleted: bool) -> StoreResult<(EntityId, T)> {
        let command = CommandEntity::from_typed(value);
        let id = command.id().clone();
        let factory = self.core.factory();
        let stored = self
            .core
            .upsert_checked(command, include_deleted, |record| record.reconstruct::<T>(factory))
            .await?;
        Ok((id, stored))
    }

    pub async fn delete(&self, id: &EntityId, destroy: bool) -> StoreResult<()> {
        self.core.delete(id, destroy).await
    }

    pub async fn resurrect(&self, id: &EntityId) -> StoreResult<T> {
        let entity = self.core.resurrect(id).await?;
        Ok(entity.reconstruct(self.core.factory())?)
    }

    pub async fn query(&self, clause: &QueryClause, include_deleted: bool) -> StoreResult<Vec<T>> {
        let rows = self.core.query(clause, include_deleted).await?;
        rehydrate_all(rows, self.core.factory())
    }

    pub async fn count(&self, clause: &QueryClause, include_deleted: bool) -> StoreResult<usize> {
        self.core.count(clause, include_deleted).await
    }

    pub async fn destroy_all(&self) -> StoreResult<()> {
        self.core.destroy_all().await
    }
}
