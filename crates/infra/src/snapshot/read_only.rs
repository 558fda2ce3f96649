//! Query-only typed access to a snapshot container.

use std::marker::PhantomData;

use strata_core::{DomainFactory, EntityId, Persistable};

use super::{SnapshotCore, rehydrate_all};
use crate::config::StoreOptions;
use crate::data_store::DataStore;
use crate::error::StoreResult;
use crate::query::QueryClause;

/// Query-only view over a snapshot container. Soft-deleted records are never
/// returned.
#[derive(Debug)]
pub struct ReadOnlySnapshotStore<T, D> {
    core: SnapshotCore<D>,
    _dto: PhantomData<fn() -> T>,
}

impl<T, D> ReadOnlySnapshotStore<T, D>
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

    pub async fn get(&self, id: &EntityId, error_if_not_found: bool) -> StoreResult<Option<T>> {
        match self.core.get(id, error_if_not_found, false).await? {
            Some(entity) => Ok(Some(entity.reconstruct(self.core.factory())?)),
            None => Ok(None),
        }
    }

    pub async fn query(&self, clause: &QueryClause) -> StoreResult<Vec<T>> {
        let rows = self.core.query(clause, false).await?;
        rehydrate_all(rows, self.core.factory())
    }

    pub async fn count(&self, clause: &QueryClause) -> StoreResult<usize> {
        self.core.count(clause, false).await
    }
}
