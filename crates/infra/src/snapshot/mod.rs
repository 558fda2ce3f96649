//! Snapshotting stores: one current-state record per identity.
//!
//! [`SnapshotCore`] implements the record lifecycle over generic entities:
//!
//! - **upsert** inserts, or merges field by field onto the persisted record
//!   (properties the update leaves null keep their stored value)
//! - **delete** is logical by default (`IsDeleted = true`); `destroy` removes
//!   the record physically
//! - soft-deleted records are invisible unless a call opts in with
//!   `include_deleted`; an upsert that opts in revives the record
//! - `LastPersistedUtc` is stamped on every write
//!
//! The typed fronts ([`EntitySnapshotStore`], [`DtoSnapshotStore`],
//! [`ReadOnlySnapshotStore`]) convert to and from generic entities and
//! delegate here.

mod dto;
mod entity;
mod read_only;

pub use dto::DtoSnapshotStore;
pub use entity::EntitySnapshotStore;
pub use read_only::ReadOnlySnapshotStore;

use std::borrow::Cow;

use chrono::Utc;

use strata_core::{
    CommandEntity, DomainError, DomainFactory, DomainResult, EntityId, GenericEntity,
    IS_DELETED_PROPERTY, Persistable, PropertyValue, SchemaMetadata,
};

use crate::data_store::DataStore;
use crate::error::{StoreError, StoreResult};
use crate::query::{Filter, QueryClause};

/// Record lifecycle over a [`DataStore`] container.
#[derive(Debug)]
pub struct SnapshotCore<D> {
    backend: D,
    container: String,
    schema: SchemaMetadata,
    factory: DomainFactory,
}

impl<D: DataStore> SnapshotCore<D> {
    pub fn new(
        backend: D,
        container: impl Into<String>,
        schema: SchemaMetadata,
        factory: DomainFactory,
    ) -> Self {
        Self {
            backend,
            container: container.into(),
            schema,
            factory,
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn schema(&self) -> &SchemaMetadata {
        &self.schema
    }

    pub fn factory(&self) -> &DomainFactory {
        &self.factory
    }

    pub fn backend(&self) -> &D {
        &self.backend
    }

    fn not_found(&self, id: &EntityId) -> StoreError {
        DomainError::not_found(self.container.as_str(), id).into()
    }

    /// Absent and hidden (soft-deleted, not included) records are treated alike:
    /// `None`, or EntityNotFound when `error_if_not_found`.
    pub async fn get(
        &self,
        id: &EntityId,
        error_if_not_found: bool,
        include_deleted: bool,
    ) -> StoreResult<Option<GenericEntity>> {
        let found = self
            .backend
            .retrieve(&self.container, id, &self.schema, &self.factory)
            .await?
            .filter(|entity| include_deleted || !entity.is_deleted());

        match found {
            Some(entity) => Ok(Some(entity)),
            None if error_if_not_found => Err(self.not_found(id)),
            None => Ok(None),
        }
    }

    /// Insert, or merge onto the persisted record and replace it as a whole.
    ///
    /// Every value object in the resulting record must be valid for this
    /// store's factory; otherwise nothing is written.
    pub async fn upsert(&self, incoming: CommandEntity, include_deleted: bool) -> StoreResult<GenericEntity> {
        self.upsert_checked(incoming, include_deleted, |record| {
            check_value_objects(record, &self.factory)?;
            Ok(record.clone())
        })
        .await
    }

    /// [`upsert`](Self::upsert) with `check` run on the exact record about to
    /// be written. A failing check aborts before the backend is touched.
    pub async fn upsert_checked<R>(
        &self,
        incoming: CommandEntity,
        include_deleted: bool,
        check: impl FnOnce(&GenericEntity) -> DomainResult<R>,
    ) -> StoreResult<R> {
        let id = incoming.id().clone();
        let now = Utc::now();

        match self.backend.retrieve(&self.container, &id, &self.schema, &self.factory).await? {
            None => {
                let mut entity = incoming.into_entity();
                entity.set_deleted(false);
                entity.set_last_persisted(now);
                let checked = check(&entity)?;
                self.backend.add(&self.container, &CommandEntity::from_entity(entity)?).await?;
                tracing::info!(container = %self.container, id = %id, "record inserted");
                Ok(checked)
            }
            Some(persisted) if persisted.is_deleted() && !include_deleted => Err(self.not_found(&id)),
            Some(mut persisted) => {
                let revived = persisted.is_deleted();
                persisted.properties_mut().overlay(incoming.properties());
                persisted.schema_mut().merge(incoming.schema());
                persisted.set_deleted(false);
                persisted.set_last_persisted(now);
                let checked = check(&persisted)?;
                self.backend.replace(&self.container, &CommandEntity::from_entity(persisted)?).await?;
                tracing::info!(container = %self.container, id = %id, revived, "record merged");
                Ok(checked)
            }
        }
    }

    /// Soft delete (idempotent), or physically remove when `destroy`.
    pub async fn delete(&self, id: &EntityId, destroy: bool) -> StoreResult<()> {
        if destroy {
            let removed = self.backend.remove(&self.container, id).await?;
            tracing::info!(container = %self.container, id = %id, removed, "record destroyed");
            return Ok(());
        }

        let Some(mut persisted) = self.backend.retrieve(&self.container, id, &self.schema, &self.factory).await? else {
            return Err(self.not_found(id));
        };
        if persisted.is_deleted() {
            tracing::debug!(container = %self.container, id = %id, "already deleted");
            return Ok(());
        }

        persisted.set_deleted(true);
        persisted.set_last_persisted(Utc::now());
        self.backend
            .replace(&self.container, &CommandEntity::from_entity(persisted)?)
            .await?;
        tracing::info!(container = %self.container, id = %id, "record soft-deleted");
        Ok(())
    }

    /// Clear the soft-delete flag; a live record is returned untouched.
    pub async fn resurrect(&self, id: &EntityId) -> StoreResult<GenericEntity> {
        let Some(mut persisted) = self.backend.retrieve(&self.container, id, &self.schema, &self.factory).await? else {
            return Err(self.not_found(id));
        };
        if !persisted.is_deleted() {
            return Ok(persisted);
        }

        persisted.set_deleted(false);
        persisted.set_last_persisted(Utc::now());
        let record = CommandEntity::from_entity(persisted)?;
        self.backend.replace(&self.container, &record).await?;
        tracing::info!(container = %self.container, id = %id, "record resurrected");
        Ok(record.into_entity())
    }

    /// An empty clause returns nothing without touching the backend.
    pub async fn query(&self, clause: &QueryClause, include_deleted: bool) -> StoreResult<Vec<GenericEntity>> {
        if clause.is_empty() {
            tracing::debug!(container = %self.container, "empty query clause");
            return Ok(Vec::new());
        }

        let clause = visible(clause, include_deleted);
        let mut rows = self.backend.query(&self.container, &clause, &self.schema, &self.factory).await?;
        if !include_deleted {
            rows.retain(|row| !row.is_deleted());
        }

        tracing::debug!(container = %self.container, rows = rows.len(), "query served");
        Ok(rows)
    }

    pub async fn count(&self, clause: &QueryClause, include_deleted: bool) -> StoreResult<usize> {
        let clause = visible(clause, include_deleted);
        self.backend.count(&self.container, &clause, &self.schema, &self.factory).await
    }

    /// Drop the whole container (maintenance).
    pub async fn destroy_all(&self) -> StoreResult<()> {
        self.backend.destroy_all(&self.container).await?;
        tracing::info!(container = %self.container, "container destroyed");
        Ok(())
    }
}

/// The clause, restricted to live records unless deleted ones are wanted.
fn visible(clause: &QueryClause, include_deleted: bool) -> Cow<'_, QueryClause> {
    if include_deleted {
        Cow::Borrowed(clause)
    } else {
        Cow::Owned(clause.clone().filter(Filter::ne(IS_DELETED_PROPERTY, true)))
    }
}

/// Validate the stored text of every value object against the registry.
fn check_value_objects(entity: &GenericEntity, factory: &DomainFactory) -> DomainResult<()> {
    for (_, value) in entity.properties().iter() {
        if let Some(PropertyValue::Complex { type_id, stored }) = value {
            factory.check(type_id.as_str(), stored)?;
        }
    }
    Ok(())
}

fn rehydrate_all<T: Persistable>(rows: Vec<GenericEntity>, factory: &DomainFactory) -> StoreResult<Vec<T>> {
    rows.iter()
        .map(|row| row.reconstruct::<T>(factory).map_err(StoreError::from))
        .collect()
}
