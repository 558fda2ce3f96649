//! Typed snapshot store for aggregate roots.

use std::marker::PhantomData;

use strata_core::{AggregateRoot, CommandEntity, DomainFactory, EntityId};

use super::{SnapshotCore, rehydrate_all};
use crate::config::StoreOptions;
use crate::data_store::DataStore;
use crate::error::{StoreError, StoreResult};
use crate::query::QueryClause;

/// Snapshot store for aggregate roots.
///
/// Aggregates must carry their identity; writing one without it is rejected.
#[derive(Debug)]
pub struct EntitySnapshotStore<A, D> {
    core: SnapshotCore<D>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A, D> EntitySnapshotStore<A, D>
where
    A: AggregateRoot,
    D: DataStore,
{
    pub fn new(backend: D, factory: DomainFactory) -> Self {
        Self::with_options(backend, factory, &StoreOptions::default())
    }

    pub fn with_options(backend: D, factory: DomainFactory, options: &StoreOptions) -> Self {
        let container = options.container_or(A::container_name());
        Self {
            core: SnapshotCore::new(backend, container, A::schema(), factory),
            _aggregate: PhantomData,
        }
    }

    pub fn container(&self) -> &str {
        self.core.container()
    }

    pub fn core(&self) -> &SnapshotCore<D> {
        &self.core
    }

    pub async fn get(&self, id: &EntityId, error_if_not_found: bool, include_deleted: bool) -> StoreResult<Option<A>> {
        match self.core.get(id, error_if_not_found, include_deleted).await? {
            Some(entity) => Ok(Some(entity.reconstruct(self.core.factory())?)),
            None => Ok(None),
        }
    }

    /// Insert or merge; returns the aggregate as persisted.
    pub async fn upsert(&self, aggregate: &A, include_deleted: bool) -> StoreResult<A> {
        let command = CommandEntity::from_aggregate(aggregate)?;
        let factory = self.core.factory();
        self.core
            .upsert_checked(command, include_deleted, |record| record.reconstruct::<A>(factory))
            .await
    }

    pub async fn delete(&self, id: &EntityId, destroy: bool) -> StoreResult<()> {
        self.core.delete(id, destroy).await
    }

    pub async fn resurrect(&self, id: &EntityId) -> StoreResult<A> {
        let entity = self.core.resurrect(id).await?;
        entity.reconstruct(self.core.factory()).map_err(StoreError::from)
    }

    pub async fn query(&self, clause: &QueryClause, include_deleted: bool) -> StoreResult<Vec<A>> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_store::InMemoryDataStore;
    use crate::query::{Direction, Filter, Operator};
    use std::sync::Arc;
    use strata_core::{
        DomainError, DomainResult, GenericEntity, Persistable, SchemaMetadata, StorageKind, ValueObject,
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Sku(String);

    impl ValueObject for Sku {
        const TYPE_ID: &'static str = "Sku";

        fn to_stored(&self) -> String {
            self.0.clone()
        }

        fn from_stored(raw: &str) -> DomainResult<Self> {
            if raw.starts_with("SKU-") {
                Ok(Self(raw.to_string()))
            } else {
                Err(DomainError::validation(format!("'{raw}' is not a SKU")))
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct ProductEntity {
        id: Option<EntityId>,
        sku: Sku,
        name: Option<String>,
        stock: i64,
    }

    impl ProductEntity {
        fn new(id: &str, sku: &str, name: Option<&str>, stock: i64) -> Self {
            Self {
                id: Some(EntityId::from(id)),
                sku: Sku(sku.to_string()),
                name: name.map(String::from),
                stock,
            }
        }
    }

    impl Persistable for ProductEntity {
        const TYPE_NAME: &'static str = "ProductEntity";

        fn schema() -> SchemaMetadata {
            SchemaMetadata::system()
                .with("Sku", StorageKind::Complex("Sku".into()))
                .with("Name", StorageKind::String)
                .with("Stock", StorageKind::Integer)
        }

        fn dehydrate(&self) -> GenericEntity {
            let mut entity = GenericEntity::new();
            entity.set_id(self.id.clone());
            entity
                .with("Sku", &self.sku)
                .with("Name", &self.name)
                .with("Stock", &self.stock)
        }

        fn rehydrate(entity: &GenericEntity, factory: &DomainFactory) -> DomainResult<Self> {
            Ok(Self {
                id: entity.id(),
                sku: entity.get("Sku", factory)?,
                name: entity.nullable("Name", factory)?,
                stock: entity.get("Stock", factory)?,
            })
        }
    }

    impl AggregateRoot for ProductEntity {
        fn id(&self) -> Option<&EntityId> {
            self.id.as_ref()
        }
    }

    fn store() -> EntitySnapshotStore<ProductEntity, Arc<InMemoryDataStore>> {
        EntitySnapshotStore::new(
            Arc::new(InMemoryDataStore::new()),
            DomainFactory::new().register::<Sku>(),
        )
    }

    #[test]
    fn container_follows_type_name_or_override() {
        assert_eq!(store().container(), "Product");
        let overridden = EntitySnapshotStore::<ProductEntity, _>::with_options(
            InMemoryDataStore::new(),
            DomainFactory::new(),
            &StoreOptions::new().with_container("catalog"),
        );
        assert_eq!(overridden.container(), "catalog");
    }

    #[tokio::test]
    async fn upsert_without_identity_is_rejected() {
        let mut product = ProductEntity::new("p-1", "SKU-1", None, 0);
        product.id = None;
        let err = store().upsert(&product, false).await.unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn round_trips_value_objects_and_keeps_unset_fields() {
        let store = store();
        let id = EntityId::from("p-1");
        store
            .upsert(&ProductEntity::new("p-1", "SKU-1", Some("Anvil"), 3), false)
            .await
            .unwrap();

        let updated = store
            .upsert(&ProductEntity::new("p-1", "SKU-1", None, 5), false)
            .await
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Anvil"));
        assert_eq!(updated.stock, 5);

        let loaded = store.get(&id, true, false).await.unwrap().unwrap();
        assert_eq!(loaded, updated);
    }

    #[tokio::test]
    async fn invalid_value_object_is_rejected_before_it_is_written() {
        let store = store();
        let err = store
            .upsert(&ProductEntity::new("p-1", "bogus", None, 0), false)
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Validation(_))));

        assert_eq!(store.core().backend().len("Product"), 0);
        assert!(store.get(&EntityId::from("p-1"), false, false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_merge_leaves_the_stored_record_untouched() {
        let store = store();
        let id = EntityId::from("p-1");
        store
            .upsert(&ProductEntity::new("p-1", "SKU-1", Some("Anvil"), 3), false)
            .await
            .unwrap();

        let err = store
            .upsert(&ProductEntity::new("p-1", "bogus", None, 7), false)
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Validation(_))));

        let loaded = store.get(&id, true, false).await.unwrap().unwrap();
        assert_eq!(loaded.sku, Sku("SKU-1".into()));
        assert_eq!(loaded.stock, 3);
    }

    #[tokio::test]
    async fn delete_then_resurrect() {
        let store = store();
        let id = EntityId::from("p-1");
        store
            .upsert(&ProductEntity::new("p-1", "SKU-1", Some("Anvil"), 3), false)
            .await
            .unwrap();

        store.delete(&id, false).await.unwrap();
        assert!(store.get(&id, false, false).await.unwrap().is_none());

        let back = store.resurrect(&id).await.unwrap();
        assert_eq!(back.name.as_deref(), Some("Anvil"));
        assert!(store.get(&id, false, false).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn query_rehydrates_filtered_rows() {
        let store = store();
        for (id, stock) in [("p-1", 3), ("p-2", 0), ("p-3", 9)] {
            store
                .upsert(&ProductEntity::new(id, &format!("SKU-{id}"), None, stock), false)
                .await
                .unwrap();
        }

        let clause = QueryClause::new()
            .filter(Filter::new("Stock", Operator::Gt, 0_i64))
            .order_by("Stock", Direction::Descending);
        let rows = store.query(&clause, false).await.unwrap();

        let stocks: Vec<i64> = rows.iter().map(|p| p.stock).collect();
        assert_eq!(stocks, vec![9, 3]);
        assert_eq!(store.count(&clause, false).await.unwrap(), 2);
    }
}
