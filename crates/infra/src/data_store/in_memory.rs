use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use strata_core::marshal::{from_json, to_json};
use strata_core::{CommandEntity, DomainFactory, EntityId, GenericEntity, SchemaMetadata};

use super::store::DataStore;
use crate::config::StoreOptions;
use crate::error::{BackendError, StoreError, StoreResult};
use crate::query::{JoinedRows, QueryClause, QueryEngine};

#[derive(Debug, Default)]
struct Container {
    /// Union of every schema written into the container.
    schema: SchemaMetadata,
    documents: BTreeMap<EntityId, JsonValue>,
}

/// In-memory document store for tests/dev.
///
/// Records are kept as JSON documents and decoded on every read with the
/// caller's schema and factory, the way a document backend would. Queries run
/// through the [`QueryEngine`].
#[derive(Debug, Default)]
pub struct InMemoryDataStore {
    containers: RwLock<HashMap<String, Container>>,
    engine: QueryEngine,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.engine = QueryEngine::new(options);
        self
    }

    /// Number of records in a container (soft-deleted included).
    pub fn len(&self, container: &str) -> usize {
        self.containers
            .read()
            .ok()
            .and_then(|c| c.get(container).map(|c| c.documents.len()))
            .unwrap_or_default()
    }

    /// Copy a container's schema and documents out of the lock.
    fn documents(&self, container: &str) -> StoreResult<(SchemaMetadata, Vec<JsonValue>)> {
        let containers = self.containers.read().map_err(|_| BackendError::poisoned())?;
        Ok(containers
            .get(container)
            .map(|c| (c.schema.clone(), c.documents.values().cloned().collect()))
            .unwrap_or_default())
    }

    fn decode_all(
        schema: &SchemaMetadata,
        documents: &[JsonValue],
        factory: &DomainFactory,
    ) -> StoreResult<Vec<GenericEntity>> {
        documents
            .iter()
            .map(|doc| from_json(doc, schema, factory).map_err(StoreError::from))
            .collect()
    }

    /// Primary rows decoded with `requested` over the stored schema, plus the
    /// rows of every joined container.
    fn materialize(
        &self,
        container: &str,
        clause: &QueryClause,
        requested: &SchemaMetadata,
        factory: &DomainFactory,
    ) -> StoreResult<(Vec<GenericEntity>, JoinedRows)> {
        let (mut schema, documents) = self.documents(container)?;
        schema.merge(requested);
        let primary = Self::decode_all(&schema, &documents, factory)?;

        let mut joined = JoinedRows::new();
        for join in &clause.joins {
            if joined.contains_key(&join.container) {
                continue;
            }
            let (schema, documents) = self.documents(&join.container)?;
            joined.insert(join.container.clone(), Self::decode_all(&schema, &documents, factory)?);
        }

        Ok((primary, joined))
    }

    fn write(&self, container: &str, entity: &CommandEntity, must_exist: bool) -> StoreResult<()> {
        let mut containers = self.containers.write().map_err(|_| BackendError::poisoned())?;
        let target = containers.entry(container.to_string()).or_default();
        let id = entity.id();

        match (target.documents.contains_key(id), must_exist) {
            (true, false) => {
                return Err(BackendError::Conflict(format!("{container}/{id}")).into());
            }
            (false, true) => {
                return Err(BackendError::NotFound(format!("{container}/{id}")).into());
            }
            _ => {}
        }

        target.schema.merge(entity.schema());
        target.documents.insert(id.clone(), to_json(entity));
        Ok(())
    }
}

#[async_trait]
impl DataStore for InMemoryDataStore {
    async fn retrieve(
        &self,
        container: &str,
        id: &EntityId,
        schema: &SchemaMetadata,
        factory: &DomainFactory,
    ) -> StoreResult<Option<GenericEntity>> {
        let found = {
            let containers = self.containers.read().map_err(|_| BackendError::poisoned())?;
            containers
                .get(container)
                .and_then(|c| c.documents.get(id).map(|doc| (c.schema.clone(), doc.clone())))
        };

        match found {
            None => Ok(None),
            Some((mut stored, doc)) => {
                stored.merge(schema);
                Ok(Some(from_json(&doc, &stored, factory)?))
            }
        }
    }

    async fn add(&self, container: &str, entity: &CommandEntity) -> StoreResult<()> {
        self.write(container, entity, false)
    }

    async fn replace(&self, container: &str, entity: &CommandEntity) -> StoreResult<()> {
        self.write(container, entity, true)
    }

    async fn remove(&self, container: &str, id: &EntityId) -> StoreResult<bool> {
        let mut containers = self.containers.write().map_err(|_| BackendError::poisoned())?;
        Ok(containers
            .get_mut(container)
            .and_then(|c| c.documents.remove(id))
            .is_some())
    }

    async fn query(
        &self,
        container: &str,
        clause: &QueryClause,
        schema: &SchemaMetadata,
        factory: &DomainFactory,
    ) -> StoreResult<Vec<GenericEntity>> {
        let (primary, joined) = self.materialize(container, clause, schema, factory)?;
        self.engine.execute(clause, schema, &primary, &joined)
    }

    async fn count(
        &self,
        container: &str,
        clause: &QueryClause,
        schema: &SchemaMetadata,
        factory: &DomainFactory,
    ) -> StoreResult<usize> {
        let (primary, joined) = self.materialize(container, clause, schema, factory)?;
        Ok(self.engine.count(clause, &primary, &joined))
    }

    async fn destroy_all(&self, container: &str) -> StoreResult<()> {
        let mut containers = self.containers.write().map_err(|_| BackendError::poisoned())?;
        containers.remove(container);
        Ok(())
    }
}
