//! Event-sourced aggregate store.
//!
//! Persists aggregates as append-only change streams and rebuilds them by
//! replay.
//!
//! ## Load
//!
//! ```text
//! load(id)
//!   ↓
//! 1. Load the stream for (entity, id)
//!   ↓
//! 2. Empty stream, or last event is a tombstone → EntityNotFound
//!   ↓
//! 3. Build an empty shell (identity + last persisted timestamp)
//!   ↓
//! 4. Replay: track version ordering, migrate, apply
//! ```
//!
//! ## Save
//!
//! ```text
//! save(&mut aggregate)
//!   ↓
//! 1. Identity missing → EntityExists
//!   ↓
//! 2. Nothing buffered → done (no I/O)
//!   ↓
//! 3. Stamp persistedAtUtc and the container name, append atomically (expected-version checked by the boundary)
//!   ↓
//! 4. Clear the change buffer
//!   ↓
//! 5. Notify subscribers (isolated, best-effort)
//! ```
//!
//! There is no locking and no retry here: a concurrency conflict from the
//! boundary is returned unchanged and the buffer is left intact.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;

use strata_core::{DomainError, EntityId};
use strata_events::{
    ChangeEvent, ChangeSubscriber, EventMigrator, EventSourced, NoMigration, PublishedChange,
    SubscriberList,
};

use crate::config::StoreOptions;
use crate::error::{StoreError, StoreResult};
use crate::event_store::EventStore;

/// Loads and saves event-sourced aggregates of type `A` through an [`EventStore`].
///
/// - `S`: event store boundary
/// - `M`: migrator applied to every stored event before replay
pub struct EventSourcedStore<A, S, M = NoMigration> {
    store: S,
    migrator: M,
    subscribers: SubscriberList,
    entity: String,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A, S, M> core::fmt::Debug for EventSourcedStore<A, S, M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventSourcedStore")
            .field("entity", &self.entity)
            .field("subscribers", &self.subscribers)
            .finish_non_exhaustive()
    }
}

impl<A, S> EventSourcedStore<A, S, NoMigration>
where
    A: EventSourced,
    S: EventStore,
{
    pub fn new(store: S) -> Self {
        Self::with_options(store, &StoreOptions::default())
    }

    pub fn with_options(store: S, options: &StoreOptions) -> Self {
        Self {
            store,
            migrator: NoMigration,
            subscribers: SubscriberList::new(),
            entity: options.container_or(A::container_name()),
            _aggregate: PhantomData,
        }
    }
}

impl<A, S, M> EventSourcedStore<A, S, M>
where
    A: EventSourced,
    S: EventStore,
    M: EventMigrator,
{
    pub fn with_migrator<N: EventMigrator>(self, migrator: N) -> EventSourcedStore<A, S, N> {
        EventSourcedStore {
            store: self.store,
            migrator,
            subscribers: self.subscribers,
            entity: self.entity,
            _aggregate: PhantomData,
        }
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn ChangeSubscriber>) {
        self.subscribers.subscribe(subscriber);
    }

    pub fn with_subscriber(mut self, subscriber: Arc<dyn ChangeSubscriber>) -> Self {
        self.subscribe(subscriber);
        self
    }

    /// Entity name the streams are keyed by.
    pub fn entity_name(&self) -> &str {
        &self.entity
    }

    pub fn event_store(&self) -> &S {
        &self.store
    }

    fn not_found(&self, id: &EntityId) -> StoreError {
        DomainError::not_found(self.entity.as_str(), id).into()
    }

    /// Rebuild an aggregate from its stream.
    pub async fn load(&self, id: &EntityId) -> StoreResult<A> {
        let events = self.store.load_events(&self.entity, id).await?;

        let Some(last) = events.last() else {
            tracing::debug!(entity = %self.entity, id = %id, "no stream");
            return Err(self.not_found(id));
        };
        if last.is_tombstone() {
            tracing::debug!(entity = %self.entity, id = %id, "stream is tombstoned");
            return Err(self.not_found(id));
        }

        let count = events.len();
        let mut aggregate = A::shell(id.clone(), Some(last.persisted_at_utc));
        for event in events {
            aggregate.changes_mut().record_replayed(event.version)?;
            if event.is_tombstone() {
                continue;
            }
            let event = self.migrator.migrate(event)?;
            aggregate.apply_change(&event)?;
        }

        tracing::debug!(entity = %self.entity, id = %id, events = count, "aggregate replayed");
        Ok(aggregate)
    }

    /// Append the aggregate's buffered changes.
    ///
    /// Returns the physical stream name, or `None` when there was nothing to save.
    pub async fn save(&self, aggregate: &mut A) -> StoreResult<Option<String>> {
        let id = match aggregate.id() {
            Some(id) if !id.is_blank() => id.clone(),
            _ => {
                return Err(DomainError::exists(format!(
                    "{} cannot be saved without an identity",
                    self.entity
                ))
                .into());
            }
        };

        if !aggregate.changes().has_uncommitted() {
            tracing::debug!(entity = %self.entity, id = %id, "nothing to save");
            return Ok(None);
        }

        let persisted_at = Utc::now();
        let events: Vec<ChangeEvent> = aggregate
            .changes()
            .uncommitted()
            .iter()
            .cloned()
            .map(|mut event| {
                event.entity_type.clone_from(&self.entity);
                event.persisted_at_utc = persisted_at;
                event
            })
            .collect();
        let count = events.len();

        let stream = self
            .store
            .append_events(&self.entity, &id, events.clone())
            .await?;
        aggregate.changes_mut().clear();

        tracing::info!(entity = %self.entity, id = %id, stream = %stream, events = count, "changes appended");
        self.publish(&stream, events);
        Ok(Some(stream))
    }

    /// Logically delete a stream by appending a tombstone.
    pub async fn delete(&self, id: &EntityId) -> StoreResult<()> {
        let events = self.store.load_events(&self.entity, id).await?;
        let last_version = match events.last() {
            Some(last) if !last.is_tombstone() => last.version,
            _ => return Err(self.not_found(id)),
        };

        let tombstone = ChangeEvent::tombstone(self.entity.as_str(), last_version + 1);
        let stream = self
            .store
            .append_events(&self.entity, id, vec![tombstone.clone()])
            .await?;

        tracing::info!(entity = %self.entity, id = %id, stream = %stream, "stream tombstoned");
        self.publish(&stream, vec![tombstone]);
        Ok(())
    }

    /// Drop every stream of this entity (maintenance).
    pub async fn destroy_all(&self) -> StoreResult<()> {
        self.store.destroy_all(&self.entity).await?;
        tracing::info!(entity = %self.entity, "all streams destroyed");
        Ok(())
    }

    fn publish(&self, stream: &str, events: Vec<ChangeEvent>) {
        if self.subscribers.is_empty() {
            return;
        }
        let published: Vec<PublishedChange> = events
            .into_iter()
            .map(|event| PublishedChange::new(stream, event))
            .collect();
        self.subscribers.notify(&published);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use strata_core::{AggregateRoot, DomainFactory, DomainResult, GenericEntity, Persistable};
    use strata_events::{ChangeBuffer, ChannelSubscriber, DomainEvent, Upcasters};

    use crate::error::BackendError;
    use crate::event_store::InMemoryEventStore;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Incremented {
        by: i64,
    }

    impl DomainEvent for Incremented {
        fn event_type(&self) -> &'static str {
            "Incremented"
        }

        fn type_tag(&self) -> &'static str {
            "counter.incremented.v2"
        }
    }

    #[derive(Debug, Serialize)]
    struct Renamed {
        name: String,
    }

    impl DomainEvent for Renamed {
        fn event_type(&self) -> &'static str {
            "Renamed"
        }

        fn type_tag(&self) -> &'static str {
            "counter.renamed.v1"
        }
    }

    #[derive(Debug, Clone)]
    struct Counter {
        id: EntityId,
        total: i64,
        last_persisted: Option<DateTime<Utc>>,
        changes: ChangeBuffer,
    }

    impl Counter {
        fn create(id: &str) -> Self {
            Self::shell(EntityId::from(id), None)
        }

        fn increment(&mut self, by: i64) -> DomainResult<()> {
            self.raise(&Incremented { by })
        }
    }

    impl Persistable for Counter {
        const TYPE_NAME: &'static str = "CounterAggregate";

        fn dehydrate(&self) -> GenericEntity {
            GenericEntity::with_id(self.id.clone()).with("Total", &self.total)
        }

        fn rehydrate(entity: &GenericEntity, factory: &DomainFactory) -> DomainResult<Self> {
            let id = entity.id().ok_or_else(|| DomainError::validation("counter without id"))?;
            let mut counter = Self::shell(id, entity.last_persisted());
            counter.total = entity.get("Total", factory)?;
            Ok(counter)
        }
    }

    impl AggregateRoot for Counter {
        fn id(&self) -> Option<&EntityId> {
            Some(&self.id)
        }
    }

    impl EventSourced for Counter {
        fn shell(id: EntityId, last_persisted_utc: Option<DateTime<Utc>>) -> Self {
            Self {
                id,
                total: 0,
                last_persisted: last_persisted_utc,
                changes: ChangeBuffer::new(),
            }
        }

        fn apply_change(&mut self, event: &ChangeEvent) -> DomainResult<()> {
            match event.event_type.as_str() {
                "Incremented" => {
                    self.total += event.decode::<Incremented>()?.by;
                    Ok(())
                }
                other => Err(DomainError::validation(format!("unknown event {other}"))),
            }
        }

        fn changes(&self) -> &ChangeBuffer {
            &self.changes
        }

        fn changes_mut(&mut self) -> &mut ChangeBuffer {
            &mut self.changes
        }
    }

    fn store() -> EventSourcedStore<Counter, Arc<InMemoryEventStore>> {
        EventSourcedStore::new(Arc::new(InMemoryEventStore::new()))
    }

    #[tokio::test]
    async fn save_then_load_replays_history() {
        let feed = Arc::new(ChannelSubscriber::new("feed"));
        let subscription = feed.subscribe();
        let store = store().with_subscriber(feed);

        let mut counter = Counter::create("c-1");
        counter.increment(2).unwrap();
        counter.increment(5).unwrap();
        let stream = store.save(&mut counter).await.unwrap();

        assert_eq!(stream.as_deref(), Some("Counter-c-1"));
        assert!(!counter.changes().has_uncommitted());

        let loaded = store.load(&EntityId::from("c-1")).await.unwrap();
        assert_eq!(loaded.total, 7);
        assert_eq!(loaded.changes().stream().last_version(), 2);
        assert!(loaded.last_persisted.is_some());

        let published = subscription.drain();
        assert_eq!(published.len(), 2);
        assert!(published.iter().all(|c| c.stream_name() == "Counter-c-1"));
    }

    #[tokio::test]
    async fn loaded_aggregates_continue_the_stream() {
        let store = store();
        let mut counter = Counter::create("c-1");
        counter.increment(1).unwrap();
        store.save(&mut counter).await.unwrap();

        let mut loaded = store.load(&EntityId::from("c-1")).await.unwrap();
        loaded.increment(1).unwrap();
        store.save(&mut loaded).await.unwrap();

        let events = store
            .event_store()
            .load_events("Counter", &EntityId::from("c-1"))
            .await
            .unwrap();
        assert_eq!(events.iter().map(|e| e.version).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn stale_aggregate_surfaces_the_concurrency_error() {
        let store = store();
        let mut counter = Counter::create("c-1");
        counter.increment(1).unwrap();
        store.save(&mut counter).await.unwrap();

        let mut first = store.load(&EntityId::from("c-1")).await.unwrap();
        let mut second = store.load(&EntityId::from("c-1")).await.unwrap();
        first.increment(1).unwrap();
        second.increment(1).unwrap();
        store.save(&mut first).await.unwrap();

        let err = store.save(&mut second).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(BackendError::Concurrency(_))));
        assert!(second.changes().has_uncommitted());
    }

    #[tokio::test]
    async fn saving_without_changes_does_no_io() {
        let store = store();
        let mut counter = Counter::create("c-1");
        assert_eq!(store.save(&mut counter).await.unwrap(), None);
        assert_eq!(store.event_store().stream_count(), 0);
    }

    #[tokio::test]
    async fn blank_identity_is_reported_as_entity_exists() {
        let store = store();
        let mut counter = Counter::create("");
        counter.increment(1).unwrap();
        let err = store.save(&mut counter).await.unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::EntityExists(_))));
    }

    #[tokio::test]
    async fn missing_and_tombstoned_streams_are_not_found() {
        let store = store();
        let id = EntityId::from("c-1");
        assert!(store.load(&id).await.unwrap_err().is_not_found());
        assert!(store.delete(&id).await.unwrap_err().is_not_found());

        let mut counter = Counter::create("c-1");
        counter.increment(3).unwrap();
        store.save(&mut counter).await.unwrap();
        store.delete(&id).await.unwrap();

        assert!(store.load(&id).await.unwrap_err().is_not_found());
        assert!(store.delete(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn old_events_are_upcast_before_apply() {
        let events = Arc::new(InMemoryEventStore::new());
        let id = EntityId::from("c-1");
        events
            .append_events(
                "Counter",
                &id,
                vec![ChangeEvent::new("Counter", "Incremented", "counter.incremented.v1", json!({ "amount": 4 }), 1)],
            )
            .await
            .unwrap();

        let store: EventSourcedStore<Counter, _, _> = EventSourcedStore::new(events).with_migrator(
            Upcasters::new().register("counter.incremented.v1", |mut e: ChangeEvent| {
                e.payload = json!({ "by": e.payload["amount"].clone() });
                e.type_tag = "counter.incremented.v2".into();
                Ok(e)
            }),
        );

        assert_eq!(store.load(&id).await.unwrap().total, 4);
    }

    /// Serves a fixed history regardless of what was appended.
    struct FixedHistory(Vec<i64>);

    #[async_trait]
    impl EventStore for FixedHistory {
        async fn load_events(&self, entity: &str, _id: &EntityId) -> Result<Vec<ChangeEvent>, BackendError> {
            Ok(self
                .0
                .iter()
                .map(|v| ChangeEvent::new(entity, "Incremented", "counter.incremented.v2", json!({ "by": 1 }), *v))
                .collect())
        }

        async fn append_events(
            &self,
            _entity: &str,
            _id: &EntityId,
            _events: Vec<ChangeEvent>,
        ) -> Result<String, BackendError> {
            Err(BackendError::Storage("read only".into()))
        }

        async fn destroy_all(&self, _entity: &str) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn out_of_order_history_is_a_rule_violation() {
        let store: EventSourcedStore<Counter, _> = EventSourcedStore::new(FixedHistory(vec![1, 3]));
        let err = store.load(&EntityId::from("c-1")).await.unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::RuleViolation(_))));
    }

    #[tokio::test]
    async fn container_override_renames_streams() {
        let store: EventSourcedStore<Counter, _> = EventSourcedStore::with_options(
            Arc::new(InMemoryEventStore::new()),
            &StoreOptions::new().with_container("tally"),
        );
        let mut counter = Counter::create("c-1");
        counter.increment(1).unwrap();
        assert_eq!(store.save(&mut counter).await.unwrap().as_deref(), Some("tally-c-1"));
    }

    #[tokio::test]
    async fn stored_events_carry_the_overridden_container_name() {
        let backend = Arc::new(InMemoryEventStore::new());
        let store: EventSourcedStore<Counter, _> = EventSourcedStore::with_options(
            backend.clone(),
            &StoreOptions::new().with_container("tally"),
        );
        let id = EntityId::from("c-1");
        let mut counter = Counter::create("c-1");
        counter.increment(1).unwrap();
        counter.increment(2).unwrap();
        store.save(&mut counter).await.unwrap();
        store.delete(&id).await.unwrap();

        let stored = backend.load_events("tally", &id).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|event| event.entity_type == "tally"));
    }

    #[tokio::test]
    async fn rejected_change_is_never_saved() {
        let backend = Arc::new(InMemoryEventStore::new());
        let store: EventSourcedStore<Counter, _> = EventSourcedStore::new(backend.clone());
        let mut counter = Counter::create("c-1");
        let err = counter.raise(&Renamed { name: "c".into() }).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(!counter.changes().has_uncommitted());

        assert_eq!(store.save(&mut counter).await.unwrap(), None);
        assert!(backend.load_events("Counter", &EntityId::from("c-1")).await.unwrap().is_empty());
    }
}
