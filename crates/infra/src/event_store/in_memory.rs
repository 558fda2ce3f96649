use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use strata_core::EntityId;
use strata_events::ChangeEvent;

use super::r#trait::{EventStore, stream_name};
use crate::error::BackendError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    entity: String,
    id: EntityId,
}

impl StreamKey {
    fn new(entity: &str, id: &EntityId) -> Self {
        Self {
            entity: entity.to_string(),
            id: id.clone(),
        }
    }
}

/// In-memory append-only event store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<ChangeEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of streams currently held (all entities).
    pub fn stream_count(&self) -> usize {
        self.streams.read().map(|s| s.len()).unwrap_or_default()
    }

    fn current_version(stream: &[ChangeEvent]) -> i64 {
        stream.last().map(|e| e.version).unwrap_or(0)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn load_events(&self, entity: &str, id: &EntityId) -> Result<Vec<ChangeEvent>, BackendError> {
        let streams = self.streams.read().map_err(|_| BackendError::poisoned())?;
        Ok(streams
            .get(&StreamKey::new(entity, id))
            .cloned()
            .unwrap_or_default())
    }

    async fn append_events(
        &self,
        entity: &str,
        id: &EntityId,
        events: Vec<ChangeEvent>,
    ) -> Result<String, BackendError> {
        let name = stream_name(entity, id);
        if events.is_empty() {
            return Ok(name);
        }

        let key = StreamKey::new(entity, id);
        let mut streams = self.streams.write().map_err(|_| BackendError::poisoned())?;
        let current = streams
            .get(&key)
            .map(|s| Self::current_version(s))
            .unwrap_or(0);

        let mut expected = current + 1;
        for (idx, e) in events.iter().enumerate() {
            if e.version != expected {
                let found = e.version;
                let message = if idx == 0 {
                    format!("{name}: expected version {expected}, found {found}")
                } else {
                    format!("{name}: batch not consecutive at index {idx} (expected {expected}, found {found})")
                };
                tracing::debug!(stream = %name, current, "append rejected");
                return Err(BackendError::Concurrency(message));
            }
            expected += 1;
        }

        streams.entry(key).or_default().extend(events);
        Ok(name)
    }

    async fn destroy_all(&self, entity: &str) -> Result<(), BackendError> {
        let mut streams = self.streams.write().map_err(|_| BackendError::poisoned())?;
        streams.retain(|key, _| key.entity != entity);
        Ok(())
    }
}
