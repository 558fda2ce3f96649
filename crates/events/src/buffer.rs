//! Per-aggregate buffer of raised, not yet appended, changes.

use strata_core::{DomainError, DomainResult, EventStream};

use crate::event::{ChangeEvent, DomainEvent};

/// Uncommitted changes of one aggregate plus its stream position.
///
/// Aggregates embed a buffer and expose it through
/// [`EventSourced`](crate::EventSourced). The store replays history into it on
/// load and drains it after a successful append.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeBuffer {
    stream: EventStream,
    uncommitted: Vec<ChangeEvent>,
}

impl ChangeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream(&self) -> EventStream {
        self.stream
    }

    /// Track a persisted version during replay (strict ordering).
    pub fn record_replayed(&mut self, version: i64) -> DomainResult<()> {
        self.stream = self.stream.update_change(version)?;
        Ok(())
    }

    /// Buffer a newly raised event at the next stream version.
    pub fn raise<E: DomainEvent>(
        &mut self,
        entity_type: &str,
        event: &E,
    ) -> DomainResult<&ChangeEvent> {
        let change = self.prepare(entity_type, event)?;
        self.commit(change)?;
        Ok(&self.uncommitted[self.uncommitted.len() - 1])
    }

    /// Build the change for the next stream version without buffering it.
    pub fn prepare<E: DomainEvent>(&self, entity_type: &str, event: &E) -> DomainResult<ChangeEvent> {
        ChangeEvent::from_typed(entity_type, self.stream.next().last_version(), event)
    }

    /// Buffer a change built by [`prepare`](Self::prepare).
    pub fn commit(&mut self, change: ChangeEvent) -> DomainResult<()> {
        let next = self.stream.next();
        if change.version != next.last_version() {
            return Err(DomainError::rule_violation(format!(
                "change at version {} cannot follow version {}",
                change.version,
                self.stream.last_version()
            )));
        }
        self.stream = next;
        self.uncommitted.push(change);
        Ok(())
    }

    pub fn uncommitted(&self) -> &[ChangeEvent] {
        &self.uncommitted
    }

    pub fn has_uncommitted(&self) -> bool {
        !self.uncommitted.is_empty()
    }

    /// Drop buffered changes (after they were appended).
    pub fn clear(&mut self) {
        self.uncommitted.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Ping;

    impl DomainEvent for Ping {
        fn event_type(&self) -> &'static str {
            "Ping"
        }

        fn type_tag(&self) -> &'static str {
            "ping.v1"
        }
    }

    #[test]
    fn raised_events_take_consecutive_versions() {
        let mut buffer = ChangeBuffer::new();
        buffer.record_replayed(1).unwrap();
        buffer.record_replayed(2).unwrap();

        assert_eq!(buffer.raise("Meter", &Ping).unwrap().version, 3);
        assert_eq!(buffer.raise("Meter", &Ping).unwrap().version, 4);
        assert_eq!(buffer.uncommitted().len(), 2);
        assert_eq!(buffer.stream().first_version(), 1);

        buffer.clear();
        assert!(!buffer.has_uncommitted());
        assert_eq!(buffer.stream().last_version(), 4);
    }

    #[test]
    fn fresh_aggregate_starts_at_version_one() {
        let mut buffer = ChangeBuffer::new();
        assert_eq!(buffer.raise("Meter", &Ping).unwrap().version, 1);
    }

    #[test]
    fn prepared_changes_are_not_buffered_until_committed() {
        let mut buffer = ChangeBuffer::new();
        let change = buffer.prepare("Meter", &Ping).unwrap();
        assert_eq!(change.version, 1);
        assert!(!buffer.has_uncommitted());
        assert_eq!(buffer.prepare("Meter", &Ping).unwrap().version, 1);

        buffer.commit(change.clone()).unwrap();
        assert_eq!(buffer.uncommitted().len(), 1);
        let err = buffer.commit(change).unwrap_err();
        assert!(matches!(err, DomainError::RuleViolation(_)));
        assert_eq!(buffer.uncommitted().len(), 1);
    }

    #[test]
    fn replay_out_of_order_is_rejected() {
        let mut buffer = ChangeBuffer::new();
        buffer.record_replayed(1).unwrap();
        let err = buffer.record_replayed(3).unwrap_err();
        assert!(matches!(err, DomainError::RuleViolation(_)));
    }
}
