//! The event-sourced aggregate contract.

use chrono::{DateTime, Utc};

use strata_core::{AggregateRoot, DomainResult, EntityId};

use crate::buffer::ChangeBuffer;
use crate::event::{ChangeEvent, DomainEvent};

/// An aggregate whose state is the fold of its change stream.
///
/// Behaviour methods call [`raise`](EventSourced::raise), which applies the
/// change immediately, so replay and live updates share the same
/// `apply_change` path. A change that `apply_change` rejects is never buffered.
pub trait EventSourced: AggregateRoot {
    /// Empty instance ready for replay.
    fn shell(id: EntityId, last_persisted_utc: Option<DateTime<Utc>>) -> Self;

    /// Fold one change into state. Must be deterministic.
    fn apply_change(&mut self, event: &ChangeEvent) -> DomainResult<()>;

    fn changes(&self) -> &ChangeBuffer;

    fn changes_mut(&mut self) -> &mut ChangeBuffer;

    /// Apply a new change and record it.
    fn raise<E: DomainEvent>(&mut self, event: &E) -> DomainResult<()> {
        let entity_type = Self::container_name();
        let change = self.changes().prepare(&entity_type, event)?;
        self.apply_change(&change)?;
        self.changes_mut().commit(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use strata_core::{DomainError, DomainFactory, GenericEntity, Persistable, SchemaMetadata};

    #[derive(Serialize, Deserialize)]
    struct Reserved {
        seats: i64,
    }

    impl DomainEvent for Reserved {
        fn event_type(&self) -> &'static str {
            "Reserved"
        }

        fn type_tag(&self) -> &'static str {
            "venue.reserved.v1"
        }
    }

    #[derive(Debug, Default)]
    struct Venue {
        id: Option<EntityId>,
        free: i64,
        changes: ChangeBuffer,
    }

    impl Persistable for Venue {
        const TYPE_NAME: &'static str = "VenueAggregate";

        fn schema() -> SchemaMetadata {
            SchemaMetadata::system()
        }

        fn dehydrate(&self) -> GenericEntity {
            let mut entity = GenericEntity::new();
            entity.set_id(self.id.clone());
            entity
        }

        fn rehydrate(entity: &GenericEntity, _factory: &DomainFactory) -> DomainResult<Self> {
            Ok(Self { id: entity.id(), ..Self::default() })
        }
    }

    impl AggregateRoot for Venue {
        fn id(&self) -> Option<&EntityId> {
            self.id.as_ref()
        }
    }

    impl EventSourced for Venue {
        fn shell(id: EntityId, _last_persisted_utc: Option<DateTime<Utc>>) -> Self {
            Self { id: Some(id), ..Self::default() }
        }

        fn apply_change(&mut self, event: &ChangeEvent) -> DomainResult<()> {
            let seats = event.decode::<Reserved>()?.seats;
            if seats > self.free {
                return Err(DomainError::rule_violation(format!("only {} seats left", self.free)));
            }
            self.free -= seats;
            Ok(())
        }

        fn changes(&self) -> &ChangeBuffer {
            &self.changes
        }

        fn changes_mut(&mut self) -> &mut ChangeBuffer {
            &mut self.changes
        }
    }

    #[test]
    fn accepted_changes_are_applied_and_buffered() {
        let mut venue = Venue { free: 10, ..Venue::shell(EntityId::from("v-1"), None) };
        venue.raise(&Reserved { seats: 4 }).unwrap();
        venue.raise(&Reserved { seats: 6 }).unwrap();

        assert_eq!(venue.free, 0);
        let versions: Vec<i64> = venue.changes().uncommitted().iter().map(|c| c.version).collect();
        assert_eq!(versions, vec![1, 2]);
        assert!(venue.changes().uncommitted().iter().all(|c| c.entity_type == "Venue"));
    }

    #[test]
    fn rejected_change_is_not_buffered() {
        let mut venue = Venue { free: 3, ..Venue::shell(EntityId::from("v-1"), None) };
        let err = venue.raise(&Reserved { seats: 5 }).unwrap_err();
        assert!(matches!(err, DomainError::RuleViolation(_)));
        assert!(!venue.changes().has_uncommitted());
        assert_eq!(venue.changes().stream().last_version(), 0);

        venue.raise(&Reserved { seats: 2 }).unwrap();
        assert_eq!(venue.changes().uncommitted()[0].version, 1);
        assert_eq!(venue.free, 1);
    }
}
