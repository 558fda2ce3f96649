//! Event stream version tracking for a single aggregate.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Version of an empty stream. Persisted change events start at `NO_VERSION + 1`.
pub const NO_VERSION: i64 = 0;

/// Version bounds of one aggregate's change history.
///
/// The tracker is rebuilt on every load/save cycle and is never persisted itself;
/// it only guards the ordering of the append-only log it describes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStream {
    first_version: i64,
    last_version: i64,
}

impl EventStream {
    /// An empty stream (both bounds at [`NO_VERSION`]).
    pub fn new() -> Self {
        Self {
            first_version: NO_VERSION,
            last_version: NO_VERSION,
        }
    }

    /// Build a stream from explicit bounds.
    ///
    /// Only negativity is rejected; `first > last` is accepted as given.
    pub fn create(first_version: i64, last_version: i64) -> DomainResult<Self> {
        if first_version < 0 {
            return Err(DomainError::validation(format!(
                "first version must be >= 0 (got {first_version})"
            )));
        }
        if last_version < 0 {
            return Err(DomainError::validation(format!(
                "last version must be >= 0 (got {last_version})"
            )));
        }
        Ok(Self {
            first_version,
            last_version,
        })
    }

    pub fn first_version(&self) -> i64 {
        self.first_version
    }

    pub fn last_version(&self) -> i64 {
        self.last_version
    }

    /// True while no persisted change has been accepted.
    pub fn is_empty(&self) -> bool {
        self.first_version == NO_VERSION
    }

    /// Advance for a newly raised (uncommitted) change.
    pub fn next(self) -> Self {
        Self {
            first_version: self.first_version,
            last_version: self.last_version + 1,
        }
    }

    /// Accept the version of the next persisted change during replay.
    pub fn update_change(self, incoming_version: i64) -> DomainResult<Self> {
        if self.is_empty() {
            if incoming_version <= NO_VERSION {
                return Err(DomainError::validation(format!(
                    "expected first version > {NO_VERSION}, got {incoming_version}"
                )));
            }
            return Ok(Self {
                first_version: incoming_version,
                last_version: incoming_version,
            });
        }

        let expected = self.last_version + 1;
        if incoming_version != expected {
            return Err(DomainError::rule_violation(format!(
                "expected version {expected}, got {incoming_version}"
            )));
        }

        Ok(Self {
            first_version: self.first_version,
            last_version: incoming_version,
        })
    }
}

impl Default for EventStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_then_next_twice() {
        let s = EventStream::new().next().next();
        assert_eq!(s.first_version(), NO_VERSION);
        assert_eq!(s.last_version(), NO_VERSION + 2);
    }

    #[test]
    fn update_change_accepts_first_then_requires_successor() {
        let s = EventStream::new().update_change(10).unwrap();
        let s = s.update_change(11).unwrap();
        assert_eq!((s.first_version(), s.last_version()), (10, 11));

        let err = s.update_change(20).unwrap_err();
        match err {
            DomainError::RuleViolation(msg) => assert!(msg.contains("expected version 12")),
            other => panic!("expected RuleViolation, got {other:?}"),
        }
    }

    #[test]
    fn update_change_on_empty_rejects_sentinel() {
        let err = EventStream::new().update_change(NO_VERSION).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("expected first version")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn create_allows_first_greater_than_last() {
        let s = EventStream::create(7, 3).unwrap();
        assert_eq!((s.first_version(), s.last_version()), (7, 3));
    }

    #[test]
    fn create_rejects_negative_bounds() {
        assert!(matches!(EventStream::create(-1, 0), Err(DomainError::Validation(_))));
        assert!(matches!(EventStream::create(0, -5), Err(DomainError::Validation(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn next_increments_last_only(first in 0i64..10_000, last in 0i64..10_000) {
            let s = EventStream::create(first, last).unwrap();
            let n = s.next();
            prop_assert_eq!(n.last_version(), s.last_version() + 1);
            prop_assert_eq!(n.first_version(), s.first_version());
        }

        #[test]
        fn create_fails_iff_negative(first in -100i64..100, last in -100i64..100) {
            let result = EventStream::create(first, last);
            prop_assert_eq!(result.is_err(), first < 0 || last < 0);
        }

        #[test]
        fn replay_of_contiguous_versions_succeeds(start in 1i64..1_000, len in 1usize..50) {
            let mut s = EventStream::new();
            for v in start..start + len as i64 {
                s = s.update_change(v).unwrap();
            }
            prop_assert_eq!(s.first_version(), start);
            prop_assert_eq!(s.last_version(), start + len as i64 - 1);
        }

        #[test]
        fn gaps_are_rule_violations(start in 1i64..1_000, gap in 2i64..100) {
            let s = EventStream::new().update_change(start).unwrap();
            let is_rule_violation = matches!(
                s.update_change(start + gap),
                Err(DomainError::RuleViolation(_))
            );
            prop_assert!(is_rule_violation);
        }
    }
}
