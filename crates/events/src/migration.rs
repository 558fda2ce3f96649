//! Event schema migration applied on read.
//!
//! Stored events are never rewritten. Old payloads are upgraded in memory,
//! keyed by `type_tag`, before the aggregate sees them.

use std::collections::HashMap;
use std::sync::Arc;

use strata_core::{DomainError, DomainResult};

use crate::event::ChangeEvent;

/// Upgrades a stored change to the shape the aggregate expects.
pub trait EventMigrator: Send + Sync {
    fn migrate(&self, event: ChangeEvent) -> DomainResult<ChangeEvent>;
}

/// Identity migration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMigration;

impl EventMigrator for NoMigration {
    fn migrate(&self, event: ChangeEvent) -> DomainResult<ChangeEvent> {
        Ok(event)
    }
}

type Upcast = Arc<dyn Fn(ChangeEvent) -> DomainResult<ChangeEvent> + Send + Sync>;

/// Longest chain of upcasts followed for a single event.
const MAX_UPCAST_STEPS: usize = 32;

/// Registry of per-tag upcasters, applied repeatedly until no upcaster
/// matches the current tag (v1 -> v2 -> v3 ...).
#[derive(Clone, Default)]
pub struct Upcasters {
    by_tag: HashMap<String, Upcast>,
}

impl core::fmt::Debug for Upcasters {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut tags: Vec<&str> = self.by_tag.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("Upcasters").field("tags", &tags).finish()
    }
}

impl Upcasters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an upcaster for events tagged `from_tag`.
    ///
    /// The upcaster must change the tag, otherwise the chain stops with an error.
    pub fn register<F>(mut self, from_tag: impl Into<String>, upcast: F) -> Self
    where
        F: Fn(ChangeEvent) -> DomainResult<ChangeEvent> + Send + Sync + 'static,
    {
        self.by_tag.insert(from_tag.into(), Arc::new(upcast));
        self
    }

    pub fn handles(&self, type_tag: &str) -> bool {
        self.by_tag.contains_key(type_tag)
    }
}

impl EventMigrator for Upcasters {
    fn migrate(&self, mut event: ChangeEvent) -> DomainResult<ChangeEvent> {
        let version = event.version;
        for _ in 0..MAX_UPCAST_STEPS {
            let Some(upcast) = self.by_tag.get(&event.type_tag) else {
                return Ok(event);
            };
            let from = event.type_tag.clone();
            event = upcast(event)?;
            if event.type_tag == from {
                return Err(DomainError::rule_violation(format!(
                    "upcaster for '{from}' did not change the type tag"
                )));
            }
            // Migration must not move the event within its stream.
            event.version = version;
        }
        Err(DomainError::rule_violation(format!(
            "upcast chain for '{}' exceeded {MAX_UPCAST_STEPS} steps",
            event.type_tag
        )))
    }
}
