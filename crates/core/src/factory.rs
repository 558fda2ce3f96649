//! Domain factory: explicit registry for rebuilding value objects and entities.

use std::collections::HashMap;

use crate::aggregate::Persistable;
use crate::entity::GenericEntity;
use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

type StoredCheck = fn(&str) -> DomainResult<()>;

fn check_stored<V: ValueObject>(raw: &str) -> DomainResult<()> {
    V::from_stored(raw).map(|_| ())
}

/// Registry of value-object types known to one aggregate family.
///
/// Populated once at startup:
///
/// ```ignore
/// let factory = DomainFactory::new()
///     .register::<Money>()
///     .register::<Email>();
/// ```
///
/// Reading a value object whose type was never registered is a validation
/// failure, even if the type itself could parse the text.
#[derive(Clone, Default)]
pub struct DomainFactory {
    checks: HashMap<&'static str, StoredCheck>,
}

impl core::fmt::Debug for DomainFactory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut types: Vec<_> = self.checks.keys().collect();
        types.sort();
        f.debug_struct("DomainFactory").field("types", &types).finish()
    }
}

impl DomainFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<V: ValueObject>(mut self) -> Self {
        self.checks.insert(V::TYPE_ID, check_stored::<V> as StoredCheck);
        self
    }

    pub fn is_registered(&self, type_id: &str) -> bool {
        self.checks.contains_key(type_id)
    }

    /// Rebuild a value object from its stored text.
    pub fn value<V: ValueObject>(&self, raw: &str) -> DomainResult<V> {
        if !self.is_registered(V::TYPE_ID) {
            return Err(unregistered(V::TYPE_ID));
        }
        V::from_stored(raw)
    }

    /// Validate stored text for a type known only by its id.
    pub fn check(&self, type_id: &str, raw: &str) -> DomainResult<()> {
        match self.checks.get(type_id) {
            Some(check) => check(raw),
            None => Err(unregistered(type_id)),
        }
    }

    /// Rebuild a DTO, read model or domain entity from a generic entity.
    pub fn rehydrate<T: Persistable>(&self, entity: &GenericEntity) -> DomainResult<T> {
        T::rehydrate(entity, self)
    }
}

fn unregistered(type_id: &str) -> DomainError {
    DomainError::validation(format!("no factory registered for value type '{type_id}'"))
}
