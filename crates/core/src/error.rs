//! Domain error model.

use thiserror::Error;

/// Result type used across the persistence core.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// These are deterministic outcomes of the persistence contract (malformed input,
/// ordering violations, missing or already-present entities). Backend failures are
/// carried separately by the infrastructure layer and never folded into this enum.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. a negative stream version).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A state-machine rule was violated (e.g. an out-of-order event version).
    #[error("rule violated: {0}")]
    RuleViolation(String),

    /// The entity is absent, soft-deleted and excluded, or tombstoned.
    #[error("{entity} '{id}' not found")]
    EntityNotFound { entity: String, id: String },

    /// The entity already exists.
    ///
    /// Also returned when an event-sourced aggregate is saved without an identity.
    #[error("entity exists: {0}")]
    EntityExists(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn rule_violation(msg: impl Into<String>) -> Self {
        Self::RuleViolation(msg.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl core::fmt::Display) -> Self {
        Self::EntityNotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn exists(msg: impl Into<String>) -> Self {
        Self::EntityExists(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntityNotFound { .. })
    }
}
