use thiserror::Error;

use strata_core::DomainError;

/// Storage boundary failure.
///
/// These are **infrastructure errors** raised by an event-store or data-store
/// implementation. The stores pass them through unchanged; retry policy is the
/// caller's decision.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("record already exists: {0}")]
    Conflict(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl BackendError {
    pub(crate) fn poisoned() -> Self {
        BackendError::Storage("lock poisoned".to_string())
    }
}

/// Error returned by every store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A schema or query authoring defect (e.g. ordering by an unknown field).
    #[error("configuration defect: {0}")]
    Configuration(String),
}

impl StoreError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        StoreError::Configuration(msg.into())
    }

    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            StoreError::Domain(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.domain().is_some_and(DomainError::is_not_found)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
