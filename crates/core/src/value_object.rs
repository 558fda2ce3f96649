//! Value object trait: equality by value, persisted as tagged text.
//!
//! Value objects have **no identity** — two values with the same attributes are
//! equal. The generic layer cannot know how to parse them, so each one declares
//! a stable type id and its own stored text form. Rebuilding goes through the
//! [`DomainFactory`](crate::DomainFactory) registry, never through reflection.

use crate::error::DomainResult;
use crate::value::ValueTypeId;

/// A value object that can round-trip through a property bag.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Email(String);
///
/// impl ValueObject for Email {
///     const TYPE_ID: &'static str = "contact.email";
///
///     fn to_stored(&self) -> String {
///         self.0.clone()
///     }
///
///     fn from_stored(raw: &str) -> DomainResult<Self> {
///         if !raw.contains('@') {
///             return Err(DomainError::validation("email must contain '@'"));
///         }
///         Ok(Self(raw.to_string()))
///     }
/// }
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug + Sized {
    /// Stable identifier; must not change once data has been persisted.
    const TYPE_ID: &'static str;

    /// Canonical stored text.
    fn to_stored(&self) -> String;

    /// Parse the stored text back into a value.
    fn from_stored(raw: &str) -> DomainResult<Self>;

    fn type_id() -> ValueTypeId {
        ValueTypeId::new(Self::TYPE_ID)
    }
}
