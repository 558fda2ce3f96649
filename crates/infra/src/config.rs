//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

pub const DEFAULT_TAKE: usize = 50;
pub const MAX_TAKE: usize = 1000;

/// Options shared by the store families.
///
/// Every field has a default, so a partial document such as
/// `{"default_take": 20}` deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Container (or entity) name override; otherwise derived from the type name.
    pub container: Option<String>,
    /// Page size used when a query does not set one.
    pub default_take: usize,
    /// Upper bound applied to every page size.
    pub max_take: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            container: None,
            default_take: DEFAULT_TAKE,
            max_take: MAX_TAKE,
        }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn with_default_take(mut self, take: usize) -> Self {
        self.default_take = take;
        self
    }

    pub fn with_max_take(mut self, take: usize) -> Self {
        self.max_take = take;
        self
    }

    /// Parse options from a JSON document.
    pub fn from_json_str(raw: &str) -> StoreResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| StoreError::configuration(format!("invalid store options: {e}")))
    }

    /// Page size for a query: the requested take (else the default), capped.
    pub fn resolve_take(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_take).min(self.max_take)
    }

    /// The configured override, or `derived` when none is set.
    pub(crate) fn container_or(&self, derived: String) -> String {
        match &self.container {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => derived,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_fill_defaults() {
        let options = StoreOptions::from_json_str(r#"{ "default_take": 20 }"#).unwrap();
        assert_eq!(options.default_take, 20);
        assert_eq!(options.max_take, MAX_TAKE);
        assert_eq!(options.container, None);
    }

    #[test]
    fn take_is_capped() {
        let options = StoreOptions::new().with_max_take(100);
        assert_eq!(options.resolve_take(None), DEFAULT_TAKE);
        assert_eq!(options.resolve_take(Some(5_000)), 100);
        assert_eq!(options.resolve_take(Some(0)), 0);
    }

    #[test]
    fn malformed_options_are_configuration_errors() {
        let err = StoreOptions::from_json_str("{ \"max_take\": \"lots\" }").unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    #[test]
    fn blank_override_falls_back_to_derived_name() {
        let options = StoreOptions::new().with_container("  ");
        assert_eq!(options.container_or("Order".into()), "Order");
        let options = StoreOptions::new().with_container("orders_v2");
        assert_eq!(options.container_or("Order".into()), "orders_v2");
    }
}
