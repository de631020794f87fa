//! Registered custom strategies and type handlers.

use super::custom::{CustomHandle, CustomStrategy};
use super::{ClassStrategy, DiscriminatorStrategy, FieldStrategy, ValueHandler, VersionStrategy};
use crate::error::{Error, Result};
use crate::model::ClassModel;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Custom strategies by name and value handlers by type name.
///
/// Registration takes `&self` so strategies can be added while a catalog is
/// shared.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: DashMap<String, Arc<dyn CustomStrategy>>,
    handlers: DashMap<String, ValueHandler>,
}

impl StrategyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom strategy under a name. Built-in names cannot be
    /// shadowed.
    pub fn register_strategy(&self, name: impl Into<String>, strategy: Arc<dyn CustomStrategy>) {
        let name = name.into();
        debug!(strategy = %name, "registering custom strategy");
        self.strategies.insert(name, strategy);
    }

    /// Register a handler for values of a type and its subtypes.
    pub fn register_handler(&self, type_name: impl Into<String>, handler: ValueHandler) {
        self.handlers.insert(type_name.into(), handler);
    }

    /// Remove a custom strategy.
    pub fn unregister_strategy(&self, name: &str) -> bool {
        self.strategies.remove(name).is_some()
    }

    /// A registered custom strategy.
    pub fn custom(&self, name: &str) -> Option<CustomHandle> {
        self.strategies
            .get(name)
            .map(|entry| CustomHandle::new(name, entry.value().clone()))
    }

    /// Number of registered custom strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether no custom strategy is registered.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Handler registered for a type, searching its supertypes.
    pub fn handler_for(&self, type_name: &str, model: &ClassModel) -> Option<ValueHandler> {
        let mut current = Some(type_name);
        let mut depth = 0;
        while let Some(name) = current {
            if let Some(handler) = self.handlers.get(name) {
                return Some(handler.value().clone());
            }
            depth += 1;
            if depth > model.len() + 64 {
                return None;
            }
            current = model.supertype(name);
        }
        None
    }

    /// Class strategy for a record name.
    pub fn class_strategy(&self, context: &str, name: &str) -> Result<ClassStrategy> {
        ClassStrategy::from_alias(name)
            .or_else(|| self.custom(name).map(ClassStrategy::Custom))
            .ok_or_else(|| unknown(context, name))
    }

    /// Field strategy or value handler for a record name.
    pub fn field_strategy(&self, context: &str, name: &str) -> Result<FieldStrategy> {
        FieldStrategy::from_alias(name)
            .or_else(|| self.custom(name).map(FieldStrategy::Custom))
            .ok_or_else(|| unknown(context, name))
    }

    /// Value handler for a record name.
    pub fn value_handler(&self, context: &str, name: &str) -> Result<ValueHandler> {
        ValueHandler::from_alias(name)
            .or_else(|| self.custom(name).map(ValueHandler::Custom))
            .ok_or_else(|| unknown(context, name))
    }

    /// Version strategy for a record name.
    pub fn version_strategy(&self, context: &str, name: &str) -> Result<VersionStrategy> {
        VersionStrategy::from_alias(name)
            .or_else(|| self.custom(name).map(VersionStrategy::Custom))
            .ok_or_else(|| unknown(context, name))
    }

    /// Discriminator strategy for a record name.
    pub fn discriminator_strategy(
        &self,
        context: &str,
        name: &str,
    ) -> Result<DiscriminatorStrategy> {
        DiscriminatorStrategy::from_alias(name)
            .or_else(|| self.custom(name).map(DiscriminatorStrategy::Custom))
            .ok_or_else(|| unknown(context, name))
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.strategies.iter().map(|e| e.key().clone()).collect();
        names.sort();
        f.debug_struct("StrategyRegistry")
            .field("strategies", &names)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

fn unknown(context: &str, name: &str) -> Error {
    Error::UnknownStrategy {
        context: context.to_string(),
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::ColumnTemplate;
    use crate::strategy::{Row, StrategyTarget};
    use serde_json::Value;

    struct Noop;

    impl CustomStrategy for Noop {
        fn column_templates(&self, _target: &StrategyTarget<'_>) -> Vec<ColumnTemplate> {
            Vec::new()
        }
        fn insert(&self, _target: &StrategyTarget<'_>, _row: &mut Row) -> Result<()> {
            Ok(())
        }
        fn update(&self, _target: &StrategyTarget<'_>, _row: &mut Row) -> Result<()> {
            Ok(())
        }
        fn delete(&self, _target: &StrategyTarget<'_>, _row: &Row) -> Result<()> {
            Ok(())
        }
        fn load(&self, _target: &StrategyTarget<'_>, _row: &Row) -> Result<Option<Value>> {
            Ok(None)
        }
    }

    #[test]
    fn test_named_lookup_order() {
        let registry = StrategyRegistry::new();
        registry.register_strategy("audit", Arc::new(Noop));
        registry.register_strategy("flat", Arc::new(Noop));

        assert_eq!(registry.class_strategy("C", "flat").unwrap(), ClassStrategy::Flat);
        assert!(matches!(
            registry.class_strategy("C", "audit").unwrap(),
            ClassStrategy::Custom(h) if h.name() == "audit"
        ));
        let err = registry.field_strategy("C.f", "missing").unwrap_err();
        assert!(matches!(err, Error::UnknownStrategy { name, .. } if name == "missing"));
        assert!(registry.unregister_strategy("audit"));
        assert!(registry.custom("audit").is_none());
    }

    #[test]
    fn test_handler_lookup_walks_supertypes() {
        let model = ClassModel::new()
            .with_supertype("EuroAmount", "Money")
            .with_supertype("Money", "Number");
        let registry = StrategyRegistry::new();
        registry.register_handler("Money", ValueHandler::Clob);
        assert_eq!(registry.handler_for("EuroAmount", &model), Some(ValueHandler::Clob));
        assert_eq!(registry.handler_for("Number", &model), None);
    }
}
