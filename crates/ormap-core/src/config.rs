//! Mapping configuration.
//!
//! [`MappingConfig`] carries the run-wide flags; [`DefaultsConfig`] carries
//! the knobs of the standard defaults policy. Both load from JSON.

use crate::error::{Error, Result};
use ormap_schema::FkAction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Column name used for datastore identity when none is configured.
pub const DEFAULT_DATASTORE_ID_COLUMN: &str = "ID";

/// Column name used for version columns when none is configured.
pub const DEFAULT_VERSION_COLUMN: &str = "VERSN";

/// Column name used for discriminator columns when none is configured.
pub const DEFAULT_DISCRIMINATOR_COLUMN: &str = "TYP";

/// Suffix appended to a field name to form its order column name.
pub const DEFAULT_ORDER_COLUMN_SUFFIX: &str = "_ORDER";

/// Suffix appended to a field name to form its null-indicator column name.
pub const DEFAULT_NULL_INDICATOR_SUFFIX: &str = "_NULL";

/// Run-wide mapping configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Allow the merge engine to create and alter schema objects.
    pub adapt: bool,

    /// Schema for tables whose name carries no schema.
    pub default_schema: Option<String>,

    /// Settings of the standard defaults policy.
    pub defaults: DefaultsConfig,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            adapt: false,
            default_schema: None,
            defaults: DefaultsConfig::default(),
        }
    }
}

impl MappingConfig {
    /// Configuration that validates against the schema without changing it.
    pub fn validate_only() -> Self {
        Self {
            defaults: DefaultsConfig::default().with_default_missing_info(false),
            ..Self::default()
        }
    }

    /// Configuration that creates whatever the mapping needs.
    pub fn adapting() -> Self {
        Self {
            adapt: true,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: MappingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check settings that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if let Some(schema) = &self.default_schema {
            if schema.trim().is_empty() {
                return Err(Error::Config("default_schema must not be blank".into()));
            }
        }
        self.defaults.validate()
    }

    /// Set the adapt flag.
    pub fn with_adapt(mut self, adapt: bool) -> Self {
        self.adapt = adapt;
        self
    }

    /// Set the default schema.
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    /// Replace the defaults settings.
    pub fn with_defaults(mut self, defaults: DefaultsConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Whether defaults may invent missing information.
    pub fn fill(&self) -> bool {
        self.defaults.default_missing_info
    }
}

/// Settings of the standard defaults policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Invent table, column and constraint information the records leave out.
    pub default_missing_info: bool,

    /// Strategy for classes without a mapped superclass.
    pub base_class_strategy: Option<String>,

    /// Strategy for classes with a mapped superclass.
    pub subclass_strategy: Option<String>,

    /// Version strategy for classes without a version field.
    pub version_strategy: Option<String>,

    /// Discriminator strategy for base classes.
    pub discriminator_strategy: Option<String>,

    /// Strategy or handler names keyed by value type name.
    pub field_strategies: BTreeMap<String, String>,

    /// Store enums by ordinal instead of by name.
    pub store_enum_ordinal: bool,

    /// Store relations to unmapped types as stringified object ids.
    pub store_unmapped_object_id_string: bool,

    /// Delete action for join foreign keys (secondary, join-table, vertical).
    pub join_fk_delete_action: FkAction,

    /// Delete action for relation foreign keys.
    pub fk_delete_action: FkAction,

    /// Create foreign keys as deferred.
    pub defer_constraints: bool,

    /// Index columns of logical foreign keys.
    pub index_logical_fks: bool,

    /// Index discriminator columns.
    pub index_discriminator: bool,

    /// Index version columns.
    pub index_version: bool,

    /// Add order columns to ordered collections.
    pub order_lists: bool,

    /// Add a null-indicator column to embedded values.
    pub add_null_indicator: bool,

    /// Datastore identity column name.
    pub data_store_id_column: Option<String>,

    /// Version column name.
    pub version_column: Option<String>,

    /// Discriminator column name.
    pub discriminator_column: Option<String>,

    /// Order column name.
    pub order_column: Option<String>,

    /// Null-indicator column name.
    pub null_indicator_column: Option<String>,

    /// Strip lowercase type prefixes (`strName`, `m_name`) from column names.
    pub remove_hungarian_notation: bool,

    /// Allow a unidirectional one-to-many through a key in the element table.
    pub allow_non_default_mappings: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            default_missing_info: true,
            base_class_strategy: None,
            subclass_strategy: None,
            version_strategy: None,
            discriminator_strategy: None,
            field_strategies: BTreeMap::new(),
            store_enum_ordinal: false,
            store_unmapped_object_id_string: false,
            join_fk_delete_action: FkAction::None,
            fk_delete_action: FkAction::None,
            defer_constraints: false,
            index_logical_fks: true,
            index_discriminator: true,
            index_version: false,
            order_lists: true,
            add_null_indicator: false,
            data_store_id_column: None,
            version_column: None,
            discriminator_column: None,
            order_column: None,
            null_indicator_column: None,
            remove_hungarian_notation: false,
            allow_non_default_mappings: false,
        }
    }
}

impl DefaultsConfig {
    /// Check names that must not be blank when given.
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("data_store_id_column", &self.data_store_id_column),
            ("version_column", &self.version_column),
            ("discriminator_column", &self.discriminator_column),
            ("order_column", &self.order_column),
            ("null_indicator_column", &self.null_indicator_column),
        ];
        for (key, value) in names {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(Error::Config(format!("{} must not be blank", key)));
            }
        }
        for (type_name, strategy) in &self.field_strategies {
            if strategy.trim().is_empty() {
                return Err(Error::Config(format!(
                    "field strategy for {} must not be blank",
                    type_name
                )));
            }
        }
        Ok(())
    }

    /// Set whether missing information is invented.
    pub fn with_default_missing_info(mut self, fill: bool) -> Self {
        self.default_missing_info = fill;
        self
    }

    /// Set the base class strategy name.
    pub fn with_base_class_strategy(mut self, name: impl Into<String>) -> Self {
        self.base_class_strategy = Some(name.into());
        self
    }

    /// Set the subclass strategy name.
    pub fn with_subclass_strategy(mut self, name: impl Into<String>) -> Self {
        self.subclass_strategy = Some(name.into());
        self
    }

    /// Set the version strategy name.
    pub fn with_version_strategy(mut self, name: impl Into<String>) -> Self {
        self.version_strategy = Some(name.into());
        self
    }

    /// Set the discriminator strategy name.
    pub fn with_discriminator_strategy(mut self, name: impl Into<String>) -> Self {
        self.discriminator_strategy = Some(name.into());
        self
    }

    /// Map a value type name to a strategy or handler name.
    pub fn with_field_strategy(
        mut self,
        type_name: impl Into<String>,
        strategy: impl Into<String>,
    ) -> Self {
        self.field_strategies
            .insert(type_name.into(), strategy.into());
        self
    }

    /// Set the join foreign key delete action.
    pub fn with_join_fk_delete_action(mut self, action: FkAction) -> Self {
        self.join_fk_delete_action = action;
        self
    }

    /// Set the relation foreign key delete action.
    pub fn with_fk_delete_action(mut self, action: FkAction) -> Self {
        self.fk_delete_action = action;
        self
    }

    /// Set whether constraints are deferred.
    pub fn with_defer_constraints(mut self, defer: bool) -> Self {
        self.defer_constraints = defer;
        self
    }

    /// Set whether enums are stored by ordinal.
    pub fn with_store_enum_ordinal(mut self, ordinal: bool) -> Self {
        self.store_enum_ordinal = ordinal;
        self
    }

    /// Set whether embedded values get a null indicator.
    pub fn with_null_indicator(mut self, add: bool) -> Self {
        self.add_null_indicator = add;
        self
    }

    /// Set whether ordered collections get an order column.
    pub fn with_order_lists(mut self, order: bool) -> Self {
        self.order_lists = order;
        self
    }

    /// Set whether logical foreign keys are indexed.
    pub fn with_index_logical_fks(mut self, index: bool) -> Self {
        self.index_logical_fks = index;
        self
    }

    /// Set whether version columns are indexed.
    pub fn with_index_version(mut self, index: bool) -> Self {
        self.index_version = index;
        self
    }

    /// Set whether discriminator columns are indexed.
    pub fn with_index_discriminator(mut self, index: bool) -> Self {
        self.index_discriminator = index;
        self
    }

    /// Set the datastore identity column name.
    pub fn with_data_store_id_column(mut self, name: impl Into<String>) -> Self {
        self.data_store_id_column = Some(name.into());
        self
    }

    /// Set the version column name.
    pub fn with_version_column(mut self, name: impl Into<String>) -> Self {
        self.version_column = Some(name.into());
        self
    }

    /// Set the discriminator column name.
    pub fn with_discriminator_column(mut self, name: impl Into<String>) -> Self {
        self.discriminator_column = Some(name.into());
        self
    }

    /// Set the order column name.
    pub fn with_order_column(mut self, name: impl Into<String>) -> Self {
        self.order_column = Some(name.into());
        self
    }

    /// Set whether Hungarian-notation prefixes are removed.
    pub fn with_remove_hungarian_notation(mut self, remove: bool) -> Self {
        self.remove_hungarian_notation = remove;
        self
    }

    /// Set whether non-default mappings are allowed.
    pub fn with_allow_non_default_mappings(mut self, allow: bool) -> Self {
        self.allow_non_default_mappings = allow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MappingConfig::default();
        assert!(!config.adapt);
        assert!(config.fill());
        assert!(config.defaults.index_logical_fks);
        assert!(config.defaults.order_lists);
        assert!(!config.defaults.add_null_indicator);
        assert_eq!(config.defaults.fk_delete_action, FkAction::None);

        let strict = MappingConfig::validate_only();
        assert!(!strict.adapt);
        assert!(!strict.fill());
    }

    #[test]
    fn test_builder() {
        let config = MappingConfig::adapting()
            .with_default_schema("APP")
            .with_defaults(
                DefaultsConfig::default()
                    .with_version_column("OPT_LOCK")
                    .with_fk_delete_action(FkAction::Cascade)
                    .with_field_strategy("Money", "money-handler"),
            );
        assert!(config.adapt);
        assert_eq!(config.default_schema.as_deref(), Some("APP"));
        assert_eq!(config.defaults.version_column.as_deref(), Some("OPT_LOCK"));
        assert_eq!(
            config.defaults.field_strategies.get("Money").map(String::as_str),
            Some("money-handler")
        );
    }

    #[test]
    fn test_from_json_partial() {
        let config = MappingConfig::from_json_str(
            r#"{
                "adapt": true,
                "defaults": {
                    "default_missing_info": false,
                    "join_fk_delete_action": "cascade",
                    "discriminator_column": "DTYPE"
                }
            }"#,
        )
        .unwrap();
        assert!(config.adapt);
        assert!(!config.fill());
        assert_eq!(config.defaults.join_fk_delete_action, FkAction::Cascade);
        assert_eq!(config.defaults.discriminator_column.as_deref(), Some("DTYPE"));
        assert!(config.defaults.index_discriminator);
    }

    #[test]
    fn test_validation_rejects_blank_names() {
        let err = MappingConfig::from_json_str(r#"{"defaults": {"version_column": "  "}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = MappingConfig::from_json_str(r#"{"default_schema": ""}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let config = MappingConfig::adapting().with_default_schema("HR");
        let json = config.to_json_string().unwrap();
        assert_eq!(MappingConfig::from_json_str(&json).unwrap(), config);
    }
}
