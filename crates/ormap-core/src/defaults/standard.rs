//! The built-in defaults policy.

use super::{ColumnRole, IndexRole, JoinRole, MappingDefaults, NamingScope};
use crate::config::DefaultsConfig;
use crate::model::{ClassDef, ValueDef};
use crate::raw::{ColumnTemplate, ForeignKeyTemplate, IndexTemplate};
use ormap_schema::{ColumnId, FkAction, TableId, TypeCode};

/// Characters of the owner table kept in default join table names.
const JOIN_TABLE_PREFIX_LEN: usize = 5;

/// Defaults driven by a [`DefaultsConfig`].
#[derive(Debug, Clone, Default)]
pub struct StandardDefaults {
    config: DefaultsConfig,
}

impl StandardDefaults {
    /// Create from settings.
    pub fn new(config: DefaultsConfig) -> Self {
        Self { config }
    }

    /// The settings in use.
    pub fn config(&self) -> &DefaultsConfig {
        &self.config
    }

    /// Make a column name acceptable, without checking it against the
    /// table's existing columns.
    fn correct_name(&self, template: &mut ColumnTemplate, scope: NamingScope<'_>) {
        if self.config.default_missing_info && !self.config.remove_hungarian_notation {
            return;
        }
        if let Some(name) = template.name.as_deref() {
            let name = if self.config.remove_hungarian_notation {
                remove_hungarian_notation(name)
            } else {
                name
            };
            template.name = Some(scope.dict.valid_column_identifier(name));
        }
    }

    fn apply_configured(
        &self,
        configured: Option<&str>,
        templates: &mut [ColumnTemplate],
        scope: NamingScope<'_>,
    ) {
        let count = templates.len();
        for (i, template) in templates.iter_mut().enumerate() {
            if let Some(base) = configured {
                template.name = Some(if count == 1 {
                    base.to_string()
                } else {
                    format!("{}{}", base, i)
                });
            }
            self.correct_name(template, scope);
        }
    }

    fn index_name(
        &self,
        name: Option<&str>,
        table: TableId,
        columns: &[ColumnId],
        scope: NamingScope<'_>,
    ) -> Option<String> {
        let base = match name {
            Some(name) => name.to_string(),
            None => scope.group.column(*columns.first()?).name.name().to_string(),
        };
        let base = if self.config.remove_hungarian_notation {
            remove_hungarian_notation(&base).to_string()
        } else {
            base
        };
        Some(scope.dict.valid_index_name(&base, table, scope.group))
    }
}

impl MappingDefaults for StandardDefaults {
    fn default_missing_info(&self) -> bool {
        self.config.default_missing_info
    }

    fn allow_non_default_mappings(&self) -> bool {
        self.config.allow_non_default_mappings
    }

    fn class_strategy(
        &self,
        _class: &ClassDef,
        mapped_superclass: bool,
        adapt: bool,
    ) -> Option<String> {
        if !adapt && !self.config.default_missing_info {
            return None;
        }
        if mapped_superclass {
            self.config.subclass_strategy.clone()
        } else {
            self.config.base_class_strategy.clone()
        }
    }

    fn version_strategy(
        &self,
        class: &ClassDef,
        joinable_superclass: bool,
        adapt: bool,
    ) -> Option<String> {
        if (adapt || self.config.default_missing_info)
            && !joinable_superclass
            && class.version_field().is_none()
        {
            return self.config.version_strategy.clone();
        }
        None
    }

    fn discriminator_strategy(
        &self,
        _class: &ClassDef,
        joinable_superclass: bool,
        has_value: bool,
        adapt: bool,
    ) -> Option<String> {
        if (adapt || self.config.default_missing_info) && !joinable_superclass && !has_value {
            return self.config.discriminator_strategy.clone();
        }
        None
    }

    fn value_strategy(&self, value: &ValueDef, related_mapped: Option<bool>) -> Option<String> {
        if let Some(named) = self.config.field_strategies.get(&value.type_name) {
            return Some(named.clone());
        }
        if self.config.store_unmapped_object_id_string && related_mapped == Some(false) {
            return Some("object-id-string".to_string());
        }
        if value.code == TypeCode::Enum && !value.serialized {
            let name = if self.config.store_enum_ordinal {
                "enum-ordinal"
            } else {
                "enum"
            };
            return Some(name.to_string());
        }
        None
    }

    fn discriminator_value(&self, class: &ClassDef, code: TypeCode, adapt: bool) -> Option<String> {
        if !adapt && !self.config.default_missing_info {
            return None;
        }
        let alias = crate::model::short_name(class.type_alias());
        match code {
            TypeCode::Int | TypeCode::IntObj => Some(alias_hash(alias).to_string()),
            TypeCode::Char | TypeCode::CharObj => alias.chars().next().map(String::from),
            _ => Some(alias.to_string()),
        }
    }

    fn table_name(&self, class: &ClassDef, schema: Option<&str>, scope: NamingScope<'_>) -> String {
        let name = class.short_name().replace('$', "_");
        if self.config.default_missing_info {
            name
        } else {
            scope.dict.valid_table_name(&name, schema, scope.group)
        }
    }

    fn join_table_name(
        &self,
        owner_table: Option<&str>,
        field: &str,
        schema: Option<&str>,
        scope: NamingScope<'_>,
    ) -> String {
        let name = match owner_table {
            Some(owner) => {
                let prefix: String = owner.chars().take(JOIN_TABLE_PREFIX_LEN).collect();
                format!("{}_{}", prefix, field)
            }
            None => field.to_string(),
        };
        if self.config.default_missing_info {
            name
        } else {
            scope.dict.valid_table_name(&name, schema, scope.group)
        }
    }

    fn populate_columns(
        &self,
        role: ColumnRole<'_>,
        _table: TableId,
        templates: &mut [ColumnTemplate],
        scope: NamingScope<'_>,
    ) -> bool {
        match role {
            ColumnRole::DatastoreId => {
                self.apply_configured(
                    self.config.data_store_id_column.as_deref(),
                    templates,
                    scope,
                );
                true
            }
            ColumnRole::Version => {
                self.apply_configured(self.config.version_column.as_deref(), templates, scope);
                true
            }
            ColumnRole::Discriminator => {
                self.apply_configured(
                    self.config.discriminator_column.as_deref(),
                    templates,
                    scope,
                );
                true
            }
            ColumnRole::Value { .. } => {
                self.apply_configured(None, templates, scope);
                true
            }
            ColumnRole::Order { ordered, .. } => {
                self.apply_configured(self.config.order_column.as_deref(), templates, scope);
                self.config.order_lists && ordered
            }
            ColumnRole::NullIndicator { .. } => {
                self.apply_configured(
                    self.config.null_indicator_column.as_deref(),
                    templates,
                    scope,
                );
                self.config.add_null_indicator
            }
        }
    }

    fn populate_join_column(
        &self,
        role: JoinRole<'_>,
        target: Option<&str>,
        _position: usize,
        count: usize,
        _table: TableId,
        template: &mut ColumnTemplate,
        scope: NamingScope<'_>,
    ) {
        if let JoinRole::ForeignKey { name, .. } = role {
            if count == 1 {
                template.name = Some(name.to_string());
            } else if let Some(target) = target {
                template.name = Some(format!("{}_{}", name, target));
            }
        }
        self.correct_name(template, scope);
    }

    fn join_foreign_key(&self, _local: TableId, _foreign: TableId) -> Option<ForeignKeyTemplate> {
        if self.config.join_fk_delete_action == FkAction::None {
            return None;
        }
        Some(ForeignKeyTemplate {
            delete_action: Some(self.config.join_fk_delete_action),
            deferred: self.config.defer_constraints,
            ..ForeignKeyTemplate::default()
        })
    }

    fn foreign_key(
        &self,
        _name: &str,
        _local: TableId,
        _foreign: TableId,
        _inverse: bool,
    ) -> Option<ForeignKeyTemplate> {
        if self.config.fk_delete_action == FkAction::None {
            return None;
        }
        Some(ForeignKeyTemplate {
            delete_action: Some(self.config.fk_delete_action),
            deferred: self.config.defer_constraints,
            ..ForeignKeyTemplate::default()
        })
    }

    fn index(
        &self,
        role: IndexRole<'_>,
        table: TableId,
        columns: &[ColumnId],
        scope: NamingScope<'_>,
    ) -> Option<IndexTemplate> {
        let all_pk = || columns.iter().all(|c| scope.group.column(*c).primary_key);
        let name = match role {
            IndexRole::Join { logical_fk } => {
                if !self.config.index_logical_fks || !logical_fk || all_pk() {
                    return None;
                }
                self.index_name(None, table, columns, scope)
            }
            IndexRole::Value { name, logical_fk } => {
                if !self.config.index_logical_fks || !logical_fk || all_pk() {
                    return None;
                }
                self.index_name(Some(name), table, columns, scope)
            }
            IndexRole::Version => {
                if !self.config.index_version {
                    return None;
                }
                self.index_name(self.config.version_column.as_deref(), table, columns, scope)
            }
            IndexRole::Discriminator => {
                if !self.config.index_discriminator {
                    return None;
                }
                self.index_name(self.config.discriminator_column.as_deref(), table, columns, scope)
            }
        };
        name.map(IndexTemplate::named)
    }
}

/// Strip a lowercase type prefix: `strName` becomes `Name`.
fn remove_hungarian_notation(name: &str) -> &str {
    match name.char_indices().find(|(_, c)| c.is_uppercase()) {
        Some((pos, _)) if pos > 0 => &name[pos..],
        _ => name,
    }
}

/// 32-bit string hash stable across runs, used for integer discriminator values.
fn alias_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormap_schema::{DbDictionary, PrimaryKey, SchemaGroup, SqlType};

    fn scope_parts() -> (SchemaGroup, DbDictionary, TableId) {
        let mut group = SchemaGroup::new();
        let table = group.add_table(None, "PERSON");
        (group, DbDictionary::generic(), table)
    }

    #[test]
    fn test_table_names() {
        let (group, dict, _) = scope_parts();
        let scope = NamingScope::new(&group, &dict);
        let defaults = StandardDefaults::default();
        assert_eq!(
            defaults.table_name(&ClassDef::new("com.acme.Outer$Inner"), None, scope),
            "Outer_Inner"
        );
        assert_eq!(
            defaults.join_table_name(Some("PERSON"), "phones", None, scope),
            "PERSO_phones"
        );

        let strict =
            StandardDefaults::new(DefaultsConfig::default().with_default_missing_info(false));
        let name = strict.table_name(&ClassDef::new("Person"), None, scope);
        assert!(!name.eq_ignore_ascii_case("PERSON"));
    }

    #[test]
    fn test_configured_column_names() {
        let (group, dict, table) = scope_parts();
        let scope = NamingScope::new(&group, &dict);
        let defaults = StandardDefaults::new(DefaultsConfig::default().with_version_column("OPT"));
        let mut one = [ColumnTemplate::new("VERSN")];
        defaults.populate_columns(ColumnRole::Version, table, &mut one, scope);
        assert_eq!(one[0].name.as_deref(), Some("OPT"));

        let mut two = [ColumnTemplate::new("A"), ColumnTemplate::new("B")];
        defaults.populate_columns(ColumnRole::Version, table, &mut two, scope);
        assert_eq!(two[1].name.as_deref(), Some("OPT1"));
    }

    #[test]
    fn test_order_and_null_indicator_wanted() {
        let (group, dict, table) = scope_parts();
        let scope = NamingScope::new(&group, &dict);
        let defaults = StandardDefaults::default();
        let mut cols = [ColumnTemplate::new("X")];
        assert!(defaults.populate_columns(
            ColumnRole::Order { field: "items", ordered: true },
            table,
            &mut cols,
            scope
        ));
        assert!(!defaults.populate_columns(
            ColumnRole::Order { field: "items", ordered: false },
            table,
            &mut cols,
            scope
        ));
        assert!(!defaults.populate_columns(
            ColumnRole::NullIndicator { field: "home" },
            table,
            &mut cols,
            scope
        ));
    }

    #[test]
    fn test_foreign_key_column_naming() {
        let (group, dict, table) = scope_parts();
        let scope = NamingScope::new(&group, &dict);
        let defaults = StandardDefaults::default();
        let role = JoinRole::ForeignKey { name: "owner", inverse: false };

        let mut single = ColumnTemplate::new("ID");
        defaults.populate_join_column(role, Some("ID"), 0, 1, table, &mut single, scope);
        assert_eq!(single.name.as_deref(), Some("owner"));

        let mut multi = ColumnTemplate::new("CODE");
        defaults.populate_join_column(role, Some("CODE"), 1, 2, table, &mut multi, scope);
        assert_eq!(multi.name.as_deref(), Some("owner_CODE"));

        let mut join = ColumnTemplate::new("ID");
        defaults.populate_join_column(JoinRole::Field, Some("ID"), 0, 1, table, &mut join, scope);
        assert_eq!(join.name.as_deref(), Some("ID"));
    }

    #[test]
    fn test_name_correction_when_not_filling() {
        let (group, dict, table) = scope_parts();
        let scope = NamingScope::new(&group, &dict);
        let defaults = StandardDefaults::new(
            DefaultsConfig::default()
                .with_default_missing_info(false)
                .with_remove_hungarian_notation(true),
        );
        let mut cols = [ColumnTemplate::new("strOrder")];
        defaults.populate_columns(ColumnRole::Value { name: "order" }, table, &mut cols, scope);
        assert_eq!(cols[0].name.as_deref(), Some("Order0"));
    }

    #[test]
    fn test_value_strategies() {
        let defaults = StandardDefaults::new(
            DefaultsConfig::default()
                .with_field_strategy("Money", "money")
                .with_store_enum_ordinal(true),
        );
        assert_eq!(
            defaults.value_strategy(&ValueDef::named("Money", TypeCode::Object), None).as_deref(),
            Some("money")
        );
        assert_eq!(
            defaults.value_strategy(&ValueDef::enumeration("Color"), None).as_deref(),
            Some("enum-ordinal")
        );
        assert_eq!(defaults.value_strategy(&ValueDef::of(TypeCode::Int), None), None);
    }

    #[test]
    fn test_discriminator_values() {
        let defaults = StandardDefaults::default();
        let class = ClassDef::new("com.acme.Dog");
        assert_eq!(
            defaults.discriminator_value(&class, TypeCode::String, false).as_deref(),
            Some("Dog")
        );
        assert_eq!(
            defaults.discriminator_value(&class, TypeCode::Char, false).as_deref(),
            Some("D")
        );
        assert_eq!(
            defaults.discriminator_value(&class, TypeCode::Int, false).as_deref(),
            Some("68892")
        );
        let strict =
            StandardDefaults::new(DefaultsConfig::default().with_default_missing_info(false));
        assert_eq!(strict.discriminator_value(&class, TypeCode::String, false), None);
    }

    #[test]
    fn test_index_rules() {
        let (mut group, dict, table) = scope_parts();
        let id = group.add_typed_column(table, "ID", SqlType::BigInt);
        let owner = group.add_typed_column(table, "OWNER_ID", SqlType::BigInt);
        group.set_primary_key(table, PrimaryKey::new(vec![id]));
        let scope = NamingScope::new(&group, &dict);
        let defaults = StandardDefaults::default();

        let logical = IndexRole::Value { name: "owner", logical_fk: true };
        assert_eq!(
            defaults.index(logical, table, &[owner], scope).and_then(|i| i.name).as_deref(),
            Some("owner")
        );
        assert!(defaults.index(logical, table, &[id], scope).is_none());
        let physical = IndexRole::Value { name: "owner", logical_fk: false };
        assert!(defaults.index(physical, table, &[owner], scope).is_none());
        assert!(defaults.index(IndexRole::Version, table, &[owner], scope).is_none());
        assert!(defaults.index(IndexRole::Discriminator, table, &[owner], scope).is_some());
    }

    #[test]
    fn test_foreign_key_templates() {
        let (_, _, table) = scope_parts();
        let defaults = StandardDefaults::default();
        assert!(defaults.foreign_key("owner", table, table, false).is_none());
        let cascading = StandardDefaults::new(
            DefaultsConfig::default()
                .with_join_fk_delete_action(FkAction::Cascade)
                .with_defer_constraints(true),
        );
        let fk = cascading.join_foreign_key(table, table).unwrap();
        assert_eq!(fk.delete_action, Some(FkAction::Cascade));
        assert!(fk.deferred);
    }

    #[test]
    fn test_java_hash() {
        assert_eq!(alias_hash(""), 0);
        assert_eq!(alias_hash("a"), 97);
        assert_eq!(alias_hash("Dog"), 68892);
    }
}
