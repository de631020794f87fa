//! Per-element records and the bundle of records for one class.

use super::hint::Hint;
use super::record::MappingRecord;
use super::template::{tables_match, ColumnTemplate, UniqueTemplate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Records for a class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassRecord {
    /// Strategy name, datastore identity or superclass join columns, and the
    /// superclass join foreign key.
    pub base: MappingRecord,
    /// Primary table name.
    pub table: Option<String>,
    /// Schema of the primary table.
    pub schema: Option<String>,
    /// Strategy applied to subclasses by default.
    pub hierarchy_strategy: Option<String>,
    /// Secondary tables and the columns joining them to the primary table.
    pub secondary_tables: BTreeMap<String, Vec<ColumnTemplate>>,
    /// Unique constraints over columns of the primary table.
    pub uniques: Vec<UniqueTemplate>,
    /// Primary key constraint name.
    pub primary_key_name: Option<String>,
}

impl ClassRecord {
    /// Set the table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set the strategy.
    pub fn with_strategy(mut self, name: impl Into<String>) -> Self {
        self.base.strategy = Some(name.into());
        self
    }

    /// Set the hierarchy strategy.
    pub fn with_hierarchy_strategy(mut self, name: impl Into<String>) -> Self {
        self.hierarchy_strategy = Some(name.into());
        self
    }

    /// Declare a secondary table.
    pub fn with_secondary_table(
        mut self,
        table: impl Into<String>,
        join: impl IntoIterator<Item = ColumnTemplate>,
    ) -> Self {
        self.secondary_tables
            .insert(table.into(), join.into_iter().collect());
        self
    }

    /// Add a unique constraint.
    pub fn with_unique(mut self, unique: UniqueTemplate) -> Self {
        self.uniques.push(unique);
        self
    }

    /// Join columns of a declared secondary table.
    pub fn secondary_join(&self, table: &str) -> Option<&[ColumnTemplate]> {
        self.secondary_tables
            .iter()
            .find(|(name, _)| tables_match(name, table))
            .map(|(_, cols)| cols.as_slice())
    }
}

/// Records for a field value, map key or collection element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueRecord {
    /// Value columns, or the foreign key columns of a relation.
    pub base: MappingRecord,
    /// Restrict related-object joins by class.
    pub use_class_criteria: bool,
    /// Overrides for an embedded value's own fields.
    pub embedded: Option<Box<ClassRecordSet>>,
}

impl ValueRecord {
    /// Add a column.
    pub fn with_column(mut self, column: ColumnTemplate) -> Self {
        self.base.columns.push(column);
        self
    }

    /// Set embedded overrides.
    pub fn with_embedded(mut self, records: ClassRecordSet) -> Self {
        self.embedded = Some(Box::new(records));
        self
    }

    /// Fill what this record leaves open from another record.
    pub fn copy_from(&mut self, other: &ValueRecord) {
        self.base.copy_from(&other.base);
        self.use_class_criteria |= other.use_class_criteria;
        match (&mut self.embedded, &other.embedded) {
            (Some(own), Some(theirs)) => own.copy_from(theirs),
            (None, Some(theirs)) => self.embedded = Some(theirs.clone()),
            _ => {}
        }
    }
}

/// Records for a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRecord {
    /// Strategy name and the columns joining a join or secondary table to
    /// the owner.
    pub base: MappingRecord,
    /// Join table, or a secondary table of the owner.
    pub table: Option<String>,
    /// Load with an outer join.
    pub outer_join: bool,
    /// Order column.
    pub order_column: Hint<ColumnTemplate>,
    /// Null-indicator column of an embedded value.
    pub null_indicator: Hint<ColumnTemplate>,
    /// Unique constraints over join table columns.
    pub join_table_uniques: Vec<UniqueTemplate>,
    /// The field value.
    pub value: ValueRecord,
    /// Map key.
    pub key: ValueRecord,
    /// Collection element or map value.
    pub element: ValueRecord,
}

impl FieldRecord {
    /// Set the strategy.
    pub fn with_strategy(mut self, name: impl Into<String>) -> Self {
        self.base.strategy = Some(name.into());
        self
    }

    /// Set the table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add a value column.
    pub fn with_column(mut self, column: ColumnTemplate) -> Self {
        self.value.base.columns.push(column);
        self
    }

    /// Add a join column.
    pub fn with_join_column(mut self, column: ColumnTemplate) -> Self {
        self.base.columns.push(column);
        self
    }

    /// Set the value record.
    pub fn with_value(mut self, value: ValueRecord) -> Self {
        self.value = value;
        self
    }

    /// Set the element record.
    pub fn with_element(mut self, element: ValueRecord) -> Self {
        self.element = element;
        self
    }

    /// Set the key record.
    pub fn with_key(mut self, key: ValueRecord) -> Self {
        self.key = key;
        self
    }

    /// Set the order column hint.
    pub fn with_order_column(mut self, hint: Hint<ColumnTemplate>) -> Self {
        self.order_column = hint;
        self
    }

    /// Fill what this record leaves open from another record.
    pub fn copy_from(&mut self, other: &FieldRecord) {
        self.base.copy_from(&other.base);
        if self.table.is_none() {
            self.table.clone_from(&other.table);
        }
        self.outer_join |= other.outer_join;
        self.order_column.fill_from(&other.order_column);
        self.null_indicator.fill_from(&other.null_indicator);
        if self.join_table_uniques.is_empty() {
            self.join_table_uniques = other.join_table_uniques.clone();
        }
        self.value.copy_from(&other.value);
        self.key.copy_from(&other.key);
        self.element.copy_from(&other.element);
    }
}

/// Records for a version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionRecord {
    /// Strategy name and version columns.
    pub base: MappingRecord,
}

/// Records for a discriminator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscriminatorRecord {
    /// Strategy name and discriminator columns.
    pub base: MappingRecord,
    /// Value identifying this class.
    pub value: Option<String>,
}

/// Field records keyed by field name.
pub type FieldRecordSet = BTreeMap<String, FieldRecord>;

/// Every record for one class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassRecordSet {
    /// Class record.
    pub class: ClassRecord,
    /// Version record.
    pub version: VersionRecord,
    /// Discriminator record.
    pub discriminator: DiscriminatorRecord,
    /// Field records.
    pub fields: FieldRecordSet,
}

impl ClassRecordSet {
    /// Empty records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the class record.
    pub fn with_class(mut self, class: ClassRecord) -> Self {
        self.class = class;
        self
    }

    /// Set a field record.
    pub fn with_field(mut self, name: impl Into<String>, record: FieldRecord) -> Self {
        self.fields.insert(name.into(), record);
        self
    }

    /// Set the version record.
    pub fn with_version(mut self, version: VersionRecord) -> Self {
        self.version = version;
        self
    }

    /// Set the discriminator record.
    pub fn with_discriminator(mut self, discriminator: DiscriminatorRecord) -> Self {
        self.discriminator = discriminator;
        self
    }

    /// Record of a field, if any.
    pub fn field(&self, name: &str) -> Option<&FieldRecord> {
        self.fields.get(name)
    }

    /// Record of a field, or an empty one.
    pub fn field_or_default(&self, name: &str) -> FieldRecord {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// Fill what these records leave open from other records.
    pub fn copy_from(&mut self, other: &ClassRecordSet) {
        let class = &mut self.class;
        class.base.copy_from(&other.class.base);
        if class.table.is_none() {
            class.table.clone_from(&other.class.table);
        }
        if class.schema.is_none() {
            class.schema.clone_from(&other.class.schema);
        }
        if class.hierarchy_strategy.is_none() {
            class
                .hierarchy_strategy
                .clone_from(&other.class.hierarchy_strategy);
        }
        for (table, join) in &other.class.secondary_tables {
            class
                .secondary_tables
                .entry(table.clone())
                .or_insert_with(|| join.clone());
        }
        if class.uniques.is_empty() {
            class.uniques = other.class.uniques.clone();
        }
        if class.primary_key_name.is_none() {
            class
                .primary_key_name
                .clone_from(&other.class.primary_key_name);
        }
        self.version.base.copy_from(&other.version.base);
        self.discriminator.base.copy_from(&other.discriminator.base);
        if self.discriminator.value.is_none() {
            self.discriminator
                .value
                .clone_from(&other.discriminator.value);
        }
        for (name, record) in &other.fields {
            self.fields
                .entry(name.clone())
                .or_default()
                .copy_from(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secondary_join_lookup() {
        let record = ClassRecord::default()
            .with_secondary_table("APP.DETAIL", [ColumnTemplate::new("OWNER_ID")]);
        assert_eq!(record.secondary_join("DETAIL").map(<[_]>::len), Some(1));
        assert!(record.secondary_join("OTHER").is_none());
    }

    #[test]
    fn test_override_wins_over_standalone() {
        let mut overrides = ClassRecordSet::new().with_field(
            "street",
            FieldRecord::default().with_column(ColumnTemplate::new("HOME_STREET")),
        );
        let standalone = ClassRecordSet::new()
            .with_class(ClassRecord::default().with_table("ADDRESS"))
            .with_field(
                "street",
                FieldRecord::default().with_column(ColumnTemplate::new("STREET").with_size(40)),
            )
            .with_field(
                "city",
                FieldRecord::default().with_column(ColumnTemplate::new("CITY")),
            );
        overrides.copy_from(&standalone);
        let street = &overrides.field("street").unwrap().value.base.columns[0];
        assert_eq!(street.name.as_deref(), Some("HOME_STREET"));
        assert_eq!(street.size, Some(40));
        assert!(overrides.field("city").is_some());
        assert_eq!(overrides.class.table.as_deref(), Some("ADDRESS"));
    }

    #[test]
    fn test_records_from_json() {
        let records: ClassRecordSet = serde_json::from_str(
            r#"{
                "class": {"table": "PEOPLE", "base": {"strategy": "full"}},
                "fields": {
                    "name": {"value": {"base": {"columns": [{"name": "FULL_NAME", "size": 80}]}}},
                    "nick": {"value": {"base": {"index": "forbidden"}}}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(records.class.table.as_deref(), Some("PEOPLE"));
        assert_eq!(records.class.base.strategy.as_deref(), Some("full"));
        assert!(records.field("nick").unwrap().value.base.index.is_forbidden());
    }
}
