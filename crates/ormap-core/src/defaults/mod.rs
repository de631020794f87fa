//! Defaults policy: names, strategies and constraints used when the records
//! leave them out.
//!
//! The merge engine and the strategies ask a [`MappingDefaults`] for every
//! default they need. [`StandardDefaults`] is the built-in policy; callers
//! may install their own.

mod standard;

pub use standard::StandardDefaults;

use crate::model::{ClassDef, ValueDef};
use crate::raw::{ColumnTemplate, ForeignKeyTemplate, IndexTemplate, UniqueTemplate};
use ormap_schema::{ColumnId, DbDictionary, SchemaGroup, TableId, TypeCode};
use std::fmt;

/// Read-only view of the schema a defaults policy names things against.
#[derive(Clone, Copy)]
pub struct NamingScope<'a> {
    /// Schema being merged into.
    pub group: &'a SchemaGroup,
    /// Platform rules.
    pub dict: &'a DbDictionary,
}

impl<'a> NamingScope<'a> {
    /// Create a scope.
    pub fn new(group: &'a SchemaGroup, dict: &'a DbDictionary) -> Self {
        Self { group, dict }
    }
}

/// What a group of columns is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole<'a> {
    /// Datastore identity.
    DatastoreId,
    /// Version.
    Version,
    /// Discriminator.
    Discriminator,
    /// A field value, key or element.
    Value {
        /// Value name.
        name: &'a str,
    },
    /// Order column of a container field.
    Order {
        /// Field name.
        field: &'a str,
        /// The field keeps insertion order.
        ordered: bool,
    },
    /// Null indicator of an embedded value.
    NullIndicator {
        /// Field name.
        field: &'a str,
    },
}

/// What a join column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRole<'a> {
    /// Subclass table joined to its superclass table.
    Class,
    /// Secondary or join table joined to its owner.
    Field,
    /// Relation foreign key named after a value.
    ForeignKey {
        /// Value name.
        name: &'a str,
        /// The key lives in the related table.
        inverse: bool,
    },
}

/// What an index is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRole<'a> {
    /// Join columns of a field.
    Join {
        /// The join has a logical (unenforced) foreign key.
        logical_fk: bool,
    },
    /// Columns of a value.
    Value {
        /// Value name.
        name: &'a str,
        /// The value has a logical foreign key.
        logical_fk: bool,
    },
    /// Version columns.
    Version,
    /// Discriminator columns.
    Discriminator,
}

/// Pluggable defaults policy.
pub trait MappingDefaults: Send + Sync + fmt::Debug {
    /// Whether missing information may be invented.
    fn default_missing_info(&self) -> bool;

    /// Whether related-object joins are restricted by class.
    fn use_class_criteria(&self) -> bool {
        false
    }

    /// Whether mappings beyond the defaults (such as a unidirectional
    /// one-to-many through the element table) are allowed.
    fn allow_non_default_mappings(&self) -> bool {
        false
    }

    /// Default class strategy name.
    fn class_strategy(&self, class: &ClassDef, mapped_superclass: bool, adapt: bool)
        -> Option<String>;

    /// Default version strategy name.
    fn version_strategy(&self, class: &ClassDef, joinable_superclass: bool, adapt: bool)
        -> Option<String>;

    /// Default discriminator strategy name.
    fn discriminator_strategy(
        &self,
        class: &ClassDef,
        joinable_superclass: bool,
        has_value: bool,
        adapt: bool,
    ) -> Option<String>;

    /// Default strategy or handler name for a value. `related_mapped` tells
    /// whether a relation's target class is mapped.
    fn value_strategy(&self, value: &ValueDef, related_mapped: Option<bool>) -> Option<String>;

    /// Default discriminator value for a class.
    fn discriminator_value(&self, class: &ClassDef, code: TypeCode, adapt: bool) -> Option<String>;

    /// Default table name for a class.
    fn table_name(&self, class: &ClassDef, schema: Option<&str>, scope: NamingScope<'_>) -> String;

    /// Default join table name for a field.
    fn join_table_name(
        &self,
        owner_table: Option<&str>,
        field: &str,
        schema: Option<&str>,
        scope: NamingScope<'_>,
    ) -> String;

    /// Name the columns of a role. Returns whether the role wants its
    /// columns at all (meaningful for order and null-indicator columns).
    fn populate_columns(
        &self,
        role: ColumnRole<'_>,
        table: TableId,
        templates: &mut [ColumnTemplate],
        scope: NamingScope<'_>,
    ) -> bool;

    /// Name one join column. `target` is the name of the joined column.
    #[allow(clippy::too_many_arguments)]
    fn populate_join_column(
        &self,
        role: JoinRole<'_>,
        target: Option<&str>,
        position: usize,
        count: usize,
        table: TableId,
        template: &mut ColumnTemplate,
        scope: NamingScope<'_>,
    );

    /// Foreign key for a join to an owner or superclass table.
    fn join_foreign_key(&self, local: TableId, foreign: TableId) -> Option<ForeignKeyTemplate>;

    /// Foreign key for a relation.
    fn foreign_key(
        &self,
        name: &str,
        local: TableId,
        foreign: TableId,
        inverse: bool,
    ) -> Option<ForeignKeyTemplate>;

    /// Index over mapped columns.
    fn index(
        &self,
        role: IndexRole<'_>,
        table: TableId,
        columns: &[ColumnId],
        scope: NamingScope<'_>,
    ) -> Option<IndexTemplate>;

    /// Unique constraint over mapped columns.
    fn unique(&self, _table: TableId, _columns: &[ColumnId]) -> Option<UniqueTemplate> {
        None
    }

    /// Primary key constraint name for a class table.
    fn primary_key_name(
        &self,
        _class: &ClassDef,
        _table: TableId,
        _scope: NamingScope<'_>,
    ) -> Option<String> {
        None
    }
}
