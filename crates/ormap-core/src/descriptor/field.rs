//! Field and value descriptors.

use super::{ClassId, FieldId};
use crate::model::{FieldDef, ValueDef};
use crate::raw::{ColumnTemplate, FieldRecord, JoinDirection, ValueRecord};
use crate::strategy::{FieldStrategy, ValueHandler};
use ormap_schema::{ColumnId, ForeignKeyId, IndexId, TableId, UniqueId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Insert/update permissions of a column list, by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnIo {
    uninsertable: BTreeSet<usize>,
    unupdatable: BTreeSet<usize>,
}

impl ColumnIo {
    /// Permissions taken from the flags of given column templates.
    pub fn from_templates<'a>(given: impl IntoIterator<Item = &'a ColumnTemplate>) -> Self {
        let mut io = Self::default();
        for (i, template) in given.into_iter().enumerate() {
            io.set_insertable(i, !template.uninsertable);
            io.set_updatable(i, !template.unupdatable);
        }
        io
    }

    /// Allow or forbid inserting the column at a position.
    pub fn set_insertable(&mut self, position: usize, insertable: bool) {
        if insertable {
            self.uninsertable.remove(&position);
        } else {
            self.uninsertable.insert(position);
        }
    }

    /// Allow or forbid updating the column at a position.
    pub fn set_updatable(&mut self, position: usize, updatable: bool) {
        if updatable {
            self.unupdatable.remove(&position);
        } else {
            self.unupdatable.insert(position);
        }
    }

    /// Whether the column at a position may be inserted.
    pub fn is_insertable(&self, position: usize) -> bool {
        !self.uninsertable.contains(&position)
    }

    /// Whether the column at a position may be updated.
    pub fn is_updatable(&self, position: usize) -> bool {
        !self.unupdatable.contains(&position)
    }

    /// Whether every column may be inserted and updated.
    pub fn is_default(&self) -> bool {
        self.uninsertable.is_empty() && self.unupdatable.is_empty()
    }
}

/// Which side of a bidirectional relation sharing a join table owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinTableRole {
    /// This side writes the join table.
    Owner,
    /// The other side writes the join table.
    NonOwner,
    /// Not part of a bidirectional join table.
    Neither,
}

/// Mapping of a field value, map key or collection element.
#[derive(Debug, Clone)]
pub struct ValueMapping {
    /// Name used for default column and index names.
    pub name: String,
    /// Declared type.
    pub def: ValueDef,
    /// User records.
    pub record: ValueRecord,
    /// Handler storing the value, if any.
    pub handler: Option<ValueHandler>,
    /// Related class of a relation value.
    pub related: Option<ClassId>,
    /// Descriptor of an embedded value.
    pub embedded: Option<ClassId>,
    /// Columns holding the value or the relation key.
    pub columns: Vec<ColumnId>,
    /// Key to the related table.
    pub foreign_key: Option<ForeignKeyId>,
    /// Side holding the key.
    pub join_direction: JoinDirection,
    /// Index over the columns.
    pub index: Option<IndexId>,
    /// Unique constraint over the columns.
    pub unique: Option<UniqueId>,
    /// Column permissions.
    pub io: ColumnIo,
}

impl ValueMapping {
    /// An unresolved value.
    pub fn new(name: impl Into<String>, def: ValueDef, record: ValueRecord) -> Self {
        Self {
            name: name.into(),
            def,
            record,
            handler: None,
            related: None,
            embedded: None,
            columns: Vec::new(),
            foreign_key: None,
            join_direction: JoinDirection::None,
            index: None,
            unique: None,
            io: ColumnIo::default(),
        }
    }

    /// Drop resolved attachments, keeping type, records and the embedded
    /// descriptor, which is cleared and reused on the next resolution.
    pub fn clear(&mut self) {
        self.handler = None;
        self.related = None;
        self.columns.clear();
        self.foreign_key = None;
        self.join_direction = JoinDirection::None;
        self.index = None;
        self.unique = None;
        self.io = ColumnIo::default();
    }
}

/// Mapping of one field of one class.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    /// Arena key.
    pub id: FieldId,
    /// Field name.
    pub name: String,
    /// Class this descriptor belongs to.
    pub defining: ClassId,
    /// Name of the class declaring the field; differs for inherited copies.
    pub declaring: String,
    /// Declared field.
    pub def: FieldDef,
    /// User records.
    pub record: FieldRecord,
    /// Resolved strategy.
    pub strategy: Option<FieldStrategy>,
    /// Table holding the field: the class table, a secondary table or a join table.
    pub table: Option<TableId>,
    /// Key joining a secondary or join table to the owner table.
    pub join_foreign_key: Option<ForeignKeyId>,
    /// Side holding the join key.
    pub join_direction: JoinDirection,
    /// Permissions of the join columns.
    pub join_io: ColumnIo,
    /// The field value.
    pub value: ValueMapping,
    /// Map key.
    pub key: Option<ValueMapping>,
    /// Collection element or map value.
    pub element: Option<ValueMapping>,
    /// Order column of a container.
    pub order_column: Option<ColumnId>,
    /// Null indicator of an embedded value.
    pub null_indicator: Option<ColumnId>,
    /// Unique constraints over join table columns.
    pub join_table_uniques: Vec<UniqueId>,
    /// Ownership of a shared join table, set at initialization.
    pub bidi: Option<JoinTableRole>,
    /// Whether bulk updates can set this field, set at initialization.
    pub bulk_update: Option<bool>,
    /// The relation key was built against an incomplete primary key.
    pub pending_foreign_key: bool,
}

impl FieldMapping {
    /// An unresolved field.
    pub fn new(
        id: FieldId,
        defining: ClassId,
        declaring: impl Into<String>,
        def: FieldDef,
        record: FieldRecord,
    ) -> Self {
        let value = ValueMapping::new(def.name.clone(), def.value.clone(), record.value.clone());
        let key = def
            .key
            .clone()
            .map(|k| ValueMapping::new("KEY", k, record.key.clone()));
        let element = def
            .element
            .clone()
            .map(|e| ValueMapping::new(def.name.clone(), e, record.element.clone()));
        Self {
            id,
            name: def.name.clone(),
            defining,
            declaring: declaring.into(),
            def,
            record,
            strategy: None,
            table: None,
            join_foreign_key: None,
            join_direction: JoinDirection::None,
            join_io: ColumnIo::default(),
            value,
            key,
            element,
            order_column: None,
            null_indicator: None,
            join_table_uniques: Vec::new(),
            bidi: None,
            bulk_update: None,
            pending_foreign_key: false,
        }
    }

    /// Whether a strategy has been installed.
    pub fn is_resolved(&self) -> bool {
        self.strategy.is_some()
    }

    /// Whether the field maps to nothing.
    pub fn is_unmapped(&self) -> bool {
        matches!(self.strategy, Some(FieldStrategy::None))
    }

    /// Columns that hold the field in its own table: the value columns for
    /// single-valued fields, the join columns for join-table fields.
    pub fn columns(&self) -> &[ColumnId] {
        &self.value.columns
    }

    /// Key, element and value mappings.
    pub fn values(&self) -> impl Iterator<Item = &ValueMapping> {
        std::iter::once(&self.value)
            .chain(self.key.as_ref())
            .chain(self.element.as_ref())
    }

    /// Drop resolved attachments.
    pub fn clear(&mut self) {
        self.strategy = None;
        self.table = None;
        self.join_foreign_key = None;
        self.join_direction = JoinDirection::None;
        self.join_io = ColumnIo::default();
        self.value.clear();
        if let Some(key) = self.key.as_mut() {
            key.clear();
        }
        if let Some(element) = self.element.as_mut() {
            element.clear();
        }
        self.order_column = None;
        self.null_indicator = None;
        self.join_table_uniques.clear();
        self.bidi = None;
        self.bulk_update = None;
        self.pending_foreign_key = false;
    }
}
