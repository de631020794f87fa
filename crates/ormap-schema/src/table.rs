//! Tables.

use crate::column::ColumnId;
use crate::constraint::{ForeignKeyId, IndexId, PrimaryKey, UniqueId};
use crate::identifier::{Identifier, TablePath};
use serde::{Deserialize, Serialize};

/// Arena key of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(pub(crate) u32);

impl TableId {
    /// Raw index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A table and the keys of everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Arena key.
    pub id: TableId,
    /// Owning schema.
    pub schema: Option<String>,
    /// Table name.
    pub name: Identifier,
    /// Primary key.
    pub primary_key: Option<PrimaryKey>,
    /// Created while resolving mappings rather than supplied up front.
    pub created: bool,
    pub(crate) columns: Vec<ColumnId>,
    pub(crate) foreign_keys: Vec<ForeignKeyId>,
    pub(crate) indexes: Vec<IndexId>,
    pub(crate) uniques: Vec<UniqueId>,
    pub(crate) refs: u32,
}

impl Table {
    pub(crate) fn new(id: TableId, schema: Option<String>, name: Identifier) -> Self {
        Self {
            id,
            schema,
            name,
            primary_key: None,
            created: false,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            uniques: Vec::new(),
            refs: 0,
        }
    }

    /// `schema.table`, or the bare name when unqualified.
    pub fn full_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.to_string(),
        }
    }

    /// Path naming this table.
    pub fn path(&self) -> TablePath {
        TablePath {
            schema: self.schema.clone(),
            name: self.name.to_string(),
        }
    }

    /// Whether `name` names this table, bare or schema-qualified.
    pub fn is_named(&self, name: &str) -> bool {
        let path = TablePath::parse(name);
        if !self.name.matches(&path.name) {
            return false;
        }
        match (&path.schema, &self.schema) {
            (Some(given), Some(own)) => Identifier::new(given.as_str()).matches(own),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    /// Foreign keys declared on this table.
    pub fn foreign_keys(&self) -> &[ForeignKeyId] {
        &self.foreign_keys
    }

    /// Indexes on this table.
    pub fn indexes(&self) -> &[IndexId] {
        &self.indexes
    }

    /// Unique constraints on this table.
    pub fn uniques(&self) -> &[UniqueId] {
        &self.uniques
    }

    /// Primary key columns, empty without a key.
    pub fn primary_key_columns(&self) -> &[ColumnId] {
        self.primary_key
            .as_ref()
            .map(|pk| pk.columns.as_slice())
            .unwrap_or(&[])
    }

    /// Number of live references from resolved mappings.
    pub fn ref_count(&self) -> u32 {
        self.refs
    }
}
