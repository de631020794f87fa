//! The schema group: an arena owning every table, column and constraint.
//!
//! Components are addressed by integer keys assigned at creation. Keys are
//! never reused; removing a component leaves an empty slot behind so stale
//! keys can be detected with the `try_*` accessors.

use crate::column::{Column, ColumnId};
use crate::constraint::{ForeignKey, ForeignKeyId, Index, IndexId, PrimaryKey, Unique, UniqueId};
use crate::error::{Error, Result};
use crate::identifier::{ColumnPath, Identifier, TablePath};
use crate::table::{Table, TableId};
use crate::types::SqlType;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Components removed by an unused-component sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Removed tables.
    pub tables: Vec<String>,
    /// Removed columns, `TABLE.COLUMN`.
    pub columns: Vec<String>,
    /// Removed foreign keys.
    pub foreign_keys: Vec<String>,
    /// Removed indexes.
    pub indexes: Vec<String>,
    /// Removed unique constraints.
    pub uniques: Vec<String>,
}

impl SweepReport {
    /// Nothing was removed.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Number of removed components.
    pub fn total(&self) -> usize {
        self.tables.len()
            + self.columns.len()
            + self.foreign_keys.len()
            + self.indexes.len()
            + self.uniques.len()
    }
}

/// All schemas known to a mapping run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaGroup {
    default_schema: Option<String>,
    tables: Vec<Option<Table>>,
    columns: Vec<Option<Column>>,
    foreign_keys: Vec<Option<ForeignKey>>,
    indexes: Vec<Option<Index>>,
    uniques: Vec<Option<Unique>>,
}

impl SchemaGroup {
    /// Create an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the schema used for unqualified table names.
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    /// Schema used for unqualified table names.
    pub fn default_schema(&self) -> Option<&str> {
        self.default_schema.as_deref()
    }

    // Tables

    /// Add a table, returning the existing one if the exact path is already present.
    pub fn add_table(&mut self, schema: Option<&str>, name: &str) -> TableId {
        let schema = schema
            .map(str::to_string)
            .or_else(|| self.default_schema.clone());
        let existing = self.tables().find(|t| {
            t.name.matches(name) && schemas_match(t.schema.as_deref(), schema.as_deref())
        });
        if let Some(table) = existing {
            return table.id;
        }
        let id = TableId(self.tables.len() as u32);
        debug!(table = %name, schema = ?schema, "adding table");
        self.tables
            .push(Some(Table::new(id, schema, Identifier::new(name))));
        id
    }

    /// Find a table by path. Unqualified paths prefer the default schema.
    pub fn find_table(&self, path: &TablePath) -> Option<TableId> {
        if path.is_empty() {
            return None;
        }
        let mut candidates = self.tables().filter(|t| t.name.matches(&path.name));
        match &path.schema {
            Some(schema) => candidates
                .find(|t| {
                    schemas_match(t.schema.as_deref(), Some(schema))
                        || (t.schema.is_none()
                            && self
                                .default_schema
                                .as_deref()
                                .is_some_and(|d| Identifier::new(d).matches(schema)))
                })
                .map(|t| t.id),
            None => {
                let all: Vec<&Table> = candidates.collect();
                all.iter()
                    .find(|t| schemas_match(t.schema.as_deref(), self.default_schema.as_deref()))
                    .or_else(|| all.first())
                    .map(|t| t.id)
            }
        }
    }

    /// Find a table by `table` or `schema.table`.
    pub fn find_table_by_name(&self, name: &str) -> Option<TableId> {
        self.find_table(&TablePath::parse(name))
    }

    /// Table by key.
    ///
    /// # Panics
    ///
    /// Panics if the key was never issued or the table was removed.
    pub fn table(&self, id: TableId) -> &Table {
        self.try_table(id).expect("invalid table id")
    }

    /// Mutable table by key.
    ///
    /// # Panics
    ///
    /// Panics if the key was never issued or the table was removed.
    pub fn table_mut(&mut self, id: TableId) -> &mut Table {
        self.tables
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .expect("invalid table id")
    }

    /// Table by key, if live.
    pub fn try_table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id.index()).and_then(Option::as_ref)
    }

    /// Live tables.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().flatten()
    }

    /// Remove a table and everything it owns.
    pub fn remove_table(&mut self, id: TableId) -> Option<Table> {
        let table = self.tables.get_mut(id.index())?.take()?;
        for fk in &table.foreign_keys {
            self.foreign_keys[fk.0 as usize] = None;
        }
        for idx in &table.indexes {
            self.indexes[idx.0 as usize] = None;
        }
        for unq in &table.uniques {
            self.uniques[unq.0 as usize] = None;
        }
        for col in &table.columns {
            self.columns[col.index()] = None;
        }
        Some(table)
    }

    // Columns

    /// Add a column, returning the existing one if the name is already present.
    pub fn add_column(&mut self, table: TableId, name: &str) -> ColumnId {
        if let Some(existing) = self.find_column(table, name) {
            return existing;
        }
        let id = ColumnId(self.columns.len() as u32);
        self.columns
            .push(Some(Column::new(id, table, Identifier::new(name))));
        self.table_mut(table).columns.push(id);
        id
    }

    /// Add a column with a SQL type.
    pub fn add_typed_column(&mut self, table: TableId, name: &str, sql_type: SqlType) -> ColumnId {
        let id = self.add_column(table, name);
        self.column_mut(id).sql_type = sql_type;
        id
    }

    /// Find a column of a table by name.
    pub fn find_column(&self, table: TableId, name: &str) -> Option<ColumnId> {
        let wanted = Identifier::new(name);
        self.try_table(table)?
            .columns
            .iter()
            .copied()
            .find(|c| self.column(*c).name == wanted)
    }

    /// Resolve a `TABLE.COLUMN` path.
    pub fn lookup_column(&self, path: &str) -> Result<ColumnId> {
        let path = ColumnPath::parse(path);
        let table_path = path
            .table
            .clone()
            .ok_or_else(|| Error::UnknownTable(path.to_string()))?;
        let table = self
            .find_table(&table_path)
            .ok_or_else(|| Error::UnknownTable(table_path.to_string()))?;
        self.find_column(table, &path.name)
            .ok_or_else(|| Error::UnknownColumn {
                table: table_path.to_string(),
                column: path.name.clone(),
            })
    }

    /// Column by key.
    ///
    /// # Panics
    ///
    /// Panics if the key was never issued or the column was removed.
    pub fn column(&self, id: ColumnId) -> &Column {
        self.try_column(id).expect("invalid column id")
    }

    /// Mutable column by key.
    ///
    /// # Panics
    ///
    /// Panics if the key was never issued or the column was removed.
    pub fn column_mut(&mut self, id: ColumnId) -> &mut Column {
        self.columns
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .expect("invalid column id")
    }

    /// Column by key, if live.
    pub fn try_column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(id.index()).and_then(Option::as_ref)
    }

    /// `TABLE.COLUMN` for diagnostics.
    pub fn column_name(&self, id: ColumnId) -> String {
        match self.try_column(id) {
            Some(col) => format!("{}.{}", self.table(col.table).full_name(), col.name),
            None => format!("<removed column {}>", id.index()),
        }
    }

    /// Bare names of a list of columns.
    pub fn column_names(&self, ids: &[ColumnId]) -> Vec<String> {
        ids.iter()
            .map(|id| self.column(*id).name.to_string())
            .collect()
    }

    /// Remove a column from its table.
    pub fn remove_column(&mut self, id: ColumnId) -> Option<Column> {
        let column = self.columns.get_mut(id.index())?.take()?;
        if let Some(Some(table)) = self.tables.get_mut(column.table.index()) {
            table.columns.retain(|c| *c != id);
            if let Some(pk) = table.primary_key.as_mut() {
                pk.columns.retain(|c| *c != id);
            }
        }
        Some(column)
    }

    // Primary keys

    /// Install a primary key, flagging its columns.
    pub fn set_primary_key(&mut self, table: TableId, pk: PrimaryKey) {
        let old: Vec<ColumnId> = self.table(table).primary_key_columns().to_vec();
        for col in old {
            self.column_mut(col).primary_key = false;
        }
        for col in &pk.columns {
            self.column_mut(*col).primary_key = true;
        }
        self.table_mut(table).primary_key = Some(pk);
    }

    /// Append a column to an existing primary key. Returns false without a key.
    pub fn add_primary_key_column(&mut self, table: TableId, column: ColumnId) -> bool {
        let added = match self.table_mut(table).primary_key.as_mut() {
            Some(pk) => {
                if !pk.columns.contains(&column) {
                    pk.columns.push(column);
                }
                true
            }
            None => false,
        };
        if added {
            self.column_mut(column).primary_key = true;
        }
        added
    }

    /// Primary key columns of a table.
    pub fn primary_key_columns(&self, table: TableId) -> &[ColumnId] {
        self.table(table).primary_key_columns()
    }

    // Foreign keys

    /// Add an empty foreign key to a table.
    pub fn add_foreign_key(&mut self, table: TableId, name: Option<&str>) -> ForeignKeyId {
        let id = ForeignKeyId(self.foreign_keys.len() as u32);
        self.foreign_keys
            .push(Some(ForeignKey::new(id, table, name.map(Identifier::new))));
        self.table_mut(table).foreign_keys.push(id);
        id
    }

    /// Foreign key by key.
    ///
    /// # Panics
    ///
    /// Panics if the key was never issued or the foreign key was removed.
    pub fn foreign_key(&self, id: ForeignKeyId) -> &ForeignKey {
        self.try_foreign_key(id).expect("invalid foreign key id")
    }

    /// Mutable foreign key by key.
    ///
    /// # Panics
    ///
    /// Panics if the key was never issued or the foreign key was removed.
    pub fn foreign_key_mut(&mut self, id: ForeignKeyId) -> &mut ForeignKey {
        self.foreign_keys
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .expect("invalid foreign key id")
    }

    /// Foreign key by key, if live.
    pub fn try_foreign_key(&self, id: ForeignKeyId) -> Option<&ForeignKey> {
        self.foreign_keys.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Remove a foreign key.
    pub fn remove_foreign_key(&mut self, id: ForeignKeyId) -> Option<ForeignKey> {
        let fk = self.foreign_keys.get_mut(id.0 as usize)?.take()?;
        if let Some(Some(table)) = self.tables.get_mut(fk.table.index()) {
            table.foreign_keys.retain(|f| *f != id);
        }
        Some(fk)
    }

    /// Table referenced by a foreign key.
    pub fn foreign_key_target_table(&self, id: ForeignKeyId) -> Option<TableId> {
        let fk = self.try_foreign_key(id)?;
        fk.pk_columns()
            .first()
            .or_else(|| fk.constant_pk_columns().first().map(|(c, _)| c))
            .and_then(|c| self.try_column(*c))
            .map(|c| c.table)
    }

    // Indexes and unique constraints

    /// Add an index to a table.
    pub fn add_index(&mut self, table: TableId, name: &str) -> IndexId {
        let id = IndexId(self.indexes.len() as u32);
        self.indexes.push(Some(Index {
            id,
            table,
            name: Identifier::new(name),
            columns: Vec::new(),
            unique: false,
            refs: 0,
        }));
        self.table_mut(table).indexes.push(id);
        id
    }

    /// Index by key.
    ///
    /// # Panics
    ///
    /// Panics if the key was never issued or the index was removed.
    pub fn index(&self, id: IndexId) -> &Index {
        self.indexes
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .expect("invalid index id")
    }

    /// Mutable index by key.
    ///
    /// # Panics
    ///
    /// Panics if the key was never issued or the index was removed.
    pub fn index_mut(&mut self, id: IndexId) -> &mut Index {
        self.indexes
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .expect("invalid index id")
    }

    /// Remove an index.
    pub fn remove_index(&mut self, id: IndexId) -> Option<Index> {
        let index = self.indexes.get_mut(id.0 as usize)?.take()?;
        if let Some(Some(table)) = self.tables.get_mut(index.table.index()) {
            table.indexes.retain(|i| *i != id);
        }
        Some(index)
    }

    /// Whether an index name is used anywhere in the given schema.
    pub fn index_name_taken(&self, schema: Option<&str>, name: &str) -> bool {
        self.indexes.iter().flatten().any(|i| {
            i.name.matches(name)
                && schemas_match(self.table(i.table).schema.as_deref(), schema)
        })
    }

    /// Add a unique constraint to a table.
    pub fn add_unique(&mut self, table: TableId, name: Option<&str>) -> UniqueId {
        let id = UniqueId(self.uniques.len() as u32);
        self.uniques.push(Some(Unique {
            id,
            table,
            name: name.map(Identifier::new),
            columns: Vec::new(),
            deferred: false,
            refs: 0,
        }));
        self.table_mut(table).uniques.push(id);
        id
    }

    /// Unique constraint by key.
    ///
    /// # Panics
    ///
    /// Panics if the key was never issued or the constraint was removed.
    pub fn unique(&self, id: UniqueId) -> &Unique {
        self.uniques
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .expect("invalid unique id")
    }

    /// Mutable unique constraint by key.
    ///
    /// # Panics
    ///
    /// Panics if the key was never issued or the constraint was removed.
    pub fn unique_mut(&mut self, id: UniqueId) -> &mut Unique {
        self.uniques
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .expect("invalid unique id")
    }

    /// Remove a unique constraint.
    pub fn remove_unique(&mut self, id: UniqueId) -> Option<Unique> {
        let unique = self.uniques.get_mut(id.0 as usize)?.take()?;
        if let Some(Some(table)) = self.tables.get_mut(unique.table.index()) {
            table.uniques.retain(|u| *u != id);
        }
        Some(unique)
    }

    /// Whether a constraint name (foreign key or unique) is used in the given schema.
    pub fn constraint_name_taken(&self, schema: Option<&str>, name: &str) -> bool {
        let in_schema = |table: TableId| schemas_match(self.table(table).schema.as_deref(), schema);
        self.foreign_keys
            .iter()
            .flatten()
            .any(|f| f.name.as_ref().is_some_and(|n| n.matches(name)) && in_schema(f.table))
            || self
                .uniques
                .iter()
                .flatten()
                .any(|u| u.name.as_ref().is_some_and(|n| n.matches(name)) && in_schema(u.table))
    }

    // Reference counting

    /// Reset every reference count to zero.
    pub fn clear_refs(&mut self) {
        for table in self.tables.iter_mut().flatten() {
            table.refs = 0;
        }
        for col in self.columns.iter_mut().flatten() {
            col.refs = 0;
        }
        for fk in self.foreign_keys.iter_mut().flatten() {
            fk.refs = 0;
        }
        for idx in self.indexes.iter_mut().flatten() {
            idx.refs = 0;
        }
        for unq in self.uniques.iter_mut().flatten() {
            unq.refs = 0;
        }
    }

    /// Count a use of a table.
    pub fn ref_table(&mut self, id: TableId) {
        self.table_mut(id).refs += 1;
    }

    /// Count a use of a column and its table.
    pub fn ref_column(&mut self, id: ColumnId) {
        let table = {
            let col = self.column_mut(id);
            col.refs += 1;
            col.table
        };
        self.ref_table(table);
    }

    /// Count a use of a foreign key and all columns on both sides.
    pub fn ref_foreign_key(&mut self, id: ForeignKeyId) {
        let fk = self.foreign_key_mut(id);
        fk.refs += 1;
        let cols: Vec<ColumnId> = fk
            .columns()
            .iter()
            .chain(fk.pk_columns())
            .copied()
            .chain(fk.constant_columns().iter().map(|(c, _)| *c))
            .chain(fk.constant_pk_columns().iter().map(|(c, _)| *c))
            .collect();
        for col in cols {
            self.ref_column(col);
        }
    }

    /// Count a use of an index and its columns.
    pub fn ref_index(&mut self, id: IndexId) {
        let index = self.index_mut(id);
        index.refs += 1;
        let cols = index.columns.clone();
        for col in cols {
            self.ref_column(col);
        }
    }

    /// Count a use of a unique constraint and its columns.
    pub fn ref_unique(&mut self, id: UniqueId) {
        let unique = self.unique_mut(id);
        unique.refs += 1;
        let cols = unique.columns.clone();
        for col in cols {
            self.ref_column(col);
        }
    }

    /// Remove everything no resolved mapping references.
    ///
    /// Within referenced tables, unreferenced constraints and columns are
    /// dropped; primary key columns and columns still used by a surviving
    /// constraint are kept. Unreferenced tables are dropped only if they were
    /// created during resolution and no surviving key points at them.
    pub fn sweep_unreferenced(&mut self) -> SweepReport {
        let mut report = SweepReport::default();
        let referenced: Vec<TableId> = self
            .tables()
            .filter(|t| t.refs > 0)
            .map(|t| t.id)
            .collect();

        for table in &referenced {
            let t = self.table(*table);
            let dead_fks: Vec<ForeignKeyId> = t
                .foreign_keys
                .iter()
                .copied()
                .filter(|f| self.foreign_key(*f).refs == 0)
                .collect();
            let dead_indexes: Vec<IndexId> = t
                .indexes
                .iter()
                .copied()
                .filter(|i| self.index(*i).refs == 0)
                .collect();
            let dead_uniques: Vec<UniqueId> = t
                .uniques
                .iter()
                .copied()
                .filter(|u| self.unique(*u).refs == 0)
                .collect();
            for fk in dead_fks {
                if let Some(fk) = self.remove_foreign_key(fk) {
                    report.foreign_keys.push(constraint_label(fk.name.as_ref(), fk.id.0));
                }
            }
            for idx in dead_indexes {
                if let Some(idx) = self.remove_index(idx) {
                    report.indexes.push(idx.name.to_string());
                }
            }
            for unq in dead_uniques {
                if let Some(unq) = self.remove_unique(unq) {
                    report.uniques.push(constraint_label(unq.name.as_ref(), unq.id.0));
                }
            }
        }

        let in_use = self.constrained_columns();
        for table in &referenced {
            let dead_cols: Vec<ColumnId> = self
                .table(*table)
                .columns
                .iter()
                .copied()
                .filter(|c| {
                    let col = self.column(*c);
                    col.refs == 0 && !col.primary_key && !in_use.contains(c)
                })
                .collect();
            for col in dead_cols {
                let name = self.column_name(col);
                if self.remove_column(col).is_some() {
                    report.columns.push(name);
                }
            }
        }

        let in_use = self.constrained_columns();
        let dead_tables: Vec<TableId> = self
            .tables()
            .filter(|t| t.refs == 0 && t.created)
            .filter(|t| !t.columns.iter().any(|c| in_use.contains(c)))
            .map(|t| t.id)
            .collect();
        for table in dead_tables {
            if let Some(t) = self.remove_table(table) {
                report.tables.push(t.full_name());
            }
        }

        debug!(removed = report.total(), "swept unreferenced schema components");
        report
    }

    /// Columns named by any live foreign key (either side), index or unique.
    fn constrained_columns(&self) -> Vec<ColumnId> {
        let mut cols = Vec::new();
        for fk in self.foreign_keys.iter().flatten() {
            cols.extend_from_slice(fk.columns());
            cols.extend_from_slice(fk.pk_columns());
            cols.extend(fk.constant_columns().iter().map(|(c, _)| *c));
            cols.extend(fk.constant_pk_columns().iter().map(|(c, _)| *c));
        }
        for idx in self.indexes.iter().flatten() {
            cols.extend_from_slice(&idx.columns);
        }
        for unq in self.uniques.iter().flatten() {
            cols.extend_from_slice(&unq.columns);
        }
        cols
    }
}

fn schemas_match(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Identifier::new(a) == Identifier::new(b),
        (None, None) => true,
        _ => false,
    }
}

fn constraint_label(name: Option<&Identifier>, id: u32) -> String {
    name.map(|n| n.to_string())
        .unwrap_or_else(|| format!("<unnamed {}>", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_group() -> (SchemaGroup, TableId, ColumnId, ColumnId) {
        let mut group = SchemaGroup::new();
        let person = group.add_table(None, "PERSON");
        let id = group.add_typed_column(person, "ID", SqlType::BigInt);
        let name = group.add_typed_column(person, "NAME", SqlType::Varchar);
        group.set_primary_key(person, PrimaryKey::new(vec![id]));
        (group, person, id, name)
    }

    #[test]
    fn test_add_table_is_idempotent() {
        let (mut group, person, _, _) = person_group();
        assert_eq!(group.add_table(None, "person"), person);
        let other = group.add_table(Some("HR"), "PERSON");
        assert_ne!(other, person);
        assert_eq!(group.tables().count(), 2);
    }

    #[test]
    fn test_find_table_prefers_default_schema() {
        let mut group = SchemaGroup::new().with_default_schema("APP");
        let hr = group.add_table(Some("HR"), "PERSON");
        let app = group.add_table(None, "PERSON");
        assert_eq!(group.find_table_by_name("PERSON"), Some(app));
        assert_eq!(group.find_table_by_name("HR.PERSON"), Some(hr));
        assert_eq!(group.find_table_by_name("APP.PERSON"), Some(app));
        assert_eq!(group.find_table_by_name("MISSING"), None);
    }

    #[test]
    fn test_columns_and_primary_key() {
        let (group, person, id, name) = person_group();
        assert_eq!(group.find_column(person, "name"), Some(name));
        assert!(group.column(id).primary_key);
        assert_eq!(group.primary_key_columns(person), &[id]);
        assert_eq!(group.lookup_column("PERSON.ID").unwrap(), id);
        assert!(matches!(
            group.lookup_column("PERSON.NOPE"),
            Err(Error::UnknownColumn { .. })
        ));
        assert_eq!(group.column_name(name), "PERSON.NAME");
    }

    #[test]
    fn test_foreign_key_target_table() {
        let (mut group, person, id, _) = person_group();
        let address = group.add_table(None, "ADDRESS");
        let owner = group.add_typed_column(address, "OWNER_ID", SqlType::BigInt);
        let fk = group.add_foreign_key(address, Some("FK_OWNER"));
        group.foreign_key_mut(fk).join(owner, id);
        assert_eq!(group.foreign_key_target_table(fk), Some(person));
        assert!(group.constraint_name_taken(None, "fk_owner"));
        assert_eq!(group.table(address).foreign_keys(), &[fk]);
    }

    #[test]
    fn test_sweep_removes_unreferenced_components() {
        let (mut group, person, id, name) = person_group();
        let nick = group.add_typed_column(person, "NICK", SqlType::Varchar);
        let idx = group.add_index(person, "I_NICK");
        group.index_mut(idx).columns.push(nick);
        let scratch = group.add_table(None, "SCRATCH");
        group.table_mut(scratch).created = true;
        group.add_column(scratch, "X");
        let legacy = group.add_table(None, "LEGACY");
        group.add_column(legacy, "Y");

        group.clear_refs();
        group.ref_column(id);
        group.ref_column(name);

        let report = group.sweep_unreferenced();
        assert_eq!(report.indexes, vec!["I_NICK".to_string()]);
        assert_eq!(report.columns, vec!["PERSON.NICK".to_string()]);
        assert_eq!(report.tables, vec!["SCRATCH".to_string()]);
        assert!(group.find_table_by_name("LEGACY").is_some());
        assert!(group.try_column(nick).is_none());
        assert!(group.try_table(scratch).is_none());
    }

    #[test]
    fn test_sweep_keeps_primary_key_columns() {
        let (mut group, person, id, _) = person_group();
        group.clear_refs();
        group.ref_table(person);
        let report = group.sweep_unreferenced();
        assert!(group.try_column(id).is_some());
        assert_eq!(report.columns, vec!["PERSON.NAME".to_string()]);
    }

    #[test]
    fn test_ref_foreign_key_counts_both_sides() {
        let (mut group, _, id, _) = person_group();
        let address = group.add_table(None, "ADDRESS");
        let owner = group.add_typed_column(address, "OWNER_ID", SqlType::BigInt);
        let fk = group.add_foreign_key(address, None);
        group.foreign_key_mut(fk).join(owner, id);
        group.ref_foreign_key(fk);
        assert_eq!(group.foreign_key(fk).ref_count(), 1);
        assert_eq!(group.column(owner).ref_count(), 1);
        assert_eq!(group.column(id).ref_count(), 1);
        assert_eq!(group.table(address).ref_count(), 1);
    }
}
