//! Foreign keys, indexes, unique constraints and primary keys.

use crate::column::ColumnId;
use crate::error::{Error, Result};
use crate::identifier::Identifier;
use crate::table::TableId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arena key of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForeignKeyId(pub(crate) u32);

/// Arena key of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexId(pub(crate) u32);

/// Arena key of a unique constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UniqueId(pub(crate) u32);

/// Referential action on delete or update.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FkAction {
    /// No physical action; the key exists in mapping metadata only.
    #[default]
    None,
    /// Reject the change while referencing rows exist.
    Restrict,
    /// Propagate the change to referencing rows.
    Cascade,
    /// Null out referencing columns.
    Null,
    /// Reset referencing columns to their defaults.
    Default,
}

impl FkAction {
    /// Parse an action name as written in mapping records.
    pub fn parse(name: &str) -> Option<FkAction> {
        match name.to_ascii_lowercase().as_str() {
            "none" => Some(FkAction::None),
            "restrict" | "exception" => Some(FkAction::Restrict),
            "cascade" => Some(FkAction::Cascade),
            "null" | "set-null" => Some(FkAction::Null),
            "default" | "set-default" => Some(FkAction::Default),
            _ => None,
        }
    }
}

impl fmt::Display for FkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FkAction::None => "none",
            FkAction::Restrict => "restrict",
            FkAction::Cascade => "cascade",
            FkAction::Null => "null",
            FkAction::Default => "default",
        };
        f.write_str(name)
    }
}

/// A constant on one side of a join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constant {
    /// SQL NULL.
    Null,
    /// Quoted string literal.
    Text(String),
    /// Integer literal.
    Int(i64),
    /// Floating point literal.
    Float(f64),
}

impl Constant {
    /// Parse a literal: `null`, `'text'`, or a number starting with `-`, `.` or a digit.
    pub fn parse(literal: &str) -> Result<Constant> {
        let invalid = || Error::InvalidConstant {
            literal: literal.to_string(),
        };
        if literal == "null" {
            return Ok(Constant::Null);
        }
        if let Some(inner) = literal.strip_prefix('\'') {
            return inner
                .strip_suffix('\'')
                .map(|s| Constant::Text(s.to_string()))
                .ok_or_else(invalid);
        }
        if Constant::looks_numeric(literal) {
            if literal.contains('.') || literal.contains(['e', 'E']) {
                return literal.parse::<f64>().map(Constant::Float).map_err(|_| invalid());
            }
            return literal.parse::<i64>().map(Constant::Int).map_err(|_| invalid());
        }
        Err(invalid())
    }

    /// Whether a target literal should be read as a constant rather than a column name.
    pub fn is_literal(target: &str) -> bool {
        target == "null" || target.starts_with('\'') || Constant::looks_numeric(target)
    }

    fn looks_numeric(s: &str) -> bool {
        s.starts_with(|c: char| c == '-' || c == '.' || c.is_ascii_digit())
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => f.write_str("null"),
            Constant::Text(s) => write!(f, "'{}'", s),
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Float(v) => write!(f, "{:?}", v),
        }
    }
}

/// A foreign key from columns of one table to columns of another (or the same) table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Arena key.
    pub id: ForeignKeyId,
    /// Table holding the local columns.
    pub table: TableId,
    /// Constraint name.
    pub name: Option<Identifier>,
    /// Action when the referenced row is deleted.
    pub delete_action: FkAction,
    /// Action when the referenced key is updated.
    pub update_action: FkAction,
    /// Checked at commit rather than per statement.
    pub deferred: bool,
    columns: Vec<ColumnId>,
    pk_columns: Vec<ColumnId>,
    constant_columns: Vec<(ColumnId, Constant)>,
    constant_pk_columns: Vec<(ColumnId, Constant)>,
    pub(crate) refs: u32,
}

impl ForeignKey {
    pub(crate) fn new(id: ForeignKeyId, table: TableId, name: Option<Identifier>) -> Self {
        Self {
            id,
            table,
            name,
            delete_action: FkAction::None,
            update_action: FkAction::None,
            deferred: false,
            columns: Vec::new(),
            pk_columns: Vec::new(),
            constant_columns: Vec::new(),
            constant_pk_columns: Vec::new(),
            refs: 0,
        }
    }

    /// Join a local column to a target column. Rejoining a local column replaces its target.
    pub fn join(&mut self, local: ColumnId, target: ColumnId) {
        match self.columns.iter().position(|c| *c == local) {
            Some(pos) => self.pk_columns[pos] = target,
            None => {
                self.columns.push(local);
                self.pk_columns.push(target);
            }
        }
    }

    /// Join a local column to a constant.
    pub fn join_constant(&mut self, local: ColumnId, value: Constant) {
        self.constant_columns.retain(|(c, _)| *c != local);
        self.constant_columns.push((local, value));
    }

    /// Join a constant to a target column.
    pub fn join_constant_pk(&mut self, value: Constant, target: ColumnId) {
        self.constant_pk_columns.retain(|(c, _)| *c != target);
        self.constant_pk_columns.push((target, value));
    }

    /// Local columns, parallel to [`ForeignKey::pk_columns`].
    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    /// Target columns, parallel to [`ForeignKey::columns`].
    pub fn pk_columns(&self) -> &[ColumnId] {
        &self.pk_columns
    }

    /// Local columns joined to constants.
    pub fn constant_columns(&self) -> &[(ColumnId, Constant)] {
        &self.constant_columns
    }

    /// Target columns joined to constants.
    pub fn constant_pk_columns(&self) -> &[(ColumnId, Constant)] {
        &self.constant_pk_columns
    }

    /// Mapping-only key without a physical constraint.
    pub fn is_logical(&self) -> bool {
        self.delete_action == FkAction::None
    }

    /// Target column joined to the given local column.
    pub fn pk_column_for(&self, local: ColumnId) -> Option<ColumnId> {
        self.columns
            .iter()
            .position(|c| *c == local)
            .map(|pos| self.pk_columns[pos])
    }

    /// Local column joined to the given target column.
    pub fn column_for(&self, target: ColumnId) -> Option<ColumnId> {
        self.pk_columns
            .iter()
            .position(|c| *c == target)
            .map(|pos| self.columns[pos])
    }

    /// Whether local and target column sets equal the given sets, ignoring order.
    pub fn columns_match(&self, columns: &[ColumnId], pk_columns: &[ColumnId]) -> bool {
        same_set(&self.columns, columns) && same_set(&self.pk_columns, pk_columns)
    }

    /// The key seen from its target side: (target, local) pairs without duplicates.
    pub fn inverse_joins(&self) -> Vec<(ColumnId, ColumnId)> {
        let mut joins: Vec<(ColumnId, ColumnId)> = Vec::with_capacity(self.columns.len());
        for (local, target) in self.columns.iter().zip(&self.pk_columns) {
            if !joins.iter().any(|(t, l)| t == target && l == local) {
                joins.push((*target, *local));
            }
        }
        joins
    }

    /// Number of live references from resolved mappings.
    pub fn ref_count(&self) -> u32 {
        self.refs
    }
}

/// A (possibly unique) index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Arena key.
    pub id: IndexId,
    /// Indexed table.
    pub table: TableId,
    /// Index name.
    pub name: Identifier,
    /// Indexed columns in order.
    pub columns: Vec<ColumnId>,
    /// Enforces uniqueness.
    pub unique: bool,
    pub(crate) refs: u32,
}

impl Index {
    /// Whether the index covers exactly the given columns.
    pub fn columns_match(&self, columns: &[ColumnId]) -> bool {
        same_set(&self.columns, columns)
    }

    /// Number of live references from resolved mappings.
    pub fn ref_count(&self) -> u32 {
        self.refs
    }
}

/// A unique constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unique {
    /// Arena key.
    pub id: UniqueId,
    /// Constrained table.
    pub table: TableId,
    /// Constraint name.
    pub name: Option<Identifier>,
    /// Constrained columns in order.
    pub columns: Vec<ColumnId>,
    /// Checked at commit.
    pub deferred: bool,
    pub(crate) refs: u32,
}

impl Unique {
    /// Whether the constraint covers exactly the given columns.
    pub fn columns_match(&self, columns: &[ColumnId]) -> bool {
        same_set(&self.columns, columns)
    }

    /// Number of live references from resolved mappings.
    pub fn ref_count(&self) -> u32 {
        self.refs
    }
}

/// A table's primary key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrimaryKey {
    /// Constraint name.
    pub name: Option<Identifier>,
    /// Key columns in order.
    pub columns: Vec<ColumnId>,
    /// Known to the mapping only; not declared in the database.
    pub logical: bool,
}

impl PrimaryKey {
    /// Create a physical primary key over the given columns.
    pub fn new(columns: Vec<ColumnId>) -> Self {
        Self {
            name: None,
            columns,
            logical: false,
        }
    }

    /// Create a logical primary key.
    pub fn logical(columns: Vec<ColumnId>) -> Self {
        Self {
            name: None,
            columns,
            logical: true,
        }
    }

    /// Set the constraint name.
    pub fn with_name(mut self, name: impl Into<Identifier>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether the given column is part of the key.
    pub fn contains(&self, column: ColumnId) -> bool {
        self.columns.contains(&column)
    }
}

fn same_set(a: &[ColumnId], b: &[ColumnId]) -> bool {
    a.len() == b.len() && a.iter().all(|c| b.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_literals() {
        assert_eq!(Constant::parse("null").unwrap(), Constant::Null);
        assert_eq!(
            Constant::parse("'ACTIVE'").unwrap(),
            Constant::Text("ACTIVE".into())
        );
        assert_eq!(Constant::parse("-3").unwrap(), Constant::Int(-3));
        assert_eq!(Constant::parse(".5").unwrap(), Constant::Float(0.5));
        assert!(Constant::parse("'open").is_err());
        assert!(Constant::parse("NAME").is_err());
        assert!(Constant::is_literal("12"));
        assert!(!Constant::is_literal("ID"));
    }

    #[test]
    fn test_constant_display_round_trips() {
        for lit in ["null", "'x'", "42", "1.5"] {
            assert_eq!(Constant::parse(lit).unwrap().to_string(), lit);
        }
    }

    #[test]
    fn test_join_replaces_target() {
        let mut fk = ForeignKey::new(ForeignKeyId(0), TableId(0), None);
        fk.join(ColumnId(1), ColumnId(10));
        fk.join(ColumnId(2), ColumnId(11));
        fk.join(ColumnId(1), ColumnId(12));
        assert_eq!(fk.columns(), &[ColumnId(1), ColumnId(2)]);
        assert_eq!(fk.pk_columns(), &[ColumnId(12), ColumnId(11)]);
        assert_eq!(fk.pk_column_for(ColumnId(2)), Some(ColumnId(11)));
        assert_eq!(fk.column_for(ColumnId(12)), Some(ColumnId(1)));
    }

    #[test]
    fn test_columns_match_ignores_order() {
        let mut fk = ForeignKey::new(ForeignKeyId(0), TableId(0), None);
        fk.join(ColumnId(1), ColumnId(10));
        fk.join(ColumnId(2), ColumnId(11));
        assert!(fk.columns_match(&[ColumnId(2), ColumnId(1)], &[ColumnId(11), ColumnId(10)]));
        assert!(!fk.columns_match(&[ColumnId(1)], &[ColumnId(10)]));
    }

    #[test]
    fn test_inverse_joins_swap_sides() {
        let mut fk = ForeignKey::new(ForeignKeyId(0), TableId(0), None);
        fk.join(ColumnId(1), ColumnId(10));
        fk.join(ColumnId(2), ColumnId(11));
        assert_eq!(
            fk.inverse_joins(),
            vec![(ColumnId(10), ColumnId(1)), (ColumnId(11), ColumnId(2))]
        );
    }

    #[test]
    fn test_action_names() {
        assert_eq!(FkAction::parse("CASCADE"), Some(FkAction::Cascade));
        assert_eq!(FkAction::parse("set-null"), Some(FkAction::Null));
        assert_eq!(FkAction::parse("bogus"), None);
        assert!(ForeignKey::new(ForeignKeyId(0), TableId(0), None).is_logical());
    }
}
