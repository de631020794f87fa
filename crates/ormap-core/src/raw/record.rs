//! The shared core of every mapping record.

use super::hint::{Hint, JoinDirection};
use super::template::{ColumnTemplate, ForeignKeyTemplate, IndexTemplate, UniqueTemplate};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// User-supplied mapping hints for one element: a strategy name, columns and
/// the constraints over them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingRecord {
    /// Named strategy.
    pub strategy: Option<String>,
    /// Given columns, in mapping order.
    pub columns: Vec<ColumnTemplate>,
    /// Foreign key over the columns.
    pub foreign_key: Hint<ForeignKeyTemplate>,
    /// Index over the columns.
    pub index: Hint<IndexTemplate>,
    /// Unique constraint over the columns.
    pub unique: Hint<UniqueTemplate>,
    /// Which side holds the join.
    pub join_direction: JoinDirection,
    /// The foreign key columns are not backed by a field of their own.
    pub implicit_relation: bool,
}

impl MappingRecord {
    /// A record naming a strategy.
    pub fn with_strategy(mut self, name: impl Into<String>) -> Self {
        self.strategy = Some(name.into());
        self
    }

    /// Add a given column.
    pub fn with_column(mut self, column: ColumnTemplate) -> Self {
        self.columns.push(column);
        self
    }

    /// Set the foreign key hint.
    pub fn with_foreign_key(mut self, hint: Hint<ForeignKeyTemplate>) -> Self {
        self.foreign_key = hint;
        self
    }

    /// Set the index hint.
    pub fn with_index(mut self, hint: Hint<IndexTemplate>) -> Self {
        self.index = hint;
        self
    }

    /// Set the unique hint.
    pub fn with_unique(mut self, hint: Hint<UniqueTemplate>) -> Self {
        self.unique = hint;
        self
    }

    /// Set the join direction.
    pub fn with_join_direction(mut self, direction: JoinDirection) -> Self {
        self.join_direction = direction;
        self
    }

    /// Given columns scoped to a table; `None` selects unscoped columns.
    pub fn columns_in(&self, table: Option<&str>) -> Vec<&ColumnTemplate> {
        self.columns.iter().filter(|c| c.in_table(table)).collect()
    }

    /// Fill what this record leaves open from another record.
    ///
    /// Columns are copied position by position when this record has none or
    /// the same number.
    pub fn copy_from(&mut self, other: &MappingRecord) {
        if self.strategy.is_none() {
            self.strategy.clone_from(&other.strategy);
        }
        self.foreign_key.fill_from(&other.foreign_key);
        self.index.fill_from(&other.index);
        self.unique.fill_from(&other.unique);
        if self.join_direction == JoinDirection::None {
            self.join_direction = other.join_direction;
        }
        self.implicit_relation |= other.implicit_relation;

        if self.columns.is_empty() {
            self.columns = other.columns.clone();
        } else if self.columns.len() == other.columns.len() {
            for (own, theirs) in self.columns.iter_mut().zip(&other.columns) {
                own.copy_from(theirs);
            }
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        *self = MappingRecord::default();
    }

    /// Whether the record says anything about schema components. A refused
    /// constraint counts.
    pub fn has_schema_components(&self) -> bool {
        !self.columns.is_empty()
            || !self.foreign_key.is_unspecified()
            || !self.index.is_unspecified()
            || !self.unique.is_unspecified()
    }

    /// Reject schema components the strategy cannot use.
    pub fn assert_no_schema_components(&self, context: &str, die: bool) -> Result<()> {
        if !self.columns.is_empty() {
            return complain(context, "columns", die);
        }
        self.assert_no_foreign_key(context, die)?;
        self.assert_no_index(context, die)?;
        self.assert_no_unique(context, die)
    }

    /// Reject a foreign key hint. Implicit relations may carry one.
    pub fn assert_no_foreign_key(&self, context: &str, die: bool) -> Result<()> {
        if !self.implicit_relation && self.foreign_key.is_explicit() {
            return complain(context, "foreign key", die);
        }
        Ok(())
    }

    /// Reject an index hint.
    pub fn assert_no_index(&self, context: &str, die: bool) -> Result<()> {
        if self.index.is_explicit() {
            return complain(context, "index", die);
        }
        Ok(())
    }

    /// Reject a unique hint.
    pub fn assert_no_unique(&self, context: &str, die: bool) -> Result<()> {
        if self.unique.is_explicit() {
            return complain(context, "unique constraint", die);
        }
        Ok(())
    }

    /// Reject join targets in the given columns.
    pub fn assert_no_join(&self, context: &str, die: bool) -> Result<()> {
        if self
            .columns
            .iter()
            .any(|c| c.target.is_some() || c.target_field.is_some())
        {
            return complain(context, "join target", die);
        }
        Ok(())
    }

    /// Reject a strategy name other than the one in use.
    pub fn assert_strategy(&self, context: &str, expected: &str, die: bool) -> Result<()> {
        match self.strategy.as_deref() {
            Some(named) if named != expected => {
                complain(context, &format!("strategy {}", named), die)
            }
            _ => Ok(()),
        }
    }
}

fn complain(context: &str, what: &str, die: bool) -> Result<()> {
    if die {
        return Err(Error::UnexpectedSchemaComponents {
            context: context.to_string(),
            what: what.to_string(),
        });
    }
    warn!(context, what, "ignoring mapping information the strategy cannot use");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_from_positional_columns() {
        let mut own = MappingRecord::default()
            .with_column(ColumnTemplate::new("A"))
            .with_column(ColumnTemplate::default());
        let other = MappingRecord::default()
            .with_strategy("relation")
            .with_column(ColumnTemplate::new("X").with_size(10))
            .with_column(ColumnTemplate::new("Y"))
            .with_index(Hint::Forbidden);
        own.copy_from(&other);
        assert_eq!(own.strategy.as_deref(), Some("relation"));
        assert_eq!(own.columns[0].name.as_deref(), Some("A"));
        assert_eq!(own.columns[0].size, Some(10));
        assert_eq!(own.columns[1].name.as_deref(), Some("Y"));
        assert!(own.index.is_forbidden());
    }

    #[test]
    fn test_copy_from_mismatched_columns_untouched() {
        let mut own = MappingRecord::default().with_column(ColumnTemplate::new("A"));
        let other = MappingRecord::default()
            .with_column(ColumnTemplate::new("X"))
            .with_column(ColumnTemplate::new("Y"));
        own.copy_from(&other);
        assert_eq!(own.columns.len(), 1);
        assert_eq!(own.columns[0].name.as_deref(), Some("A"));
    }

    #[test]
    fn test_schema_components() {
        assert!(!MappingRecord::default().has_schema_components());
        let refused = MappingRecord::default().with_unique(Hint::Forbidden);
        assert!(refused.has_schema_components());
        assert!(refused.assert_no_schema_components("C", true).is_ok());

        let indexed =
            MappingRecord::default().with_index(Hint::Explicit(IndexTemplate::named("I")));
        assert!(indexed.assert_no_schema_components("C", false).is_ok());
        let err = indexed.assert_no_schema_components("C.f", true).unwrap_err();
        assert!(matches!(err, Error::UnexpectedSchemaComponents { what, .. } if what == "index"));
    }

    #[test]
    fn test_implicit_relation_allows_foreign_key() {
        let mut record = MappingRecord::default()
            .with_foreign_key(Hint::Explicit(ForeignKeyTemplate::default()));
        assert!(record.assert_no_foreign_key("C", true).is_err());
        record.implicit_relation = true;
        assert!(record.assert_no_foreign_key("C", true).is_ok());
    }

    #[test]
    fn test_assert_join_and_strategy() {
        let record = MappingRecord::default()
            .with_strategy("flat")
            .with_column(ColumnTemplate::new("A").with_target("ID"));
        assert!(record.assert_no_join("C", true).is_err());
        assert!(record.assert_strategy("C", "flat", true).is_ok());
        assert!(record.assert_strategy("C", "vertical", true).is_err());
    }

    #[test]
    fn test_columns_in_scope() {
        let record = MappingRecord::default()
            .with_column(ColumnTemplate::new("A"))
            .with_column(ColumnTemplate::new("B").with_table("SEC"));
        assert_eq!(record.columns_in(None).len(), 1);
        assert_eq!(record.columns_in(Some("SEC"))[0].name.as_deref(), Some("B"));
    }
}
