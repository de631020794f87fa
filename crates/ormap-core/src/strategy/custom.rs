//! User-supplied strategies.

use crate::error::Result;
use crate::raw::ColumnTemplate;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Column values of one row, keyed by column name.
pub type Row = BTreeMap<String, Value>;

/// What a custom strategy is attached to.
#[derive(Debug, Clone, Copy)]
pub struct StrategyTarget<'a> {
    /// Class name.
    pub class: &'a str,
    /// Field name, for field strategies and value handlers.
    pub field: Option<&'a str>,
    /// Names of the mapped columns; empty before resolution.
    pub columns: &'a [String],
}

impl<'a> StrategyTarget<'a> {
    /// A class target.
    pub fn class(class: &'a str) -> Self {
        Self {
            class,
            field: None,
            columns: &[],
        }
    }

    /// A field target.
    pub fn field(class: &'a str, field: &'a str) -> Self {
        Self {
            class,
            field: Some(field),
            columns: &[],
        }
    }

    /// Attach resolved column names.
    pub fn with_columns(mut self, columns: &'a [String]) -> Self {
        self.columns = columns;
        self
    }
}

/// A persistence strategy supplied from outside the crate.
///
/// Only the column shape takes part in resolution. The row operations are
/// the capability interface handed to statement execution.
pub trait CustomStrategy: Send + Sync {
    /// Columns the strategy stores into. Unnamed templates are named by the
    /// defaults policy.
    fn column_templates(&self, target: &StrategyTarget<'_>) -> Vec<ColumnTemplate>;

    /// Fill column values for a new row.
    fn insert(&self, target: &StrategyTarget<'_>, row: &mut Row) -> Result<()>;

    /// Fill column values for a changed row.
    fn update(&self, target: &StrategyTarget<'_>, row: &mut Row) -> Result<()>;

    /// Act on a deleted row.
    fn delete(&self, target: &StrategyTarget<'_>, row: &Row) -> Result<()>;

    /// Read the value back from a row.
    fn load(&self, target: &StrategyTarget<'_>, row: &Row) -> Result<Option<Value>>;

    /// Called once after the whole catalog is resolved.
    fn initialize(&self, _target: &StrategyTarget<'_>) -> Result<()> {
        Ok(())
    }
}

/// A named custom strategy.
#[derive(Clone)]
pub struct CustomHandle {
    name: String,
    strategy: Arc<dyn CustomStrategy>,
}

impl CustomHandle {
    /// Wrap a strategy.
    pub fn new(name: impl Into<String>, strategy: Arc<dyn CustomStrategy>) -> Self {
        Self {
            name: name.into(),
            strategy,
        }
    }

    /// Registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The strategy.
    pub fn strategy(&self) -> &dyn CustomStrategy {
        self.strategy.as_ref()
    }
}

impl fmt::Debug for CustomHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CustomHandle {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormap_schema::SqlType;

    struct Uppercase;

    impl CustomStrategy for Uppercase {
        fn column_templates(&self, target: &StrategyTarget<'_>) -> Vec<ColumnTemplate> {
            vec![ColumnTemplate::new(target.field.unwrap_or("VALUE"))
                .with_sql_type(SqlType::Varchar)]
        }

        fn insert(&self, target: &StrategyTarget<'_>, row: &mut Row) -> Result<()> {
            for col in target.columns {
                if let Some(Value::String(s)) = row.get_mut(col) {
                    *s = s.to_uppercase();
                }
            }
            Ok(())
        }

        fn update(&self, target: &StrategyTarget<'_>, row: &mut Row) -> Result<()> {
            self.insert(target, row)
        }

        fn delete(&self, _target: &StrategyTarget<'_>, _row: &Row) -> Result<()> {
            Ok(())
        }

        fn load(&self, target: &StrategyTarget<'_>, row: &Row) -> Result<Option<Value>> {
            Ok(target.columns.first().and_then(|c| row.get(c)).cloned())
        }
    }

    #[test]
    fn test_handle_identity_is_name() {
        let a = CustomHandle::new("upper", Arc::new(Uppercase));
        let b = CustomHandle::new("upper", Arc::new(Uppercase));
        assert_eq!(a, b);
        assert!(format!("{:?}", a).contains("upper"));
    }

    #[test]
    fn test_row_operations() {
        let handle = CustomHandle::new("upper", Arc::new(Uppercase));
        let columns = vec!["CODE".to_string()];
        let target = StrategyTarget::field("Item", "code").with_columns(&columns);
        let mut row = Row::new();
        row.insert("CODE".to_string(), Value::from("abc"));
        handle.strategy().insert(&target, &mut row).unwrap();
        assert_eq!(
            handle.strategy().load(&target, &row).unwrap(),
            Some(Value::from("ABC"))
        );
        assert_eq!(handle.strategy().column_templates(&target)[0].name.as_deref(), Some("code"));
    }
}
