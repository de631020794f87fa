//! SQL identifiers and dotted name paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A database identifier.
///
/// Undelimited identifiers compare case-insensitively; identifiers written
/// inside double quotes keep their exact spelling and compare exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    name: String,
    delimited: bool,
}

impl Identifier {
    /// Create an identifier, stripping surrounding double quotes if present.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
            Self {
                name: name[1..name.len() - 1].to_string(),
                delimited: true,
            }
        } else {
            Self {
                name,
                delimited: false,
            }
        }
    }

    /// The identifier text without delimiters.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the identifier was delimited.
    pub fn is_delimited(&self) -> bool {
        self.delimited
    }

    /// Whether the identifier is empty.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Canonical comparison key.
    pub fn key(&self) -> String {
        if self.delimited {
            self.name.clone()
        } else {
            self.name.to_ascii_uppercase()
        }
    }

    /// Compare against a raw name using identifier rules.
    pub fn matches(&self, other: &str) -> bool {
        *self == Identifier::new(other)
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        if self.delimited || other.delimited {
            self.name == other.name
        } else {
            self.name.eq_ignore_ascii_case(&other.name)
        }
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.to_ascii_uppercase().hash(state);
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.delimited {
            write!(f, "\"{}\"", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier::new(s)
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Identifier::new(s)
    }
}

/// Split a dotted path, keeping dots inside double quotes.
fn split_path(path: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in path.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                current.push(ch);
            }
            '.' if !quoted => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
}

/// A possibly schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TablePath {
    /// Schema name, if qualified.
    pub schema: Option<String>,
    /// Table name. Empty when a column path used a bare leading dot.
    pub name: String,
}

impl TablePath {
    /// Create an unqualified table path.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Parse `table` or `schema.table`.
    pub fn parse(path: &str) -> Self {
        let mut parts = split_path(path);
        let name = parts.pop().unwrap_or_default();
        let schema = if parts.is_empty() {
            None
        } else {
            Some(parts.join("."))
        };
        Self { schema, name }
    }

    /// Set the schema if none was given.
    pub fn or_schema(mut self, schema: Option<&str>) -> Self {
        if self.schema.is_none() {
            self.schema = schema.map(str::to_string);
        }
        self
    }

    /// Whether the table part is empty (the `.column` form).
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for TablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A column name, optionally qualified by its table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ColumnPath {
    /// Qualifying table, if any.
    pub table: Option<TablePath>,
    /// Column name.
    pub name: String,
}

impl ColumnPath {
    /// Parse `col`, `.col`, `table.col` or `schema.table.col`.
    pub fn parse(path: &str) -> Self {
        let mut parts = split_path(path);
        let name = parts.pop().unwrap_or_default();
        let table = match parts.len() {
            0 => None,
            1 => Some(TablePath::new(parts.remove(0))),
            _ => {
                let table = parts.pop().unwrap_or_default();
                Some(TablePath {
                    schema: Some(parts.join(".")),
                    name: table,
                })
            }
        };
        Self { table, name }
    }

    /// Whether the path carries a table qualifier (possibly empty).
    pub fn is_qualified(&self) -> bool {
        self.table.is_some()
    }

    /// Whether the qualifier names a table (not the bare `.col` form).
    pub fn has_table_name(&self) -> bool {
        self.table.as_ref().is_some_and(|t| !t.is_empty())
    }
}

impl fmt::Display for ColumnPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => f.write_str(&self.name),
        }
    }
}
