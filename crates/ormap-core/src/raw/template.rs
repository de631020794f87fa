//! Column and constraint templates.
//!
//! A template is a partial description: every `Option` left `None` is
//! something the user did not say. The same shapes serve as user-given
//! columns in records and as the columns a strategy asks for.

use ormap_schema::{FkAction, Identifier, SqlType, TablePath, TypeCode};
use serde::{Deserialize, Serialize};

/// A partial column description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnTemplate {
    /// Column name; `TABLE.COL` or `.COL` to qualify.
    pub name: Option<String>,
    /// Table the column belongs to, scoping it within a record.
    pub table: Option<String>,
    /// Join target: a column name, `TABLE.COL`, or a constant literal.
    pub target: Option<String>,
    /// Join target given as a field: `field`, `.field` or `Class.field`.
    pub target_field: Option<String>,
    /// SQL type.
    pub sql_type: Option<SqlType>,
    /// Platform type name.
    pub type_name: Option<String>,
    /// Semantic type of the stored values.
    pub type_code: Option<TypeCode>,
    /// Size; `-1` for unbounded.
    pub size: Option<i32>,
    /// Decimal digits.
    pub decimals: Option<i32>,
    /// NOT NULL.
    pub not_null: Option<bool>,
    /// Default value literal.
    pub default: Option<String>,
    /// Value assigned by the database.
    pub auto_assigned: bool,
    /// Holds a related object's identity.
    pub relation_id: bool,
    /// Foreign key column mapped to no field.
    pub implicit_relation: bool,
    /// Excluded from inserts.
    pub uninsertable: bool,
    /// Excluded from updates.
    pub unupdatable: bool,
    /// Joins to the owning row's primary key.
    pub pk_join: bool,
    /// Column comment.
    pub comment: Option<String>,
    /// Holds XML.
    pub xml: bool,
}

impl ColumnTemplate {
    /// A named template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// A template with only a type.
    pub fn typed(code: TypeCode) -> Self {
        Self {
            type_code: Some(code),
            ..Self::default()
        }
    }

    /// Set the table scope.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set the join target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the join target field.
    pub fn with_target_field(mut self, field: impl Into<String>) -> Self {
        self.target_field = Some(field.into());
        self
    }

    /// Set the SQL type.
    pub fn with_sql_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = Some(sql_type);
        self
    }

    /// Set the platform type name.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Set the semantic type.
    pub fn with_type_code(mut self, code: TypeCode) -> Self {
        self.type_code = Some(code);
        self
    }

    /// Set the size.
    pub fn with_size(mut self, size: i32) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the decimal digits.
    pub fn with_decimals(mut self, decimals: i32) -> Self {
        self.decimals = Some(decimals);
        self
    }

    /// Set NOT NULL.
    pub fn with_not_null(mut self, not_null: bool) -> Self {
        self.not_null = Some(not_null);
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Mark as database-assigned.
    pub fn auto_assigned(mut self) -> Self {
        self.auto_assigned = true;
        self
    }

    /// Mark as a primary key join.
    pub fn pk_join(mut self) -> Self {
        self.pk_join = true;
        self
    }

    /// Exclude from inserts.
    pub fn uninsertable(mut self) -> Self {
        self.uninsertable = true;
        self
    }

    /// Exclude from updates.
    pub fn unupdatable(mut self) -> Self {
        self.unupdatable = true;
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Whether the template is scoped to the given table (`None` asks for
    /// unscoped templates).
    pub fn in_table(&self, table: Option<&str>) -> bool {
        match (self.table.as_deref(), table) {
            (None, None) => true,
            (Some(own), Some(wanted)) => tables_match(own, wanted),
            _ => false,
        }
    }

    /// Fill attributes this template leaves open from another one.
    pub fn copy_from(&mut self, other: &ColumnTemplate) {
        fill(&mut self.name, &other.name);
        fill(&mut self.table, &other.table);
        fill(&mut self.target, &other.target);
        fill(&mut self.target_field, &other.target_field);
        fill(&mut self.sql_type, &other.sql_type);
        fill(&mut self.type_name, &other.type_name);
        fill(&mut self.type_code, &other.type_code);
        fill(&mut self.size, &other.size);
        fill(&mut self.decimals, &other.decimals);
        fill(&mut self.not_null, &other.not_null);
        fill(&mut self.default, &other.default);
        fill(&mut self.comment, &other.comment);
        self.auto_assigned |= other.auto_assigned;
        self.relation_id |= other.relation_id;
        self.implicit_relation |= other.implicit_relation;
        self.uninsertable |= other.uninsertable;
        self.unupdatable |= other.unupdatable;
        self.pk_join |= other.pk_join;
        self.xml |= other.xml;
    }
}

fn fill<T: Clone>(own: &mut Option<T>, other: &Option<T>) {
    if own.is_none() {
        own.clone_from(other);
    }
}

/// Compare two table names, ignoring a schema only one side gives.
pub(crate) fn tables_match(a: &str, b: &str) -> bool {
    let (a, b) = (TablePath::parse(a), TablePath::parse(b));
    if !Identifier::new(a.name.as_str()).matches(&b.name) {
        return false;
    }
    match (a.schema, b.schema) {
        (Some(x), Some(y)) => Identifier::new(x).matches(&y),
        _ => true,
    }
}

/// A partial foreign key description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignKeyTemplate {
    /// Constraint name.
    pub name: Option<String>,
    /// Delete action.
    pub delete_action: Option<FkAction>,
    /// Update action.
    pub update_action: Option<FkAction>,
    /// Deferred checking.
    pub deferred: bool,
}

impl ForeignKeyTemplate {
    /// A template with a delete action.
    pub fn on_delete(action: FkAction) -> Self {
        Self {
            delete_action: Some(action),
            ..Self::default()
        }
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the update action.
    pub fn with_update_action(mut self, action: FkAction) -> Self {
        self.update_action = Some(action);
        self
    }

    /// Mark deferred.
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }
}

/// A partial index description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexTemplate {
    /// Index name.
    pub name: Option<String>,
    /// Unique index.
    pub unique: bool,
    /// Column names overriding the mapped columns.
    pub columns: Vec<String>,
}

impl IndexTemplate {
    /// A named index.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Mark unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A partial unique constraint description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniqueTemplate {
    /// Constraint name.
    pub name: Option<String>,
    /// Column names, for class and join-table level constraints.
    pub columns: Vec<String>,
    /// Deferred checking.
    pub deferred: bool,
}

impl UniqueTemplate {
    /// A constraint over named columns.
    pub fn on(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
