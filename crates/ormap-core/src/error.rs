//! Resolution error types.
//!
//! Specification errors name the descriptor being resolved (`context`), the
//! offending attribute and the data that was found. Structural contract
//! violations are reported as [`Error::NotResolved`] or [`Error::Internal`].

use ormap_schema::SqlType;
use thiserror::Error;

/// Mapping resolution errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Schema model error.
    #[error("schema error: {0}")]
    Schema(#[from] ormap_schema::Error),

    /// No table was given and none could be defaulted.
    #[error("{context}: no table given and none can be defaulted")]
    NoTable {
        /// Descriptor being resolved.
        context: String,
    },

    /// A named table does not exist and may not be created.
    #[error("{context}: table {table} does not exist")]
    BadTable {
        /// Descriptor being resolved.
        context: String,
        /// The missing table.
        table: String,
    },

    /// The number of given columns does not match the number expected.
    #[error("{context}: {prefix} expects {expected} column(s) but {given} were given")]
    ColumnCount {
        /// Descriptor being resolved.
        context: String,
        /// Which column group was being merged.
        prefix: String,
        /// Columns the mapping needs.
        expected: usize,
        /// Columns the record supplied.
        given: usize,
    },

    /// A column name is required but missing.
    #[error("{context}: no {prefix} column name given")]
    NoColumnName {
        /// Descriptor being resolved.
        context: String,
        /// Which column group was being merged.
        prefix: String,
    },

    /// A named column does not exist and may not be created.
    #[error("{context}: column {column} does not exist in table {table}")]
    BadColumnName {
        /// Descriptor being resolved.
        context: String,
        /// The missing column.
        column: String,
        /// The table searched.
        table: String,
    },

    /// A qualified column names a table that cannot be reached.
    #[error(
        "{context}: column {column} names table {table}, which is not reachable from {expected}"
    )]
    ColumnWrongTable {
        /// Descriptor being resolved.
        context: String,
        /// The column path as given.
        column: String,
        /// The table it names.
        table: String,
        /// The table that was expected.
        expected: String,
    },

    /// An existing column cannot hold the mapped values.
    #[error("{context}: existing column {column} of type {actual} is incompatible with {expected}")]
    IncompatibleColumn {
        /// Descriptor being resolved.
        context: String,
        /// The existing column.
        column: String,
        /// Its current type.
        actual: SqlType,
        /// The type the mapping needs.
        expected: SqlType,
    },

    /// Join columns are spread over more than one local table.
    #[error("{context}: join columns span tables {first} and {second}")]
    MultipleForeignKeyTables {
        /// Descriptor being resolved.
        context: String,
        /// First local table seen.
        first: String,
        /// Conflicting table.
        second: String,
    },

    /// A join needs columns but none were given.
    #[error("{context}: no {prefix} join columns given")]
    NoJoinColumns {
        /// Descriptor being resolved.
        context: String,
        /// Which join was being merged.
        prefix: String,
    },

    /// A join column needs a name but none was given.
    #[error("{context}: {prefix} join column has no name")]
    NoJoinColumnName {
        /// Descriptor being resolved.
        context: String,
        /// Which join was being merged.
        prefix: String,
    },

    /// A join column cannot be defaulted because the choice is ambiguous.
    #[error("{context}: cannot default {prefix} join column: {reason}")]
    AmbiguousJoin {
        /// Descriptor being resolved.
        context: String,
        /// Which join was being merged.
        prefix: String,
        /// What made the default ambiguous.
        reason: String,
    },

    /// A join target column does not exist.
    #[error("{context}: join target {target} does not exist in table {table}")]
    BadJoinTarget {
        /// Descriptor being resolved.
        context: String,
        /// The target as given.
        target: String,
        /// The table searched.
        table: String,
    },

    /// A join constant could not be parsed.
    #[error("{context}: invalid join constant {literal}")]
    BadJoinConstant {
        /// Descriptor being resolved.
        context: String,
        /// The offending literal.
        literal: String,
    },

    /// A join target names an unknown class.
    #[error("{context}: join target class {class} is not {expected} or one of its superclasses")]
    BadTargetClass {
        /// Descriptor being resolved.
        context: String,
        /// The class named.
        class: String,
        /// The related class.
        expected: String,
    },

    /// A join target names a field that cannot be joined to.
    #[error("{context}: join target field {field}: {reason}")]
    BadTargetField {
        /// Descriptor being resolved.
        context: String,
        /// The field named.
        field: String,
        /// Why it cannot be used.
        reason: String,
    },

    /// A join column cannot be inverse here.
    #[error(
        "{context}: join column {column} cannot be an inverse join{}",
        if *.self_join { " of a self join" } else { "" }
    )]
    BadInverseJoin {
        /// Descriptor being resolved.
        context: String,
        /// The column as given.
        column: String,
        /// Both sides are the same table.
        self_join: bool,
    },

    /// A forbidden foreign key exists and may not be dropped.
    #[error("{context}: foreign key on {columns} exists but the mapping forbids one")]
    ForeignKeyExists {
        /// Descriptor being resolved.
        context: String,
        /// Its local columns.
        columns: String,
    },

    /// A forbidden index exists and may not be dropped.
    #[error("{context}: index {index} exists but the mapping forbids one")]
    IndexExists {
        /// Descriptor being resolved.
        context: String,
        /// The index.
        index: String,
    },

    /// An existing index is not unique and may not be altered.
    #[error("{context}: existing index {index} is not unique")]
    IndexNotUnique {
        /// Descriptor being resolved.
        context: String,
        /// The index.
        index: String,
    },

    /// A forbidden unique constraint exists and may not be dropped.
    #[error("{context}: unique constraint on {columns} exists but the mapping forbids one")]
    UniqueExists {
        /// Descriptor being resolved.
        context: String,
        /// Its columns.
        columns: String,
    },

    /// A constraint was requested over no columns.
    #[error("{context}: {kind} requested but the mapping has no columns")]
    NoConstraintColumns {
        /// Descriptor being resolved.
        context: String,
        /// Index or unique.
        kind: String,
    },

    /// The record carries schema information the strategy cannot use.
    #[error("{context}: unexpected {what} in mapping record")]
    UnexpectedSchemaComponents {
        /// Descriptor being resolved.
        context: String,
        /// What was found.
        what: String,
    },

    /// A strategy name is not known.
    #[error("{context}: unknown strategy {name}")]
    UnknownStrategy {
        /// Descriptor being resolved.
        context: String,
        /// The name given.
        name: String,
    },

    /// A strategy cannot be used for this element.
    #[error("{context}: strategy {strategy} cannot be used: {reason}")]
    InvalidStrategy {
        /// Descriptor being resolved.
        context: String,
        /// The strategy chosen.
        strategy: String,
        /// Why not.
        reason: String,
    },

    /// A mapped-by back reference is unusable.
    #[error("{context}: mapped-by field {field} of {related} is not a usable back reference")]
    BadMappedBy {
        /// Descriptor being resolved.
        context: String,
        /// The mapped-by field.
        field: String,
        /// The related class.
        related: String,
    },

    /// A version field has a type no version strategy supports.
    #[error("{context}: version field type {type_name} is not supported")]
    UnsupportedVersionType {
        /// Descriptor being resolved.
        context: String,
        /// The field type.
        type_name: String,
    },

    /// A class needs a discriminator value and none was given.
    #[error("{context}: no discriminator value given")]
    NoDiscriminatorValue {
        /// Descriptor being resolved.
        context: String,
    },

    /// A primary key is needed but no pk-capable field or column exists.
    #[error("{context}: no primary key columns available")]
    NoPrimaryKey {
        /// Descriptor being resolved.
        context: String,
    },

    /// A class name is not part of the class model.
    #[error("unknown class {0}")]
    UnknownClass(String),

    /// A field name is not declared by the class.
    #[error("unknown field {class}.{field}")]
    UnknownField {
        /// The class searched.
        class: String,
        /// The missing field.
        field: String,
    },

    /// The superclass chain loops.
    #[error("inheritance cycle through {0}")]
    InheritanceCycle(String),

    /// An operation needs a resolution state the descriptor has not reached.
    #[error("{context}: not resolved (state {state})")]
    NotResolved {
        /// Descriptor queried.
        context: String,
        /// Its current state.
        state: String,
    },

    /// Configuration could not be read.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error while loading configuration or records.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading configuration or records.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal invariant was broken.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Fatal errors caused by the mapping data itself, as opposed to broken
    /// invariants or I/O.
    pub fn is_specification(&self) -> bool {
        !matches!(
            self,
            Error::NotResolved { .. }
                | Error::Internal(_)
                | Error::Io(_)
                | Error::Json(_)
                | Error::Config(_)
                | Error::Schema(_)
        )
    }

    /// The descriptor an error refers to, when it names one.
    pub fn context(&self) -> Option<&str> {
        match self {
            Error::NoTable { context }
            | Error::BadTable { context, .. }
            | Error::ColumnCount { context, .. }
            | Error::NoColumnName { context, .. }
            | Error::BadColumnName { context, .. }
            | Error::ColumnWrongTable { context, .. }
            | Error::IncompatibleColumn { context, .. }
            | Error::MultipleForeignKeyTables { context, .. }
            | Error::NoJoinColumns { context, .. }
            | Error::NoJoinColumnName { context, .. }
            | Error::AmbiguousJoin { context, .. }
            | Error::BadJoinTarget { context, .. }
            | Error::BadJoinConstant { context, .. }
            | Error::BadTargetClass { context, .. }
            | Error::BadTargetField { context, .. }
            | Error::BadInverseJoin { context, .. }
            | Error::ForeignKeyExists { context, .. }
            | Error::IndexExists { context, .. }
            | Error::IndexNotUnique { context, .. }
            | Error::UniqueExists { context, .. }
            | Error::NoConstraintColumns { context, .. }
            | Error::UnexpectedSchemaComponents { context, .. }
            | Error::UnknownStrategy { context, .. }
            | Error::InvalidStrategy { context, .. }
            | Error::BadMappedBy { context, .. }
            | Error::UnsupportedVersionType { context, .. }
            | Error::NoDiscriminatorValue { context }
            | Error::NoPrimaryKey { context }
            | Error::NotResolved { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// Result type for mapping resolution.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let spec = Error::ColumnCount {
            context: "Person.name".into(),
            prefix: "field".into(),
            expected: 1,
            given: 2,
        };
        assert!(spec.is_specification());
        assert_eq!(spec.context(), Some("Person.name"));
        assert_eq!(
            spec.to_string(),
            "Person.name: field expects 1 column(s) but 2 were given"
        );

        let internal = Error::Internal("broken".into());
        assert!(!internal.is_specification());
        assert_eq!(internal.context(), None);
    }

    #[test]
    fn test_inverse_join_message() {
        let err = Error::BadInverseJoin {
            context: "Node.parent".into(),
            column: "PARENT_ID".into(),
            self_join: true,
        };
        assert!(err.to_string().ends_with("of a self join"));
    }

    #[test]
    fn test_schema_error_converts() {
        let err: Error = ormap_schema::Error::UnknownTable("X".into()).into();
        assert!(matches!(err, Error::Schema(_)));
    }
}
