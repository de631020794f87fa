//! Schema model error types.

use thiserror::Error;

/// Errors raised by the schema model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A table path did not resolve to a known table.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// A column name did not resolve within its table.
    #[error("unknown column {column} in table {table}")]
    UnknownColumn {
        /// The table that was searched.
        table: String,
        /// The column that was not found.
        column: String,
    },

    /// A literal could not be interpreted as a join constant.
    #[error("invalid constant literal: {literal}")]
    InvalidConstant {
        /// The offending literal.
        literal: String,
    },

    /// An identifier was empty or otherwise unusable.
    #[error("invalid identifier {name:?}: {reason}")]
    InvalidIdentifier {
        /// The identifier text.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, Error>;
