//! ormap schema model - tables, columns and constraints of the target store.
//!
//! The mapping engine reads and appends to a [`SchemaGroup`] while it
//! resolves mappings, consulting a [`DbDictionary`] for platform
//! capabilities and naming rules.

pub mod column;
pub mod constraint;
pub mod dictionary;
pub mod error;
pub mod group;
pub mod identifier;
pub mod table;
pub mod types;

pub use column::{Column, ColumnFlags, ColumnId};
pub use constraint::{
    Constant, FkAction, ForeignKey, ForeignKeyId, Index, IndexId, PrimaryKey, Unique, UniqueId,
};
pub use dictionary::{DbDictionary, SchemaCase};
pub use error::{Error, Result};
pub use group::{SchemaGroup, SweepReport};
pub use identifier::{ColumnPath, Identifier, TablePath};
pub use table::{Table, TableId};
pub use types::{SqlType, TypeCode};
