//! ormap core - resolves object/relational mappings against a schema.
//!
//! A [`MappingCatalog`] takes a class model, the user's mapping records and
//! an existing schema, and works out for every class and field which tables,
//! columns, keys and indexes hold it. Missing information is filled in by a
//! pluggable defaults policy; when adapting, the schema grows to match.

pub mod catalog;
pub mod config;
pub mod defaults;
pub mod descriptor;
pub mod error;
pub mod merge;
pub mod model;
pub mod raw;
pub mod resolve;
pub mod strategy;

pub use catalog::{ColumnResult, EntityResult, MappingCatalog, MappingSnapshot, QueryResultMapping};
pub use config::{DefaultsConfig, MappingConfig};
pub use defaults::{MappingDefaults, StandardDefaults};
pub use descriptor::{ClassMapping, FieldMapping, MappingGraph, ResolveRequest, ResolveState};
pub use error::{Error, Result};
pub use model::{ClassDef, ClassModel, FieldDef, IdentityType, ValueDef};
pub use raw::{ClassRecordSet, ColumnTemplate, FieldRecord, Hint, RecordCatalog};
pub use resolve::ResolutionEvent;
pub use strategy::{CustomStrategy, StrategyRegistry, StrategyTarget};
