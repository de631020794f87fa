//! Mapping descriptors: the resolvable units and the arena that owns them.
//!
//! Descriptors refer to each other by [`ClassId`] and [`FieldId`] and to
//! schema components by the schema crate's ids. The [`MappingGraph`] owns
//! every descriptor; cross references never hold borrows.

mod class;
mod field;
mod graph;
mod state;

pub use class::{ClassMapping, DiscriminatorMapping, VersionMapping};
pub use field::{ColumnIo, FieldMapping, JoinTableRole, ValueMapping};
pub use graph::MappingGraph;
pub use state::{transition, Effect, InvalidTransition, ResolveRequest, ResolveState, Transition};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of a class descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

/// Key of a field descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub(crate) u32);

impl FieldId {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field#{}", self.0)
    }
}
