//! Persistence strategies.
//!
//! Each mapped element gets one strategy from a closed family. Strategies
//! outside the built-in set are plugged in through [`CustomStrategy`] and
//! carried as the `Custom` variant of their family.

mod custom;
mod registry;
pub mod select;

pub use custom::{CustomHandle, CustomStrategy, Row, StrategyTarget};
pub use registry::StrategyRegistry;

use std::fmt;

/// How a class is stored.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassStrategy {
    /// Own table holding every field, including inherited ones.
    FullTable,
    /// Rows live in the superclass table.
    Flat,
    /// Own table joined to the superclass table.
    Vertical,
    /// Columns live in the owning object's table.
    Embedded,
    /// Embedded object identity.
    ObjectId,
    /// Not mapped.
    None,
    /// User-supplied.
    Custom(CustomHandle),
}

impl ClassStrategy {
    /// Name used in records.
    pub fn name(&self) -> &str {
        match self {
            ClassStrategy::FullTable => "full",
            ClassStrategy::Flat => "flat",
            ClassStrategy::Vertical => "vertical",
            ClassStrategy::Embedded => "embed",
            ClassStrategy::ObjectId => "object-id",
            ClassStrategy::None => "none",
            ClassStrategy::Custom(handle) => handle.name(),
        }
    }

    /// Built-in strategy for a record name.
    pub fn from_alias(name: &str) -> Option<ClassStrategy> {
        let strategy = match name.to_ascii_lowercase().as_str() {
            "full" | "table-per-class" => ClassStrategy::FullTable,
            "flat" | "single-table" => ClassStrategy::Flat,
            "vertical" | "joined" => ClassStrategy::Vertical,
            "embed" | "embedded" => ClassStrategy::Embedded,
            "object-id" => ClassStrategy::ObjectId,
            "none" => ClassStrategy::None,
            _ => return None,
        };
        Some(strategy)
    }

    /// Whether instances have rows of their own.
    pub fn is_mapped(&self) -> bool {
        !matches!(self, ClassStrategy::None)
    }

    /// Whether the class table is joined to its superclass table.
    pub fn joins_superclass(&self) -> bool {
        matches!(self, ClassStrategy::Flat | ClassStrategy::Vertical)
    }

    /// Whether the class lives inside another object's table.
    pub fn is_embedded(&self) -> bool {
        matches!(self, ClassStrategy::Embedded | ClassStrategy::ObjectId)
    }
}

impl fmt::Display for ClassStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handler for a value stored through a type conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueHandler {
    /// Enum stored by name.
    EnumName,
    /// Enum stored by ordinal.
    EnumOrdinal,
    /// Reference to an unmapped persistent type stored as its identity string.
    ObjectIdString,
    /// Binary large object.
    Blob,
    /// Character large object.
    Clob,
    /// Byte array column.
    ByteArray,
    /// Char array column.
    CharArray,
    /// User-supplied.
    Custom(CustomHandle),
}

impl ValueHandler {
    /// Name used in records.
    pub fn name(&self) -> &str {
        match self {
            ValueHandler::EnumName => "enum",
            ValueHandler::EnumOrdinal => "enum-ordinal",
            ValueHandler::ObjectIdString => "object-id-string",
            ValueHandler::Blob => "blob",
            ValueHandler::Clob => "clob",
            ValueHandler::ByteArray => "byte-array",
            ValueHandler::CharArray => "char-array",
            ValueHandler::Custom(handle) => handle.name(),
        }
    }

    /// Built-in handler for a record name.
    pub fn from_alias(name: &str) -> Option<ValueHandler> {
        let handler = match name.to_ascii_lowercase().as_str() {
            "enum" => ValueHandler::EnumName,
            "enum-ordinal" => ValueHandler::EnumOrdinal,
            "object-id-string" => ValueHandler::ObjectIdString,
            "blob" => ValueHandler::Blob,
            "clob" => ValueHandler::Clob,
            "byte-array" => ValueHandler::ByteArray,
            "char-array" => ValueHandler::CharArray,
            _ => return None,
        };
        Some(handler)
    }

    /// Whether the handled column is a large object.
    pub fn is_lob(&self) -> bool {
        matches!(self, ValueHandler::Blob | ValueHandler::Clob)
    }
}

/// How a field is stored.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldStrategy {
    /// Not stored.
    None,
    /// Scalar in one column.
    Primitive,
    /// String in one column.
    String,
    /// Large object in one column.
    Lob,
    /// Value converted by a handler.
    Handler(ValueHandler),
    /// Embedded object in the owner's table.
    Embed,
    /// To-one relation by foreign key.
    Relation,
    /// To-one relation to an unknown type, stored by identity string.
    UntypedRelation,
    /// Serialized into a large object.
    Serialized,
    /// Collection of values in a join table.
    CollectionTable,
    /// Collection of relations in a join table.
    RelationCollectionTable,
    /// Collection of relations by a foreign key in the element table.
    RelationCollectionInverseKey,
    /// Map of values in a join table.
    MapTable,
    /// Map to relations in a join table.
    RelationMapTable,
    /// Map to relations by a foreign key in the value table.
    RelationMapInverseKey,
    /// Map from relations to relations in a join table.
    RelationRelationMapTable,
    /// User-supplied.
    Custom(CustomHandle),
}

impl FieldStrategy {
    /// Name used in records.
    pub fn name(&self) -> &str {
        match self {
            FieldStrategy::None => "none",
            FieldStrategy::Primitive => "primitive",
            FieldStrategy::String => "string",
            FieldStrategy::Lob => "lob",
            FieldStrategy::Handler(handler) => handler.name(),
            FieldStrategy::Embed => "embed",
            FieldStrategy::Relation => "relation",
            FieldStrategy::UntypedRelation => "untyped-relation",
            FieldStrategy::Serialized => "serialized",
            FieldStrategy::CollectionTable => "collection-table",
            FieldStrategy::RelationCollectionTable => "relation-collection-table",
            FieldStrategy::RelationCollectionInverseKey => "relation-collection-inverse-key",
            FieldStrategy::MapTable => "map-table",
            FieldStrategy::RelationMapTable => "relation-map-table",
            FieldStrategy::RelationMapInverseKey => "relation-map-inverse-key",
            FieldStrategy::RelationRelationMapTable => "relation-relation-map-table",
            FieldStrategy::Custom(handle) => handle.name(),
        }
    }

    /// Built-in strategy for a record name. Handler names map to
    /// [`FieldStrategy::Handler`].
    pub fn from_alias(name: &str) -> Option<FieldStrategy> {
        let strategy = match name.to_ascii_lowercase().as_str() {
            "none" => FieldStrategy::None,
            "primitive" => FieldStrategy::Primitive,
            "string" => FieldStrategy::String,
            "lob" => FieldStrategy::Lob,
            "embed" => FieldStrategy::Embed,
            "relation" => FieldStrategy::Relation,
            "untyped-relation" => FieldStrategy::UntypedRelation,
            "serialized" => FieldStrategy::Serialized,
            "collection-table" => FieldStrategy::CollectionTable,
            "relation-collection-table" => FieldStrategy::RelationCollectionTable,
            "relation-collection-inverse-key" => FieldStrategy::RelationCollectionInverseKey,
            "map-table" => FieldStrategy::MapTable,
            "relation-map-table" => FieldStrategy::RelationMapTable,
            "relation-map-inverse-key" => FieldStrategy::RelationMapInverseKey,
            "relation-relation-map-table" => FieldStrategy::RelationRelationMapTable,
            other => return ValueHandler::from_alias(other).map(FieldStrategy::Handler),
        };
        Some(strategy)
    }

    /// Whether values live in a join table keyed by the owner.
    pub fn uses_join_table(&self) -> bool {
        matches!(
            self,
            FieldStrategy::CollectionTable
                | FieldStrategy::RelationCollectionTable
                | FieldStrategy::MapTable
                | FieldStrategy::RelationMapTable
                | FieldStrategy::RelationRelationMapTable
        )
    }

    /// Whether the foreign key lives in the related table.
    pub fn uses_inverse_key(&self) -> bool {
        matches!(
            self,
            FieldStrategy::RelationCollectionInverseKey | FieldStrategy::RelationMapInverseKey
        )
    }

    /// Whether the field holds a map.
    pub fn is_map(&self) -> bool {
        matches!(
            self,
            FieldStrategy::MapTable
                | FieldStrategy::RelationMapTable
                | FieldStrategy::RelationMapInverseKey
                | FieldStrategy::RelationRelationMapTable
        )
    }

    /// Whether the field stores values in columns of the owner's table.
    pub fn is_single_valued(&self) -> bool {
        matches!(
            self,
            FieldStrategy::Primitive
                | FieldStrategy::String
                | FieldStrategy::Lob
                | FieldStrategy::Handler(_)
                | FieldStrategy::Relation
                | FieldStrategy::UntypedRelation
                | FieldStrategy::Serialized
        )
    }
}

impl fmt::Display for FieldStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How optimistic versions are kept.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionStrategy {
    /// No versioning.
    None,
    /// Versioned by the superclass.
    Superclass,
    /// Incrementing number.
    Number,
    /// Timestamp.
    Timestamp,
    /// Compare the loaded state.
    StateComparison,
    /// User-supplied.
    Custom(CustomHandle),
}

impl VersionStrategy {
    /// Name used in records.
    pub fn name(&self) -> &str {
        match self {
            VersionStrategy::None => "none",
            VersionStrategy::Superclass => "superclass",
            VersionStrategy::Number => "version-number",
            VersionStrategy::Timestamp => "timestamp",
            VersionStrategy::StateComparison => "state-comparison",
            VersionStrategy::Custom(handle) => handle.name(),
        }
    }

    /// Built-in strategy for a record name.
    pub fn from_alias(name: &str) -> Option<VersionStrategy> {
        let strategy = match name.to_ascii_lowercase().as_str() {
            "none" => VersionStrategy::None,
            "superclass" => VersionStrategy::Superclass,
            "version-number" | "number" => VersionStrategy::Number,
            "timestamp" => VersionStrategy::Timestamp,
            "state-comparison" => VersionStrategy::StateComparison,
            _ => return None,
        };
        Some(strategy)
    }

    /// Whether the version needs a column of the class table.
    pub fn has_column(&self) -> bool {
        matches!(
            self,
            VersionStrategy::Number | VersionStrategy::Timestamp | VersionStrategy::Custom(_)
        )
    }
}

impl fmt::Display for VersionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the concrete class of a row is recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscriminatorStrategy {
    /// No discriminator.
    None,
    /// Uses the superclass discriminator.
    Superclass,
    /// Class name in a column.
    ClassName,
    /// Per-class values in a column.
    ValueMap,
    /// Inferred from which subclass tables hold a row.
    SubclassJoin,
    /// User-supplied.
    Custom(CustomHandle),
}

impl DiscriminatorStrategy {
    /// Name used in records.
    pub fn name(&self) -> &str {
        match self {
            DiscriminatorStrategy::None => "none",
            DiscriminatorStrategy::Superclass => "superclass",
            DiscriminatorStrategy::ClassName => "class-name",
            DiscriminatorStrategy::ValueMap => "value-map",
            DiscriminatorStrategy::SubclassJoin => "subclass-join",
            DiscriminatorStrategy::Custom(handle) => handle.name(),
        }
    }

    /// Built-in strategy for a record name.
    pub fn from_alias(name: &str) -> Option<DiscriminatorStrategy> {
        let strategy = match name.to_ascii_lowercase().as_str() {
            "none" => DiscriminatorStrategy::None,
            "superclass" => DiscriminatorStrategy::Superclass,
            "class-name" => DiscriminatorStrategy::ClassName,
            "value-map" => DiscriminatorStrategy::ValueMap,
            "subclass-join" => DiscriminatorStrategy::SubclassJoin,
            _ => return None,
        };
        Some(strategy)
    }

    /// Whether the discriminator needs a column of the class table.
    pub fn has_column(&self) -> bool {
        matches!(
            self,
            DiscriminatorStrategy::ClassName
                | DiscriminatorStrategy::ValueMap
                | DiscriminatorStrategy::Custom(_)
        )
    }
}

impl fmt::Display for DiscriminatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_aliases() {
        assert_eq!(ClassStrategy::from_alias("joined"), Some(ClassStrategy::Vertical));
        assert_eq!(ClassStrategy::from_alias("FLAT"), Some(ClassStrategy::Flat));
        assert_eq!(ClassStrategy::from_alias("bogus"), None);
        assert_eq!(ClassStrategy::FullTable.name(), "full");
        assert!(!ClassStrategy::None.is_mapped());
    }

    #[test]
    fn test_field_aliases_include_handlers() {
        assert_eq!(
            FieldStrategy::from_alias("enum-ordinal"),
            Some(FieldStrategy::Handler(ValueHandler::EnumOrdinal))
        );
        assert_eq!(
            FieldStrategy::from_alias("relation-map-inverse-key"),
            Some(FieldStrategy::RelationMapInverseKey)
        );
        assert!(FieldStrategy::RelationMapInverseKey.uses_inverse_key());
        assert!(FieldStrategy::RelationMapTable.uses_join_table());
        assert!(FieldStrategy::RelationMapTable.is_map());
    }

    #[test]
    fn test_names_round_trip_aliases() {
        for strategy in [
            VersionStrategy::Number,
            VersionStrategy::Timestamp,
            VersionStrategy::StateComparison,
        ] {
            assert_eq!(VersionStrategy::from_alias(strategy.name()), Some(strategy));
        }
        for strategy in [
            DiscriminatorStrategy::ClassName,
            DiscriminatorStrategy::ValueMap,
            DiscriminatorStrategy::SubclassJoin,
        ] {
            assert_eq!(DiscriminatorStrategy::from_alias(strategy.name()), Some(strategy));
        }
    }
}
