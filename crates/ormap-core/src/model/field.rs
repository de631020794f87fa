//! Field and value definitions.

use ormap_schema::TypeCode;
use serde::{Deserialize, Serialize};

/// How a field is managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Management {
    /// Stored in the database.
    #[default]
    Persistent,
    /// Tracked in memory but never stored.
    Transactional,
    /// Ignored.
    None,
}

/// The type of a field value, map key or collection element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDef {
    /// Declared type name, used for handler lookup.
    pub type_name: String,
    /// Semantic category.
    pub code: TypeCode,
    /// Related persistent or embeddable class.
    #[serde(default)]
    pub related: Option<String>,
    /// Stored inline in the owner's table.
    #[serde(default)]
    pub embedded: bool,
    /// Stored in serialized form.
    #[serde(default)]
    pub serialized: bool,
    /// Stored as a large object.
    #[serde(default)]
    pub lob: bool,
    /// For map keys: the field of the value class the key is read from.
    #[serde(default)]
    pub mapped_by: Option<String>,
}

impl ValueDef {
    /// A value of a built-in type.
    pub fn of(code: TypeCode) -> Self {
        Self::named(code.type_name(), code)
    }

    /// A value with an explicit type name.
    pub fn named(type_name: impl Into<String>, code: TypeCode) -> Self {
        Self {
            type_name: type_name.into(),
            code,
            related: None,
            embedded: false,
            serialized: false,
            lob: false,
            mapped_by: None,
        }
    }

    /// A reference to a persistent class.
    pub fn relation(class: impl Into<String>) -> Self {
        let class = class.into();
        Self {
            related: Some(class.clone()),
            ..Self::named(class, TypeCode::Pc)
        }
    }

    /// A reference to a persistent object of unknown type.
    pub fn untyped_relation() -> Self {
        Self::of(TypeCode::PcUntyped)
    }

    /// An embedded instance of an embeddable class.
    pub fn embedded(class: impl Into<String>) -> Self {
        Self {
            embedded: true,
            ..Self::relation(class)
        }
    }

    /// An enum type.
    pub fn enumeration(type_name: impl Into<String>) -> Self {
        Self::named(type_name, TypeCode::Enum)
    }

    /// Mark as serialized.
    pub fn serialized(mut self) -> Self {
        self.serialized = true;
        self
    }

    /// Mark as a large object.
    pub fn lob(mut self) -> Self {
        self.lob = true;
        self
    }

    /// Set the value-class field a map key is read from.
    pub fn with_mapped_by(mut self, field: impl Into<String>) -> Self {
        self.mapped_by = Some(field.into());
        self
    }

    /// Reference to a persistent class stored by foreign key.
    pub fn is_relation(&self) -> bool {
        self.code.is_relation() && !self.embedded
    }

    /// Embedded instance of a known class.
    pub fn is_embedded(&self) -> bool {
        self.embedded && self.related.is_some()
    }
}

/// A persistent attribute of a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name (unique within its class).
    pub name: String,
    /// Field type.
    pub value: ValueDef,
    /// Map key type.
    #[serde(default)]
    pub key: Option<ValueDef>,
    /// Collection, array or map value type.
    #[serde(default)]
    pub element: Option<ValueDef>,
    /// Part of the application identity.
    #[serde(default)]
    pub primary_key: bool,
    /// Holds the optimistic lock version.
    #[serde(default)]
    pub version: bool,
    /// Management mode.
    #[serde(default)]
    pub management: Management,
    /// Field of the related class that owns this relation.
    #[serde(default)]
    pub mapped_by: Option<String>,
    /// Keeps its elements in insertion order.
    #[serde(default)]
    pub ordered: bool,
}

impl FieldDef {
    /// Create a field.
    pub fn new(name: impl Into<String>, value: ValueDef) -> Self {
        Self {
            name: name.into(),
            value,
            key: None,
            element: None,
            primary_key: false,
            version: false,
            management: Management::Persistent,
            mapped_by: None,
            ordered: false,
        }
    }

    /// A field of a built-in type.
    pub fn scalar(name: impl Into<String>, code: TypeCode) -> Self {
        Self::new(name, ValueDef::of(code))
    }

    /// A single-valued relation.
    pub fn to_one(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self::new(name, ValueDef::relation(class))
    }

    /// A collection of related objects.
    pub fn to_many(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self::new(name, ValueDef::of(TypeCode::Collection)).with_element(ValueDef::relation(class))
    }

    /// A collection of values.
    pub fn collection(name: impl Into<String>, element: ValueDef) -> Self {
        Self::new(name, ValueDef::of(TypeCode::Collection)).with_element(element)
    }

    /// A map.
    pub fn map(name: impl Into<String>, key: ValueDef, value: ValueDef) -> Self {
        Self::new(name, ValueDef::of(TypeCode::Map))
            .with_key(key)
            .with_element(value)
    }

    /// An embedded value.
    pub fn embedded(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self::new(name, ValueDef::embedded(class))
    }

    /// Set the map key type.
    pub fn with_key(mut self, key: ValueDef) -> Self {
        self.key = Some(key);
        self
    }

    /// Set the element type.
    pub fn with_element(mut self, element: ValueDef) -> Self {
        self.element = Some(element);
        self
    }

    /// Mark as part of the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as the version field.
    pub fn version(mut self) -> Self {
        self.version = true;
        self
    }

    /// Set the owning field of the related class.
    pub fn mapped_by(mut self, field: impl Into<String>) -> Self {
        self.mapped_by = Some(field.into());
        self
    }

    /// Mark as ordered.
    pub fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }

    /// Set the management mode.
    pub fn with_management(mut self, management: Management) -> Self {
        self.management = management;
        self
    }

    /// Stored in the database.
    pub fn is_persistent(&self) -> bool {
        self.management == Management::Persistent
    }

    /// Single-valued reference to a persistent class.
    pub fn is_to_one(&self) -> bool {
        self.value.is_relation()
    }

    /// Collection, array or map.
    pub fn is_container(&self) -> bool {
        self.value.code.is_container()
    }

    /// Whether mapping this field depends on another class's mapping.
    pub fn involves_relation(&self) -> bool {
        self.value.is_relation()
            || self.key.as_ref().is_some_and(ValueDef::is_relation)
            || self.element.as_ref().is_some_and(ValueDef::is_relation)
            || self.mapped_by.is_some()
    }

    /// Element type, or a placeholder object type for untyped containers.
    pub fn element_or_object(&self) -> ValueDef {
        self.element
            .clone()
            .unwrap_or_else(|| ValueDef::of(TypeCode::Object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kinds() {
        assert!(ValueDef::relation("Address").is_relation());
        assert!(!ValueDef::embedded("Address").is_relation());
        assert!(ValueDef::embedded("Address").is_embedded());
        assert!(ValueDef::untyped_relation().is_relation());
        assert_eq!(ValueDef::of(TypeCode::Int).type_name, "int");
    }

    #[test]
    fn test_relation_detection() {
        assert!(FieldDef::to_one("owner", "Person").involves_relation());
        assert!(FieldDef::to_many("items", "Item").involves_relation());
        assert!(!FieldDef::scalar("age", TypeCode::Int).involves_relation());
        assert!(!FieldDef::embedded("home", "Address").involves_relation());
        let keyed = FieldDef::map(
            "byName",
            ValueDef::of(TypeCode::String),
            ValueDef::relation("Item"),
        );
        assert!(keyed.involves_relation());
        assert!(keyed.is_container());
    }

    #[test]
    fn test_management() {
        let field = FieldDef::scalar("cache", TypeCode::String)
            .with_management(Management::Transactional);
        assert!(!field.is_persistent());
    }
}
