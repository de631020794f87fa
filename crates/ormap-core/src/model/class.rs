//! Class definitions.

use super::field::FieldDef;
use serde::{Deserialize, Serialize};

/// How instances of a class are identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityType {
    /// Identity comes from primary key fields.
    #[default]
    Application,
    /// Identity is a surrogate value held in dedicated columns.
    Datastore,
    /// Not yet known (embeddables, abstract roots).
    Unknown,
}

/// A persistent class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    /// Fully qualified class name.
    pub name: String,
    /// Persistent superclass.
    #[serde(default)]
    pub superclass: Option<String>,
    /// Identity type.
    #[serde(default)]
    pub identity: IdentityType,
    /// Cannot be instantiated.
    #[serde(default)]
    pub is_abstract: bool,
    /// Cannot be subclassed.
    #[serde(default)]
    pub is_final: bool,
    /// Only ever stored embedded in other classes.
    #[serde(default)]
    pub embedded_only: bool,
    /// Short name used in queries and discriminator values.
    #[serde(default)]
    pub alias: Option<String>,
    /// Declared fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl ClassDef {
    /// Create a class definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            identity: IdentityType::Application,
            is_abstract: false,
            is_final: false,
            embedded_only: false,
            alias: None,
            fields: Vec::new(),
        }
    }

    /// An embeddable class.
    pub fn embeddable(name: impl Into<String>) -> Self {
        Self {
            embedded_only: true,
            identity: IdentityType::Unknown,
            ..Self::new(name)
        }
    }

    /// Set the superclass.
    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Set the identity type.
    pub fn with_identity(mut self, identity: IdentityType) -> Self {
        self.identity = identity;
        self
    }

    /// Mark abstract.
    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Mark final.
    pub fn final_class(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Set the alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Add a field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Get a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Name without package or outer class qualifiers.
    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }

    /// Alias, or the short name when none is set.
    pub fn type_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.short_name())
    }

    /// Declared primary key fields.
    pub fn primary_key_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.primary_key)
    }

    /// Declared version field, if any.
    pub fn version_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.version)
    }
}

/// Strip package qualifiers from a class name.
pub fn short_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormap_schema::TypeCode;

    #[test]
    fn test_names() {
        let class = ClassDef::new("com.acme.Person");
        assert_eq!(class.short_name(), "Person");
        assert_eq!(class.type_alias(), "Person");
        assert_eq!(class.clone().with_alias("P").type_alias(), "P");
        assert_eq!(short_name("Plain"), "Plain");
    }

    #[test]
    fn test_field_queries() {
        let class = ClassDef::new("Person")
            .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key())
            .with_field(FieldDef::scalar("version", TypeCode::Int).version())
            .with_field(FieldDef::scalar("name", TypeCode::String));
        assert_eq!(class.primary_key_fields().count(), 1);
        assert_eq!(class.version_field().map(|f| f.name.as_str()), Some("version"));
        assert!(class.field("name").is_some());
        assert!(class.field("missing").is_none());
    }

    #[test]
    fn test_embeddable() {
        let class = ClassDef::embeddable("Address");
        assert!(class.embedded_only);
        assert_eq!(class.identity, IdentityType::Unknown);
    }
}
