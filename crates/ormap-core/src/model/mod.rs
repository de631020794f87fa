//! Class model: the persistent classes a mapping run resolves.
//!
//! This is the metadata the mapping layer consumes. It describes classes,
//! their fields and the type hierarchy used for handler lookup; it says
//! nothing about tables or columns.

mod class;
mod field;

pub use class::{short_name, ClassDef, IdentityType};
pub use field::{FieldDef, Management, ValueDef};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// The set of persistent classes known to a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassModel {
    classes: Vec<ClassDef>,
    /// Supertype of each declared value type, for handler lookup.
    #[serde(default)]
    supertypes: BTreeMap<String, String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ClassModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a model from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut model: ClassModel = serde_json::from_str(json)?;
        model.reindex();
        Ok(model)
    }

    /// Add a class.
    pub fn with_class(mut self, class: ClassDef) -> Self {
        self.add_class(class);
        self
    }

    /// Add a class, replacing any class of the same name.
    pub fn add_class(&mut self, class: ClassDef) {
        match self.index.get(&class.name) {
            Some(&pos) => self.classes[pos] = class,
            None => {
                self.index.insert(class.name.clone(), self.classes.len());
                self.classes.push(class);
            }
        }
    }

    /// Declare the supertype of a value type.
    pub fn with_supertype(
        mut self,
        type_name: impl Into<String>,
        supertype: impl Into<String>,
    ) -> Self {
        self.supertypes.insert(type_name.into(), supertype.into());
        self
    }

    /// Supertype of a value type, if declared.
    pub fn supertype(&self, type_name: &str) -> Option<&str> {
        self.supertypes.get(type_name).map(String::as_str)
    }

    /// Get a class by name.
    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.index.get(name).map(|&pos| &self.classes[pos])
    }

    /// Get a class by name or fail.
    pub fn require(&self, name: &str) -> Result<&ClassDef> {
        self.class(name)
            .ok_or_else(|| Error::UnknownClass(name.to_string()))
    }

    /// All classes in insertion order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.iter()
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the model has no classes.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Direct subclasses of a class.
    pub fn subclasses(&self, name: &str) -> Vec<&str> {
        self.classes
            .iter()
            .filter(|c| c.superclass.as_deref() == Some(name))
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Superclass chain of a class, nearest first.
    pub fn ancestors(&self, name: &str) -> Result<Vec<String>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(name.to_string());
        let mut current = self.require(name)?;
        while let Some(sup) = &current.superclass {
            if !seen.insert(sup.clone()) {
                return Err(Error::InheritanceCycle(name.to_string()));
            }
            current = self.require(sup)?;
            chain.push(sup.clone());
        }
        Ok(chain)
    }

    fn reindex(&mut self) {
        self.index = self
            .classes
            .iter()
            .enumerate()
            .map(|(pos, c)| (c.name.clone(), pos))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormap_schema::TypeCode;

    fn model() -> ClassModel {
        ClassModel::new()
            .with_class(ClassDef::new("Animal").abstract_class())
            .with_class(ClassDef::new("Dog").with_superclass("Animal"))
            .with_class(ClassDef::new("Puppy").with_superclass("Dog"))
            .with_class(ClassDef::new("Cat").with_superclass("Animal"))
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let model = model();
        assert_eq!(model.ancestors("Puppy").unwrap(), vec!["Dog", "Animal"]);
        assert!(model.ancestors("Animal").unwrap().is_empty());
    }

    #[test]
    fn test_subclasses() {
        let model = model();
        assert_eq!(model.subclasses("Animal"), vec!["Dog", "Cat"]);
        assert!(model.subclasses("Puppy").is_empty());
    }

    #[test]
    fn test_cycle_detected() {
        let model = ClassModel::new()
            .with_class(ClassDef::new("A").with_superclass("B"))
            .with_class(ClassDef::new("B").with_superclass("A"));
        assert!(matches!(model.ancestors("A"), Err(Error::InheritanceCycle(_))));
    }

    #[test]
    fn test_unknown_superclass() {
        let model = ClassModel::new().with_class(ClassDef::new("A").with_superclass("Missing"));
        assert!(
            matches!(model.ancestors("A"), Err(Error::UnknownClass(name)) if name == "Missing")
        );
    }

    #[test]
    fn test_replace_and_supertypes() {
        let mut model = model().with_supertype("Poodle", "Dog");
        model.add_class(ClassDef::new("Cat").with_field(FieldDef::scalar("lives", TypeCode::Int)));
        assert_eq!(model.len(), 4);
        assert!(model.class("Cat").unwrap().superclass.is_none());
        assert_eq!(model.supertype("Poodle"), Some("Dog"));
    }

    #[test]
    fn test_from_json() {
        let model = ClassModel::from_json_str(
            r#"{"classes": [
                {"name": "Person", "fields": [
                    {"name": "id", "value": {"type_name": "long", "code": "long"},
                     "primary_key": true}
                ]}
            ]}"#,
        )
        .unwrap();
        let person = model.class("Person").unwrap();
        assert_eq!(person.primary_key_fields().count(), 1);
    }
}
