//! Arena owning every class and field descriptor.

use super::{ClassId, ClassMapping, FieldId, FieldMapping};
use crate::error::{Error, Result};
use crate::merge::TargetLookup;
use crate::model::{short_name, ClassDef, ClassModel, FieldDef};
use crate::raw::{ClassRecordSet, FieldRecord, RecordCatalog};
use ormap_schema::{ColumnId, TableId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Class and field descriptors, keyed by id, with classes also indexed by
/// name. Embedded value descriptors are not indexed by name.
#[derive(Debug, Clone, Default)]
pub struct MappingGraph {
    classes: Vec<ClassMapping>,
    fields: Vec<FieldMapping>,
    by_name: HashMap<String, ClassId>,
}

impl MappingGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build descriptors for every class of a model and link the hierarchy.
    pub fn from_model(model: &ClassModel, records: &RecordCatalog) -> Result<Self> {
        let mut graph = Self::new();
        for def in model.classes() {
            let set = records.get(&def.name).cloned().unwrap_or_default();
            graph.add_class(def.clone(), set);
        }
        graph.link()?;
        Ok(graph)
    }

    /// Add a class descriptor with a field descriptor per declared field.
    pub fn add_class(&mut self, def: ClassDef, records: ClassRecordSet) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.by_name.insert(def.name.clone(), id);
        self.push_class(ClassMapping::new(id, def, records))
    }

    /// Add a descriptor for a value embedded by a field.
    pub fn add_embedded(
        &mut self,
        name: impl Into<String>,
        def: ClassDef,
        records: ClassRecordSet,
        embedding: FieldId,
    ) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.push_class(ClassMapping::embedded(id, name, def, records, embedding))
    }

    fn push_class(&mut self, mapping: ClassMapping) -> ClassId {
        let id = mapping.id;
        let declared: Vec<FieldDef> = mapping.def.fields.clone();
        let declaring = mapping.def.name.clone();
        let records = mapping.records.clone();
        self.classes.push(mapping);
        for def in declared {
            let record = records.field_or_default(&def.name);
            self.add_field(id, &declaring, def, record);
        }
        id
    }

    /// Add a field descriptor to a class.
    pub fn add_field(
        &mut self,
        class: ClassId,
        declaring: &str,
        def: FieldDef,
        record: FieldRecord,
    ) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        self.fields
            .push(FieldMapping::new(id, class, declaring, def, record));
        self.class_mut(class).fields.push(id);
        id
    }

    /// Resolve superclass links, ancestor lists and subclass lists.
    ///
    /// A superclass missing from the graph is treated as unmapped.
    pub fn link(&mut self) -> Result<()> {
        for pos in 0..self.classes.len() {
            if self.classes[pos].is_embedded() {
                continue;
            }
            let superclass = self.classes[pos]
                .def
                .superclass
                .as_deref()
                .and_then(|name| self.by_name.get(name).copied());
            self.classes[pos].superclass = superclass;
            self.classes[pos].subclasses.clear();
        }

        for pos in 0..self.classes.len() {
            let id = ClassId(pos as u32);
            let mut chain = Vec::new();
            let mut seen = HashSet::from([id]);
            let mut current = self.classes[pos].superclass;
            while let Some(sup) = current {
                if !seen.insert(sup) {
                    return Err(Error::InheritanceCycle(self.classes[pos].name.clone()));
                }
                chain.push(sup);
                current = self.class(sup).superclass;
            }
            if let Some(&parent) = chain.first() {
                self.class_mut(parent).subclasses.push(id);
            }
            self.classes[pos].ancestors = chain;
        }
        debug!(classes = self.classes.len(), fields = self.fields.len(), "linked mapping graph");
        Ok(())
    }

    /// Class by id.
    ///
    /// # Panics
    ///
    /// Panics if the id was not issued by this graph.
    pub fn class(&self, id: ClassId) -> &ClassMapping {
        &self.classes[id.index()]
    }

    /// Mutable class by id.
    ///
    /// # Panics
    ///
    /// Panics if the id was not issued by this graph.
    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassMapping {
        &mut self.classes[id.index()]
    }

    /// Field by id.
    ///
    /// # Panics
    ///
    /// Panics if the id was not issued by this graph.
    pub fn field(&self, id: FieldId) -> &FieldMapping {
        &self.fields[id.index()]
    }

    /// Mutable field by id.
    ///
    /// # Panics
    ///
    /// Panics if the id was not issued by this graph.
    pub fn field_mut(&mut self, id: FieldId) -> &mut FieldMapping {
        &mut self.fields[id.index()]
    }

    /// Id of a named class.
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// Id of a named class or an error.
    pub fn require(&self, name: &str) -> Result<ClassId> {
        self.class_id(name)
            .ok_or_else(|| Error::UnknownClass(name.to_string()))
    }

    /// Every descriptor, embedded ones included.
    pub fn classes(&self) -> impl Iterator<Item = &ClassMapping> {
        self.classes.iter()
    }

    /// Named class descriptors.
    pub fn named_classes(&self) -> impl Iterator<Item = &ClassMapping> {
        self.classes.iter().filter(|c| !c.is_embedded())
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Field descriptors of a class, in order.
    pub fn fields_of(&self, class: ClassId) -> impl Iterator<Item = &FieldMapping> {
        self.class(class).fields.iter().map(|id| self.field(*id))
    }

    /// A field of the class itself, by name.
    pub fn own_field(&self, class: ClassId, name: &str) -> Option<FieldId> {
        self.fields_of(class).find(|f| f.name == name).map(|f| f.id)
    }

    /// A field of the class or, failing that, of its nearest ancestor declaring it.
    pub fn find_field(&self, class: ClassId, name: &str) -> Option<FieldId> {
        std::iter::once(class)
            .chain(self.class(class).ancestors.iter().copied())
            .find_map(|c| self.own_field(c, name))
    }

    /// Superclass whose table this class shares or joins.
    pub fn joinable_superclass(&self, class: ClassId) -> Option<ClassId> {
        let mapping = self.class(class);
        if mapping.joins_superclass() {
            mapping.superclass
        } else {
            None
        }
    }

    /// Nearest mapped ancestor.
    pub fn mapped_superclass(&self, class: ClassId) -> Option<ClassId> {
        self.class(class)
            .ancestors
            .iter()
            .copied()
            .find(|a| self.class(*a).is_mapped())
    }

    /// Class owning a field descriptor.
    pub fn owner_name(&self, field: FieldId) -> &str {
        &self.class(self.field(field).defining).name
    }

    /// `Class.field` for diagnostics.
    pub fn field_context(&self, field: FieldId) -> String {
        format!("{}.{}", self.owner_name(field), self.field(field).name)
    }

    /// Reset a class and its fields to the unresolved state.
    pub fn clear_class(&mut self, class: ClassId) {
        let fields = self.class(class).fields.clone();
        for field in fields {
            let embedded = {
                let mapping = self.field_mut(field);
                mapping.clear();
                mapping.values().filter_map(|v| v.embedded).collect::<Vec<_>>()
            };
            for nested in embedded {
                self.clear_class(nested);
            }
        }
        self.class_mut(class).clear();
    }
}

impl TargetLookup for MappingGraph {
    fn field_columns(&self, class: &str, field: &str) -> Option<(TableId, Vec<ColumnId>)> {
        let class = self.class_id(class)?;
        let field = self.field(self.find_field(class, field)?);
        let table = if field.join_foreign_key.is_some() {
            field.table
        } else {
            self.class(field.defining).table
        }?;
        Some((table, field.value.columns.clone()))
    }

    fn class_matches(&self, class: &str, candidate: &str) -> bool {
        let Some(id) = self.class_id(class) else {
            return false;
        };
        std::iter::once(id)
            .chain(self.class(id).ancestors.iter().copied())
            .map(|c| &self.class(c).def.name)
            .any(|name| name == candidate || short_name(name) == candidate)
    }

    fn joinable_superclass_tables(&self, class: &str) -> Vec<TableId> {
        let mut tables = Vec::new();
        let mut current = self
            .class_id(class)
            .and_then(|id| self.joinable_superclass(id));
        while let Some(sup) = current {
            if let Some(table) = self.class(sup).table {
                tables.push(table);
            }
            current = self.joinable_superclass(sup);
        }
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormap_schema::TypeCode;

    fn model() -> ClassModel {
        ClassModel::new()
            .with_class(
                ClassDef::new("com.acme.Animal")
                    .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key())
                    .with_field(FieldDef::scalar("name", TypeCode::String)),
            )
            .with_class(
                ClassDef::new("com.acme.Dog")
                    .with_superclass("com.acme.Animal")
                    .with_field(FieldDef::scalar("breed", TypeCode::String)),
            )
            .with_class(ClassDef::new("com.acme.Puppy").with_superclass("com.acme.Dog"))
    }

    #[test]
    fn test_link_builds_ancestors() {
        let graph = MappingGraph::from_model(&model(), &RecordCatalog::new()).unwrap();
        let animal = graph.require("com.acme.Animal").unwrap();
        let dog = graph.require("com.acme.Dog").unwrap();
        let puppy = graph.require("com.acme.Puppy").unwrap();
        assert_eq!(graph.class(puppy).ancestors, vec![dog, animal]);
        assert_eq!(graph.class(animal).subclasses, vec![dog]);
        assert_eq!(graph.fields_of(animal).count(), 2);
    }

    #[test]
    fn test_find_field_searches_ancestors() {
        let graph = MappingGraph::from_model(&model(), &RecordCatalog::new()).unwrap();
        let puppy = graph.require("com.acme.Puppy").unwrap();
        let name = graph.find_field(puppy, "name").unwrap();
        assert_eq!(graph.owner_name(name), "com.acme.Animal");
        assert!(graph.own_field(puppy, "name").is_none());
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = MappingGraph::new();
        graph.add_class(ClassDef::new("A").with_superclass("B"), ClassRecordSet::new());
        graph.add_class(ClassDef::new("B").with_superclass("A"), ClassRecordSet::new());
        assert!(matches!(graph.link(), Err(Error::InheritanceCycle(_))));
    }

    #[test]
    fn test_class_matches_by_short_name() {
        let graph = MappingGraph::from_model(&model(), &RecordCatalog::new()).unwrap();
        assert!(graph.class_matches("com.acme.Dog", "Animal"));
        assert!(graph.class_matches("com.acme.Dog", "com.acme.Dog"));
        assert!(!graph.class_matches("com.acme.Animal", "Dog"));
    }
}
