//! Read-only copy of resolved mappings.

use crate::descriptor::{ClassMapping, FieldMapping, MappingGraph};
use ormap_schema::{ColumnId, SchemaGroup, TableId};

/// The descriptor graph and schema as they stood when the snapshot was taken.
#[derive(Debug, Clone)]
pub struct MappingSnapshot {
    graph: MappingGraph,
    schema: SchemaGroup,
}

impl MappingSnapshot {
    pub(crate) fn new(graph: MappingGraph, schema: SchemaGroup) -> Self {
        Self { graph, schema }
    }

    /// Descriptor graph.
    pub fn graph(&self) -> &MappingGraph {
        &self.graph
    }

    /// Schema.
    pub fn schema(&self) -> &SchemaGroup {
        &self.schema
    }

    /// A class descriptor by name.
    pub fn class(&self, name: &str) -> Option<&ClassMapping> {
        self.graph.class_id(name).map(|id| self.graph.class(id))
    }

    /// A field descriptor, looked up through superclasses.
    pub fn field(&self, class: &str, field: &str) -> Option<&FieldMapping> {
        let class = self.graph.class_id(class)?;
        self.graph
            .find_field(class, field)
            .map(|id| self.graph.field(id))
    }

    /// Full name of a table.
    pub fn table_name(&self, table: TableId) -> String {
        self.schema.table(table).full_name()
    }

    /// Table of a class.
    pub fn class_table(&self, class: &str) -> Option<String> {
        self.class(class)?.table.map(|t| self.table_name(t))
    }

    /// `TABLE.COLUMN` names of some columns.
    pub fn column_names(&self, columns: &[ColumnId]) -> Vec<String> {
        columns.iter().map(|c| self.schema.column_name(*c)).collect()
    }

    /// Columns a field maps to in its own table.
    pub fn field_columns(&self, class: &str, field: &str) -> Vec<String> {
        self.field(class, field)
            .map(|f| self.column_names(f.columns()))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::MappingCatalog;
    use crate::config::MappingConfig;
    use crate::model::{ClassDef, ClassModel, FieldDef};
    use ormap_schema::{SchemaGroup, TypeCode};

    #[test]
    fn test_snapshot_is_detached() {
        let model = ClassModel::new().with_class(
            ClassDef::new("Item")
                .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key())
                .with_field(FieldDef::scalar("label", TypeCode::String)),
        );
        let catalog =
            MappingCatalog::new(model, SchemaGroup::new(), MappingConfig::adapting()).unwrap();
        let before = catalog.snapshot();
        catalog.resolve("Item").unwrap();
        let after = catalog.snapshot();

        assert!(before.class("Item").unwrap().table.is_none());
        assert_eq!(after.class_table("Item").as_deref(), Some("Item"));
        assert_eq!(after.field_columns("Item", "label"), vec!["Item.label".to_string()]);
        assert!(after.field("Item", "missing").is_none());
    }
}
