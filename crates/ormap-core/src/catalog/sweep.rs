//! Drop schema components no resolved mapping refers to.

use crate::descriptor::{ClassMapping, FieldMapping, MappingGraph, ResolveState, ValueMapping};
use ormap_schema::{ColumnId, ForeignKeyId, SchemaGroup, SweepReport};
use tracing::debug;

/// Count every component a resolved class or field uses, then remove the
/// rest.
pub(crate) fn sweep(graph: &MappingGraph, schema: &mut SchemaGroup) -> SweepReport {
    schema.clear_refs();
    for class in graph.classes() {
        if class.state < ResolveState::NonRelationResolved {
            continue;
        }
        ref_class(class, schema);
        for field in graph.fields_of(class.id) {
            if field.is_resolved() && !field.is_unmapped() {
                ref_field(field, schema);
            }
        }
    }
    let report = schema.sweep_unreferenced();
    debug!(
        tables = report.tables.len(),
        columns = report.columns.len(),
        foreign_keys = report.foreign_keys.len(),
        "swept schema"
    );
    report
}

fn ref_class(class: &ClassMapping, schema: &mut SchemaGroup) {
    if let Some(table) = class.table {
        if schema.try_table(table).is_some() {
            schema.ref_table(table);
        }
    }
    ref_columns(&class.datastore_id_columns, schema);
    ref_fk(class.join_foreign_key, schema);
    for (table, fk) in &class.secondary_joins {
        if schema.try_table(*table).is_some() {
            schema.ref_table(*table);
        }
        ref_fk(Some(*fk), schema);
    }
    for unique in &class.uniques {
        schema.ref_unique(*unique);
    }

    ref_columns(&class.version.columns, schema);
    if let Some(index) = class.version.index {
        schema.ref_index(index);
    }
    ref_columns(&class.discriminator.columns, schema);
    if let Some(index) = class.discriminator.index {
        schema.ref_index(index);
    }
}

fn ref_field(field: &FieldMapping, schema: &mut SchemaGroup) {
    if let Some(table) = field.table {
        if schema.try_table(table).is_some() {
            schema.ref_table(table);
        }
    }
    ref_fk(field.join_foreign_key, schema);
    for value in field.values() {
        ref_value(value, schema);
    }
    if let Some(order) = field.order_column {
        ref_columns(&[order], schema);
    }
    if let Some(indicator) = field.null_indicator {
        ref_columns(&[indicator], schema);
    }
    for unique in &field.join_table_uniques {
        schema.ref_unique(*unique);
    }
}

fn ref_value(value: &ValueMapping, schema: &mut SchemaGroup) {
    ref_columns(&value.columns, schema);
    ref_fk(value.foreign_key, schema);
    if let Some(index) = value.index {
        schema.ref_index(index);
    }
    if let Some(unique) = value.unique {
        schema.ref_unique(unique);
    }
}

fn ref_columns(columns: &[ColumnId], schema: &mut SchemaGroup) {
    for column in columns {
        if schema.try_column(*column).is_some() {
            schema.ref_column(*column);
        }
    }
}

fn ref_fk(fk: Option<ForeignKeyId>, schema: &mut SchemaGroup) {
    if let Some(fk) = fk.filter(|fk| schema.try_foreign_key(*fk).is_some()) {
        schema.ref_foreign_key(fk);
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::MappingCatalog;
    use crate::config::MappingConfig;
    use crate::descriptor::ResolveState;
    use crate::model::{ClassDef, ClassModel, FieldDef};
    use ormap_schema::{SchemaGroup, SqlType, TypeCode};

    fn model() -> ClassModel {
        ClassModel::new().with_class(
            ClassDef::new("Person")
                .final_class()
                .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key())
                .with_field(FieldDef::scalar("name", TypeCode::String)),
        )
    }

    #[test]
    fn test_unused_created_table_removed() {
        let catalog =
            MappingCatalog::new(model(), SchemaGroup::new(), MappingConfig::adapting()).unwrap();
        catalog.resolve("Person").unwrap();
        catalog.clear_mapping("Person").unwrap();
        let report = catalog.sweep_unused_components();
        assert_eq!(report.tables, vec!["Person".to_string()]);
        assert!(catalog.schema().find_table_by_name("Person").is_none());
    }

    #[test]
    fn test_mapped_components_survive() {
        let mut schema = SchemaGroup::new();
        let person = schema.add_table(None, "Person");
        schema.add_typed_column(person, "id", SqlType::BigInt);
        schema.add_typed_column(person, "name", SqlType::Varchar);
        schema.add_typed_column(person, "LEGACY", SqlType::Varchar);
        let catalog = MappingCatalog::new(model(), schema, MappingConfig::adapting()).unwrap();
        catalog.resolve("Person").unwrap();

        let report = catalog.sweep_unused_components();
        assert!(report.tables.is_empty());
        assert_eq!(report.columns.len(), 1);
        assert!(report.columns[0].ends_with("LEGACY"));

        let schema = catalog.schema();
        let table = schema.find_table_by_name("Person").unwrap();
        assert!(schema.find_column(table, "name").is_some());
        assert!(schema.find_column(table, "LEGACY").is_none());
    }

    #[test]
    fn test_partly_resolved_relation_target_survives() {
        let model = ClassModel::new()
            .with_class(
                ClassDef::new("Customer")
                    .final_class()
                    .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key())
                    .with_field(FieldDef::scalar("name", TypeCode::String)),
            )
            .with_class(
                ClassDef::new("Order")
                    .final_class()
                    .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key())
                    .with_field(FieldDef::to_one("customer", "Customer")),
            );
        let catalog =
            MappingCatalog::new(model, SchemaGroup::new(), MappingConfig::adapting()).unwrap();
        catalog.resolve("Order").unwrap();
        assert_eq!(
            catalog.class_state("Customer").unwrap(),
            ResolveState::NonRelationResolved
        );

        let report = catalog.sweep_unused_components();
        assert!(report.is_empty(), "{report:?}");

        catalog.resolve("Customer").unwrap();
        let snapshot = catalog.snapshot();
        assert_eq!(
            snapshot.field_columns("Customer", "name"),
            vec!["Customer.name".to_string()]
        );
        let version = &snapshot.class("Customer").unwrap().version;
        assert!(version.columns.iter().all(|c| snapshot.schema().try_column(*c).is_some()));
        assert!(catalog.sync_mapping_info("Customer").is_ok());
    }
}
