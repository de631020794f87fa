//! Resolved descriptors back to records.
//!
//! The records written here reproduce the same mapping when installed and
//! resolved again. Anything the merge would derive on its own is left out.

use crate::defaults::{ColumnRole, IndexRole, MappingDefaults, NamingScope};
use crate::descriptor::{ClassId, ClassMapping, ColumnIo, FieldMapping, MappingGraph, ValueMapping};
use crate::merge::sync::{sync_column, sync_columns, sync_foreign_key, sync_index, sync_unique};
use crate::raw::{
    ClassRecord, ClassRecordSet, ColumnTemplate, DiscriminatorRecord, FieldRecord, Hint,
    JoinDirection, MappingRecord, UniqueTemplate, ValueRecord, VersionRecord,
};
use crate::resolve::templates::{self, ELEMENT_COLUMN, KEY_COLUMN};
use crate::strategy::{ClassStrategy, DiscriminatorStrategy, FieldStrategy, VersionStrategy};
use ormap_schema::{ColumnId, DbDictionary, IndexId, SchemaGroup, TableId, TypeCode, UniqueId};

pub(crate) struct Resync<'a> {
    graph: &'a MappingGraph,
    schema: &'a SchemaGroup,
    dict: &'a DbDictionary,
    defaults: &'a dyn MappingDefaults,
}

impl<'a> Resync<'a> {
    pub(crate) fn new(
        graph: &'a MappingGraph,
        schema: &'a SchemaGroup,
        dict: &'a DbDictionary,
        defaults: &'a dyn MappingDefaults,
    ) -> Self {
        Self {
            graph,
            schema,
            dict,
            defaults,
        }
    }

    fn scope(&self) -> NamingScope<'a> {
        NamingScope::new(self.schema, self.dict)
    }

    /// Records for a class and every resolved field of it.
    pub(crate) fn class(&self, id: ClassId) -> ClassRecordSet {
        let mapping = self.graph.class(id);
        let mut out = ClassRecordSet::new()
            .with_class(self.class_record(mapping))
            .with_version(self.version_record(mapping))
            .with_discriminator(self.discriminator_record(mapping));
        for field in self.graph.fields_of(id) {
            if field.is_resolved() {
                out.fields.insert(field.name.clone(), self.field_record(field));
            }
        }
        out
    }

    fn class_record(&self, mapping: &ClassMapping) -> ClassRecord {
        let mut out = ClassRecord {
            hierarchy_strategy: mapping.records.class.hierarchy_strategy.clone(),
            primary_key_name: mapping.records.class.primary_key_name.clone(),
            ..ClassRecord::default()
        };
        let Some(strategy) = mapping.strategy.as_ref() else {
            return out;
        };
        if !mapping.is_embedded() {
            out.base.strategy = Some(strategy.name().to_string());
        }
        let Some(table) = mapping.table else {
            return out;
        };
        if matches!(
            strategy,
            ClassStrategy::FullTable | ClassStrategy::Vertical | ClassStrategy::Custom(_)
        ) {
            let t = self.schema.table(table);
            out.table = Some(t.name.name().to_string());
            out.schema.clone_from(&t.schema);
        }

        let scope = self.scope();
        if !mapping.datastore_id_columns.is_empty() {
            let mut given = templates::datastore_id();
            self.defaults
                .populate_columns(ColumnRole::DatastoreId, table, &mut given, scope);
            out.base.columns = sync_columns(
                scope,
                &mapping.datastore_id_columns,
                table,
                &given,
                &ColumnIo::default(),
            );
        }
        if let Some(fk) = mapping.join_foreign_key {
            if let Some(target) = self.schema.foreign_key_target_table(fk) {
                let default = self.defaults.join_foreign_key(table, target);
                let (columns, hint) = sync_foreign_key(
                    scope,
                    fk,
                    table,
                    target,
                    default.as_ref(),
                    &ColumnIo::default(),
                );
                out.base.columns = columns;
                out.base.foreign_key = hint;
            }
        }
        for (secondary, fk) in &mapping.secondary_joins {
            let (columns, _) =
                sync_foreign_key(scope, *fk, *secondary, table, None, &ColumnIo::default());
            out.secondary_tables
                .insert(self.schema.table(*secondary).full_name(), columns);
        }
        out.uniques = self.unique_templates(&mapping.uniques);
        out
    }

    fn version_record(&self, mapping: &ClassMapping) -> VersionRecord {
        let version = &mapping.version;
        let mut base = MappingRecord::default();
        let Some(strategy) = version.strategy.as_ref() else {
            return VersionRecord { base };
        };
        base.strategy = Some(strategy.name().to_string());
        if let (true, Some(table)) = (strategy.has_column(), mapping.table) {
            if !matches!(strategy, VersionStrategy::Superclass) {
                let mut given = templates::version(&mapping.def, strategy);
                self.class_columns(
                    &mut base,
                    ColumnRole::Version,
                    IndexRole::Version,
                    table,
                    &mut given,
                    &version.columns,
                    version.index,
                    &version.io,
                );
            }
        }
        VersionRecord { base }
    }

    fn discriminator_record(&self, mapping: &ClassMapping) -> DiscriminatorRecord {
        let discriminator = &mapping.discriminator;
        let mut base = MappingRecord::default();
        let Some(strategy) = discriminator.strategy.as_ref() else {
            return DiscriminatorRecord { base, value: None };
        };
        base.strategy = Some(strategy.name().to_string());
        if let (true, Some(table)) = (strategy.has_column(), mapping.table) {
            let mut given = templates::discriminator(&mapping.def, strategy);
            self.class_columns(
                &mut base,
                ColumnRole::Discriminator,
                IndexRole::Discriminator,
                table,
                &mut given,
                &discriminator.columns,
                discriminator.index,
                &discriminator.io,
            );
        }
        let value = match self.effective_discriminator(mapping.id) {
            Some(DiscriminatorStrategy::ValueMap) => discriminator.value.clone(),
            _ => None,
        };
        DiscriminatorRecord { base, value }
    }

    /// Strategy whose value rules apply: subclasses sharing the root's
    /// column follow the root.
    fn effective_discriminator(&self, class: ClassId) -> Option<&'a DiscriminatorStrategy> {
        let mut current = class;
        loop {
            let strategy = self.graph.class(current).discriminator.strategy.as_ref()?;
            if !matches!(strategy, DiscriminatorStrategy::Superclass) {
                return Some(strategy);
            }
            current = self.graph.joinable_superclass(current)?;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn class_columns(
        &self,
        base: &mut MappingRecord,
        role: ColumnRole<'_>,
        index_role: IndexRole<'_>,
        table: TableId,
        given: &mut [ColumnTemplate],
        columns: &[ColumnId],
        index: Option<IndexId>,
        io: &ColumnIo,
    ) {
        let scope = self.scope();
        self.defaults.populate_columns(role, table, given, scope);
        base.columns = sync_columns(scope, columns, table, given, io);
        let default = self.defaults.index(index_role, table, columns, scope);
        base.index = sync_index(scope, index, default.as_ref());
    }

    fn field_record(&self, field: &FieldMapping) -> FieldRecord {
        let mut out = FieldRecord::default();
        let Some(strategy) = field.strategy.as_ref() else {
            return out;
        };
        if matches!(strategy, FieldStrategy::None | FieldStrategy::Custom(_)) {
            out.base.strategy = Some(strategy.name().to_string());
        }
        let Some(table) = field.table else {
            return out;
        };
        let own_mapped_by = field.def.mapped_by.is_some();
        let reuses_back_field = match strategy {
            FieldStrategy::Relation => own_mapped_by || field.value.def.mapped_by.is_some(),
            s if s.uses_join_table() => own_mapped_by && field.record.table.is_none(),
            s if s.uses_inverse_key() => {
                own_mapped_by
                    || field
                        .element
                        .as_ref()
                        .is_some_and(|e| e.def.mapped_by.is_some())
            }
            _ => false,
        };

        match strategy {
            FieldStrategy::None => {}
            _ if reuses_back_field => {
                if strategy.uses_inverse_key() && !strategy.is_map() {
                    out.order_column = self.order_column(field, table);
                }
            }
            FieldStrategy::Embed => {
                self.secondary_table(field, table, &mut out);
                if let Some(embedded) = field.value.embedded {
                    out.value.embedded = Some(Box::new(self.class(embedded)));
                }
                let mut given = [templates::null_indicator(&field.name)];
                let wanted = self.defaults.populate_columns(
                    ColumnRole::NullIndicator { field: &field.name },
                    table,
                    &mut given,
                    self.scope(),
                );
                out.null_indicator = self.optional(field.null_indicator, &given[0], wanted, table);
            }
            FieldStrategy::Relation => {
                self.secondary_table(field, table, &mut out);
                out.value = self.relation_value(&field.name, &field.value, table);
            }
            s if s.uses_join_table() => self.join_table(field, table, &mut out),
            s if s.uses_inverse_key() => self.inverse_key(field, table, &mut out),
            _ => {
                self.secondary_table(field, table, &mut out);
                let owner = &self.graph.class(field.defining).def.name;
                let mut given = templates::value(owner, &field.def, strategy);
                out.value = self.value_columns(&field.name, &field.value, table, &mut given);
            }
        }
        out
    }

    fn secondary_table(&self, field: &FieldMapping, table: TableId, out: &mut FieldRecord) {
        if field.join_foreign_key.is_some() {
            out.table = Some(self.schema.table(table).full_name());
        }
    }

    /// Columns of a value stored directly, with their index and unique.
    fn value_columns(
        &self,
        name: &str,
        value: &ValueMapping,
        table: TableId,
        given: &mut [ColumnTemplate],
    ) -> ValueRecord {
        let scope = self.scope();
        self.defaults
            .populate_columns(ColumnRole::Value { name }, table, given, scope);
        let mut out = ValueRecord::default();
        out.base.columns = sync_columns(scope, &value.columns, table, given, &value.io);
        let role = IndexRole::Value {
            name,
            logical_fk: false,
        };
        let default = self.defaults.index(role, table, &value.columns, scope);
        out.base.index = sync_index(scope, value.index, default.as_ref());
        let default = self.defaults.unique(table, &value.columns);
        out.base.unique = sync_unique(scope, value.unique, default.as_ref());
        out
    }

    /// Foreign key of a relation value, from either side.
    fn relation_value(&self, name: &str, value: &ValueMapping, table: TableId) -> ValueRecord {
        let mut out = ValueRecord::default();
        let Some(fk) = value.foreign_key else {
            return out;
        };
        let scope = self.scope();
        if value.join_direction == JoinDirection::Inverse {
            let (columns, hint) = sync_foreign_key(scope, fk, table, table, None, &value.io);
            out.base.columns = columns;
            out.base.foreign_key = hint;
            out.base.join_direction = JoinDirection::Inverse;
            return out;
        }
        let Some(target) = self.schema.foreign_key_target_table(fk) else {
            return out;
        };
        let default = self.defaults.foreign_key(name, table, target, false);
        let (columns, hint) =
            sync_foreign_key(scope, fk, table, target, default.as_ref(), &value.io);
        out.base.columns = columns;
        out.base.foreign_key = hint;

        let role = IndexRole::Value {
            name,
            logical_fk: self.schema.foreign_key(fk).is_logical(),
        };
        let default = self.defaults.index(role, table, &value.columns, scope);
        out.base.index = sync_index(scope, value.index, default.as_ref());
        let default = self.defaults.unique(table, &value.columns);
        out.base.unique = sync_unique(scope, value.unique, default.as_ref());
        out
    }

    fn join_table(&self, field: &FieldMapping, table: TableId, out: &mut FieldRecord) {
        let scope = self.scope();
        out.table = Some(self.schema.table(table).full_name());
        if let (Some(join), Some(owner_table)) =
            (field.join_foreign_key, self.graph.class(field.defining).table)
        {
            let default = self.defaults.join_foreign_key(table, owner_table);
            let (columns, hint) =
                sync_foreign_key(scope, join, table, owner_table, default.as_ref(), &field.join_io);
            out.base.columns = columns;
            out.base.foreign_key = hint;
        }
        let owner = self.graph.owner_name(field.id);
        if let Some(element) = field.element.as_ref() {
            out.element = self.container_value(owner, ELEMENT_COLUMN, element, table);
        }
        if let Some(key) = field.key.as_ref() {
            out.key = self.container_value(owner, KEY_COLUMN, key, table);
        }
        if !field.strategy.as_ref().is_some_and(FieldStrategy::is_map) {
            out.order_column = self.order_column(field, table);
        }
        out.join_table_uniques = self.unique_templates(&field.join_table_uniques);
    }

    fn container_value(
        &self,
        owner: &str,
        label: &str,
        value: &ValueMapping,
        table: TableId,
    ) -> ValueRecord {
        if let Some(embedded) = value.embedded {
            return ValueRecord::default().with_embedded(self.class(embedded));
        }
        if value.foreign_key.is_some() {
            return self.relation_value(label, value, table);
        }
        let mut given = templates::element(owner, label, &value.def, value.handler.as_ref());
        self.value_columns(label, value, table, &mut given)
    }

    fn inverse_key(&self, field: &FieldMapping, table: TableId, out: &mut FieldRecord) {
        let scope = self.scope();
        if let (Some(join), Some(owner_table)) =
            (field.join_foreign_key, self.graph.class(field.defining).table)
        {
            let default = self.defaults.foreign_key(&field.name, table, owner_table, true);
            let (columns, hint) =
                sync_foreign_key(scope, join, table, owner_table, default.as_ref(), &field.join_io);
            out.element.base.columns = columns;
            out.element.base.foreign_key = hint;
            let role = IndexRole::Join {
                logical_fk: self.schema.foreign_key(join).is_logical(),
            };
            let default = self.defaults.index(role, table, &field.value.columns, scope);
            out.element.base.index = sync_index(scope, field.value.index, default.as_ref());
        }
        match field.key.as_ref() {
            Some(key) if key.def.mapped_by.is_none() => {
                let owner = self.graph.owner_name(field.id);
                let mut given =
                    templates::element(owner, KEY_COLUMN, &key.def, key.handler.as_ref());
                self.defaults.populate_columns(
                    ColumnRole::Value { name: KEY_COLUMN },
                    table,
                    &mut given,
                    scope,
                );
                out.key.base.columns = sync_columns(scope, &key.columns, table, &given, &key.io);
            }
            Some(_) => {}
            None => out.order_column = self.order_column(field, table),
        }
    }

    fn order_column(&self, field: &FieldMapping, table: TableId) -> Hint<ColumnTemplate> {
        let ordered = field.def.ordered || field.def.value.code == TypeCode::Array;
        let mut given = [templates::order(&field.name)];
        let wanted = self.defaults.populate_columns(
            ColumnRole::Order {
                field: &field.name,
                ordered,
            },
            table,
            &mut given,
            self.scope(),
        );
        self.optional(field.order_column, &given[0], wanted, table)
    }

    /// An optional column: given when mapped, refused when the defaults
    /// would have added it.
    fn optional(
        &self,
        column: Option<ColumnId>,
        template: &ColumnTemplate,
        wanted: bool,
        table: TableId,
    ) -> Hint<ColumnTemplate> {
        match column {
            Some(column) => {
                Hint::Explicit(sync_column(self.scope(), column, table, Some(template)))
            }
            None if wanted => Hint::Forbidden,
            None => Hint::Unspecified,
        }
    }

    fn unique_templates(&self, uniques: &[UniqueId]) -> Vec<UniqueTemplate> {
        uniques
            .iter()
            .map(|id| {
                let unique = self.schema.unique(*id);
                UniqueTemplate {
                    name: unique.name.as_ref().map(|n| n.name().to_string()),
                    columns: self.schema.column_names(&unique.columns),
                    deferred: unique.deferred,
                }
            })
            .collect()
    }
}
