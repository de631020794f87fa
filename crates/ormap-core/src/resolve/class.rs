//! Class-level steps: strategy, tables, primary keys and uniques.

use super::{templates, Resolver};
use crate::defaults::{ColumnRole, JoinRole};
use crate::descriptor::{ClassId, FieldId};
use crate::error::{Error, Result};
use crate::merge::JoinSpec;
use crate::model::IdentityType;
use crate::raw::{Hint, JoinDirection, MappingRecord};
use crate::strategy::select::{self, ClassFacts};
use crate::strategy::ClassStrategy;
use ormap_schema::{ColumnId, PrimaryKey, TableId};
use std::collections::HashMap;
use tracing::{debug, warn};

impl Resolver<'_> {
    pub(super) fn install_strategy(&mut self, class: ClassId) -> Result<()> {
        let strategy = {
            let graph = &*self.graph;
            let mapping = graph.class(class);
            let (embedding_unmapped, object_id) = match mapping.embedding {
                Some(field) => {
                    let field = graph.field(field);
                    (!graph.class(field.defining).is_mapped(), field.def.primary_key)
                }
                None => (false, false),
            };
            let hierarchy_strategy = std::iter::once(class)
                .chain(mapping.ancestors.iter().copied())
                .find_map(|c| graph.class(c).records.class.hierarchy_strategy.as_deref());
            let facts = ClassFacts {
                def: &mapping.def,
                records: &mapping.records,
                embedded: mapping.is_embedded(),
                embedding_unmapped,
                object_id,
                mapped_superclass: graph.mapped_superclass(class).is_some(),
                hierarchy_strategy,
                adapt: self.env.adapt,
            };
            select::class_strategy(&facts, self.env.registry, self.env.defaults)?
        };
        debug!(class = %self.graph.class(class).name, %strategy, "installed class strategy");
        self.graph.class_mut(class).strategy = Some(strategy);
        self.copy_inherited_fields(class);
        Ok(())
    }

    /// A class with its own complete table maps the fields of its ancestors
    /// again. Copies take the class's own record for the field first.
    fn copy_inherited_fields(&mut self, class: ClassId) {
        let mapping = self.graph.class(class);
        if !mapping.is_mapped() || mapping.joins_superclass() || mapping.is_embedded() {
            return;
        }
        let ancestors = mapping.ancestors.clone();
        for ancestor in ancestors {
            let inherited: Vec<FieldId> = self.graph.class(ancestor).fields.clone();
            for id in inherited {
                let source = self.graph.field(id);
                if self.graph.own_field(class, &source.name).is_some() {
                    continue;
                }
                let def = source.def.clone();
                let declaring = source.declaring.clone();
                let mut record = self.graph.class(class).records.field_or_default(&source.name);
                record.copy_from(&source.record);
                self.graph.add_field(class, &declaring, def, record);
            }
        }
    }

    pub(super) fn map_class(&mut self, class: ClassId) -> Result<()> {
        let mapping = self.graph.class(class);
        let name = mapping.name.clone();
        let strategy = mapping.strategy.clone().ok_or_else(|| {
            Error::Internal(format!("{}: no strategy installed before mapping", name))
        })?;
        match strategy {
            ClassStrategy::None => {
                mapping.records.class.base.assert_no_schema_components(&name, false)?;
                if mapping.records.class.table.is_some() {
                    warn!(class = %name, "unmapped class names a table; ignoring");
                }
            }
            ClassStrategy::Embedded | ClassStrategy::ObjectId => {
                if mapping.table.is_none() {
                    return Err(Error::Internal(format!(
                        "{}: embedded class mapped before its owner",
                        name
                    )));
                }
            }
            ClassStrategy::Flat => {
                let table = mapping
                    .ancestors
                    .iter()
                    .find_map(|a| self.graph.class(*a).table)
                    .ok_or_else(|| Error::NoTable {
                        context: name.clone(),
                    })?;
                if let Some(given) = mapping.records.class.table.as_deref() {
                    if !self.schema.table(table).is_named(given) {
                        warn!(
                            class = %name,
                            given,
                            table = %self.schema.table(table).full_name(),
                            "class shares its superclass table; ignoring given table"
                        );
                    }
                }
                self.graph.class_mut(class).table = Some(table);
            }
            ClassStrategy::FullTable | ClassStrategy::Custom(_) => {
                let table = self.create_class_table(class)?;
                if self.effective_identity(class) == IdentityType::Datastore {
                    self.map_datastore_id(class, table)?;
                }
            }
            ClassStrategy::Vertical => {
                let table = self.create_class_table(class)?;
                self.join_superclass(class, table)?;
            }
        }
        Ok(())
    }

    fn create_class_table(&mut self, class: ClassId) -> Result<TableId> {
        let schema = self.class_schema(class);
        let mapping = self.graph.class(class);
        let given = mapping.records.class.table.clone();
        let default = self
            .env
            .defaults
            .table_name(&mapping.def, schema.as_deref(), self.scope());
        let name = mapping.name.clone();
        let table = self
            .merge(name)
            .create_table(given.as_deref(), schema.as_deref(), Some(default))?;
        self.graph.class_mut(class).table = Some(table);
        Ok(table)
    }

    /// Identity type of the hierarchy root.
    fn effective_identity(&self, class: ClassId) -> IdentityType {
        let mapping = self.graph.class(class);
        let root = mapping.ancestors.last().copied().unwrap_or(class);
        self.graph.class(root).def.identity
    }

    fn map_datastore_id(&mut self, class: ClassId, table: TableId) -> Result<()> {
        let mut columns = templates::datastore_id();
        self.env
            .defaults
            .populate_columns(ColumnRole::DatastoreId, table, &mut columns, self.scope());
        let mapping = self.graph.class(class);
        let record = mapping.records.class.base.clone();
        let name = mapping.name.clone();
        let (columns, _) = self
            .merge(name)
            .create_columns(&record, "datastore id", &columns, table)?;
        self.graph.class_mut(class).datastore_id_columns = columns.clone();
        self.install_primary_key(class, table, &columns)
    }

    fn join_superclass(&mut self, class: ClassId, table: TableId) -> Result<()> {
        let mapping = self.graph.class(class);
        let name = mapping.name.clone();
        let sup = mapping
            .superclass
            .ok_or_else(|| Error::Internal(format!("{}: joined class has no superclass", name)))?;
        let record = mapping.records.class.base.clone();
        let target = self.class_table(sup)?;
        let target_columns = self.primary_key_columns(sup)?;
        if target_columns.is_empty() {
            return Err(Error::NoPrimaryKey { context: name });
        }
        let sup_name = self.graph.class(sup).name.clone();
        let spec = JoinSpec {
            prefix: "superclass",
            local: table,
            target,
            owner_class: &name,
            target_class: &sup_name,
            owner_columns: Vec::new(),
            target_columns,
            role: JoinRole::Class,
            inversable: false,
        };
        let joined = self.merge(name.as_str()).create_foreign_key(&record, &spec)?;
        self.graph.class_mut(class).join_foreign_key = Some(joined.foreign_key);
        self.install_primary_key(class, table, &joined.columns)
    }

    /// Give a table without a primary key one over the class's identity
    /// columns. Physical only while adapting, logical otherwise.
    pub(super) fn install_primary_key(
        &mut self,
        class: ClassId,
        table: TableId,
        columns: &[ColumnId],
    ) -> Result<()> {
        if columns.is_empty() || !self.schema.primary_key_columns(table).is_empty() {
            return Ok(());
        }
        if let Some(stray) = columns.iter().find(|c| self.schema.column(**c).table != table) {
            return Err(Error::Internal(format!(
                "{}: primary key column {} outside table {}",
                self.graph.class(class).name,
                self.schema.column_name(*stray),
                self.schema.table(table).full_name()
            )));
        }
        let mapping = self.graph.class(class);
        let name = mapping.records.class.primary_key_name.clone().or_else(|| {
            self.env
                .defaults
                .primary_key_name(&mapping.def, table, self.scope())
        });
        let name = name.map(|n| self.env.dict.valid_primary_key_name(&n, table, &*self.schema));
        let mut pk = if self.env.adapt {
            PrimaryKey::new(columns.to_vec())
        } else {
            PrimaryKey::logical(columns.to_vec())
        };
        if let Some(name) = name {
            pk = pk.with_name(name);
        }
        debug!(
            class = %mapping.name,
            table = %self.schema.table(table).full_name(),
            logical = pk.logical,
            "installed primary key"
        );
        self.schema.set_primary_key(table, pk);
        Ok(())
    }

    pub(super) fn resolve_primary_key_fields(&mut self, class: ClassId) -> Result<()> {
        let key_fields: Vec<FieldId> = self
            .graph
            .fields_of(class)
            .filter(|f| f.def.primary_key)
            .map(|f| f.id)
            .collect();
        for field in key_fields {
            self.resolve_field(field)?;
        }

        let mapping = self.graph.class(class);
        if matches!(
            mapping.strategy,
            Some(ClassStrategy::FullTable) | Some(ClassStrategy::Custom(_))
        ) {
            let table = self.class_table(class)?;
            let columns = self.primary_key_columns(class)?;
            self.install_primary_key(class, table, &columns)?;
        }
        self.resolve_secondary_tables(class)
    }

    /// Join each named secondary table to the class table over the class key.
    fn resolve_secondary_tables(&mut self, class: ClassId) -> Result<()> {
        let mapping = self.graph.class(class);
        if mapping.records.class.secondary_tables.is_empty() || !mapping.is_mapped() {
            return Ok(());
        }
        let name = mapping.name.clone();
        let secondary = mapping.records.class.secondary_tables.clone();
        let schema = self.class_schema(class);
        let table = self.class_table(class)?;
        let target_columns = self.primary_key_columns(class)?;
        if target_columns.is_empty() {
            return Err(Error::NoPrimaryKey { context: name });
        }

        let mut joins = Vec::with_capacity(secondary.len());
        for (secondary_name, columns) in secondary {
            let record = MappingRecord {
                columns,
                ..MappingRecord::default()
            };
            let context = format!("{}<{}>", name, secondary_name);
            let mut ctx = self.merge(context);
            let local = ctx.create_table(Some(secondary_name.as_str()), schema.as_deref(), None)?;
            let spec = JoinSpec {
                prefix: "secondary",
                local,
                target: table,
                owner_class: &name,
                target_class: &name,
                owner_columns: Vec::new(),
                target_columns: target_columns.clone(),
                role: JoinRole::Class,
                inversable: false,
            };
            let joined = ctx.create_foreign_key(&record, &spec)?;
            joins.push((local, joined.foreign_key));
        }
        self.graph.class_mut(class).secondary_joins = joins;
        Ok(())
    }

    pub(super) fn resolve_fields(&mut self, class: ClassId, relations: bool) -> Result<()> {
        let fields: Vec<FieldId> = self.graph.class(class).fields.clone();
        for id in fields {
            let field = self.graph.field(id);
            if field.is_resolved() || (!relations && field.def.involves_relation()) {
                continue;
            }
            self.resolve_field(id)?;
        }
        Ok(())
    }

    /// Fields whose target key was not available when they were first mapped
    /// get one more try now that every related class has mapped its table.
    pub(super) fn retry_pending(&mut self, class: ClassId) -> Result<()> {
        let pending: Vec<FieldId> = self
            .graph
            .fields_of(class)
            .filter(|f| f.pending_foreign_key)
            .map(|f| f.id)
            .collect();
        if pending.is_empty() {
            return Ok(());
        }
        for id in pending {
            debug!(field = %self.graph.field_context(id), "retrying deferred foreign key");
            self.graph.field_mut(id).clear();
            self.resolve_field(id)?;
            if self.graph.field(id).pending_foreign_key {
                return Err(Error::NoPrimaryKey {
                    context: self.graph.field_context(id),
                });
            }
        }
        self.graph.class_mut(class).invalidate();
        Ok(())
    }

    /// Record on each column whether some field writes it directly or
    /// through a foreign key. Columns nobody can write are flagged.
    pub(super) fn mark_column_io(&mut self, class: ClassId) {
        let mut paths: HashMap<ColumnId, (bool, bool, bool)> = HashMap::new();
        for field in self.graph.fields_of(class) {
            for value in field.values() {
                if value.join_direction == JoinDirection::Inverse {
                    continue;
                }
                let through_fk = value.foreign_key.is_some();
                for (i, col) in value.columns.iter().enumerate() {
                    let entry = paths.entry(*col).or_insert((through_fk, false, false));
                    entry.1 |= value.io.is_insertable(i);
                    entry.2 |= value.io.is_updatable(i);
                }
            }
        }
        for (col, (through_fk, insert, update)) in paths {
            let Some(column) = self.schema.try_column(col) else {
                continue;
            };
            let mut flags = column.flags;
            if through_fk {
                flags.fk_insert |= insert;
                flags.fk_update |= update;
            } else {
                flags.direct_insert |= insert;
                flags.direct_update |= update;
            }
            flags.uninsertable = !(flags.direct_insert || flags.fk_insert);
            flags.unupdatable = !(flags.direct_update || flags.fk_update);
            self.schema.column_mut(col).flags = flags;
        }
    }

    pub(super) fn resolve_uniques(&mut self, class: ClassId) -> Result<()> {
        let mapping = self.graph.class(class);
        let given = mapping.records.class.uniques.clone();
        if given.is_empty() {
            return Ok(());
        }
        let name = mapping.name.clone();
        let table = self.class_table(class)?;
        let mut uniques = Vec::with_capacity(given.len());
        let mut ctx = self.merge(name);
        for template in given {
            let columns = ctx.named_columns(table, &template.columns)?;
            if let Some(id) = ctx.create_unique(&Hint::Explicit(template), "unique", &columns)? {
                uniques.push(id);
            }
        }
        self.graph.class_mut(class).uniques = uniques;
        Ok(())
    }
}
