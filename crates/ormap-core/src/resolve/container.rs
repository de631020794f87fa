//! Containers: join tables and inverse foreign keys.

use super::field::read_only;
use super::templates::{self, ELEMENT_COLUMN, KEY_COLUMN};
use super::{Resolver, Slot};
use crate::defaults::{ColumnRole, IndexRole, JoinRole};
use crate::descriptor::{ClassId, FieldId, ResolveRequest};
use crate::error::{Error, Result};
use crate::merge::JoinSpec;
use crate::raw::{Hint, JoinDirection};
use crate::strategy::FieldStrategy;
use ormap_schema::{TableId, TypeCode};
use tracing::debug;

impl Resolver<'_> {
    /// Collection or map stored in its own table, joined to the owner.
    pub(super) fn map_join_table(&mut self, id: FieldId) -> Result<()> {
        let context = self.graph.field_context(id);
        let field = self.graph.field(id);
        let defining = field.defining;
        let name = field.name.clone();
        let is_map = field.strategy.as_ref().is_some_and(FieldStrategy::is_map);
        let ordered = field.def.ordered || field.def.value.code == TypeCode::Array;
        let record = field.record.clone();
        let owner_class = self.graph.class(defining).def.name.clone();
        if record.table.is_none() {
            let related = field.element.as_ref().and_then(|e| e.related);
            if let (Some(mapped_by), Some(related)) = (field.def.mapped_by.clone(), related) {
                return self.map_mapped_join_table(id, related, &mapped_by);
            }
        }

        let owner_table = self.class_table(defining)?;
        let owner_columns = self.primary_key_columns(defining)?;
        if owner_columns.is_empty() {
            return Err(Error::NoPrimaryKey { context });
        }
        let schema = self.class_schema(defining);
        let owner_name = self.schema.table(owner_table).name.name().to_string();
        let default = self.env.defaults.join_table_name(
            Some(&owner_name),
            &name,
            schema.as_deref(),
            self.scope(),
        );

        let mut ctx = self.merge(context.clone());
        let table = ctx.create_table(record.table.as_deref(), schema.as_deref(), Some(default))?;
        let spec = JoinSpec {
            prefix: &name,
            local: table,
            target: owner_table,
            owner_class: &owner_class,
            target_class: &owner_class,
            owner_columns: owner_columns.clone(),
            target_columns: owner_columns,
            role: JoinRole::Field,
            inversable: false,
        };
        let joined = ctx.create_foreign_key(&record.base, &spec)?;
        record.base.assert_no_index(&context, false)?;
        debug!(field = %context, table = %ctx.schema.table(table).full_name(), "mapped join table");

        let field = self.graph.field_mut(id);
        field.table = Some(table);
        field.join_foreign_key = Some(joined.foreign_key);
        field.join_direction = joined.direction;
        field.join_io = joined.io.clone();
        field.value.columns = joined.columns;
        field.value.io = joined.io;

        self.map_container_value(id, Slot::Element, table)?;
        if is_map {
            self.map_container_value(id, Slot::Key, table)?;
        } else {
            let role = ColumnRole::Order {
                field: &name,
                ordered,
            };
            let order = self.optional_column(
                id,
                &record.order_column,
                templates::order(&name),
                role,
                table,
            )?;
            self.graph.field_mut(id).order_column = order;
        }

        let mut uniques = Vec::with_capacity(record.join_table_uniques.len());
        let mut ctx = self.merge(context);
        for template in record.join_table_uniques {
            let columns = ctx.named_columns(table, &template.columns)?;
            if let Some(unique) =
                ctx.create_unique(&Hint::Explicit(template), "join-table", &columns)?
            {
                uniques.push(unique);
            }
        }
        self.graph.field_mut(id).join_table_uniques = uniques;
        Ok(())
    }

    /// The far side of a relation that already maps the join table: its
    /// element key joins us and its join key holds our elements.
    fn map_mapped_join_table(
        &mut self,
        id: FieldId,
        related: ClassId,
        mapped_by: &str,
    ) -> Result<()> {
        let context = self.graph.field_context(id);
        let back = self.back_reference(id, related, mapped_by)?;
        let theirs = self.graph.field(back);
        if theirs.pending_foreign_key {
            self.graph.field_mut(id).pending_foreign_key = true;
            return Ok(());
        }
        let joins_table = theirs
            .strategy
            .as_ref()
            .is_some_and(FieldStrategy::uses_join_table);
        let their_element = theirs
            .element
            .as_ref()
            .and_then(|e| e.foreign_key.map(|fk| (fk, e.columns.clone())));
        let (true, Some(table), Some(join), Some((element_fk, element_columns))) =
            (joins_table, theirs.table, theirs.join_foreign_key, their_element)
        else {
            return Err(Error::BadMappedBy {
                context,
                field: mapped_by.to_string(),
                related: self.graph.class(related).name.clone(),
            });
        };
        let join_columns = theirs.value.columns.clone();
        debug!(field = %context, "sharing join table of {}", mapped_by);

        let field = self.graph.field_mut(id);
        field.table = Some(table);
        field.join_foreign_key = Some(element_fk);
        field.join_direction = JoinDirection::Forward;
        field.join_io = read_only(element_columns.len());
        field.value.io = read_only(element_columns.len());
        field.value.columns = element_columns;
        if let Some(element) = field.element.as_mut() {
            element.io = read_only(join_columns.len());
            element.columns = join_columns;
            element.foreign_key = Some(join);
            element.join_direction = JoinDirection::Forward;
        }
        Ok(())
    }

    /// Element or key columns inside a join table.
    fn map_container_value(&mut self, id: FieldId, slot: Slot, table: TableId) -> Result<()> {
        let label = match slot {
            Slot::Key => KEY_COLUMN,
            _ => ELEMENT_COLUMN,
        };
        let context = format!("{}.{}", self.graph.field_context(id), label.to_lowercase());
        let owner_class = self.graph.owner_name(id).to_string();
        let Some(value) = self.value(id, slot) else {
            return Ok(());
        };
        let def = value.def.clone();
        let record = value.record.clone();
        let handler = value.handler.clone();
        let existing = value.embedded;
        let related = value
            .related
            .filter(|r| handler.is_none() && def.is_relation() && self.graph.class(*r).is_mapped());

        if let Some(related) = related {
            let target = self.class_table(related)?;
            let target_columns = self.primary_key_columns(related)?;
            if target_columns.is_empty() {
                return self.defer_foreign_key(id, related);
            }
            let target_class = self.graph.class(related).def.name.clone();
            let spec = JoinSpec {
                prefix: label,
                local: table,
                target,
                owner_class: &owner_class,
                target_class: &target_class,
                owner_columns: Vec::new(),
                target_columns,
                role: JoinRole::ForeignKey {
                    name: label,
                    inverse: false,
                },
                inversable: false,
            };
            let mut ctx = self.merge(context);
            let joined = ctx.create_foreign_key(&record.base, &spec)?;
            let logical_fk = ctx.schema.foreign_key(joined.foreign_key).is_logical();
            let role = IndexRole::Value {
                name: label,
                logical_fk,
            };
            let index = ctx.create_index(&record.base.index, label, role, &joined.columns)?;
            if let Some(value) = self.value_mut(id, slot) {
                value.columns = joined.columns;
                value.foreign_key = Some(joined.foreign_key);
                value.join_direction = JoinDirection::Forward;
                value.io = joined.io;
                value.index = index;
            }
        } else if def.is_embedded() {
            let embedded = match existing {
                Some(existing) => existing,
                None => self.add_embedded_class(id, slot)?,
            };
            self.graph.class_mut(embedded).table = Some(table);
            self.resolve(embedded, ResolveRequest::Relations)?;
        } else {
            let mut templates = templates::element(&owner_class, label, &def, handler.as_ref());
            self.env.defaults.populate_columns(
                ColumnRole::Value { name: label },
                table,
                &mut templates,
                self.scope(),
            );
            let mut ctx = self.merge(context);
            let (columns, io) = ctx.create_columns(&record.base, label, &templates, table)?;
            let role = IndexRole::Value {
                name: label,
                logical_fk: false,
            };
            let index = ctx.create_index(&record.base.index, label, role, &columns)?;
            let unique = ctx.create_unique(&record.base.unique, label, &columns)?;
            if let Some(value) = self.value_mut(id, slot) {
                value.columns = columns;
                value.io = io;
                value.index = index;
                value.unique = unique;
            }
        }
        Ok(())
    }

    /// Collection or map of related objects whose table holds a key back to
    /// the owner.
    pub(super) fn map_inverse_key(&mut self, id: FieldId) -> Result<()> {
        let context = self.graph.field_context(id);
        let field = self.graph.field(id);
        let defining = field.defining;
        let name = field.name.clone();
        let is_map = field.strategy.as_ref().is_some_and(FieldStrategy::is_map);
        let ordered = field.def.ordered || field.def.value.code == TypeCode::Array;
        let record = field.record.clone();
        let element = field
            .element
            .as_ref()
            .ok_or_else(|| Error::Internal(format!("{}: container without element", context)))?;
        let related = element.related.ok_or_else(|| {
            Error::Internal(format!("{}: inverse key without a related class", context))
        })?;
        let mapped_by = field
            .def
            .mapped_by
            .clone()
            .or_else(|| element.def.mapped_by.clone());
        let key_mapped_by = field.key.as_ref().and_then(|k| k.def.mapped_by.clone());

        let related_table = self.class_table(related)?;
        let related_columns = self.primary_key_columns(related)?;
        if let Some(mapped_by) = mapped_by {
            let back = self.back_reference(id, related, &mapped_by)?;
            let back_field = self.graph.field(back);
            if back_field.pending_foreign_key {
                self.graph.field_mut(id).pending_foreign_key = true;
                return Ok(());
            }
            let foreign_key = back_field.value.foreign_key.ok_or_else(|| Error::BadMappedBy {
                context: context.clone(),
                field: mapped_by.clone(),
                related: self.graph.class(related).name.clone(),
            })?;
            let columns = back_field.value.columns.clone();
            record.element.base.assert_no_join(&context, false)?;

            let field = self.graph.field_mut(id);
            field.join_io = read_only(columns.len());
            field.value.io = read_only(columns.len());
            field.value.columns = columns;
            field.join_foreign_key = Some(foreign_key);
        } else {
            let owner_table = self.class_table(defining)?;
            let owner_columns = self.primary_key_columns(defining)?;
            if owner_columns.is_empty() {
                return Err(Error::NoPrimaryKey { context });
            }
            let owner_class = self.graph.class(defining).def.name.clone();
            let related_class = self.graph.class(related).def.name.clone();
            let spec = JoinSpec {
                prefix: &name,
                local: related_table,
                target: owner_table,
                owner_class: &related_class,
                target_class: &owner_class,
                owner_columns: Vec::new(),
                target_columns: owner_columns,
                role: JoinRole::ForeignKey {
                    name: &name,
                    inverse: true,
                },
                inversable: false,
            };
            let mut ctx = self.merge(context.clone());
            let joined = ctx.create_foreign_key(&record.element.base, &spec)?;
            let logical_fk = ctx.schema.foreign_key(joined.foreign_key).is_logical();
            let index = ctx.create_index(
                &record.element.base.index,
                &name,
                IndexRole::Join { logical_fk },
                &joined.columns,
            )?;

            let field = self.graph.field_mut(id);
            field.join_io = joined.io.clone();
            field.join_foreign_key = Some(joined.foreign_key);
            field.value.columns = joined.columns;
            field.value.io = joined.io;
            field.value.index = index;
        }

        let field = self.graph.field_mut(id);
        field.table = Some(related_table);
        field.join_direction = JoinDirection::Inverse;
        field.value.join_direction = JoinDirection::Inverse;
        if let Some(element) = field.element.as_mut() {
            element.columns = related_columns;
            element.join_direction = JoinDirection::Inverse;
        }

        if is_map {
            self.map_inverse_key_column(id, related, related_table, key_mapped_by.as_deref())?;
        } else {
            let role = ColumnRole::Order {
                field: &name,
                ordered,
            };
            let order = self.optional_column(
                id,
                &record.order_column,
                templates::order(&name),
                role,
                related_table,
            )?;
            self.graph.field_mut(id).order_column = order;
        }
        Ok(())
    }

    /// Map key of an inverse-key map: a field of the related class, or a
    /// column of its own in the related table.
    fn map_inverse_key_column(
        &mut self,
        id: FieldId,
        related: ClassId,
        related_table: TableId,
        mapped_by: Option<&str>,
    ) -> Result<()> {
        if let Some(mapped_by) = mapped_by {
            let back = self.back_reference(id, related, mapped_by)?;
            let columns = self.graph.field(back).value.columns.clone();
            if let Some(key) = self.graph.field_mut(id).key.as_mut() {
                key.io = read_only(columns.len());
                key.columns = columns;
                key.join_direction = JoinDirection::Inverse;
            }
            return Ok(());
        }
        let context = format!("{}.key", self.graph.field_context(id));
        let owner_class = self.graph.owner_name(id).to_string();
        let Some(key) = self.value(id, Slot::Key) else {
            return Ok(());
        };
        let record = key.record.base.clone();
        let mut templates =
            templates::element(&owner_class, KEY_COLUMN, &key.def, key.handler.as_ref());
        self.env.defaults.populate_columns(
            ColumnRole::Value { name: KEY_COLUMN },
            related_table,
            &mut templates,
            self.scope(),
        );
        let (columns, io) =
            self.merge(context)
                .create_columns(&record, KEY_COLUMN, &templates, related_table)?;
        if let Some(key) = self.graph.field_mut(id).key.as_mut() {
            key.columns = columns;
            key.io = io;
            key.join_direction = JoinDirection::Inverse;
        }
        Ok(())
    }
}
