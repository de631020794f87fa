//! Field-level steps: strategy selection, value columns, embedded values
//! and to-one relations.

use super::{templates, Resolver, Slot};
use crate::defaults::{ColumnRole, IndexRole, JoinRole};
use crate::descriptor::{ClassId, ColumnIo, FieldId, ResolveRequest, ValueMapping};
use crate::error::{Error, Result};
use crate::merge::JoinSpec;
use crate::model::ClassDef;
use crate::raw::{ColumnTemplate, Hint, JoinDirection};
use crate::strategy::select::{self, FieldFacts};
use crate::strategy::{FieldStrategy, ValueHandler};
use ormap_schema::{ColumnId, ForeignKeyId, TableId};
use tracing::debug;

type Selection = (FieldStrategy, Option<ValueHandler>, Option<ValueHandler>);

impl Resolver<'_> {
    /// Resolve one field. Fields already carrying a strategy are left alone.
    pub(crate) fn resolve_field(&mut self, id: FieldId) -> Result<()> {
        if self.graph.field(id).is_resolved() {
            return Ok(());
        }
        self.prepare_related(id)?;
        let (strategy, key_handler, element_handler) = self.select_field_strategy(id)?;
        {
            let field = self.graph.field_mut(id);
            field.strategy = Some(strategy.clone());
            if let Some(key) = field.key.as_mut() {
                key.handler = key_handler;
            }
            if let Some(element) = field.element.as_mut() {
                element.handler = element_handler;
            }
        }
        debug!(field = %self.graph.field_context(id), %strategy, "resolving field");

        match strategy {
            FieldStrategy::None => {
                let context = self.graph.field_context(id);
                let field = self.graph.field(id);
                field.record.base.assert_no_schema_components(&context, false)?;
                field.value.record.base.assert_no_schema_components(&context, false)
            }
            FieldStrategy::Embed => self.map_embedded(id),
            FieldStrategy::Relation => self.map_relation(id),
            s if s.uses_join_table() => self.map_join_table(id),
            s if s.uses_inverse_key() => self.map_inverse_key(id),
            _ => self.map_columns(id),
        }
    }

    fn select_field_strategy(&self, id: FieldId) -> Result<Selection> {
        let graph = &*self.graph;
        let field = graph.field(id);
        let owner = graph.class(field.defining);
        let is_mapped = |name: &str| {
            graph
                .class_id(name)
                .is_some_and(|c| graph.class(c).is_mapped())
        };
        let facts = FieldFacts {
            class: &owner.name,
            owner_unmapped: !owner.is_mapped(),
            def: &field.def,
            record: &field.record,
            model: self.env.model,
            is_mapped: &is_mapped,
        };
        let strategy = select::field_strategy(&facts, self.env.registry, self.env.defaults)?;
        let key = match &field.key {
            Some(key) if strategy.is_map() => {
                select::value_handler(&facts, &key.def, self.env.registry, self.env.defaults)?
            }
            _ => None,
        };
        let element = match &field.element {
            Some(element) if strategy.uses_join_table() || strategy.uses_inverse_key() => {
                select::value_handler(&facts, &element.def, self.env.registry, self.env.defaults)?
            }
            _ => None,
        };
        Ok((strategy, key, element))
    }

    /// Bring every class the field refers to up to its non-relation state,
    /// so its table and key exist before the field maps against them.
    fn prepare_related(&mut self, id: FieldId) -> Result<()> {
        let related: Vec<(Slot, ClassId)> = [Slot::Value, Slot::Key, Slot::Element]
            .into_iter()
            .filter_map(|slot| {
                let value = self.value(id, slot)?;
                if !value.def.is_relation() {
                    return None;
                }
                let class = self.graph.class_id(value.def.related.as_deref()?)?;
                Some((slot, class))
            })
            .collect();
        for (slot, class) in related {
            if !self.is_active(class) {
                self.resolve(class, ResolveRequest::NonRelations)?;
            }
            if let Some(value) = self.value_mut(id, slot) {
                value.related = Some(class);
            }
        }
        Ok(())
    }

    pub(crate) fn value(&self, id: FieldId, slot: Slot) -> Option<&ValueMapping> {
        let field = self.graph.field(id);
        match slot {
            Slot::Value => Some(&field.value),
            Slot::Key => field.key.as_ref(),
            Slot::Element => field.element.as_ref(),
        }
    }

    pub(crate) fn value_mut(&mut self, id: FieldId, slot: Slot) -> Option<&mut ValueMapping> {
        let field = self.graph.field_mut(id);
        match slot {
            Slot::Value => Some(&mut field.value),
            Slot::Key => field.key.as_mut(),
            Slot::Element => field.element.as_mut(),
        }
    }

    /// Table holding a single-valued field: the owner's table, or one of
    /// its secondary tables with the join to it.
    pub(crate) fn field_table(&self, id: FieldId) -> Result<(TableId, Option<ForeignKeyId>)> {
        let field = self.graph.field(id);
        let owner = field.defining;
        let table = self.class_table(owner)?;
        let Some(given) = field.record.table.as_deref() else {
            return Ok((table, None));
        };
        if self.schema.table(table).is_named(given) {
            return Ok((table, None));
        }
        std::iter::once(owner)
            .chain(self.graph.class(owner).ancestors.iter().copied())
            .flat_map(|c| self.graph.class(c).secondary_joins.iter().copied())
            .find(|(t, _)| self.schema.table(*t).is_named(given))
            .map(|(t, fk)| (t, Some(fk)))
            .ok_or_else(|| Error::BadTable {
                context: self.graph.field_context(id),
                table: given.to_string(),
            })
    }

    fn map_columns(&mut self, id: FieldId) -> Result<()> {
        let context = self.graph.field_context(id);
        let field = self.graph.field(id);
        let owner = self.graph.class(field.defining).def.name.clone();
        let strategy = field.strategy.clone().unwrap_or(FieldStrategy::None);
        let mut templates = templates::value(&owner, &field.def, &strategy);
        let record = field.value.record.base.clone();
        let name = field.name.clone();
        record.assert_no_foreign_key(&context, false)?;

        let (table, join) = self.field_table(id)?;
        self.env.defaults.populate_columns(
            ColumnRole::Value { name: &name },
            table,
            &mut templates,
            self.scope(),
        );
        let mut ctx = self.merge(context);
        let (columns, io) = ctx.create_columns(&record, &name, &templates, table)?;
        let role = IndexRole::Value {
            name: &name,
            logical_fk: false,
        };
        let index = ctx.create_index(&record.index, &name, role, &columns)?;
        let unique = ctx.create_unique(&record.unique, &name, &columns)?;

        let field = self.graph.field_mut(id);
        field.table = Some(table);
        field.join_foreign_key = join;
        field.value.columns = columns;
        field.value.io = io;
        field.value.index = index;
        field.value.unique = unique;
        if let FieldStrategy::Handler(handler) = strategy {
            field.value.handler = Some(handler);
        }
        Ok(())
    }

    fn map_embedded(&mut self, id: FieldId) -> Result<()> {
        let (table, join) = self.field_table(id)?;
        let embedded = match self.graph.field(id).value.embedded {
            Some(existing) => existing,
            None => self.add_embedded_class(id, Slot::Value)?,
        };
        self.graph.class_mut(embedded).table = Some(table);
        self.resolve(embedded, ResolveRequest::Relations)?;

        let field = self.graph.field(id);
        let hint = field.record.null_indicator.clone();
        let name = field.name.clone();
        let null_indicator = self.optional_column(
            id,
            &hint,
            templates::null_indicator(&name),
            ColumnRole::NullIndicator { field: &name },
            table,
        )?;

        let field = self.graph.field_mut(id);
        field.table = Some(table);
        field.join_foreign_key = join;
        field.null_indicator = null_indicator;
        Ok(())
    }

    /// Descriptor for an embedded value, named after its owning field.
    ///
    /// Overrides on the value record win; the records of the standalone
    /// class fill in the rest.
    pub(crate) fn add_embedded_class(&mut self, id: FieldId, slot: Slot) -> Result<ClassId> {
        let context = self.graph.field_context(id);
        let value = self
            .value(id, slot)
            .ok_or_else(|| Error::Internal(format!("{}: no {:?} value", context, slot)))?;
        let type_name = value
            .def
            .related
            .clone()
            .unwrap_or_else(|| value.def.type_name.clone());
        let def = self
            .env
            .model
            .class(&type_name)
            .cloned()
            .unwrap_or_else(|| ClassDef::embeddable(type_name.as_str()));
        let mut records = value.record.embedded.as_deref().cloned().unwrap_or_default();
        if let Some(standalone) = self.graph.class_id(&type_name) {
            let own_strategy = records.class.base.strategy.take();
            records.copy_from(&self.graph.class(standalone).records);
            records.class.base.strategy = own_strategy;
        }
        let name = match slot {
            Slot::Value => context,
            Slot::Key => format!("{}.key", context),
            Slot::Element => format!("{}.element", context),
        };
        let embedded = self.graph.add_embedded(name, def, records, id);
        if let Some(value) = self.value_mut(id, slot) {
            value.embedded = Some(embedded);
        }
        Ok(embedded)
    }

    /// Order columns, null indicators and the like: mapped when given,
    /// skipped when refused, and otherwise left to the defaults.
    pub(crate) fn optional_column(
        &mut self,
        id: FieldId,
        hint: &Hint<ColumnTemplate>,
        template: ColumnTemplate,
        role: ColumnRole<'_>,
        table: TableId,
    ) -> Result<Option<ColumnId>> {
        let mut templates = [template];
        let wanted = self
            .env
            .defaults
            .populate_columns(role, table, &mut templates, self.scope());
        let given = match hint {
            Hint::Forbidden => return Ok(None),
            Hint::Explicit(given) => Some(given),
            Hint::Unspecified if wanted && self.lenient() => None,
            Hint::Unspecified => return Ok(None),
        };
        let context = self.graph.field_context(id);
        let prefix = match role {
            ColumnRole::Order { .. } => "order",
            ColumnRole::NullIndicator { .. } => "null-indicator",
            _ => "column",
        };
        let column = self
            .merge(context)
            .merge_column(&templates[0], false, given, table, prefix)?;
        Ok(Some(column))
    }

    fn map_relation(&mut self, id: FieldId) -> Result<()> {
        let context = self.graph.field_context(id);
        let field = self.graph.field(id);
        if let Some(mapped_by) = field
            .def
            .mapped_by
            .clone()
            .or_else(|| field.value.def.mapped_by.clone())
        {
            return self.map_mapped_by(id, &mapped_by);
        }
        let related = field.value.related.ok_or_else(|| {
            Error::Internal(format!("{}: relation without a related class", context))
        })?;
        let defining = field.defining;
        let record = field.value.record.base.clone();
        let name = field.name.clone();
        let owner_class = self.graph.class(defining).def.name.clone();
        let target_class = self.graph.class(related).def.name.clone();

        let (table, _) = self.field_table(id)?;
        let target_columns = self.primary_key_columns(related)?;
        let Some(target) = self.graph.class(related).table.filter(|_| !target_columns.is_empty())
        else {
            return self.defer_foreign_key(id, related);
        };
        let owner_columns = self.primary_key_columns(defining)?;
        let spec = JoinSpec {
            prefix: &name,
            local: table,
            target,
            owner_class: &owner_class,
            target_class: &target_class,
            owner_columns,
            target_columns,
            role: JoinRole::ForeignKey {
                name: &name,
                inverse: false,
            },
            inversable: true,
        };
        let mut ctx = self.merge(context);
        let joined = ctx.create_foreign_key(&record, &spec)?;
        let (index, unique) = if joined.direction == JoinDirection::Forward {
            let logical_fk = ctx.schema.foreign_key(joined.foreign_key).is_logical();
            let role = IndexRole::Value {
                name: &name,
                logical_fk,
            };
            (
                ctx.create_index(&record.index, &name, role, &joined.columns)?,
                ctx.create_unique(&record.unique, &name, &joined.columns)?,
            )
        } else {
            (None, None)
        };

        let field = self.graph.field_mut(id);
        field.table = Some(table);
        field.value.columns = joined.columns;
        field.value.foreign_key = Some(joined.foreign_key);
        field.value.join_direction = joined.direction;
        field.value.io = joined.io;
        field.value.index = index;
        field.value.unique = unique;
        Ok(())
    }

    /// Leave the foreign key for the retry step when the target is still
    /// being mapped further up the stack.
    pub(crate) fn defer_foreign_key(&mut self, id: FieldId, related: ClassId) -> Result<()> {
        let context = self.graph.field_context(id);
        if self.is_active(related) && self.lenient() {
            debug!(field = %context, "target key not mapped yet; deferring foreign key");
            self.graph.field_mut(id).pending_foreign_key = true;
            return Ok(());
        }
        Err(Error::NoPrimaryKey { context })
    }

    /// Field of the related class that owns the join, resolved.
    pub(crate) fn back_reference(
        &mut self,
        id: FieldId,
        related: ClassId,
        mapped_by: &str,
    ) -> Result<FieldId> {
        let back = self.graph.find_field(related, mapped_by).ok_or_else(|| {
            Error::BadMappedBy {
                context: self.graph.field_context(id),
                field: mapped_by.to_string(),
                related: self.graph.class(related).name.clone(),
            }
        })?;
        self.resolve_field(back)?;
        Ok(back)
    }

    fn map_mapped_by(&mut self, id: FieldId, mapped_by: &str) -> Result<()> {
        let context = self.graph.field_context(id);
        let related = self.graph.field(id).value.related.ok_or_else(|| {
            Error::Internal(format!("{}: mapped-by without a related class", context))
        })?;
        let back = self.back_reference(id, related, mapped_by)?;
        let back_field = self.graph.field(back);
        if back_field.pending_foreign_key {
            self.graph.field_mut(id).pending_foreign_key = true;
            return Ok(());
        }
        let foreign_key = back_field.value.foreign_key.ok_or_else(|| Error::BadMappedBy {
            context: context.clone(),
            field: mapped_by.to_string(),
            related: self.graph.class(related).name.clone(),
        })?;
        let table = back_field.table;
        let columns = back_field.value.columns.clone();
        self.graph
            .field(id)
            .value
            .record
            .base
            .assert_no_schema_components(&context, false)?;

        let field = self.graph.field_mut(id);
        field.table = table;
        field.value.io = read_only(columns.len());
        field.value.columns = columns;
        field.value.foreign_key = Some(foreign_key);
        field.value.join_direction = JoinDirection::Inverse;
        Ok(())
    }
}

/// Io for columns another field writes.
pub(crate) fn read_only(count: usize) -> ColumnIo {
    let mut io = ColumnIo::default();
    for i in 0..count {
        io.set_insertable(i, false);
        io.set_updatable(i, false);
    }
    io
}

#[cfg(test)]
mod tests {
    use super::super::tests::Fixture;
    use crate::descriptor::ResolveRequest;
    use crate::error::Error;
    use crate::model::{ClassDef, ClassModel, FieldDef, ValueDef};
    use crate::raw::{
        ClassRecord, ClassRecordSet, ColumnTemplate, FieldRecord, Hint, JoinDirection,
        RecordCatalog,
    };
    use crate::strategy::{FieldStrategy, ValueHandler};
    use ormap_schema::TypeCode;
    use pretty_assertions::assert_eq;

    fn order_model() -> ClassModel {
        ClassModel::new()
            .with_class(
                ClassDef::new("Customer")
                    .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key())
                    .with_field(FieldDef::new("orders", ValueDef::of(TypeCode::Collection))
                        .with_element(ValueDef::relation("Order"))
                        .mapped_by("customer")),
            )
            .with_class(
                ClassDef::new("Order")
                    .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key())
                    .with_field(FieldDef::to_one("customer", "Customer"))
                    .with_field(FieldDef::new("status", ValueDef::enumeration("Status")))
                    .with_field(FieldDef::embedded("shipTo", "Address")),
            )
            .with_class(
                ClassDef::embeddable("Address")
                    .with_field(FieldDef::scalar("street", TypeCode::String))
                    .with_field(FieldDef::scalar("city", TypeCode::String)),
            )
    }

    #[test]
    fn test_relation_creates_foreign_key() {
        let mut fx = Fixture::new(order_model(), RecordCatalog::new());
        fx.resolve("Order", ResolveRequest::Relations).unwrap();
        let customer = fx.field("Order", "customer");
        assert_eq!(customer.strategy, Some(FieldStrategy::Relation));
        assert_eq!(customer.value.join_direction, JoinDirection::Forward);
        let fk = fx.schema.foreign_key(customer.value.foreign_key.unwrap());
        let target = fx.class("Customer").table.unwrap();
        assert_eq!(fx.schema.column(fk.pk_columns()[0]).table, target);
        assert_eq!(fx.schema.column_names(fk.columns()), vec!["customer".to_string()]);
    }

    #[test]
    fn test_enum_field_uses_handler() {
        let mut fx = Fixture::new(order_model(), RecordCatalog::new());
        fx.resolve("Order", ResolveRequest::Relations).unwrap();
        let status = fx.field("Order", "status");
        assert_eq!(
            status.strategy,
            Some(FieldStrategy::Handler(ValueHandler::EnumName))
        );
        assert_eq!(status.value.handler, Some(ValueHandler::EnumName));
        assert_eq!(status.columns().len(), 1);
    }

    #[test]
    fn test_embedded_value_maps_into_owner_table() {
        let mut fx = Fixture::new(order_model(), RecordCatalog::new());
        fx.resolve("Order", ResolveRequest::Relations).unwrap();
        let order_table = fx.class("Order").table.unwrap();
        let ship_to = fx.field("Order", "shipTo");
        let embedded = fx.graph.class(ship_to.value.embedded.unwrap());
        assert_eq!(embedded.name, "Order.shipTo");
        assert_eq!(embedded.table, Some(order_table));
        let street = fx.graph.own_field(embedded.id, "street").unwrap();
        let column = fx.graph.field(street).columns()[0];
        assert_eq!(fx.schema.column(column).table, order_table);
        assert!(ship_to.null_indicator.is_none());
    }

    #[test]
    fn test_explicit_null_indicator() {
        let mut records = RecordCatalog::new();
        let field = FieldRecord {
            null_indicator: Hint::Explicit(ColumnTemplate::new("SHIP_NULL")),
            ..FieldRecord::default()
        };
        records.insert("Order".into(), ClassRecordSet::new().with_field("shipTo", field));
        let mut fx = Fixture::new(order_model(), records);
        fx.resolve("Order", ResolveRequest::Relations).unwrap();
        let indicator = fx.field("Order", "shipTo").null_indicator.unwrap();
        assert_eq!(fx.schema.column(indicator).name.name(), "SHIP_NULL");
    }

    #[test]
    fn test_mapped_by_reuses_back_reference() {
        let mut fx = Fixture::new(order_model(), RecordCatalog::new());
        fx.resolve("Customer", ResolveRequest::Relations).unwrap();
        let orders = fx.field("Customer", "orders");
        assert_eq!(orders.strategy, Some(FieldStrategy::RelationCollectionInverseKey));
        let back = fx.field("Order", "customer");
        assert_eq!(orders.join_foreign_key, back.value.foreign_key);
        assert_eq!(orders.join_direction, JoinDirection::Inverse);
    }

    #[test]
    fn test_bad_mapped_by() {
        let model = ClassModel::new()
            .with_class(
                ClassDef::new("Customer")
                    .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key())
                    .with_field(FieldDef::to_one("latest", "Order").mapped_by("nobody")),
            )
            .with_class(
                ClassDef::new("Order")
                    .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key()),
            );
        let mut fx = Fixture::new(model, RecordCatalog::new());
        let err = fx.resolve("Customer", ResolveRequest::Relations).unwrap_err();
        assert!(matches!(err, Error::BadMappedBy { field, .. } if field == "nobody"));
    }

    #[test]
    fn test_field_in_secondary_table() {
        let mut records = RecordCatalog::new();
        records.insert(
            "Order".into(),
            ClassRecordSet::new()
                .with_class(ClassRecord::default().with_secondary_table(
                    "ORDER_EXTRA",
                    vec![ColumnTemplate::new("ORDER_ID").with_target("id")],
                ))
                .with_field("status", FieldRecord::default().with_table("ORDER_EXTRA")),
        );
        let mut fx = Fixture::new(order_model(), records);
        fx.resolve("Order", ResolveRequest::Relations).unwrap();
        let status = fx.field("Order", "status");
        let table = status.table.unwrap();
        assert_eq!(fx.table_name(table), "ORDER_EXTRA");
        assert!(status.join_foreign_key.is_some());
        assert_eq!(fx.schema.column(status.columns()[0]).table, table);
    }

    #[test]
    fn test_unknown_secondary_table() {
        let mut records = RecordCatalog::new();
        records.insert(
            "Order".into(),
            ClassRecordSet::new()
                .with_field("status", FieldRecord::default().with_table("NOWHERE")),
        );
        let mut fx = Fixture::new(order_model(), records);
        let err = fx.resolve("Order", ResolveRequest::Relations).unwrap_err();
        assert!(matches!(err, Error::BadTable { table, .. } if table == "NOWHERE"));
    }
}
