//! Version and discriminator columns of a class.

use super::{templates, Resolver};
use crate::defaults::{ColumnRole, IndexRole};
use crate::descriptor::{ClassId, ColumnIo};
use crate::error::{Error, Result};
use crate::raw::MappingRecord;
use crate::strategy::select::{self, DiscriminatorFacts, VersionFacts};
use crate::strategy::{DiscriminatorStrategy, VersionStrategy};
use ormap_schema::{ColumnId, IndexId, TypeCode};
use tracing::debug;

type Columns = (Vec<ColumnId>, Option<IndexId>, ColumnIo);

impl Resolver<'_> {
    pub(super) fn resolve_version(&mut self, class: ClassId) -> Result<()> {
        let strategy = {
            let graph = &*self.graph;
            let mapping = graph.class(class);
            let facts = VersionFacts {
                def: &mapping.def,
                records: &mapping.records,
                embedded: mapping.is_embedded(),
                unmapped: !mapping.is_mapped(),
                joinable_superclass: graph.joinable_superclass(class).is_some(),
                adapt: self.env.adapt,
                fill: self.env.defaults.default_missing_info(),
            };
            select::version_strategy(&facts, self.env.registry, self.env.defaults)?
        };
        let mapping = self.graph.class(class);
        let context = format!("{}.<version>", mapping.name);
        let record = mapping.version.record.base.clone();

        let (columns, index, io) = match &strategy {
            VersionStrategy::Superclass => {
                record.assert_no_schema_components(&context, false)?;
                let sup = self.graph.joinable_superclass(class).ok_or_else(|| {
                    Error::Internal(format!("{}: no superclass version to share", context))
                })?;
                let version = &self.graph.class(sup).version;
                (version.columns.clone(), version.index, version.io.clone())
            }
            s if s.has_column() => {
                let templates = templates::version(&mapping.def, s);
                self.map_class_columns(
                    class,
                    context,
                    &record,
                    templates,
                    ColumnRole::Version,
                    IndexRole::Version,
                )?
            }
            _ => {
                record.assert_no_schema_components(&context, false)?;
                (Vec::new(), None, ColumnIo::default())
            }
        };
        debug!(class = %self.graph.class(class).name, %strategy, "resolved version");

        let version = &mut self.graph.class_mut(class).version;
        version.strategy = Some(strategy);
        version.columns = columns;
        version.index = index;
        version.io = io;
        Ok(())
    }

    pub(super) fn resolve_discriminator(&mut self, class: ClassId) -> Result<()> {
        let strategy = {
            let graph = &*self.graph;
            let mapping = graph.class(class);
            let facts = DiscriminatorFacts {
                def: &mapping.def,
                records: &mapping.records,
                embedded: mapping.is_embedded(),
                unmapped: !mapping.is_mapped(),
                mapped_superclass: graph.mapped_superclass(class).is_some(),
                joinable_superclass: graph.joinable_superclass(class).is_some(),
                has_subclasses: !mapping.subclasses.is_empty(),
                adapt: self.env.adapt,
                fill: self.env.defaults.default_missing_info(),
            };
            select::discriminator_strategy(&facts, self.env.registry, self.env.defaults)?
        };
        let mapping = self.graph.class(class);
        let context = format!("{}.<discriminator>", mapping.name);
        let record = mapping.discriminator.record.base.clone();

        let (columns, index, io) = match &strategy {
            DiscriminatorStrategy::Superclass => {
                record.assert_no_schema_components(&context, false)?;
                let sup = self.graph.joinable_superclass(class).ok_or_else(|| {
                    Error::Internal(format!("{}: no superclass discriminator to share", context))
                })?;
                let discriminator = &self.graph.class(sup).discriminator;
                (
                    discriminator.columns.clone(),
                    discriminator.index,
                    discriminator.io.clone(),
                )
            }
            s if s.has_column() => {
                let templates = templates::discriminator(&mapping.def, s);
                self.map_class_columns(
                    class,
                    context.clone(),
                    &record,
                    templates,
                    ColumnRole::Discriminator,
                    IndexRole::Discriminator,
                )?
            }
            _ => {
                record.assert_no_schema_components(&context, false)?;
                (Vec::new(), None, ColumnIo::default())
            }
        };
        let value = self.discriminator_value(class, &strategy, &columns, &context)?;
        debug!(class = %self.graph.class(class).name, %strategy, ?value, "resolved discriminator");

        let discriminator = &mut self.graph.class_mut(class).discriminator;
        discriminator.strategy = Some(strategy);
        discriminator.columns = columns;
        discriminator.index = index;
        discriminator.io = io;
        discriminator.value = value;
        Ok(())
    }

    /// Value written for rows of this class. Subclasses sharing the root's
    /// column follow the root's strategy.
    fn discriminator_value(
        &self,
        class: ClassId,
        strategy: &DiscriminatorStrategy,
        columns: &[ColumnId],
        context: &str,
    ) -> Result<Option<String>> {
        let mut effective = strategy;
        let mut current = class;
        while matches!(effective, DiscriminatorStrategy::Superclass) {
            let Some(sup) = self.graph.joinable_superclass(current) else {
                break;
            };
            match self.graph.class(sup).discriminator.strategy.as_ref() {
                Some(s) => effective = s,
                None => break,
            }
            current = sup;
        }

        let mapping = self.graph.class(class);
        let given = mapping.discriminator.record.value.clone();
        match effective {
            DiscriminatorStrategy::ClassName => Ok(Some(mapping.def.name.clone())),
            DiscriminatorStrategy::ValueMap => {
                if given.is_some() {
                    return Ok(given);
                }
                let code = columns
                    .first()
                    .and_then(|c| self.schema.try_column(*c))
                    .map_or(TypeCode::String, |c| c.type_code);
                match self
                    .env
                    .defaults
                    .discriminator_value(&mapping.def, code, self.env.adapt)
                {
                    Some(value) => Ok(Some(value)),
                    None if mapping.def.is_abstract => Ok(None),
                    None => Err(Error::NoDiscriminatorValue {
                        context: context.to_string(),
                    }),
                }
            }
            _ => Ok(given),
        }
    }

    /// Version or discriminator columns in the class table, with their index.
    fn map_class_columns(
        &mut self,
        class: ClassId,
        context: String,
        record: &MappingRecord,
        mut templates: Vec<crate::raw::ColumnTemplate>,
        role: ColumnRole<'_>,
        index_role: IndexRole<'_>,
    ) -> Result<Columns> {
        let table = self.class_table(class)?;
        let prefix = match role {
            ColumnRole::Version => "version",
            _ => "discriminator",
        };
        self.env
            .defaults
            .populate_columns(role, table, &mut templates, self.scope());
        let mut ctx = self.merge(context);
        let (columns, io) = ctx.create_columns(record, prefix, &templates, table)?;
        let index = ctx.create_index(&record.index, prefix, index_role, &columns)?;
        Ok((columns, index, io))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{person_model, Fixture};
    use crate::descriptor::ResolveRequest;
    use crate::error::Error;
    use crate::model::{ClassDef, ClassModel, FieldDef};
    use crate::raw::{
        ClassRecord, ClassRecordSet, ColumnTemplate, DiscriminatorRecord, MappingRecord,
        RecordCatalog, VersionRecord,
    };
    use crate::strategy::{DiscriminatorStrategy, VersionStrategy};
    use ormap_schema::{SchemaGroup, SqlType, TypeCode};
    use pretty_assertions::assert_eq;

    fn shape_model() -> ClassModel {
        ClassModel::new()
            .with_class(
                ClassDef::new("Shape")
                    .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key()),
            )
            .with_class(
                ClassDef::new("Circle")
                    .with_superclass("Shape")
                    .with_field(FieldDef::scalar("radius", TypeCode::Double)),
            )
    }

    fn flat_circle() -> RecordCatalog {
        let mut records = RecordCatalog::new();
        records.insert(
            "Circle".into(),
            ClassRecordSet::new().with_class(ClassRecord::default().with_strategy("flat")),
        );
        records
    }

    #[test]
    fn test_version_field_selects_number() {
        let model = ClassModel::new().with_class(
            ClassDef::new("Doc")
                .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key())
                .with_field(FieldDef::scalar("rev", TypeCode::Long).version()),
        );
        let mut fx = Fixture::new(model, RecordCatalog::new());
        fx.resolve("Doc", ResolveRequest::NonRelations).unwrap();
        let version = &fx.class("Doc").version;
        assert_eq!(version.strategy, Some(VersionStrategy::Number));
        assert_eq!(fx.schema.column(version.columns[0]).name.name(), "VERSN");
        assert_eq!(fx.schema.column(version.columns[0]).type_code, TypeCode::Long);
    }

    #[test]
    fn test_subclass_shares_superclass_columns() {
        let mut fx = Fixture::new(shape_model(), flat_circle());
        fx.resolve("Circle", ResolveRequest::NonRelations).unwrap();
        let shape = fx.class("Shape");
        let circle = fx.class("Circle");
        assert_eq!(circle.version.strategy, Some(VersionStrategy::Superclass));
        assert_eq!(circle.version.columns, shape.version.columns);
        assert_eq!(
            circle.discriminator.strategy,
            Some(DiscriminatorStrategy::Superclass)
        );
        assert_eq!(circle.discriminator.columns, shape.discriminator.columns);
        assert_eq!(shape.discriminator.value.as_deref(), Some("Shape"));
        assert_eq!(circle.discriminator.value.as_deref(), Some("Circle"));
    }

    #[test]
    fn test_value_map_uses_given_value() {
        let mut records = flat_circle();
        records.insert(
            "Shape".into(),
            ClassRecordSet::new().with_discriminator(DiscriminatorRecord {
                base: MappingRecord::default()
                    .with_strategy("value-map")
                    .with_column(ColumnTemplate::new("KIND")),
                value: Some("S".into()),
            }),
        );
        let circle = records.get_mut("Circle").unwrap();
        circle.discriminator.value = Some("C".into());
        let mut fx = Fixture::new(shape_model(), records);
        fx.resolve("Circle", ResolveRequest::NonRelations).unwrap();
        let shape = fx.class("Shape");
        assert_eq!(fx.schema.column(shape.discriminator.columns[0]).name.name(), "KIND");
        assert_eq!(shape.discriminator.value.as_deref(), Some("S"));
        assert_eq!(fx.class("Circle").discriminator.value.as_deref(), Some("C"));
    }

    #[test]
    fn test_strict_value_map_without_value_fails() {
        let mut records = RecordCatalog::new();
        records.insert(
            "Person".into(),
            ClassRecordSet::new()
                .with_class(ClassRecord::default().with_table("PERSON"))
                .with_discriminator(DiscriminatorRecord {
                    base: MappingRecord::default().with_strategy("value-map"),
                    value: None,
                }),
        );
        let mut fx = Fixture::new(person_model(), records).strict();
        let mut schema = SchemaGroup::new();
        let person = schema.add_table(None, "PERSON");
        schema.add_typed_column(person, "id", SqlType::BigInt);
        schema.add_typed_column(person, "name", SqlType::Varchar);
        schema.add_typed_column(person, "TYP", SqlType::Varchar);
        fx.schema = schema;
        let err = fx.resolve("Person", ResolveRequest::NonRelations).unwrap_err();
        assert!(matches!(
            err,
            Error::NoDiscriminatorValue { context } if context == "Person.<discriminator>"
        ));
    }

    #[test]
    fn test_unmapped_version_ignores_columns() {
        let mut records = RecordCatalog::new();
        records.insert(
            "Person".into(),
            ClassRecordSet::new().with_version(VersionRecord {
                base: MappingRecord::default()
                    .with_strategy("none")
                    .with_column(ColumnTemplate::new("V")),
            }),
        );
        let mut fx = Fixture::new(person_model(), records);
        fx.resolve("Person", ResolveRequest::NonRelations).unwrap();
        let version = &fx.class("Person").version;
        assert_eq!(version.strategy, Some(VersionStrategy::None));
        assert!(version.columns.is_empty());
    }
}
