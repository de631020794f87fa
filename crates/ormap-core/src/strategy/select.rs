//! Layered strategy selection: an explicitly named strategy first, then a
//! handler registered for the value type, then the defaults policy, then the
//! built-in rules for the type category.

use super::{
    ClassStrategy, DiscriminatorStrategy, FieldStrategy, StrategyRegistry, ValueHandler,
    VersionStrategy,
};
use crate::defaults::MappingDefaults;
use crate::error::{Error, Result};
use crate::model::{ClassDef, ClassModel, FieldDef, ValueDef};
use crate::raw::{ClassRecordSet, FieldRecord};
use ormap_schema::TypeCode;
use tracing::{debug, warn};

/// What class selection needs to know about a class and its hierarchy.
#[derive(Debug, Clone, Copy)]
pub struct ClassFacts<'a> {
    /// The class.
    pub def: &'a ClassDef,
    /// Its records.
    pub records: &'a ClassRecordSet,
    /// The descriptor maps an embedded value.
    pub embedded: bool,
    /// The embedding field maps nothing.
    pub embedding_unmapped: bool,
    /// The embedded value is an object identity.
    pub object_id: bool,
    /// Some ancestor is mapped.
    pub mapped_superclass: bool,
    /// Nearest hierarchy strategy name declared on the class or an ancestor.
    pub hierarchy_strategy: Option<&'a str>,
    /// Adapting the schema.
    pub adapt: bool,
}

/// Choose the strategy of a class.
pub fn class_strategy(
    facts: &ClassFacts<'_>,
    registry: &StrategyRegistry,
    defaults: &dyn MappingDefaults,
) -> Result<ClassStrategy> {
    let context = facts.def.name.as_str();
    if let Some(name) = facts.records.class.base.strategy.as_deref() {
        return registry.class_strategy(context, name);
    }

    if facts.embedded {
        if facts.embedding_unmapped {
            return Ok(ClassStrategy::None);
        }
        if facts.object_id {
            return Ok(ClassStrategy::ObjectId);
        }
        return Ok(ClassStrategy::Embedded);
    }
    if facts.def.embedded_only {
        return Ok(ClassStrategy::None);
    }

    if let Some(name) = defaults.class_strategy(facts.def, facts.mapped_superclass, facts.adapt) {
        return registry.class_strategy(context, &name);
    }

    let hierarchy = facts
        .hierarchy_strategy
        .map(|name| registry.class_strategy(context, name))
        .transpose()?;
    if facts.def.is_abstract
        && matches!(hierarchy, Some(ClassStrategy::FullTable) | Some(ClassStrategy::Vertical))
    {
        return Ok(ClassStrategy::None);
    }
    if !facts.mapped_superclass {
        return Ok(ClassStrategy::FullTable);
    }
    Ok(hierarchy.unwrap_or(ClassStrategy::Flat))
}

/// What field selection needs to know about a field.
#[derive(Clone, Copy)]
pub struct FieldFacts<'a> {
    /// Owning class name.
    pub class: &'a str,
    /// The owning class maps nothing.
    pub owner_unmapped: bool,
    /// The field.
    pub def: &'a FieldDef,
    /// Its record.
    pub record: &'a FieldRecord,
    /// Class model, for handler and back-reference lookups.
    pub model: &'a ClassModel,
    /// Whether a class has a mapping of its own.
    pub is_mapped: &'a dyn Fn(&str) -> bool,
}

impl FieldFacts<'_> {
    fn context(&self) -> String {
        format!("{}.{}", self.class, self.def.name)
    }

    fn related_mapped(&self, value: &ValueDef) -> Option<bool> {
        value.related.as_deref().map(|r| (self.is_mapped)(r))
    }
}

/// Choose the strategy of a field.
pub fn field_strategy(
    facts: &FieldFacts<'_>,
    registry: &StrategyRegistry,
    defaults: &dyn MappingDefaults,
) -> Result<FieldStrategy> {
    let context = facts.context();
    let field = facts.def;
    if !field.is_persistent() || field.version {
        return Ok(FieldStrategy::None);
    }
    if let Some(name) = facts.record.base.strategy.as_deref() {
        return registry.field_strategy(&context, name);
    }
    if facts.owner_unmapped {
        return Ok(FieldStrategy::None);
    }

    let value = &field.value;
    if !field.is_container() {
        if let Some(handler) = value_handler(facts, value, registry, defaults)? {
            return Ok(FieldStrategy::Handler(handler));
        }
    }
    if value.serialized {
        return Ok(FieldStrategy::Serialized);
    }

    if let Some(strategy) = type_strategy(facts, registry, defaults)? {
        debug!(field = %context, strategy = %strategy, "selected field strategy");
        return Ok(strategy);
    }

    warn!(
        field = %context,
        type_name = %value.type_name,
        "no strategy for field type; serializing"
    );
    Ok(FieldStrategy::Serialized)
}

/// Handler for a value: registered for its type, or named by the defaults.
pub fn value_handler(
    facts: &FieldFacts<'_>,
    value: &ValueDef,
    registry: &StrategyRegistry,
    defaults: &dyn MappingDefaults,
) -> Result<Option<ValueHandler>> {
    if let Some(handler) = registry.handler_for(&value.type_name, facts.model) {
        return Ok(Some(handler));
    }
    match defaults.value_strategy(value, facts.related_mapped(value)) {
        Some(name) => registry.value_handler(&facts.context(), &name).map(Some),
        None => Ok(None),
    }
}

fn type_strategy(
    facts: &FieldFacts<'_>,
    registry: &StrategyRegistry,
    defaults: &dyn MappingDefaults,
) -> Result<Option<FieldStrategy>> {
    let field = facts.def;
    let value = &field.value;
    let strategy = match value.code {
        code if code.is_scalar() => FieldStrategy::Primitive,
        TypeCode::String if value.lob => FieldStrategy::Lob,
        TypeCode::String => FieldStrategy::String,
        TypeCode::InputStream | TypeCode::Reader => FieldStrategy::Lob,
        TypeCode::ByteArray if value.lob => FieldStrategy::Lob,
        TypeCode::ByteArray => FieldStrategy::Handler(ValueHandler::ByteArray),
        TypeCode::CharArray if value.lob => FieldStrategy::Lob,
        TypeCode::CharArray => FieldStrategy::Handler(ValueHandler::CharArray),
        TypeCode::Enum => FieldStrategy::Handler(ValueHandler::EnumName),
        TypeCode::Pc if value.is_embedded() => FieldStrategy::Embed,
        TypeCode::Pc if facts.related_mapped(value) == Some(true) => FieldStrategy::Relation,
        TypeCode::Pc | TypeCode::PcUntyped => FieldStrategy::UntypedRelation,
        TypeCode::Array | TypeCode::Collection => {
            let element = field.element_or_object();
            if is_relation_value(facts, &element, registry, defaults)? {
                if use_inverse_key(facts, defaults)? {
                    FieldStrategy::RelationCollectionInverseKey
                } else {
                    FieldStrategy::RelationCollectionTable
                }
            } else if is_storable_value(facts, &element, registry, defaults)? {
                FieldStrategy::CollectionTable
            } else {
                return Ok(None);
            }
        }
        TypeCode::Map => {
            let key = field.key.clone().unwrap_or_else(|| ValueDef::of(TypeCode::Object));
            let element = field.element_or_object();
            let key_rel = is_relation_value(facts, &key, registry, defaults)?;
            let value_rel = is_relation_value(facts, &element, registry, defaults)?;
            if value_rel && (key.mapped_by.is_some() || field.mapped_by.is_some()) {
                if use_inverse_key(facts, defaults)? {
                    FieldStrategy::RelationMapInverseKey
                } else {
                    FieldStrategy::RelationMapTable
                }
            } else if key_rel && value_rel {
                FieldStrategy::RelationRelationMapTable
            } else if value_rel && is_storable_value(facts, &key, registry, defaults)? {
                FieldStrategy::RelationMapTable
            } else if (key_rel || is_storable_value(facts, &key, registry, defaults)?)
                && is_storable_value(facts, &element, registry, defaults)?
            {
                FieldStrategy::MapTable
            } else {
                return Ok(None);
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(strategy))
}

/// Collection element or map key/value stored as a foreign key to a mapped class.
fn is_relation_value(
    facts: &FieldFacts<'_>,
    value: &ValueDef,
    registry: &StrategyRegistry,
    defaults: &dyn MappingDefaults,
) -> Result<bool> {
    Ok(value.code == TypeCode::Pc
        && !value.serialized
        && !value.is_embedded()
        && value_handler(facts, value, registry, defaults)?.is_none())
}

/// Element or key that fits in join table columns without a relation.
fn is_storable_value(
    facts: &FieldFacts<'_>,
    value: &ValueDef,
    registry: &StrategyRegistry,
    defaults: &dyn MappingDefaults,
) -> Result<bool> {
    if value_handler(facts, value, registry, defaults)?.is_some() {
        return Ok(true);
    }
    Ok(value.code.is_scalar()
        || value.is_embedded()
        || matches!(
            value.code,
            TypeCode::String | TypeCode::Enum | TypeCode::ByteArray | TypeCode::CharArray
        ))
}

/// Whether a relation container is stored by a foreign key in the related
/// table rather than through a join table.
pub fn use_inverse_key(facts: &FieldFacts<'_>, defaults: &dyn MappingDefaults) -> Result<bool> {
    let field = facts.def;
    let element = field.element_or_object();
    if let Some(mapped_by) = field.mapped_by.as_deref() {
        let related = element.related.as_deref().unwrap_or_default();
        let back = facts
            .model
            .class(related)
            .and_then(|c| c.field(mapped_by))
            .ok_or_else(|| bad_mapped_by(facts, mapped_by, related))?;
        if back.value.code.is_relation() {
            return Ok(true);
        }
        if back.element.as_ref().is_some_and(|e| e.code == TypeCode::Pc) {
            return Ok(false);
        }
        return Err(bad_mapped_by(facts, mapped_by, related));
    }

    let record = facts.record;
    let element_columns = !record.element.base.columns.is_empty();
    let no_join_table = record.table.is_none();
    if no_join_table && record.base.columns.is_empty() && element_columns {
        return Ok(true);
    }
    Ok(defaults.allow_non_default_mappings() && no_join_table && element_columns)
}

fn bad_mapped_by(facts: &FieldFacts<'_>, field: &str, related: &str) -> Error {
    Error::BadMappedBy {
        context: facts.context(),
        field: field.to_string(),
        related: related.to_string(),
    }
}

/// What version selection needs to know about a class.
#[derive(Debug, Clone, Copy)]
pub struct VersionFacts<'a> {
    /// The class.
    pub def: &'a ClassDef,
    /// Its records.
    pub records: &'a ClassRecordSet,
    /// The class is embedded.
    pub embedded: bool,
    /// The class maps nothing.
    pub unmapped: bool,
    /// The class shares or joins its superclass table.
    pub joinable_superclass: bool,
    /// Adapting the schema.
    pub adapt: bool,
    /// Defaulting missing information.
    pub fill: bool,
}

/// Choose the version strategy of a class.
pub fn version_strategy(
    facts: &VersionFacts<'_>,
    registry: &StrategyRegistry,
    defaults: &dyn MappingDefaults,
) -> Result<VersionStrategy> {
    let context = format!("{}.<version>", facts.def.name);
    if let Some(name) = facts.records.version.base.strategy.as_deref() {
        return registry.version_strategy(&context, name);
    }
    if facts.embedded || (!facts.joinable_superclass && facts.unmapped) {
        return Ok(VersionStrategy::None);
    }
    if let Some(name) =
        defaults.version_strategy(facts.def, facts.joinable_superclass, facts.adapt)
    {
        return registry.version_strategy(&context, &name);
    }
    if facts.joinable_superclass {
        return Ok(VersionStrategy::Superclass);
    }
    if let Some(field) = facts.def.version_field() {
        let code = field.value.code;
        if code.is_temporal() {
            return Ok(VersionStrategy::Timestamp);
        }
        if code.is_integral() {
            return Ok(VersionStrategy::Number);
        }
        return Err(Error::UnsupportedVersionType {
            context,
            type_name: field.value.type_name.clone(),
        });
    }
    if facts.adapt || facts.fill {
        return Ok(VersionStrategy::Number);
    }
    Ok(VersionStrategy::None)
}

/// What discriminator selection needs to know about a class.
#[derive(Debug, Clone, Copy)]
pub struct DiscriminatorFacts<'a> {
    /// The class.
    pub def: &'a ClassDef,
    /// Its records.
    pub records: &'a ClassRecordSet,
    /// The class is embedded.
    pub embedded: bool,
    /// The class maps nothing.
    pub unmapped: bool,
    /// Some ancestor is mapped.
    pub mapped_superclass: bool,
    /// The class shares or joins its superclass table.
    pub joinable_superclass: bool,
    /// The class has subclasses.
    pub has_subclasses: bool,
    /// Adapting the schema.
    pub adapt: bool,
    /// Defaulting missing information.
    pub fill: bool,
}

/// Choose the discriminator strategy of a class.
pub fn discriminator_strategy(
    facts: &DiscriminatorFacts<'_>,
    registry: &StrategyRegistry,
    defaults: &dyn MappingDefaults,
) -> Result<DiscriminatorStrategy> {
    let context = format!("{}.<discriminator>", facts.def.name);
    let record = &facts.records.discriminator;
    if let Some(name) = record.base.strategy.as_deref() {
        return registry.discriminator_strategy(&context, name);
    }
    if facts.embedded {
        return Ok(DiscriminatorStrategy::None);
    }
    if !facts.joinable_superclass
        && (facts.unmapped || (facts.def.is_final && !facts.has_subclasses))
    {
        return Ok(DiscriminatorStrategy::None);
    }
    let has_value = record.value.is_some();
    if let Some(name) = defaults.discriminator_strategy(
        facts.def,
        facts.joinable_superclass,
        has_value,
        facts.adapt,
    ) {
        return registry.discriminator_strategy(&context, &name);
    }
    if facts.joinable_superclass {
        return Ok(DiscriminatorStrategy::Superclass);
    }
    if has_value {
        return Ok(DiscriminatorStrategy::ValueMap);
    }
    if facts.mapped_superclass {
        return Ok(DiscriminatorStrategy::None);
    }
    if facts.adapt || facts.fill {
        return Ok(DiscriminatorStrategy::ClassName);
    }
    if facts.has_subclasses {
        return Ok(DiscriminatorStrategy::SubclassJoin);
    }
    Ok(DiscriminatorStrategy::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultsConfig;
    use crate::defaults::StandardDefaults;
    use crate::raw::{ClassRecord, ColumnTemplate, DiscriminatorRecord, ValueRecord};

    fn class_facts<'a>(def: &'a ClassDef, records: &'a ClassRecordSet) -> ClassFacts<'a> {
        ClassFacts {
            def,
            records,
            embedded: false,
            embedding_unmapped: false,
            object_id: false,
            mapped_superclass: false,
            hierarchy_strategy: None,
            adapt: false,
        }
    }

    #[test]
    fn test_class_strategy_layers() {
        let registry = StrategyRegistry::new();
        let defaults = StandardDefaults::default();
        let records = ClassRecordSet::new();
        let def = ClassDef::new("Dog").with_superclass("Animal");

        let root = class_facts(&def, &records);
        assert_eq!(class_strategy(&root, &registry, &defaults).unwrap(), ClassStrategy::FullTable);

        let sub = ClassFacts { mapped_superclass: true, ..root };
        assert_eq!(class_strategy(&sub, &registry, &defaults).unwrap(), ClassStrategy::Flat);

        let joined = ClassFacts { hierarchy_strategy: Some("vertical"), ..sub };
        assert_eq!(class_strategy(&joined, &registry, &defaults).unwrap(), ClassStrategy::Vertical);

        let named = ClassRecordSet::new().with_class(ClassRecord::default().with_strategy("full"));
        let explicit = ClassFacts { records: &named, ..joined };
        assert_eq!(
            class_strategy(&explicit, &registry, &defaults).unwrap(),
            ClassStrategy::FullTable
        );

        let embedded = ClassFacts { embedded: true, ..root };
        assert_eq!(
            class_strategy(&embedded, &registry, &defaults).unwrap(),
            ClassStrategy::Embedded
        );
    }

    #[test]
    fn test_abstract_class_in_table_per_class_hierarchy_is_unmapped() {
        let registry = StrategyRegistry::new();
        let defaults = StandardDefaults::default();
        let records = ClassRecordSet::new();
        let def = ClassDef::new("Shape").abstract_class();
        let facts = ClassFacts { hierarchy_strategy: Some("full"), ..class_facts(&def, &records) };
        assert_eq!(class_strategy(&facts, &registry, &defaults).unwrap(), ClassStrategy::None);
    }

    #[test]
    fn test_policy_strategy_applies_when_filling() {
        let registry = StrategyRegistry::new();
        let defaults =
            StandardDefaults::new(DefaultsConfig::default().with_subclass_strategy("vertical"));
        let records = ClassRecordSet::new();
        let def = ClassDef::new("Dog");
        let facts = ClassFacts { mapped_superclass: true, ..class_facts(&def, &records) };
        assert_eq!(class_strategy(&facts, &registry, &defaults).unwrap(), ClassStrategy::Vertical);
    }

    fn field_facts<'a>(
        def: &'a FieldDef,
        record: &'a FieldRecord,
        model: &'a ClassModel,
        is_mapped: &'a dyn Fn(&str) -> bool,
    ) -> FieldFacts<'a> {
        FieldFacts {
            class: "Owner",
            owner_unmapped: false,
            def,
            record,
            model,
            is_mapped,
        }
    }

    fn select(def: &FieldDef, record: &FieldRecord, model: &ClassModel) -> Result<FieldStrategy> {
        let mapped = |name: &str| model.class(name).is_some();
        let facts = field_facts(def, record, model, &mapped);
        field_strategy(&facts, &StrategyRegistry::new(), &StandardDefaults::default())
    }

    fn model() -> ClassModel {
        ClassModel::new()
            .with_class(
                ClassDef::new("Item")
                    .with_field(FieldDef::to_one("owner", "Owner"))
                    .with_field(FieldDef::to_many("owners", "Owner"))
                    .with_field(FieldDef::scalar("name", TypeCode::String)),
            )
            .with_class(ClassDef::new("Owner"))
    }

    #[test]
    fn test_structural_field_rules() {
        let model = model();
        let record = FieldRecord::default();
        let cases = [
            (FieldDef::scalar("age", TypeCode::Int), FieldStrategy::Primitive),
            (FieldDef::scalar("name", TypeCode::String), FieldStrategy::String),
            (
                FieldDef::new("bio", ValueDef::of(TypeCode::String).lob()),
                FieldStrategy::Lob,
            ),
            (
                FieldDef::new("color", ValueDef::enumeration("Color")),
                FieldStrategy::Handler(ValueHandler::EnumName),
            ),
            (FieldDef::to_one("item", "Item"), FieldStrategy::Relation),
            (FieldDef::to_one("ghost", "Unmapped"), FieldStrategy::UntypedRelation),
            (FieldDef::embedded("home", "Address"), FieldStrategy::Embed),
            (FieldDef::to_many("items", "Item"), FieldStrategy::RelationCollectionTable),
            (
                FieldDef::collection("tags", ValueDef::of(TypeCode::String)),
                FieldStrategy::CollectionTable,
            ),
            (
                FieldDef::new("blob", ValueDef::of(TypeCode::Object).serialized()),
                FieldStrategy::Serialized,
            ),
        ];
        for (def, expected) in cases {
            assert_eq!(select(&def, &record, &model).unwrap(), expected, "{}", def.name);
        }
    }

    #[test]
    fn test_mapped_by_selects_inverse_key() {
        let model = model();
        let record = FieldRecord::default();
        let one_to_many = FieldDef::to_many("items", "Item").mapped_by("owner");
        assert_eq!(
            select(&one_to_many, &record, &model).unwrap(),
            FieldStrategy::RelationCollectionInverseKey
        );
        let many_to_many = FieldDef::to_many("items", "Item").mapped_by("owners");
        assert_eq!(
            select(&many_to_many, &record, &model).unwrap(),
            FieldStrategy::RelationCollectionTable
        );
        let bad = FieldDef::to_many("items", "Item").mapped_by("name");
        assert!(matches!(select(&bad, &record, &model), Err(Error::BadMappedBy { .. })));
    }

    #[test]
    fn test_map_of_relations_with_mapped_by() {
        let model = model();
        let record = FieldRecord::default();
        let by_name = FieldDef::map(
            "itemsByName",
            ValueDef::of(TypeCode::String).with_mapped_by("name"),
            ValueDef::relation("Item"),
        )
        .mapped_by("owner");
        assert_eq!(
            select(&by_name, &record, &model).unwrap(),
            FieldStrategy::RelationMapInverseKey
        );
        let plain = FieldDef::map(
            "itemsByName",
            ValueDef::of(TypeCode::String),
            ValueDef::relation("Item"),
        );
        assert_eq!(select(&plain, &record, &model).unwrap(), FieldStrategy::RelationMapTable);
    }

    #[test]
    fn test_element_columns_without_join_table_use_inverse_key() {
        let model = model();
        let record = FieldRecord::default()
            .with_element(ValueRecord::default().with_column(ColumnTemplate::new("OWNER_ID")));
        let def = FieldDef::to_many("items", "Item");
        assert_eq!(
            select(&def, &record, &model).unwrap(),
            FieldStrategy::RelationCollectionInverseKey
        );
    }

    #[test]
    fn test_named_field_strategy_wins() {
        let model = model();
        let record = FieldRecord::default().with_strategy("lob");
        let def = FieldDef::scalar("name", TypeCode::String);
        assert_eq!(select(&def, &record, &model).unwrap(), FieldStrategy::Lob);
    }

    fn version_facts<'a>(def: &'a ClassDef, records: &'a ClassRecordSet) -> VersionFacts<'a> {
        VersionFacts {
            def,
            records,
            embedded: false,
            unmapped: false,
            joinable_superclass: false,
            adapt: false,
            fill: false,
        }
    }

    #[test]
    fn test_version_strategies() {
        let registry = StrategyRegistry::new();
        let strict =
            StandardDefaults::new(DefaultsConfig::default().with_default_missing_info(false));
        let records = ClassRecordSet::new();

        let plain = ClassDef::new("A");
        let facts = version_facts(&plain, &records);
        assert_eq!(version_strategy(&facts, &registry, &strict).unwrap(), VersionStrategy::None);
        let filling = VersionFacts { fill: true, ..facts };
        assert_eq!(
            version_strategy(&filling, &registry, &strict).unwrap(),
            VersionStrategy::Number
        );

        let stamped =
            ClassDef::new("B").with_field(FieldDef::scalar("modified", TypeCode::Date).version());
        let facts = version_facts(&stamped, &records);
        assert_eq!(
            version_strategy(&facts, &registry, &strict).unwrap(),
            VersionStrategy::Timestamp
        );

        let odd = ClassDef::new("C").with_field(FieldDef::scalar("v", TypeCode::String).version());
        let facts = version_facts(&odd, &records);
        assert!(matches!(
            version_strategy(&facts, &registry, &strict),
            Err(Error::UnsupportedVersionType { .. })
        ));

        let sub = ClassDef::new("D");
        let facts = VersionFacts { joinable_superclass: true, ..version_facts(&sub, &records) };
        assert_eq!(
            version_strategy(&facts, &registry, &strict).unwrap(),
            VersionStrategy::Superclass
        );
    }

    #[test]
    fn test_discriminator_strategies() {
        let registry = StrategyRegistry::new();
        let strict =
            StandardDefaults::new(DefaultsConfig::default().with_default_missing_info(false));
        let records = ClassRecordSet::new();
        let def = ClassDef::new("Animal");
        let base = DiscriminatorFacts {
            def: &def,
            records: &records,
            embedded: false,
            unmapped: false,
            mapped_superclass: false,
            joinable_superclass: false,
            has_subclasses: true,
            adapt: false,
            fill: false,
        };
        assert_eq!(
            discriminator_strategy(&base, &registry, &strict).unwrap(),
            DiscriminatorStrategy::SubclassJoin
        );
        let filling = DiscriminatorFacts { fill: true, ..base };
        assert_eq!(
            discriminator_strategy(&filling, &registry, &strict).unwrap(),
            DiscriminatorStrategy::ClassName
        );

        let valued = ClassRecordSet::new().with_discriminator(DiscriminatorRecord {
            value: Some("A".into()),
            ..DiscriminatorRecord::default()
        });
        let facts = DiscriminatorFacts { records: &valued, ..base };
        assert_eq!(
            discriminator_strategy(&facts, &registry, &strict).unwrap(),
            DiscriminatorStrategy::ValueMap
        );

        let final_class = ClassDef::new("Leaf").final_class();
        let facts =
            DiscriminatorFacts { def: &final_class, has_subclasses: false, fill: true, ..base };
        assert_eq!(
            discriminator_strategy(&facts, &registry, &strict).unwrap(),
            DiscriminatorStrategy::None
        );
    }
}
