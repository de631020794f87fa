//! Column templates each mapping asks the merge engine for.
//!
//! These are pure functions of the declaration and the chosen strategy, so
//! the same shapes can be rebuilt when resolved mappings are synced back to
//! records.

use crate::config::{
    DEFAULT_DATASTORE_ID_COLUMN, DEFAULT_DISCRIMINATOR_COLUMN, DEFAULT_NULL_INDICATOR_SUFFIX,
    DEFAULT_ORDER_COLUMN_SUFFIX, DEFAULT_VERSION_COLUMN,
};
use crate::model::{ClassDef, FieldDef, ValueDef};
use crate::raw::ColumnTemplate;
use crate::strategy::{
    DiscriminatorStrategy, FieldStrategy, StrategyTarget, ValueHandler, VersionStrategy,
};
use ormap_schema::TypeCode;

/// Name of the element column of a container.
pub const ELEMENT_COLUMN: &str = "ELEMENT";

/// Name of the key column of a map.
pub const KEY_COLUMN: &str = "KEY";

/// Surrogate identity column.
pub fn datastore_id() -> Vec<ColumnTemplate> {
    vec![ColumnTemplate::new(DEFAULT_DATASTORE_ID_COLUMN)
        .with_type_code(TypeCode::Long)
        .with_not_null(true)
        .auto_assigned()]
}

/// Version columns.
pub fn version(class: &ClassDef, strategy: &VersionStrategy) -> Vec<ColumnTemplate> {
    match strategy {
        VersionStrategy::Number => {
            let code = class
                .version_field()
                .map(|f| f.value.code)
                .filter(|code| code.is_integral())
                .unwrap_or(TypeCode::Int);
            vec![ColumnTemplate::new(DEFAULT_VERSION_COLUMN).with_type_code(code)]
        }
        VersionStrategy::Timestamp => {
            vec![ColumnTemplate::new(DEFAULT_VERSION_COLUMN).with_type_code(TypeCode::Date)]
        }
        VersionStrategy::Custom(handle) => named(
            handle.strategy().column_templates(&StrategyTarget::class(&class.name)),
            DEFAULT_VERSION_COLUMN,
        ),
        _ => Vec::new(),
    }
}

/// Discriminator columns.
pub fn discriminator(class: &ClassDef, strategy: &DiscriminatorStrategy) -> Vec<ColumnTemplate> {
    match strategy {
        DiscriminatorStrategy::ClassName | DiscriminatorStrategy::ValueMap => {
            vec![ColumnTemplate::new(DEFAULT_DISCRIMINATOR_COLUMN).with_type_code(TypeCode::String)]
        }
        DiscriminatorStrategy::Custom(handle) => named(
            handle.strategy().column_templates(&StrategyTarget::class(&class.name)),
            DEFAULT_DISCRIMINATOR_COLUMN,
        ),
        _ => Vec::new(),
    }
}

/// Columns of a single-valued field.
pub fn value(class: &str, field: &FieldDef, strategy: &FieldStrategy) -> Vec<ColumnTemplate> {
    let name = field.name.as_str();
    let mut templates = match strategy {
        FieldStrategy::Primitive | FieldStrategy::String => {
            let template = ColumnTemplate::new(name).with_type_code(field.value.code);
            if field.value.code.is_primitive() {
                vec![template.with_not_null(true)]
            } else {
                vec![template]
            }
        }
        FieldStrategy::Lob => vec![ColumnTemplate::new(name)
            .with_type_code(field.value.code)
            .with_size(-1)],
        FieldStrategy::Handler(handler) => handled(class, name, handler),
        FieldStrategy::Serialized => vec![ColumnTemplate::new(name)
            .with_type_code(TypeCode::Object)
            .with_size(-1)],
        FieldStrategy::UntypedRelation => {
            vec![ColumnTemplate::new(name).with_type_code(TypeCode::String)]
        }
        FieldStrategy::Custom(handle) => named(
            handle
                .strategy()
                .column_templates(&StrategyTarget::field(class, name)),
            name,
        ),
        _ => Vec::new(),
    };
    if field.primary_key {
        for template in &mut templates {
            template.not_null = Some(true);
        }
    }
    templates
}

/// Columns of a container element or map key stored in a join table.
pub fn element(
    class: &str,
    column: &str,
    value: &ValueDef,
    handler: Option<&ValueHandler>,
) -> Vec<ColumnTemplate> {
    if let Some(handler) = handler {
        return handled(class, column, handler);
    }
    let template = ColumnTemplate::new(column).with_type_code(value.code);
    if value.lob || value.serialized || matches!(value.code, TypeCode::Object) {
        return vec![template.with_size(-1)];
    }
    vec![template]
}

/// Order column of an ordered container.
pub fn order(field: &str) -> ColumnTemplate {
    ColumnTemplate::new(format!("{}{}", field.to_uppercase(), DEFAULT_ORDER_COLUMN_SUFFIX))
        .with_type_code(TypeCode::Int)
}

/// Null indicator column of an embedded value.
pub fn null_indicator(field: &str) -> ColumnTemplate {
    ColumnTemplate::new(format!("{}{}", field.to_uppercase(), DEFAULT_NULL_INDICATOR_SUFFIX))
        .with_type_code(TypeCode::Int)
}

fn handled(class: &str, name: &str, handler: &ValueHandler) -> Vec<ColumnTemplate> {
    let template = ColumnTemplate::new(name);
    match handler {
        ValueHandler::EnumName | ValueHandler::ObjectIdString => {
            vec![template.with_type_code(TypeCode::String)]
        }
        ValueHandler::EnumOrdinal => vec![template.with_type_code(TypeCode::Int)],
        ValueHandler::Blob => vec![template.with_type_code(TypeCode::ByteArray).with_size(-1)],
        ValueHandler::Clob => vec![template.with_type_code(TypeCode::String).with_size(-1)],
        ValueHandler::ByteArray => vec![template.with_type_code(TypeCode::ByteArray)],
        ValueHandler::CharArray => vec![template.with_type_code(TypeCode::CharArray)],
        ValueHandler::Custom(handle) => named(
            handle
                .strategy()
                .column_templates(&StrategyTarget::field(class, name)),
            name,
        ),
    }
}

/// Give unnamed templates a base name, numbered when there are several.
fn named(mut templates: Vec<ColumnTemplate>, base: &str) -> Vec<ColumnTemplate> {
    let count = templates.len();
    for (i, template) in templates.iter_mut().enumerate() {
        if template.name.is_none() {
            template.name = Some(if count == 1 {
                base.to_string()
            } else {
                format!("{}_{}", base, i)
            });
        }
    }
    templates
}
