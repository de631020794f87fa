//! Query-result mappings: how the columns of a native query become objects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maps the columns of a query result to objects and scalars.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResultMapping {
    /// Name the mapping is looked up by.
    pub name: String,
    /// Class the mapping was declared on; `None` for global mappings.
    pub defining_class: Option<String>,
    /// Objects built from each row.
    pub entities: Vec<EntityResult>,
    /// Scalar columns returned as-is.
    pub columns: Vec<ColumnResult>,
}

impl QueryResultMapping {
    /// An empty mapping.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare the mapping on a class.
    pub fn defined_by(mut self, class: impl Into<String>) -> Self {
        self.defining_class = Some(class.into());
        self
    }

    /// Add an object result.
    pub fn with_entity(mut self, entity: EntityResult) -> Self {
        self.entities.push(entity);
        self
    }

    /// Add a scalar column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(ColumnResult {
            column: column.into(),
        });
        self
    }
}

/// One object per row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityResult {
    /// Class of the object.
    pub class: String,
    /// Result column holding each field, when it differs from the mapped column.
    pub fields: BTreeMap<String, String>,
    /// Result column holding the discriminator.
    pub discriminator_column: Option<String>,
}

impl EntityResult {
    /// Objects of a class.
    pub fn of(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            ..Self::default()
        }
    }

    /// Read a field from a named result column.
    pub fn with_field(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields.insert(field.into(), column.into());
        self
    }
}

/// A scalar result column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnResult {
    /// Column label in the result.
    pub column: String,
}

/// Mappings keyed by defining class and name.
#[derive(Debug, Default)]
pub(crate) struct QueryResultCache {
    mappings: BTreeMap<(Option<String>, String), QueryResultMapping>,
}

impl QueryResultCache {
    pub(crate) fn add(&mut self, mapping: QueryResultMapping) -> Option<QueryResultMapping> {
        let key = (mapping.defining_class.clone(), mapping.name.clone());
        self.mappings.insert(key, mapping)
    }

    pub(crate) fn get(&self, class: Option<&str>, name: &str) -> Option<&QueryResultMapping> {
        self.mappings
            .get(&(class.map(str::to_string), name.to_string()))
    }

    pub(crate) fn remove(&mut self, class: Option<&str>, name: &str) -> bool {
        self.mappings
            .remove(&(class.map(str::to_string), name.to_string()))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_by_class_and_name() {
        let mut cache = QueryResultCache::default();
        let global = QueryResultMapping::new("summary").with_column("TOTAL");
        let scoped = QueryResultMapping::new("summary")
            .defined_by("Order")
            .with_entity(EntityResult::of("Order").with_field("id", "ORDER_ID"));
        assert!(cache.add(global).is_none());
        assert!(cache.add(scoped.clone()).is_none());

        assert_eq!(cache.get(Some("Order"), "summary"), Some(&scoped));
        assert_eq!(cache.get(None, "summary").unwrap().columns[0].column, "TOTAL");
        assert!(cache.remove(None, "summary"));
        assert!(!cache.remove(None, "summary"));
        assert!(cache.get(Some("Order"), "summary").is_some());
    }

    #[test]
    fn test_replacing_returns_previous() {
        let mut cache = QueryResultCache::default();
        cache.add(QueryResultMapping::new("q").with_column("A"));
        let previous = cache.add(QueryResultMapping::new("q").with_column("B")).unwrap();
        assert_eq!(previous.columns[0].column, "A");
    }

    #[test]
    fn test_deserializes_from_json() {
        let json = r#"{"name":"people","entities":[{"class":"Person","fields":{"name":"N"}}]}"#;
        let mapping: QueryResultMapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.entities[0].fields["name"], "N");
        assert!(mapping.defining_class.is_none());
    }
}
