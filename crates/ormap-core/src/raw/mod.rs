//! Raw mapping records: what the user said about tables, columns and
//! constraints, before any reconciliation with the schema.

mod hint;
mod record;
mod sets;
mod template;

pub use hint::{Hint, JoinDirection};
pub use record::MappingRecord;
pub use sets::{
    ClassRecord, ClassRecordSet, DiscriminatorRecord, FieldRecord, FieldRecordSet, ValueRecord,
    VersionRecord,
};
pub use template::{ColumnTemplate, ForeignKeyTemplate, IndexTemplate, UniqueTemplate};

use crate::error::Result;
use std::collections::BTreeMap;

/// Records for many classes, keyed by class name.
pub type RecordCatalog = BTreeMap<String, ClassRecordSet>;

/// Parse records for many classes from JSON.
pub fn parse_records(json: &str) -> Result<RecordCatalog> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records() {
        let records = parse_records(
            r#"{"Person": {"class": {"table": "PEOPLE"}}, "Order": {}}"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records["Person"].class.table.as_deref(), Some("PEOPLE"));
        assert_eq!(records["Order"], ClassRecordSet::default());
    }
}
