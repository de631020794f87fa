//! Table columns.

use crate::identifier::Identifier;
use crate::table::TableId;
use crate::types::{SqlType, TypeCode};
use serde::{Deserialize, Serialize};

/// Arena key of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnId(pub(crate) u32);

impl ColumnId {
    /// Raw index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Usage flags set on a column while mappings resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnFlags {
    /// Written directly by an insert of the owning field.
    pub direct_insert: bool,
    /// Written directly by an update of the owning field.
    pub direct_update: bool,
    /// Written only through a foreign key on insert.
    pub fk_insert: bool,
    /// Written only through a foreign key on update.
    pub fk_update: bool,
    /// Never included in inserts.
    pub uninsertable: bool,
    /// Never included in updates.
    pub unupdatable: bool,
    /// Joins to the primary key of the same row.
    pub pk_join: bool,
}

/// A column in a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Arena key.
    pub id: ColumnId,
    /// Owning table.
    pub table: TableId,
    /// Column name.
    pub name: Identifier,
    /// SQL type.
    pub sql_type: SqlType,
    /// Platform type name override.
    pub type_name: Option<String>,
    /// Semantic type of the values stored.
    pub type_code: TypeCode,
    /// Size; `-1` for unbounded large objects, `0` when unknown.
    pub size: i32,
    /// Decimal digits.
    pub decimals: i32,
    /// NOT NULL constraint.
    pub not_null: bool,
    /// Default value literal.
    pub default: Option<String>,
    /// Value assigned by the database.
    pub auto_assigned: bool,
    /// Holds the identity of a related object.
    pub relation_id: bool,
    /// Foreign key column that maps to no field of its own.
    pub implicit_relation: bool,
    /// Field whose value this column mirrors, if targeted by name.
    pub target_field: Option<String>,
    /// Part of the table's primary key.
    pub primary_key: bool,
    /// Holds XML content.
    pub xml: bool,
    /// Column comment.
    pub comment: Option<String>,
    /// Usage flags.
    pub flags: ColumnFlags,
    pub(crate) refs: u32,
}

impl Column {
    pub(crate) fn new(id: ColumnId, table: TableId, name: Identifier) -> Self {
        Self {
            id,
            table,
            name,
            sql_type: SqlType::Other,
            type_name: None,
            type_code: TypeCode::Object,
            size: 0,
            decimals: 0,
            not_null: false,
            default: None,
            auto_assigned: false,
            relation_id: false,
            implicit_relation: false,
            target_field: None,
            primary_key: false,
            xml: false,
            comment: None,
            flags: ColumnFlags::default(),
            refs: 0,
        }
    }

    /// Whether this column can hold values of the requested shape.
    ///
    /// Size and decimals are accepted for future use; only the type family
    /// is compared.
    pub fn is_compatible(
        &self,
        sql_type: SqlType,
        _type_name: Option<&str>,
        _size: i32,
        _decimals: i32,
    ) -> bool {
        self.sql_type.accepts(sql_type)
    }

    /// Large-object column.
    pub fn is_lob(&self) -> bool {
        self.sql_type.is_lob() || self.size == -1
    }

    /// Number of live references from resolved mappings.
    pub fn ref_count(&self) -> u32 {
        self.refs
    }

    /// Copy type-related attributes from another column.
    pub fn copy_type_from(&mut self, other: &Column) {
        self.sql_type = other.sql_type;
        self.type_name = other.type_name.clone();
        self.type_code = other.type_code;
        self.size = other.size;
        self.decimals = other.decimals;
        self.xml = other.xml;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(sql_type: SqlType) -> Column {
        let mut col = Column::new(ColumnId(0), TableId(0), Identifier::new("C"));
        col.sql_type = sql_type;
        col
    }

    #[test]
    fn test_compatibility_ignores_size() {
        let col = column(SqlType::Varchar);
        assert!(col.is_compatible(SqlType::Char, None, 10, 0));
        assert!(!col.is_compatible(SqlType::Blob, None, 0, 0));
    }

    #[test]
    fn test_lob_detection() {
        let mut col = column(SqlType::Varchar);
        assert!(!col.is_lob());
        col.size = -1;
        assert!(col.is_lob());
        assert!(column(SqlType::Clob).is_lob());
    }

    #[test]
    fn test_copy_type_from() {
        let mut source = column(SqlType::Decimal);
        source.size = 12;
        source.decimals = 2;
        source.type_code = TypeCode::BigDecimal;
        let mut target = column(SqlType::Other);
        target.copy_type_from(&source);
        assert_eq!(target.sql_type, SqlType::Decimal);
        assert_eq!(target.decimals, 2);
        assert_eq!(target.type_code, TypeCode::BigDecimal);
    }
}
