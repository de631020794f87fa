//! SQL column types and semantic value type codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    /// Single bit.
    Bit,
    /// 8-bit integer.
    TinyInt,
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Single-precision float.
    Real,
    /// Float of platform precision.
    Float,
    /// Double-precision float.
    Double,
    /// Exact numeric.
    Numeric,
    /// Exact decimal.
    Decimal,
    /// Boolean.
    Boolean,
    /// Fixed-length character data.
    Char,
    /// Variable-length character data.
    Varchar,
    /// Long character data.
    LongVarchar,
    /// Character large object.
    Clob,
    /// Fixed-length binary data.
    Binary,
    /// Variable-length binary data.
    Varbinary,
    /// Long binary data.
    LongVarbinary,
    /// Binary large object.
    Blob,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    Timestamp,
    /// Unknown or platform-specific type. Compatible with everything.
    Other,
}

impl SqlType {
    /// Numeric family.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            SqlType::Bit
                | SqlType::TinyInt
                | SqlType::SmallInt
                | SqlType::Integer
                | SqlType::BigInt
                | SqlType::Real
                | SqlType::Float
                | SqlType::Double
                | SqlType::Numeric
                | SqlType::Decimal
        )
    }

    /// Binary family.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            SqlType::Binary | SqlType::Varbinary | SqlType::LongVarbinary | SqlType::Blob
        )
    }

    /// Character family.
    pub fn is_character(self) -> bool {
        matches!(
            self,
            SqlType::Char | SqlType::Varchar | SqlType::LongVarchar | SqlType::Clob
        )
    }

    /// Date/time family.
    pub fn is_temporal(self) -> bool {
        matches!(self, SqlType::Date | SqlType::Time | SqlType::Timestamp)
    }

    /// Large object types.
    pub fn is_lob(self) -> bool {
        matches!(self, SqlType::Blob | SqlType::Clob)
    }

    /// Whether a column of this type can hold values requested as `requested`.
    ///
    /// `Other` on either side is always accepted.
    pub fn accepts(self, requested: SqlType) -> bool {
        if self == SqlType::Other || requested == SqlType::Other {
            return true;
        }
        if requested.is_numeric() {
            return self.is_numeric();
        }
        if requested.is_binary() {
            return self.is_binary();
        }
        match requested {
            SqlType::Char | SqlType::Varchar | SqlType::LongVarchar | SqlType::Clob => {
                self.is_character() || self.is_temporal()
            }
            SqlType::Date | SqlType::Time | SqlType::Timestamp => {
                self.is_temporal()
                    || matches!(
                        self,
                        SqlType::Varchar | SqlType::LongVarchar | SqlType::Clob
                    )
            }
            _ => self == requested,
        }
    }

    /// Upper-case SQL spelling.
    pub fn sql_name(self) -> &'static str {
        match self {
            SqlType::Bit => "BIT",
            SqlType::TinyInt => "TINYINT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Real => "REAL",
            SqlType::Float => "FLOAT",
            SqlType::Double => "DOUBLE",
            SqlType::Numeric => "NUMERIC",
            SqlType::Decimal => "DECIMAL",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Char => "CHAR",
            SqlType::Varchar => "VARCHAR",
            SqlType::LongVarchar => "LONGVARCHAR",
            SqlType::Clob => "CLOB",
            SqlType::Binary => "BINARY",
            SqlType::Varbinary => "VARBINARY",
            SqlType::LongVarbinary => "LONGVARBINARY",
            SqlType::Blob => "BLOB",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Other => "OTHER",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// Semantic category of a mapped value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCode {
    /// Primitive boolean.
    Boolean,
    /// Primitive byte.
    Byte,
    /// Primitive char.
    Char,
    /// Primitive short.
    Short,
    /// Primitive int.
    Int,
    /// Primitive long.
    Long,
    /// Primitive float.
    Float,
    /// Primitive double.
    Double,
    /// Nullable boolean.
    BooleanObj,
    /// Nullable byte.
    ByteObj,
    /// Nullable char.
    CharObj,
    /// Nullable short.
    ShortObj,
    /// Nullable int.
    IntObj,
    /// Nullable long.
    LongObj,
    /// Nullable float.
    FloatObj,
    /// Nullable double.
    DoubleObj,
    /// Arbitrary precision integer.
    BigInteger,
    /// Arbitrary precision decimal.
    BigDecimal,
    /// Abstract number.
    Number,
    /// Character string.
    String,
    /// Date/time instant.
    Date,
    /// Calendar value.
    Calendar,
    /// Locale.
    Locale,
    /// Enumeration.
    Enum,
    /// Any other object.
    Object,
    /// Persistent (mapped) class reference.
    Pc,
    /// Reference to an unknown persistent type.
    PcUntyped,
    /// Object identity value.
    Oid,
    /// Array container.
    Array,
    /// Collection container.
    Collection,
    /// Map container.
    Map,
    /// Binary stream.
    InputStream,
    /// Character stream.
    Reader,
    /// Byte array.
    ByteArray,
    /// Char array.
    CharArray,
}

impl TypeCode {
    /// Non-nullable primitive.
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            TypeCode::Boolean
                | TypeCode::Byte
                | TypeCode::Char
                | TypeCode::Short
                | TypeCode::Int
                | TypeCode::Long
                | TypeCode::Float
                | TypeCode::Double
        )
    }

    /// Integer-valued types.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            TypeCode::Byte
                | TypeCode::Short
                | TypeCode::Int
                | TypeCode::Long
                | TypeCode::ByteObj
                | TypeCode::ShortObj
                | TypeCode::IntObj
                | TypeCode::LongObj
                | TypeCode::BigInteger
                | TypeCode::Number
        )
    }

    /// Direct column-mappable scalar (primitive or boxed primitive).
    pub fn is_scalar(self) -> bool {
        self.is_primitive()
            || matches!(
                self,
                TypeCode::BooleanObj
                    | TypeCode::ByteObj
                    | TypeCode::CharObj
                    | TypeCode::ShortObj
                    | TypeCode::IntObj
                    | TypeCode::LongObj
                    | TypeCode::FloatObj
                    | TypeCode::DoubleObj
                    | TypeCode::BigInteger
                    | TypeCode::BigDecimal
                    | TypeCode::Number
                    | TypeCode::Date
                    | TypeCode::Calendar
                    | TypeCode::Locale
            )
    }

    /// Reference to a persistent class.
    pub fn is_relation(self) -> bool {
        matches!(self, TypeCode::Pc | TypeCode::PcUntyped)
    }

    /// Array, collection or map.
    pub fn is_container(self) -> bool {
        matches!(self, TypeCode::Array | TypeCode::Collection | TypeCode::Map)
    }

    /// Date-like values.
    pub fn is_temporal(self) -> bool {
        matches!(self, TypeCode::Date | TypeCode::Calendar)
    }

    /// Best guess at a semantic type for a column of the given SQL type.
    pub fn for_sql_type(sql_type: SqlType) -> TypeCode {
        match sql_type {
            SqlType::Bit | SqlType::Boolean => TypeCode::BooleanObj,
            SqlType::TinyInt => TypeCode::ByteObj,
            SqlType::SmallInt => TypeCode::ShortObj,
            SqlType::Integer => TypeCode::IntObj,
            SqlType::BigInt => TypeCode::LongObj,
            SqlType::Real => TypeCode::FloatObj,
            SqlType::Float | SqlType::Double => TypeCode::DoubleObj,
            SqlType::Numeric | SqlType::Decimal => TypeCode::BigDecimal,
            SqlType::Char | SqlType::Varchar | SqlType::LongVarchar | SqlType::Clob => {
                TypeCode::String
            }
            SqlType::Binary | SqlType::Varbinary | SqlType::LongVarbinary | SqlType::Blob => {
                TypeCode::ByteArray
            }
            SqlType::Date | SqlType::Time | SqlType::Timestamp => TypeCode::Date,
            SqlType::Other => TypeCode::Object,
        }
    }

    /// Conventional type name used for handler registration lookups.
    pub fn type_name(self) -> &'static str {
        match self {
            TypeCode::Boolean => "boolean",
            TypeCode::Byte => "byte",
            TypeCode::Char => "char",
            TypeCode::Short => "short",
            TypeCode::Int => "int",
            TypeCode::Long => "long",
            TypeCode::Float => "float",
            TypeCode::Double => "double",
            TypeCode::BooleanObj => "Boolean",
            TypeCode::ByteObj => "Byte",
            TypeCode::CharObj => "Character",
            TypeCode::ShortObj => "Short",
            TypeCode::IntObj => "Integer",
            TypeCode::LongObj => "Long",
            TypeCode::FloatObj => "Float",
            TypeCode::DoubleObj => "Double",
            TypeCode::BigInteger => "BigInteger",
            TypeCode::BigDecimal => "BigDecimal",
            TypeCode::Number => "Number",
            TypeCode::String => "String",
            TypeCode::Date => "Date",
            TypeCode::Calendar => "Calendar",
            TypeCode::Locale => "Locale",
            TypeCode::Enum => "Enum",
            TypeCode::Object => "Object",
            TypeCode::Pc => "Pc",
            TypeCode::PcUntyped => "PcUntyped",
            TypeCode::Oid => "Oid",
            TypeCode::Array => "Array",
            TypeCode::Collection => "Collection",
            TypeCode::Map => "Map",
            TypeCode::InputStream => "InputStream",
            TypeCode::Reader => "Reader",
            TypeCode::ByteArray => "byte[]",
            TypeCode::CharArray => "char[]",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_group_compatibility() {
        assert!(SqlType::BigInt.accepts(SqlType::Integer));
        assert!(SqlType::Decimal.accepts(SqlType::Double));
        assert!(!SqlType::Varchar.accepts(SqlType::Integer));
    }

    #[test]
    fn test_character_accepts_temporal() {
        assert!(SqlType::Varchar.accepts(SqlType::Clob));
        assert!(SqlType::Timestamp.accepts(SqlType::Varchar));
        assert!(SqlType::Varchar.accepts(SqlType::Date));
        assert!(!SqlType::Char.accepts(SqlType::Date));
    }

    #[test]
    fn test_other_is_universal() {
        assert!(SqlType::Other.accepts(SqlType::Blob));
        assert!(SqlType::Blob.accepts(SqlType::Other));
        assert!(!SqlType::Blob.accepts(SqlType::Varchar));
    }

    #[test]
    fn test_type_code_categories() {
        assert!(TypeCode::Int.is_primitive());
        assert!(!TypeCode::IntObj.is_primitive());
        assert!(TypeCode::IntObj.is_scalar());
        assert!(TypeCode::Pc.is_relation());
        assert!(TypeCode::Map.is_container());
        assert_eq!(TypeCode::for_sql_type(SqlType::Varchar), TypeCode::String);
    }
}
