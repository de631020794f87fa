//! Database dictionary: the platform capabilities and naming rules the
//! mapping engine consults while reconciling mappings with a schema.

use crate::constraint::FkAction;
use crate::group::SchemaGroup;
use crate::table::TableId;
use crate::types::{SqlType, TypeCode};
use std::collections::{BTreeMap, BTreeSet};

/// Default size for character columns with no explicit size.
pub const DEFAULT_CHARACTER_COLUMN_SIZE: i32 = 255;

/// Default maximum identifier length.
pub const DEFAULT_MAX_NAME_LENGTH: usize = 128;

/// Words that cannot be used as bare identifiers on most platforms.
const SQL_RESERVED_WORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN",
    "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "DATE", "DEFAULT", "DELETE", "DESC",
    "DISTINCT", "DROP", "ELSE", "END", "EXISTS", "FOR", "FOREIGN", "FROM", "FULL", "GRANT",
    "GROUP", "HAVING", "IN", "INDEX", "INNER", "INSERT", "INTO", "IS", "JOIN", "KEY", "LEFT",
    "LIKE", "NOT", "NULL", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RIGHT",
    "SELECT", "SET", "TABLE", "THEN", "TIME", "TIMESTAMP", "TO", "UNION", "UNIQUE", "UPDATE",
    "USER", "VALUE", "VALUES", "WHEN", "WHERE", "WITH",
];

/// How the platform folds unquoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaCase {
    /// Fold to upper case.
    Upper,
    /// Fold to lower case.
    Lower,
    /// Keep as written.
    #[default]
    Preserve,
}

/// Platform capabilities and naming rules.
#[derive(Debug, Clone, PartialEq)]
pub struct DbDictionary {
    /// Platform name for diagnostics.
    pub platform: String,
    /// Size given to character columns without one.
    pub character_column_size: i32,
    /// Maximum column name length; `0` means unlimited.
    pub max_column_name_length: usize,
    /// Maximum table name length; `0` means unlimited.
    pub max_table_name_length: usize,
    /// Maximum index name length; `0` means unlimited.
    pub max_index_name_length: usize,
    /// Maximum constraint name length; `0` means unlimited.
    pub max_constraint_name_length: usize,
    /// Supports deferred constraint checking.
    pub supports_deferred_constraints: bool,
    /// Supports unique constraints.
    pub supports_unique_constraints: bool,
    /// Delete actions the platform cannot enforce.
    pub unsupported_delete_actions: BTreeSet<FkAction>,
    /// Update actions the platform cannot enforce.
    pub unsupported_update_actions: BTreeSet<FkAction>,
    /// Largest blob stored inline; `-1` for no limit.
    pub max_embedded_blob_size: i64,
    /// Largest clob stored inline; `-1` for no limit.
    pub max_embedded_clob_size: i64,
    /// Store chars as integers.
    pub store_chars_as_numbers: bool,
    /// Store big numbers as strings.
    pub store_large_numbers_as_strings: bool,
    /// Identifier case folding.
    pub schema_case: SchemaCase,
    /// Substitutions for types the platform lacks.
    pub preferred_types: BTreeMap<SqlType, SqlType>,
    reserved_words: BTreeSet<String>,
}

impl Default for DbDictionary {
    fn default() -> Self {
        Self::generic()
    }
}

impl DbDictionary {
    /// A permissive, standards-following platform.
    pub fn generic() -> Self {
        Self {
            platform: "generic".to_string(),
            character_column_size: DEFAULT_CHARACTER_COLUMN_SIZE,
            max_column_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_table_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_index_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_constraint_name_length: DEFAULT_MAX_NAME_LENGTH,
            supports_deferred_constraints: true,
            supports_unique_constraints: true,
            unsupported_delete_actions: BTreeSet::new(),
            unsupported_update_actions: BTreeSet::new(),
            max_embedded_blob_size: -1,
            max_embedded_clob_size: -1,
            store_chars_as_numbers: false,
            store_large_numbers_as_strings: false,
            schema_case: SchemaCase::Preserve,
            preferred_types: BTreeMap::new(),
            reserved_words: SQL_RESERVED_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Set the platform name.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Set the default character column size.
    pub fn with_character_column_size(mut self, size: i32) -> Self {
        self.character_column_size = size;
        self
    }

    /// Set every identifier length limit at once.
    pub fn with_max_name_length(mut self, len: usize) -> Self {
        self.max_column_name_length = len;
        self.max_table_name_length = len;
        self.max_index_name_length = len;
        self.max_constraint_name_length = len;
        self
    }

    /// Disable deferred constraints.
    pub fn without_deferred_constraints(mut self) -> Self {
        self.supports_deferred_constraints = false;
        self
    }

    /// Disable unique constraints.
    pub fn without_unique_constraints(mut self) -> Self {
        self.supports_unique_constraints = false;
        self
    }

    /// Mark a delete action unsupported.
    pub fn without_delete_action(mut self, action: FkAction) -> Self {
        self.unsupported_delete_actions.insert(action);
        self
    }

    /// Mark an update action unsupported.
    pub fn without_update_action(mut self, action: FkAction) -> Self {
        self.unsupported_update_actions.insert(action);
        self
    }

    /// Limit inline blob size.
    pub fn with_max_embedded_blob_size(mut self, size: i64) -> Self {
        self.max_embedded_blob_size = size;
        self
    }

    /// Limit inline clob size.
    pub fn with_max_embedded_clob_size(mut self, size: i64) -> Self {
        self.max_embedded_clob_size = size;
        self
    }

    /// Substitute one type for another.
    pub fn with_preferred_type(mut self, requested: SqlType, used: SqlType) -> Self {
        self.preferred_types.insert(requested, used);
        self
    }

    /// Add a reserved word.
    pub fn with_reserved_word(mut self, word: &str) -> Self {
        self.reserved_words.insert(word.to_ascii_uppercase());
        self
    }

    /// Set identifier case folding.
    pub fn with_schema_case(mut self, case: SchemaCase) -> Self {
        self.schema_case = case;
        self
    }

    /// Whether a delete action can be enforced.
    pub fn supports_delete_action(&self, action: FkAction) -> bool {
        action == FkAction::None || !self.unsupported_delete_actions.contains(&action)
    }

    /// Whether an update action can be enforced.
    pub fn supports_update_action(&self, action: FkAction) -> bool {
        action == FkAction::None || !self.unsupported_update_actions.contains(&action)
    }

    /// Whether a word is reserved.
    pub fn is_reserved(&self, word: &str) -> bool {
        self.reserved_words.contains(&word.to_ascii_uppercase())
    }

    /// The type actually used for a requested type.
    pub fn preferred_type(&self, requested: SqlType) -> SqlType {
        self.preferred_types
            .get(&requested)
            .copied()
            .unwrap_or(requested)
    }

    /// SQL type for a semantic type.
    pub fn sql_type_for(&self, code: TypeCode, lob: bool, precision: i32, scale: i32) -> SqlType {
        if lob {
            return match code {
                TypeCode::String | TypeCode::Reader | TypeCode::CharArray => {
                    self.preferred_type(SqlType::Clob)
                }
                _ => self.preferred_type(SqlType::Blob),
            };
        }
        let large_as_string = |numeric: SqlType| {
            if self.store_large_numbers_as_strings {
                SqlType::Varchar
            } else {
                numeric
            }
        };
        let sql_type = match code {
            TypeCode::Boolean | TypeCode::BooleanObj => SqlType::Bit,
            TypeCode::Byte | TypeCode::ByteObj => SqlType::TinyInt,
            TypeCode::Char | TypeCode::CharObj if self.store_chars_as_numbers => SqlType::Integer,
            TypeCode::Char | TypeCode::CharObj => SqlType::Char,
            TypeCode::Double | TypeCode::DoubleObj | TypeCode::Float | TypeCode::FloatObj
                if precision > 0 || scale > 0 =>
            {
                SqlType::Numeric
            }
            TypeCode::Double | TypeCode::DoubleObj => SqlType::Double,
            TypeCode::Float | TypeCode::FloatObj => SqlType::Real,
            TypeCode::Int | TypeCode::IntObj => SqlType::Integer,
            TypeCode::Long | TypeCode::LongObj => SqlType::BigInt,
            TypeCode::Short | TypeCode::ShortObj => SqlType::SmallInt,
            TypeCode::String | TypeCode::Locale | TypeCode::Enum | TypeCode::CharArray => {
                SqlType::Varchar
            }
            TypeCode::Reader => SqlType::Clob,
            TypeCode::BigInteger => large_as_string(SqlType::BigInt),
            TypeCode::BigDecimal | TypeCode::Number => large_as_string(SqlType::Numeric),
            TypeCode::Date | TypeCode::Calendar => SqlType::Timestamp,
            TypeCode::ByteArray => SqlType::Varbinary,
            TypeCode::InputStream
            | TypeCode::Object
            | TypeCode::Pc
            | TypeCode::PcUntyped
            | TypeCode::Oid
            | TypeCode::Array
            | TypeCode::Collection
            | TypeCode::Map => SqlType::Blob,
        };
        self.preferred_type(sql_type)
    }

    /// Apply case folding.
    pub fn fold_case(&self, name: &str) -> String {
        match self.schema_case {
            SchemaCase::Upper => name.to_ascii_uppercase(),
            SchemaCase::Lower => name.to_ascii_lowercase(),
            SchemaCase::Preserve => name.to_string(),
        }
    }

    /// A valid, unused column name for the table.
    pub fn valid_column_name(&self, name: &str, table: TableId, group: &SchemaGroup) -> String {
        self.make_name_valid(name, self.max_column_name_length, |candidate| {
            group.find_column(table, candidate).is_some()
        })
    }

    /// A column name within length limits and not reserved. Existing columns
    /// are not considered, so a name matching one reuses it.
    pub fn valid_column_identifier(&self, name: &str) -> String {
        self.make_name_valid(name, self.max_column_name_length, |_| false)
    }

    /// A valid, unused table name for the schema.
    pub fn valid_table_name(
        &self,
        name: &str,
        schema: Option<&str>,
        group: &SchemaGroup,
    ) -> String {
        self.make_name_valid(name, self.max_table_name_length, |candidate| {
            group.tables().any(|t| {
                t.name.matches(candidate)
                    && t.schema.as_deref().map(str::to_ascii_uppercase)
                        == schema.map(str::to_ascii_uppercase)
            })
        })
    }

    /// A valid, unused index name in the table's schema.
    pub fn valid_index_name(&self, name: &str, table: TableId, group: &SchemaGroup) -> String {
        let schema = group.table(table).schema.clone();
        self.make_name_valid(name, self.max_index_name_length, |candidate| {
            group.index_name_taken(schema.as_deref(), candidate)
        })
    }

    /// A valid, unused unique constraint name in the table's schema.
    pub fn valid_unique_name(&self, name: &str, table: TableId, group: &SchemaGroup) -> String {
        self.valid_constraint_name(name, table, group)
    }

    /// A valid, unused foreign key name in the table's schema.
    pub fn valid_foreign_key_name(
        &self,
        name: &str,
        table: TableId,
        group: &SchemaGroup,
    ) -> String {
        self.valid_constraint_name(name, table, group)
    }

    /// A valid primary key name (`P_` prefixed).
    pub fn valid_primary_key_name(
        &self,
        name: &str,
        table: TableId,
        group: &SchemaGroup,
    ) -> String {
        let trimmed = name.trim_start_matches('_');
        self.valid_constraint_name(&format!("P_{}", trimmed), table, group)
    }

    fn valid_constraint_name(&self, name: &str, table: TableId, group: &SchemaGroup) -> String {
        let schema = group.table(table).schema.clone();
        self.make_name_valid(name, self.max_constraint_name_length, |candidate| {
            group.constraint_name_taken(schema.as_deref(), candidate)
        })
    }

    /// Shorten to the length limit, avoid reserved words, then make unique by
    /// replacing the trailing characters with an increasing counter.
    fn make_name_valid(&self, name: &str, max_len: usize, taken: impl Fn(&str) -> bool) -> String {
        let mut candidate = self.fold_case(name);
        if max_len > 0 {
            candidate = shorten(&candidate, max_len);
        }
        if self.is_reserved(&candidate) {
            candidate.push('0');
            if max_len > 0 && candidate.len() > max_len {
                candidate = shorten(&candidate[..candidate.len() - 1], max_len - 1) + "0";
            }
        }
        if !taken(&candidate) {
            return candidate;
        }
        let base = candidate.clone();
        for counter in 0u32.. {
            let suffix = counter.to_string();
            let len = base.chars().count();
            let limit = if max_len > 0 {
                max_len.saturating_sub(suffix.len())
            } else {
                len
            };
            let keep = limit.min(len.saturating_sub(1)).max(1);
            let attempt: String = base.chars().take(keep).chain(suffix.chars()).collect();
            if !taken(&attempt) {
                return attempt;
            }
        }
        base
    }
}

/// Shorten a name by removing vowels, then middle characters.
pub fn shorten(name: &str, target: usize) -> String {
    let mut chars: Vec<char> = name.chars().collect();
    while chars.len() > target {
        match chars
            .iter()
            .position(|c| matches!(c.to_ascii_uppercase(), 'A' | 'E' | 'I' | 'O' | 'U'))
        {
            Some(pos) => {
                chars.remove(pos);
            }
            None => {
                let mid = chars.len() / 2;
                chars.remove(mid);
            }
        }
    }
    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SqlType;

    #[test]
    fn test_sql_type_for_codes() {
        let dict = DbDictionary::generic();
        assert_eq!(dict.sql_type_for(TypeCode::Boolean, false, 0, 0), SqlType::Bit);
        assert_eq!(dict.sql_type_for(TypeCode::String, false, 0, 0), SqlType::Varchar);
        assert_eq!(dict.sql_type_for(TypeCode::String, true, 0, 0), SqlType::Clob);
        assert_eq!(dict.sql_type_for(TypeCode::Double, false, 10, 2), SqlType::Numeric);
        assert_eq!(dict.sql_type_for(TypeCode::Date, false, 0, 0), SqlType::Timestamp);
        assert_eq!(dict.sql_type_for(TypeCode::Object, false, 0, 0), SqlType::Blob);
    }

    #[test]
    fn test_preferred_type_substitution() {
        let dict = DbDictionary::generic().with_preferred_type(SqlType::Clob, SqlType::LongVarchar);
        assert_eq!(dict.sql_type_for(TypeCode::String, true, 0, 0), SqlType::LongVarchar);
    }

    #[test]
    fn test_action_support() {
        let dict = DbDictionary::generic().without_delete_action(FkAction::Cascade);
        assert!(!dict.supports_delete_action(FkAction::Cascade));
        assert!(dict.supports_delete_action(FkAction::None));
        assert!(dict.supports_update_action(FkAction::Cascade));
    }

    #[test]
    fn test_shorten_strips_vowels_first() {
        assert_eq!(shorten("ADDRESS", 5), "DDRSS");
        assert_eq!(shorten("XYZWV", 3), "XYV");
        assert_eq!(shorten("ID", 10), "ID");
    }

    #[test]
    fn test_valid_column_name_avoids_reserved_and_taken() {
        let dict = DbDictionary::generic();
        let mut group = SchemaGroup::new();
        let table = group.add_table(None, "ORDERS");
        assert_eq!(dict.valid_column_name("USER", table, &group), "USER0");
        group.add_column(table, "NAME");
        let name = dict.valid_column_name("NAME", table, &group);
        assert_ne!(name, "NAME");
        assert!(group.find_column(table, &name).is_none());
    }

    #[test]
    fn test_column_identifier_ignores_existing() {
        let dict = DbDictionary::generic();
        let mut group = SchemaGroup::new();
        let table = group.add_table(None, "ORDERS");
        group.add_column(table, "NAME");
        assert_eq!(dict.valid_column_identifier("NAME"), "NAME");
        assert_eq!(dict.valid_column_identifier("ORDER"), "ORDER0");
    }

    #[test]
    fn test_length_limit() {
        let dict = DbDictionary::generic().with_max_name_length(6);
        let group = SchemaGroup::new();
        assert_eq!(dict.valid_table_name("CUSTOMER", None, &group), "CSTMER");
    }
}
