//! Raw-to-concrete merge engine.
//!
//! A [`MergeContext`] reconciles what a record gives, what the defaults
//! policy proposes and what the schema already holds. Given values always
//! win over template values; templates only fill gaps. Schema components are
//! created only while adapting or filling in missing information.

mod constraint;
mod join;
pub mod sync;

pub use join::{JoinResult, JoinSpec};

use crate::defaults::{MappingDefaults, NamingScope};
use crate::descriptor::ColumnIo;
use crate::error::{Error, Result};
use crate::raw::{ColumnTemplate, MappingRecord};
use ormap_schema::{
    ColumnId, ColumnPath, DbDictionary, SchemaGroup, SqlType, TableId, TablePath, TypeCode,
};
use tracing::{debug, warn};

/// Answers questions about other descriptors that join targets can name.
pub trait TargetLookup {
    /// Table and columns of a single-table field of a class, searching
    /// superclasses. `None` if the field is unknown or not yet mapped.
    fn field_columns(&self, class: &str, field: &str) -> Option<(TableId, Vec<ColumnId>)>;

    /// Whether `candidate` names the class or one of its superclasses, by
    /// full or short name.
    fn class_matches(&self, class: &str, candidate: &str) -> bool;

    /// Tables of the superclasses a class shares or joins, nearest first.
    fn joinable_superclass_tables(&self, class: &str) -> Vec<TableId>;
}

/// Lookup that knows no other descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTargets;

impl TargetLookup for NoTargets {
    fn field_columns(&self, _class: &str, _field: &str) -> Option<(TableId, Vec<ColumnId>)> {
        None
    }

    fn class_matches(&self, class: &str, candidate: &str) -> bool {
        class == candidate || crate::model::short_name(class) == candidate
    }

    fn joinable_superclass_tables(&self, _class: &str) -> Vec<TableId> {
        Vec::new()
    }
}

/// Everything one merge step needs.
pub struct MergeContext<'a> {
    /// Schema being merged into.
    pub schema: &'a mut SchemaGroup,
    /// Platform rules.
    pub dict: &'a DbDictionary,
    /// Defaults policy.
    pub defaults: &'a dyn MappingDefaults,
    /// Other descriptors, for join targets.
    pub lookup: &'a dyn TargetLookup,
    /// May create and alter schema components.
    pub adapt: bool,
    /// May invent missing information.
    pub fill: bool,
    /// Descriptor being resolved, for diagnostics.
    pub context: String,
}

impl<'a> MergeContext<'a> {
    /// Create a validating context. Filling follows the defaults policy.
    pub fn new(
        schema: &'a mut SchemaGroup,
        dict: &'a DbDictionary,
        defaults: &'a dyn MappingDefaults,
        lookup: &'a dyn TargetLookup,
        context: impl Into<String>,
    ) -> Self {
        Self {
            schema,
            dict,
            defaults,
            lookup,
            adapt: false,
            fill: defaults.default_missing_info(),
            context: context.into(),
        }
    }

    /// Set the adapt flag.
    pub fn with_adapt(mut self, adapt: bool) -> Self {
        self.adapt = adapt;
        self
    }

    /// Set the fill flag.
    pub fn with_fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    /// Change the descriptor named in diagnostics.
    pub fn set_context(&mut self, context: impl Into<String>) {
        self.context = context.into();
    }

    /// Read-only view for the defaults policy.
    pub fn scope(&self) -> NamingScope<'_> {
        NamingScope::new(self.schema, self.dict)
    }

    /// Whether missing components may be created.
    pub fn lenient(&self) -> bool {
        self.adapt || self.fill
    }

    /// Find or create a table. A given name wins over the default name; the
    /// default is only used when adapting or filling.
    pub fn create_table(
        &mut self,
        given: Option<&str>,
        schema: Option<&str>,
        default: Option<String>,
    ) -> Result<TableId> {
        let name = match (given, default) {
            (Some(name), _) => name.to_string(),
            (None, Some(name)) if self.lenient() => name,
            _ => {
                return Err(Error::NoTable {
                    context: self.context.clone(),
                })
            }
        };

        let path = TablePath::parse(&name).or_schema(schema);
        if let Some(table) = self.schema.find_table(&path) {
            return Ok(table);
        }
        if !self.lenient() {
            return Err(Error::BadTable {
                context: self.context.clone(),
                table: path.to_string(),
            });
        }
        let table = self.schema.add_table(path.schema.as_deref(), &path.name);
        self.schema.table_mut(table).created = true;
        debug!(context = %self.context, table = %path, "created table");
        Ok(table)
    }

    /// Reconcile one column template with the user's column and the table.
    ///
    /// `compat` asks for a warning when the given type does not fit the
    /// template type.
    pub fn merge_column(
        &mut self,
        template: &ColumnTemplate,
        compat: bool,
        given: Option<&ColumnTemplate>,
        table: TableId,
        prefix: &str,
    ) -> Result<ColumnId> {
        let raw_name = given
            .and_then(|g| g.name.as_deref())
            .or(template.name.as_deref())
            .ok_or_else(|| Error::NoColumnName {
                context: self.context.clone(),
                prefix: prefix.to_string(),
            })?;
        let path = ColumnPath::parse(raw_name);
        if let Some(qualifier) = path.table.as_ref().filter(|t| !t.is_empty()) {
            let own = self.schema.table(table);
            if !own.is_named(&qualifier.to_string()) {
                return Err(Error::ColumnWrongTable {
                    context: self.context.clone(),
                    column: raw_name.to_string(),
                    table: qualifier.to_string(),
                    expected: own.full_name(),
                });
            }
        }
        let name = path.name;

        let found = self
            .schema
            .find_column(table, &name)
            .or_else(|| self.schema.find_column(table, &self.dict.fold_case(&name)));
        let (column, created) = match found {
            Some(column) => (column, false),
            None if self.lenient() => (self.schema.add_column(table, &name), true),
            None => {
                return Err(Error::BadColumnName {
                    context: self.context.clone(),
                    column: name,
                    table: self.schema.table(table).full_name(),
                })
            }
        };

        let template_type = self.requested_type(template);
        let given_type = given.and_then(|g| self.requested_type(g));
        if let (true, Some(g), Some(t)) = (compat, given_type, template_type) {
            if !g.accepts(t) {
                warn!(
                    context = %self.context,
                    column = %name,
                    given = %g,
                    expected = %t,
                    "given column type may not hold the mapped values"
                );
            }
        }
        let wanted = given_type.or(template_type);
        let code = given.and_then(|g| g.type_code).or(template.type_code);

        let current = self.schema.column(column).sql_type;
        let retype = match wanted {
            Some(wanted) if !created && current != SqlType::Other => {
                if self.schema.column(column).is_compatible(wanted, None, 0, 0) {
                    false
                } else if self.adapt {
                    warn!(
                        context = %self.context,
                        column = %name,
                        actual = %current,
                        expected = %wanted,
                        "retyping incompatible column"
                    );
                    true
                } else {
                    return Err(Error::IncompatibleColumn {
                        context: self.context.clone(),
                        column: self.schema.column_name(column),
                        actual: current,
                        expected: wanted,
                    });
                }
            }
            Some(_) => true,
            None => false,
        };

        let shape = self.adapt || created;
        let character_size = self.dict.character_column_size;
        let col = self.schema.column_mut(column);
        if retype {
            if let Some(wanted) = wanted {
                col.sql_type = wanted;
            }
            if let Some(code) = code {
                col.type_code = code;
            }
        }

        if let Some(not_null) = given
            .and_then(|g| g.not_null)
            .or_else(|| template.not_null.filter(|_| created))
        {
            col.not_null = not_null;
        }
        if let Some(default) = given
            .and_then(|g| g.default.clone())
            .or_else(|| created.then(|| template.default.clone()).flatten())
        {
            col.default = Some(default);
        }
        if let Some(comment) = given
            .and_then(|g| g.comment.clone())
            .or_else(|| template.comment.clone())
        {
            col.comment = Some(comment);
        }
        if let Some(field) = given
            .and_then(|g| g.target_field.clone())
            .or_else(|| template.target_field.clone())
        {
            col.target_field = Some(field);
        }
        let either = |f: fn(&ColumnTemplate) -> bool| f(template) || given.is_some_and(f);
        col.auto_assigned |= either(|t| t.auto_assigned);
        col.relation_id |= either(|t| t.relation_id);
        col.implicit_relation |= either(|t| t.implicit_relation);
        col.xml |= either(|t| t.xml);
        col.flags.pk_join |= either(|t| t.pk_join);

        if shape {
            if let Some(size) = given.and_then(|g| g.size).or(template.size) {
                col.size = size;
            }
            if let Some(decimals) = given.and_then(|g| g.decimals).or(template.decimals) {
                col.decimals = decimals;
            }
            if let Some(type_name) = given
                .and_then(|g| g.type_name.clone())
                .or_else(|| template.type_name.clone())
            {
                col.type_name = Some(type_name);
            }
            if col.size == 0 && col.sql_type.is_character() && !col.sql_type.is_lob() {
                col.size = character_size;
            }
        }
        Ok(column)
    }

    /// Reconcile the record's columns with the templates a mapping needs.
    ///
    /// The record gives either no columns or exactly one per template. On a
    /// count mismatch the columns scoped to the target table are tried, then,
    /// when neither adapting nor filling, the unscoped columns.
    pub fn create_columns(
        &mut self,
        record: &MappingRecord,
        prefix: &str,
        templates: &[ColumnTemplate],
        table: TableId,
    ) -> Result<(Vec<ColumnId>, ColumnIo)> {
        let given = self.given_columns(record, prefix, templates.len(), table)?;
        let mut columns = Vec::with_capacity(templates.len());
        for (i, template) in templates.iter().enumerate() {
            let column = self.merge_column(template, true, given.get(i).copied(), table, prefix)?;
            columns.push(column);
        }
        Ok((columns, ColumnIo::from_templates(given)))
    }

    fn given_columns<'r>(
        &self,
        record: &'r MappingRecord,
        prefix: &str,
        expected: usize,
        table: TableId,
    ) -> Result<Vec<&'r ColumnTemplate>> {
        let all: Vec<&ColumnTemplate> = record.columns.iter().collect();
        if all.is_empty() || all.len() == expected {
            return Ok(all);
        }

        let table_name = self.schema.table(table).full_name();
        let scoped = record.columns_in(Some(&table_name));
        if scoped.len() == expected {
            return Ok(scoped);
        }

        if self.lenient() {
            let candidate = if scoped.is_empty() { all } else { scoped };
            if candidate.len() >= expected {
                if candidate.len() > expected {
                    warn!(
                        context = %self.context,
                        prefix,
                        expected,
                        given = candidate.len(),
                        "ignoring extra given columns"
                    );
                }
                return Ok(candidate.into_iter().take(expected).collect());
            }
            warn!(
                context = %self.context,
                prefix,
                expected,
                given = candidate.len(),
                "too few given columns; using defaults"
            );
            return Ok(Vec::new());
        }

        let unscoped = record.columns_in(None);
        if unscoped.len() == expected {
            return Ok(unscoped);
        }
        Err(Error::ColumnCount {
            context: self.context.clone(),
            prefix: prefix.to_string(),
            expected,
            given: all.len(),
        })
    }

    /// SQL type a template asks for, if any.
    fn requested_type(&self, template: &ColumnTemplate) -> Option<SqlType> {
        template.sql_type.or_else(|| {
            template.type_code.map(|code| {
                let lob = template.size == Some(-1);
                self.dict.sql_type_for(
                    code,
                    lob,
                    template.size.unwrap_or(0).max(0),
                    template.decimals.unwrap_or(0),
                )
            })
        })
    }

    /// Name of a column for diagnostics.
    pub(crate) fn column_label(&self, column: ColumnId) -> String {
        self.schema.column_name(column)
    }

    /// Type code carried by a column, for join templates.
    pub(crate) fn column_code(&self, column: ColumnId) -> TypeCode {
        self.schema.column(column).type_code
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::DefaultsConfig;
    use crate::defaults::StandardDefaults;
    use ormap_schema::PrimaryKey;

    pub(crate) fn person_schema() -> (SchemaGroup, TableId, ColumnId) {
        let mut schema = SchemaGroup::new();
        let person = schema.add_table(None, "PERSON");
        let id = schema.add_typed_column(person, "ID", SqlType::BigInt);
        schema.set_primary_key(person, PrimaryKey::new(vec![id]));
        (schema, person, id)
    }

    pub(crate) fn strict() -> StandardDefaults {
        StandardDefaults::new(DefaultsConfig::default().with_default_missing_info(false))
    }

    #[test]
    fn test_create_table_precedence() {
        let (mut schema, person, _) = person_schema();
        let dict = DbDictionary::generic();
        let defaults = strict();
        let mut ctx = MergeContext::new(&mut schema, &dict, &defaults, &NoTargets, "Person");

        assert_eq!(ctx.create_table(Some("person"), None, Some("OTHER".into())).unwrap(), person);
        assert!(matches!(
            ctx.create_table(None, None, Some("PERSON".into())),
            Err(Error::NoTable { .. })
        ));
        assert!(matches!(
            ctx.create_table(Some("MISSING"), None, None),
            Err(Error::BadTable { table, .. }) if table == "MISSING"
        ));

        let mut ctx = ctx.with_adapt(true);
        let created = ctx.create_table(None, Some("APP"), Some("ADDRESS".into())).unwrap();
        assert!(schema.table(created).created);
        assert_eq!(schema.table(created).full_name(), "APP.ADDRESS");
    }

    #[test]
    fn test_merge_column_reuses_and_creates() {
        let (mut schema, person, id) = person_schema();
        let dict = DbDictionary::generic();
        let defaults = strict();
        let mut ctx = MergeContext::new(&mut schema, &dict, &defaults, &NoTargets, "Person.id");

        let template = ColumnTemplate::new("ID").with_type_code(TypeCode::Long);
        assert_eq!(ctx.merge_column(&template, true, None, person, "id").unwrap(), id);

        let missing = ColumnTemplate::new("NAME").with_type_code(TypeCode::String);
        assert!(matches!(
            ctx.merge_column(&missing, true, None, person, "name"),
            Err(Error::BadColumnName { .. })
        ));

        let mut ctx = ctx.with_fill(true);
        let name = ctx.merge_column(&missing, true, None, person, "name").unwrap();
        let col = schema.column(name);
        assert_eq!(col.sql_type, SqlType::Varchar);
        assert_eq!(col.size, dict.character_column_size);
    }

    #[test]
    fn test_given_values_win() {
        let (mut schema, person, _) = person_schema();
        let dict = DbDictionary::generic();
        let defaults = StandardDefaults::default();
        let mut ctx = MergeContext::new(&mut schema, &dict, &defaults, &NoTargets, "Person.name");

        let template = ColumnTemplate::new("name")
            .with_type_code(TypeCode::String)
            .with_not_null(false);
        let given = ColumnTemplate::new("FULL_NAME").with_size(80).with_not_null(true);
        let column = ctx
            .merge_column(&template, true, Some(&given), person, "name")
            .unwrap();
        let col = schema.column(column);
        assert_eq!(col.name.name(), "FULL_NAME");
        assert_eq!(col.size, 80);
        assert!(col.not_null);
    }

    #[test]
    fn test_incompatible_existing_column() {
        let (mut schema, person, _) = person_schema();
        let dict = DbDictionary::generic();
        let defaults = strict();
        let template = ColumnTemplate::new("ID").with_sql_type(SqlType::Blob);

        let mut ctx = MergeContext::new(&mut schema, &dict, &defaults, &NoTargets, "Person.id");
        assert!(matches!(
            ctx.merge_column(&template, true, None, person, "id"),
            Err(Error::IncompatibleColumn { actual: SqlType::BigInt, .. })
        ));

        let mut ctx = ctx.with_adapt(true);
        let column = ctx.merge_column(&template, true, None, person, "id").unwrap();
        assert_eq!(schema.column(column).sql_type, SqlType::Blob);
    }

    #[test]
    fn test_qualified_name_must_match_table() {
        let (mut schema, person, id) = person_schema();
        let dict = DbDictionary::generic();
        let defaults = strict();
        let mut ctx = MergeContext::new(&mut schema, &dict, &defaults, &NoTargets, "Person.id");
        let template = ColumnTemplate::new("ID");

        let qualified = ColumnTemplate::new("PERSON.ID");
        assert_eq!(
            ctx.merge_column(&template, false, Some(&qualified), person, "id").unwrap(),
            id
        );
        let wrong = ColumnTemplate::new("ADDRESS.ID");
        assert!(matches!(
            ctx.merge_column(&template, false, Some(&wrong), person, "id"),
            Err(Error::ColumnWrongTable { .. })
        ));
    }

    #[test]
    fn test_column_count_rules() {
        let (mut schema, person, _) = person_schema();
        let dict = DbDictionary::generic();
        let defaults = strict();
        let templates = [ColumnTemplate::new("AMOUNT").with_type_code(TypeCode::Int)];
        let record = MappingRecord::default()
            .with_column(ColumnTemplate::new("A"))
            .with_column(ColumnTemplate::new("B"));

        let mut ctx = MergeContext::new(&mut schema, &dict, &defaults, &NoTargets, "Order.amount")
            .with_adapt(false);
        let err = ctx.create_columns(&record, "amount", &templates, person).unwrap_err();
        assert!(matches!(err, Error::ColumnCount { expected: 1, given: 2, .. }));

        let mut ctx = ctx.with_adapt(true).with_fill(true);
        let (columns, io) = ctx.create_columns(&record, "amount", &templates, person).unwrap();
        assert_eq!(columns.len(), 1);
        assert!(io.is_default());
        assert_eq!(schema.column(columns[0]).name.name(), "A");
    }

    #[test]
    fn test_scoped_columns_fallback() {
        let (mut schema, person, _) = person_schema();
        let detail = schema.add_table(None, "DETAIL");
        let dict = DbDictionary::generic();
        let defaults = strict();
        let templates = [ColumnTemplate::new("NOTE").with_type_code(TypeCode::String)];
        let record = MappingRecord::default()
            .with_column(ColumnTemplate::new("NOTE_TEXT").with_table("DETAIL"))
            .with_column(ColumnTemplate::new("NOTE_KEY").uninsertable());

        let mut ctx = MergeContext::new(&mut schema, &dict, &defaults, &NoTargets, "Person.note")
            .with_adapt(true);
        let (scoped, _) = ctx.create_columns(&record, "note", &templates, detail).unwrap();
        assert_eq!(schema.column(scoped[0]).name.name(), "NOTE_TEXT");

        let mut ctx = MergeContext::new(&mut schema, &dict, &defaults, &NoTargets, "Person.note")
            .with_adapt(false);
        ctx.schema.add_column(person, "NOTE_KEY");
        let (unscoped, io) = ctx.create_columns(&record, "note", &templates, person).unwrap();
        assert_eq!(schema.column(unscoped[0]).name.name(), "NOTE_KEY");
        assert!(!io.is_insertable(0));
    }
}
