//! Resolved schema components back to raw records.
//!
//! Each function writes only what a later merge would not derive on its own:
//! names are qualified when a column lives outside the expected table, types
//! are written when they differ from the template, and constraints equal to
//! the defaults are left unspecified.

use crate::defaults::NamingScope;
use crate::descriptor::ColumnIo;
use crate::raw::{ColumnTemplate, ForeignKeyTemplate, Hint, IndexTemplate, UniqueTemplate};
use ormap_schema::{Column, ColumnId, FkAction, ForeignKeyId, IndexId, SqlType, TableId, UniqueId};

/// Record one column.
pub fn sync_column(
    scope: NamingScope<'_>,
    column: ColumnId,
    table: TableId,
    template: Option<&ColumnTemplate>,
) -> ColumnTemplate {
    let col = scope.group.column(column);
    let mut out = ColumnTemplate {
        name: Some(qualified_name(scope, col, table)),
        ..ColumnTemplate::default()
    };
    if template.map(|t| requested_type(scope, t)) != Some(Some(col.sql_type))
        && col.sql_type != SqlType::Other
    {
        out.sql_type = Some(col.sql_type);
    }
    out.type_name.clone_from(&col.type_name);
    if col.size != 0 && template.and_then(|t| t.size) != Some(col.size) {
        out.size = Some(col.size);
    }
    if col.decimals != 0 && template.and_then(|t| t.decimals) != Some(col.decimals) {
        out.decimals = Some(col.decimals);
    }
    if col.not_null {
        out.not_null = Some(true);
    }
    out.default.clone_from(&col.default);
    out.comment.clone_from(&col.comment);
    out.target_field.clone_from(&col.target_field);
    out.auto_assigned = col.auto_assigned;
    out.relation_id = col.relation_id;
    out.implicit_relation = col.implicit_relation;
    out.pk_join = col.flags.pk_join;
    out.xml = col.xml;
    out
}

/// Record a column list. Empty when every column carries its template name
/// and type and every column may be inserted and updated. A template name the
/// dictionary would rewrite, such as a reserved word, is always written.
pub fn sync_columns(
    scope: NamingScope<'_>,
    columns: &[ColumnId],
    table: TableId,
    templates: &[ColumnTemplate],
    io: &ColumnIo,
) -> Vec<ColumnTemplate> {
    let derivable = io.is_default()
        && columns.len() == templates.len()
        && columns.iter().zip(templates).all(|(c, t)| {
            let col = scope.group.column(*c);
            col.table == table
                && t
                    .name
                    .as_deref()
                    .is_some_and(|n| col.name.matches(n) && !renamed_by_dictionary(scope, n))
                && requested_type(scope, t).map_or(true, |wanted| wanted == col.sql_type)
        });
    if derivable {
        return Vec::new();
    }
    columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let mut out = sync_column(scope, *c, table, templates.get(i));
            out.uninsertable = !io.is_insertable(i);
            out.unupdatable = !io.is_updatable(i);
            out
        })
        .collect()
}

fn renamed_by_dictionary(scope: NamingScope<'_>, name: &str) -> bool {
    !scope
        .dict
        .valid_column_identifier(name)
        .eq_ignore_ascii_case(name)
}

/// Record a foreign key: its join columns with targets, and the key itself
/// unless the defaults would produce the same key.
pub fn sync_foreign_key(
    scope: NamingScope<'_>,
    fk: ForeignKeyId,
    local: TableId,
    target: TableId,
    default: Option<&ForeignKeyTemplate>,
    io: &ColumnIo,
) -> (Vec<ColumnTemplate>, Hint<ForeignKeyTemplate>) {
    let key = scope.group.foreign_key(fk);
    let mut columns = Vec::new();
    for (i, (col, pk)) in key.columns().iter().zip(key.pk_columns()).enumerate() {
        let mut out = join_column(scope, *col, local);
        out.target = Some(qualified_name(scope, scope.group.column(*pk), target));
        out.uninsertable = !io.is_insertable(i);
        out.unupdatable = !io.is_updatable(i);
        columns.push(out);
    }
    for (col, value) in key.constant_columns() {
        let mut out = join_column(scope, *col, local);
        out.target = Some(value.to_string());
        columns.push(out);
    }
    for (pk, value) in key.constant_pk_columns() {
        let mut out = join_column(scope, *pk, local);
        out.target = Some(value.to_string());
        columns.push(out);
    }

    let given = ForeignKeyTemplate {
        name: key.name.as_ref().map(|n| n.name().to_string()),
        delete_action: Some(key.delete_action),
        update_action: Some(key.update_action),
        deferred: key.deferred,
    };
    let hint = match default {
        _ if key.is_logical() => {
            if default.is_some_and(|d| d.delete_action.unwrap_or_default() != FkAction::None) {
                Hint::Forbidden
            } else {
                Hint::Unspecified
            }
        }
        Some(default)
            if default.delete_action.unwrap_or_default() == key.delete_action
                && default.update_action.unwrap_or_default() == key.update_action
                && default.deferred == key.deferred =>
        {
            Hint::Unspecified
        }
        _ => Hint::Explicit(given),
    };
    (columns, hint)
}

/// Record an index.
pub fn sync_index(
    scope: NamingScope<'_>,
    index: Option<IndexId>,
    default: Option<&IndexTemplate>,
) -> Hint<IndexTemplate> {
    let Some(index) = index else {
        return if default.is_some() {
            Hint::Forbidden
        } else {
            Hint::Unspecified
        };
    };
    let index = scope.group.index(index);
    let same_as_default = default.is_some_and(|d| {
        d.unique == index.unique
            && d.name.as_deref().map_or(true, |n| index.name.matches(n))
    });
    if same_as_default {
        return Hint::Unspecified;
    }
    Hint::Explicit(IndexTemplate {
        name: Some(index.name.name().to_string()),
        unique: index.unique,
        columns: Vec::new(),
    })
}

/// Record a unique constraint.
pub fn sync_unique(
    scope: NamingScope<'_>,
    unique: Option<UniqueId>,
    default: Option<&UniqueTemplate>,
) -> Hint<UniqueTemplate> {
    let Some(unique) = unique else {
        return if default.is_some() {
            Hint::Forbidden
        } else {
            Hint::Unspecified
        };
    };
    let unique = scope.group.unique(unique);
    if default.is_some_and(|d| d.deferred == unique.deferred && d.name.is_none()) {
        return Hint::Unspecified;
    }
    Hint::Explicit(UniqueTemplate {
        name: unique.name.as_ref().map(|n| n.name().to_string()),
        columns: Vec::new(),
        deferred: unique.deferred,
    })
}

fn join_column(scope: NamingScope<'_>, column: ColumnId, table: TableId) -> ColumnTemplate {
    let col = scope.group.column(column);
    ColumnTemplate {
        name: Some(qualified_name(scope, col, table)),
        pk_join: col.flags.pk_join,
        ..ColumnTemplate::default()
    }
}

fn qualified_name(scope: NamingScope<'_>, col: &Column, table: TableId) -> String {
    if col.table == table {
        col.name.name().to_string()
    } else {
        format!("{}.{}", scope.group.table(col.table).full_name(), col.name.name())
    }
}

fn requested_type(scope: NamingScope<'_>, template: &ColumnTemplate) -> Option<SqlType> {
    template.sql_type.or_else(|| {
        template.type_code.map(|code| {
            scope.dict.sql_type_for(
                code,
                template.size == Some(-1),
                template.size.unwrap_or(0).max(0),
                template.decimals.unwrap_or(0),
            )
        })
    })
}
