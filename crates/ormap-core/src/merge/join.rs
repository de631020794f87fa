//! Join columns and foreign keys.

use super::MergeContext;
use crate::defaults::JoinRole;
use crate::descriptor::ColumnIo;
use crate::error::{Error, Result};
use crate::raw::{ColumnTemplate, ForeignKeyTemplate, JoinDirection, MappingRecord};
use ormap_schema::{ColumnId, ColumnPath, Constant, FkAction, ForeignKeyId, TableId, TypeCode};
use tracing::{debug, warn};

/// What a join connects.
#[derive(Debug, Clone)]
pub struct JoinSpec<'s> {
    /// Which join is being merged, for diagnostics.
    pub prefix: &'s str,
    /// Table expected to hold the key.
    pub local: TableId,
    /// Table expected to be joined to.
    pub target: TableId,
    /// Class joining from.
    pub owner_class: &'s str,
    /// Class joined to.
    pub target_class: &'s str,
    /// Primary key columns of the owner, for primary key joins.
    pub owner_columns: Vec<ColumnId>,
    /// Primary key columns of the joined class.
    pub target_columns: Vec<ColumnId>,
    /// What the join is for.
    pub role: JoinRole<'s>,
    /// Whether the key may live in the joined table.
    pub inversable: bool,
}

/// A merged foreign key.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinResult {
    /// The key.
    pub foreign_key: ForeignKeyId,
    /// Table holding the key.
    pub table: TableId,
    /// Which side holds the key.
    pub direction: JoinDirection,
    /// Key columns, constant-joined columns last.
    pub columns: Vec<ColumnId>,
    /// Permissions of the key columns.
    pub io: ColumnIo,
}

#[derive(Debug, Clone)]
enum JoinTarget {
    Column(ColumnId),
    Constant(Constant),
}

#[derive(Debug, Clone)]
struct Join {
    /// Column holding the key, or compared to a constant.
    local: ColumnId,
    target: JoinTarget,
    inverse: bool,
}

impl MergeContext<'_> {
    /// Build the joins of a record and find or create the foreign key
    /// over them.
    pub fn create_foreign_key(
        &mut self,
        record: &MappingRecord,
        spec: &JoinSpec<'_>,
    ) -> Result<JoinResult> {
        let joins = self.create_joins(record, spec)?;

        let mut local = spec.local;
        let mut foreign = spec.target;
        let mut local_set = false;
        let mut has_constant = false;
        let mut inverse = false;
        for join in &joins {
            match join.target {
                JoinTarget::Column(target) => {
                    let table = self.schema.column(join.local).table;
                    if !local_set {
                        local = table;
                        local_set = true;
                    } else if table != local {
                        return Err(Error::MultipleForeignKeyTables {
                            context: self.context.clone(),
                            first: self.schema.table(local).full_name(),
                            second: self.schema.table(table).full_name(),
                        });
                    }
                    foreign = self.schema.column(target).table;
                    inverse |= join.inverse;
                }
                JoinTarget::Constant(_) => has_constant = true,
            }
        }
        let direction = if inverse {
            JoinDirection::Inverse
        } else {
            JoinDirection::Forward
        };

        let fk = match self.existing_foreign_key(&joins, local, has_constant) {
            Some(exist) => {
                self.reuse_foreign_key(record, exist)?;
                exist
            }
            None => self.add_foreign_key(record, spec, &joins, local, foreign, inverse),
        };

        let key = self.schema.foreign_key(fk);
        let mut columns = key.columns().to_vec();
        columns.extend(key.constant_columns().iter().map(|(c, _)| *c));
        let io = join_io(&record.columns, &joins, key.columns().len(), inverse);
        Ok(JoinResult {
            foreign_key: fk,
            table: local,
            direction,
            columns,
            io,
        })
    }

    fn existing_foreign_key(
        &self,
        joins: &[Join],
        local: TableId,
        has_constant: bool,
    ) -> Option<ForeignKeyId> {
        if has_constant {
            return None;
        }
        let (cols, pks): (Vec<ColumnId>, Vec<ColumnId>) = joins
            .iter()
            .filter_map(|j| match j.target {
                JoinTarget::Column(t) => Some((j.local, t)),
                JoinTarget::Constant(_) => None,
            })
            .unzip();
        self.schema
            .table(local)
            .foreign_keys()
            .iter()
            .copied()
            .find(|id| {
                let fk = self.schema.foreign_key(*id);
                fk.constant_columns().is_empty()
                    && fk.constant_pk_columns().is_empty()
                    && fk.columns_match(&cols, &pks)
            })
    }

    fn reuse_foreign_key(&mut self, record: &MappingRecord, exist: ForeignKeyId) -> Result<()> {
        let adapt = self.adapt;
        if record.foreign_key.is_forbidden() {
            let fk = self.schema.foreign_key(exist);
            if !fk.is_logical() && !adapt {
                return Err(Error::ForeignKeyExists {
                    context: self.context.clone(),
                    columns: self.schema.column_names(fk.columns()).join(", "),
                });
            }
            self.schema.foreign_key_mut(exist).delete_action = FkAction::None;
        }

        if let Some(given) = record.foreign_key.explicit() {
            let fk = self.schema.foreign_key_mut(exist);
            if given.deferred && !fk.deferred {
                warn!(context = %self.context, "existing foreign key is not deferred");
            }
            if adapt {
                if let Some(action) = given.update_action.filter(|a| *a != FkAction::None) {
                    fk.update_action = action;
                }
                if let Some(action) = given.delete_action.filter(|a| *a != FkAction::None) {
                    fk.delete_action = action;
                }
            }
        }
        Ok(())
    }

    fn add_foreign_key(
        &mut self,
        record: &MappingRecord,
        spec: &JoinSpec<'_>,
        joins: &[Join],
        local: TableId,
        foreign: TableId,
        inverse: bool,
    ) -> ForeignKeyId {
        let default = match spec.role {
            JoinRole::ForeignKey { name, .. } => {
                self.defaults.foreign_key(name, local, foreign, inverse)
            }
            JoinRole::Class | JoinRole::Field => self.defaults.join_foreign_key(local, foreign),
        };
        let template = self.foreign_key_template(record, default);

        let mut delete = template.delete_action.unwrap_or_default();
        let mut update = template.update_action.unwrap_or_default();
        let mut deferred = template.deferred;
        if !self.dict.supports_delete_action(delete) || !self.dict.supports_update_action(update) {
            warn!(
                context = %self.context,
                delete = %delete,
                update = %update,
                "foreign key actions not supported; creating a logical key"
            );
            delete = FkAction::None;
            update = FkAction::None;
        }
        if deferred && !self.dict.supports_deferred_constraints {
            warn!(context = %self.context, "deferred foreign keys not supported");
            deferred = false;
        }

        let name = template
            .name
            .as_deref()
            .map(|n| self.dict.valid_foreign_key_name(n, local, self.schema));
        let id = self.schema.add_foreign_key(local, name.as_deref());
        let fk = self.schema.foreign_key_mut(id);
        fk.delete_action = delete;
        fk.update_action = update;
        fk.deferred = deferred;
        for join in joins {
            match &join.target {
                JoinTarget::Column(target) => fk.join(join.local, *target),
                JoinTarget::Constant(value) if join.inverse != inverse => {
                    fk.join_constant_pk(value.clone(), join.local)
                }
                JoinTarget::Constant(value) => fk.join_constant(join.local, value.clone()),
            }
        }
        debug!(
            context = %self.context,
            table = %self.schema.table(local).full_name(),
            logical = delete == FkAction::None,
            "created foreign key"
        );
        id
    }

    /// Given data wins; defaults fill gaps only while adapting or filling.
    fn foreign_key_template(
        &self,
        record: &MappingRecord,
        default: Option<ForeignKeyTemplate>,
    ) -> ForeignKeyTemplate {
        let given = record.foreign_key.explicit();
        match (given, default) {
            (Some(given), None) => given.clone(),
            (Some(given), Some(_)) if !self.lenient() => given.clone(),
            (Some(given), Some(default)) => ForeignKeyTemplate {
                name: given.name.clone().or(default.name),
                delete_action: given
                    .delete_action
                    .filter(|a| *a != FkAction::None)
                    .or(default.delete_action),
                update_action: given
                    .update_action
                    .filter(|a| *a != FkAction::None)
                    .or(default.update_action),
                deferred: given.deferred,
            },
            (None, Some(default)) if self.lenient() && !record.foreign_key.is_forbidden() => {
                default
            }
            _ => ForeignKeyTemplate::default(),
        }
    }

    fn create_joins(&mut self, record: &MappingRecord, spec: &JoinSpec<'_>) -> Result<Vec<Join>> {
        if record.columns.is_empty() {
            if !self.lenient() || spec.target_columns.is_empty() {
                return Err(Error::NoJoinColumns {
                    context: self.context.clone(),
                    prefix: spec.prefix.to_string(),
                });
            }
            let count = spec.target_columns.len();
            let mut joins = Vec::with_capacity(count);
            for (i, target) in spec.target_columns.iter().enumerate() {
                let mut template = self.mirror_template(*target);
                let target_name = self.schema.column(*target).name.name().to_string();
                self.defaults.populate_join_column(
                    spec.role,
                    Some(&target_name),
                    i,
                    count,
                    spec.local,
                    &mut template,
                    self.scope(),
                );
                let local = self.merge_column(&template, true, None, spec.local, spec.prefix)?;
                joins.push(Join {
                    local,
                    target: JoinTarget::Column(*target),
                    inverse: false,
                });
            }
            return Ok(joins);
        }

        let count = record.columns.len();
        let mut joins = Vec::with_capacity(count);
        for (i, given) in record.columns.iter().enumerate() {
            let inversable = spec.inversable && !given.pk_join;
            joins.push(self.merge_join_column(record, spec, given, i, count, inversable)?);
        }
        Ok(joins)
    }

    /// Template copying the shape of a target column.
    fn mirror_template(&self, target: ColumnId) -> ColumnTemplate {
        let col = self.schema.column(target);
        ColumnTemplate {
            name: Some(col.name.name().to_string()),
            sql_type: Some(col.sql_type),
            type_name: col.type_name.clone(),
            type_code: Some(col.type_code),
            size: Some(col.size),
            decimals: Some(col.decimals),
            ..ColumnTemplate::default()
        }
    }

    fn merge_join_column(
        &mut self,
        record: &MappingRecord,
        spec: &JoinSpec<'_>,
        given: &ColumnTemplate,
        position: usize,
        count: usize,
        inversable: bool,
    ) -> Result<Join> {
        let mut name = given.name.clone();
        if name.is_none() && given.pk_join {
            if let [pk] = spec.owner_columns.as_slice() {
                name = Some(self.schema.column(*pk).name.name().to_string());
            }
        }
        if name.is_none() && !self.lenient() {
            return Err(Error::NoJoinColumnName {
                context: self.context.clone(),
                prefix: spec.prefix.to_string(),
            });
        }

        // A qualified column name may place the key in the joined table.
        let mut local = spec.local;
        let mut foreign = spec.target;
        let mut full_name = false;
        let mut inverse = false;
        if let Some(raw) = name.clone() {
            let path = ColumnPath::parse(&raw);
            if let Some(table) = path.table {
                local = if table.is_empty() {
                    foreign
                } else {
                    self.join_table(&table.to_string(), local, foreign, None, &raw)?
                };
                full_name = true;
                name = Some(path.name);
                if local != spec.local {
                    foreign = spec.local;
                    inverse = true;
                }
            }
        }
        if !full_name && record.join_direction == JoinDirection::Inverse {
            local = foreign;
            foreign = spec.local;
            inverse = true;
        }

        let mut target_name: Option<String> = None;
        let mut target_table: Option<TableId> = None;
        let mut constant: Option<Constant> = None;
        let mut full_target = false;
        if let (None, Some(field)) = (given.target.as_deref(), given.target_field.as_deref()) {
            let mut class = if inverse { spec.owner_class } else { spec.target_class };
            let mut field_name = field;
            if let Some((prefix, rest)) = field.rsplit_once('.') {
                full_target = true;
                field_name = rest;
                if prefix.is_empty() {
                    if !inverse {
                        class = spec.owner_class;
                    }
                } else {
                    class = self.target_class(prefix, spec)?;
                }
            }
            let (table, columns) = self
                .lookup
                .field_columns(class, field_name)
                .ok_or_else(|| Error::BadTargetField {
                    context: self.context.clone(),
                    field: field.to_string(),
                    reason: format!("{} has no mapped field {}", class, field_name),
                })?;
            let [column] = columns.as_slice() else {
                return Err(Error::BadTargetField {
                    context: self.context.clone(),
                    field: field.to_string(),
                    reason: format!("maps to {} columns", columns.len()),
                });
            };
            target_table = Some(table);
            target_name = Some(self.schema.column(*column).name.name().to_string());
        } else if let Some(target) = given.target.as_deref() {
            if Constant::is_literal(target) {
                let value = Constant::parse(target).map_err(|_| Error::BadJoinConstant {
                    context: self.context.clone(),
                    literal: target.to_string(),
                })?;
                constant = Some(value);
            } else {
                let path = ColumnPath::parse(target);
                match path.table {
                    Some(table) if table.is_empty() => {
                        full_target = true;
                        if !inverse {
                            target_table = Some(local);
                        }
                    }
                    Some(table) => {
                        full_target = true;
                        let class = if inverse { spec.owner_class } else { spec.target_class };
                        target_table = Some(self.join_table(
                            &table.to_string(),
                            foreign,
                            local,
                            Some(class),
                            target,
                        )?);
                    }
                    None => {}
                }
                target_name = Some(path.name);
            }
        }

        // An explicit target in the expected local table reverses the join.
        if target_table == Some(local) && local != foreign {
            if full_name {
                return Err(Error::ColumnWrongTable {
                    context: self.context.clone(),
                    column: target_name.clone().unwrap_or_default(),
                    table: self.schema.table(local).full_name(),
                    expected: self.schema.table(foreign).full_name(),
                });
            }
            local = foreign;
            foreign = spec.local;
        } else if let Some(table) = target_table {
            foreign = table;
        }

        // A self join counts as inverse when only one side is qualified.
        inverse = inverse
            || local != spec.local
            || (local == foreign
                && ((full_name && !full_target) || (name.is_none() && full_target)));
        if !inversable && constant.is_none() && inverse {
            return Err(Error::BadInverseJoin {
                context: self.context.clone(),
                column: name.clone().unwrap_or_default(),
                self_join: local == foreign,
            });
        }
        if name.is_none() && constant.is_some() {
            return Err(Error::NoJoinColumnName {
                context: self.context.clone(),
                prefix: spec.prefix.to_string(),
            });
        }

        if constant.is_none() && target_name.is_none() {
            let pk = self.schema.primary_key_columns(foreign).to_vec();
            match (&name, pk.as_slice()) {
                (_, [only]) if count == 1 => {
                    target_name = Some(self.schema.column(*only).name.name().to_string());
                }
                (None, _) => {
                    return Err(Error::AmbiguousJoin {
                        context: self.context.clone(),
                        prefix: spec.prefix.to_string(),
                        reason: format!(
                            "{} join columns and {} target primary key columns",
                            count,
                            pk.len()
                        ),
                    });
                }
                (Some(local_name), _) => {
                    if self.schema.find_column(foreign, local_name).is_some() {
                        target_name = Some(local_name.clone());
                    } else {
                        return Err(Error::AmbiguousJoin {
                            context: self.context.clone(),
                            prefix: spec.prefix.to_string(),
                            reason: format!(
                                "no target given for {} and {} has no column of that name",
                                local_name,
                                self.schema.table(foreign).full_name()
                            ),
                        });
                    }
                }
            }
        }

        let (mut template, target) = match constant {
            Some(value) => {
                let code = match &value {
                    Constant::Text(_) => Some(TypeCode::String),
                    Constant::Int(_) => Some(TypeCode::Int),
                    Constant::Float(_) => Some(TypeCode::Double),
                    Constant::Null => None,
                };
                let template = ColumnTemplate {
                    name: name.clone(),
                    type_code: code,
                    ..ColumnTemplate::default()
                };
                (template, JoinTarget::Constant(value))
            }
            None => {
                let target_name = target_name.unwrap_or_default();
                let column = self
                    .schema
                    .find_column(foreign, &target_name)
                    .or_else(|| {
                        self.schema
                            .find_column(foreign, &self.dict.fold_case(&target_name))
                    })
                    .ok_or_else(|| Error::BadJoinTarget {
                        context: self.context.clone(),
                        target: target_name.clone(),
                        table: self.schema.table(foreign).full_name(),
                    })?;
                (self.mirror_template(column), JoinTarget::Column(column))
            }
        };

        let target_label = match &target {
            JoinTarget::Column(column) => Some(self.schema.column(*column).name.name().to_string()),
            JoinTarget::Constant(_) => None,
        };
        self.defaults.populate_join_column(
            spec.role,
            target_label.as_deref(),
            position,
            count,
            local,
            &mut template,
            self.scope(),
        );
        if name.is_some() {
            template.name.clone_from(&name);
        }

        let mut stripped = given.clone();
        stripped.name = name;
        stripped.target = None;
        stripped.target_field = None;
        let column = self.merge_column(&template, true, Some(&stripped), local, spec.prefix)?;
        Ok(Join {
            local: column,
            target,
            inverse,
        })
    }

    /// Table named in a join: the expected table, the other side, or a
    /// joined superclass table of a class.
    fn join_table(
        &self,
        name: &str,
        expected: TableId,
        other: TableId,
        class: Option<&str>,
        column: &str,
    ) -> Result<TableId> {
        if self.schema.table(expected).is_named(name) {
            return Ok(expected);
        }
        if self.schema.table(other).is_named(name) {
            return Ok(other);
        }
        if let Some(class) = class {
            if let Some(table) = self
                .lookup
                .joinable_superclass_tables(class)
                .into_iter()
                .find(|t| self.schema.table(*t).is_named(name))
            {
                return Ok(table);
            }
        }
        Err(Error::ColumnWrongTable {
            context: self.context.clone(),
            column: column.to_string(),
            table: name.to_string(),
            expected: self.schema.table(expected).full_name(),
        })
    }

    fn target_class<'s>(&self, name: &str, spec: &JoinSpec<'s>) -> Result<&'s str> {
        if self.lookup.class_matches(spec.owner_class, name) {
            Ok(spec.owner_class)
        } else if self.lookup.class_matches(spec.target_class, name) {
            Ok(spec.target_class)
        } else {
            Err(Error::BadTargetClass {
                context: self.context.clone(),
                class: name.to_string(),
                expected: spec.target_class.to_string(),
            })
        }
    }
}

/// Permissions of key columns. Column joins keep their position; constant
/// joins on the key side follow the key columns.
fn join_io(given: &[ColumnTemplate], joins: &[Join], key_len: usize, inverse: bool) -> ColumnIo {
    let mut io = ColumnIo::default();
    if given.is_empty() {
        return io;
    }
    let mut columns = 0;
    let mut constants = 0;
    for (join, template) in joins.iter().zip(given) {
        let position = match join.target {
            JoinTarget::Column(_) => {
                columns += 1;
                columns - 1
            }
            JoinTarget::Constant(_) if join.inverse == inverse => {
                constants += 1;
                key_len + constants - 1
            }
            JoinTarget::Constant(_) => continue,
        };
        io.set_insertable(position, !template.uninsertable);
        io.set_updatable(position, !template.unupdatable);
    }
    io
}
