//! Indexes and unique constraints.

use super::MergeContext;
use crate::defaults::IndexRole;
use crate::error::{Error, Result};
use crate::raw::{Hint, IndexTemplate, UniqueTemplate};
use ormap_schema::{ColumnId, IndexId, UniqueId};
use tracing::{debug, warn};

impl MergeContext<'_> {
    /// Find, create or drop the index over mapped columns.
    ///
    /// An existing index over the same columns is reused. A forbidden index
    /// is dropped while adapting and fatal otherwise.
    pub fn create_index(
        &mut self,
        hint: &Hint<IndexTemplate>,
        prefix: &str,
        role: IndexRole<'_>,
        columns: &[ColumnId],
    ) -> Result<Option<IndexId>> {
        let Some(&first) = columns.first() else {
            if hint.is_explicit() {
                return Err(Error::NoConstraintColumns {
                    context: self.context.clone(),
                    kind: format!("{} index", prefix),
                });
            }
            return Ok(None);
        };
        let table = self.schema.column(first).table;
        let exist = self
            .schema
            .table(table)
            .indexes()
            .iter()
            .copied()
            .find(|id| self.schema.index(*id).columns_match(columns));

        if hint.is_forbidden() {
            let Some(exist) = exist else {
                return Ok(None);
            };
            if !self.adapt {
                return Err(Error::IndexExists {
                    context: self.context.clone(),
                    index: self.schema.index(exist).name.to_string(),
                });
            }
            self.schema.remove_index(exist);
            debug!(context = %self.context, prefix, "dropped forbidden index");
            return Ok(None);
        }

        let given = hint.explicit();
        if let Some(exist) = exist {
            if given.is_some_and(|g| g.unique) && !self.schema.index(exist).unique {
                if !self.adapt {
                    return Err(Error::IndexNotUnique {
                        context: self.context.clone(),
                        index: self.schema.index(exist).name.to_string(),
                    });
                }
                self.schema.index_mut(exist).unique = true;
            }
            return Ok(Some(exist));
        }

        let default = self.defaults.index(role, table, columns, self.scope());
        let (name, unique, columns) = match (given, default) {
            (Some(given), default) => {
                let mut columns = columns.to_vec();
                if given.columns.len() > 1 {
                    columns = self.named_columns(table, &given.columns)?;
                }
                let name = given.name.clone().or_else(|| default.and_then(|d| d.name));
                (name, given.unique, columns)
            }
            (None, Some(default)) if self.lenient() => {
                (default.name, default.unique, columns.to_vec())
            }
            _ => return Ok(None),
        };

        let base = name.unwrap_or_else(|| self.schema.column(first).name.name().to_string());
        let name = self.dict.valid_index_name(&base, table, self.schema);
        let id = self.schema.add_index(table, &name);
        let index = self.schema.index_mut(id);
        index.unique = unique;
        index.columns = columns;
        debug!(context = %self.context, index = %name, "created index");
        Ok(Some(id))
    }

    /// Find, create or drop the unique constraint over mapped columns.
    pub fn create_unique(
        &mut self,
        hint: &Hint<UniqueTemplate>,
        prefix: &str,
        columns: &[ColumnId],
    ) -> Result<Option<UniqueId>> {
        let Some(&first) = columns.first() else {
            if hint.is_explicit() {
                return Err(Error::NoConstraintColumns {
                    context: self.context.clone(),
                    kind: format!("{} unique constraint", prefix),
                });
            }
            return Ok(None);
        };
        let table = self.schema.column(first).table;
        let exist = self
            .schema
            .table(table)
            .uniques()
            .iter()
            .copied()
            .find(|id| self.schema.unique(*id).columns_match(columns));

        if hint.is_forbidden() {
            let Some(exist) = exist else {
                return Ok(None);
            };
            if !self.adapt {
                return Err(Error::UniqueExists {
                    context: self.context.clone(),
                    columns: self.schema.column_names(columns).join(", "),
                });
            }
            self.schema.remove_unique(exist);
            debug!(context = %self.context, prefix, "dropped forbidden unique constraint");
            return Ok(None);
        }

        let given = hint.explicit();
        let default = self.defaults.unique(table, columns);
        if given.is_none() && default.is_none() {
            return Ok(exist);
        }
        if let Some(exist) = exist {
            if given.is_some_and(|g| g.deferred) && !self.schema.unique(exist).deferred {
                warn!(
                    context = %self.context,
                    prefix,
                    "existing unique constraint is not deferred"
                );
            }
            return Ok(Some(exist));
        }

        if !self.dict.supports_unique_constraints {
            if given.is_some() {
                warn!(
                    context = %self.context,
                    prefix,
                    "unique constraints not supported; dropping"
                );
            }
            return Ok(None);
        }
        if given.is_none() && !self.lenient() {
            return Ok(None);
        }

        let (name, mut deferred) = match (given, default) {
            (Some(given), default) => (
                given.name.clone().or_else(|| default.and_then(|d| d.name)),
                given.deferred,
            ),
            (None, Some(default)) => (default.name, default.deferred),
            (None, None) => return Ok(None),
        };
        if deferred && !self.dict.supports_deferred_constraints {
            warn!(
                context = %self.context,
                prefix,
                platform = %self.dict.platform,
                "deferred unique constraints not supported"
            );
            deferred = false;
        }

        let name = name.map(|n| self.dict.valid_unique_name(&n, table, self.schema));
        let id = self.schema.add_unique(table, name.as_deref());
        let unique = self.schema.unique_mut(id);
        unique.columns = columns.to_vec();
        unique.deferred = deferred;
        debug!(context = %self.context, prefix, "created unique constraint");
        Ok(Some(id))
    }

    /// Resolve column names of a constraint against a table.
    pub fn named_columns(
        &self,
        table: ormap_schema::TableId,
        names: &[String],
    ) -> Result<Vec<ColumnId>> {
        names
            .iter()
            .map(|name| {
                self.schema
                    .find_column(table, name)
                    .or_else(|| self.schema.find_column(table, &self.dict.fold_case(name)))
                    .ok_or_else(|| Error::BadColumnName {
                        context: self.context.clone(),
                        column: name.clone(),
                        table: self.schema.table(table).full_name(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{person_schema, strict};
    use super::super::{MergeContext, NoTargets};
    use super::*;
    use crate::defaults::StandardDefaults;
    use ormap_schema::{DbDictionary, SqlType};

    #[test]
    fn test_index_created_and_reused() {
        let (mut schema, person, _) = person_schema();
        let name = schema.add_typed_column(person, "NAME", SqlType::Varchar);
        let dict = DbDictionary::generic();
        let defaults = StandardDefaults::default();
        let hint = Hint::Explicit(IndexTemplate::named("I_PERSON_NAME"));

        let mut ctx = MergeContext::new(&mut schema, &dict, &defaults, &NoTargets, "Person.name");
        let role = IndexRole::Value {
            name: "name",
            logical_fk: false,
        };
        let first = ctx.create_index(&hint, "name", role, &[name]).unwrap().unwrap();
        let again = ctx.create_index(&hint, "name", role, &[name]).unwrap();
        assert_eq!(again, Some(first));
        assert_eq!(schema.index(first).name.name(), "I_PERSON_NAME");
        assert_eq!(schema.table(person).indexes().len(), 1);
    }

    #[test]
    fn test_forbidden_index() {
        let (mut schema, person, _) = person_schema();
        let name = schema.add_typed_column(person, "NAME", SqlType::Varchar);
        let existing = schema.add_index(person, "I_NAME");
        schema.index_mut(existing).columns = vec![name];
        let dict = DbDictionary::generic();
        let defaults = strict();
        let role = IndexRole::Value {
            name: "name",
            logical_fk: false,
        };

        let mut ctx = MergeContext::new(&mut schema, &dict, &defaults, &NoTargets, "Person.name");
        let err = ctx.create_index(&Hint::Forbidden, "name", role, &[name]).unwrap_err();
        assert!(matches!(err, Error::IndexExists { .. }));

        let mut ctx = ctx.with_adapt(true);
        assert_eq!(ctx.create_index(&Hint::Forbidden, "name", role, &[name]).unwrap(), None);
        assert!(schema.table(person).indexes().is_empty());
    }

    #[test]
    fn test_index_promoted_only_when_adapting() {
        let (mut schema, person, _) = person_schema();
        let name = schema.add_typed_column(person, "NAME", SqlType::Varchar);
        let existing = schema.add_index(person, "I_NAME");
        schema.index_mut(existing).columns = vec![name];
        let dict = DbDictionary::generic();
        let defaults = strict();
        let role = IndexRole::Value {
            name: "name",
            logical_fk: false,
        };
        let hint = Hint::Explicit(IndexTemplate::default().unique());

        let mut ctx = MergeContext::new(&mut schema, &dict, &defaults, &NoTargets, "Person.name");
        assert!(matches!(
            ctx.create_index(&hint, "name", role, &[name]),
            Err(Error::IndexNotUnique { .. })
        ));
        let mut ctx = ctx.with_adapt(true);
        ctx.create_index(&hint, "name", role, &[name]).unwrap();
        assert!(schema.index(existing).unique);
    }

    #[test]
    fn test_explicit_index_without_columns() {
        let (mut schema, _, _) = person_schema();
        let dict = DbDictionary::generic();
        let defaults = strict();
        let mut ctx = MergeContext::new(&mut schema, &dict, &defaults, &NoTargets, "Person.tags");
        let err = ctx
            .create_index(
                &Hint::Explicit(IndexTemplate::default()),
                "tags",
                IndexRole::Version,
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, Error::NoConstraintColumns { .. }));
        assert_eq!(
            ctx.create_index(&Hint::Unspecified, "tags", IndexRole::Version, &[]).unwrap(),
            None
        );
    }

    #[test]
    fn test_unique_support_and_deferral() {
        let (mut schema, person, _) = person_schema();
        let email = schema.add_typed_column(person, "EMAIL", SqlType::Varchar);
        let defaults = StandardDefaults::default();
        let mut template = UniqueTemplate::default().with_name("U_EMAIL");
        template.deferred = true;
        let hint = Hint::Explicit(template);

        let unsupported = DbDictionary::generic().without_unique_constraints();
        let mut ctx =
            MergeContext::new(&mut schema, &unsupported, &defaults, &NoTargets, "Person.email");
        assert_eq!(ctx.create_unique(&hint, "email", &[email]).unwrap(), None);

        let no_defer = DbDictionary::generic().without_deferred_constraints();
        let mut ctx =
            MergeContext::new(&mut schema, &no_defer, &defaults, &NoTargets, "Person.email");
        let id = ctx.create_unique(&hint, "email", &[email]).unwrap().unwrap();
        assert!(!schema.unique(id).deferred);
        assert_eq!(schema.unique(id).columns, vec![email]);
    }

    #[test]
    fn test_forbidden_unique_dropped_when_adapting() {
        let (mut schema, person, _) = person_schema();
        let email = schema.add_typed_column(person, "EMAIL", SqlType::Varchar);
        let existing = schema.add_unique(person, Some("U_EMAIL"));
        schema.unique_mut(existing).columns = vec![email];
        let dict = DbDictionary::generic();
        let defaults = strict();

        let mut ctx = MergeContext::new(&mut schema, &dict, &defaults, &NoTargets, "Person.email");
        assert!(matches!(
            ctx.create_unique(&Hint::Forbidden, "email", &[email]),
            Err(Error::UniqueExists { .. })
        ));
        let mut ctx = ctx.with_adapt(true);
        assert_eq!(ctx.create_unique(&Hint::Forbidden, "email", &[email]).unwrap(), None);
        assert!(schema.table(person).uniques().is_empty());
    }
}
