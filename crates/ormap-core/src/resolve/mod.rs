//! Resolution orchestrator.
//!
//! A [`Resolver`] drives each class descriptor through the state machine in
//! [`crate::descriptor::transition`], running the effects each transition
//! asks for. Resolution is re-entrant: mapping a relation may resolve the
//! related class first, and a class already on the resolution stack is
//! skipped rather than entered twice.

mod class;
mod container;
mod field;
mod init;
pub(crate) mod templates;
mod version;

use crate::defaults::{MappingDefaults, NamingScope};
use crate::descriptor::{
    transition, ClassId, Effect, MappingGraph, ResolveRequest, ResolveState,
};
use crate::error::{Error, Result};
use crate::merge::MergeContext;
use crate::model::ClassModel;
use crate::strategy::{ClassStrategy, StrategyRegistry};
use ormap_schema::{ColumnId, DbDictionary, SchemaGroup, TableId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, instrument, trace};

/// One state change of a class descriptor, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionEvent {
    /// Class descriptor name.
    pub class: String,
    /// State reached.
    pub state: ResolveState,
}

/// Read-only inputs shared by every resolution step.
#[derive(Clone, Copy)]
pub struct ResolveEnv<'r> {
    /// Class model.
    pub model: &'r ClassModel,
    /// Database dictionary.
    pub dict: &'r DbDictionary,
    /// Defaults policy.
    pub defaults: &'r dyn MappingDefaults,
    /// Named strategies and handlers.
    pub registry: &'r StrategyRegistry,
    /// Allow schema changes.
    pub adapt: bool,
    /// Schema for tables named without one.
    pub default_schema: Option<&'r str>,
}

/// Drives descriptors of one graph against one schema.
pub struct Resolver<'r> {
    env: ResolveEnv<'r>,
    schema: &'r mut SchemaGroup,
    graph: &'r mut MappingGraph,
    log: &'r mut Vec<ResolutionEvent>,
    active: HashSet<ClassId>,
}

/// Which value of a field a step works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Value,
    Key,
    Element,
}

impl<'r> Resolver<'r> {
    /// Resolver over a graph and the schema it maps to.
    pub fn new(
        env: ResolveEnv<'r>,
        schema: &'r mut SchemaGroup,
        graph: &'r mut MappingGraph,
        log: &'r mut Vec<ResolutionEvent>,
    ) -> Self {
        Self {
            env,
            schema,
            graph,
            log,
            active: HashSet::new(),
        }
    }

    /// Move a class toward the state a request names.
    ///
    /// Requests the class has already satisfied do nothing. A class that is
    /// being resolved further up the stack is left alone; its own caller
    /// finishes it.
    #[instrument(level = "debug", skip(self))]
    pub fn resolve(&mut self, class: ClassId, request: ResolveRequest) -> Result<()> {
        let state = self.graph.class(class).state;
        let step = transition(state, request).map_err(|e| Error::NotResolved {
            context: self.graph.class(class).name.clone(),
            state: e.state.to_string(),
        })?;
        if step.effects.is_empty() || !self.active.insert(class) {
            return Ok(());
        }
        let outcome = self.run(class, &step.effects);
        self.active.remove(&class);
        outcome?;
        self.mark(class, step.next);
        Ok(())
    }

    fn run(&mut self, class: ClassId, effects: &[Effect]) -> Result<()> {
        for effect in effects {
            trace!(class = %self.graph.class(class).name, ?effect, "running effect");
            match effect {
                Effect::ResolveSuperclass => {
                    if let Some(sup) = self.graph.class(class).superclass {
                        self.resolve(sup, ResolveRequest::NonRelations)?;
                    }
                }
                Effect::InstallStrategy => self.install_strategy(class)?,
                Effect::MapClass => self.map_class(class)?,
                Effect::ResolvePrimaryKeyFields => self.resolve_primary_key_fields(class)?,
                Effect::ResolveNonRelationFields => self.resolve_fields(class, false)?,
                Effect::ResolveVersion => self.resolve_version(class)?,
                Effect::ResolveDiscriminator => {
                    self.resolve_discriminator(class)?;
                    self.mark(class, ResolveState::NonRelationResolved);
                }
                Effect::ResolveSuperclassRelations => {
                    if let Some(sup) = self.graph.class(class).superclass {
                        self.resolve(sup, ResolveRequest::Relations)?;
                    }
                }
                Effect::ResolveRelationFields => self.resolve_fields(class, true)?,
                Effect::RetryIncompleteForeignKeys => self.retry_pending(class)?,
                Effect::MarkColumnIo => self.mark_column_io(class),
                Effect::ResolveUniques => self.resolve_uniques(class)?,
                Effect::InitializeFields => self.initialize_fields(class)?,
                Effect::InitializeStrategy => self.initialize_strategy(class)?,
                Effect::ClearMapping => {
                    debug!(class = %self.graph.class(class).name, "clearing mapping");
                    self.graph.clear_class(class);
                }
            }
        }
        Ok(())
    }

    fn mark(&mut self, class: ClassId, state: ResolveState) {
        let mapping = self.graph.class_mut(class);
        if mapping.state == state {
            return;
        }
        mapping.state = state;
        debug!(class = %mapping.name, %state, "class state changed");
        self.log.push(ResolutionEvent {
            class: mapping.name.clone(),
            state,
        });
    }

    /// Merge context over the schema, with the graph answering target lookups.
    pub(crate) fn merge(&mut self, context: impl Into<String>) -> MergeContext<'_> {
        MergeContext::new(
            &mut *self.schema,
            self.env.dict,
            self.env.defaults,
            &*self.graph,
            context,
        )
        .with_adapt(self.env.adapt)
    }

    pub(crate) fn scope(&self) -> NamingScope<'_> {
        NamingScope::new(&*self.schema, self.env.dict)
    }

    /// Whether missing schema components may be created or assumed.
    pub(crate) fn lenient(&self) -> bool {
        self.env.adapt || self.env.defaults.default_missing_info()
    }

    pub(crate) fn is_active(&self, class: ClassId) -> bool {
        self.active.contains(&class)
    }

    /// Schema for the tables of a class.
    pub(crate) fn class_schema(&self, class: ClassId) -> Option<String> {
        self.graph
            .class(class)
            .records
            .class
            .schema
            .clone()
            .or_else(|| self.env.default_schema.map(str::to_string))
    }

    pub(crate) fn class_table(&self, class: ClassId) -> Result<TableId> {
        self.graph.class(class).table.ok_or_else(|| Error::NoTable {
            context: self.graph.class(class).name.clone(),
        })
    }

    /// Columns identifying a row of the class, in key order.
    ///
    /// Cached once the class has resolved its non-relation state.
    pub(crate) fn primary_key_columns(&mut self, class: ClassId) -> Result<Vec<ColumnId>> {
        if let Some(cached) = self.graph.class(class).cached_primary_key() {
            return Ok(cached.to_vec());
        }
        let mapping = self.graph.class(class);
        let embedding = mapping.embedding;
        let superclass = mapping.superclass;
        let strategy = mapping.strategy.clone();
        let join = mapping.join_foreign_key;

        let columns = if let Some(field) = embedding {
            let owner = self.graph.field(field).defining;
            self.primary_key_columns(owner)?
        } else {
            match strategy {
                Some(ClassStrategy::Flat) => match superclass {
                    Some(sup) => self.primary_key_columns(sup)?,
                    None => Vec::new(),
                },
                Some(ClassStrategy::Vertical) => join
                    .map(|fk| self.schema.foreign_key(fk).columns().to_vec())
                    .unwrap_or_default(),
                _ => self.own_key_columns(class),
            }
        };

        let mapping = self.graph.class_mut(class);
        if mapping.state >= ResolveState::NonRelationResolved && !columns.is_empty() {
            mapping.cache_primary_key(columns.clone());
        }
        Ok(columns)
    }

    fn own_key_columns(&self, class: ClassId) -> Vec<ColumnId> {
        let mapping = self.graph.class(class);
        if !mapping.datastore_id_columns.is_empty() {
            return mapping.datastore_id_columns.clone();
        }
        let fields: Vec<ColumnId> = self
            .graph
            .fields_of(class)
            .filter(|f| f.def.primary_key)
            .flat_map(|f| f.value.columns.iter().copied())
            .collect();
        if !fields.is_empty() {
            return fields;
        }
        mapping
            .table
            .map(|t| self.schema.primary_key_columns(t).to_vec())
            .unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::DefaultsConfig;
    use crate::defaults::StandardDefaults;
    use crate::model::{ClassDef, FieldDef};
    use crate::raw::RecordCatalog;
    use ormap_schema::TypeCode;

    /// Everything a resolver borrows, owned in one place.
    pub(crate) struct Fixture {
        pub model: ClassModel,
        pub schema: SchemaGroup,
        pub graph: MappingGraph,
        pub log: Vec<ResolutionEvent>,
        pub dict: DbDictionary,
        pub defaults: StandardDefaults,
        pub registry: StrategyRegistry,
        pub adapt: bool,
    }

    impl Fixture {
        pub fn new(model: ClassModel, records: RecordCatalog) -> Self {
            let graph = MappingGraph::from_model(&model, &records).unwrap();
            Self {
                model,
                schema: SchemaGroup::new(),
                graph,
                log: Vec::new(),
                dict: DbDictionary::generic(),
                defaults: StandardDefaults::default(),
                registry: StrategyRegistry::new(),
                adapt: true,
            }
        }

        pub fn strict(mut self) -> Self {
            self.adapt = false;
            self.defaults =
                StandardDefaults::new(DefaultsConfig::default().with_default_missing_info(false));
            self
        }

        pub fn resolve(&mut self, name: &str, request: ResolveRequest) -> Result<()> {
            let class = self.graph.require(name)?;
            let env = ResolveEnv {
                model: &self.model,
                dict: &self.dict,
                defaults: &self.defaults,
                registry: &self.registry,
                adapt: self.adapt,
                default_schema: None,
            };
            Resolver::new(env, &mut self.schema, &mut self.graph, &mut self.log)
                .resolve(class, request)
        }

        pub fn class(&self, name: &str) -> &crate::descriptor::ClassMapping {
            self.graph.class(self.graph.require(name).unwrap())
        }

        pub fn field(&self, class: &str, field: &str) -> &crate::descriptor::FieldMapping {
            let id = self.graph.require(class).unwrap();
            self.graph.field(self.graph.find_field(id, field).unwrap())
        }

        pub fn table_name(&self, table: TableId) -> String {
            self.schema.table(table).full_name()
        }
    }

    pub(crate) fn person_model() -> ClassModel {
        ClassModel::new().with_class(
            ClassDef::new("Person")
                .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key())
                .with_field(FieldDef::scalar("name", TypeCode::String)),
        )
    }

    #[test]
    fn test_states_advance_and_log() {
        let mut fx = Fixture::new(person_model(), RecordCatalog::new());
        fx.resolve("Person", ResolveRequest::NonRelations).unwrap();
        assert_eq!(fx.class("Person").state, ResolveState::NonRelationResolved);
        fx.resolve("Person", ResolveRequest::Relations).unwrap();
        fx.resolve("Person", ResolveRequest::Initialize).unwrap();
        let states: Vec<ResolveState> = fx.log.iter().map(|e| e.state).collect();
        assert_eq!(
            states,
            vec![
                ResolveState::NonRelationResolved,
                ResolveState::Resolved,
                ResolveState::Initialized
            ]
        );
    }

    #[test]
    fn test_repeat_request_changes_nothing() {
        let mut fx = Fixture::new(person_model(), RecordCatalog::new());
        fx.resolve("Person", ResolveRequest::Relations).unwrap();
        let tables = fx.schema.tables().count();
        let events = fx.log.len();
        fx.resolve("Person", ResolveRequest::Relations).unwrap();
        fx.resolve("Person", ResolveRequest::NonRelations).unwrap();
        assert_eq!(fx.schema.tables().count(), tables);
        assert_eq!(fx.log.len(), events);
    }

    #[test]
    fn test_initialize_before_resolve_fails() {
        let mut fx = Fixture::new(person_model(), RecordCatalog::new());
        let err = fx.resolve("Person", ResolveRequest::Initialize).unwrap_err();
        assert!(matches!(err, Error::NotResolved { state, .. } if state == "unresolved"));
    }

    #[test]
    fn test_clear_resets_descriptor() {
        let mut fx = Fixture::new(person_model(), RecordCatalog::new());
        fx.resolve("Person", ResolveRequest::Relations).unwrap();
        fx.resolve("Person", ResolveRequest::Clear).unwrap();
        let person = fx.class("Person");
        assert_eq!(person.state, ResolveState::Unresolved);
        assert!(person.table.is_none());
        assert!(!fx.field("Person", "name").is_resolved());
    }

    #[test]
    fn test_primary_key_columns_from_fields() {
        let mut fx = Fixture::new(person_model(), RecordCatalog::new());
        fx.resolve("Person", ResolveRequest::Relations).unwrap();
        let person = fx.class("Person");
        let table = person.table.unwrap();
        let pk = fx.schema.primary_key_columns(table).to_vec();
        assert_eq!(fx.schema.column_names(&pk), vec!["id".to_string()]);
    }
}
