//! Mapping catalog: the entry point that owns the schema, the descriptor
//! graph and the policies, and resolves classes on request.

mod query;
mod resync;
mod snapshot;
mod sweep;

pub use query::{ColumnResult, EntityResult, QueryResultMapping};
pub use snapshot::MappingSnapshot;

use crate::config::MappingConfig;
use crate::defaults::{MappingDefaults, StandardDefaults};
use crate::descriptor::{MappingGraph, ResolveRequest, ResolveState};
use crate::error::{Error, Result};
use crate::model::ClassModel;
use crate::raw::{parse_records, ClassRecordSet, RecordCatalog};
use crate::resolve::{ResolutionEvent, ResolveEnv, Resolver};
use crate::strategy::{CustomStrategy, StrategyRegistry, ValueHandler};
use ormap_schema::{DbDictionary, SchemaGroup, SweepReport};
use parking_lot::Mutex;
use query::QueryResultCache;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Mutable state, guarded as a whole.
#[derive(Debug)]
struct CatalogState {
    schema: SchemaGroup,
    graph: MappingGraph,
    records: RecordCatalog,
    log: Vec<ResolutionEvent>,
    query_results: QueryResultCache,
}

/// Resolves class mappings against a schema.
///
/// Resolution of one request is all-or-nothing: when it fails, the graph,
/// the schema and the resolution log are restored to what they were before
/// the request.
pub struct MappingCatalog {
    config: MappingConfig,
    dict: DbDictionary,
    defaults: Arc<dyn MappingDefaults>,
    registry: StrategyRegistry,
    model: ClassModel,
    state: Mutex<CatalogState>,
}

impl MappingCatalog {
    /// Catalog over a class model and an existing schema.
    pub fn new(model: ClassModel, schema: SchemaGroup, config: MappingConfig) -> Result<Self> {
        let records = RecordCatalog::new();
        let graph = MappingGraph::from_model(&model, &records)?;
        let defaults = Arc::new(StandardDefaults::new(config.defaults.clone()));
        let schema = match config.default_schema.as_deref() {
            Some(name) if schema.default_schema().is_none() => schema.with_default_schema(name),
            _ => schema,
        };
        info!(classes = model.len(), adapt = config.adapt, "created mapping catalog");
        Ok(Self {
            config,
            dict: DbDictionary::generic(),
            defaults,
            registry: StrategyRegistry::new(),
            model,
            state: Mutex::new(CatalogState {
                schema,
                graph,
                records,
                log: Vec::new(),
                query_results: QueryResultCache::default(),
            }),
        })
    }

    /// Use another database dictionary.
    pub fn with_dictionary(mut self, dict: DbDictionary) -> Self {
        self.dict = dict;
        self
    }

    /// Use another defaults policy.
    pub fn with_defaults(mut self, defaults: Arc<dyn MappingDefaults>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Run-wide configuration.
    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// The class model.
    pub fn model(&self) -> &ClassModel {
        &self.model
    }

    /// The database dictionary.
    pub fn dictionary(&self) -> &DbDictionary {
        &self.dict
    }

    /// Register a custom strategy under a name records can refer to.
    pub fn register_strategy(&self, name: impl Into<String>, strategy: Arc<dyn CustomStrategy>) {
        self.registry.register_strategy(name, strategy);
    }

    /// Register a handler for every value of a type.
    pub fn register_handler(&self, type_name: impl Into<String>, handler: ValueHandler) {
        self.registry.register_handler(type_name, handler);
    }

    /// Replace the user records. Every descriptor returns to unresolved;
    /// the schema keeps what earlier resolutions added.
    pub fn set_records(&self, records: RecordCatalog) -> Result<()> {
        let graph = MappingGraph::from_model(&self.model, &records)?;
        let mut state = self.state.lock();
        state.graph = graph;
        state.records = records;
        info!(records = state.records.len(), "installed mapping records");
        Ok(())
    }

    /// Load user records from a JSON file.
    pub fn load_records(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = std::fs::read_to_string(path.as_ref())?;
        self.set_records(parse_records(&text)?)
    }

    /// The records currently installed.
    pub fn records(&self) -> RecordCatalog {
        self.state.lock().records.clone()
    }

    /// Fully resolve a class: tables, columns and relations.
    pub fn resolve(&self, class: &str) -> Result<()> {
        self.request(class, ResolveRequest::Relations)
    }

    /// Resolve a class up to its non-relation fields.
    pub fn resolve_non_relations(&self, class: &str) -> Result<()> {
        self.request(class, ResolveRequest::NonRelations)
    }

    /// Run the one-time post-pass on a fully resolved class.
    pub fn initialize(&self, class: &str) -> Result<()> {
        self.request(class, ResolveRequest::Initialize)
    }

    /// Return a class to the unresolved state.
    pub fn clear_mapping(&self, class: &str) -> Result<()> {
        self.request(class, ResolveRequest::Clear)
    }

    /// Resolve and initialize every class of the model.
    pub fn resolve_all(&self) -> Result<()> {
        let names: Vec<String> = self.model.classes().map(|c| c.name.clone()).collect();
        self.with_resolver(|resolver, graph_names| {
            for name in &names {
                resolver.resolve(graph_names.require(name)?, ResolveRequest::Relations)?;
            }
            for name in &names {
                resolver.resolve(graph_names.require(name)?, ResolveRequest::Initialize)?;
            }
            Ok(())
        })?;
        let state = self.state.lock();
        info!(
            classes = names.len(),
            tables = state.schema.tables().count(),
            events = state.log.len(),
            "resolved all classes"
        );
        Ok(())
    }

    /// Current state of a class descriptor.
    pub fn class_state(&self, class: &str) -> Result<ResolveState> {
        let state = self.state.lock();
        let id = state.graph.require(class)?;
        Ok(state.graph.class(id).state)
    }

    /// Copy of the resolved graph and the schema.
    pub fn snapshot(&self) -> MappingSnapshot {
        let state = self.state.lock();
        MappingSnapshot::new(state.graph.clone(), state.schema.clone())
    }

    /// Copy of the schema.
    pub fn schema(&self) -> SchemaGroup {
        self.state.lock().schema.clone()
    }

    /// Every state change so far, in order.
    pub fn resolution_log(&self) -> Vec<ResolutionEvent> {
        self.state.lock().log.clone()
    }

    /// Records that reproduce a resolved class when merged again.
    pub fn sync_mapping_info(&self, class: &str) -> Result<ClassRecordSet> {
        let state = self.state.lock();
        let id = state.graph.require(class)?;
        let mapping = state.graph.class(id);
        if mapping.state < ResolveState::Resolved {
            return Err(Error::NotResolved {
                context: mapping.name.clone(),
                state: mapping.state.to_string(),
            });
        }
        let sync = resync::Resync::new(
            &state.graph,
            &state.schema,
            &self.dict,
            self.defaults.as_ref(),
        );
        Ok(sync.class(id))
    }

    /// Records for every resolved class.
    pub fn sync_all_mapping_info(&self) -> Result<RecordCatalog> {
        let names: Vec<String> = self.model.classes().map(|c| c.name.clone()).collect();
        names
            .into_iter()
            .map(|name| Ok((name.clone(), self.sync_mapping_info(&name)?)))
            .collect()
    }

    /// Drop schema components no resolved mapping uses.
    pub fn sweep_unused_components(&self) -> SweepReport {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let report = sweep::sweep(&state.graph, &mut state.schema);
        info!(removed = report.total(), "swept unused schema components");
        report
    }

    /// Cache a query-result mapping. Returns the mapping it replaces.
    pub fn add_query_result(&self, mapping: QueryResultMapping) -> Option<QueryResultMapping> {
        self.state.lock().query_results.add(mapping)
    }

    /// A cached query-result mapping by defining class and name.
    pub fn query_result(&self, class: Option<&str>, name: &str) -> Option<QueryResultMapping> {
        self.state.lock().query_results.get(class, name).cloned()
    }

    /// Forget a query-result mapping.
    pub fn remove_query_result(&self, class: Option<&str>, name: &str) -> bool {
        self.state.lock().query_results.remove(class, name)
    }

    fn request(&self, class: &str, request: ResolveRequest) -> Result<()> {
        self.with_resolver(|resolver, graph| resolver.resolve(graph.require(class)?, request))
    }

    /// Run resolution steps, restoring the previous state when they fail.
    fn with_resolver<T>(
        &self,
        f: impl FnOnce(&mut Resolver<'_>, &ClassIndex) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let graph_backup = state.graph.clone();
        let schema_backup = state.schema.clone();
        let log_len = state.log.len();
        let names = ClassIndex::of(&state.graph);

        let env = ResolveEnv {
            model: &self.model,
            dict: &self.dict,
            defaults: self.defaults.as_ref(),
            registry: &self.registry,
            adapt: self.config.adapt,
            default_schema: self.config.default_schema.as_deref(),
        };
        let outcome = {
            let mut resolver =
                Resolver::new(env, &mut state.schema, &mut state.graph, &mut state.log);
            f(&mut resolver, &names)
        };
        if let Err(err) = &outcome {
            warn!(error = %err, "resolution failed; restoring previous mapping");
            state.graph = graph_backup;
            state.schema = schema_backup;
            state.log.truncate(log_len);
        }
        outcome
    }
}

/// Class names to ids, taken before the resolver borrows the graph.
struct ClassIndex(std::collections::HashMap<String, crate::descriptor::ClassId>);

impl ClassIndex {
    fn of(graph: &MappingGraph) -> Self {
        Self(graph.named_classes().map(|c| (c.name.clone(), c.id)).collect())
    }

    fn require(&self, name: &str) -> Result<crate::descriptor::ClassId> {
        self.0
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownClass(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassDef, FieldDef};
    use crate::raw::{ClassRecord, ClassRecordSet};
    use ormap_schema::TypeCode;

    fn catalog() -> MappingCatalog {
        let model = ClassModel::new().with_class(
            ClassDef::new("Person")
                .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key())
                .with_field(FieldDef::scalar("name", TypeCode::String)),
        );
        MappingCatalog::new(model, SchemaGroup::new(), MappingConfig::adapting()).unwrap()
    }

    #[test]
    fn test_resolve_and_state() {
        let catalog = catalog();
        assert_eq!(catalog.class_state("Person").unwrap(), ResolveState::Unresolved);
        catalog.resolve("Person").unwrap();
        assert_eq!(catalog.class_state("Person").unwrap(), ResolveState::Resolved);
        catalog.initialize("Person").unwrap();
        assert_eq!(catalog.class_state("Person").unwrap(), ResolveState::Initialized);
        assert!(catalog.schema().find_table_by_name("Person").is_some());
    }

    #[test]
    fn test_unknown_class() {
        let catalog = catalog();
        assert!(matches!(catalog.resolve("Nobody"), Err(Error::UnknownClass(_))));
    }

    #[test]
    fn test_failure_restores_state() {
        let model = ClassModel::new().with_class(
            ClassDef::new("Person")
                .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key()),
        );
        let catalog =
            MappingCatalog::new(model, SchemaGroup::new(), MappingConfig::validate_only()).unwrap();
        let mut records = RecordCatalog::new();
        records.insert(
            "Person".into(),
            ClassRecordSet::new().with_class(ClassRecord::default().with_table("MISSING")),
        );
        catalog.set_records(records).unwrap();
        let before = catalog.schema();
        assert!(catalog.resolve("Person").is_err());
        assert_eq!(catalog.schema(), before);
        assert_eq!(catalog.class_state("Person").unwrap(), ResolveState::Unresolved);
        assert!(catalog.resolution_log().is_empty());
    }

    #[test]
    fn test_sync_requires_resolution() {
        let catalog = catalog();
        assert!(matches!(
            catalog.sync_mapping_info("Person"),
            Err(Error::NotResolved { .. })
        ));
        catalog.resolve("Person").unwrap();
        assert!(catalog.sync_mapping_info("Person").is_ok());
    }

    #[test]
    fn test_clear_mapping() {
        let catalog = catalog();
        catalog.resolve("Person").unwrap();
        catalog.clear_mapping("Person").unwrap();
        assert_eq!(catalog.class_state("Person").unwrap(), ResolveState::Unresolved);
        catalog.resolve("Person").unwrap();
        assert_eq!(catalog.class_state("Person").unwrap(), ResolveState::Resolved);
    }
}
