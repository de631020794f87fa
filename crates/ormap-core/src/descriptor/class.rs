//! Class, version and discriminator descriptors.

use super::field::ColumnIo;
use super::{ClassId, FieldId, ResolveState};
use crate::model::ClassDef;
use crate::raw::{ClassRecordSet, DiscriminatorRecord, VersionRecord};
use crate::strategy::{ClassStrategy, DiscriminatorStrategy, VersionStrategy};
use ormap_schema::{ColumnId, ForeignKeyId, IndexId, TableId, UniqueId};

/// Version columns of a class.
#[derive(Debug, Clone, Default)]
pub struct VersionMapping {
    /// User record.
    pub record: VersionRecord,
    /// Resolved strategy.
    pub strategy: Option<VersionStrategy>,
    /// Version columns.
    pub columns: Vec<ColumnId>,
    /// Index over the columns.
    pub index: Option<IndexId>,
    /// Column permissions.
    pub io: ColumnIo,
}

impl VersionMapping {
    /// Drop resolved attachments.
    pub fn clear(&mut self) {
        self.strategy = None;
        self.columns.clear();
        self.index = None;
        self.io = ColumnIo::default();
    }
}

/// Discriminator columns and value of a class.
#[derive(Debug, Clone, Default)]
pub struct DiscriminatorMapping {
    /// User record.
    pub record: DiscriminatorRecord,
    /// Resolved strategy.
    pub strategy: Option<DiscriminatorStrategy>,
    /// Discriminator columns.
    pub columns: Vec<ColumnId>,
    /// Index over the columns.
    pub index: Option<IndexId>,
    /// Column permissions.
    pub io: ColumnIo,
    /// Value identifying rows of this class.
    pub value: Option<String>,
}

impl DiscriminatorMapping {
    /// Drop resolved attachments.
    pub fn clear(&mut self) {
        self.strategy = None;
        self.columns.clear();
        self.index = None;
        self.io = ColumnIo::default();
        self.value = None;
    }
}

/// Mapping of a class, or of an embedded value of some field.
#[derive(Debug, Clone)]
pub struct ClassMapping {
    /// Arena key.
    pub id: ClassId,
    /// Descriptor name: the class name, or `Owner.field` for embedded values.
    pub name: String,
    /// Declared class.
    pub def: ClassDef,
    /// Mapped superclass.
    pub superclass: Option<ClassId>,
    /// Superclass chain, nearest first.
    pub ancestors: Vec<ClassId>,
    /// Direct subclasses.
    pub subclasses: Vec<ClassId>,
    /// Field embedding this descriptor.
    pub embedding: Option<FieldId>,
    /// User records.
    pub records: ClassRecordSet,
    /// Resolved strategy.
    pub strategy: Option<ClassStrategy>,
    /// Primary table.
    pub table: Option<TableId>,
    /// Key joining the table to the superclass table.
    pub join_foreign_key: Option<ForeignKeyId>,
    /// Datastore identity columns.
    pub datastore_id_columns: Vec<ColumnId>,
    /// Field descriptors in declaration order, inherited copies last.
    pub fields: Vec<FieldId>,
    /// Keys joining secondary tables to the primary table.
    pub secondary_joins: Vec<(TableId, ForeignKeyId)>,
    /// Class-level unique constraints.
    pub uniques: Vec<UniqueId>,
    /// Version sub-mapping.
    pub version: VersionMapping,
    /// Discriminator sub-mapping.
    pub discriminator: DiscriminatorMapping,
    /// Subclasses sharing or joining this table, set at initialization.
    pub joined_subclasses: Option<Vec<ClassId>>,
    /// Resolution state.
    pub state: ResolveState,
    generation: u64,
    pk_cache: Option<(u64, Vec<ColumnId>)>,
}

impl ClassMapping {
    /// An unresolved class.
    pub fn new(id: ClassId, def: ClassDef, records: ClassRecordSet) -> Self {
        let version = VersionMapping {
            record: records.version.clone(),
            ..VersionMapping::default()
        };
        let discriminator = DiscriminatorMapping {
            record: records.discriminator.clone(),
            ..DiscriminatorMapping::default()
        };
        Self {
            id,
            name: def.name.clone(),
            def,
            superclass: None,
            ancestors: Vec::new(),
            subclasses: Vec::new(),
            embedding: None,
            records,
            strategy: None,
            table: None,
            join_foreign_key: None,
            datastore_id_columns: Vec::new(),
            fields: Vec::new(),
            secondary_joins: Vec::new(),
            uniques: Vec::new(),
            version,
            discriminator,
            joined_subclasses: None,
            state: ResolveState::Unresolved,
            generation: 0,
            pk_cache: None,
        }
    }

    /// A descriptor for a value embedded by a field.
    pub fn embedded(
        id: ClassId,
        name: impl Into<String>,
        def: ClassDef,
        records: ClassRecordSet,
        embedding: FieldId,
    ) -> Self {
        let mut mapping = Self::new(id, def, records);
        mapping.name = name.into();
        mapping.embedding = Some(embedding);
        mapping
    }

    /// Whether this descriptor maps an embedded value.
    pub fn is_embedded(&self) -> bool {
        self.embedding.is_some()
    }

    /// Whether the class has a table of its own or shares one.
    pub fn is_mapped(&self) -> bool {
        self.strategy.as_ref().is_some_and(ClassStrategy::is_mapped)
    }

    /// Whether the class stores its superclass fields in the superclass table.
    pub fn joins_superclass(&self) -> bool {
        self.strategy.as_ref().is_some_and(ClassStrategy::joins_superclass)
    }

    /// Current cache generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cached primary key columns, if still valid.
    pub fn cached_primary_key(&self) -> Option<&[ColumnId]> {
        match &self.pk_cache {
            Some((generation, columns)) if *generation == self.generation => Some(columns),
            _ => None,
        }
    }

    /// Cache primary key columns for the current generation.
    pub fn cache_primary_key(&mut self, columns: Vec<ColumnId>) {
        self.pk_cache = Some((self.generation, columns));
    }

    /// Invalidate every derived cache.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.pk_cache = None;
        self.joined_subclasses = None;
    }

    /// Drop resolved attachments, keeping declarations and records.
    pub fn clear(&mut self) {
        self.strategy = None;
        self.table = None;
        self.join_foreign_key = None;
        self.datastore_id_columns.clear();
        self.secondary_joins.clear();
        self.uniques.clear();
        self.version.clear();
        self.discriminator.clear();
        self.state = ResolveState::Unresolved;
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormap_schema::SchemaGroup;

    #[test]
    fn test_pk_cache_follows_generation() {
        let mut schema = SchemaGroup::new();
        let table = schema.add_table(None, "PERSON");
        let id = schema.add_column(table, "ID");

        let mut class =
            ClassMapping::new(ClassId(0), ClassDef::new("Person"), ClassRecordSet::new());
        assert!(class.cached_primary_key().is_none());
        class.cache_primary_key(vec![id]);
        assert_eq!(class.cached_primary_key(), Some(&[id][..]));
        class.invalidate();
        assert!(class.cached_primary_key().is_none());
        assert_eq!(class.generation(), 1);
    }

    #[test]
    fn test_clear_resets_state() {
        let mut class =
            ClassMapping::new(ClassId(0), ClassDef::new("Person"), ClassRecordSet::new());
        class.strategy = Some(ClassStrategy::FullTable);
        class.state = ResolveState::Resolved;
        class.discriminator.value = Some("P".into());
        assert!(class.is_mapped());
        class.clear();
        assert!(!class.is_mapped());
        assert_eq!(class.state, ResolveState::Unresolved);
        assert!(class.discriminator.value.is_none());
    }
}
