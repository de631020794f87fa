//! Initialization: facts that need the whole resolved graph.

use super::Resolver;
use crate::descriptor::{ClassId, FieldId, JoinTableRole, ResolveRequest, ResolveState};
use crate::error::Result;
use crate::raw::JoinDirection;
use crate::strategy::{
    ClassStrategy, DiscriminatorStrategy, FieldStrategy, StrategyTarget, ValueHandler,
    VersionStrategy,
};
use ormap_schema::ForeignKeyId;
use tracing::debug;

impl Resolver<'_> {
    pub(super) fn initialize_fields(&mut self, class: ClassId) -> Result<()> {
        let fields: Vec<FieldId> = self.graph.class(class).fields.clone();
        for id in fields {
            let field = self.graph.field(id);
            let Some(strategy) = field.strategy.clone() else {
                continue;
            };
            let bidi = strategy
                .uses_join_table()
                .then(|| self.join_table_role(id));
            let bulk_update = strategy.is_single_valued()
                && !field.value.columns.is_empty()
                && field.value.join_direction != JoinDirection::Inverse;
            let embedded: Vec<ClassId> = field.values().filter_map(|v| v.embedded).collect();
            let handlers: Vec<ValueHandler> = field
                .values()
                .filter_map(|v| v.handler.clone())
                .filter(|h| matches!(h, ValueHandler::Custom(_)))
                .collect();

            let field = self.graph.field_mut(id);
            field.bidi = bidi;
            field.bulk_update = Some(bulk_update);

            for nested in embedded {
                if self.graph.class(nested).state >= ResolveState::Resolved {
                    self.resolve(nested, ResolveRequest::Initialize)?;
                }
            }

            let field = self.graph.field(id);
            let owner = self.graph.owner_name(id);
            let columns = self.schema.column_names(field.columns());
            let target = StrategyTarget::field(owner, &field.name).with_columns(&columns);
            if let FieldStrategy::Custom(handle) = &strategy {
                handle.strategy().initialize(&target)?;
            }
            for handler in &handlers {
                if let ValueHandler::Custom(handle) = handler {
                    handle.strategy().initialize(&target)?;
                }
            }
        }
        Ok(())
    }

    /// Ownership of a join table another relation maps from the far side.
    ///
    /// The mapped-by side never owns. Without mapped-by on either side the
    /// field whose `Class.field` sorts first owns.
    fn join_table_role(&self, id: FieldId) -> JoinTableRole {
        let field = self.graph.field(id);
        let (Some(table), Some(join)) = (field.table, field.join_foreign_key) else {
            return JoinTableRole::Neither;
        };
        let Some(related) = field.element.as_ref().and_then(|e| e.related) else {
            return JoinTableRole::Neither;
        };
        let our_columns = self.fk_columns(join);

        let candidates = std::iter::once(related)
            .chain(self.graph.class(related).ancestors.iter().copied())
            .flat_map(|c| self.graph.class(c).fields.iter().copied());
        for other in candidates {
            if other == id {
                continue;
            }
            let theirs = self.graph.field(other);
            let shares_table = theirs.table == Some(table)
                && theirs
                    .strategy
                    .as_ref()
                    .is_some_and(FieldStrategy::uses_join_table);
            if !shares_table {
                continue;
            }
            let element_fk = theirs.element.as_ref().and_then(|e| e.foreign_key);
            if element_fk.map(|fk| self.fk_columns(fk)) != Some(our_columns.clone()) {
                continue;
            }
            let role = if field.def.mapped_by.is_some() {
                JoinTableRole::NonOwner
            } else if theirs.def.mapped_by.is_some() {
                JoinTableRole::Owner
            } else if self.graph.field_context(id) < self.graph.field_context(other) {
                JoinTableRole::Owner
            } else {
                JoinTableRole::NonOwner
            };
            debug!(field = %self.graph.field_context(id), ?role, "bidirectional join table");
            return role;
        }
        JoinTableRole::Neither
    }

    fn fk_columns(&self, fk: ForeignKeyId) -> Vec<ormap_schema::ColumnId> {
        let mut columns = self.schema.foreign_key(fk).columns().to_vec();
        columns.sort();
        columns
    }

    pub(super) fn initialize_strategy(&mut self, class: ClassId) -> Result<()> {
        let mut joined = Vec::new();
        let mut stack = self.graph.class(class).subclasses.clone();
        while let Some(sub) = stack.pop() {
            let mapping = self.graph.class(sub);
            if matches!(mapping.strategy, Some(ClassStrategy::Vertical)) {
                joined.push(sub);
                stack.extend(mapping.subclasses.iter().copied());
            }
        }
        joined.sort();

        let mapping = self.graph.class(class);
        let target = StrategyTarget::class(&mapping.name);
        if let Some(ClassStrategy::Custom(handle)) = &mapping.strategy {
            handle.strategy().initialize(&target)?;
        }
        if let Some(VersionStrategy::Custom(handle)) = &mapping.version.strategy {
            handle.strategy().initialize(&target)?;
        }
        if let Some(DiscriminatorStrategy::Custom(handle)) = &mapping.discriminator.strategy {
            handle.strategy().initialize(&target)?;
        }
        self.graph.class_mut(class).joined_subclasses = Some(joined);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{person_model, Fixture};
    use crate::descriptor::{JoinTableRole, ResolveRequest, ResolveState};
    use crate::model::{ClassDef, ClassModel, FieldDef};
    use crate::raw::{
        ClassRecord, ClassRecordSet, ColumnTemplate, FieldRecord, RecordCatalog, ValueRecord,
    };
    use ormap_schema::TypeCode;
    use pretty_assertions::assert_eq;

    fn student_model() -> ClassModel {
        ClassModel::new()
            .with_class(
                ClassDef::new("Course")
                    .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key())
                    .with_field(FieldDef::to_many("students", "Student").mapped_by("courses")),
            )
            .with_class(
                ClassDef::new("Student")
                    .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key())
                    .with_field(FieldDef::to_many("courses", "Course")),
            )
    }

    fn shared_join_table() -> RecordCatalog {
        let mut records = RecordCatalog::new();
        records.insert(
            "Student".into(),
            ClassRecordSet::new().with_field(
                "courses",
                FieldRecord::default()
                    .with_table("ENROLLMENT")
                    .with_join_column(ColumnTemplate::new("STUDENT_ID").with_target("id"))
                    .with_element(
                        ValueRecord::default()
                            .with_column(ColumnTemplate::new("COURSE_ID").with_target("id")),
                    ),
            ),
        );
        records.insert(
            "Course".into(),
            ClassRecordSet::new().with_field(
                "students",
                FieldRecord::default()
                    .with_table("ENROLLMENT")
                    .with_join_column(ColumnTemplate::new("COURSE_ID").with_target("id"))
                    .with_element(
                        ValueRecord::default()
                            .with_column(ColumnTemplate::new("STUDENT_ID").with_target("id")),
                    ),
            ),
        );
        records
    }

    #[test]
    fn test_bidirectional_join_table_owner() {
        let mut fx = Fixture::new(student_model(), shared_join_table());
        for class in ["Course", "Student"] {
            fx.resolve(class, ResolveRequest::Relations).unwrap();
        }
        for class in ["Course", "Student"] {
            fx.resolve(class, ResolveRequest::Initialize).unwrap();
        }
        let students = fx.field("Course", "students");
        let courses = fx.field("Student", "courses");
        assert_eq!(students.table, courses.table);
        assert_eq!(students.bidi, Some(JoinTableRole::NonOwner));
        assert_eq!(courses.bidi, Some(JoinTableRole::Owner));
    }

    #[test]
    fn test_mapped_by_shares_join_table() {
        let mut fx = Fixture::new(student_model(), RecordCatalog::new());
        fx.resolve("Course", ResolveRequest::Relations).unwrap();
        fx.resolve("Student", ResolveRequest::Relations).unwrap();
        fx.resolve("Course", ResolveRequest::Initialize).unwrap();
        fx.resolve("Student", ResolveRequest::Initialize).unwrap();
        let students = fx.field("Course", "students");
        let courses = fx.field("Student", "courses");
        assert_eq!(fx.table_name(courses.table.unwrap()), "Stude_courses");
        assert_eq!(students.table, courses.table);
        assert_eq!(
            students.join_foreign_key,
            courses.element.as_ref().unwrap().foreign_key
        );
        assert!(!students.join_io.is_insertable(0));
        assert_eq!(students.bidi, Some(JoinTableRole::NonOwner));
        assert_eq!(courses.bidi, Some(JoinTableRole::Owner));
    }

    #[test]
    fn test_bulk_update_flags() {
        let mut fx = Fixture::new(person_model(), RecordCatalog::new());
        fx.resolve("Person", ResolveRequest::Relations).unwrap();
        fx.resolve("Person", ResolveRequest::Initialize).unwrap();
        assert_eq!(fx.class("Person").state, ResolveState::Initialized);
        assert_eq!(fx.field("Person", "name").bulk_update, Some(true));
        assert_eq!(fx.field("Person", "name").bidi, None);
    }

    #[test]
    fn test_joined_subclasses_collected() {
        let model = ClassModel::new()
            .with_class(
                ClassDef::new("Vehicle")
                    .with_field(FieldDef::scalar("id", TypeCode::Long).primary_key()),
            )
            .with_class(ClassDef::new("Car").with_superclass("Vehicle"))
            .with_class(ClassDef::new("Van").with_superclass("Vehicle"))
            .with_class(ClassDef::new("SportsCar").with_superclass("Car"));
        let mut records = RecordCatalog::new();
        for (class, strategy) in [("Car", "vertical"), ("Van", "flat"), ("SportsCar", "vertical")] {
            records.insert(
                class.into(),
                ClassRecordSet::new().with_class(ClassRecord::default().with_strategy(strategy)),
            );
        }
        let mut fx = Fixture::new(model, records);
        for class in ["Vehicle", "Car", "Van", "SportsCar"] {
            fx.resolve(class, ResolveRequest::Relations).unwrap();
        }
        fx.resolve("Vehicle", ResolveRequest::Initialize).unwrap();
        let joined: Vec<String> = fx
            .class("Vehicle")
            .joined_subclasses
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| fx.graph.class(*c).name.clone())
            .collect();
        assert_eq!(joined, vec!["Car".to_string(), "SportsCar".to_string()]);
    }
}
