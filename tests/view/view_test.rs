// tests/view/view_test.rs
#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use relmap::alias::AliasAllocator;
    use relmap::compiler::QueryCompiler;
    use relmap::entity::{Database, DbHandle, Entity, EntityRef, PseudoType, Record, TableEntity, Value};
    use relmap::error::ViewError;
    use relmap::graph::{JoinGraph, JoinGraphBuilder, JoinSpec, JoinType};
    use relmap::restriction::Restriction;
    use relmap::sql::dialect::Dialect;
    use relmap::sql::validate::validate_sql;
    use relmap::view::{RelationAccessor, View};

    #[derive(Debug)]
    struct FakeDb;

    impl Database for FakeDb {
        fn dialect(&self) -> Dialect {
            Dialect::Postgres
        }
    }

    fn widgets() -> EntityRef {
        TableEntity::new("widgets")
            .column("id", PseudoType::Integer)
            .column("part_id", PseudoType::Integer)
            .column("name", PseudoType::Text)
            .primary_key(["id"])
            .into_ref()
            .unwrap()
    }

    fn parts() -> EntityRef {
        TableEntity::new("parts")
            .column("id", PseudoType::Integer)
            .column("detail", PseudoType::Text)
            .primary_key(["id"])
            .into_ref()
            .unwrap()
    }

    fn profiles() -> EntityRef {
        TableEntity::new("profiles")
            .column("id", PseudoType::Integer)
            .column("bio", PseudoType::Text)
            .primary_key(["id"])
            .into_ref()
            .unwrap()
    }

    /// widgets ⟕ parts (as "part"), widgets ⋈ profiles (natural, as "profile")
    fn catalog(aliases: &AliasAllocator) -> JoinGraph {
        let mut b = JoinGraphBuilder::new(aliases, widgets()).unwrap();
        b.project(b.root(), "name", "name").unwrap();
        b.project(b.root(), "part_id", "part_id").unwrap();
        b.join(
            b.root(),
            JoinSpec::new(parts(), JoinType::Left)
                .relation("part")
                .restrict(Restriction::equals("id", "part_id"))
                .project("detail", "detail"),
        )
        .unwrap();
        b.join(
            b.root(),
            JoinSpec::new(profiles(), JoinType::Natural)
                .relation("profile")
                .project("bio", "bio"),
        )
        .unwrap();
        b.build()
    }

    #[test]
    fn test_view_is_an_entity() {
        let aliases = AliasAllocator::new();
        let view: EntityRef = Arc::new(View::new("catalog", catalog(&aliases)).unwrap());

        assert_eq!(view.table(), "catalog");
        assert_eq!(view.primary_key(), ["id"]);
        assert_eq!(view.columns(), ["bio", "detail", "id", "name", "part_id"]);
        assert!(view.has_column("bio"));
    }

    #[test]
    fn test_column_manifest_types() {
        let aliases = AliasAllocator::new();
        let view = View::new("catalog", catalog(&aliases)).unwrap();
        let manifest = view.column_manifest();
        assert_eq!(
            manifest,
            [
                ("bio".to_string(), PseudoType::Text),
                ("detail".to_string(), PseudoType::Text),
                ("id".to_string(), PseudoType::Integer),
                ("name".to_string(), PseudoType::Text),
                ("part_id".to_string(), PseudoType::Integer),
            ]
        );
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let aliases = AliasAllocator::new();
        let view = View::new("catalog", catalog(&aliases)).unwrap();
        assert_eq!(view.columns().to_vec(), view.columns().to_vec());
        assert_eq!(view.primary_key().to_vec(), view.primary_key().to_vec());
    }

    #[test]
    fn test_concurrent_first_callers_see_one_result() {
        let aliases = AliasAllocator::new();
        let view = Arc::new(View::new("catalog", catalog(&aliases)).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let view = Arc::clone(&view);
                thread::spawn(move || {
                    (
                        view.columns().as_ptr() as usize,
                        view.primary_key().as_ptr() as usize,
                    )
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_relation_seeds_restriction_values_and_key() {
        let aliases = AliasAllocator::new();
        let view = Arc::new(View::new("catalog", catalog(&aliases)).unwrap());
        let db: DbHandle = Arc::new(FakeDb);
        let row = Record::new(
            view.clone(),
            [
                ("name", Value::from("bolt")),
                ("part_id", Value::from(17i64)),
                ("id", Value::from(17i64)),
                ("detail", Value::from("steel")),
                ("bio", Value::Null),
            ],
            Some(db),
        );

        let part = view.relation("part", &row).unwrap();
        assert_eq!(part.entity().table(), "parts");
        assert_eq!(part.get("id"), Some(&Value::Integer(17)));
        assert_eq!(part.values().len(), 1);
        assert_eq!(part.db().map(|db| db.dialect()), Some(Dialect::Postgres));
    }

    #[test]
    fn test_relation_by_alias_and_natural_seeding() {
        let aliases = AliasAllocator::new();
        let view = Arc::new(View::new("catalog", catalog(&aliases)).unwrap());
        let profile_alias = view
            .graph()
            .node(view.graph().node_by_relation("profile").unwrap())
            .unwrap()
            .alias
            .clone();
        assert!(matches!(
            view.accessor(&profile_alias),
            Some(RelationAccessor::Natural { shared, .. }) if shared == &["id".to_string()]
        ));

        // the natural reference copies widgets.id, which the view only
        // exposes through the key column of parts
        let row = Record::new(view.clone(), [("id", Value::from(3i64))], None);
        let err = view.relation(&profile_alias, &row).unwrap_err();
        assert!(matches!(err, ViewError::MissingValue { .. }), "{err}");
    }

    #[test]
    fn test_relation_seeds_when_target_is_on_the_remote_side() {
        let aliases = AliasAllocator::new();
        let mut b = JoinGraphBuilder::new(&aliases, widgets()).unwrap();
        b.project_all(b.root()).unwrap();
        b.join(
            b.root(),
            JoinSpec::new(parts(), JoinType::Left)
                .relation("part")
                .restrict(Restriction::equals("widgets.part_id", "parts.id"))
                .project("detail", "detail"),
        )
        .unwrap();
        let view = Arc::new(View::new("catalog", b.build()).unwrap());

        let row = Record::new(
            view.clone(),
            [
                ("id", Value::from(1i64)),
                ("part_id", Value::from(17i64)),
                ("detail", Value::from("x")),
            ],
            None,
        );
        let part = view.relation("part", &row).unwrap();
        assert_eq!(part.entity().table(), "parts");
        assert_eq!(part.get("id"), Some(&Value::Integer(17)));
        assert_eq!(part.values().len(), 1);
    }

    #[test]
    fn test_natural_relation_loads_from_key_column() {
        let aliases = AliasAllocator::new();
        let mut b = JoinGraphBuilder::new(&aliases, widgets()).unwrap();
        b.project(b.root(), "name", "name").unwrap();
        b.join(
            b.root(),
            JoinSpec::new(profiles(), JoinType::Natural)
                .relation("profile")
                .project("bio", "bio"),
        )
        .unwrap();
        let view = Arc::new(View::new("widget_profiles", b.build()).unwrap());
        assert_eq!(view.columns(), ["bio", "id", "name"]);

        let db: DbHandle = Arc::new(FakeDb);
        let row = Record::new(
            view.clone(),
            [
                ("bio", Value::from("hello")),
                ("id", Value::from(9i64)),
                ("name", Value::from("bolt")),
            ],
            Some(db),
        );
        let profile = view.relation("profile", &row).unwrap();
        assert_eq!(profile.entity().table(), "profiles");
        assert_eq!(profile.get("id"), Some(&Value::Integer(9)));
        assert_eq!(profile.values().len(), 1);
        assert!(profile.db().is_some());
    }

    #[test]
    fn test_unknown_relation_is_an_error() {
        let aliases = AliasAllocator::new();
        let view = Arc::new(View::new("catalog", catalog(&aliases)).unwrap());
        let row = Record::new(view.clone(), [("id", Value::from(1i64))], None);
        let err = view.relation("supplier", &row).unwrap_err();
        assert_eq!(err.to_string(), "view \"catalog\" has no relation named \"supplier\"");
    }

    #[test]
    fn test_view_ddl() {
        let aliases = AliasAllocator::new();
        let view = View::new("catalog", catalog(&aliases))
            .unwrap()
            .with_compiler(QueryCompiler::new(Dialect::Postgres));

        let create = view.create_view().unwrap();
        assert!(create.starts_with("CREATE OR REPLACE VIEW \"catalog\" AS\nSELECT"), "{create}");
        assert!(create.contains("AS \"id\""));
        validate_sql(&create, Dialect::Postgres).unwrap();

        let drop = view.drop_view();
        assert_eq!(drop, "DROP VIEW IF EXISTS \"catalog\"");
        validate_sql(&drop, Dialect::Postgres).unwrap();
    }

    #[test]
    fn test_view_ddl_sqlite_has_no_or_replace() {
        let aliases = AliasAllocator::new();
        let view = View::new("catalog", catalog(&aliases))
            .unwrap()
            .with_compiler(QueryCompiler::new(Dialect::Sqlite).pretty(false));
        let create = view.create_view().unwrap();
        assert!(create.starts_with("CREATE VIEW \"catalog\" AS SELECT"), "{create}");
        validate_sql(&create, Dialect::Sqlite).unwrap();
    }

    #[test]
    fn test_views_nest_as_roots() {
        let aliases = AliasAllocator::new();
        let view: EntityRef = Arc::new(View::new("catalog", catalog(&aliases)).unwrap());

        let mut b = JoinGraphBuilder::new(&aliases, view).unwrap();
        b.project(b.root(), "name", "name").unwrap();
        b.join(
            b.root(),
            JoinSpec::new(parts(), JoinType::Inner)
                .relation("again")
                .restrict(Restriction::equals("id", "part_id")),
        )
        .unwrap();
        let sql = QueryCompiler::default().pretty(false).to_sql(&b.build()).unwrap();
        assert!(sql.contains("FROM catalog t"), "{sql}");
    }
}
