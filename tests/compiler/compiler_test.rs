// tests/compiler/compiler_test.rs
#[cfg(test)]
mod tests {
    use relmap::alias::AliasAllocator;
    use relmap::compiler::QueryCompiler;
    use relmap::entity::{EntityRef, PseudoType, TableEntity};
    use relmap::error::CompileError;
    use relmap::graph::{JoinGraph, JoinGraphBuilder, JoinSpec, JoinType};
    use relmap::restriction::{NotEqualsMode, Restriction};
    use relmap::sql::dialect::Dialect;
    use relmap::sql::expr::{lit_str, table_col, ExprExt};
    use relmap::sql::validate::validate_sql;

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

    fn vendors() -> EntityRef {
        TableEntity::new("vendors")
            .column("id", PseudoType::Integer)
            .column("part_id", PseudoType::Integer)
            .column("title", PseudoType::Text)
            .column("tags", PseudoType::Text)
            .primary_key(["id"])
            .into_ref()
            .unwrap()
    }

    fn widgets_left_join_parts(aliases: &AliasAllocator) -> JoinGraph {
        let mut b = JoinGraphBuilder::new(aliases, widgets()).unwrap();
        b.project_all(b.root()).unwrap();
        b.join(
            b.root(),
            JoinSpec::new(parts(), JoinType::Left)
                .restrict(Restriction::equals("widgets.part_id", "parts.id"))
                .project("detail", "part_detail"),
        )
        .unwrap();
        b.build()
    }

    #[test]
    fn test_left_join_widgets_to_parts() {
        let aliases = AliasAllocator::new();
        let graph = widgets_left_join_parts(&aliases);
        let sql = QueryCompiler::default().to_sql(&graph).unwrap();

        let child = &graph.links().next().unwrap().child_node.alias;
        assert_eq!(sql.matches(&format!("LEFT JOIN parts {child}")).count(), 1);
        assert!(sql.contains(&format!("ON (t1_widgets.part_id = {child}.id)")), "{sql}");
        validate_sql(&sql, Dialect::Generic).unwrap();
    }

    #[test]
    fn test_bare_restriction_joins_widgets_to_parts() {
        let aliases = AliasAllocator::new();
        let mut b = JoinGraphBuilder::new(&aliases, widgets()).unwrap();
        b.project_all(b.root()).unwrap();
        b.join(
            b.root(),
            JoinSpec::new(parts(), JoinType::Left).restrict(Restriction::equals("part_id", "id")),
        )
        .unwrap();
        let sql = QueryCompiler::default().pretty(false).to_sql(&b.build()).unwrap();

        assert_eq!(sql.matches("LEFT JOIN parts j2_parts").count(), 1);
        assert!(sql.ends_with("ON (t1_widgets.part_id = j2_parts.id)"), "{sql}");
        validate_sql(&sql, Dialect::Generic).unwrap();
    }

    #[test]
    fn test_full_statement_shape() {
        let aliases = AliasAllocator::new();
        let mut b = JoinGraphBuilder::new(&aliases, widgets()).unwrap();
        b.project(b.root(), "name", "widget").unwrap();
        let p = b
            .join(
                b.root(),
                JoinSpec::new(parts(), JoinType::Inner)
                    .restrict(Restriction::equals("id", "part_id"))
                    .project("detail", "detail"),
            )
            .unwrap();
        b.join(
            p,
            JoinSpec::new(vendors(), JoinType::LeftOuter)
                .restrict(Restriction::equals("part_id", "id"))
                .restrict(Restriction::like("title", "detail"))
                .project("title", "vendor")
                .project("part_id", "detail"),
        )
        .unwrap();
        let graph = b.build();

        let sql = QueryCompiler::default().to_sql(&graph).unwrap();
        insta::assert_snapshot!(sql, @r###"
        SELECT
          j2_parts.detail AS detail,
          j3_vendors.title AS vendor,
          t1_widgets.name AS widget
        FROM widgets t1_widgets
        INNER JOIN parts j2_parts ON (j2_parts.id = t1_widgets.part_id)
        LEFT OUTER JOIN vendors j3_vendors ON (j3_vendors.part_id = j2_parts.id AND j3_vendors.title LIKE '%' || j2_parts.detail || '%')
        "###);
        validate_sql(&sql, Dialect::Postgres).unwrap();
    }

    #[test]
    fn test_in_restriction() {
        let aliases = AliasAllocator::new();
        let mut b = JoinGraphBuilder::new(&aliases, parts()).unwrap();
        b.project(b.root(), "id", "id").unwrap();
        b.join(
            b.root(),
            JoinSpec::new(vendors(), JoinType::Plain).restrict(Restriction::is_in("tags", "detail")),
        )
        .unwrap();
        let sql = QueryCompiler::default()
            .pretty(false)
            .to_sql(&b.build())
            .unwrap();
        assert_eq!(
            sql,
            "SELECT t1_parts.id AS id FROM parts t1_parts JOIN vendors j2_vendors ON (j2_vendors.tags IN (t1_parts.detail))"
        );
        validate_sql(&sql, Dialect::Generic).unwrap();
    }

    #[test]
    fn test_not_equals_legacy_matches_equals() {
        let aliases = AliasAllocator::new();
        let mut b = JoinGraphBuilder::new(&aliases, widgets()).unwrap();
        b.project(b.root(), "id", "id").unwrap();
        b.join(
            b.root(),
            JoinSpec::new(parts(), JoinType::Inner).restrict(Restriction::not_equals("id", "part_id")),
        )
        .unwrap();
        let graph = b.build();

        let negated = QueryCompiler::default().pretty(false).to_sql(&graph).unwrap();
        assert!(negated.ends_with("ON (j2_parts.id <> t1_widgets.part_id)"));

        let legacy = QueryCompiler::default()
            .not_equals(NotEqualsMode::Legacy)
            .pretty(false)
            .to_sql(&graph)
            .unwrap();
        assert!(legacy.ends_with("ON (j2_parts.id = t1_widgets.part_id)"));
    }

    #[test]
    fn test_every_dialect_parses() {
        let aliases = AliasAllocator::new();
        let graph = widgets_left_join_parts(&aliases);
        for dialect in [
            Dialect::Generic,
            Dialect::Postgres,
            Dialect::MySql,
            Dialect::Sqlite,
            Dialect::TSql,
        ] {
            let sql = QueryCompiler::new(dialect).to_sql(&graph).unwrap();
            validate_sql(&sql, dialect).unwrap();
        }
    }

    #[test]
    fn test_natural_join_rejected_by_tsql() {
        let aliases = AliasAllocator::new();
        let mut b = JoinGraphBuilder::new(&aliases, widgets()).unwrap();
        b.project(b.root(), "id", "id").unwrap();
        b.join(b.root(), JoinSpec::new(parts(), JoinType::Natural)).unwrap();
        let graph = b.build();

        let err = QueryCompiler::new(Dialect::TSql).to_sql(&graph).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnsupportedJoin {
                dialect: Dialect::TSql,
                join_type: JoinType::Natural,
                table: "parts".into(),
            }
        );
        assert!(QueryCompiler::new(Dialect::Sqlite).to_sql(&graph).is_ok());
    }

    #[test]
    fn test_caller_filters_layer_on_top() {
        let aliases = AliasAllocator::new();
        let graph = widgets_left_join_parts(&aliases);
        let compiler = QueryCompiler::new(Dialect::Postgres).pretty(false);
        let query = compiler
            .compile(&graph)
            .unwrap()
            .filter(table_col("t1_widgets", "name").like(lit_str("bolt%")));
        let sql = compiler.render(&query);
        assert!(sql.ends_with("WHERE \"t1_widgets\".\"name\" LIKE 'bolt%'"), "{sql}");
        validate_sql(&sql, Dialect::Postgres).unwrap();
    }
}
