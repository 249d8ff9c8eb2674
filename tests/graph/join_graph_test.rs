// tests/graph/join_graph_test.rs
#[cfg(test)]
mod tests {
    use relmap::alias::AliasAllocator;
    use relmap::entity::{EntityRef, PseudoType, TableEntity};
    use relmap::error::ConfigError;
    use relmap::graph::{JoinGraphBuilder, JoinSpec, JoinType};
    use relmap::restriction::{Restriction, RestrictionOp};

    fn orders() -> EntityRef {
        TableEntity::new("orders")
            .column("id", PseudoType::Integer)
            .column("customer_id", PseudoType::Integer)
            .column("placed_at", PseudoType::Timestamp)
            .primary_key(["id"])
            .into_ref()
            .unwrap()
    }

    fn customers() -> EntityRef {
        TableEntity::new("customers")
            .column("id", PseudoType::Integer)
            .column("region_id", PseudoType::Integer)
            .column("email", PseudoType::Text)
            .primary_key(["id"])
            .into_ref()
            .unwrap()
    }

    fn regions() -> EntityRef {
        TableEntity::new("sales.regions")
            .column("id", PseudoType::Integer)
            .column("label", PseudoType::Text)
            .primary_key(["id"])
            .into_ref()
            .unwrap()
    }

    #[test]
    fn test_nested_references_flatten_in_declaration_order() {
        let aliases = AliasAllocator::new();
        let mut b = JoinGraphBuilder::new(&aliases, orders()).unwrap();
        let c = b
            .join(
                b.root(),
                JoinSpec::new(customers(), JoinType::Inner)
                    .relation("customer")
                    .restrict(Restriction::equals("id", "customer_id")),
            )
            .unwrap();
        let r = b
            .join(
                c,
                JoinSpec::new(regions(), JoinType::LeftOuter)
                    .relation("region")
                    .restrict(Restriction::equals("id", "region_id")),
            )
            .unwrap();
        let graph = b.build();

        let aliases: Vec<_> = graph.nodes().map(|(_, n)| n.alias.clone()).collect();
        assert_eq!(aliases, ["t1_orders", "j2_customers", "j3_sales_regions"]);

        let links: Vec<_> = graph.links().map(|l| (l.parent, l.child)).collect();
        assert_eq!(links, [(graph.root(), c), (c, r)]);

        assert_eq!(graph.node_by_relation("region"), Some(r));
        assert_eq!(graph.incoming(r).unwrap().parent, c);
    }

    #[test]
    fn test_qualifier_by_alias_relation_and_table() {
        let aliases = AliasAllocator::new();
        let mut b = JoinGraphBuilder::new(&aliases, orders()).unwrap();
        let root_alias = b.alias(b.root()).unwrap().to_string();
        let c = b
            .join(
                b.root(),
                JoinSpec::new(customers(), JoinType::Inner)
                    .relation("customer")
                    .restrict(Restriction::equals("customer.id", &format!("{root_alias}.customer_id"))),
            )
            .unwrap();
        // "sales.regions" qualifies by table name; the column splits on the last dot
        let r = b
            .join(
                c,
                JoinSpec::new(regions(), JoinType::Left)
                    .restrict(Restriction::equals("sales.regions.id", "customers.region_id")),
            )
            .unwrap();
        let graph = b.build();

        let rc = &graph.incoming(c).unwrap().reference.restrictions[0];
        assert_eq!((rc.local.node, rc.remote.node), (c, graph.root()));
        let rr = &graph.incoming(r).unwrap().reference.restrictions[0];
        assert_eq!((rr.local.node, rr.remote.node), (r, c));
        assert_eq!(rr.op, RestrictionOp::Equals);
    }

    #[test]
    fn test_unknown_qualifier_and_column() {
        let aliases = AliasAllocator::new();
        let mut b = JoinGraphBuilder::new(&aliases, orders()).unwrap();

        let err = b
            .join(
                b.root(),
                JoinSpec::new(customers(), JoinType::Inner)
                    .restrict(Restriction::equals("vendors.id", "customer_id")),
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownQualifier { .. }), "{err}");

        let err = b
            .join(
                b.root(),
                JoinSpec::new(customers(), JoinType::Inner)
                    .restrict(Restriction::equals("customers.phone", "customer_id")),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownColumn {
                table: "customers".into(),
                column: "phone".into()
            }
        );
    }

    #[test]
    fn test_join_keywords_from_strings() {
        let aliases = AliasAllocator::new();
        let mut b = JoinGraphBuilder::new(&aliases, orders()).unwrap();
        let spec = JoinSpec::with_keyword(customers(), "left outer")
            .unwrap()
            .restrict(Restriction::equals("id", "customer_id"));
        let c = b.join(b.root(), spec).unwrap();
        let graph = b.build();
        assert_eq!(graph.node(c).unwrap().join_type, JoinType::LeftOuter);

        let err = JoinSpec::with_keyword(customers(), "FULL").unwrap_err();
        assert!(err.to_string().contains("FULL"));
    }

    #[test]
    fn test_invalid_root_entity() {
        let aliases = AliasAllocator::new();
        let bad = TableEntity::new("ghosts")
            .column("id", PseudoType::Integer)
            .primary_key(["uuid"]);
        let err = JoinGraphBuilder::new(&aliases, std::sync::Arc::new(bad)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEntity { .. }));
    }

    #[test]
    fn test_project_unknown_column() {
        let aliases = AliasAllocator::new();
        let mut b = JoinGraphBuilder::new(&aliases, orders()).unwrap();
        let root = b.root();
        let err = b.project(root, "total", "total").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownColumn { .. }));
        b.project(root, "placed_at", "ordered").unwrap();
        let graph = b.build();
        assert_eq!(graph.root_node().projection, [("placed_at".to_string(), "ordered".to_string())]);
    }
}
