//! Composite primary-key inference from join topology.
//!
//! A join graph's identifying columns are read off its references:
//!
//! - a NATURAL reference contributes every column name its child shares with
//!   its parent;
//! - any other reference contributes the local-side column of each of its
//!   restrictions.
//!
//! The union is deduplicated and sorted by name. Each key column remembers
//! the reference that produced it first and the node that owns it. A graph
//! without references is keyed by its root entity's own primary key.

use std::collections::BTreeMap;

use petgraph::graph::{EdgeIndex, NodeIndex};
use tracing::debug;

use crate::graph::{JoinGraph, JoinType};

/// One column of a resolved key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumn {
    pub name: String,
    /// Node whose entity carries the column.
    pub owner: NodeIndex,
    /// Reference that contributed the column; `None` for a root-only graph.
    pub reference: Option<EdgeIndex>,
}

/// The identifying column set of a join graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrimaryKey {
    columns: Vec<KeyColumn>,
}

impl PrimaryKey {
    pub fn columns(&self) -> &[KeyColumn] {
        &self.columns
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

pub struct PrimaryKeyResolver;

impl PrimaryKeyResolver {
    pub fn resolve(graph: &JoinGraph) -> PrimaryKey {
        if graph.reference_count() == 0 {
            let root = graph.root_node();
            return PrimaryKey {
                columns: root
                    .entity
                    .primary_key()
                    .iter()
                    .map(|name| KeyColumn {
                        name: name.clone(),
                        owner: graph.root(),
                        reference: None,
                    })
                    .collect(),
            };
        }

        let mut keys: BTreeMap<String, KeyColumn> = BTreeMap::new();
        for link in graph.links() {
            if link.child_node.join_type == JoinType::Natural {
                let parent = &link.parent_node.entity;
                for column in link.child_node.entity.columns() {
                    if parent.has_column(column) {
                        keys.entry(column.clone()).or_insert_with(|| KeyColumn {
                            name: column.clone(),
                            owner: link.child,
                            reference: Some(link.edge),
                        });
                    }
                }
            } else {
                for restriction in &link.reference.restrictions {
                    let local = &restriction.local;
                    keys.entry(local.column.clone()).or_insert_with(|| KeyColumn {
                        name: local.column.clone(),
                        owner: local.node,
                        reference: Some(link.edge),
                    });
                }
            }
        }

        let key = PrimaryKey {
            columns: keys.into_values().collect(),
        };
        debug!(
            root = graph.root_node().table(),
            key = ?key.names(),
            "resolved join graph primary key"
        );
        key
    }
}
