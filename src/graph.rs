//! Join graphs: a root entity plus a tree of references to joined entities.
//!
//! Nodes and references live in a petgraph arena (`DiGraph<JoinNode,
//! Reference>`); a reference is an edge from the parent node to the node it
//! joins. Alongside the arena the graph keeps the declaration-ordered list of
//! every reference, however deeply nested, so compilation and key
//! resolution are single linear passes.
//!
//! Graphs are assembled with [`JoinGraphBuilder`] and never change
//! afterwards. All qualifier and column resolution happens while building:
//! each restriction side is pinned to a concrete `(node, column)` pair
//! before the graph exists.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::Direction;
use tracing::debug;

use crate::alias::{AliasAllocator, AliasRole};
use crate::entity::{validate_entity, EntityRef};
use crate::error::{ConfigError, ConfigResult};
use crate::restriction::{ColumnSpec, Restriction, RestrictionOp};

pub use crate::sql::query::JoinType;

// ============================================================================
// Nodes and edges
// ============================================================================

/// One table occurrence in a join graph.
#[derive(Debug, Clone)]
pub struct JoinNode {
    pub entity: EntityRef,
    /// Unique table alias.
    pub alias: String,
    /// Name the node is reachable by as a view relation. The root's is its
    /// table name.
    pub relation: String,
    /// Ordered `(source column, output alias)` pairs.
    pub projection: Vec<(String, String)>,
    /// How this node is joined to its parent. Unused on the root.
    pub join_type: JoinType,
}

impl JoinNode {
    pub fn table(&self) -> &str {
        self.entity.table()
    }
}

/// A restriction side pinned to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub node: NodeIndex,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRestriction {
    pub op: RestrictionOp,
    pub local: ResolvedColumn,
    pub remote: ResolvedColumn,
}

/// Edge weight: the restrictions joining a child to its parent.
#[derive(Debug, Clone)]
pub struct Reference {
    /// Restrictions as declared.
    pub declared: Vec<Restriction>,
    /// The same restrictions, in order, resolved to nodes.
    pub restrictions: Vec<ResolvedRestriction>,
}

/// A reference together with both of its endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Link<'g> {
    pub edge: EdgeIndex,
    pub parent: NodeIndex,
    pub child: NodeIndex,
    pub parent_node: &'g JoinNode,
    pub child_node: &'g JoinNode,
    pub reference: &'g Reference,
}

// ============================================================================
// Graph
// ============================================================================

/// An immutable join graph.
#[derive(Debug, Clone)]
pub struct JoinGraph {
    graph: DiGraph<JoinNode, Reference>,
    root: NodeIndex,
    /// Every reference in declaration order.
    references: Vec<EdgeIndex>,
    /// Index: relation name → node (joined nodes only)
    relation_index: HashMap<String, NodeIndex>,
    /// Index: alias → node
    alias_index: HashMap<String, NodeIndex>,
}

impl JoinGraph {
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn root_node(&self) -> &JoinNode {
        &self.graph[self.root]
    }

    pub fn node(&self, index: NodeIndex) -> Option<&JoinNode> {
        self.graph.node_weight(index)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Root first, then every joined node in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &JoinNode)> + '_ {
        std::iter::once(self.root)
            .chain(self.links().map(|link| link.child))
            .map(move |idx| (idx, &self.graph[idx]))
    }

    /// Every reference in declaration order.
    pub fn links(&self) -> impl Iterator<Item = Link<'_>> + '_ {
        self.references.iter().filter_map(move |&edge| {
            let (parent, child) = self.graph.edge_endpoints(edge)?;
            Some(Link {
                edge,
                parent,
                child,
                parent_node: &self.graph[parent],
                child_node: &self.graph[child],
                reference: &self.graph[edge],
            })
        })
    }

    pub fn link(&self, edge: EdgeIndex) -> Option<Link<'_>> {
        let (parent, child) = self.graph.edge_endpoints(edge)?;
        Some(Link {
            edge,
            parent,
            child,
            parent_node: &self.graph[parent],
            child_node: &self.graph[child],
            reference: &self.graph[edge],
        })
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// The reference that joins `node` to its parent; `None` for the root.
    pub fn incoming(&self, node: NodeIndex) -> Option<Link<'_>> {
        use petgraph::visit::EdgeRef;
        let edge = self.graph.edges_directed(node, Direction::Incoming).next()?;
        self.link(edge.id())
    }

    pub fn node_by_relation(&self, name: &str) -> Option<NodeIndex> {
        self.relation_index.get(name).copied()
    }

    pub fn node_by_alias(&self, alias: &str) -> Option<NodeIndex> {
        self.alias_index.get(alias).copied()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Declaration of one joined node.
#[derive(Debug, Clone)]
#[must_use = "a JoinSpec does nothing until passed to JoinGraphBuilder::join"]
pub struct JoinSpec {
    entity: EntityRef,
    join_type: JoinType,
    relation: Option<String>,
    restrictions: Vec<Restriction>,
    projection: Vec<(String, String)>,
}

impl JoinSpec {
    pub fn new(entity: EntityRef, join_type: JoinType) -> Self {
        Self {
            entity,
            join_type,
            relation: None,
            restrictions: Vec::new(),
            projection: Vec::new(),
        }
    }

    /// Like [`JoinSpec::new`], with the join kind given as a keyword
    /// (`"left outer"`, `"NATURAL"`, ...).
    pub fn with_keyword(entity: EntityRef, keyword: &str) -> ConfigResult<Self> {
        Ok(Self::new(entity, keyword.parse()?))
    }

    /// Relation name; defaults to the entity's table name.
    pub fn relation(mut self, name: impl Into<String>) -> Self {
        self.relation = Some(name.into());
        self
    }

    pub fn restrict(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    pub fn project(mut self, source: impl Into<String>, output: impl Into<String>) -> Self {
        self.projection.push((source.into(), output.into()));
        self
    }

    /// Project every column of the entity under its own name.
    pub fn project_all(mut self) -> Self {
        let columns = self.entity.columns().to_vec();
        self.projection
            .extend(columns.into_iter().map(|c| (c.clone(), c)));
        self
    }
}

/// Assembles a [`JoinGraph`].
///
/// ```ignore
/// let mut b = JoinGraphBuilder::new(&aliases, widgets)?;
/// b.project_all(b.root())?;
/// b.join(b.root(), JoinSpec::new(parts, JoinType::Left)
///     .restrict(Restriction::equals("parts.id", "widgets.part_id"))
///     .project("detail", "part_detail"))?;
/// let graph = b.build();
/// ```
#[derive(Debug)]
pub struct JoinGraphBuilder<'a> {
    aliases: &'a AliasAllocator,
    graph: DiGraph<JoinNode, Reference>,
    root: NodeIndex,
    references: Vec<EdgeIndex>,
    relation_index: HashMap<String, NodeIndex>,
    alias_index: HashMap<String, NodeIndex>,
}

impl<'a> JoinGraphBuilder<'a> {
    pub fn new(aliases: &'a AliasAllocator, root: EntityRef) -> ConfigResult<Self> {
        validate_entity(root.as_ref())?;

        let alias = aliases.next_alias(root.table(), AliasRole::Root);
        let mut graph = DiGraph::new();
        let root_idx = graph.add_node(JoinNode {
            relation: root.table().to_string(),
            entity: root,
            alias: alias.clone(),
            projection: Vec::new(),
            join_type: JoinType::Plain,
        });

        Ok(Self {
            aliases,
            graph,
            root: root_idx,
            references: Vec::new(),
            relation_index: HashMap::new(),
            alias_index: HashMap::from([(alias, root_idx)]),
        })
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Alias of a node added so far.
    pub fn alias(&self, node: NodeIndex) -> Option<&str> {
        self.graph.node_weight(node).map(|n| n.alias.as_str())
    }

    /// Add a projection to an existing node.
    pub fn project(
        &mut self,
        node: NodeIndex,
        source: &str,
        output: &str,
    ) -> ConfigResult<&mut Self> {
        let target = self
            .graph
            .node_weight_mut(node)
            .ok_or(ConfigError::UnknownParent)?;
        if !target.entity.has_column(source) {
            return Err(ConfigError::UnknownColumn {
                table: target.entity.table().to_string(),
                column: source.to_string(),
            });
        }
        target.projection.push((source.to_string(), output.to_string()));
        Ok(self)
    }

    /// Project every column of an existing node under its own name.
    pub fn project_all(&mut self, node: NodeIndex) -> ConfigResult<&mut Self> {
        let target = self
            .graph
            .node_weight_mut(node)
            .ok_or(ConfigError::UnknownParent)?;
        let columns = target.entity.columns().to_vec();
        target
            .projection
            .extend(columns.into_iter().map(|c| (c.clone(), c)));
        Ok(self)
    }

    /// Join a new node under `parent`.
    pub fn join(&mut self, parent: NodeIndex, spec: JoinSpec) -> ConfigResult<NodeIndex> {
        if self.graph.node_weight(parent).is_none() {
            return Err(ConfigError::UnknownParent);
        }
        validate_entity(spec.entity.as_ref())?;

        let table = spec.entity.table().to_string();
        if spec.join_type.takes_condition() && spec.restrictions.is_empty() {
            return Err(ConfigError::MissingRestrictions {
                join_type: spec.join_type,
                table,
            });
        }

        let relation = spec.relation.unwrap_or_else(|| table.clone());
        if self.relation_index.contains_key(&relation) {
            return Err(ConfigError::DuplicateRelation(relation));
        }

        if let Some((source, _)) = spec
            .projection
            .iter()
            .find(|(source, _)| !spec.entity.has_column(source))
        {
            return Err(ConfigError::UnknownColumn {
                table,
                column: source.clone(),
            });
        }

        let alias = self.aliases.next_alias(&table, AliasRole::Joined);
        let child = self.graph.add_node(JoinNode {
            entity: spec.entity,
            alias: alias.clone(),
            relation: relation.clone(),
            projection: spec.projection,
            join_type: spec.join_type,
        });

        // The child must be in the arena for qualifiers to find it; take it
        // back out if any restriction fails to resolve. It is the last node,
        // so removal leaves every other index intact.
        let resolved: ConfigResult<Vec<_>> = spec
            .restrictions
            .iter()
            .map(|r| self.resolve_restriction(r, child, parent))
            .collect();
        let restrictions = match resolved {
            Ok(restrictions) => restrictions,
            Err(e) => {
                self.graph.remove_node(child);
                return Err(e);
            }
        };

        let edge = self.graph.add_edge(
            parent,
            child,
            Reference {
                declared: spec.restrictions,
                restrictions,
            },
        );
        self.references.push(edge);
        self.relation_index.insert(relation, child);
        self.alias_index.insert(alias, child);
        Ok(child)
    }

    pub fn build(self) -> JoinGraph {
        debug!(
            root = self.graph[self.root].table(),
            references = self.references.len(),
            "built join graph"
        );
        JoinGraph {
            graph: self.graph,
            root: self.root,
            references: self.references,
            relation_index: self.relation_index,
            alias_index: self.alias_index,
        }
    }

    fn resolve_restriction(
        &self,
        restriction: &Restriction,
        child: NodeIndex,
        parent: NodeIndex,
    ) -> ConfigResult<ResolvedRestriction> {
        let local = self.resolve_column(&restriction.local, child)?;
        // Once the local side has moved off the child, a bare remote column
        // must come from the child itself or the reference would not touch it.
        let remote = match restriction.remote.qualifier {
            None if local.node != child => self.resolve_on(&restriction.remote, child)?,
            _ => self.resolve_column(&restriction.remote, parent)?,
        };

        let inferred =
            restriction.local.qualifier.is_none() || restriction.remote.qualifier.is_none();
        if inferred && local.node == remote.node {
            return Err(ConfigError::SelfRestriction {
                local: restriction.local.to_string(),
                remote: restriction.remote.to_string(),
                alias: self.graph[local.node].alias.clone(),
            });
        }

        Ok(ResolvedRestriction {
            op: restriction.op,
            local,
            remote,
        })
    }

    /// Pin a bare column to `node` with no fallback.
    fn resolve_on(&self, spec: &ColumnSpec, node: NodeIndex) -> ConfigResult<ResolvedColumn> {
        let entity = &self.graph[node].entity;
        if !entity.has_column(&spec.column) {
            return Err(ConfigError::UnknownColumn {
                table: entity.table().to_string(),
                column: spec.column.clone(),
            });
        }
        Ok(ResolvedColumn {
            node,
            column: spec.column.clone(),
        })
    }

    /// Pin a column to a node.
    ///
    /// A qualifier names a node by alias, relation name or table name, in
    /// that order of precedence. Without one the column belongs to
    /// `default`, unless `default` lacks it and exactly one other node has it.
    /// So for `widgets LEFT JOIN parts` with `part_id = id`, the local side
    /// lands on `widgets` and `resolve_restriction` then pins `id` to `parts`.
    fn resolve_column(&self, spec: &ColumnSpec, default: NodeIndex) -> ConfigResult<ResolvedColumn> {
        let node = match &spec.qualifier {
            Some(q) => {
                let node = self.resolve_qualifier(q, spec)?;
                let entity = &self.graph[node].entity;
                if !entity.has_column(&spec.column) {
                    return Err(ConfigError::UnknownColumn {
                        table: entity.table().to_string(),
                        column: spec.column.clone(),
                    });
                }
                node
            }
            None if self.graph[default].entity.has_column(&spec.column) => default,
            None => {
                let candidates: Vec<NodeIndex> = self
                    .graph
                    .node_indices()
                    .filter(|&idx| idx != default && self.graph[idx].entity.has_column(&spec.column))
                    .collect();
                match candidates.as_slice() {
                    [only] => *only,
                    [] => {
                        return Err(ConfigError::UnknownColumn {
                            table: self.graph[default].table().to_string(),
                            column: spec.column.clone(),
                        })
                    }
                    _ => {
                        return Err(ConfigError::AmbiguousColumn {
                            column: spec.column.clone(),
                            candidates: candidates
                                .iter()
                                .map(|&idx| self.graph[idx].alias.clone())
                                .collect(),
                        })
                    }
                }
            }
        };

        Ok(ResolvedColumn {
            node,
            column: spec.column.clone(),
        })
    }

    fn resolve_qualifier(&self, qualifier: &str, spec: &ColumnSpec) -> ConfigResult<NodeIndex> {
        if let Some(&idx) = self.alias_index.get(qualifier) {
            return Ok(idx);
        }
        // The pending child is not indexed yet; it is always the last node.
        let mut by_alias = self.graph.node_indices().filter(|&i| self.graph[i].alias == qualifier);
        if let Some(idx) = by_alias.next() {
            return Ok(idx);
        }

        let by_relation: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&i| i != self.root && self.graph[i].relation == qualifier)
            .collect();
        if let [only] = by_relation.as_slice() {
            return Ok(*only);
        }

        let by_table: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&i| self.graph[i].table() == qualifier)
            .collect();
        match by_table.as_slice() {
            [only] => Ok(*only),
            [] => Err(ConfigError::UnknownQualifier {
                qualifier: qualifier.to_string(),
                column: spec.to_string(),
            }),
            _ => Err(ConfigError::AmbiguousColumn {
                column: spec.to_string(),
                candidates: by_table
                    .iter()
                    .map(|&i| self.graph[i].alias.clone())
                    .collect(),
            }),
        }
    }
}
