//! Views: join graphs presented as entities.
//!
//! A [`View`] wraps one [`JoinGraph`] and answers the same [`Entity`]
//! contract as a base table: its table is the view name, its primary key is
//! resolved from the graph's topology and its columns are every projected
//! output alias plus the key columns. Those answers are computed on first
//! use, exactly once, even with concurrent first callers.
//!
//! Related records are reached by relation name (or node alias) through a
//! closed map of [`RelationAccessor`]s built with the view; a name outside
//! that map is an error, never a guess.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use petgraph::graph::{EdgeIndex, NodeIndex};
use tracing::{debug, trace};

use crate::compiler::{Projection, QueryCompiler};
use crate::entity::{Entity, PseudoType, Record, Value};
use crate::error::{CompileResult, ConfigError, ConfigResult, ViewError, ViewResult};
use crate::graph::{JoinGraph, JoinType};
use crate::primary_key::{PrimaryKey, PrimaryKeyResolver};
use crate::restriction::RestrictionOp;
use crate::sql::ddl::{CreateView, DropView};
use crate::sql::query::Query;

/// How a related record is seeded from a row of the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationAccessor {
    /// Seeded through the EQUALS restrictions of the reference.
    Restricted {
        reference: EdgeIndex,
        target: NodeIndex,
    },
    /// Seeded through the column names the target shares with its parent.
    Natural {
        reference: EdgeIndex,
        target: NodeIndex,
        shared: Vec<String>,
    },
}

impl RelationAccessor {
    pub fn target(&self) -> NodeIndex {
        match self {
            RelationAccessor::Restricted { target, .. } | RelationAccessor::Natural { target, .. } => {
                *target
            }
        }
    }

    pub fn reference(&self) -> EdgeIndex {
        match self {
            RelationAccessor::Restricted { reference, .. }
            | RelationAccessor::Natural { reference, .. } => *reference,
        }
    }
}

/// Columns of a view, fixed on first use.
#[derive(Debug)]
struct ViewColumns {
    /// Graph projection plus key columns.
    projection: Projection,
    names: Vec<String>,
    manifest: Vec<(String, PseudoType)>,
}

/// A join graph exposed as an entity.
#[derive(Debug)]
pub struct View {
    name: String,
    graph: Arc<JoinGraph>,
    compiler: QueryCompiler,
    relations: HashMap<String, RelationAccessor>,
    primary_key: OnceCell<PrimaryKey>,
    key_names: OnceCell<Vec<String>>,
    columns: OnceCell<ViewColumns>,
}

impl View {
    pub fn new(name: impl Into<String>, graph: impl Into<Arc<JoinGraph>>) -> ConfigResult<Self> {
        let name = name.into();
        let graph = graph.into();
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidEntity {
                entity: name,
                reason: "view name is empty".to_string(),
            });
        }

        let mut relations = HashMap::new();
        for link in graph.links() {
            let accessor = match link.child_node.join_type {
                JoinType::Natural => RelationAccessor::Natural {
                    reference: link.edge,
                    target: link.child,
                    shared: link
                        .child_node
                        .entity
                        .columns()
                        .iter()
                        .filter(|c| link.parent_node.entity.has_column(c))
                        .cloned()
                        .collect(),
                },
                _ => RelationAccessor::Restricted {
                    reference: link.edge,
                    target: link.child,
                },
            };

            for key in [&link.child_node.relation, &link.child_node.alias] {
                if relations.insert(key.clone(), accessor.clone()).is_some() {
                    return Err(ConfigError::DuplicateRelation(key.clone()));
                }
            }
        }

        Ok(Self {
            name,
            graph,
            compiler: QueryCompiler::default(),
            relations,
            primary_key: OnceCell::new(),
            key_names: OnceCell::new(),
            columns: OnceCell::new(),
        })
    }

    /// Compile with `compiler` rather than the default.
    pub fn with_compiler(mut self, compiler: QueryCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &JoinGraph {
        &self.graph
    }

    /// Resolved key, with the reference and node behind each column.
    pub fn key(&self) -> &PrimaryKey {
        self.primary_key
            .get_or_init(|| PrimaryKeyResolver::resolve(&self.graph))
    }

    /// `(output alias, pseudo-type)` for every column, in column order.
    pub fn column_manifest(&self) -> &[(String, PseudoType)] {
        &self.view_columns().manifest
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    pub fn accessor(&self, relation: &str) -> Option<&RelationAccessor> {
        self.relations.get(relation)
    }

    /// The SELECT behind the view: graph projection plus key columns.
    pub fn query(&self) -> CompileResult<Query> {
        self.compiler
            .compile_with(&self.graph, &self.view_columns().projection)
    }

    pub fn to_sql(&self) -> CompileResult<String> {
        Ok(self.compiler.render(&self.query()?))
    }

    /// `CREATE [OR REPLACE] VIEW <name> AS <select>` in the compiler's dialect.
    pub fn create_view(&self) -> CompileResult<String> {
        let dialect = self.compiler.dialect();
        let tokens = CreateView::new(&self.name, self.query()?)
            .or_replace()
            .to_tokens(dialect);
        Ok(if self.compiler.is_pretty() {
            tokens.serialize(dialect)
        } else {
            tokens.serialize_compact(dialect)
        })
    }

    /// `DROP VIEW IF EXISTS <name>` in the compiler's dialect.
    pub fn drop_view(&self) -> String {
        DropView::new(&self.name)
            .if_exists()
            .to_sql(self.compiler.dialect())
    }

    /// Load the record a relation points at from one row of this view.
    ///
    /// The new record is seeded with the values the reference's EQUALS
    /// restrictions carry across, whichever side the target is on, or for
    /// NATURAL references with the shared columns; then with the target's
    /// full primary key. It inherits the row's database handle.
    ///
    /// A shared column is read from the parent's projection, else from the
    /// target's. When the view exposes that name only from some other node
    /// the column is shadowed and loading fails with `MissingValue`.
    pub fn relation(&self, relation: &str, row: &Record) -> ViewResult<Record> {
        let accessor = self
            .relations
            .get(relation)
            .ok_or_else(|| ViewError::UnknownRelation {
                view: self.name.clone(),
                relation: relation.to_string(),
            })?;

        let target = accessor.target();
        let target_entity = match self.graph.node(target) {
            Some(node) => node.entity.clone(),
            None => {
                return Err(ViewError::UnknownRelation {
                    view: self.name.clone(),
                    relation: relation.to_string(),
                })
            }
        };

        // field of the new record, and where in the view it can be read from
        let mut seeds: Vec<(String, Vec<(NodeIndex, &str)>)> = Vec::new();
        match accessor {
            RelationAccessor::Restricted { reference, .. } => {
                if let Some(link) = self.graph.link(*reference) {
                    for r in &link.reference.restrictions {
                        if r.op != RestrictionOp::Equals {
                            continue;
                        }
                        let (field, source) = if r.local.node == target {
                            (&r.local, &r.remote)
                        } else if r.remote.node == target {
                            (&r.remote, &r.local)
                        } else {
                            continue;
                        };
                        seeds.push((field.column.clone(), vec![(source.node, source.column.as_str())]));
                    }
                }
            }
            RelationAccessor::Natural { reference, shared, .. } => {
                if let Some(link) = self.graph.link(*reference) {
                    for column in shared {
                        seeds.push((
                            column.clone(),
                            vec![(link.parent, column.as_str()), (target, column.as_str())],
                        ));
                    }
                }
            }
        }
        for column in target_entity.primary_key() {
            seeds.push((column.clone(), vec![(target, column.as_str())]));
        }

        let mut fields: Vec<(String, Value)> = Vec::with_capacity(seeds.len());
        for (field, sources) in seeds {
            if fields.iter().any(|(f, _)| *f == field) {
                continue;
            }
            let value = sources
                .iter()
                .find_map(|&(node, column)| {
                    self.output_for(node, column).and_then(|output| row.get(output))
                })
                .ok_or_else(|| ViewError::MissingValue {
                    relation: relation.to_string(),
                    column: field.clone(),
                })?;
            fields.push((field, value.clone()));
        }

        trace!(view = %self.name, relation, fields = fields.len(), "seeded related record");
        Ok(Record::new(target_entity, fields, row.db().cloned()))
    }

    /// Output alias under which `node.column` appears in this view.
    fn output_for(&self, node: NodeIndex, column: &str) -> Option<&str> {
        self.view_columns()
            .projection
            .iter()
            .find(|c| c.node == node && c.column == column)
            .map(|c| c.output.as_str())
    }

    fn view_columns(&self) -> &ViewColumns {
        self.columns.get_or_init(|| {
            let mut projection = Projection::accumulate(&self.graph);
            for key in self.key().columns() {
                if let Some(owner) = self.graph.node(key.owner) {
                    projection.insert(key.owner, &owner.alias, &key.name, &key.name);
                }
            }

            let manifest: Vec<(String, PseudoType)> = projection
                .iter()
                .filter_map(|c| {
                    let entity = &self.graph.node(c.node)?.entity;
                    Some((c.output.clone(), entity.pseudo_type(&c.column)?))
                })
                .collect();

            debug!(
                view = %self.name,
                columns = projection.len(),
                key = ?self.key().names(),
                "resolved view columns"
            );
            ViewColumns {
                names: projection.outputs(),
                projection,
                manifest,
            }
        })
    }
}

impl Entity for View {
    fn table(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[String] {
        &self.view_columns().names
    }

    fn primary_key(&self) -> &[String] {
        self.key_names.get_or_init(|| self.key().names())
    }

    fn pseudo_type(&self, column: &str) -> Option<PseudoType> {
        self.column_manifest()
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| *ty)
    }
}
