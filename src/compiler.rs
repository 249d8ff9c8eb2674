//! Join graph → SQL compilation.
//!
//! A graph flattens into one statement:
//!
//! ```text
//! SELECT <alias-sorted "node_alias.column AS output" list>
//! FROM <root table> <root alias>
//! <join kind> JOIN <table> <alias> ON (<p1> AND <p2> ...)   -- per reference, declaration order
//! ```
//!
//! NATURAL joins carry no ON clause. The statement contains identifiers only;
//! value filters are layered on by callers via [`Query::filter`].

use std::collections::BTreeMap;

use petgraph::graph::NodeIndex;
use tracing::debug;

use crate::config::CompilerSettings;
use crate::error::{CompileError, CompileResult};
use crate::graph::{JoinGraph, JoinType, Link};
use crate::restriction::{NotEqualsMode, RestrictionCompiler};
use crate::sql::dialect::{Dialect, SqlDialect};
use crate::sql::expr::{table_col, Expr, ExprExt};
use crate::sql::query::{Query, SelectExpr, TableRef};

// ============================================================================
// Projection
// ============================================================================

/// One output column of a compiled graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedColumn {
    pub node: NodeIndex,
    /// Alias of the node's table.
    pub table_alias: String,
    pub column: String,
    pub output: String,
}

/// Output alias → source column, sorted by output alias.
///
/// The first source registered for an output alias keeps it; later claims
/// are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    columns: BTreeMap<String, ProjectedColumn>,
}

impl Projection {
    /// Accumulate the projections of the root, then of every joined node in
    /// declaration order.
    pub fn accumulate(graph: &JoinGraph) -> Self {
        let mut projection = Projection::default();
        for (idx, node) in graph.nodes() {
            for (source, output) in &node.projection {
                projection.insert(idx, &node.alias, source, output);
            }
        }
        projection
    }

    /// Register a column; returns false if `output` was already taken.
    pub fn insert(&mut self, node: NodeIndex, table_alias: &str, column: &str, output: &str) -> bool {
        if let Some(existing) = self.columns.get(output) {
            debug!(
                output,
                kept = %format!("{}.{}", existing.table_alias, existing.column),
                dropped = %format!("{table_alias}.{column}"),
                "dropping duplicate projection"
            );
            return false;
        }
        self.columns.insert(
            output.to_string(),
            ProjectedColumn {
                node,
                table_alias: table_alias.to_string(),
                column: column.to_string(),
                output: output.to_string(),
            },
        );
        true
    }

    pub fn get(&self, output: &str) -> Option<&ProjectedColumn> {
        self.columns.get(output)
    }

    /// Columns in output-alias order.
    pub fn iter(&self) -> impl Iterator<Item = &ProjectedColumn> {
        self.columns.values()
    }

    pub fn outputs(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Lowers join graphs to SELECT statements.
#[derive(Debug, Clone, Copy)]
pub struct QueryCompiler {
    dialect: Dialect,
    restrictions: RestrictionCompiler,
    pretty: bool,
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self::new(Dialect::default())
    }
}

impl QueryCompiler {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            restrictions: RestrictionCompiler::default(),
            pretty: true,
        }
    }

    pub fn from_settings(settings: &CompilerSettings) -> Self {
        Self::new(settings.dialect)
            .not_equals(settings.not_equals)
            .pretty(settings.pretty)
    }

    pub fn not_equals(mut self, mode: NotEqualsMode) -> Self {
        self.restrictions = RestrictionCompiler::new(mode);
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    pub fn projection(&self, graph: &JoinGraph) -> Projection {
        Projection::accumulate(graph)
    }

    /// Compile a graph with its own accumulated projection.
    pub fn compile(&self, graph: &JoinGraph) -> CompileResult<Query> {
        self.compile_with(graph, &self.projection(graph))
    }

    /// Compile a graph with an explicit projection.
    pub fn compile_with(&self, graph: &JoinGraph, projection: &Projection) -> CompileResult<Query> {
        let root = graph.root_node();
        if projection.is_empty() {
            return Err(CompileError::EmptyProjection(root.table().to_string()));
        }

        let select: Vec<SelectExpr> = projection
            .iter()
            .map(|c| table_col(&c.table_alias, &c.column).alias(&c.output))
            .collect();

        let mut query = Query::new()
            .select(select)
            .from(TableRef::new(root.table()).with_alias(&root.alias));

        for link in graph.links() {
            self.check_join_support(&link)?;
            let child = link.child_node;
            query = query.join(
                child.join_type,
                TableRef::new(child.table()).with_alias(&child.alias),
                self.condition(graph, &link),
            );
        }

        Ok(query)
    }

    /// Compile and render a graph.
    pub fn to_sql(&self, graph: &JoinGraph) -> CompileResult<String> {
        let query = self.compile(graph)?;
        Ok(self.render(&query))
    }

    /// Render a query with this compiler's dialect and layout.
    pub fn render(&self, query: &Query) -> String {
        let sql = if self.pretty {
            query.to_sql(self.dialect)
        } else {
            query.to_sql_compact(self.dialect)
        };
        debug!(dialect = %self.dialect, joins = query.joins.len(), sql = %sql, "compiled statement");
        sql
    }

    /// `(p1 AND p2 ...)` over a reference's restrictions; `None` for NATURAL.
    fn condition(&self, graph: &JoinGraph, link: &Link<'_>) -> Option<Expr> {
        if !link.child_node.join_type.takes_condition() {
            return None;
        }
        let predicates = link.reference.restrictions.iter().filter_map(|r| {
            let local = graph.node(r.local.node)?;
            let remote = graph.node(r.remote.node)?;
            Some(self.restrictions.compile_columns(
                r.op,
                (local.alias.as_str(), r.local.column.as_str()),
                (remote.alias.as_str(), r.remote.column.as_str()),
            ))
        });
        Expr::and_all(predicates).map(|e| e.paren())
    }

    fn check_join_support(&self, link: &Link<'_>) -> CompileResult<()> {
        let join_type = link.child_node.join_type;
        let supported = match join_type {
            JoinType::Natural => self.dialect.supports_natural_join(),
            JoinType::Right => self.dialect.supports_right_join(),
            _ => true,
        };
        if supported {
            Ok(())
        } else {
            Err(CompileError::UnsupportedJoin {
                dialect: self.dialect,
                join_type,
                table: link.child_node.table().to_string(),
            })
        }
    }
}
