//! Column-to-column join predicates.
//!
//! A [`Restriction`] links a column of the joined (local) node to a column of
//! its parent (remote) node. Either side may carry a qualifier (`parts.id`)
//! naming a different node; otherwise local columns belong to the child and
//! remote columns to the parent. The [`RestrictionCompiler`] lowers one
//! restriction, once both sides are pinned to `(alias, column)` pairs, into
//! an [`Expr`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sql::expr::{lit_str, table_col, Expr, ExprExt};

/// Predicate operator between the two sides of a restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestrictionOp {
    Equals,
    NotEquals,
    /// Local column contains the remote value: `l LIKE '%' || r || '%'`.
    Like,
    /// Local column is a member of the remote set: `l IN (r)`.
    In,
}

impl fmt::Display for RestrictionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RestrictionOp::Equals => "EQUALS",
            RestrictionOp::NotEquals => "NOT_EQUALS",
            RestrictionOp::Like => "LIKE",
            RestrictionOp::In => "IN",
        };
        f.write_str(name)
    }
}

/// How `NOT_EQUALS` restrictions are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotEqualsMode {
    /// `l <> r`.
    #[default]
    Negated,
    /// `l = r`, byte-compatible with graphs compiled by older releases.
    Legacy,
}

/// A possibly-qualified column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnSpec {
    pub qualifier: Option<String>,
    pub column: String,
}

impl ColumnSpec {
    /// Split on the last `.`: `inv.parts.id` has qualifier `inv.parts`.
    pub fn parse(spec: &str) -> Self {
        match spec.rsplit_once('.') {
            Some((qualifier, column)) => Self {
                qualifier: Some(qualifier.to_string()),
                column: column.to_string(),
            },
            None => Self {
                qualifier: None,
                column: spec.to_string(),
            },
        }
    }

    /// The column with its embedded qualifier, or `default` when it has none.
    pub fn qualified_by<'a>(&'a self, default: &'a str) -> (&'a str, &'a str) {
        (self.qualifier.as_deref().unwrap_or(default), &self.column)
    }
}

impl From<&str> for ColumnSpec {
    fn from(spec: &str) -> Self {
        ColumnSpec::parse(spec)
    }
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{q}.{}", self.column),
            None => f.write_str(&self.column),
        }
    }
}

/// One predicate of a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    pub op: RestrictionOp,
    /// Column on the joined node.
    pub local: ColumnSpec,
    /// Column on the parent node.
    pub remote: ColumnSpec,
}

impl Restriction {
    pub fn new(op: RestrictionOp, local: impl Into<ColumnSpec>, remote: impl Into<ColumnSpec>) -> Self {
        Self {
            op,
            local: local.into(),
            remote: remote.into(),
        }
    }

    pub fn equals(local: &str, remote: &str) -> Self {
        Self::new(RestrictionOp::Equals, local, remote)
    }

    pub fn not_equals(local: &str, remote: &str) -> Self {
        Self::new(RestrictionOp::NotEquals, local, remote)
    }

    pub fn like(local: &str, remote: &str) -> Self {
        Self::new(RestrictionOp::Like, local, remote)
    }

    pub fn is_in(local: &str, remote: &str) -> Self {
        Self::new(RestrictionOp::In, local, remote)
    }
}

/// Lowers restrictions to predicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestrictionCompiler {
    pub not_equals: NotEqualsMode,
}

impl RestrictionCompiler {
    pub fn new(not_equals: NotEqualsMode) -> Self {
        Self { not_equals }
    }

    /// Compile a restriction whose sides default to the given aliases.
    ///
    /// Embedded qualifiers are used verbatim; callers that need them resolved
    /// to node aliases go through the join graph instead.
    pub fn compile(&self, restriction: &Restriction, local_alias: &str, remote_alias: &str) -> Expr {
        self.compile_columns(
            restriction.op,
            restriction.local.qualified_by(local_alias),
            restriction.remote.qualified_by(remote_alias),
        )
    }

    /// Compile an operator over two resolved `(alias, column)` pairs.
    pub fn compile_columns(&self, op: RestrictionOp, local: (&str, &str), remote: (&str, &str)) -> Expr {
        let left = table_col(local.0, local.1);
        let right = table_col(remote.0, remote.1);

        match op {
            RestrictionOp::Equals => left.eq(right),
            RestrictionOp::NotEquals => match self.not_equals {
                NotEqualsMode::Negated => left.ne(right),
                NotEqualsMode::Legacy => left.eq(right),
            },
            RestrictionOp::Like => left.like(lit_str("%").concat(right).concat(lit_str("%"))),
            RestrictionOp::In => left.in_list(vec![right]),
        }
    }
}
