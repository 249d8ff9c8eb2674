//! Query builder - construct SELECT statements with a fluent API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::dialect::Dialect;
use super::expr::{Expr, ExprExt};
use super::token::{Token, TokenStream};

// =============================================================================
// Select Expression (column with optional alias)
// =============================================================================

/// A SELECT list item: expression with optional alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectExpr {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectExpr {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = self.expr.to_tokens_for_dialect(dialect);
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        ts
    }
}

impl From<Expr> for SelectExpr {
    fn from(expr: Expr) -> Self {
        SelectExpr::new(expr)
    }
}

// =============================================================================
// Table Reference
// =============================================================================

/// A table reference with optional schema and alias.
///
/// The alias follows the table name directly (`parts j2_parts`), which every
/// supported dialect accepts; `AS` is not valid for table aliases everywhere.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    /// Create a table reference. A `schema.table` name is split on the dot.
    pub fn new(table: &str) -> Self {
        match table.split_once('.') {
            Some((schema, name)) => Self {
                schema: Some(schema.into()),
                table: name.into(),
                alias: None,
            },
            None => Self {
                schema: None,
                table: table.into(),
                alias: None,
            },
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.table.clone(),
        });
        if let Some(alias) = &self.alias {
            ts.space().push(Token::Ident(alias.clone()));
        }
        ts
    }
}

// =============================================================================
// Joins
// =============================================================================

/// Type of join.
///
/// These are the six join kinds a join graph reference may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinType {
    /// Bare `JOIN`.
    Plain,
    /// `NATURAL JOIN`; joins on every shared column name, takes no ON clause.
    Natural,
    Left,
    Inner,
    Right,
    /// `LEFT OUTER JOIN`.
    LeftOuter,
}

impl JoinType {
    pub const ALL: [JoinType; 6] = [
        JoinType::Plain,
        JoinType::Natural,
        JoinType::Left,
        JoinType::Inner,
        JoinType::Right,
        JoinType::LeftOuter,
    ];

    /// Keyword tokens preceding `JOIN`.
    fn keyword_tokens(self) -> &'static [Token] {
        match self {
            JoinType::Plain => &[],
            JoinType::Natural => &[Token::Natural],
            JoinType::Left => &[Token::Left],
            JoinType::Inner => &[Token::Inner],
            JoinType::Right => &[Token::Right],
            JoinType::LeftOuter => &[Token::Left, Token::Outer],
        }
    }

    /// The SQL keyword text preceding `JOIN` (empty for a plain join).
    pub fn keyword(self) -> &'static str {
        match self {
            JoinType::Plain => "",
            JoinType::Natural => "NATURAL",
            JoinType::Left => "LEFT",
            JoinType::Inner => "INNER",
            JoinType::Right => "RIGHT",
            JoinType::LeftOuter => "LEFT OUTER",
        }
    }

    /// Whether this join takes an ON clause.
    pub fn takes_condition(self) -> bool {
        self != JoinType::Natural
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinType::Plain => "PLAIN",
            JoinType::Natural => "NATURAL",
            JoinType::Left => "LEFT",
            JoinType::Inner => "INNER",
            JoinType::Right => "RIGHT",
            JoinType::LeftOuter => "LEFT_OUTER",
        };
        f.write_str(name)
    }
}

/// Error returned when a string names none of the six join kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized join type keyword: {0:?}")]
pub struct ParseJoinTypeError(pub String);

impl FromStr for JoinType {
    type Err = ParseJoinTypeError;

    /// Case-insensitive; `_`, `-` and runs of whitespace are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
            .filter(|part| !part.is_empty())
            .map(str::to_ascii_uppercase)
            .collect::<Vec<_>>()
            .join("_");

        match normalized.as_str() {
            "PLAIN" | "" => Ok(JoinType::Plain),
            "NATURAL" => Ok(JoinType::Natural),
            "LEFT" => Ok(JoinType::Left),
            "INNER" => Ok(JoinType::Inner),
            "RIGHT" => Ok(JoinType::Right),
            "LEFT_OUTER" => Ok(JoinType::LeftOuter),
            _ => Err(ParseJoinTypeError(s.to_string())),
        }
    }
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: TableRef,
    pub on: Option<Expr>,
}

impl Join {
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        for keyword in self.join_type.keyword_tokens() {
            ts.push(keyword.clone()).space();
        }
        ts.push(Token::Join).space();
        ts.append(&self.table.to_tokens());

        if let Some(on) = &self.on {
            ts.space().push(Token::On).space();
            ts.append(&on.to_tokens_for_dialect(dialect));
        }

        ts
    }
}

// =============================================================================
// Query Builder
// =============================================================================

/// A SELECT query.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "Query has no effect until converted to SQL with to_sql() or to_tokens()"]
pub struct Query {
    pub select: Vec<SelectExpr>,
    pub from: Option<TableRef>,
    pub joins: Vec<Join>,
    pub where_clause: Option<Expr>,
}

impl Query {
    /// Create a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SELECT list.
    pub fn select(mut self, exprs: Vec<impl Into<SelectExpr>>) -> Self {
        self.select = exprs.into_iter().map(|e| e.into()).collect();
        self
    }

    /// Set the FROM table.
    pub fn from(mut self, table: TableRef) -> Self {
        self.from = Some(table);
        self
    }

    /// Add a JOIN. `on` is ignored for NATURAL joins.
    pub fn join(mut self, join_type: JoinType, table: TableRef, on: Option<Expr>) -> Self {
        self.joins.push(Join {
            join_type,
            table,
            on: on.filter(|_| join_type.takes_condition()),
        });
        self
    }

    /// Add a WHERE condition (ANDed with existing conditions).
    pub fn filter(mut self, condition: Expr) -> Self {
        self.where_clause = Some(match self.where_clause {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// Convert to token stream for a specific dialect.
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        // SELECT
        ts.push(Token::Select);

        // Columns
        for (i, select_expr) in self.select.iter().enumerate() {
            if i == 0 {
                ts.newline().indent(1);
            } else {
                ts.comma().newline().indent(1);
            }
            ts.append(&select_expr.to_tokens_for_dialect(dialect));
        }

        // FROM
        if let Some(from) = &self.from {
            ts.newline().push(Token::From).space();
            ts.append(&from.to_tokens());
        }

        // JOINs
        for join in &self.joins {
            ts.newline();
            ts.append(&join.to_tokens_for_dialect(dialect));
        }

        // WHERE
        if let Some(where_clause) = &self.where_clause {
            ts.newline().push(Token::Where).space();
            ts.append(&where_clause.to_tokens_for_dialect(dialect));
        }

        ts
    }

    /// Generate SQL string for a specific dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize(dialect)
    }

    /// Generate single-line SQL for a specific dialect.
    pub fn to_sql_compact(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize_compact(dialect)
    }
}

impl std::fmt::Display for Query {
    /// Formats the query using the default dialect (Generic).
    ///
    /// For dialect-specific SQL, use [`Query::to_sql`] instead.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_sql(Dialect::default()))
    }
}

// =============================================================================
// Tests
// =============================================================================
