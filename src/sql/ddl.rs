//! DDL (Data Definition Language) support for publishing views.
//!
//! A compiled join graph becomes a database object through
//! `CREATE VIEW <name> AS <select>`; the matching `DROP VIEW` retires it.
//!
//! # Examples
//!
//! ```ignore
//! use relmap::sql::ddl::CreateView;
//! use relmap::sql::dialect::Dialect;
//!
//! let ddl = CreateView::new("widget_parts", query).or_replace();
//! println!("{}", ddl.to_sql(Dialect::Postgres));
//! ```

use super::dialect::{Dialect, SqlDialect};
use super::query::Query;
use super::token::{Token, TokenStream};

// ============================================================================
// CREATE VIEW
// ============================================================================

/// CREATE VIEW statement.
///
/// # Example
///
/// ```ignore
/// let view = CreateView::new("reporting.widget_parts", query).or_replace();
///
/// // PostgreSQL: CREATE OR REPLACE VIEW "reporting"."widget_parts" AS SELECT ...
/// ```
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct CreateView {
    pub or_replace: bool,
    pub schema: Option<String>,
    pub name: String,
    pub as_query: Box<Query>,
}

impl CreateView {
    /// Create a new CREATE VIEW statement. A `schema.view` name is split on
    /// the dot.
    pub fn new(name: &str, query: Query) -> Self {
        let (schema, name) = split_name(name);
        Self {
            or_replace: false,
            schema,
            name,
            as_query: Box::new(query),
        }
    }

    /// Add OR REPLACE clause.
    ///
    /// Dropped for dialects without CREATE OR REPLACE VIEW (SQLite, T-SQL);
    /// issue a `DropView` first there.
    pub fn or_replace(mut self) -> Self {
        self.or_replace = true;
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Create);

        if self.or_replace && dialect.supports_create_or_replace_view() {
            ts.space().push(Token::Or).space().push(Token::Replace);
        }

        ts.space().push(Token::View).space();
        ts.push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.name.clone(),
        });

        ts.space()
            .push(Token::As)
            .newline()
            .append(&self.as_query.to_tokens_for_dialect(dialect));

        ts
    }
}

// ============================================================================
// DROP VIEW
// ============================================================================

/// DROP VIEW statement.
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct DropView {
    pub if_exists: bool,
    pub schema: Option<String>,
    pub name: String,
}

impl DropView {
    /// Create a new DROP VIEW statement.
    pub fn new(name: &str) -> Self {
        let (schema, name) = split_name(name);
        Self {
            if_exists: false,
            schema,
            name,
        }
    }

    /// Add IF EXISTS clause.
    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Drop).space().push(Token::View);

        if self.if_exists && dialect.supports_if_exists() {
            ts.space().push(Token::If).space().push(Token::Exists);
        }

        ts.space().push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.name.clone(),
        });

        ts
    }
}

fn split_name(name: &str) -> (Option<String>, String) {
    match name.split_once('.') {
        Some((schema, name)) => (Some(schema.to_string()), name.to_string()),
        None => (None, name.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
