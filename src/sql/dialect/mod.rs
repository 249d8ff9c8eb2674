//! SQL Dialect definitions and formatting rules.
//!
//! `SqlDialect` is the seam the token serializer and the compiler render
//! through; the `Dialect` enum implements it for every supported backend:
//!
//! - Identifier quoting: bare (Generic), `"` (PG/SQLite), `` ` `` (MySQL), `[]` (T-SQL)
//! - String concatenation: `||` vs `+` vs CONCAT()
//! - Which join keywords exist
//! - CREATE OR REPLACE VIEW support
//!
//! # Usage
//!
//! ```ignore
//! use relmap::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! let quoted = dialect.quote_identifier("user");  // "user"
//! ```
//!
//! | Feature | Generic | PostgreSQL | MySQL | SQLite | SQL Server |
//! |---------|---------|-----------|-------|--------|------------|
//! | NATURAL JOIN | ✓ | ✓ | ✓ | ✓ | ❌ |
//! | RIGHT JOIN | ✓ | ✓ | ✓ | 3.39+ | ✓ |
//! | CREATE OR REPLACE VIEW | ✓ | ✓ | ✓ | ❌ | ❌ |
//! | DROP VIEW IF EXISTS | ✓ | ✓ | ✓ | ✓ | 2016+ |

pub mod helpers;

use serde::{Deserialize, Serialize};

/// How SQL constructs are rendered for one backend.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// String concatenation operator.
    fn concat_operator(&self) -> &'static str {
        "||"
    }

    /// False where `||` means something other than concatenation.
    fn supports_concat_operator(&self) -> bool {
        true
    }

    fn supports_natural_join(&self) -> bool {
        true
    }

    fn supports_right_join(&self) -> bool {
        true
    }

    fn supports_create_or_replace_view(&self) -> bool {
        true
    }

    /// `IF EXISTS` on DROP statements.
    fn supports_if_exists(&self) -> bool {
        true
    }
}

/// Supported SQL dialects.
///
/// `Generic` leaves plain identifiers bare and is the default; the others
/// always quote: `"` for Postgres and SQLite, backticks for MySQL and
/// brackets for T-SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Generic,
    Postgres,
    MySql,
    Sqlite,
    TSql,
}

impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        match self {
            Dialect::Generic => "generic",
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
            Dialect::TSql => "tsql",
        }
    }

    fn quote_identifier(&self, ident: &str) -> String {
        match self {
            Dialect::Generic => helpers::quote_if_needed(ident),
            Dialect::Postgres | Dialect::Sqlite => helpers::quote_double(ident),
            Dialect::MySql => helpers::quote_backtick(ident),
            Dialect::TSql => helpers::quote_bracket(ident),
        }
    }

    fn quote_string(&self, s: &str) -> String {
        match self {
            // N'...' keeps non-ASCII text intact on nvarchar columns
            Dialect::TSql if !s.is_ascii() => helpers::quote_string_unicode(s),
            _ => helpers::quote_string_single(s),
        }
    }

    fn concat_operator(&self) -> &'static str {
        match self {
            Dialect::TSql => "+",
            _ => "||",
        }
    }

    fn supports_concat_operator(&self) -> bool {
        // MySQL reads || as logical OR unless PIPES_AS_CONCAT is set
        !matches!(self, Dialect::MySql)
    }

    fn supports_natural_join(&self) -> bool {
        !matches!(self, Dialect::TSql)
    }

    fn supports_create_or_replace_view(&self) -> bool {
        !matches!(self, Dialect::Sqlite | Dialect::TSql)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
