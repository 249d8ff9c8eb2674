//! SQL generation module.
//!
//! A small, type-safe SQL builder that emits the statements a join graph
//! compiles to, in several dialects:
//!
//! - [`query`] - SELECT query builder with the six join kinds
//! - [`expr`] - Expression AST for join conditions
//! - [`ddl`] - CREATE VIEW / DROP VIEW
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations
//! - [`validate`] - Round-trip check through `sqlparser`

pub mod ddl;
pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;
pub mod validate;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use expr::{col, lit_str, table_col, BinaryOperator, Expr, ExprExt};
pub use query::{Join, JoinType, ParseJoinTypeError, Query, SelectExpr, TableRef};
pub use token::{Token, TokenStream};

pub use ddl::{CreateView, DropView};
