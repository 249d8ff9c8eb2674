//! # relmap
//!
//! Join-graph query compiler for a relational data mapper.
//!
//! ## Architecture
//!
//! A declarative tree of table relationships compiles to one SQL statement
//! and can be exposed as an entity of its own:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          Entities (table, columns, primary key)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [graph builder + alias allocator]
//! ┌─────────────────────────────────────────────────────────┐
//! │     JoinGraph (root node + declaration-ordered refs)     │
//! └─────────────────────────────────────────────────────────┘
//!              │                               │
//!              ▼ [query compiler]              ▼ [primary key resolver]
//! ┌───────────────────────────┐   ┌──────────────────────────┐
//! │   SELECT … FROM … JOIN …  │   │   composite key columns  │
//! └───────────────────────────┘   └──────────────────────────┘
//!              │                               │
//!              └───────────────┬───────────────┘
//!                              ▼ [view]
//! ┌─────────────────────────────────────────────────────────┐
//! │     View (an Entity: columns, key, relations, DDL)       │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod alias;
pub mod compiler;
pub mod config;
pub mod entity;
pub mod error;
pub mod graph;
pub mod primary_key;
pub mod restriction;
pub mod sql;
pub mod view;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::alias::{AliasAllocator, AliasRole};
    pub use crate::compiler::{Projection, QueryCompiler};
    pub use crate::config::Settings;
    pub use crate::entity::{
        Database, DbHandle, Entity, EntityRef, ForeignKey, PseudoType, Record, TableEntity, Value,
    };
    pub use crate::error::{CompileError, ConfigError, ViewError};
    pub use crate::graph::{JoinGraph, JoinGraphBuilder, JoinSpec, JoinType};
    pub use crate::primary_key::{PrimaryKey, PrimaryKeyResolver};
    pub use crate::restriction::{NotEqualsMode, Restriction, RestrictionOp};
    pub use crate::sql::dialect::{Dialect, SqlDialect};
    pub use crate::view::{RelationAccessor, View};
}

// Also export at crate root for convenience
pub use compiler::QueryCompiler;
pub use graph::{JoinGraph, JoinGraphBuilder, JoinSpec};
pub use sql::dialect::Dialect;
pub use view::View;
