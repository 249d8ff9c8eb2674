//! Error types for join-graph construction, compilation and view access.
//!
//! Every failure here is fatal: nothing at this layer performs I/O, so there
//! is nothing to retry.

use thiserror::Error;

use crate::sql::dialect::Dialect;
use crate::sql::query::JoinType;

/// Construction-time configuration errors.
///
/// Raised while an entity is validated or a join graph is assembled; graph
/// construction stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid entity {entity:?}: {reason}")]
    InvalidEntity { entity: String, reason: String },

    #[error(transparent)]
    UnknownJoinType(#[from] crate::sql::query::ParseJoinTypeError),

    #[error("unknown qualifier {qualifier:?} in column {column:?}")]
    UnknownQualifier { qualifier: String, column: String },

    #[error("unknown column {column:?} on {table}")]
    UnknownColumn { table: String, column: String },

    #[error("column {column:?} is ambiguous between {candidates:?}")]
    AmbiguousColumn {
        column: String,
        candidates: Vec<String>,
    },

    #[error("restriction {local} = {remote} resolves both sides to {alias}")]
    SelfRestriction {
        local: String,
        remote: String,
        alias: String,
    },

    #[error("duplicate relation name: {0}")]
    DuplicateRelation(String),

    #[error("{join_type} reference to {table} declares no restrictions")]
    MissingRestrictions { join_type: JoinType, table: String },

    #[error("parent node is not part of this join graph")]
    UnknownParent,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while lowering a join graph to SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("join graph rooted at {0} projects no columns")]
    EmptyProjection(String),

    #[error("{dialect} cannot express {join_type} JOIN (to {table})")]
    UnsupportedJoin {
        dialect: Dialect,
        join_type: JoinType,
        table: String,
    },
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Access-time errors raised by a [`View`](crate::view::View).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("view {view:?} has no relation named {relation:?}")]
    UnknownRelation { view: String, relation: String },

    #[error("row has no value for {column:?}, needed to load relation {relation:?}")]
    MissingValue { relation: String, column: String },
}

pub type ViewResult<T> = Result<T, ViewError>;
