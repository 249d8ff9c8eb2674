//! The entity contract consumed by join graphs and views.
//!
//! An entity maps a type onto a backing table: table name, ordered column
//! list, primary-key subset, per-column pseudo-type and foreign-key lookups.
//! Join graphs are built from entities, and a [`View`](crate::view::View)
//! is itself an entity, so everything downstream handles both uniformly.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::sql::dialect::Dialect;

/// Shared handle to an entity.
pub type EntityRef = Arc<dyn Entity>;

/// Shared handle to a database connection owned by the caller.
pub type DbHandle = Arc<dyn Database>;

// ============================================================================
// Pseudo-types
// ============================================================================

/// Backend-neutral column type, resolved to a concrete SQL type by whatever
/// generates DDL for a given database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PseudoType {
    Integer,
    Float,
    Text,
    Boolean,
    Date,
    Timestamp,
    Binary,
}

impl fmt::Display for PseudoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PseudoType::Integer => "integer",
            PseudoType::Float => "float",
            PseudoType::Text => "text",
            PseudoType::Boolean => "boolean",
            PseudoType::Date => "date",
            PseudoType::Timestamp => "timestamp",
            PseudoType::Binary => "binary",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Entity contract
// ============================================================================

/// Column a foreign key points at.
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    /// The referenced entity, when it is registered.
    pub entity: Option<EntityRef>,
}

/// Schema metadata for a table-backed type.
pub trait Entity: fmt::Debug + Send + Sync {
    /// Backing table (or view) name.
    fn table(&self) -> &str;

    /// Full, ordered column list.
    fn columns(&self) -> &[String];

    /// Primary-key columns, a subset of [`columns`](Entity::columns).
    fn primary_key(&self) -> &[String];

    /// Pseudo-type of a column, `None` when the column does not exist.
    fn pseudo_type(&self, column: &str) -> Option<PseudoType>;

    /// Foreign key declared on a column.
    fn foreign_key(&self, _column: &str) -> Option<ForeignKey> {
        None
    }

    fn has_column(&self, column: &str) -> bool {
        self.columns().iter().any(|c| c == column)
    }
}

/// Check that an entity satisfies the contract graphs rely on.
pub fn validate_entity(entity: &dyn Entity) -> ConfigResult<()> {
    let invalid = |reason: &str| ConfigError::InvalidEntity {
        entity: entity.table().to_string(),
        reason: reason.to_string(),
    };

    if entity.table().trim().is_empty() {
        return Err(invalid("table name is empty"));
    }
    if entity.columns().is_empty() {
        return Err(invalid("no columns"));
    }
    if let Some(missing) = entity
        .primary_key()
        .iter()
        .find(|key| !entity.has_column(key))
    {
        return Err(invalid(&format!("primary key column {missing:?} is not a column")));
    }
    Ok(())
}

// ============================================================================
// Table-backed entity
// ============================================================================

/// Plain metadata for a base table.
///
/// ```ignore
/// let parts = TableEntity::new("parts")
///     .column("id", PseudoType::Integer)
///     .column("detail", PseudoType::Text)
///     .primary_key(["id"])
///     .into_ref()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TableEntity {
    table: String,
    columns: Vec<String>,
    types: HashMap<String, PseudoType>,
    primary_key: Vec<String>,
    foreign_keys: HashMap<String, ForeignKey>,
}

impl TableEntity {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Append a column. Re-declaring a column only updates its type.
    pub fn column(mut self, name: impl Into<String>, ty: PseudoType) -> Self {
        let name = name.into();
        if !self.types.contains_key(&name) {
            self.columns.push(name.clone());
        }
        self.types.insert(name, ty);
        self
    }

    pub fn primary_key(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn foreign_key(mut self, column: impl Into<String>, target: ForeignKey) -> Self {
        self.foreign_keys.insert(column.into(), target);
        self
    }

    /// Validate and wrap in a shared handle.
    pub fn into_ref(self) -> ConfigResult<EntityRef> {
        validate_entity(&self)?;
        Ok(Arc::new(self))
    }
}

impl Entity for TableEntity {
    fn table(&self) -> &str {
        &self.table
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    fn pseudo_type(&self, column: &str) -> Option<PseudoType> {
        self.types.get(column).copied()
    }

    fn foreign_key(&self, column: &str) -> Option<ForeignKey> {
        self.foreign_keys.get(column).cloned()
    }
}

// ============================================================================
// Rows
// ============================================================================

/// A single column value read from, or destined for, a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

/// The caller-owned database a record was loaded through.
///
/// Only the dialect is needed here; executing statements belongs to the
/// caller.
pub trait Database: fmt::Debug + Send + Sync {
    fn dialect(&self) -> Dialect;
}

/// An instance of an entity: named field values plus the database handle
/// they came from.
#[derive(Debug, Clone)]
pub struct Record {
    entity: EntityRef,
    values: BTreeMap<String, Value>,
    db: Option<DbHandle>,
}

impl Record {
    pub fn new(
        entity: EntityRef,
        fields: impl IntoIterator<Item = (impl Into<String>, Value)>,
        db: Option<DbHandle>,
    ) -> Self {
        Self {
            entity,
            values: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            db,
        }
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// Value of a column, `None` when the record was not seeded with it.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn db(&self) -> Option<&DbHandle> {
        self.db.as_ref()
    }
}
