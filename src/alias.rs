//! Table alias allocation.
//!
//! Every node of every join graph gets an alias of the form
//! `<prefix><n>_<table>`, where `n` comes from a single atomic counter owned
//! by the allocator. Two calls never return the same alias, whatever the
//! table name and whichever thread asks.

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use tracing::trace;

use crate::config::AliasSettings;

static SHARED: Lazy<AliasAllocator> = Lazy::new(AliasAllocator::new);

/// Which position in the graph an alias is for. Only affects the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasRole {
    Root,
    Joined,
}

/// Issues unique table aliases.
#[derive(Debug)]
pub struct AliasAllocator {
    counter: AtomicU64,
    root_prefix: String,
    join_prefix: String,
}

impl AliasAllocator {
    /// A fresh allocator with its own counter, starting at 1.
    pub fn new() -> Self {
        Self::with_prefixes("t", "j")
    }

    pub fn with_prefixes(root_prefix: impl Into<String>, join_prefix: impl Into<String>) -> Self {
        Self {
            counter: AtomicU64::new(0),
            root_prefix: root_prefix.into(),
            join_prefix: join_prefix.into(),
        }
    }

    pub fn from_settings(settings: &AliasSettings) -> Self {
        Self::with_prefixes(settings.root_prefix.clone(), settings.join_prefix.clone())
    }

    /// The process-wide allocator.
    ///
    /// Aliases drawn from it are unique for the life of the process, across
    /// unrelated graphs.
    pub fn shared() -> &'static AliasAllocator {
        &SHARED
    }

    /// Allocate the next alias for `table`.
    pub fn next_alias(&self, table: &str, role: AliasRole) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let prefix = match role {
            AliasRole::Root => &self.root_prefix,
            AliasRole::Joined => &self.join_prefix,
        };
        let alias = format!("{prefix}{n}_{}", sanitize(table));
        trace!(table, alias = %alias, "allocated table alias");
        alias
    }

    /// Number of aliases issued so far.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for AliasAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep only identifier-safe characters; `schema.table` becomes `schema_table`.
fn sanitize(table: &str) -> String {
    table
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
