//! In-memory schema model.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::ConnectionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryColumn {
    pub name: String,
    pub data_type: String,
    pub length: Option<i64>,
    pub nullable: bool,
    pub default: Option<String>,
    pub collation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTable {
    pub columns: Vec<MemoryColumn>,
    pub primary_key: Option<String>,
    pub indexes: BTreeSet<String>,
    pub unique: BTreeSet<String>,
    pub foreign_keys: BTreeSet<String>,
    /// Columns covered by a full-text index.
    pub fulltext: BTreeSet<String>,
    /// GIN text-search indexes: name to definition as `pg_indexes` renders it.
    pub text_search: BTreeMap<String, String>,
}

impl MemoryTable {
    pub fn column(&self, name: &str) -> Option<&MemoryColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Secondary index, not the primary key.
    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.contains(name)
    }

    /// Is `name` taken by any index, the primary key included?
    pub fn names_index(&self, name: &str) -> bool {
        self.has_index(name) || self.primary_key.as_deref() == Some(name)
    }

    /// Foreign-key constraint; keys and unique constraints are indexes.
    pub fn has_constraint(&self, name: &str) -> bool {
        self.foreign_keys.contains(name)
    }
}

/// Structural state of the database; compared to check that reruns change nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSnapshot {
    pub tables: BTreeMap<String, MemoryTable>,
    pub sequences: BTreeSet<String>,
    pub fulltext_catalogs: BTreeSet<String>,
}

pub(super) struct ServerState {
    pub(super) schema: String,
    pub(super) snapshot: SchemaSnapshot,
    pub(super) fulltext_installed: bool,
    pub(super) refuse_connections: bool,
    pub(super) connects: usize,
    pub(super) statements: Vec<String>,
    pub(super) injected: Vec<(String, ConnectionError)>,
}

impl ServerState {
    pub(super) fn new(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
            snapshot: SchemaSnapshot::default(),
            fulltext_installed: true,
            refuse_connections: false,
            connects: 0,
            statements: Vec::new(),
            injected: Vec::new(),
        }
    }

    pub(super) fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.snapshot.tables.get(name)
    }

    pub(super) fn table_mut(&mut self, name: &str) -> Result<&mut MemoryTable, ConnectionError> {
        self.snapshot
            .tables
            .get_mut(name)
            .ok_or_else(|| ConnectionError::ObjectNotFound(format!("table '{name}'")))
    }

    /// Take the first injected error whose fragment occurs in `sql`.
    pub(super) fn take_injected(&mut self, sql: &str) -> Option<ConnectionError> {
        let lower = sql.to_ascii_lowercase();
        let pos = self
            .injected
            .iter()
            .position(|(fragment, _)| lower.contains(fragment.as_str()))?;
        Some(self.injected.remove(pos).1)
    }
}
