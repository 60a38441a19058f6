//! In-process database server for tests and dry runs.
//!
//! `MemoryServer` keeps a structural model of one schema: tables, columns,
//! indexes, constraints, sequences and full-text indexes. Connections opened
//! through `MemoryConnector` apply DDL to that model and answer the catalog
//! queries of every dialect inspector, so the same task catalog can be run
//! against a MySQL, PostgreSQL or SQL Server resource without a live server.

mod catalog;
mod ddl;
mod sql;
mod state;

pub use state::{MemoryColumn, MemoryTable, SchemaSnapshot};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::config::ResourceConfig;
use crate::domain::ConnectionError;
use crate::ports::{Connection, Connector, Row, Value};
use state::ServerState;

/// Shared handle to an in-memory schema.
#[derive(Clone)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl MemoryServer {
    /// Empty server whose catalog reports `schema` as the current schema.
    pub fn new(schema: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState::new(schema))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn schema(&self) -> String {
        self.lock().schema.clone()
    }

    /// Physical connections opened so far.
    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    /// Every statement passed to `execute`, in order.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Executed statements that changed the schema.
    pub fn ddl_statements(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|s| is_ddl(s))
            .collect()
    }

    pub fn clear_statements(&self) {
        self.lock().statements.clear();
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.lock().refuse_connections = refuse;
    }

    /// Toggle the SQL Server Full-Text Search feature (installed by default).
    pub fn set_fulltext_installed(&self, installed: bool) {
        self.lock().fulltext_installed = installed;
    }

    /// Fail the next statement or query containing `fragment` (case-insensitive).
    pub fn fail_on(&self, fragment: &str, error: ConnectionError) {
        self.lock()
            .injected
            .push((fragment.to_ascii_lowercase(), error));
    }

    /// Apply DDL directly, bypassing connections and statement logging.
    pub fn apply(&self, sql: &str) -> Result<(), ConnectionError> {
        ddl::apply(&mut self.lock(), sql).map(|_| ())
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.lock().table(table).is_some()
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.lock()
            .table(table)
            .is_some_and(|t| t.column(column).is_some())
    }

    pub fn has_index(&self, table: &str, index: &str) -> bool {
        self.lock().table(table).is_some_and(|t| t.has_index(index))
    }

    pub fn has_constraint(&self, table: &str, constraint: &str) -> bool {
        self.lock()
            .table(table)
            .is_some_and(|t| t.has_constraint(constraint))
    }

    pub fn has_fulltext(&self, table: &str, column: &str) -> bool {
        self.lock()
            .table(table)
            .is_some_and(|t| t.fulltext.contains(column))
    }

    pub fn has_sequence(&self, sequence: &str) -> bool {
        self.lock().snapshot.sequences.contains(sequence)
    }

    pub fn has_fulltext_catalog(&self, name: &str) -> bool {
        self.lock().snapshot.fulltext_catalogs.contains(name)
    }

    pub fn snapshot(&self) -> SchemaSnapshot {
        self.lock().snapshot.clone()
    }
}

fn is_ddl(sql: &str) -> bool {
    let head = sql.trim_start().to_ascii_uppercase();
    head.starts_with("CREATE") || head.starts_with("ALTER") || head.starts_with("DROP")
}

/// `Connector` handing out connections to one `MemoryServer`.
#[derive(Clone)]
pub struct MemoryConnector {
    server: MemoryServer,
}

impl MemoryConnector {
    pub fn new(server: MemoryServer) -> Self {
        Self { server }
    }

    pub fn server(&self) -> &MemoryServer {
        &self.server
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        resource: &str,
        config: &ResourceConfig,
    ) -> Result<Box<dyn Connection>, ConnectionError> {
        let mut state = self.server.lock();
        if state.refuse_connections {
            return Err(ConnectionError::Connect(format!(
                "{} server for '{resource}' refused the connection",
                config.adapter
            )));
        }
        state.connects += 1;
        Ok(Box::new(MemoryConnection {
            server: self.server.clone(),
            broken: false,
        }))
    }
}

pub struct MemoryConnection {
    server: MemoryServer,
    broken: bool,
}

impl MemoryConnection {
    fn injected(&mut self, state: &mut ServerState, sql: &str) -> Result<(), ConnectionError> {
        match state.take_injected(sql) {
            Some(err) => {
                self.broken |= err.is_connection_lost();
                Err(err)
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ConnectionError> {
        let server = self.server.clone();
        let mut state = server.lock();
        self.injected(&mut state, sql)?;
        catalog::query(&state, sql, params)
    }

    async fn execute(&mut self, sql: &str, _params: &[Value]) -> Result<u64, ConnectionError> {
        let server = self.server.clone();
        let mut state = server.lock();
        state.statements.push(sql.to_string());
        self.injected(&mut state, sql)?;
        ddl::apply(&mut state, sql)
    }

    fn is_broken(&self) -> bool {
        self.broken
    }
}
