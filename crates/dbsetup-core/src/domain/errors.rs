//! Errors - error taxonomy of the setup engine.
//!
//! - `ConfigError`: fatal, surfaced before any task runs.
//! - `PoolError::Exhausted`: retryable.
//! - `MigrationError`: a task failed; the run is aborted.
//! - `InspectError`: schema state did not match a task's expectations.

use thiserror::Error;

use super::task::TaskName;

fn join_names(names: &[TaskName]) -> String {
    names
        .iter()
        .map(TaskName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Problems in the task catalog or the resource configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cyclic task dependency: {}", join_names(.members))]
    CyclicDependency { members: Vec<TaskName> },

    #[error("task '{task}' depends on unknown task '{missing}'")]
    UnknownDependency { task: TaskName, missing: TaskName },

    #[error("task '{0}' is registered more than once")]
    DuplicateTask(TaskName),

    #[error("missing tasks: {0:?}. These tasks were expected but not registered.")]
    MissingTasks(Vec<String>),

    #[error("invalid resource '{resource}': {reason}")]
    InvalidResource { resource: String, reason: String },

    #[error("unknown database adapter '{0}'")]
    UnknownAdapter(String),

    #[error("resource file parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a live database connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("connect failed: {0}")]
    Connect(String),

    /// The database reported that the referenced object does not exist.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl ConnectionError {
    pub fn is_object_not_found(&self) -> bool {
        matches!(self, ConnectionError::ObjectNotFound(_))
    }

    /// The session is gone; the connection must not be reused.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, ConnectionError::Connect(_))
    }
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("connection pool for '{resource}' exhausted (limit {limit})")]
    Exhausted { resource: String, limit: usize },

    #[error("unknown resource '{0}'")]
    UnknownResource(String),

    #[error("connection pool for '{0}' is closed")]
    Closed(String),

    #[error("cannot connect to '{resource}': {source}")]
    Connect {
        resource: String,
        #[source]
        source: ConnectionError,
    },
}

impl PoolError {
    /// Callers may back off and acquire again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PoolError::Exhausted { .. })
    }
}

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("unknown column \"{column}\" in table \"{table}\"")]
    UnknownColumn { table: String, column: String },

    #[error("cannot determine whether {object} exists: {reason}")]
    ProbeUnknown { object: String, reason: String },

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Failure returned from a task's `migrate()`.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Inspect(#[from] InspectError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("no value in column \"{column}\" for query: {sql}")]
    NoValue { sql: String, column: String },

    #[error("{0}")]
    Other(String),
}

/// A task failed; carries the task name for the operator.
#[derive(Debug, Error)]
#[error("task '{task}' failed: {cause}")]
pub struct MigrationError {
    pub task: TaskName,
    #[source]
    pub cause: TaskError,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}
