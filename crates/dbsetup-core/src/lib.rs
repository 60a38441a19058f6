//! dbsetup-core
//!
//! Core building blocks for idempotent, dependency-ordered database setup.
//!
//! # Modules
//! - **domain**: task names, states, reports, probe answers, errors
//! - **config**: dialects and the resolved `{resource -> connection}` map
//! - **ports**: `Connection`/`Connector`, `SchemaInspector`, `Clock`
//! - **pool**: per-resource connection pool with scoped acquisition
//! - **dialect**: one `SchemaInspector` per SQL dialect
//! - **task**: the `Task` contract, `TaskContext`, `TaskCatalog`
//! - **resolver**: dependency graph and deterministic run order
//! - **tasks**: reusable create-if-absent tasks
//! - **app**: `EngineBuilder` and `MigrationEngine`
//! - **impls**: in-memory, sqlx and tiberius connectors

pub mod app;
pub mod config;
pub mod dialect;
pub mod domain;
pub mod impls;
pub mod pool;
pub mod ports;
pub mod resolver;
pub mod task;
pub mod tasks;

pub use app::{EngineBuilder, MigrationEngine};
pub use config::{Dialect, ResourceConfig, ResourceMap};
pub use domain::{
    ConfigError, EngineError, MigrationError, Outcome, RunReport, RunState, TaskName, TaskReport,
    TaskStatus,
};
pub use task::{Task, TaskCatalog, TaskContext};
