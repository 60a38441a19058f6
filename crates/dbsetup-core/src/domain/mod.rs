//! Domain model: task names, states, outcomes, schema answers, reports, errors.

pub mod column;
pub mod errors;
pub mod ids;
pub mod probe;
pub mod report;
pub mod state;
pub mod task;

pub use column::ColumnInfo;
pub use errors::{
    ConfigError, ConnectionError, EngineError, InspectError, MigrationError, PoolError, TaskError,
};
pub use ids::RunId;
pub use probe::Probe;
pub use report::{RunReport, TaskReport};
pub use state::{Outcome, RunState, TaskStatus};
pub use task::{TaskName, task_names};
