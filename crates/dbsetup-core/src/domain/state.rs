//! State - task and run lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a task inside one migration run.
///
/// Transitions:
/// - Pending -> Running -> Ok
/// - Pending -> Running -> Done
/// - Pending -> Running -> Failed
///
/// A task that is never attempted (the run aborted earlier) stays Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    /// Nothing to do, the structure already exists.
    Ok,
    /// The change was applied.
    Done,
    Failed,
}

impl TaskStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Ok | TaskStatus::Done | TaskStatus::Failed)
    }

    /// Operator-facing label, matching the historic setup output.
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Ok => "OK",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a successful `migrate()` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The target structure was already present; no DDL was issued.
    Ok,
    /// The structure was absent and has been created.
    Done,
}

impl From<Outcome> for TaskStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Ok => TaskStatus::Ok,
            Outcome::Done => TaskStatus::Done,
        }
    }
}

/// Lifecycle of a whole migration run.
///
/// NotStarted -> Running -> Completed | Aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Aborted,
}

impl RunState {
    pub fn is_finished(self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted)
    }
}
