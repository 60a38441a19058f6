//! Operator-facing run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RunId;
use super::state::TaskStatus;
use super::task::TaskName;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub name: TaskName,
    pub status: TaskStatus,
    /// Progress messages of a finished task, or the error of a failed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TaskReport {
    pub fn pending(name: TaskName) -> Self {
        Self {
            name,
            status: TaskStatus::Pending,
            message: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_task: Option<TaskName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per task in execution order, including tasks never attempted.
    pub tasks: Vec<TaskReport>,
}

impl RunReport {
    pub fn task(&self, name: &str) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| t.name.as_str() == name)
    }

    pub fn status_of(&self, name: &str) -> Option<TaskStatus> {
        self.task(name).map(|t| t.status)
    }

    /// Number of tasks that reported the given status.
    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }
}
