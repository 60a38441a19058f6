use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique name of a migration task; also the node key of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskName(String);

impl TaskName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for TaskName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds an ordered list of task names from string literals.
///
/// ```ignore
/// fn pre_dependencies(&self) -> Vec<TaskName> {
///     task_names(&["TablesCreateMShop"])
/// }
/// ```
pub fn task_names(names: &[&str]) -> Vec<TaskName> {
    names.iter().map(|n| TaskName::new(*n)).collect()
}
