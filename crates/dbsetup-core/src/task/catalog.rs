//! TaskCatalog - ordered registry of tasks.

use std::collections::HashMap;
use std::sync::Arc;

use super::Task;
use crate::domain::{ConfigError, TaskName};

/// Registered tasks in registration order.
///
/// Registration order is part of the reproducibility contract: the resolver
/// uses it to break ties between tasks with no ordering constraint.
#[derive(Default, Clone)]
pub struct TaskCatalog {
    tasks: Vec<Arc<dyn Task>>,
    index: HashMap<TaskName, usize>,
}

impl TaskCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: impl Task + 'static) -> Result<(), ConfigError> {
        self.register_arc(Arc::new(task))
    }

    pub fn register_arc(&mut self, task: Arc<dyn Task>) -> Result<(), ConfigError> {
        let name = task.name();
        if self.index.contains_key(&name) {
            return Err(ConfigError::DuplicateTask(name));
        }
        self.index.insert(name, self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    pub fn get(&self, name: &TaskName) -> Option<Arc<dyn Task>> {
        self.index.get(name).map(|&pos| Arc::clone(&self.tasks[pos]))
    }

    pub fn contains(&self, name: &TaskName) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> Vec<TaskName> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Task>> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
