//! EngineBuilder - wiring and fail-fast validation.
//!
//! `build()` checks everything that can be checked without touching the
//! database: resource configuration, expected task names and the task order
//! (unknown dependencies, cycles).

use std::sync::Arc;

use super::engine::MigrationEngine;
use crate::config::ResourceMap;
use crate::domain::{ConfigError, TaskName};
use crate::pool::ConnectionPool;
use crate::ports::{Clock, Connector, SystemClock};
use crate::resolver;
use crate::task::{Task, TaskCatalog};

/// # Example
/// ```ignore
/// let mut engine = EngineBuilder::new(resources, Arc::new(SqlxConnector::new()))
///     .register(CreateTable::new("TablesCreateMShop", "mshop_index_text", sql))?
///     .expect_tasks(&["TablesCreateMShop"])
///     .build()?;
/// let report = engine.run().await?;
/// ```
pub struct EngineBuilder {
    resources: ResourceMap,
    connector: Arc<dyn Connector>,
    catalog: TaskCatalog,
    clock: Arc<dyn Clock>,
    expected_tasks: Option<Vec<TaskName>>,
}

impl EngineBuilder {
    pub fn new(resources: ResourceMap, connector: Arc<dyn Connector>) -> Self {
        Self {
            resources,
            connector,
            catalog: TaskCatalog::new(),
            clock: Arc::new(SystemClock),
            expected_tasks: None,
        }
    }

    /// Register a task; registration order breaks ordering ties.
    pub fn register(mut self, task: impl Task + 'static) -> Result<Self, ConfigError> {
        self.catalog.register(task)?;
        Ok(self)
    }

    pub fn register_arc(mut self, task: Arc<dyn Task>) -> Result<Self, ConfigError> {
        self.catalog.register_arc(task)?;
        Ok(self)
    }

    /// Register a whole catalog, keeping its order.
    pub fn catalog(mut self, catalog: TaskCatalog) -> Result<Self, ConfigError> {
        for task in catalog.iter() {
            self.catalog.register_arc(Arc::clone(task))?;
        }
        Ok(self)
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Task names that must be registered for `build()` to succeed.
    pub fn expect_tasks(mut self, names: &[&str]) -> Self {
        self.expected_tasks = Some(names.iter().copied().map(TaskName::from).collect());
        self
    }

    pub fn build(self) -> Result<MigrationEngine, ConfigError> {
        self.resources.validate()?;

        if let Some(expected) = &self.expected_tasks {
            let missing: Vec<String> = expected
                .iter()
                .filter(|name| !self.catalog.contains(name))
                .map(ToString::to_string)
                .collect();
            if !missing.is_empty() {
                return Err(ConfigError::MissingTasks(missing));
            }
        }

        resolver::resolve(&self.catalog)?;

        let pool = Arc::new(ConnectionPool::new(self.resources, self.connector));
        Ok(MigrationEngine::new(self.catalog, pool, self.clock))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::config::{Dialect, ResourceConfig};
    use crate::domain::{Outcome, TaskError, task_names};
    use crate::impls::{MemoryConnector, MemoryServer};
    use crate::ports::FixedClock;
    use crate::task::TaskContext;

    struct Noop(&'static str, &'static [&'static str]);

    #[async_trait]
    impl Task for Noop {
        fn name(&self) -> TaskName {
            self.0.into()
        }

        fn pre_dependencies(&self) -> Vec<TaskName> {
            task_names(self.1)
        }

        async fn migrate(&self, _ctx: &TaskContext) -> Result<Outcome, TaskError> {
            Ok(Outcome::Ok)
        }
    }

    fn builder() -> EngineBuilder {
        let resources = ResourceMap::new().with("db", ResourceConfig::new(Dialect::Pgsql, "shop"));
        EngineBuilder::new(resources, Arc::new(MemoryConnector::new(MemoryServer::new("public"))))
    }

    #[test]
    fn build_success() {
        let engine = builder()
            .register(Noop("TablesCreateMShop", &[]))
            .unwrap()
            .register(Noop("IndexCreateFulltext", &["TablesCreateMShop"]))
            .unwrap()
            .expect_tasks(&["TablesCreateMShop"])
            .build()
            .unwrap();
        assert_eq!(
            engine.plan().unwrap(),
            task_names(&["TablesCreateMShop", "IndexCreateFulltext"])
        );
    }

    #[test]
    fn build_missing_tasks() {
        let err = builder()
            .register(Noop("a", &[]))
            .unwrap()
            .expect_tasks(&["a", "b"])
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::MissingTasks(missing) if missing == vec!["b".to_string()]));
    }

    #[test]
    fn build_rejects_cycle() {
        let err = builder()
            .register(Noop("a", &["b"]))
            .unwrap()
            .register(Noop("b", &["a"]))
            .unwrap()
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::CyclicDependency { .. }));
    }

    #[test]
    fn build_rejects_invalid_resources() {
        let resources = ResourceMap::new().with("db", ResourceConfig::new(Dialect::Mysql, "shop").with_limit(0));
        let err = EngineBuilder::new(resources, Arc::new(MemoryConnector::new(MemoryServer::new("shop"))))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::InvalidResource { .. }));
    }

    #[test]
    fn duplicate_registration_fails() {
        let res = builder().register(Noop("a", &[])).unwrap().register(Noop("a", &[]));
        assert!(matches!(res, Err(ConfigError::DuplicateTask(_))));
    }

    #[tokio::test]
    async fn injected_clock_stamps_report() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let mut engine = builder()
            .register(Noop("a", &[]))
            .unwrap()
            .clock(Arc::new(FixedClock::new(at)))
            .build()
            .unwrap();
        let report = engine.run().await.unwrap();
        assert_eq!(report.started_at, at);
        assert_eq!(report.finished_at, at);
        assert_eq!(report.run_id.as_ulid().timestamp_ms(), at.timestamp_millis() as u64);
    }
}
