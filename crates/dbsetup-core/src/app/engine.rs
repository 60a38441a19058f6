//! MigrationEngine - runs the resolved task order once.
//!
//! Per run: `NotStarted -> Running -> Completed | Aborted`.
//! Per task: `Pending -> Running -> OK | done | failed`.
//!
//! Tasks run strictly one after another in resolved order. The first failure
//! aborts the run; the tasks after it are never invoked and stay `Pending`.
//! Nothing is persisted: every run starts at `NotStarted` and each task
//! decides from the live schema whether work remains.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use ulid::Ulid;

use crate::domain::{
    ConfigError, EngineError, MigrationError, RunId, RunReport, RunState, TaskName, TaskReport,
    TaskStatus,
};
use crate::pool::ConnectionPool;
use crate::ports::Clock;
use crate::resolver;
use crate::task::{TaskCatalog, TaskContext};

pub struct MigrationEngine {
    catalog: TaskCatalog,
    pool: Arc<ConnectionPool>,
    clock: Arc<dyn Clock>,
    state: RunState,
    failure: Option<MigrationError>,
}

impl MigrationEngine {
    pub(crate) fn new(catalog: TaskCatalog, pool: Arc<ConnectionPool>, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog,
            pool,
            clock,
            state: RunState::NotStarted,
            failure: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Resolved run order, without running anything.
    pub fn plan(&self) -> Result<Vec<TaskName>, ConfigError> {
        resolver::resolve(&self.catalog)
    }

    /// The failure that aborted the last run, if any.
    pub fn take_failure(&mut self) -> Option<MigrationError> {
        self.failure.take()
    }

    fn next_run_id(&self) -> RunId {
        let ms = self.clock.now().timestamp_millis().max(0) as u64;
        RunId::from_ulid(Ulid::from_parts(ms, rand::random()))
    }

    /// Run every task in resolved order.
    ///
    /// Configuration errors (cycles, unknown dependencies) are returned before
    /// any task runs. A task failure is not an `Err`: it aborts the run and is
    /// reported in the returned `RunReport` and through `take_failure()`.
    pub async fn run(&mut self) -> Result<RunReport, EngineError> {
        self.state = RunState::NotStarted;
        self.failure = None;

        let order = self.plan()?;
        let run_id = self.next_run_id();
        let started_at = self.clock.now();
        let mut reports: Vec<TaskReport> = order.iter().cloned().map(TaskReport::pending).collect();

        self.state = RunState::Running;
        info!(run_id = %run_id, tasks = order.len(), "migration started");

        for (report, name) in reports.iter_mut().zip(&order) {
            let Some(task) = self.catalog.get(name) else {
                // resolve() only returns registered names
                continue;
            };

            report.status = TaskStatus::Running;
            debug!(run_id = %run_id, task = %name, "task running");

            let ctx = TaskContext::new(Arc::clone(&self.pool), name.clone());
            match task.migrate(&ctx).await {
                Ok(outcome) => {
                    report.status = outcome.into();
                    let messages = ctx.messages();
                    report.message = (!messages.is_empty()).then(|| messages.join("; "));
                    info!(run_id = %run_id, task = %name, status = %report.status, "task finished");
                }
                Err(cause) => {
                    report.status = TaskStatus::Failed;
                    report.message = Some(cause.to_string());
                    error!(run_id = %run_id, task = %name, error = %cause, "task failed, aborting run");
                    self.failure = Some(MigrationError {
                        task: name.clone(),
                        cause,
                    });
                    break;
                }
            }
        }

        let leaked = self.pool.total_in_use();
        if leaked > 0 {
            warn!(run_id = %run_id, connections = leaked, "connections still borrowed after run");
        }

        let completed = self.failure.is_none();
        self.state = if completed {
            RunState::Completed
        } else {
            RunState::Aborted
        };

        let report = RunReport {
            run_id,
            completed,
            failed_task: self.failure.as_ref().map(|f| f.task.clone()),
            error: self.failure.as_ref().map(|f| f.cause.to_string()),
            started_at,
            finished_at: self.clock.now(),
            tasks: reports,
        };
        info!(
            run_id = %run_id,
            completed,
            done = report.count(TaskStatus::Done),
            ok = report.count(TaskStatus::Ok),
            "migration finished"
        );
        Ok(report)
    }

    /// Like `run`, but a task failure is returned as `EngineError::Migration`.
    pub async fn migrate(&mut self) -> Result<RunReport, EngineError> {
        let report = self.run().await?;
        match self.take_failure() {
            Some(failure) => Err(failure.into()),
            None => Ok(report),
        }
    }
}
