//! TaskContext - the surface a task works through.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::dialect::inspector_for;
use crate::domain::{TaskError, TaskName};
use crate::pool::{ConnectionPool, PooledConnection};
use crate::ports::{SchemaInspector, Value};

/// Per-task access to the pool, inspectors and progress messages.
///
/// Every helper borrows a connection for a single call and releases it
/// before returning.
pub struct TaskContext {
    pool: Arc<ConnectionPool>,
    task: TaskName,
    messages: Mutex<Vec<String>>,
}

impl TaskContext {
    pub fn new(pool: Arc<ConnectionPool>, task: TaskName) -> Self {
        Self {
            pool,
            task,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn task(&self) -> &TaskName {
        &self.task
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Progress message for the operator.
    pub fn msg(&self, message: impl Into<String>) {
        let message = message.into();
        info!(task = %self.task, "{message}");
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Schema inspector for the dialect configured on `resource`.
    pub fn inspector(&self, resource: &str) -> Result<Arc<dyn SchemaInspector>, TaskError> {
        Ok(inspector_for(Arc::clone(&self.pool), resource)?)
    }

    /// Borrow a connection; it goes back to the pool when dropped.
    pub async fn acquire(&self, resource: &str) -> Result<PooledConnection, TaskError> {
        Ok(self.pool.acquire(resource).await?)
    }

    /// Execute one statement on `resource`.
    pub async fn execute(&self, resource: &str, sql: &str) -> Result<u64, TaskError> {
        let mut conn = self.pool.acquire(resource).await?;
        let affected = conn.execute(sql, &[]).await;
        self.pool.release(conn);
        Ok(affected?)
    }

    /// Execute each statement in order, stopping at the first failure.
    pub async fn execute_all(&self, resource: &str, statements: &[String]) -> Result<(), TaskError> {
        for sql in statements {
            self.execute(resource, sql).await?;
        }
        Ok(())
    }

    /// First row's `column` for `sql`; `NoValue` when there is no row or the cell is NULL.
    pub async fn value(
        &self,
        resource: &str,
        sql: &str,
        params: &[Value],
        column: &str,
    ) -> Result<Value, TaskError> {
        let mut conn = self.pool.acquire(resource).await?;
        let row = conn.fetch_optional(sql, params).await;
        self.pool.release(conn);

        row?.and_then(|r| r.get(column).cloned())
            .filter(|v| !v.is_null())
            .ok_or_else(|| TaskError::NoValue {
                sql: sql.trim().to_string(),
                column: column.to_string(),
            })
    }
}
