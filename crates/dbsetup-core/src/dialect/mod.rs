//! Dialect-specific schema inspectors.
//!
//! Each inspector queries its dialect's native catalog (`information_schema`,
//! `pg_indexes`, `sys.*`) but answers through the one `SchemaInspector`
//! surface. The inspector for a resource is chosen from its configured adapter.

mod mysql;
mod pgsql;
mod sqlsrv;

pub use mysql::MysqlInspector;
pub use pgsql::PgsqlInspector;
pub use sqlsrv::SqlsrvInspector;

use std::sync::Arc;

use crate::config::Dialect;
use crate::domain::{InspectError, PoolError};
use crate::pool::ConnectionPool;
use crate::ports::{Row, SchemaInspector, Value};

/// Shared plumbing: one pooled connection per catalog query.
#[derive(Clone)]
pub(crate) struct Catalog {
    pool: Arc<ConnectionPool>,
    resource: String,
    schema: String,
}

impl Catalog {
    pub(crate) fn new(pool: Arc<ConnectionPool>, resource: &str, schema: String) -> Self {
        Self {
            pool,
            resource: resource.to_string(),
            schema,
        }
    }

    pub(crate) fn schema(&self) -> &str {
        &self.schema
    }

    pub(crate) async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, InspectError> {
        let mut conn = self.pool.acquire(&self.resource).await?;
        let rows = conn.fetch_all(sql, params).await;
        self.pool.release(conn);
        Ok(rows?)
    }

    pub(crate) async fn fetch_row(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, InspectError> {
        let mut conn = self.pool.acquire(&self.resource).await?;
        let row = conn.fetch_optional(sql, params).await;
        self.pool.release(conn);
        Ok(row?)
    }

    pub(crate) async fn exists(&self, sql: &str, params: &[Value]) -> Result<bool, InspectError> {
        Ok(self.fetch_row(sql, params).await?.is_some())
    }
}

/// Build the inspector matching the adapter configured for `resource`.
pub fn inspector_for(
    pool: Arc<ConnectionPool>,
    resource: &str,
) -> Result<Arc<dyn SchemaInspector>, PoolError> {
    let config = pool.config(resource)?;
    let dialect = config.adapter;
    let catalog = Catalog::new(Arc::clone(&pool), resource, config.schema_name());

    let inspector: Arc<dyn SchemaInspector> = match dialect {
        Dialect::Mysql => Arc::new(MysqlInspector::new(catalog)),
        Dialect::Pgsql => Arc::new(PgsqlInspector::new(catalog)),
        Dialect::Sqlsrv => Arc::new(SqlsrvInspector::new(catalog)),
    };
    Ok(inspector)
}

/// Length of a column: character length if reported, numeric precision otherwise.
pub(crate) fn column_length(row: &Row, char_length: &str, precision: &str) -> Option<i64> {
    row.int(char_length)
        .filter(|len| *len != 0)
        .or_else(|| row.int(precision).filter(|p| *p != 0))
}
