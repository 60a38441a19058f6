//! sqlx-backed connector for MySQL and PostgreSQL resources.
//!
//! sqlx has no SQL Server driver; `sqlsrv` resources go through
//! `TiberiusConnector`, and `DriverConnector` routes between the two.

use std::sync::Once;

use async_trait::async_trait;
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyConnection, Column, Connection as _, Row as _};
use tracing::debug;

use crate::config::{Dialect, ResourceConfig};
use crate::domain::ConnectionError;
use crate::ports::{Connection, Connector, Row, Value};

/// SQLSTATE / vendor codes for "table or view does not exist".
const NOT_FOUND_CODES: &[&str] = &["42P01", "42S02", "1146", "42704"];

static DRIVERS: Once = Once::new();

fn map_err(err: sqlx::Error) -> ConnectionError {
    match &err {
        sqlx::Error::Database(db) if db.code().is_some_and(|c| NOT_FOUND_CODES.contains(&c.as_ref())) => {
            ConnectionError::ObjectNotFound(db.message().to_string())
        }
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            ConnectionError::Connect(err.to_string())
        }
        _ => ConnectionError::Query(err.to_string()),
    }
}

fn bind<'q>(sql: &'q str, params: &[Value]) -> Query<'q, Any, AnyArguments<'q>> {
    params.iter().fold(sqlx::query(sql), |q, p| match p {
        Value::Null => q.bind(None::<String>),
        Value::Int(i) => q.bind(*i),
        Value::Text(s) => q.bind(s.clone()),
        Value::Bool(b) => q.bind(*b),
    })
}

/// Decode one cell into the narrow `Value` model.
fn cell(row: &AnyRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map_or(Value::Null, Value::Int);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map_or(Value::Null, |i| Value::Int(i64::from(i)));
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return v.map_or(Value::Null, |i| Value::Int(i64::from(i)));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map_or(Value::Null, Value::Text);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map_or(Value::Null, Value::Bool);
    }
    Value::Null
}

fn convert(row: &AnyRow) -> Row {
    row.columns()
        .iter()
        .fold(Row::new(), |acc, col| acc.with(col.name(), cell(row, col.ordinal())))
}

/// Opens one `AnyConnection` per pooled connection.
#[derive(Debug, Default, Clone)]
pub struct SqlxConnector;

impl SqlxConnector {
    pub fn new() -> Self {
        DRIVERS.call_once(sqlx::any::install_default_drivers);
        Self
    }
}

#[async_trait]
impl Connector for SqlxConnector {
    async fn connect(
        &self,
        resource: &str,
        config: &ResourceConfig,
    ) -> Result<Box<dyn Connection>, ConnectionError> {
        if config.adapter == Dialect::Sqlsrv {
            return Err(ConnectionError::Connect(format!(
                "resource '{resource}': sqlsrv is served by TiberiusConnector"
            )));
        }
        DRIVERS.call_once(sqlx::any::install_default_drivers);

        debug!(resource, adapter = %config.adapter, host = %config.host, "opening connection");
        let conn = AnyConnection::connect(&config.connection_url())
            .await
            .map_err(map_err)?;
        Ok(Box::new(SqlxConnection { conn, broken: false }))
    }
}

pub struct SqlxConnection {
    conn: AnyConnection,
    broken: bool,
}

impl SqlxConnection {
    fn fail(&mut self, err: sqlx::Error) -> ConnectionError {
        let err = map_err(err);
        self.broken |= err.is_connection_lost();
        err
    }
}

#[async_trait]
impl Connection for SqlxConnection {
    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ConnectionError> {
        let result = bind(sql, params).fetch_all(&mut self.conn).await;
        match result {
            Ok(rows) => Ok(rows.iter().map(convert).collect()),
            Err(err) => Err(self.fail(err)),
        }
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, ConnectionError> {
        let result = bind(sql, params).execute(&mut self.conn).await;
        match result {
            Ok(done) => Ok(done.rows_affected()),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn is_broken(&self) -> bool {
        self.broken
    }
}
