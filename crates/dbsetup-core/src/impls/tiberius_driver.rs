//! tiberius-backed connector for SQL Server resources.

use async_trait::async_trait;
use tiberius::error::Error as TdsError;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use crate::config::{Dialect, ResourceConfig};
use crate::domain::ConnectionError;
use crate::ports::{Connection, Connector, Row, Value};

/// "Invalid object name" and "Cannot find the object".
const NOT_FOUND_CODES: &[u32] = &[208, 4902];

fn is_not_found(code: u32) -> bool {
    NOT_FOUND_CODES.contains(&code)
}

fn map_err(err: TdsError) -> ConnectionError {
    match &err {
        TdsError::Server(token) if is_not_found(token.code()) => {
            ConnectionError::ObjectNotFound(token.message().to_string())
        }
        TdsError::Io { .. } | TdsError::Tls(_) | TdsError::Routing { .. } => {
            ConnectionError::Connect(err.to_string())
        }
        _ => ConnectionError::Query(err.to_string()),
    }
}

fn build_config(config: &ResourceConfig) -> Config {
    let mut tds = Config::new();
    tds.host(&config.host);
    tds.port(config.port());
    tds.database(&config.database);
    tds.authentication(AuthMethod::sql_server(&config.username, &config.password));

    if config.encrypt {
        if config.trust_server_cert {
            tds.trust_cert();
        }
        tds.encryption(EncryptionLevel::Required);
    } else {
        tds.encryption(EncryptionLevel::NotSupported);
    }
    tds
}

/// `@P1`, `@P2`, ... are bound in order.
fn query<'a>(sql: &'a str, params: &[Value]) -> Query<'a> {
    let mut query = Query::new(sql);
    for param in params {
        match param {
            Value::Null => query.bind(None::<String>),
            Value::Int(i) => query.bind(*i),
            Value::Text(s) => query.bind(s.clone()),
            Value::Bool(b) => query.bind(*b),
        }
    }
    query
}

fn cell(row: &tiberius::Row, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return v.map_or(Value::Null, Value::Int);
    }
    if let Ok(v) = row.try_get::<i32, _>(idx) {
        return v.map_or(Value::Null, |i| Value::Int(i64::from(i)));
    }
    if let Ok(v) = row.try_get::<i16, _>(idx) {
        return v.map_or(Value::Null, |i| Value::Int(i64::from(i)));
    }
    if let Ok(v) = row.try_get::<u8, _>(idx) {
        return v.map_or(Value::Null, |i| Value::Int(i64::from(i)));
    }
    if let Ok(v) = row.try_get::<bool, _>(idx) {
        return v.map_or(Value::Null, Value::Bool);
    }
    if let Ok(v) = row.try_get::<&str, _>(idx) {
        return v.map_or(Value::Null, |s| Value::Text(s.to_string()));
    }
    Value::Null
}

fn convert(row: &tiberius::Row) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .fold(Row::new(), |acc, (idx, col)| acc.with(col.name(), cell(row, idx)))
}

/// Opens one TDS session per pooled connection.
#[derive(Debug, Default, Clone)]
pub struct TiberiusConnector;

impl TiberiusConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TiberiusConnector {
    async fn connect(
        &self,
        resource: &str,
        config: &ResourceConfig,
    ) -> Result<Box<dyn Connection>, ConnectionError> {
        if config.adapter != Dialect::Sqlsrv {
            return Err(ConnectionError::Connect(format!(
                "resource '{resource}': {} is not served by TiberiusConnector",
                config.adapter
            )));
        }

        let tds = build_config(config);
        debug!(resource, addr = %tds.get_addr(), "opening connection");
        let tcp = TcpStream::connect(tds.get_addr())
            .await
            .map_err(|e| ConnectionError::Connect(e.to_string()))?;
        tcp.set_nodelay(true).ok();

        let client = Client::connect(tds, tcp.compat_write())
            .await
            .map_err(map_err)?;
        Ok(Box::new(TiberiusConnection { client, broken: false }))
    }
}

pub struct TiberiusConnection {
    client: Client<Compat<TcpStream>>,
    broken: bool,
}

impl TiberiusConnection {
    fn fail(&mut self, err: TdsError) -> ConnectionError {
        let err = map_err(err);
        self.broken |= err.is_connection_lost();
        err
    }
}

#[async_trait]
impl Connection for TiberiusConnection {
    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ConnectionError> {
        let result = match query(sql, params).query(&mut self.client).await {
            Ok(stream) => stream.into_first_result().await,
            Err(err) => Err(err),
        };
        match result {
            Ok(rows) => Ok(rows.iter().map(convert).collect()),
            Err(err) => Err(self.fail(err)),
        }
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, ConnectionError> {
        let result = query(sql, params).execute(&mut self.client).await;
        match result {
            Ok(done) => Ok(done.total()),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn is_broken(&self) -> bool {
        self.broken
    }
}
