//! Connection port - a live database connection and the factory that opens it.
//!
//! Implementations:
//! - `impls::MemoryConnector`: in-process database (tests, dry runs)
//! - `impls::SqlxConnector`: MySQL / PostgreSQL through sqlx

use async_trait::async_trait;

use crate::config::ResourceConfig;
use crate::domain::ConnectionError;

/// A bound parameter or a fetched cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Int(i64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Int(i) => Some(i.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Null => None,
        }
    }

    /// Catalogs report flags as `YES`/`NO`, `1`/`0` or booleans.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Text(s) => match s.to_ascii_uppercase().as_str() {
                "YES" | "Y" | "TRUE" | "T" | "1" => Some(true),
                "NO" | "N" | "FALSE" | "F" | "0" => Some(false),
                _ => None,
            },
            Value::Null => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One result row; columns are looked up by (case-insensitive) name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).and_then(Value::as_text)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_flag)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A live connection owned by exactly one caller at a time.
#[async_trait]
pub trait Connection: Send {
    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ConnectionError>;

    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<Row>, ConnectionError> {
        Ok(self.fetch_all(sql, params).await?.into_iter().next())
    }

    /// Run a statement; returns the number of affected rows.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, ConnectionError>;

    /// Set once a call failed with a lost session. The pool discards broken
    /// connections instead of lending them out again.
    fn is_broken(&self) -> bool {
        false
    }
}

/// Opens physical connections for a resource.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        resource: &str,
        config: &ResourceConfig,
    ) -> Result<Box<dyn Connection>, ConnectionError>;
}
