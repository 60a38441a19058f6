//! Reusable idempotent tasks.
//!
//! Each task asks the inspector whether its object exists and only issues
//! DDL when it does not. The DDL is given per dialect through `DialectSql`.

mod fulltext;
mod schema;

pub use fulltext::CreateFulltextIndex;
pub use schema::{
    AddColumn, AddForeignKey, Column, CreateIndex, CreateSequence, CreateTable, Ensure, ForeignKey, Index,
    SchemaObject, Sequence, Table,
};

use std::collections::BTreeMap;

use crate::config::Dialect;

/// Statements to run, with optional per-dialect replacements.
///
/// An empty override means the change does not apply to that dialect
/// (e.g. sequences on MySQL) and the task reports `OK` there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialectSql {
    default: Vec<String>,
    overrides: BTreeMap<Dialect, Vec<String>>,
}

impl DialectSql {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            default: vec![sql.into()],
            overrides: BTreeMap::new(),
        }
    }

    /// Several statements run in order.
    pub fn statements<I, S>(statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            default: statements.into_iter().map(Into::into).collect(),
            overrides: BTreeMap::new(),
        }
    }

    pub fn with(mut self, dialect: Dialect, sql: impl Into<String>) -> Self {
        self.overrides.insert(dialect, vec![sql.into()]);
        self
    }

    pub fn with_statements<I, S>(mut self, dialect: Dialect, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides
            .insert(dialect, statements.into_iter().map(Into::into).collect());
        self
    }

    /// Nothing to run on `dialect`.
    pub fn skip(mut self, dialect: Dialect) -> Self {
        self.overrides.insert(dialect, Vec::new());
        self
    }

    pub fn for_dialect(&self, dialect: Dialect) -> &[String] {
        self.overrides.get(&dialect).unwrap_or(&self.default)
    }
}

impl From<&str> for DialectSql {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for DialectSql {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}
