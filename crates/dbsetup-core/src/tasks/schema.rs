//! Create-if-absent tasks for plain schema objects.

use async_trait::async_trait;

use super::DialectSql;
use crate::config::{DEFAULT_RESOURCE, Dialect};
use crate::domain::{InspectError, Outcome, TaskError, TaskName};
use crate::ports::SchemaInspector;
use crate::task::{Task, TaskContext};

/// An object whose existence the inspector can answer.
#[async_trait]
pub trait SchemaObject: Send + Sync {
    async fn exists(&self, inspector: &dyn SchemaInspector) -> Result<bool, InspectError>;

    /// Operator-facing description, e.g. `table "mshop_product"`.
    fn describe(&self) -> String;

    /// Can `dialect` hold this kind of object at all?
    fn supported_on(&self, _dialect: Dialect) -> bool {
        true
    }
}

pub struct Table {
    pub table: String,
}

pub struct Column {
    pub table: String,
    pub column: String,
}

pub struct Index {
    pub table: String,
    pub index: String,
}

pub struct ForeignKey {
    pub table: String,
    pub constraint: String,
}

pub struct Sequence {
    pub sequence: String,
}

#[async_trait]
impl SchemaObject for Table {
    async fn exists(&self, inspector: &dyn SchemaInspector) -> Result<bool, InspectError> {
        inspector.table_exists(&self.table).await
    }

    fn describe(&self) -> String {
        format!("table \"{}\"", self.table)
    }
}

#[async_trait]
impl SchemaObject for Column {
    async fn exists(&self, inspector: &dyn SchemaInspector) -> Result<bool, InspectError> {
        inspector.column_exists(&self.table, &self.column).await
    }

    fn describe(&self) -> String {
        format!("column \"{}.{}\"", self.table, self.column)
    }
}

#[async_trait]
impl SchemaObject for Index {
    async fn exists(&self, inspector: &dyn SchemaInspector) -> Result<bool, InspectError> {
        inspector.index_exists(&self.table, &self.index).await
    }

    fn describe(&self) -> String {
        format!("index \"{}\" on \"{}\"", self.index, self.table)
    }
}

#[async_trait]
impl SchemaObject for ForeignKey {
    async fn exists(&self, inspector: &dyn SchemaInspector) -> Result<bool, InspectError> {
        inspector.constraint_exists(&self.table, &self.constraint).await
    }

    fn describe(&self) -> String {
        format!("foreign key \"{}\" on \"{}\"", self.constraint, self.table)
    }
}

#[async_trait]
impl SchemaObject for Sequence {
    async fn exists(&self, inspector: &dyn SchemaInspector) -> Result<bool, InspectError> {
        inspector.sequence_exists(&self.sequence).await
    }

    fn describe(&self) -> String {
        format!("sequence \"{}\"", self.sequence)
    }

    fn supported_on(&self, dialect: Dialect) -> bool {
        dialect.has_sequences()
    }
}

/// Runs `sql` on `resource` unless `object` already exists.
pub struct Ensure<O> {
    name: TaskName,
    resource: String,
    object: O,
    sql: DialectSql,
    pre: Vec<TaskName>,
    post: Vec<TaskName>,
}

pub type CreateTable = Ensure<Table>;
pub type AddColumn = Ensure<Column>;
pub type CreateIndex = Ensure<Index>;
pub type AddForeignKey = Ensure<ForeignKey>;
/// Skipped on dialects without native sequences (MySQL).
pub type CreateSequence = Ensure<Sequence>;

impl<O: SchemaObject> Ensure<O> {
    pub fn with_object(name: impl Into<TaskName>, object: O, sql: impl Into<DialectSql>) -> Self {
        Self {
            name: name.into(),
            resource: DEFAULT_RESOURCE.to_string(),
            object,
            sql: sql.into(),
            pre: Vec::new(),
            post: Vec::new(),
        }
    }

    /// Resource to run on (default `db`).
    pub fn on(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    /// Nothing to run on `dialect`.
    pub fn skip_on(mut self, dialect: Dialect) -> Self {
        self.sql = self.sql.skip(dialect);
        self
    }

    /// Run after these tasks.
    pub fn after(mut self, tasks: &[&str]) -> Self {
        self.pre.extend(tasks.iter().copied().map(TaskName::from));
        self
    }

    /// Run before these tasks.
    pub fn before(mut self, tasks: &[&str]) -> Self {
        self.post.extend(tasks.iter().copied().map(TaskName::from));
        self
    }
}

impl Ensure<Table> {
    pub fn new(name: impl Into<TaskName>, table: &str, sql: impl Into<DialectSql>) -> Self {
        Self::with_object(name, Table { table: table.into() }, sql)
    }
}

impl Ensure<Column> {
    pub fn new(name: impl Into<TaskName>, table: &str, column: &str, sql: impl Into<DialectSql>) -> Self {
        let object = Column {
            table: table.into(),
            column: column.into(),
        };
        Self::with_object(name, object, sql)
    }
}

impl Ensure<Index> {
    pub fn new(name: impl Into<TaskName>, table: &str, index: &str, sql: impl Into<DialectSql>) -> Self {
        let object = Index {
            table: table.into(),
            index: index.into(),
        };
        Self::with_object(name, object, sql)
    }
}

impl Ensure<ForeignKey> {
    pub fn new(name: impl Into<TaskName>, table: &str, constraint: &str, sql: impl Into<DialectSql>) -> Self {
        let object = ForeignKey {
            table: table.into(),
            constraint: constraint.into(),
        };
        Self::with_object(name, object, sql)
    }
}

impl Ensure<Sequence> {
    pub fn new(name: impl Into<TaskName>, sequence: &str, sql: impl Into<DialectSql>) -> Self {
        Self::with_object(name, Sequence { sequence: sequence.into() }, sql)
    }
}

#[async_trait]
impl<O: SchemaObject> Task for Ensure<O> {
    fn name(&self) -> TaskName {
        self.name.clone()
    }

    fn pre_dependencies(&self) -> Vec<TaskName> {
        self.pre.clone()
    }

    fn post_dependencies(&self) -> Vec<TaskName> {
        self.post.clone()
    }

    async fn migrate(&self, ctx: &TaskContext) -> Result<Outcome, TaskError> {
        let inspector = ctx.inspector(&self.resource)?;
        let dialect = inspector.dialect();
        let statements = self.sql.for_dialect(dialect);
        if !self.object.supported_on(dialect) || statements.is_empty() {
            ctx.msg(format!(
                "Skipping {} on {}",
                self.object.describe(),
                inspector.dialect_name()
            ));
            return Ok(Outcome::Ok);
        }
        if self.object.exists(inspector.as_ref()).await? {
            return Ok(Outcome::Ok);
        }

        ctx.msg(format!("Creating {}", self.object.describe()));
        ctx.execute_all(&self.resource, statements).await?;
        Ok(Outcome::Done)
    }
}
