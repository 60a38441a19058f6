//! Full-text index creation; the strategy differs completely per dialect.
//!
//! - MySQL: `ALTER TABLE .. ADD FULLTEXT`
//! - PostgreSQL: GIN index over `to_tsvector(column)`
//! - SQL Server: full-text catalog plus `CREATE FULLTEXT INDEX .. KEY INDEX <pk>`

use async_trait::async_trait;

use crate::config::{DEFAULT_RESOURCE, Dialect};
use crate::domain::{Outcome, TaskError, TaskName};
use crate::ports::Value;
use crate::task::{Task, TaskContext};

const PRIMARY_KEY_NAME: &str = "
    SELECT i.name AS name
    FROM sys.indexes i
    JOIN sys.tables t ON i.object_id = t.object_id
    WHERE SCHEMA_NAME(t.schema_id) = @P1 AND t.name = @P2 AND i.is_primary_key = 1
";

const FULLTEXT_CATALOG: &str = "
    SELECT name FROM sys.fulltext_catalogs WHERE name = @P1
";

/// Creates a full-text index on `table.column` if the table exists and the
/// index does not.
///
/// A missing table is reported as `OK`; the table task is expected to run
/// first. A probe that cannot decide fails the task.
pub struct CreateFulltextIndex {
    name: TaskName,
    resource: String,
    table: String,
    column: String,
    index: String,
    catalog: String,
    language: String,
    pre: Vec<TaskName>,
}

impl CreateFulltextIndex {
    pub fn new(name: impl Into<TaskName>, table: &str, column: &str) -> Self {
        Self {
            name: name.into(),
            resource: DEFAULT_RESOURCE.to_string(),
            table: table.to_string(),
            column: column.to_string(),
            index: format!("idx_{table}_{column}"),
            catalog: "aimeos".to_string(),
            language: "english".to_string(),
            pre: Vec::new(),
        }
    }

    pub fn on(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn after(mut self, tasks: &[&str]) -> Self {
        self.pre.extend(tasks.iter().copied().map(TaskName::from));
        self
    }

    /// Index name for MySQL and PostgreSQL.
    pub fn index_name(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// SQL Server full-text catalog, created on demand.
    pub fn catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = catalog.into();
        self
    }

    /// PostgreSQL text search configuration.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    async fn create_sqlsrv(&self, ctx: &TaskContext, schema: &str) -> Result<(), TaskError> {
        let params = [Value::from(schema), Value::from(self.table.as_str())];
        let key = ctx
            .value(&self.resource, PRIMARY_KEY_NAME, &params, "name")
            .await?
            .as_text()
            .ok_or_else(|| TaskError::Other(format!("no primary key on \"{}\"", self.table)))?;

        let mut conn = ctx.acquire(&self.resource).await?;
        let catalog_exists = conn
            .fetch_optional(FULLTEXT_CATALOG, &[Value::from(self.catalog.as_str())])
            .await?
            .is_some();
        if !catalog_exists {
            conn.execute(&format!("CREATE FULLTEXT CATALOG \"{}\"", self.catalog), &[])
                .await?;
        }
        conn.execute(
            &format!(
                "CREATE FULLTEXT INDEX ON \"{}\" (\"{}\") KEY INDEX {} ON \"{}\"",
                self.table, self.column, key, self.catalog
            ),
            &[],
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Task for CreateFulltextIndex {
    fn name(&self) -> TaskName {
        self.name.clone()
    }

    fn pre_dependencies(&self) -> Vec<TaskName> {
        self.pre.clone()
    }

    async fn migrate(&self, ctx: &TaskContext) -> Result<Outcome, TaskError> {
        ctx.msg(format!(
            "Creating full text index on \"{}.{}\"",
            self.table, self.column
        ));

        let inspector = ctx.inspector(&self.resource)?;
        if !inspector.table_exists(&self.table).await? {
            return Ok(Outcome::Ok);
        }

        let object = format!("{}.{}", self.table, self.column);
        if inspector
            .fulltext_index(&self.table, &self.column)
            .await?
            .require(&object)?
        {
            return Ok(Outcome::Ok);
        }

        match inspector.dialect() {
            Dialect::Mysql => {
                let sql = format!(
                    "ALTER TABLE `{}` ADD FULLTEXT `{}` (`{}`)",
                    self.table, self.index, self.column
                );
                ctx.execute(&self.resource, &sql).await?;
            }
            Dialect::Pgsql => {
                let sql = format!(
                    "CREATE INDEX \"{}\" ON \"{}\" USING GIN (to_tsvector('{}', \"{}\"))",
                    self.index, self.table, self.language, self.column
                );
                ctx.execute(&self.resource, &sql).await?;
            }
            Dialect::Sqlsrv => self.create_sqlsrv(ctx, inspector.schema_name()).await?,
        }
        Ok(Outcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;
    use crate::config::{ResourceConfig, ResourceMap};
    use crate::domain::{ConnectionError, InspectError};
    use crate::impls::{MemoryConnector, MemoryServer};
    use crate::pool::ConnectionPool;

    const TABLE: &str = "CREATE TABLE mshop_index_text (
        id INT NOT NULL,
        content VARCHAR(255) NOT NULL,
        CONSTRAINT pk_msindte_id PRIMARY KEY (id)
    )";

    fn context(dialect: Dialect) -> (TaskContext, MemoryServer) {
        let server = MemoryServer::new("shop");
        let resources = ResourceMap::new().with(
            "db",
            ResourceConfig::new(dialect, "shop").with_schema("shop"),
        );
        let pool = ConnectionPool::new(resources, Arc::new(MemoryConnector::new(server.clone())));
        (TaskContext::new(Arc::new(pool), "IndexCreateFulltext".into()), server)
    }

    fn task() -> CreateFulltextIndex {
        CreateFulltextIndex::new("IndexCreateFulltext", "mshop_index_text", "content").on("db-product")
    }

    #[rstest]
    #[case::mysql(Dialect::Mysql)]
    #[case::pgsql(Dialect::Pgsql)]
    #[case::sqlsrv(Dialect::Sqlsrv)]
    #[tokio::test]
    async fn creates_once(#[case] dialect: Dialect) {
        let (ctx, server) = context(dialect);
        server.apply(TABLE).unwrap();

        assert_eq!(task().migrate(&ctx).await.unwrap(), Outcome::Done);
        assert!(server.has_fulltext("mshop_index_text", "content"));
        let snapshot = server.snapshot();
        server.clear_statements();

        assert_eq!(task().migrate(&ctx).await.unwrap(), Outcome::Ok);
        assert!(server.ddl_statements().is_empty());
        assert_eq!(server.snapshot(), snapshot);
        assert_eq!(ctx.pool().total_in_use(), 0);
    }

    #[rstest]
    #[case::mysql(Dialect::Mysql)]
    #[case::pgsql(Dialect::Pgsql)]
    #[case::sqlsrv(Dialect::Sqlsrv)]
    #[tokio::test]
    async fn missing_table_is_ok(#[case] dialect: Dialect) {
        let (ctx, server) = context(dialect);
        assert_eq!(task().migrate(&ctx).await.unwrap(), Outcome::Ok);
        assert!(server.ddl_statements().is_empty());
    }

    #[tokio::test]
    async fn pgsql_index_on_longer_column_does_not_count() {
        let (ctx, server) = context(Dialect::Pgsql);
        server
            .apply(
                "CREATE TABLE mshop_index_text (
                    id INT NOT NULL,
                    content VARCHAR(255) NOT NULL,
                    content_long TEXT NULL,
                    CONSTRAINT pk_msindte_id PRIMARY KEY (id)
                );
                CREATE INDEX idx_msindte_cl ON mshop_index_text USING gin (to_tsvector('english', content_long))",
            )
            .unwrap();

        assert_eq!(task().migrate(&ctx).await.unwrap(), Outcome::Done);
        assert!(server.has_fulltext("mshop_index_text", "content"));
        assert!(server.has_index("mshop_index_text", "idx_mshop_index_text_content"));
    }

    #[tokio::test]
    async fn sqlsrv_reuses_existing_catalog() {
        let (ctx, server) = context(Dialect::Sqlsrv);
        server.apply(TABLE).unwrap();
        server.apply("CREATE FULLTEXT CATALOG aimeos").unwrap();

        assert_eq!(task().migrate(&ctx).await.unwrap(), Outcome::Done);
        let ddl = server.ddl_statements();
        assert_eq!(ddl.len(), 1);
        assert!(ddl[0].contains("KEY INDEX pk_msindte_id"));
    }

    #[tokio::test]
    async fn sqlsrv_not_found_probe_means_absent() {
        let (ctx, server) = context(Dialect::Sqlsrv);
        server.apply(TABLE).unwrap();
        server.fail_on(
            "sys.fulltext_indexes",
            ConnectionError::ObjectNotFound("mshop_index_text".into()),
        );

        assert_eq!(task().migrate(&ctx).await.unwrap(), Outcome::Done);
        assert!(server.has_fulltext("mshop_index_text", "content"));
    }

    #[tokio::test]
    async fn sqlsrv_undecidable_probe_fails() {
        let (ctx, server) = context(Dialect::Sqlsrv);
        server.apply(TABLE).unwrap();
        server.set_fulltext_installed(false);

        let err = task().migrate(&ctx).await.unwrap_err();
        assert!(matches!(err, TaskError::Inspect(InspectError::ProbeUnknown { .. })));
        assert!(server.ddl_statements().is_empty());
    }
}
