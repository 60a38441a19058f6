//! SQL Server inspector on top of the `sys.*` catalog views.
//!
//! SQL Server offers no single "full-text index exists" check, so the
//! full-text probe maps a recoverable "object not found" error to `Absent`
//! and any other query error to `Unknown`.

use async_trait::async_trait;
use tracing::debug;

use super::{Catalog, column_length};
use crate::config::Dialect;
use crate::domain::{ColumnInfo, InspectError, Probe};
use crate::ports::{SchemaInspector, Value};

const TABLE_EXISTS: &str = "
    SELECT name
    FROM sys.tables
    WHERE SCHEMA_NAME(schema_id) = @P1 AND name = @P2
";

const COLUMN_EXISTS: &str = "
    SELECT c.name AS name
    FROM sys.columns c
    JOIN sys.tables t ON c.object_id = t.object_id
    WHERE SCHEMA_NAME(t.schema_id) = @P1 AND t.name = @P2 AND c.name = @P3
";

const INDEX_EXISTS: &str = "
    SELECT i.name AS name
    FROM sys.indexes i
    JOIN sys.tables t ON i.object_id = t.object_id
    WHERE SCHEMA_NAME(t.schema_id) = @P1 AND t.name = @P2 AND i.name = @P3
        AND i.is_primary_key = 0
";

const CONSTRAINT_EXISTS: &str = "
    SELECT name
    FROM sys.foreign_keys
    WHERE SCHEMA_NAME(schema_id) = @P1 AND OBJECT_NAME(parent_object_id) = @P2 AND name = @P3
";

const SEQUENCE_EXISTS: &str = "
    SELECT name
    FROM sys.sequences
    WHERE SCHEMA_NAME(schema_id) = @P1 AND name = @P2
";

const COLUMN_DETAILS: &str = "
    SELECT t.name AS table_name, c.name AS column_name, p.name AS data_type,
        OBJECT_DEFINITION(c.default_object_id) AS column_default,
        c.max_length AS max_length, c.precision AS num_precision,
        c.is_nullable AS is_nullable, c.collation_name AS collation_name
    FROM sys.columns c
    JOIN sys.tables t ON c.object_id = t.object_id
    JOIN sys.types p ON p.user_type_id = c.user_type_id
    WHERE SCHEMA_NAME(t.schema_id) = @P1 AND t.name = @P2 AND c.name = @P3
";

const FULLTEXT_INDEX: &str = "
    SELECT i.object_id AS object_id
    FROM sys.fulltext_indexes i
    JOIN sys.fulltext_index_columns ic ON ic.object_id = i.object_id
    JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
    WHERE i.object_id = OBJECT_ID(@P1) AND c.name = @P2
";

pub struct SqlsrvInspector {
    catalog: Catalog,
}

impl SqlsrvInspector {
    pub(crate) fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    fn params(&self, rest: &[&str]) -> Vec<Value> {
        std::iter::once(self.catalog.schema())
            .chain(rest.iter().copied())
            .map(Value::from)
            .collect()
    }
}

#[async_trait]
impl SchemaInspector for SqlsrvInspector {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlsrv
    }

    fn schema_name(&self) -> &str {
        self.catalog.schema()
    }

    async fn table_exists(&self, table: &str) -> Result<bool, InspectError> {
        self.catalog.exists(TABLE_EXISTS, &self.params(&[table])).await
    }

    async fn column_exists(&self, table: &str, column: &str) -> Result<bool, InspectError> {
        self.catalog
            .exists(COLUMN_EXISTS, &self.params(&[table, column]))
            .await
    }

    async fn index_exists(&self, table: &str, index: &str) -> Result<bool, InspectError> {
        self.catalog
            .exists(INDEX_EXISTS, &self.params(&[table, index]))
            .await
    }

    async fn constraint_exists(&self, table: &str, constraint: &str) -> Result<bool, InspectError> {
        self.catalog
            .exists(CONSTRAINT_EXISTS, &self.params(&[table, constraint]))
            .await
    }

    async fn sequence_exists(&self, sequence: &str) -> Result<bool, InspectError> {
        self.catalog
            .exists(SEQUENCE_EXISTS, &self.params(&[sequence]))
            .await
    }

    async fn column_details(&self, table: &str, column: &str) -> Result<ColumnInfo, InspectError> {
        let row = self
            .catalog
            .fetch_row(COLUMN_DETAILS, &self.params(&[table, column]))
            .await?
            .ok_or_else(|| InspectError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            })?;

        Ok(ColumnInfo {
            table: row.text("table_name").unwrap_or_else(|| table.to_string()),
            name: row.text("column_name").unwrap_or_else(|| column.to_string()),
            data_type: row.text("data_type").unwrap_or_default().to_ascii_lowercase(),
            // string types report precision 0
            length: column_length(&row, "num_precision", "max_length"),
            nullable: row.flag("is_nullable").unwrap_or(false),
            default: row.text("column_default"),
            collation: row.text("collation_name"),
        })
    }

    async fn fulltext_index(&self, table: &str, column: &str) -> Result<Probe, InspectError> {
        let object = format!("{}.{}", self.catalog.schema(), table);
        debug!(dialect = "sqlsrv", table, column, "probing full text index");

        let params = [Value::from(object.as_str()), Value::from(column)];
        match self.catalog.fetch_row(FULLTEXT_INDEX, &params).await {
            Ok(Some(_)) => Ok(Probe::Exists),
            Ok(None) => Ok(Probe::Absent),
            Err(InspectError::Connection(err)) if err.is_object_not_found() => {
                debug!(table, error = %err, "full text index not found");
                Ok(Probe::Absent)
            }
            Err(InspectError::Connection(err)) => Ok(Probe::Unknown(err.to_string())),
            Err(err) => Err(err),
        }
    }
}
