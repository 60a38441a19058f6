//! MySQL / MariaDB inspector on top of `information_schema`.

use async_trait::async_trait;
use tracing::debug;

use super::{Catalog, column_length};
use crate::config::Dialect;
use crate::domain::{ColumnInfo, InspectError, Probe};
use crate::ports::{SchemaInspector, Value};

const TABLE_EXISTS: &str = "
    SELECT TABLE_NAME AS name
    FROM information_schema.tables
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
";

const COLUMN_EXISTS: &str = "
    SELECT COLUMN_NAME AS name
    FROM information_schema.columns
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_NAME = ?
";

const INDEX_EXISTS: &str = "
    SELECT INDEX_NAME AS name
    FROM information_schema.statistics
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND INDEX_NAME = ?
        AND INDEX_NAME <> 'PRIMARY'
";

const CONSTRAINT_EXISTS: &str = "
    SELECT CONSTRAINT_NAME AS name
    FROM information_schema.table_constraints
    WHERE CONSTRAINT_SCHEMA = ? AND TABLE_NAME = ? AND CONSTRAINT_NAME = ?
        AND CONSTRAINT_TYPE = 'FOREIGN KEY'
";

const COLUMN_DETAILS: &str = "
    SELECT TABLE_NAME AS table_name, COLUMN_NAME AS column_name, DATA_TYPE AS data_type,
        CHARACTER_MAXIMUM_LENGTH AS char_length, NUMERIC_PRECISION AS num_precision,
        COLUMN_DEFAULT AS column_default, IS_NULLABLE AS is_nullable,
        COLLATION_NAME AS collation_name
    FROM information_schema.columns
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_NAME = ?
";

const FULLTEXT_INDEX: &str = "
    SELECT INDEX_NAME AS name
    FROM information_schema.statistics
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_NAME = ?
        AND INDEX_TYPE = 'FULLTEXT'
";

pub struct MysqlInspector {
    catalog: Catalog,
}

impl MysqlInspector {
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
impl SchemaInspector for MysqlInspector {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
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

    async fn sequence_exists(&self, _sequence: &str) -> Result<bool, InspectError> {
        Ok(false)
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
            length: column_length(&row, "char_length", "num_precision"),
            nullable: row.flag("is_nullable").unwrap_or(false),
            default: row.text("column_default"),
            collation: row.text("collation_name"),
        })
    }

    async fn fulltext_index(&self, table: &str, column: &str) -> Result<Probe, InspectError> {
        debug!(dialect = "mysql", table, column, "probing full text index");
        let exists = self
            .catalog
            .exists(FULLTEXT_INDEX, &self.params(&[table, column]))
            .await?;
        Ok(Probe::from_exists(exists))
    }
}
