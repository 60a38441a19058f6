//! SchemaInspector port - read-only questions about the live schema.

use async_trait::async_trait;

use crate::config::Dialect;
use crate::domain::{ColumnInfo, InspectError, Probe};

/// Existence and shape queries, implemented once per SQL dialect.
///
/// Every implementation answers the same questions identically for the same
/// logical schema, even though the catalog queries differ. Each call borrows a
/// pooled connection and returns it before the call completes.
#[async_trait]
pub trait SchemaInspector: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// `mysql`, `pgsql` or `sqlsrv`.
    fn dialect_name(&self) -> &'static str {
        self.dialect().name()
    }

    /// Schema (or database) the queries are scoped to.
    fn schema_name(&self) -> &str;

    async fn table_exists(&self, table: &str) -> Result<bool, InspectError>;

    async fn column_exists(&self, table: &str, column: &str) -> Result<bool, InspectError>;

    /// Secondary indexes, including those backing UNIQUE constraints.
    ///
    /// Primary keys are never matched: MySQL does not keep their names.
    async fn index_exists(&self, table: &str, index: &str) -> Result<bool, InspectError>;

    /// Foreign-key constraints only.
    async fn constraint_exists(&self, table: &str, constraint: &str) -> Result<bool, InspectError>;

    /// Always `false` for dialects without sequences.
    async fn sequence_exists(&self, sequence: &str) -> Result<bool, InspectError>;

    /// Fails with `InspectError::UnknownColumn` if the table or column is absent.
    async fn column_details(&self, table: &str, column: &str) -> Result<ColumnInfo, InspectError>;

    /// Probe for a full-text index covering `column`.
    async fn fulltext_index(&self, table: &str, column: &str) -> Result<Probe, InspectError>;
}
