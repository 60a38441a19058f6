//! PostgreSQL inspector: `information_schema` plus `pg_indexes`.
//!
//! Catalog columns are cast to plain types so every driver can decode them.

use async_trait::async_trait;
use tracing::debug;

use super::{Catalog, column_length};
use crate::config::Dialect;
use crate::domain::{ColumnInfo, InspectError, Probe};
use crate::ports::{SchemaInspector, Value};

const TABLE_EXISTS: &str = "
    SELECT CAST(table_name AS VARCHAR) AS name
    FROM information_schema.tables
    WHERE table_schema = $1 AND table_name = $2
";

const COLUMN_EXISTS: &str = "
    SELECT CAST(column_name AS VARCHAR) AS name
    FROM information_schema.columns
    WHERE table_schema = $1 AND table_name = $2 AND column_name = $3
";

const INDEX_EXISTS: &str = "
    SELECT CAST(i.relname AS VARCHAR) AS name
    FROM pg_index x
    JOIN pg_class i ON i.oid = x.indexrelid
    JOIN pg_class t ON t.oid = x.indrelid
    JOIN pg_namespace n ON n.oid = t.relnamespace
    WHERE n.nspname = $1 AND t.relname = $2 AND i.relname = $3 AND NOT x.indisprimary
";

const CONSTRAINT_EXISTS: &str = "
    SELECT CAST(constraint_name AS VARCHAR) AS name
    FROM information_schema.table_constraints
    WHERE constraint_schema = $1 AND table_name = $2 AND constraint_name = $3
        AND constraint_type = 'FOREIGN KEY'
";

const SEQUENCE_EXISTS: &str = "
    SELECT CAST(sequence_name AS VARCHAR) AS name
    FROM information_schema.sequences
    WHERE sequence_schema = $1 AND sequence_name = $2
";

const COLUMN_DETAILS: &str = "
    SELECT CAST(table_name AS VARCHAR) AS table_name,
        CAST(column_name AS VARCHAR) AS column_name,
        CAST(data_type AS VARCHAR) AS data_type,
        CAST(character_maximum_length AS BIGINT) AS char_length,
        CAST(numeric_precision AS BIGINT) AS num_precision,
        CAST(column_default AS VARCHAR) AS column_default,
        CAST(is_nullable AS VARCHAR) AS is_nullable,
        CAST(collation_name AS VARCHAR) AS collation_name
    FROM information_schema.columns
    WHERE table_schema = $1 AND table_name = $2 AND column_name = $3
";

/// Full-text search in PostgreSQL is a GIN index over `to_tsvector(column)`.
/// The covered columns are read from the definitions in `tsvector_columns`.
const FULLTEXT_INDEXES: &str = "
    SELECT CAST(indexname AS VARCHAR) AS name, CAST(indexdef AS VARCHAR) AS indexdef
    FROM pg_indexes
    WHERE schemaname = $1 AND tablename = $2 AND indexdef ILIKE '%USING gin%'
";

pub struct PgsqlInspector {
    catalog: Catalog,
}

impl PgsqlInspector {
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
impl SchemaInspector for PgsqlInspector {
    fn dialect(&self) -> Dialect {
        Dialect::Pgsql
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
            length: column_length(&row, "char_length", "num_precision"),
            nullable: row.flag("is_nullable").unwrap_or(false),
            default: row.text("column_default"),
            collation: row.text("collation_name"),
        })
    }

    async fn fulltext_index(&self, table: &str, column: &str) -> Result<Probe, InspectError> {
        debug!(dialect = "pgsql", table, column, "probing full text index");
        let rows = self
            .catalog
            .fetch_all(FULLTEXT_INDEXES, &self.params(&[table]))
            .await?;
        let exists = rows
            .iter()
            .filter_map(|row| row.text("indexdef"))
            .any(|def| tsvector_columns(&def).iter().any(|c| c == column));
        Ok(Probe::from_exists(exists))
    }
}

/// Columns named in the document argument of every `to_tsvector(...)` call of
/// an index definition, e.g. `content` in
/// `USING gin (to_tsvector('english'::regconfig, (content)::text))`.
///
/// String literals, casts (`::text`) and function names are not columns.
fn tsvector_columns(indexdef: &str) -> Vec<String> {
    let lower = indexdef.to_ascii_lowercase();
    let mut columns = Vec::new();
    let mut from = 0;
    while let Some(pos) = lower[from..].find("to_tsvector(") {
        let start = from + pos + "to_tsvector(".len();
        let args = call_arguments(&indexdef[start..]);
        from = start + args.len();
        if let Some(document) = split_arguments(args).last() {
            columns.extend(identifiers(document));
        }
    }
    columns
}

/// Text up to the parenthesis closing an already opened call.
fn call_arguments(rest: &str) -> &str {
    let mut depth = 0usize;
    let mut quoted = false;
    for (idx, ch) in rest.char_indices() {
        match ch {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted && depth == 0 => return &rest[..idx],
            ')' if !quoted => depth -= 1,
            _ => {}
        }
    }
    rest
}

fn split_arguments(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let (mut depth, mut quoted, mut begin) = (0usize, false, 0);
    for (idx, ch) in args.char_indices() {
        match ch {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth = depth.saturating_sub(1),
            ',' if !quoted && depth == 0 => {
                parts.push(&args[begin..idx]);
                begin = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&args[begin..]);
    parts
}

fn identifiers(expr: &str) -> Vec<String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut found = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                i += 1;
            }
            i += 1;
        } else if c == '"' || c.is_alphabetic() || c == '_' {
            let cast = i >= 2 && chars[i - 2..i] == [':', ':'];
            let (word, end) = if c == '"' {
                let end = chars[i + 1..]
                    .iter()
                    .position(|ch| *ch == '"')
                    .map_or(chars.len(), |p| i + 1 + p);
                (chars[i + 1..end].iter().collect::<String>(), end + 1)
            } else {
                let mut end = i;
                while end < chars.len() && (chars[end].is_alphanumeric() || matches!(chars[end], '_' | '$')) {
                    end += 1;
                }
                (chars[i..end].iter().collect::<String>(), end)
            };
            let call = chars[end.min(chars.len())..]
                .iter()
                .find(|ch| !ch.is_whitespace())
                == Some(&'(');
            if !cast && !call {
                found.push(word);
            }
            i = end;
        } else {
            i += 1;
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_columns_of_normalized_definitions() {
        let def = "CREATE INDEX idx_text ON public.mshop_index_text \
                   USING gin (to_tsvector('english'::regconfig, (content)::text))";
        assert_eq!(tsvector_columns(def), vec!["content".to_string()]);

        let def = "CREATE INDEX idx ON public.t USING gin (to_tsvector('simple'::regconfig, content_long))";
        assert_eq!(tsvector_columns(def), vec!["content_long".to_string()]);
    }

    #[test]
    fn prefix_of_a_column_is_not_that_column() {
        let def = "CREATE INDEX idx ON public.t USING gin (to_tsvector('english'::regconfig, content_long))";
        assert!(!tsvector_columns(def).iter().any(|c| c == "content"));
    }

    #[test]
    fn concatenated_and_quoted_columns() {
        let def = r#"CREATE INDEX idx ON public.t USING gin (to_tsvector('english'::regconfig, ((COALESCE(label, ''::text) || ' '::text) || ("Content")::text)))"#;
        assert_eq!(tsvector_columns(def), vec!["label".to_string(), "Content".to_string()]);
    }

    #[test]
    fn other_gin_indexes_cover_nothing() {
        assert!(tsvector_columns("CREATE INDEX idx ON public.t USING gin (tags)").is_empty());
    }
}
