//! Answers the catalog queries the dialect inspectors and setup tasks issue.
//!
//! Queries are recognised by the catalog view they read, not parsed. A query
//! for a schema other than the server's own yields no rows.

use super::state::{MemoryColumn, MemoryTable, ServerState};
use crate::domain::ConnectionError;
use crate::ports::{Row, Value};

fn param(params: &[Value], idx: usize) -> String {
    params.get(idx).and_then(Value::as_text).unwrap_or_default()
}

fn name_row(name: &str) -> Vec<Row> {
    vec![Row::new().with("name", name)]
}

fn rows_if(found: bool, name: &str) -> Vec<Row> {
    if found { name_row(name) } else { Vec::new() }
}

fn details_row(table: &str, column: &MemoryColumn) -> Row {
    Row::new()
        .with("table_name", table)
        .with("column_name", column.name.as_str())
        .with("data_type", column.data_type.as_str())
        .with("char_length", column.length)
        .with("max_length", column.length)
        .with("num_precision", 0_i64)
        .with("column_default", column.default.clone())
        .with("is_nullable", if column.nullable { "YES" } else { "NO" })
        .with("collation_name", column.collation.clone())
}

/// Evaluate a read-only catalog query.
pub(super) fn query(state: &ServerState, sql: &str, params: &[Value]) -> Result<Vec<Row>, ConnectionError> {
    let q = sql.to_ascii_lowercase();

    // Queries without a leading schema parameter.
    if q.contains("sys.fulltext_catalogs") {
        let name = param(params, 0);
        return Ok(rows_if(state.snapshot.fulltext_catalogs.contains(&name), &name));
    }
    if q.contains("sys.fulltext_indexes") {
        return fulltext_by_object(state, params);
    }

    if param(params, 0) != state.schema {
        return Ok(Vec::new());
    }
    let table_name = param(params, 1);
    let table = state.table(&table_name);
    let third = param(params, 2);

    let rows = if q.contains("is_primary_key = 1") {
        table
            .and_then(|t| t.primary_key.as_deref())
            .map(name_row)
            .unwrap_or_default()
    } else if q.contains("sys.types") || (q.contains("information_schema.columns") && q.contains("data_type")) {
        table
            .and_then(|t| t.column(&third))
            .map(|c| vec![details_row(&table_name, c)])
            .unwrap_or_default()
    } else if q.contains("sys.columns") || q.contains("information_schema.columns") {
        rows_if(table.is_some_and(|t| t.column(&third).is_some()), &third)
    } else if q.contains("sys.indexes") || q.contains("indisprimary") {
        rows_if(table.is_some_and(|t| t.has_index(&third)), &third)
    } else if q.contains("sys.foreign_keys") {
        rows_if(table.is_some_and(|t| t.foreign_keys.contains(&third)), &third)
    } else if q.contains("table_constraints") {
        rows_if(table.is_some_and(|t| t.has_constraint(&third)), &third)
    } else if q.contains("sys.sequences") || q.contains("information_schema.sequences") {
        rows_if(state.snapshot.sequences.contains(&table_name), &table_name)
    } else if q.contains("information_schema.statistics") {
        if q.contains("fulltext") {
            rows_if(table.is_some_and(|t| t.fulltext.contains(&third)), &third)
        } else {
            rows_if(table.is_some_and(|t| t.has_index(&third)), &third)
        }
    } else if q.contains("pg_indexes") && q.contains("using gin") {
        table
            .map(|t| {
                t.text_search
                    .iter()
                    .map(|(name, def)| Row::new().with("name", name.as_str()).with("indexdef", def.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    } else if q.contains("sys.tables") || q.contains("information_schema.tables") {
        rows_if(table.is_some(), &table_name)
    } else {
        return Err(ConnectionError::Query(format!("unsupported catalog query: {}", sql.trim())));
    };
    Ok(rows)
}

/// `sys.fulltext_indexes` lookup keyed by `OBJECT_ID('schema.table')`.
fn fulltext_by_object(state: &ServerState, params: &[Value]) -> Result<Vec<Row>, ConnectionError> {
    if !state.fulltext_installed {
        return Err(ConnectionError::Query("Full-Text Search is not installed".into()));
    }
    let object = param(params, 0);
    let column = param(params, 1);
    let table: Option<&MemoryTable> = match object.split_once('.') {
        Some((schema, table)) if schema == state.schema => state.table(table),
        Some(_) => None,
        None => state.table(&object),
    };
    Ok(match table {
        Some(t) if t.fulltext.contains(&column) => vec![Row::new().with("object_id", 1_i64)],
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::memory::ddl;

    fn seeded() -> ServerState {
        let mut state = ServerState::new("shop");
        ddl::apply(
            &mut state,
            "CREATE TABLE items (id INT NOT NULL, label VARCHAR(64) NULL, CONSTRAINT pk_items PRIMARY KEY (id))",
        )
        .unwrap();
        state
    }

    fn params(values: &[&str]) -> Vec<Value> {
        values.iter().copied().map(Value::from).collect()
    }

    #[test]
    fn other_schema_sees_nothing() {
        let state = seeded();
        let rows = query(
            &state,
            "SELECT name FROM information_schema.tables WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?",
            &params(&["other", "items"]),
        )
        .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn column_details_superset_row() {
        let state = seeded();
        let rows = query(
            &state,
            "SELECT DATA_TYPE FROM information_schema.columns WHERE a = ? AND b = ? AND c = ?",
            &params(&["shop", "items", "label"]),
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].int("char_length"), Some(64));
        assert_eq!(rows[0].flag("is_nullable"), Some(true));
    }

    #[test]
    fn primary_key_lookup() {
        let state = seeded();
        let rows = query(
            &state,
            "SELECT i.name FROM sys.indexes i WHERE @P1 AND @P2 AND i.is_primary_key = 1",
            &params(&["shop", "items"]),
        )
        .unwrap();
        assert_eq!(rows[0].text("name").as_deref(), Some("pk_items"));
    }

    #[test]
    fn primary_key_is_not_a_secondary_index() {
        let state = seeded();
        let rows = query(
            &state,
            "SELECT i.name FROM sys.indexes i WHERE @P1 AND @P2 AND i.name = @P3 AND i.is_primary_key = 0",
            &params(&["shop", "items", "pk_items"]),
        )
        .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn gin_definitions_are_listed_verbatim() {
        let mut state = seeded();
        ddl::apply(
            &mut state,
            "CREATE INDEX idx_items_label ON items USING gin (to_tsvector('simple', label))",
        )
        .unwrap();
        let rows = query(
            &state,
            "SELECT indexname, indexdef FROM pg_indexes WHERE $1 AND $2 AND indexdef ILIKE '%USING gin%'",
            &params(&["shop", "items"]),
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].text("indexdef").as_deref(),
            Some("CREATE INDEX idx_items_label ON shop.items USING gin (to_tsvector('simple'::regconfig, (label)::text))")
        );
    }

    #[test]
    fn fulltext_lookup_fails_when_not_installed() {
        let mut state = seeded();
        state.fulltext_installed = false;
        let err = query(&state, "SELECT 1 FROM sys.fulltext_indexes", &params(&["shop.items", "label"]))
            .unwrap_err();
        assert!(!err.is_object_not_found());
    }

    #[test]
    fn unknown_query_is_an_error() {
        let state = seeded();
        assert!(query(&state, "SELECT 1", &params(&["shop"])).is_err());
    }
}
