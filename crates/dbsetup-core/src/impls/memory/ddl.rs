//! Applies the DDL subset used by setup tasks to the in-memory schema.
//!
//! Supported:
//! - `CREATE TABLE name (columns, constraints)`
//! - `CREATE [UNIQUE] INDEX name ON table [USING method] (...)`
//! - `CREATE SEQUENCE name`
//! - `CREATE FULLTEXT CATALOG name`
//! - `CREATE FULLTEXT INDEX ON table (cols) KEY INDEX pk ON catalog`
//! - `ALTER TABLE name ADD [COLUMN] | ADD CONSTRAINT | ADD FULLTEXT | ADD INDEX`
//!
//! Creating an object that already exists fails, like a real server does.
//! Statements that are not DDL (`SET`, `INSERT`, ...) are accepted and ignored.

use super::sql::{Cursor, Token, referenced_columns, split_top_level, syntax, tokenize};
use super::state::{MemoryColumn, MemoryTable, ServerState};
use crate::domain::ConnectionError;

fn exists(kind: &str, name: &str) -> ConnectionError {
    ConnectionError::Query(format!("{kind} '{name}' already exists"))
}

/// Apply every `;`-separated statement in `sql`.
pub(super) fn apply(state: &mut ServerState, sql: &str) -> Result<u64, ConnectionError> {
    let tokens = tokenize(sql)?;
    for statement in split_top_level(&tokens, ';') {
        apply_statement(state, &statement)?;
    }
    Ok(0)
}

fn apply_statement(state: &mut ServerState, tokens: &[Token]) -> Result<(), ConnectionError> {
    let mut cur = Cursor::new(tokens);
    if cur.eat_kw("CREATE") {
        if cur.eat_kw("TABLE") {
            return create_table(state, &mut cur);
        }
        if cur.eat_kw("SEQUENCE") {
            let name = cur.ident()?;
            if !state.snapshot.sequences.insert(name.clone()) {
                return Err(exists("sequence", &name));
            }
            return Ok(());
        }
        if cur.eat_kw("FULLTEXT") {
            return create_fulltext(state, &mut cur);
        }
        let unique = cur.eat_kw("UNIQUE");
        cur.eat_kw("CLUSTERED");
        cur.eat_kw("NONCLUSTERED");
        if cur.eat_kw("INDEX") {
            return create_index(state, &mut cur, unique);
        }
        return Err(syntax("unsupported CREATE statement"));
    }
    if cur.eat_kw("ALTER") {
        cur.expect_kw("TABLE")?;
        return alter_table(state, &mut cur);
    }
    if cur.peek_kw("DROP") {
        return Err(syntax("DROP is not supported"));
    }
    Ok(())
}

fn create_table(state: &mut ServerState, cur: &mut Cursor<'_>) -> Result<(), ConnectionError> {
    let if_not_exists = if cur.eat_kw("IF") {
        cur.expect_kw("NOT")?;
        cur.expect_kw("EXISTS")?;
        true
    } else {
        false
    };
    let name = cur.ident()?;
    if state.table(&name).is_some() {
        return if if_not_exists { Ok(()) } else { Err(exists("table", &name)) };
    }

    let mut table = MemoryTable::default();
    for item in split_top_level(cur.group()?, ',') {
        table_item(&name, &mut table, &item)?;
    }
    state.snapshot.tables.insert(name, table);
    Ok(())
}

/// One entry of a `CREATE TABLE` body or an `ALTER TABLE .. ADD` clause.
fn table_item(table_name: &str, table: &mut MemoryTable, tokens: &[Token]) -> Result<(), ConnectionError> {
    let mut cur = Cursor::new(tokens);

    let constraint = if cur.eat_kw("CONSTRAINT") { Some(cur.ident()?) } else { None };
    if cur.eat_kw("PRIMARY") {
        cur.expect_kw("KEY")?;
        let name = constraint.unwrap_or_else(|| format!("pk_{table_name}"));
        if table.primary_key.is_some() {
            return Err(exists("primary key on", table_name));
        }
        table.primary_key = Some(name);
        return Ok(());
    }
    if cur.eat_kw("FOREIGN") {
        let name = constraint.ok_or_else(|| syntax("foreign keys must be named"))?;
        if !table.foreign_keys.insert(name.clone()) {
            return Err(exists("constraint", &name));
        }
        return Ok(());
    }
    if cur.peek_kw("UNIQUE") || cur.peek_kw("KEY") || cur.peek_kw("INDEX") || cur.peek_kw("FULLTEXT") {
        let unique = cur.eat_kw("UNIQUE");
        let fulltext = cur.eat_kw("FULLTEXT");
        let _ = cur.eat_kw("KEY") || cur.eat_kw("INDEX");
        let name = match (constraint, cur.peek()) {
            (Some(name), _) => name,
            (None, Some(Token::Sym('('))) => format!("{table_name}_idx{}", table.indexes.len()),
            (None, _) => cur.ident()?,
        };
        let columns = cur.ident_list()?;
        if table.names_index(&name) {
            return Err(exists("index", &name));
        }
        table.indexes.insert(name.clone());
        if unique {
            table.unique.insert(name);
        }
        if fulltext {
            table.fulltext.extend(columns);
        }
        return Ok(());
    }
    if constraint.is_some() {
        return Err(syntax("unsupported constraint"));
    }

    cur.eat_kw("COLUMN");
    let column = column_def(table_name, table, &mut cur)?;
    if table.column(&column.name).is_some() {
        return Err(exists("column", &column.name));
    }
    table.columns.push(column);
    Ok(())
}

fn column_def(
    table_name: &str,
    table: &mut MemoryTable,
    cur: &mut Cursor<'_>,
) -> Result<MemoryColumn, ConnectionError> {
    let name = cur.ident()?;
    let data_type = match cur.next() {
        Some(Token::Word(w)) | Some(Token::Quoted(w)) => w.to_ascii_lowercase(),
        _ => return Err(syntax(format!("missing type for column {name}"))),
    };
    let mut length = None;
    if cur.peek() == Some(&Token::Sym('(')) {
        length = cur.group()?.iter().find_map(|t| match t {
            Token::Num(n) => n.parse::<i64>().ok(),
            _ => None,
        });
    }

    let mut column = MemoryColumn {
        name,
        data_type,
        length,
        nullable: true,
        default: None,
        collation: None,
    };

    while let Some(token) = cur.next() {
        match token {
            Token::Word(w) if w.eq_ignore_ascii_case("NOT") => {
                cur.expect_kw("NULL")?;
                column.nullable = false;
            }
            Token::Word(w) if w.eq_ignore_ascii_case("NULL") => column.nullable = true,
            Token::Word(w) if w.eq_ignore_ascii_case("DEFAULT") => {
                column.default = match cur.next() {
                    Some(Token::Str(s)) | Some(Token::Num(s)) | Some(Token::Word(s)) => Some(s.clone()),
                    _ => None,
                };
            }
            Token::Word(w) if w.eq_ignore_ascii_case("COLLATE") => {
                column.collation = Some(cur.ident()?);
            }
            Token::Word(w) if w.eq_ignore_ascii_case("PRIMARY") => {
                cur.expect_kw("KEY")?;
                column.nullable = false;
                table.primary_key = Some(format!("pk_{table_name}"));
            }
            Token::Sym('(') => {
                // IDENTITY(1,1) and similar
                while let Some(t) = cur.next() {
                    if t == &Token::Sym(')') {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(column)
}

fn create_index(state: &mut ServerState, cur: &mut Cursor<'_>, unique: bool) -> Result<(), ConnectionError> {
    let name = cur.ident()?;
    cur.expect_kw("ON")?;
    let table_name = cur.ident()?;
    let method = if cur.eat_kw("USING") { Some(cur.ident()?.to_ascii_lowercase()) } else { None };
    let expr = cur.group()?;

    let schema = state.schema.clone();
    let table = state.table_mut(&table_name)?;
    if table.names_index(&name) {
        return Err(exists("index", &name));
    }
    table.indexes.insert(name.clone());
    if unique {
        table.unique.insert(name.clone());
    }
    let is_text_search = expr
        .iter()
        .any(|t| matches!(t, Token::Word(w) if w.eq_ignore_ascii_case("to_tsvector")));
    if method.as_deref() == Some("gin") && is_text_search {
        let columns = referenced_columns(expr);
        let config = expr
            .iter()
            .find_map(|t| match t {
                Token::Str(s) => Some(s.as_str()),
                _ => None,
            })
            .unwrap_or("english");
        let definition = render_text_search(&name, &schema, &table_name, config, &columns);
        table.text_search.insert(name, definition);
        table.fulltext.extend(columns);
    }
    Ok(())
}

/// Index definition in the normalized form `pg_indexes.indexdef` reports.
fn render_text_search(name: &str, schema: &str, table: &str, config: &str, columns: &[String]) -> String {
    let document = columns
        .iter()
        .map(|c| format!("({c})::text"))
        .collect::<Vec<_>>()
        .join(" || ' '::text || ");
    format!("CREATE INDEX {name} ON {schema}.{table} USING gin (to_tsvector('{config}'::regconfig, {document}))")
}

fn create_fulltext(state: &mut ServerState, cur: &mut Cursor<'_>) -> Result<(), ConnectionError> {
    if !state.fulltext_installed {
        return Err(ConnectionError::Query("Full-Text Search is not installed".into()));
    }
    if cur.eat_kw("CATALOG") {
        let name = cur.ident()?;
        if !state.snapshot.fulltext_catalogs.insert(name.clone()) {
            return Err(exists("full-text catalog", &name));
        }
        return Ok(());
    }

    cur.expect_kw("INDEX")?;
    cur.expect_kw("ON")?;
    let table_name = cur.ident()?;
    let columns = cur.ident_list()?;
    cur.expect_kw("KEY")?;
    cur.expect_kw("INDEX")?;
    let key_index = cur.ident()?;
    let catalog = if cur.eat_kw("ON") { Some(cur.ident()?) } else { None };

    if let Some(catalog) = &catalog
        && !state.snapshot.fulltext_catalogs.contains(catalog)
    {
        return Err(ConnectionError::ObjectNotFound(format!("full-text catalog '{catalog}'")));
    }
    let table = state.table_mut(&table_name)?;
    if table.primary_key.as_deref() != Some(key_index.as_str()) {
        return Err(ConnectionError::Query(format!(
            "'{key_index}' is not a valid index to enforce a full-text search key"
        )));
    }
    if !table.fulltext.is_empty() {
        return Err(exists("full-text index on table", &table_name));
    }
    table.fulltext.extend(columns);
    Ok(())
}

fn alter_table(state: &mut ServerState, cur: &mut Cursor<'_>) -> Result<(), ConnectionError> {
    let table_name = cur.ident()?;
    cur.expect_kw("ADD")?;

    let rest: Vec<Token> = std::iter::from_fn(|| cur.next().cloned()).collect();
    let table = state.table_mut(&table_name)?;
    table_item(&table_name, table, &rest)
}
