//! Built-in task catalog: the product text index of the shop schema.

use dbsetup_core::config::Dialect;
use dbsetup_core::domain::ConfigError;
use dbsetup_core::tasks::{CreateFulltextIndex, CreateTable, DialectSql};
use dbsetup_core::TaskCatalog;

const INDEX_TEXT: &str = "
    CREATE TABLE mshop_index_text (
        id INTEGER NOT NULL,
        prodid INTEGER NOT NULL,
        siteid VARCHAR(255) NOT NULL,
        langid VARCHAR(5) NULL,
        url VARCHAR(255) NOT NULL,
        name VARCHAR(255) NOT NULL,
        content TEXT NOT NULL,
        mtime DATETIME NOT NULL,
        CONSTRAINT pk_msindte_id PRIMARY KEY (id)
    )
";

const INDEX_TEXT_SQLSRV: &str = "
    CREATE TABLE mshop_index_text (
        id INT NOT NULL,
        prodid INT NOT NULL,
        siteid NVARCHAR(255) NOT NULL,
        langid NVARCHAR(5) NULL,
        url NVARCHAR(255) NOT NULL,
        name NVARCHAR(255) NOT NULL,
        content NVARCHAR(MAX) NOT NULL,
        mtime DATETIME2 NOT NULL,
        CONSTRAINT pk_msindte_id PRIMARY KEY (id)
    )
";

const INDEX_TEXT_PGSQL: &str = "
    CREATE TABLE mshop_index_text (
        id INTEGER NOT NULL,
        prodid INTEGER NOT NULL,
        siteid VARCHAR(255) NOT NULL,
        langid VARCHAR(5) NULL,
        url VARCHAR(255) NOT NULL,
        name VARCHAR(255) NOT NULL,
        content TEXT NOT NULL,
        mtime TIMESTAMP NOT NULL,
        CONSTRAINT pk_msindte_id PRIMARY KEY (id)
    )
";

pub fn shop() -> Result<TaskCatalog, ConfigError> {
    let mut catalog = TaskCatalog::new();
    catalog.register(
        CreateTable::new(
            "TablesCreateMShop",
            "mshop_index_text",
            DialectSql::new(INDEX_TEXT)
                .with(Dialect::Pgsql, INDEX_TEXT_PGSQL)
                .with(Dialect::Sqlsrv, INDEX_TEXT_SQLSRV),
        )
        .on("db-product"),
    )?;
    catalog.register(
        CreateFulltextIndex::new("IndexCreateFulltext", "mshop_index_text", "content")
            .on("db-product")
            .after(&["TablesCreateMShop"]),
    )?;
    Ok(catalog)
}
