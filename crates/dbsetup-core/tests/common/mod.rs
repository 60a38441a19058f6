#![allow(dead_code)]

use std::sync::Arc;

use dbsetup_core::config::{Dialect, ResourceConfig, ResourceMap};
use dbsetup_core::impls::{MemoryConnector, MemoryServer};
use dbsetup_core::tasks::{
    AddColumn, AddForeignKey, CreateFulltextIndex, CreateIndex, CreateSequence, CreateTable, DialectSql,
};
use dbsetup_core::{EngineBuilder, MigrationEngine, TaskCatalog};

pub const SCHEMA: &str = "shop";

pub fn resources(dialect: Dialect) -> ResourceMap {
    ResourceMap::new().with(
        "db",
        ResourceConfig::new(dialect, "shop")
            .with_schema(SCHEMA)
            .with_stmt(match dialect {
                Dialect::Mysql => "SET SESSION sql_mode='ANSI'",
                Dialect::Pgsql => "SET TIME ZONE 'UTC'",
                Dialect::Sqlsrv => "SET DATEFORMAT ymd",
            }),
    )
}

/// Task catalog of a small shop schema, registered out of dependency order.
///
/// Resolved order:
/// TablesCreateProduct, TablesCreateIndex, IndexCreateFulltext,
/// ForeignKeyIndexProduct, ColumnAddProductStatus, IndexCreateProductCode,
/// SequenceCreateOrder
pub fn shop_catalog() -> TaskCatalog {
    let mut catalog = TaskCatalog::new();
    catalog
        .register(
            CreateFulltextIndex::new("IndexCreateFulltext", "mshop_index_text", "content")
                .on("db-product")
                .after(&["TablesCreateIndex"]),
        )
        .unwrap();
    catalog
        .register(
            AddForeignKey::new(
                "ForeignKeyIndexProduct",
                "mshop_index_text",
                "fk_msindte_prodid",
                "ALTER TABLE mshop_index_text ADD CONSTRAINT fk_msindte_prodid \
                 FOREIGN KEY (prodid) REFERENCES mshop_product (id)",
            )
            .on("db-product")
            .after(&["TablesCreateIndex"]),
        )
        .unwrap();
    catalog
        .register(
            CreateTable::new(
                "TablesCreateIndex",
                "mshop_index_text",
                DialectSql::new(
                    "CREATE TABLE mshop_index_text (
                        id INTEGER NOT NULL,
                        prodid INTEGER NOT NULL,
                        content VARCHAR(255) NOT NULL,
                        CONSTRAINT pk_msindte_id PRIMARY KEY (id)
                    )",
                )
                .with(
                    Dialect::Sqlsrv,
                    "CREATE TABLE mshop_index_text (
                        id INT NOT NULL,
                        prodid INT NOT NULL,
                        content NVARCHAR(255) NOT NULL,
                        CONSTRAINT pk_msindte_id PRIMARY KEY (id)
                    )",
                ),
            )
            .on("db-product")
            .after(&["TablesCreateProduct"]),
        )
        .unwrap();
    catalog
        .register(
            AddColumn::new(
                "ColumnAddProductStatus",
                "mshop_product",
                "status",
                "ALTER TABLE mshop_product ADD status SMALLINT NOT NULL DEFAULT 1",
            )
            .after(&["TablesCreateProduct"]),
        )
        .unwrap();
    catalog
        .register(
            CreateIndex::new(
                "IndexCreateProductCode",
                "mshop_product",
                "unq_msprod_code",
                "CREATE UNIQUE INDEX unq_msprod_code ON mshop_product (code)",
            )
            .after(&["TablesCreateProduct"]),
        )
        .unwrap();
    catalog
        .register(CreateTable::new(
            "TablesCreateProduct",
            "mshop_product",
            "CREATE TABLE mshop_product (
                id INTEGER NOT NULL,
                code VARCHAR(64) NOT NULL,
                label VARCHAR(255) NULL DEFAULT '' COLLATE utf8mb4_bin,
                CONSTRAINT pk_msprod_id PRIMARY KEY (id)
            )",
        ))
        .unwrap();
    catalog
        .register(CreateSequence::new(
            "SequenceCreateOrder",
            "seq_mshop_order",
            "CREATE SEQUENCE seq_mshop_order",
        ))
        .unwrap();
    catalog
}

pub fn engine(dialect: Dialect, server: &MemoryServer) -> MigrationEngine {
    EngineBuilder::new(resources(dialect), Arc::new(MemoryConnector::new(server.clone())))
        .catalog(shop_catalog())
        .unwrap()
        .build()
        .unwrap()
}
