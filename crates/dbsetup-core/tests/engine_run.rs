mod common;

use std::sync::Arc;

use async_trait::async_trait;
use rstest::rstest;

use dbsetup_core::config::Dialect;
use dbsetup_core::domain::{ConnectionError, Outcome, TaskError, task_names};
use dbsetup_core::impls::{MemoryConnector, MemoryServer};
use dbsetup_core::{ConfigError, EngineBuilder, RunState, Task, TaskContext, TaskName, TaskStatus};

use common::{SCHEMA, engine, resources};

const ORDER: &[&str] = &[
    "TablesCreateProduct",
    "TablesCreateIndex",
    "IndexCreateFulltext",
    "ForeignKeyIndexProduct",
    "ColumnAddProductStatus",
    "IndexCreateProductCode",
    "SequenceCreateOrder",
];

#[rstest]
#[case::mysql(Dialect::Mysql)]
#[case::pgsql(Dialect::Pgsql)]
#[case::sqlsrv(Dialect::Sqlsrv)]
#[tokio::test]
async fn second_run_is_a_noop(#[case] dialect: Dialect) {
    let server = MemoryServer::new(SCHEMA);
    let mut engine = engine(dialect, &server);

    let first = engine.run().await.unwrap();
    assert!(first.completed, "first run failed: {:?}", first.error);
    assert_eq!(engine.state(), RunState::Completed);
    for name in ORDER {
        let expected = if dialect == Dialect::Mysql && *name == "SequenceCreateOrder" {
            TaskStatus::Ok
        } else {
            TaskStatus::Done
        };
        assert_eq!(first.status_of(name), Some(expected), "{name}");
    }
    assert!(server.has_fulltext("mshop_index_text", "content"));
    assert!(server.has_column("mshop_product", "status"));
    assert!(server.has_constraint("mshop_index_text", "fk_msindte_prodid"));

    let snapshot = server.snapshot();
    server.clear_statements();

    let second = engine.run().await.unwrap();
    assert!(second.completed);
    assert_eq!(second.count(TaskStatus::Ok), ORDER.len());
    assert!(server.ddl_statements().is_empty(), "{:?}", server.ddl_statements());
    assert_eq!(server.snapshot(), snapshot);
    assert_eq!(engine.pool().total_in_use(), 0);
}

#[tokio::test]
async fn order_respects_dependencies() {
    let server = MemoryServer::new(SCHEMA);
    let mut engine = engine(Dialect::Pgsql, &server);

    assert_eq!(engine.plan().unwrap(), task_names(ORDER));
    let report = engine.run().await.unwrap();
    let executed: Vec<TaskName> = report.tasks.iter().map(|t| t.name.clone()).collect();
    assert_eq!(executed, task_names(ORDER));
}

#[rstest]
#[case::mysql(Dialect::Mysql)]
#[case::sqlsrv(Dialect::Sqlsrv)]
#[tokio::test]
async fn failure_aborts_and_rerun_resumes(#[case] dialect: Dialect) {
    let server = MemoryServer::new(SCHEMA);
    server.fail_on(
        "ALTER TABLE mshop_product ADD status",
        ConnectionError::Query("lock wait timeout exceeded".into()),
    );
    let mut engine = engine(dialect, &server);

    let report = engine.run().await.unwrap();
    assert!(!report.completed);
    assert_eq!(engine.state(), RunState::Aborted);
    assert_eq!(report.failed_task, Some("ColumnAddProductStatus".into()));
    assert!(report.error.as_deref().unwrap().contains("lock wait timeout"));
    for name in &ORDER[..4] {
        assert_eq!(report.status_of(name), Some(TaskStatus::Done), "{name}");
    }
    assert_eq!(report.status_of("ColumnAddProductStatus"), Some(TaskStatus::Failed));
    assert_eq!(report.status_of("IndexCreateProductCode"), Some(TaskStatus::Pending));
    assert_eq!(report.status_of("SequenceCreateOrder"), Some(TaskStatus::Pending));
    assert!(!server.has_index("mshop_product", "unq_msprod_code"));

    let failure = engine.take_failure().unwrap();
    assert_eq!(failure.task.as_str(), "ColumnAddProductStatus");
    assert!(matches!(failure.cause, TaskError::Connection(_)));

    // state is re-derived from the schema
    let rerun = engine.run().await.unwrap();
    assert!(rerun.completed);
    for name in &ORDER[..4] {
        assert_eq!(rerun.status_of(name), Some(TaskStatus::Ok), "{name}");
    }
    assert_eq!(rerun.status_of("ColumnAddProductStatus"), Some(TaskStatus::Done));
    assert_eq!(rerun.status_of("IndexCreateProductCode"), Some(TaskStatus::Done));
}

#[tokio::test]
async fn sqlsrv_without_fulltext_search_aborts() {
    let server = MemoryServer::new(SCHEMA);
    server.set_fulltext_installed(false);
    let mut engine = engine(Dialect::Sqlsrv, &server);

    let report = engine.run().await.unwrap();
    assert_eq!(report.failed_task, Some("IndexCreateFulltext".into()));
    assert!(report.error.as_deref().unwrap().contains("mshop_index_text.content"));
    assert!(server.has_table("mshop_index_text"));
    assert!(!server.has_constraint("mshop_index_text", "fk_msindte_prodid"));
}

#[tokio::test]
async fn sqlsrv_not_found_probe_creates_index() {
    let server = MemoryServer::new(SCHEMA);
    server.fail_on(
        "sys.fulltext_indexes",
        ConnectionError::ObjectNotFound("mshop_index_text".into()),
    );
    let mut engine = engine(Dialect::Sqlsrv, &server);

    let report = engine.run().await.unwrap();
    assert!(report.completed);
    assert_eq!(report.status_of("IndexCreateFulltext"), Some(TaskStatus::Done));
    assert!(server.has_fulltext_catalog("aimeos"));
}

struct Declared {
    name: &'static str,
    pre: &'static [&'static str],
}

#[async_trait]
impl Task for Declared {
    fn name(&self) -> TaskName {
        self.name.into()
    }

    fn pre_dependencies(&self) -> Vec<TaskName> {
        task_names(self.pre)
    }

    async fn migrate(&self, ctx: &TaskContext) -> Result<Outcome, TaskError> {
        ctx.execute("db", "CREATE TABLE should_not_run (id INT)").await?;
        Ok(Outcome::Done)
    }
}

#[rstest]
#[case::cycle(&[Declared { name: "a", pre: &["b"] }, Declared { name: "b", pre: &["a"] }])]
#[case::unknown(&[Declared { name: "a", pre: &["missing"] }])]
#[tokio::test]
async fn configuration_errors_run_nothing(#[case] tasks: &'static [Declared]) {
    let server = MemoryServer::new(SCHEMA);
    let mut builder = EngineBuilder::new(
        resources(Dialect::Mysql),
        Arc::new(MemoryConnector::new(server.clone())),
    );
    for task in tasks {
        builder = builder
            .register(Declared {
                name: task.name,
                pre: task.pre,
            })
            .unwrap();
    }

    let err = builder.build().err().unwrap();
    assert!(matches!(
        err,
        ConfigError::CyclicDependency { .. } | ConfigError::UnknownDependency { .. }
    ));
    assert_eq!(server.connects(), 0);
    assert!(server.statements().is_empty());
}

#[tokio::test]
async fn report_serializes_for_operators() {
    let server = MemoryServer::new(SCHEMA);
    let mut engine = engine(Dialect::Mysql, &server);
    let report = engine.run().await.unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["completed"], true);
    assert_eq!(json["tasks"][0]["name"], "TablesCreateProduct");
    assert_eq!(json["tasks"][0]["status"], "done");
    assert!(json.get("failed_task").is_none());
}
