//! Task contract - named, idempotent units of schema work.
//!
//! - `Task`: declares its name, ordering dependencies and `migrate()`
//! - `TaskContext`: what `migrate()` may touch (pool, inspectors, messages)
//! - `TaskCatalog`: ordered registry; registration order breaks ordering ties

mod catalog;
mod context;

pub use catalog::TaskCatalog;
pub use context::TaskContext;

use async_trait::async_trait;

use crate::domain::{Outcome, TaskError, TaskName};

/// A unit of schema migration work.
///
/// `migrate()` must check the live schema first and return `Outcome::Ok`
/// without issuing DDL when the change is already present. Only when the
/// structure is absent does it apply the change and return `Outcome::Done`,
/// so a second run over the same catalog is a no-op.
///
/// # Example
/// ```ignore
/// struct TablesCreateProduct;
///
/// #[async_trait]
/// impl Task for TablesCreateProduct {
///     fn name(&self) -> TaskName { "TablesCreateProduct".into() }
///
///     async fn migrate(&self, ctx: &TaskContext) -> Result<Outcome, TaskError> {
///         if ctx.inspector("db-product")?.table_exists("mshop_product").await? {
///             return Ok(Outcome::Ok);
///         }
///         ctx.execute("db-product", "CREATE TABLE mshop_product (id INT)").await?;
///         Ok(Outcome::Done)
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> TaskName;

    /// Tasks that must run before this one.
    fn pre_dependencies(&self) -> Vec<TaskName> {
        Vec::new()
    }

    /// Tasks that must run after this one.
    fn post_dependencies(&self) -> Vec<TaskName> {
        Vec::new()
    }

    async fn migrate(&self, ctx: &TaskContext) -> Result<Outcome, TaskError>;
}
