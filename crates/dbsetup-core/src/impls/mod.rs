//! Impls - connector implementations.
//!
//! - **MemoryConnector**: in-process database for tests and `--memory` dry runs
//! - **SqlxConnector**: MySQL / PostgreSQL through sqlx
//! - **TiberiusConnector**: SQL Server through tiberius
//! - **DriverConnector**: picks sqlx or tiberius from the resource's adapter

mod driver;
pub mod memory;
mod sqlx_driver;
mod tiberius_driver;

pub use self::driver::DriverConnector;
pub use self::memory::{MemoryConnector, MemoryServer, SchemaSnapshot};
pub use self::sqlx_driver::SqlxConnector;
pub use self::tiberius_driver::TiberiusConnector;
