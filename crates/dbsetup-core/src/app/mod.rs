//! App - engine wiring and the run loop.
//!
//! - **EngineBuilder**: registration and fail-fast validation
//! - **MigrationEngine**: resolves the order and runs tasks sequentially

pub mod builder;
pub mod engine;

pub use self::builder::EngineBuilder;
pub use self::engine::MigrationEngine;
