//! Ports - seams to the outside world.
//!
//! - `Connection` / `Connector`: live database access
//! - `SchemaInspector`: dialect-specific schema introspection
//! - `Clock`: time source

pub mod clock;
pub mod connection;
pub mod inspector;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::connection::{Connection, Connector, Row, Value};
pub use self::inspector::SchemaInspector;
