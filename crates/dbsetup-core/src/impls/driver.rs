use async_trait::async_trait;

use super::{SqlxConnector, TiberiusConnector};
use crate::config::{Dialect, ResourceConfig};
use crate::domain::ConnectionError;
use crate::ports::{Connection, Connector};

/// Connector for live servers of every supported dialect.
#[derive(Debug, Default, Clone)]
pub struct DriverConnector {
    sqlx: SqlxConnector,
    tiberius: TiberiusConnector,
}

impl DriverConnector {
    pub fn new() -> Self {
        Self {
            sqlx: SqlxConnector::new(),
            tiberius: TiberiusConnector::new(),
        }
    }
}

#[async_trait]
impl Connector for DriverConnector {
    async fn connect(
        &self,
        resource: &str,
        config: &ResourceConfig,
    ) -> Result<Box<dyn Connection>, ConnectionError> {
        match config.adapter {
            Dialect::Sqlsrv => self.tiberius.connect(resource, config).await,
            Dialect::Mysql | Dialect::Pgsql => self.sqlx.connect(resource, config).await,
        }
    }
}
