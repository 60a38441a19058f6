//! Resource configuration validation.

use super::ResourceMap;
use crate::domain::ConfigError;

fn invalid(resource: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidResource {
        resource: resource.to_string(),
        reason: reason.to_string(),
    }
}

/// Validate every configured resource.
pub fn validate(resources: &ResourceMap) -> Result<(), ConfigError> {
    for (name, config) in resources.iter() {
        if config.database.is_empty() {
            return Err(invalid(name, "database is required"));
        }
        if config.limit == 0 {
            return Err(invalid(name, "limit must be at least 1"));
        }
        if config.stmt.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid(name, "stmt entries must not be empty"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Dialect, ResourceConfig};

    fn valid_map() -> ResourceMap {
        ResourceMap::new().with("db", ResourceConfig::new(Dialect::Mysql, "shop"))
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_map()).is_ok());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let map = ResourceMap::new().with(
            "db",
            ResourceConfig::new(Dialect::Mysql, "shop").with_limit(0),
        );
        let err = validate(&map).unwrap_err();
        assert!(err.to_string().contains("limit"));
    }

    #[test]
    fn test_missing_database_rejected() {
        let map = ResourceMap::new().with("db-order", ResourceConfig::new(Dialect::Pgsql, ""));
        let err = validate(&map).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidResource { resource, .. } if resource == "db-order"));
    }

    #[test]
    fn test_blank_stmt_rejected() {
        let map = ResourceMap::new().with(
            "db",
            ResourceConfig::new(Dialect::Mysql, "shop").with_stmt("  "),
        );
        assert!(validate(&map).is_err());
    }
}
