//! Configuration loading and validation.
//!
//! The engine consumes an already resolved resource map; this module only
//! turns a JSON resource file into one.

mod types;
mod validation;

pub use types::*;

use crate::domain::ConfigError;
use std::path::Path;

impl ResourceMap {
    /// Load resources from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse resources from a JSON object keyed by resource name.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let resources: ResourceMap = serde_json::from_str(json)?;
        resources.validate()?;
        Ok(resources)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate(self)
    }
}
