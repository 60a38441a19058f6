//! Tri-state answer for existence checks that a dialect cannot answer directly.

use serde::{Deserialize, Serialize};

use super::errors::InspectError;

/// Result of probing for a derived database object.
///
/// Only `Absent` may trigger creation; `Unknown` means the probe itself could
/// not decide and must be surfaced as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Probe {
    Exists,
    Absent,
    Unknown(String),
}

impl Probe {
    pub fn from_exists(exists: bool) -> Self {
        if exists { Probe::Exists } else { Probe::Absent }
    }

    /// Collapse into a definite answer, failing for `Unknown`.
    pub fn require(self, object: &str) -> Result<bool, InspectError> {
        match self {
            Probe::Exists => Ok(true),
            Probe::Absent => Ok(false),
            Probe::Unknown(reason) => Err(InspectError::ProbeUnknown {
                object: object.to_string(),
                reason,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definite_answers_pass_through() {
        assert!(Probe::Exists.require("idx").unwrap());
        assert!(!Probe::Absent.require("idx").unwrap());
        assert_eq!(Probe::from_exists(true), Probe::Exists);
    }

    #[test]
    fn unknown_becomes_error() {
        let err = Probe::Unknown("full text not installed".into())
            .require("mshop_index_text.content")
            .unwrap_err();
        assert!(matches!(err, InspectError::ProbeUnknown { .. }));
        assert!(err.to_string().contains("mshop_index_text.content"));
    }
}
