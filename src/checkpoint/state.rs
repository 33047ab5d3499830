//! Status dump envelope
//!
//! Every dumped component is wrapped in a [`StatusDump`] that records the
//! format version and which component wrote it.

use serde::{Deserialize, Serialize};

use crate::error::CheckpointError;

/// Current status dump format version
pub const STATUS_VERSION: u32 = 1;

/// Versioned, labelled payload of a status file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusDump<T> {
    /// Schema version for forward compatibility
    pub version: u32,
    /// Name of the component that wrote the dump
    pub component: String,
    /// The component state
    pub payload: T,
}

impl<T> StatusDump<T> {
    /// Wrap a payload with the current version
    pub fn new(component: impl Into<String>, payload: T) -> Self {
        Self {
            version: STATUS_VERSION,
            component: component.into(),
            payload,
        }
    }

    /// Check if this dump is compatible with the current version
    pub fn is_compatible(&self) -> bool {
        self.version <= STATUS_VERSION
    }

    /// Unwrap the payload after checking version and component
    pub fn into_payload(self, component: &str) -> Result<T, CheckpointError> {
        if !self.is_compatible() {
            return Err(CheckpointError::VersionMismatch {
                expected: STATUS_VERSION,
                found: self.version,
            });
        }
        if self.component != component {
            return Err(CheckpointError::Incompatible(format!(
                "dump was written by {}, expected {}",
                self.component, component
            )));
        }
        Ok(self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_payload() {
        let dump = StatusDump::new("cmaes", 7u32);
        assert!(dump.is_compatible());
        assert_eq!(dump.clone().into_payload("cmaes").unwrap(), 7);
        assert!(matches!(
            dump.into_payload("differential_evolution"),
            Err(CheckpointError::Incompatible(_))
        ));
    }

    #[test]
    fn test_future_version_is_rejected() {
        let mut dump = StatusDump::new("cmaes", ());
        dump.version = STATUS_VERSION + 1;
        assert!(!dump.is_compatible());
        assert!(matches!(
            dump.into_payload("cmaes"),
            Err(CheckpointError::VersionMismatch { .. })
        ));
    }
}
