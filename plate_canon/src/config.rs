use serde::{Deserialize, Serialize};

use crate::error::CanonError;

/// Tuning for the canonicalization core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CanonConfig {
    /// Plates at most this many positions apart are merged.
    pub max_hamming_distance: usize,
    /// Frame workers; `1` runs the strictly sequential pipeline.
    pub workers: usize,
}

impl Default for CanonConfig {
    fn default() -> Self {
        Self {
            max_hamming_distance: 1,
            workers: 1,
        }
    }
}

impl CanonConfig {
    pub fn validate(&self) -> Result<(), CanonError> {
        if self.workers == 0 {
            return Err(CanonError::InvalidConfig {
                reason: "workers must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
