//! Ledger configuration.

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CACHE_CAPACITY;

/// Tuning knobs for the progress services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Attempts for a conditional write before `ConcurrentUpdateConflict`
    pub max_update_attempts: u32,

    /// Serve reconciled progress from the in-process cache when the
    /// curriculum's modules version still matches
    pub cache_enabled: bool,

    /// Most (learner, curriculum) pairs held in the cache
    pub cache_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_update_attempts: 5,
            cache_enabled: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl LedgerConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_update_attempts.max(1)
    }
}
