//! Model configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::ReadOptions;

/// Consistency requested from the store when hydrating documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanConsistency {
    /// Return whatever the index currently holds
    NotBounded,
    /// Wait for all mutations issued before the request
    #[default]
    RequestPlus,
}

/// Configuration threaded through every repository call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Consistency for reads issued by `find` and `reload`
    pub scan_consistency: ScanConsistency,
    /// Whether `Record::to_json` output carries the `id` key
    pub include_id_in_json: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            scan_consistency: ScanConsistency::RequestPlus,
            include_id_in_json: true,
        }
    }
}

impl ModelConfig {
    /// Parses a configuration from JSON, filling missing keys with defaults.
    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Read options derived from this configuration.
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            scan_consistency: self.scan_consistency,
        }
    }
}
