//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Tunables of the statistics engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum number of most recent samples in the moving window.
    pub moving_window_items: usize,
    /// Time span of the moving window, in seconds.
    pub moving_window_secs: i64,
    /// Number of fixed-width histogram bins.
    pub histogram_bins: usize,
    /// Algorithms whose miners count every hash twice.
    pub halved_algorithms: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            moving_window_items: 100,
            moving_window_secs: 3600,
            histogram_bins: 100,
            halved_algorithms: vec!["quark".to_string(), "anime".to_string()],
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw).map_err(std::io::Error::other)
    }

    /// Whether the counted hash rate of `algorithm` must be halved.
    pub fn halves_counted_rate(&self, algorithm: &str) -> bool {
        self.halved_algorithms.iter().any(|a| a == algorithm)
    }
}
