//! Merge configuration from TOML (`[merge]` section)

use dwimerge_domain::config::DEFAULT_B0_THRESHOLD;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMergeConfig {
    /// `"average"` or anything starting with `"concat"`
    pub strategy: String,
    pub harmonize_b0_intensities: bool,
    pub b0_threshold: f64,
    pub b0_reference_intensity: Option<f64>,
}

impl Default for FileMergeConfig {
    fn default() -> Self {
        Self {
            strategy: "concat".to_string(),
            harmonize_b0_intensities: true,
            b0_threshold: DEFAULT_B0_THRESHOLD,
            b0_reference_intensity: None,
        }
    }
}
