//! Output configuration from TOML (`[output]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Derivatives root; the manifest directory when unset
    pub output_dir: Option<PathBuf>,
    /// Reportlets directory; `<output_dir>/reports` when unset
    pub reportlets_dir: Option<PathBuf>,
    /// File-name stem; derived from the source file when unset
    pub output_prefix: Option<String>,
    /// Enable colored terminal output
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            reportlets_dir: None,
            output_prefix: None,
            color: true,
        }
    }
}
