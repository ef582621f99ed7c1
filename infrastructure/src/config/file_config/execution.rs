//! Execution configuration from TOML (`[execution]` section)

use dwimerge_application::config::execution_params::DEFAULT_MAX_PARALLEL_GROUPS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExecutionConfig {
    pub max_parallel_groups: usize,
    /// JSONL run journal; disabled when unset
    pub journal: Option<PathBuf>,
}

impl Default for FileExecutionConfig {
    fn default() -> Self {
        Self {
            max_parallel_groups: DEFAULT_MAX_PARALLEL_GROUPS,
            journal: None,
        }
    }
}
