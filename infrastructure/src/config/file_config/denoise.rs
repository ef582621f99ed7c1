//! Denoise configuration from TOML (`[denoise]` section)

use serde::{Deserialize, Serialize};

pub const DEFAULT_DENOISE_COMMAND: &str = "dwidenoise";

/// `{input}`, `{output}`, `{noise}` and `{extent}` are substituted per call
pub const DEFAULT_DENOISE_ARGS: [&str; 6] =
    ["{input}", "{output}", "-noise", "{noise}", "-extent", "{extent}"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDenoiseConfig {
    /// Window edge length; 0 disables denoising
    pub window: u32,
    pub before_combining: bool,
    pub combine_all_dwis: bool,
    pub command: String,
    pub args: Vec<String>,
}

impl Default for FileDenoiseConfig {
    fn default() -> Self {
        Self {
            window: 0,
            before_combining: false,
            combine_all_dwis: true,
            command: DEFAULT_DENOISE_COMMAND.to_string(),
            args: DEFAULT_DENOISE_ARGS.iter().map(|a| a.to_string()).collect(),
        }
    }
}
