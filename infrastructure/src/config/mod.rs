//! Configuration file loading for dwimerge
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables `DWIMERGE_<SECTION>__<KEY>`
//! 2. `--config <path>` specified file
//! 3. Project root: `./dwimerge.toml` or `./.dwimerge.toml`
//! 4. Global: `~/.config/dwimerge/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    DEFAULT_DENOISE_ARGS, DEFAULT_DENOISE_COMMAND, FileConfig, FileDenoiseConfig,
    FileExecutionConfig, FileMergeConfig, FileOutputConfig,
};
pub use loader::{ConfigLoadError, ConfigLoader, ENV_PREFIX};
