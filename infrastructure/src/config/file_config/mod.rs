//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod denoise;
mod execution;
mod merge;
mod output;

pub use denoise::{DEFAULT_DENOISE_ARGS, DEFAULT_DENOISE_COMMAND, FileDenoiseConfig};
pub use execution::FileExecutionConfig;
pub use merge::FileMergeConfig;
pub use output::FileOutputConfig;

use dwimerge_application::ExecutionParams;
use dwimerge_domain::{DenoiseSettings, DomainError, MergeConfig, QSpaceTolerance};
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Merge strategy and b0 handling
    pub merge: FileMergeConfig,
    /// q-space matching tolerances for averaging
    pub matching: QSpaceTolerance,
    /// Denoising stage
    pub denoise: FileDenoiseConfig,
    /// Output locations
    pub output: FileOutputConfig,
    /// Executor settings
    pub execution: FileExecutionConfig,
}

impl FileConfig {
    /// Convert into the domain configuration, validating every value
    ///
    /// Errors name the offending key.
    pub fn into_merge_config(&self) -> Result<MergeConfig, DomainError> {
        let config = MergeConfig {
            strategy: self.merge.strategy.parse()?,
            harmonize_b0_intensities: self.merge.harmonize_b0_intensities,
            b0_threshold: self.merge.b0_threshold,
            b0_reference_intensity: self.merge.b0_reference_intensity,
            tolerance: self.matching,
            denoise: DenoiseSettings::new(self.denoise.window)
                .with_before_merge(self.denoise.before_combining),
            combine_all_dwis: self.denoise.combine_all_dwis,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn execution_params(&self) -> ExecutionParams {
        ExecutionParams::default().with_max_parallel_groups(self.execution.max_parallel_groups)
    }
}
