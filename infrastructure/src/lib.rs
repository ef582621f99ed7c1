//! Infrastructure layer for dwimerge
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, the run manifest reader, and configuration
//! file loading.

pub mod config;
pub mod denoise;
pub mod logging;
pub mod manifest;
pub mod overlap;
pub mod sink;
pub mod storage;

// Re-export commonly used types
pub use config::{
    ConfigLoadError, ConfigLoader, FileConfig, FileDenoiseConfig, FileExecutionConfig,
    FileMergeConfig, FileOutputConfig,
};
pub use denoise::CommandDenoiser;
pub use logging::JsonlRunLogger;
pub use manifest::{ManifestError, RunManifest};
pub use overlap::StoreDiceCalculator;
pub use sink::FsDerivativesSink;
pub use storage::{FileQcSource, FslGradientStore, JsonImageStore};
