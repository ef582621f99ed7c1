//! Run configuration value objects shared across layers

mod merge_config;
mod output;

pub use merge_config::{DEFAULT_B0_THRESHOLD, MergeConfig, ReportSettings};
pub use output::OutputKind;
