//! Application-level configuration.
//!
//! - [`ExecutionParams`]: executor control (parallelism)

pub mod execution_params;

pub use execution_params::ExecutionParams;
