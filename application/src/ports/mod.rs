//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod denoiser;
pub mod derivatives_sink;
pub mod gradient_store;
pub mod image_store;
pub mod mask_overlap;
pub mod progress;
pub mod qc_source;
pub mod run_logger;
