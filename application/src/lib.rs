//! Application layer for dwimerge
//!
//! This crate contains the merge use case, port definitions, and
//! application configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::ExecutionParams;
pub use ports::{
    denoiser::{DenoiseError, DenoiseOutput, Denoiser},
    derivatives_sink::{Derivative, DerivativesSink, SinkError, WrittenArtifact},
    gradient_store::GradientStore,
    image_store::{ImageStore, StoreError},
    mask_overlap::MaskOverlap,
    progress::{NoProgress, PipelineProgress},
    qc_source::QcSource,
    run_logger::{NoRunLogger, RunEvent, RunLogger},
};
pub use use_cases::run_merge::{
    MergePorts, RunArtifacts, RunMergeError, RunMergeInput, RunMergeOutput, RunMergeUseCase,
};
