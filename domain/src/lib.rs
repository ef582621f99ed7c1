//! Domain layer for dwimerge
//!
//! This crate contains the merge algorithms, value objects and the pipeline
//! graph. It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Acquisition groups
//!
//! One subject/session may be acquired several times, e.g. with opposite
//! phase-encoding directions. Each acquisition is corrected on its own and
//! arrives as an [`AcquisitionGroup`] of seven artifact streams.
//!
//! ## Merge strategies
//!
//! - **Concatenate** (default): stack every group along the diffusion axis
//! - **Average**: average volumes that sampled the same q-space coordinate
//!
//! ## Pipeline
//!
//! A run is planned as a [`PipelineGraph`] and validated before execution.

pub mod acquisition;
pub mod config;
pub mod core;
pub mod denoise;
pub mod gradient;
pub mod image;
pub mod merge;
pub mod pipeline;
pub mod qc;

// Re-export commonly used types
pub use acquisition::{AcquisitionGroup, AcquisitionGroupSet, ArtifactRef, ArtifactSlot, GroupData};
pub use config::{MergeConfig, OutputKind, ReportSettings};
pub use core::{error::DomainError, group_id::GroupId};
pub use denoise::{DenoisePlacement, DenoiseSettings};
pub use gradient::{
    GradientRow, GradientScheme, GradientTable, GradientTableBuilder, SamplingPoint,
    SamplingSchemeReport,
};
pub use image::{DwiSeries, SpatialGrid};
pub use merge::{
    Averager, Concatenator, GroupScaling, MergeProvenance, MergeStrategy, MergeStrategyKind,
    MergedDataset, QSpacePoint, QSpaceTolerance, VolumeOrigin, VolumeRef,
};
pub use pipeline::{NodeKind, PipelineGraph, PipelineNode, PlanOptions, Signal};
pub use qc::{
    BeforeAfterQc, ConfoundSummary, ConfoundTraces, ImageQc, PreMergeQc, QcAggregator, QcInputs,
    SeriesQcRecord,
};
