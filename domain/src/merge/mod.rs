//! Distortion-group merging.
//!
//! Two structurally different algorithms sit behind one [`MergeStrategy`]
//! contract:
//!
//! - [`Concatenator`] stacks every group along the diffusion axis
//! - [`Averager`] averages volumes that sampled the same q-space coordinate
//!
//! The strategy is chosen once per run from a [`MergeStrategyKind`].

pub mod average;
pub mod concatenate;
pub mod dataset;
pub mod matching;
pub mod strategy;

pub use average::Averager;
pub use concatenate::Concatenator;
pub use dataset::{GroupScaling, MergeProvenance, MergedDataset, VolumeOrigin, VolumeRef};
pub use matching::{QSpacePoint, QSpaceTolerance};
pub use strategy::{MergeStrategy, MergeStrategyKind, require_common_grid};
