//! Derivatives sink port
//!
//! Writes run outputs under the configured output directory. Naming and
//! placement (derivatives tree vs. reportlets) belong to the adapter.
//!
//! A run-level confounds file is passed through as a copy. Without one,
//! the per-group traces stacked for QC are written as a confounds table.

use async_trait::async_trait;
use dwimerge_domain::{ArtifactRef, ConfoundTraces, DwiSeries, GradientTable, OutputKind};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to write {kind}: {message}")]
    Write { kind: OutputKind, message: String },

    #[error("Failed to copy {source_path} for {kind}: {message}")]
    Copy {
        kind: OutputKind,
        source_path: String,
        message: String,
    },

    #[error("Failed to encode {kind}: {message}")]
    Encode { kind: OutputKind, message: String },
}

/// Payload of one derivative
#[derive(Debug, Clone, Copy)]
pub enum Derivative<'a> {
    Image(&'a DwiSeries),
    Bvals(&'a [f64]),
    Bvecs(&'a [[f64; 3]]),
    GradientTable(&'a GradientTable),
    Json(&'a serde_json::Value),
    /// Confound table assembled during the run
    Confounds(&'a ConfoundTraces),
    /// Existing artifact copied through unmodified
    Copy(&'a ArtifactRef),
}

/// Record of a written file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrittenArtifact {
    pub kind: OutputKind,
    /// Distinguishes several outputs of one kind, e.g. per-group noise maps
    pub label: Option<String>,
    pub path: PathBuf,
}

#[async_trait]
pub trait DerivativesSink: Send + Sync {
    async fn write(
        &self,
        kind: OutputKind,
        label: Option<&str>,
        derivative: Derivative<'_>,
    ) -> Result<WrittenArtifact, SinkError>;
}
