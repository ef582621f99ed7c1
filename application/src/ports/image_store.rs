//! Image store port
//!
//! Loads diffusion series from wherever the upstream steps left them.

use async_trait::async_trait;
use dwimerge_domain::{ArtifactRef, DwiSeries};
use thiserror::Error;

/// Errors raised by artifact readers
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Malformed artifact {path}: {message}")]
    Malformed { path: String, message: String },
}

impl StoreError {
    pub fn io(artifact: &ArtifactRef, err: impl std::fmt::Display) -> Self {
        StoreError::Io {
            path: artifact.to_string(),
            message: err.to_string(),
        }
    }

    pub fn malformed(artifact: &ArtifactRef, err: impl std::fmt::Display) -> Self {
        StoreError::Malformed {
            path: artifact.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn load(&self, artifact: &ArtifactRef) -> Result<DwiSeries, StoreError>;
}
