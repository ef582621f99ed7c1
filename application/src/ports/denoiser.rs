//! Denoiser port
//!
//! The denoising algorithm is an opaque external step parameterized by a
//! window extent.

use async_trait::async_trait;
use dwimerge_domain::DwiSeries;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DenoiseError {
    #[error("Denoiser not available: {0}")]
    NotAvailable(String),

    #[error("Denoiser failed for {label}: {message}")]
    Failed { label: String, message: String },

    #[error("Denoiser I/O error: {0}")]
    Io(String),
}

/// Denoised series plus the estimated noise map
#[derive(Debug, Clone)]
pub struct DenoiseOutput {
    pub image: DwiSeries,
    pub noise: DwiSeries,
}

#[async_trait]
pub trait Denoiser: Send + Sync {
    /// Denoise `image`; `label` names the series in logs and temp files
    async fn denoise(
        &self,
        image: &DwiSeries,
        extent: [u32; 3],
        label: &str,
    ) -> Result<DenoiseOutput, DenoiseError>;
}
