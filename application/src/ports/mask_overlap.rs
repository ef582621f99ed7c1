//! Mask overlap port (anatomical vs. diffusion brain mask)

use crate::ports::image_store::StoreError;
use async_trait::async_trait;
use dwimerge_domain::ArtifactRef;

#[async_trait]
pub trait MaskOverlap: Send + Sync {
    /// Dice coefficient of the two masks, in `[0, 1]`
    async fn dice(&self, anatomical: &ArtifactRef, dwi: &ArtifactRef) -> Result<f64, StoreError>;
}
