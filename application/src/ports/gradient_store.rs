//! Gradient table port

use crate::ports::image_store::StoreError;
use async_trait::async_trait;
use dwimerge_domain::ArtifactRef;

/// Reads b-value and b-vector tables
///
/// An empty b-vector file yields an empty table; callers decide whether an
/// empty table is acceptable.
#[async_trait]
pub trait GradientStore: Send + Sync {
    async fn load_bvals(&self, artifact: &ArtifactRef) -> Result<Vec<f64>, StoreError>;

    async fn load_bvecs(&self, artifact: &ArtifactRef) -> Result<Vec<[f64; 3]>, StoreError>;
}
