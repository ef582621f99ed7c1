//! Readers for QC files produced upstream of the merge

use crate::ports::image_store::StoreError;
use async_trait::async_trait;
use dwimerge_domain::{ArtifactRef, ConfoundTraces, PreMergeQc};

#[async_trait]
pub trait QcSource: Send + Sync {
    async fn pre_merge_qc(&self, artifact: &ArtifactRef) -> Result<PreMergeQc, StoreError>;

    async fn confounds(&self, artifact: &ArtifactRef) -> Result<ConfoundTraces, StoreError>;
}
