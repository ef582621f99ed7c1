//! Dice overlap between the anatomical and diffusion brain masks

use async_trait::async_trait;
use dwimerge_application::ports::image_store::{ImageStore, StoreError};
use dwimerge_application::ports::mask_overlap::MaskOverlap;
use dwimerge_domain::{ArtifactRef, DwiSeries};
use std::sync::Arc;
use tracing::debug;

/// Dice coefficient `2|A∩B| / (|A| + |B|)` of the first volume of each mask
///
/// Voxels above zero are inside the mask. Returns `None` when the grids
/// differ or both masks are empty.
pub fn dice_coefficient(a: &DwiSeries, b: &DwiSeries) -> Option<f64> {
    if a.grid() != b.grid() || a.volume_count() == 0 || b.volume_count() == 0 {
        return None;
    }
    let (mut both, mut in_a, mut in_b) = (0usize, 0usize, 0usize);
    for (va, vb) in a.volume(0).iter().zip(b.volume(0).iter()) {
        let (ia, ib) = (*va > 0.0, *vb > 0.0);
        in_a += ia as usize;
        in_b += ib as usize;
        both += (ia && ib) as usize;
    }
    if in_a + in_b == 0 {
        return None;
    }
    Some(2.0 * both as f64 / (in_a + in_b) as f64)
}

/// [`MaskOverlap`] loading both masks through an [`ImageStore`]
pub struct StoreDiceCalculator {
    images: Arc<dyn ImageStore>,
}

impl StoreDiceCalculator {
    pub fn new(images: Arc<dyn ImageStore>) -> Self {
        Self { images }
    }
}

#[async_trait]
impl MaskOverlap for StoreDiceCalculator {
    async fn dice(&self, anatomical: &ArtifactRef, dwi: &ArtifactRef) -> Result<f64, StoreError> {
        let (t1, dwi_mask) = tokio::try_join!(self.images.load(anatomical), self.images.load(dwi))?;
        if t1.grid() != dwi_mask.grid() {
            return Err(StoreError::malformed(
                dwi,
                format!("mask grid {} differs from {}", dwi_mask.grid(), t1.grid()),
            ));
        }
        let score = dice_coefficient(&t1, &dwi_mask)
            .ok_or_else(|| StoreError::malformed(dwi, "both masks are empty"))?;
        debug!("Dice overlap {} vs {}: {:.4}", anatomical, dwi, score);
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonImageStore, encode_series};
    use ndarray::Array4;

    fn mask(values: &[f32]) -> DwiSeries {
        DwiSeries::new(Array4::from_shape_vec((values.len(), 1, 1, 1), values.to_vec()).unwrap())
    }

    #[test]
    fn test_identical_masks_score_one() {
        let m = mask(&[1.0, 1.0, 0.0, 0.0]);
        assert_eq!(dice_coefficient(&m, &m), Some(1.0));
    }

    #[test]
    fn test_partial_overlap() {
        let a = mask(&[1.0, 1.0, 0.0, 0.0]);
        let b = mask(&[0.0, 1.0, 1.0, 0.0]);
        assert_eq!(dice_coefficient(&a, &b), Some(0.5));
    }

    #[test]
    fn test_disjoint_and_empty_masks() {
        let a = mask(&[1.0, 0.0]);
        let b = mask(&[0.0, 1.0]);
        assert_eq!(dice_coefficient(&a, &b), Some(0.0));
        let empty = mask(&[0.0, 0.0]);
        assert_eq!(dice_coefficient(&empty, &empty), None);
    }

    #[test]
    fn test_grid_mismatch() {
        assert_eq!(dice_coefficient(&mask(&[1.0]), &mask(&[1.0, 1.0])), None);
    }

    #[tokio::test]
    async fn test_calculator_reads_masks() {
        let dir = tempfile::tempdir().unwrap();
        let t1 = dir.path().join("t1_mask.json");
        let dwi = dir.path().join("dwi_mask.json");
        std::fs::write(&t1, encode_series(&mask(&[1.0, 1.0, 1.0, 0.0])).unwrap()).unwrap();
        std::fs::write(&dwi, encode_series(&mask(&[1.0, 1.0, 0.0, 0.0])).unwrap()).unwrap();

        let calculator = StoreDiceCalculator::new(Arc::new(JsonImageStore::new()));
        let score = calculator
            .dice(&ArtifactRef::new(&t1), &ArtifactRef::new(&dwi))
            .await
            .unwrap();
        assert!((score - 0.8).abs() < 1e-12);
    }
}
