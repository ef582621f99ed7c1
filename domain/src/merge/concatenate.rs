//! Concatenation along the diffusion axis

use crate::acquisition::data::GroupData;
use crate::core::error::DomainError;
use crate::gradient::scheme::GradientScheme;
use crate::image::series::DwiSeries;
use crate::merge::dataset::{GroupScaling, MergeProvenance, MergedDataset, VolumeOrigin, VolumeRef};
use crate::merge::strategy::{MergeStrategy, MergeStrategyKind, require_common_grid};
use std::borrow::Cow;

/// Stacks every group's volumes, in group order
///
/// With b0 harmonization enabled, each group is scaled by
/// `reference_mean / group_b0_mean` before stacking. The reference is the
/// first group's b0 mean unless an explicit reference intensity is set.
#[derive(Debug, Clone)]
pub struct Concatenator {
    b0_threshold: f64,
    harmonize_b0_intensities: bool,
    reference_b0_mean: Option<f64>,
}

impl Concatenator {
    pub fn new(b0_threshold: f64) -> Self {
        Self {
            b0_threshold,
            harmonize_b0_intensities: false,
            reference_b0_mean: None,
        }
    }

    pub fn with_harmonization(mut self, enabled: bool) -> Self {
        self.harmonize_b0_intensities = enabled;
        self
    }

    pub fn with_reference_b0_mean(mut self, reference: Option<f64>) -> Self {
        self.reference_b0_mean = reference;
        self
    }

    fn group_b0_mean(&self, group: &GroupData) -> Result<f64, DomainError> {
        match group.b0_mean(self.b0_threshold) {
            Some(mean) if mean.is_finite() && mean > 0.0 => Ok(mean),
            Some(mean) => Err(DomainError::validation(
                group.id().as_str(),
                format!("b0 mean intensity {mean} is not positive; cannot harmonize"),
            )),
            None => Err(DomainError::validation(
                group.id().as_str(),
                "no b0 volumes or b0 reference available for harmonization",
            )),
        }
    }

    fn scaling(&self, groups: &[GroupData]) -> Result<Vec<GroupScaling>, DomainError> {
        let means = groups
            .iter()
            .map(|g| self.group_b0_mean(g))
            .collect::<Result<Vec<_>, _>>()?;
        let reference = match self.reference_b0_mean {
            Some(reference) => reference,
            None => means[0],
        };
        Ok(groups
            .iter()
            .zip(means)
            .map(|(group, b0_mean)| GroupScaling {
                group: group.id().clone(),
                b0_mean,
                factor: reference / b0_mean,
            })
            .collect())
    }
}

impl MergeStrategy for Concatenator {
    fn kind(&self) -> MergeStrategyKind {
        MergeStrategyKind::Concatenate
    }

    fn merge(&self, groups: &[GroupData]) -> Result<MergedDataset, DomainError> {
        require_common_grid(groups)?;

        let scaling = if self.harmonize_b0_intensities {
            self.scaling(groups)?
        } else {
            Vec::new()
        };

        let images: Vec<Cow<'_, DwiSeries>> = groups
            .iter()
            .enumerate()
            .map(|(i, group)| match scaling.get(i) {
                Some(s) if s.factor != 1.0 => Cow::Owned(group.image().scaled(s.factor as f32)),
                _ => Cow::Borrowed(group.image()),
            })
            .collect();
        let image_refs: Vec<&DwiSeries> = images.iter().map(|c| c.as_ref()).collect();
        let image = DwiSeries::concatenate(&image_refs)?;

        let schemes: Vec<&GradientScheme> = groups.iter().map(|g| g.scheme()).collect();
        let scheme = GradientScheme::concatenate(&schemes);

        let mut provenance = MergeProvenance::new(
            MergeStrategyKind::Concatenate,
            groups.iter().map(|g| g.id().clone()).collect(),
        );
        provenance.volumes = groups
            .iter()
            .flat_map(|g| {
                (0..g.volume_count()).map(move |v| VolumeOrigin::Single {
                    source: VolumeRef::new(g.id().clone(), v),
                })
            })
            .collect();
        provenance.scaling = scaling;

        MergedDataset::new(image, scheme, provenance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::data::fixtures::{GRID, group};
    use crate::image::series::SpatialGrid;

    const B0_THRESHOLD: f64 = 50.0;

    #[test]
    fn test_two_groups_concatenate_to_ten_volumes() {
        let ap = group("dir-AP", &[100.0, 1.0, 2.0, 3.0, 4.0], 1.0, GRID);
        let pa = group("dir-PA", &[200.0, 5.0, 6.0, 7.0, 8.0], -1.0, GRID);

        let merged = Concatenator::new(B0_THRESHOLD).merge(&[ap.clone(), pa.clone()]).unwrap();

        assert_eq!(merged.volume_count(), 10);
        assert_eq!(merged.bvals().len(), 10);
        assert_eq!(merged.bvecs().len(), 10);
        // group order, then within-group order
        assert_eq!(&merged.bvecs()[..5], ap.scheme().bvecs());
        assert_eq!(&merged.bvecs()[5..], pa.scheme().bvecs());
        assert_eq!(merged.image().volume(5)[[0, 0, 0]], 200.0);
        assert_eq!(merged.image().volume(9)[[0, 0, 0]], 8.0);

        let sources: Vec<String> = merged
            .provenance()
            .volumes
            .iter()
            .map(|v| v.sources()[0].to_string())
            .collect();
        assert_eq!(sources[0], "dir_AP[0]");
        assert_eq!(sources[6], "dir_PA[1]");
        assert_eq!(merged.provenance().matched_count(), 0);
    }

    #[test]
    fn test_volume_count_is_sum_for_many_groups() {
        let groups: Vec<GroupData> = (0..4)
            .map(|i| group(&format!("run-{i}"), &[10.0; 5], 1.0, GRID))
            .collect();
        let merged = Concatenator::new(B0_THRESHOLD).merge(&groups).unwrap();
        assert_eq!(merged.volume_count(), 20);
        assert_eq!(merged.provenance().groups.len(), 4);
    }

    #[test]
    fn test_single_group_passes_through() {
        let only = group("run1", &[10.0, 1.0, 1.0, 1.0, 1.0], 1.0, GRID);
        let merged = Concatenator::new(B0_THRESHOLD).merge(&[only]).unwrap();
        assert_eq!(merged.volume_count(), 5);
    }

    #[test]
    fn test_grid_mismatch_fails() {
        let ap = group("dir-AP", &[1.0; 5], 1.0, GRID);
        let pa = group("dir-PA", &[1.0; 5], -1.0, SpatialGrid::new(3, 2, 3));
        let err = Concatenator::new(B0_THRESHOLD).merge(&[ap, pa]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_harmonization_scales_to_first_group() {
        let ap = group("dir-AP", &[100.0, 10.0, 10.0, 10.0, 10.0], 1.0, GRID);
        let pa = group("dir-PA", &[200.0, 20.0, 20.0, 20.0, 20.0], -1.0, GRID);

        let merged = Concatenator::new(B0_THRESHOLD)
            .with_harmonization(true)
            .merge(&[ap, pa])
            .unwrap();

        let scaling = &merged.provenance().scaling;
        assert_eq!(scaling.len(), 2);
        assert_eq!(scaling[0].factor, 1.0);
        assert_eq!(scaling[1].factor, 0.5);
        // every volume of the second group is scaled, not only the b0
        assert_eq!(merged.image().volume(5)[[0, 0, 0]], 100.0);
        assert_eq!(merged.image().volume(7)[[1, 1, 1]], 10.0);
    }

    #[test]
    fn test_harmonization_with_external_reference() {
        let ap = group("dir-AP", &[100.0, 10.0, 10.0, 10.0, 10.0], 1.0, GRID);
        let merged = Concatenator::new(B0_THRESHOLD)
            .with_harmonization(true)
            .with_reference_b0_mean(Some(400.0))
            .merge(&[ap])
            .unwrap();
        assert_eq!(merged.provenance().scaling[0].factor, 4.0);
        assert_eq!(merged.image().volume(1)[[0, 0, 0]], 40.0);
    }

    #[test]
    fn test_harmonization_rejects_zero_b0() {
        let ap = group("dir-AP", &[0.0, 10.0, 10.0, 10.0, 10.0], 1.0, GRID);
        let err = Concatenator::new(B0_THRESHOLD)
            .with_harmonization(true)
            .merge(&[ap])
            .unwrap_err();
        assert!(err.is_validation());
    }
}
