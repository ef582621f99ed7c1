//! Loaded group data
//!
//! [`GroupData`] is what a merge strategy actually consumes: the group's
//! final series and tables in memory, checked for internal consistency.

use crate::acquisition::artifact::ArtifactRef;
use crate::core::error::DomainError;
use crate::core::group_id::GroupId;
use crate::gradient::scheme::GradientScheme;
use crate::image::series::DwiSeries;

/// One acquisition group after its artifacts were loaded
#[derive(Debug, Clone)]
pub struct GroupData {
    id: GroupId,
    image: DwiSeries,
    scheme: GradientScheme,
    original_bvecs: Vec<[f64; 3]>,
    raw_concatenated: DwiSeries,
    b0_reference: DwiSeries,
    original_image: ArtifactRef,
}

impl GroupData {
    /// Assemble a group, validating volume counts
    ///
    /// - the image volume count must equal the bval/bvec row count
    /// - the raw concatenated image must have the same volume count
    /// - original b-vectors are either absent (empty) or one per volume
    pub fn new(
        id: GroupId,
        image: DwiSeries,
        scheme: GradientScheme,
        original_bvecs: Vec<[f64; 3]>,
        raw_concatenated: DwiSeries,
        b0_reference: DwiSeries,
        original_image: ArtifactRef,
    ) -> Result<Self, DomainError> {
        let volumes = image.volume_count();
        if volumes == 0 {
            return Err(DomainError::validation(id.as_str(), "image has no volumes"));
        }
        if volumes != scheme.len() {
            return Err(DomainError::validation(
                id.as_str(),
                format!(
                    "image has {} volumes but bval/bvec tables have {} rows",
                    volumes,
                    scheme.len()
                ),
            ));
        }
        if raw_concatenated.volume_count() != volumes {
            return Err(DomainError::validation(
                id.as_str(),
                format!(
                    "raw concatenated image has {} volumes, expected {}",
                    raw_concatenated.volume_count(),
                    volumes
                ),
            ));
        }
        if !original_bvecs.is_empty() && original_bvecs.len() != volumes {
            return Err(DomainError::validation(
                id.as_str(),
                format!(
                    "original bvec table has {} rows, expected {}",
                    original_bvecs.len(),
                    volumes
                ),
            ));
        }
        if original_bvecs.iter().any(|v| v.iter().any(|c| !c.is_finite())) {
            return Err(DomainError::format(format!(
                "original bvec table of group {id} is not finite"
            )));
        }

        Ok(Self {
            id,
            image,
            scheme,
            original_bvecs,
            raw_concatenated,
            b0_reference,
            original_image,
        })
    }

    /// Replace the final series, e.g. with its denoised version
    pub fn with_image(self, image: DwiSeries) -> Result<Self, DomainError> {
        if image.grid() != self.image.grid() || image.volume_count() != self.image.volume_count() {
            return Err(DomainError::validation(
                self.id.as_str(),
                format!(
                    "replacement image is {} with {} volumes, expected {} with {}",
                    image.grid(),
                    image.volume_count(),
                    self.image.grid(),
                    self.image.volume_count()
                ),
            ));
        }
        Ok(Self { image, ..self })
    }

    pub fn id(&self) -> &GroupId {
        &self.id
    }

    pub fn image(&self) -> &DwiSeries {
        &self.image
    }

    pub fn scheme(&self) -> &GradientScheme {
        &self.scheme
    }

    pub fn volume_count(&self) -> usize {
        self.image.volume_count()
    }

    /// Whether the pre-motion-correction b-vectors can be used for matching
    pub fn has_usable_original_bvecs(&self) -> bool {
        !self.original_bvecs.is_empty()
    }

    pub fn original_bvecs(&self) -> &[[f64; 3]] {
        &self.original_bvecs
    }

    pub fn raw_concatenated(&self) -> &DwiSeries {
        &self.raw_concatenated
    }

    pub fn b0_reference(&self) -> &DwiSeries {
        &self.b0_reference
    }

    pub fn original_image(&self) -> &ArtifactRef {
        &self.original_image
    }

    /// Mean b0 intensity of this group
    ///
    /// Uses the b0 volumes of the final series; a group without b0 volumes
    /// falls back to its b0 reference image.
    pub fn b0_mean(&self, b0_threshold: f64) -> Option<f64> {
        let b0s = self.scheme.b0_indices(b0_threshold);
        if b0s.is_empty() {
            self.b0_reference.mean_intensity()
        } else {
            self.image.mean_of_volumes(&b0s)
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Synthetic groups shared by the merge and QC tests.

    use super::*;
    use crate::image::series::SpatialGrid;
    use ndarray::Array3;

    pub const GRID: SpatialGrid = SpatialGrid {
        nx: 3,
        ny: 2,
        nz: 2,
    };

    /// Series where volume `i` is filled with `values[i]`
    pub fn uniform_series(values: &[f32], grid: SpatialGrid) -> DwiSeries {
        let volumes: Vec<Array3<f32>> = values
            .iter()
            .map(|&v| Array3::from_elem((grid.nx, grid.ny, grid.nz), v))
            .collect();
        DwiSeries::from_volumes(&volumes).unwrap()
    }

    /// One b0 followed by four axis-aligned directions at b=1000
    pub fn five_volume_scheme(sign: f64) -> (Vec<f64>, Vec<[f64; 3]>) {
        let s = 0.70710678;
        (
            vec![0.0, 1000.0, 1000.0, 1000.0, 1000.0],
            vec![
                [0.0, 0.0, 0.0],
                [sign, 0.0, 0.0],
                [0.0, sign, 0.0],
                [0.0, 0.0, sign],
                [sign * s, sign * s, 0.0],
            ],
        )
    }

    /// A group whose bvecs and original bvecs both carry `sign`
    pub fn group(id: &str, values: &[f32], sign: f64, grid: SpatialGrid) -> GroupData {
        let (bvals, bvecs) = five_volume_scheme(sign);
        let scheme = GradientScheme::new(bvals, bvecs.clone()).unwrap();
        GroupData::new(
            GroupId::new(id).unwrap(),
            uniform_series(values, grid),
            scheme,
            bvecs,
            uniform_series(values, grid),
            uniform_series(&[values[0]], grid),
            ArtifactRef::new(format!("/raw/{id}_dwi.json")),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_rejects_table_mismatch() {
        let scheme = GradientScheme::new(vec![0.0, 1000.0], vec![[0.0; 3], [1.0, 0.0, 0.0]])
            .unwrap();
        let err = GroupData::new(
            GroupId::new("dir-AP").unwrap(),
            uniform_series(&[1.0, 2.0, 3.0], GRID),
            scheme,
            vec![],
            uniform_series(&[1.0, 2.0, 3.0], GRID),
            uniform_series(&[1.0], GRID),
            ArtifactRef::new("/raw/a"),
        )
        .unwrap_err();
        match err {
            DomainError::Validation { subject, message } => {
                assert_eq!(subject, "dir_AP");
                assert!(message.contains("3 volumes"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_original_bvec_mismatch() {
        let (bvals, bvecs) = five_volume_scheme(1.0);
        let scheme = GradientScheme::new(bvals, bvecs.clone()).unwrap();
        let result = GroupData::new(
            GroupId::new("g").unwrap(),
            uniform_series(&[1.0; 5], GRID),
            scheme,
            bvecs[..3].to_vec(),
            uniform_series(&[1.0; 5], GRID),
            uniform_series(&[1.0], GRID),
            ArtifactRef::new("/raw/g"),
        );
        assert!(result.unwrap_err().is_validation());
    }

    #[test]
    fn test_b0_mean_uses_b0_volumes() {
        let group = group("g", &[100.0, 10.0, 10.0, 10.0, 10.0], 1.0, GRID);
        assert_eq!(group.b0_mean(50.0), Some(100.0));
        assert!(group.has_usable_original_bvecs());
    }

    #[test]
    fn test_with_image_keeps_shape() {
        let g = group("g", &[100.0, 10.0, 10.0, 10.0, 10.0], 1.0, GRID);
        assert!(g.clone().with_image(uniform_series(&[1.0], GRID)).is_err());
        let replaced = g.with_image(uniform_series(&[7.0; 5], GRID)).unwrap();
        assert_eq!(replaced.image().volume(3)[[0, 0, 0]], 7.0);
        assert_eq!(replaced.raw_concatenated().volume(3)[[0, 0, 0]], 10.0);
    }
}
