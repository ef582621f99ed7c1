//! Merge output and provenance

use crate::core::error::DomainError;
use crate::core::group_id::GroupId;
use crate::gradient::scheme::GradientScheme;
use crate::gradient::table::{GradientTable, GradientTableBuilder};
use crate::image::series::DwiSeries;
use crate::merge::strategy::MergeStrategyKind;
use serde::{Deserialize, Serialize};

/// A single source volume: group plus index within that group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeRef {
    pub group: GroupId,
    pub volume: usize,
}

impl VolumeRef {
    pub fn new(group: GroupId, volume: usize) -> Self {
        Self { group, volume }
    }
}

impl std::fmt::Display for VolumeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.group, self.volume)
    }
}

/// Where one merged volume came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VolumeOrigin {
    /// Copied from one source volume
    Single { source: VolumeRef },
    /// Voxelwise mean of matched source volumes
    Averaged { sources: Vec<VolumeRef> },
}

impl VolumeOrigin {
    pub fn sources(&self) -> &[VolumeRef] {
        match self {
            VolumeOrigin::Single { source } => std::slice::from_ref(source),
            VolumeOrigin::Averaged { sources } => sources,
        }
    }

    pub fn is_averaged(&self) -> bool {
        matches!(self, VolumeOrigin::Averaged { .. })
    }
}

/// Intensity scaling applied to one group before concatenation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupScaling {
    pub group: GroupId,
    pub b0_mean: f64,
    pub factor: f64,
}

/// Ordered record of how a merged dataset was assembled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeProvenance {
    pub strategy: MergeStrategyKind,
    /// Contributing groups, in merge order
    pub groups: Vec<GroupId>,
    /// One entry per merged volume
    pub volumes: Vec<VolumeOrigin>,
    /// Harmonization factors (concatenation only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scaling: Vec<GroupScaling>,
    /// Groups whose volumes could not take part in q-space matching
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmatchable_groups: Vec<GroupId>,
}

impl MergeProvenance {
    pub fn new(strategy: MergeStrategyKind, groups: Vec<GroupId>) -> Self {
        Self {
            strategy,
            groups,
            volumes: Vec::new(),
            scaling: Vec::new(),
            unmatchable_groups: Vec::new(),
        }
    }

    /// Number of merged volumes built from more than one source
    pub fn matched_count(&self) -> usize {
        self.volumes.iter().filter(|v| v.is_averaged()).count()
    }

    /// Number of merged volumes copied from a single source
    pub fn unmatched_count(&self) -> usize {
        self.volumes.len() - self.matched_count()
    }
}

/// Output of one merge invocation (Value Object)
///
/// Invariant: image volume count == bval/bvec rows == provenance entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedDataset {
    image: DwiSeries,
    scheme: GradientScheme,
    provenance: MergeProvenance,
}

impl MergedDataset {
    pub fn new(
        image: DwiSeries,
        scheme: GradientScheme,
        provenance: MergeProvenance,
    ) -> Result<Self, DomainError> {
        let volumes = image.volume_count();
        if volumes != scheme.len() || volumes != provenance.volumes.len() {
            return Err(DomainError::validation(
                "merged",
                format!(
                    "merged image has {} volumes, tables have {} rows, provenance has {} entries",
                    volumes,
                    scheme.len(),
                    provenance.volumes.len()
                ),
            ));
        }
        Ok(Self {
            image,
            scheme,
            provenance,
        })
    }

    /// Replace the image, keeping tables and provenance
    ///
    /// Used when the merged series is denoised after merging; the replacement
    /// must have the same volume count and spatial grid.
    pub fn with_image(self, image: DwiSeries) -> Result<Self, DomainError> {
        if image.volume_count() != self.image.volume_count() || image.grid() != self.image.grid()
        {
            return Err(DomainError::validation(
                "merged",
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

    pub fn image(&self) -> &DwiSeries {
        &self.image
    }

    pub fn scheme(&self) -> &GradientScheme {
        &self.scheme
    }

    pub fn bvals(&self) -> &[f64] {
        self.scheme.bvals()
    }

    pub fn bvecs(&self) -> &[[f64; 3]] {
        self.scheme.bvecs()
    }

    pub fn provenance(&self) -> &MergeProvenance {
        &self.provenance
    }

    pub fn volume_count(&self) -> usize {
        self.image.volume_count()
    }

    pub fn gradient_table(&self, b0_threshold: f64) -> Result<GradientTable, DomainError> {
        GradientTableBuilder::new(b0_threshold).from_scheme(&self.scheme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::data::fixtures::{GRID, uniform_series};

    fn provenance(n: usize) -> MergeProvenance {
        let group = GroupId::new("g").unwrap();
        let mut p = MergeProvenance::new(MergeStrategyKind::Concatenate, vec![group.clone()]);
        p.volumes = (0..n)
            .map(|i| VolumeOrigin::Single {
                source: VolumeRef::new(group.clone(), i),
            })
            .collect();
        p
    }

    #[test]
    fn test_rejects_inconsistent_counts() {
        let scheme = GradientScheme::new(vec![0.0], vec![[0.0; 3]]).unwrap();
        let err = MergedDataset::new(uniform_series(&[1.0, 2.0], GRID), scheme, provenance(2))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_with_image_requires_same_shape() {
        let scheme = GradientScheme::new(vec![0.0], vec![[0.0; 3]]).unwrap();
        let dataset =
            MergedDataset::new(uniform_series(&[1.0], GRID), scheme, provenance(1)).unwrap();
        assert!(
            dataset
                .clone()
                .with_image(uniform_series(&[1.0, 2.0], GRID))
                .is_err()
        );
        let replaced = dataset.with_image(uniform_series(&[5.0], GRID)).unwrap();
        assert_eq!(replaced.image().volume(0)[[0, 0, 0]], 5.0);
    }

    #[test]
    fn test_origin_sources() {
        let a = VolumeRef::new(GroupId::new("a").unwrap(), 1);
        let b = VolumeRef::new(GroupId::new("b").unwrap(), 3);
        let single = VolumeOrigin::Single { source: a.clone() };
        let pair = VolumeOrigin::Averaged {
            sources: vec![a.clone(), b],
        };
        assert_eq!(single.sources(), &[a]);
        assert_eq!(pair.sources().len(), 2);
        assert!(pair.is_averaged());
        assert_eq!(pair.sources()[1].to_string(), "b[3]");
    }
}
