//! q-space averaging of matched volumes
//!
//! Volumes from different groups that sampled the same q-space coordinate
//! are averaged voxelwise. Identity is decided on the *original* b-vectors:
//! the final b-vectors may have been rotated per volume by motion correction
//! and no longer identify the acquired coordinate.
//!
//! Groups are processed in order. The first group seeds one cluster per
//! volume; every later group assigns each of its volumes to at most one
//! existing cluster (cheapest match first, one volume per group per
//! cluster) or seeds a new cluster. Each cluster becomes one merged volume.

use crate::acquisition::data::GroupData;
use crate::core::error::DomainError;
use crate::gradient::scheme::GradientScheme;
use crate::image::series::DwiSeries;
use crate::merge::dataset::{MergeProvenance, MergedDataset, VolumeOrigin, VolumeRef};
use crate::merge::matching::{QSpacePoint, QSpaceTolerance};
use crate::merge::strategy::{MergeStrategy, MergeStrategyKind, require_common_grid};
use ndarray::{Array3, ArrayView3};

const MIN_DIRECTION_NORM: f64 = 1e-6;

#[derive(Debug)]
struct Cluster {
    /// `None` for volumes of groups without usable original b-vectors
    anchor: Option<QSpacePoint>,
    /// (group index, volume index)
    members: Vec<(usize, usize)>,
}

/// Averages volumes that were acquired at the same q-space coordinate
#[derive(Debug, Clone)]
pub struct Averager {
    b0_threshold: f64,
    tolerance: QSpaceTolerance,
}

impl Averager {
    pub fn new(b0_threshold: f64) -> Self {
        Self {
            b0_threshold,
            tolerance: QSpaceTolerance::default(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: QSpaceTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn cluster(&self, groups: &[GroupData]) -> (Vec<Cluster>, Vec<usize>) {
        let mut clusters: Vec<Cluster> = Vec::new();
        let mut unmatchable = Vec::new();

        for (gi, group) in groups.iter().enumerate() {
            let n = group.volume_count();

            if !group.has_usable_original_bvecs() {
                unmatchable.push(gi);
                clusters.extend((0..n).map(|v| Cluster {
                    anchor: None,
                    members: vec![(gi, v)],
                }));
                continue;
            }

            let points: Vec<QSpacePoint> = (0..n)
                .map(|v| QSpacePoint::new(group.scheme().bval(v), group.original_bvecs()[v]))
                .collect();

            let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
            for (v, point) in points.iter().enumerate() {
                for (ci, cluster) in clusters.iter().enumerate() {
                    let Some(anchor) = cluster.anchor else {
                        continue;
                    };
                    if cluster.members.iter().any(|(g, _)| *g == gi) {
                        continue;
                    }
                    if let Some(cost) = self.tolerance.match_cost(anchor, *point, self.b0_threshold)
                    {
                        candidates.push((cost, v, ci));
                    }
                }
            }
            candidates.sort_by(|a, b| {
                a.0.total_cmp(&b.0)
                    .then(a.1.cmp(&b.1))
                    .then(a.2.cmp(&b.2))
            });

            let mut assigned: Vec<Option<usize>> = vec![None; n];
            let mut taken = vec![false; clusters.len()];
            for (_, v, ci) in candidates {
                if assigned[v].is_none() && !taken[ci] {
                    assigned[v] = Some(ci);
                    taken[ci] = true;
                }
            }

            for (v, point) in points.into_iter().enumerate() {
                match assigned[v] {
                    Some(ci) => clusters[ci].members.push((gi, v)),
                    None => clusters.push(Cluster {
                        anchor: Some(point),
                        members: vec![(gi, v)],
                    }),
                }
            }
        }

        (clusters, unmatchable)
    }

    /// Mean of sign-aligned final b-vectors, renormalized
    fn mean_direction(vectors: &[[f64; 3]]) -> [f64; 3] {
        let reference = vectors[0];
        let mut sum = [0.0_f64; 3];
        for v in vectors {
            let dot: f64 = v.iter().zip(&reference).map(|(a, b)| a * b).sum();
            let sign = if dot < 0.0 { -1.0 } else { 1.0 };
            for k in 0..3 {
                sum[k] += sign * v[k];
            }
        }
        let norm = sum.iter().map(|c| c * c).sum::<f64>().sqrt();
        if norm < MIN_DIRECTION_NORM {
            [0.0; 3]
        } else {
            [sum[0] / norm, sum[1] / norm, sum[2] / norm]
        }
    }
}

impl MergeStrategy for Averager {
    fn kind(&self) -> MergeStrategyKind {
        MergeStrategyKind::Average
    }

    fn merge(&self, groups: &[GroupData]) -> Result<MergedDataset, DomainError> {
        if groups.len() < 2 {
            return Err(DomainError::validation(
                "<groups>",
                format!(
                    "averaging requires at least two acquisition groups, got {}",
                    groups.len()
                ),
            ));
        }
        if !groups.iter().any(|g| g.has_usable_original_bvecs()) {
            return Err(DomainError::validation(
                "original_bvec",
                "no acquisition group provides usable original b-vectors",
            ));
        }
        require_common_grid(groups)?;

        let (clusters, unmatchable) = self.cluster(groups);

        let mut volumes: Vec<Array3<f32>> = Vec::with_capacity(clusters.len());
        let mut bvals = Vec::with_capacity(clusters.len());
        let mut bvecs = Vec::with_capacity(clusters.len());
        let mut origins = Vec::with_capacity(clusters.len());

        for cluster in &clusters {
            let views: Vec<ArrayView3<f32>> = cluster
                .members
                .iter()
                .map(|&(g, v)| groups[g].image().volume(v))
                .collect();
            let member_bvals: Vec<f64> = cluster
                .members
                .iter()
                .map(|&(g, v)| groups[g].scheme().bval(v))
                .collect();
            let member_bvecs: Vec<[f64; 3]> = cluster
                .members
                .iter()
                .map(|&(g, v)| groups[g].scheme().bvec(v))
                .collect();
            let sources: Vec<VolumeRef> = cluster
                .members
                .iter()
                .map(|&(g, v)| VolumeRef::new(groups[g].id().clone(), v))
                .collect();

            if sources.len() == 1 {
                volumes.push(views[0].to_owned());
                bvals.push(member_bvals[0]);
                bvecs.push(member_bvecs[0]);
                origins.push(VolumeOrigin::Single {
                    source: sources[0].clone(),
                });
            } else {
                volumes.push(DwiSeries::average_volumes(&views)?);
                bvals.push(member_bvals.iter().sum::<f64>() / member_bvals.len() as f64);
                bvecs.push(Self::mean_direction(&member_bvecs));
                origins.push(VolumeOrigin::Averaged { sources });
            }
        }

        let image = DwiSeries::from_volumes(&volumes)?;
        let scheme = GradientScheme::new(bvals, bvecs)?;

        let mut provenance = MergeProvenance::new(
            MergeStrategyKind::Average,
            groups.iter().map(|g| g.id().clone()).collect(),
        );
        provenance.volumes = origins;
        provenance.unmatchable_groups = unmatchable
            .into_iter()
            .map(|gi| groups[gi].id().clone())
            .collect();

        MergedDataset::new(image, scheme, provenance)
    }
}
