//! Image-level QC for the raw concatenation and the merged series

use crate::acquisition::data::GroupData;
use crate::core::error::DomainError;
use crate::gradient::scheme::GradientScheme;
use crate::image::series::DwiSeries;
use crate::merge::dataset::MergedDataset;
use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};

/// Summary metrics of one diffusion series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageQc {
    pub num_volumes: usize,
    pub num_b0: usize,
    /// Mean intensity of the b0 volumes, `None` without b0s
    pub mean_b0_intensity: Option<f64>,
    /// Mean Pearson correlation of consecutive weighted volumes
    pub mean_neighbor_correlation: Option<f64>,
}

impl ImageQc {
    pub fn compute(
        series: &DwiSeries,
        scheme: &GradientScheme,
        b0_threshold: f64,
    ) -> Result<Self, DomainError> {
        if series.volume_count() != scheme.len() {
            return Err(DomainError::validation(
                "qc",
                format!(
                    "series has {} volumes but gradient scheme has {} rows",
                    series.volume_count(),
                    scheme.len()
                ),
            ));
        }

        let b0 = scheme.b0_indices(b0_threshold);
        let weighted: Vec<usize> = (0..scheme.len())
            .filter(|&i| !scheme.is_b0(i, b0_threshold))
            .collect();

        let correlations: Vec<f64> = weighted
            .windows(2)
            .filter_map(|pair| pearson(series.volume(pair[0]), series.volume(pair[1])))
            .collect();
        let mean_neighbor_correlation = (!correlations.is_empty())
            .then(|| correlations.iter().sum::<f64>() / correlations.len() as f64);

        Ok(Self {
            num_volumes: series.volume_count(),
            num_b0: b0.len(),
            mean_b0_intensity: series.mean_of_volumes(&b0),
            mean_neighbor_correlation,
        })
    }
}

/// Correlation of two volumes; `None` when either has no variance
fn pearson(a: ArrayView3<f32>, b: ArrayView3<f32>) -> Option<f64> {
    let n = a.len();
    if n == 0 || n != b.len() {
        return None;
    }
    let mean_a = a.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    let mean_b = b.iter().map(|&v| v as f64).sum::<f64>() / n as f64;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a <= f64::EPSILON || var_b <= f64::EPSILON {
        return None;
    }
    Some(cov / (var_a.sqrt() * var_b.sqrt()))
}

/// QC of the raw concatenation next to the merged result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeforeAfterQc {
    pub raw: ImageQc,
    pub merged: ImageQc,
}

impl BeforeAfterQc {
    pub fn compute(
        groups: &[GroupData],
        merged: &MergedDataset,
        b0_threshold: f64,
    ) -> Result<Self, DomainError> {
        let raw_series: Vec<&DwiSeries> = groups.iter().map(|g| g.raw_concatenated()).collect();
        let raw_schemes: Vec<&GradientScheme> = groups.iter().map(|g| g.scheme()).collect();
        let raw = DwiSeries::concatenate(&raw_series)?;
        let raw_scheme = GradientScheme::concatenate(&raw_schemes);

        Ok(Self {
            raw: ImageQc::compute(&raw, &raw_scheme, b0_threshold)?,
            merged: ImageQc::compute(merged.image(), merged.scheme(), b0_threshold)?,
        })
    }
}
