//! Sampling-scheme report
//!
//! Per-volume q-space coordinates of the merged series, with the groups that
//! contributed to each volume. Rendered as the gradient-plot reportlet.

use crate::core::error::DomainError;
use crate::gradient::table::GradientTable;
use crate::merge::dataset::MergeProvenance;
use serde::{Deserialize, Serialize};

/// Shells closer than this are reported as one
const SHELL_TOLERANCE: f64 = 100.0;

/// One merged volume in q-space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingPoint {
    pub volume: usize,
    /// Unit direction scaled by `sqrt(b)`
    pub q: [f64; 3],
    pub b_value: f64,
    /// Groups that contributed to this volume, in merge order
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingSchemeReport {
    pub shells: Vec<f64>,
    pub points: Vec<SamplingPoint>,
    /// Original images of the contributing groups
    pub source_files: Vec<String>,
}

impl SamplingSchemeReport {
    pub fn new(
        table: &GradientTable,
        provenance: &MergeProvenance,
        b0_threshold: f64,
        source_files: Vec<String>,
    ) -> Result<Self, DomainError> {
        if table.len() != provenance.volumes.len() {
            return Err(DomainError::validation(
                "sampling_scheme",
                format!(
                    "gradient table has {} rows but provenance describes {} volumes",
                    table.len(),
                    provenance.volumes.len()
                ),
            ));
        }

        let points = table
            .rows()
            .iter()
            .zip(&provenance.volumes)
            .enumerate()
            .map(|(volume, (row, origin))| {
                let scale = row.b_value.sqrt();
                SamplingPoint {
                    volume,
                    q: row.direction.map(|c| c * scale),
                    b_value: row.b_value,
                    sources: origin
                        .sources()
                        .iter()
                        .map(|s| s.group.to_string())
                        .collect(),
                }
            })
            .collect();

        Ok(Self {
            shells: table.shells(b0_threshold, SHELL_TOLERANCE),
            points,
            source_files,
        })
    }

    /// Number of points that came from more than one group
    pub fn shared_points(&self) -> usize {
        self.points.iter().filter(|p| p.sources.len() > 1).count()
    }
}
