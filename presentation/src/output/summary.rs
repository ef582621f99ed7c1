//! Display-ready summary of a finished run

use dwimerge_application::{RunMergeOutput, WrittenArtifact};
use dwimerge_domain::qc::{ColumnSummary, ImageQc};
use serde::Serialize;

/// What a run produced, without the image data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub series: String,
    pub strategy: String,
    pub groups: Vec<String>,
    pub volumes: usize,
    /// Merged volumes averaged from more than one source
    pub matched: usize,
    pub unmatched: usize,
    /// Groups passed through by the averager for lack of original b-vectors
    pub unmatchable_groups: Vec<String>,
    pub denoise: String,
    pub shells: Vec<f64>,
    pub t1_dice_score: f64,
    pub raw: ImageQc,
    pub merged: ImageQc,
    pub framewise_displacement: Option<ColumnSummary>,
    pub written: Vec<WrittenArtifact>,
}

impl RunSummary {
    pub fn from_output(output: &RunMergeOutput) -> Self {
        let provenance = output.dataset.provenance();
        Self {
            series: output.qc.series.clone(),
            strategy: provenance.strategy.to_string(),
            groups: provenance.groups.iter().map(|g| g.to_string()).collect(),
            volumes: output.dataset.volume_count(),
            matched: provenance.matched_count(),
            unmatched: provenance.unmatched_count(),
            unmatchable_groups: provenance
                .unmatchable_groups
                .iter()
                .map(|g| g.to_string())
                .collect(),
            denoise: output.placement.to_string(),
            shells: output.sampling.shells.clone(),
            t1_dice_score: output.qc.t1_dice_score,
            raw: output.qc.raw.clone(),
            merged: output.qc.merged.clone(),
            framewise_displacement: output
                .qc
                .confounds
                .as_ref()
                .and_then(|c| c.framewise_displacement),
            written: output.written.clone(),
        }
    }

    /// Volumes removed by averaging
    pub fn volumes_removed(&self) -> usize {
        self.raw.num_volumes.saturating_sub(self.merged.num_volumes)
    }
}
