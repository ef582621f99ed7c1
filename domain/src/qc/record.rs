//! Per-series QC record and its inputs

use crate::core::group_id::GroupId;
use crate::merge::strategy::MergeStrategyKind;
use crate::qc::confounds::ConfoundSummary;
use crate::qc::image_qc::ImageQc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named metrics produced by the upstream (pre-merge) QC step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreMergeQc {
    metrics: BTreeMap<String, f64>,
}

impl PreMergeQc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl FromIterator<(String, f64)> for PreMergeQc {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            metrics: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientSummary {
    pub num_volumes: usize,
    pub num_b0: usize,
    pub shells: Vec<f64>,
}

/// Terminal QC artifact of one merged series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesQcRecord {
    pub series: String,
    pub strategy: MergeStrategyKind,
    pub groups: Vec<GroupId>,
    pub t1_dice_score: f64,
    pub pre_merge: PreMergeQc,
    pub confounds: Option<ConfoundSummary>,
    pub raw: ImageQc,
    pub merged: ImageQc,
    pub gradients: GradientSummary,
}

impl SeriesQcRecord {
    /// Volumes removed by averaging
    pub fn volumes_removed(&self) -> usize {
        self.raw.num_volumes.saturating_sub(self.merged.num_volumes)
    }
}
