//! Pipeline nodes and the signals that flow between them

use crate::core::group_id::GroupId;
use serde::{Deserialize, Serialize};

/// A value produced by exactly one node and consumed by others
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "signal", content = "group", rename_all = "snake_case")]
pub enum Signal {
    GroupData(GroupId),
    DenoisedGroup(GroupId),
    NoiseMap(GroupId),
    MergedDataset,
    DenoisedDataset,
    MergedNoiseMap,
    GradientTable,
    DiceScore,
    PreMergeQc,
    MergedQc,
    SamplingReport,
    SeriesQc,
    Derivatives,
}

impl Signal {
    pub fn name(&self) -> String {
        match self {
            Signal::GroupData(g) => format!("{g}_data"),
            Signal::DenoisedGroup(g) => format!("{g}_denoised"),
            Signal::NoiseMap(g) => format!("{g}_noise_image"),
            Signal::MergedDataset => "merged_dataset".to_string(),
            Signal::DenoisedDataset => "denoised_dataset".to_string(),
            Signal::MergedNoiseMap => "noise_image".to_string(),
            Signal::GradientTable => "gradient_table".to_string(),
            Signal::DiceScore => "t1_dice_score".to_string(),
            Signal::PreMergeQc => "pre_qc".to_string(),
            Signal::MergedQc => "t1_qc".to_string(),
            Signal::SamplingReport => "sampling_scheme".to_string(),
            Signal::SeriesQc => "series_qc".to_string(),
            Signal::Derivatives => "derivatives".to_string(),
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "group", rename_all = "snake_case")]
pub enum NodeKind {
    LoadGroup(GroupId),
    DenoiseGroup(GroupId),
    Merge,
    DenoiseMerged,
    GradientTable,
    MaskOverlap,
    LoadPreMergeQc,
    BeforeAfterQc,
    SamplingReport,
    SeriesQc,
    WriteDerivatives,
}

impl NodeKind {
    /// Unique node id within one graph
    pub fn name(&self) -> String {
        match self {
            NodeKind::LoadGroup(g) => format!("load_group[{g}]"),
            NodeKind::DenoiseGroup(g) => format!("denoise[{g}]"),
            NodeKind::Merge => "merge".to_string(),
            NodeKind::DenoiseMerged => "denoise_merged".to_string(),
            NodeKind::GradientTable => "gradient_table".to_string(),
            NodeKind::MaskOverlap => "t1_dice_calc".to_string(),
            NodeKind::LoadPreMergeQc => "load_pre_qc".to_string(),
            NodeKind::BeforeAfterQc => "merged_qc".to_string(),
            NodeKind::SamplingReport => "gradient_plot".to_string(),
            NodeKind::SeriesQc => "series_qc".to_string(),
            NodeKind::WriteDerivatives => "ds_derivatives".to_string(),
        }
    }

    /// Cheap nodes run inline instead of on the worker pool
    pub fn is_lightweight(&self) -> bool {
        matches!(
            self,
            NodeKind::GradientTable
                | NodeKind::SamplingReport
                | NodeKind::SeriesQc
                | NodeKind::WriteDerivatives
        )
    }

    /// Nodes that operate on one acquisition group
    pub fn group(&self) -> Option<&GroupId> {
        match self {
            NodeKind::LoadGroup(g) | NodeKind::DenoiseGroup(g) => Some(g),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineNode {
    pub id: String,
    pub kind: NodeKind,
    pub inputs: Vec<Signal>,
    pub outputs: Vec<Signal>,
}

impl PipelineNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: kind.name(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, signal: Signal) -> Self {
        self.inputs.push(signal);
        self
    }

    pub fn with_inputs(mut self, signals: impl IntoIterator<Item = Signal>) -> Self {
        self.inputs.extend(signals);
        self
    }

    pub fn with_output(mut self, signal: Signal) -> Self {
        self.outputs.push(signal);
        self
    }

    pub fn is_lightweight(&self) -> bool {
        self.kind.is_lightweight()
    }
}
