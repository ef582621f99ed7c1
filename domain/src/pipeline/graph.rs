//! Explicit dependency graph of one merge run
//!
//! The graph is planned from the group set and configuration, then
//! validated before anything executes: every input must have exactly one
//! producer and the graph must be acyclic.

use crate::config::MergeConfig;
use crate::core::error::DomainError;
use crate::core::group_id::GroupId;
use crate::denoise::DenoisePlacement;
use crate::pipeline::node::{NodeKind, PipelineNode, Signal};
use serde::Serialize;
use std::collections::HashMap;

/// Which optional upstream inputs a run has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlanOptions {
    /// Anatomical and diffusion masks for the overlap score
    pub has_masks: bool,
    /// Pre-merge QC file
    pub has_pre_merge_qc: bool,
}

impl PlanOptions {
    pub fn with_masks(mut self, present: bool) -> Self {
        self.has_masks = present;
        self
    }

    pub fn with_pre_merge_qc(mut self, present: bool) -> Self {
        self.has_pre_merge_qc = present;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineGraph {
    nodes: Vec<PipelineNode>,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and validate the graph for a run
    pub fn plan(
        groups: &[GroupId],
        config: &MergeConfig,
        options: PlanOptions,
    ) -> Result<Self, DomainError> {
        if groups.is_empty() {
            return Err(DomainError::validation("pipeline", "no acquisition groups"));
        }

        let placement = config.denoise.placement();
        let mut graph = Self::new();

        for g in groups {
            graph.add_node(
                PipelineNode::new(NodeKind::LoadGroup(g.clone()))
                    .with_output(Signal::GroupData(g.clone())),
            )?;
            if placement == DenoisePlacement::BeforeMerge {
                graph.add_node(
                    PipelineNode::new(NodeKind::DenoiseGroup(g.clone()))
                        .with_input(Signal::GroupData(g.clone()))
                        .with_output(Signal::DenoisedGroup(g.clone()))
                        .with_output(Signal::NoiseMap(g.clone())),
                )?;
            }
        }

        let merge_inputs = groups.iter().map(|g| match placement {
            DenoisePlacement::BeforeMerge => Signal::DenoisedGroup(g.clone()),
            _ => Signal::GroupData(g.clone()),
        });
        graph.add_node(
            PipelineNode::new(NodeKind::Merge)
                .with_inputs(merge_inputs)
                .with_output(Signal::MergedDataset),
        )?;

        let final_dataset = if placement == DenoisePlacement::AfterMerge {
            graph.add_node(
                PipelineNode::new(NodeKind::DenoiseMerged)
                    .with_input(Signal::MergedDataset)
                    .with_output(Signal::DenoisedDataset)
                    .with_output(Signal::MergedNoiseMap),
            )?;
            Signal::DenoisedDataset
        } else {
            Signal::MergedDataset
        };

        graph.add_node(
            PipelineNode::new(NodeKind::GradientTable)
                .with_input(final_dataset.clone())
                .with_output(Signal::GradientTable),
        )?;
        if options.has_masks {
            graph.add_node(
                PipelineNode::new(NodeKind::MaskOverlap).with_output(Signal::DiceScore),
            )?;
        }
        if options.has_pre_merge_qc {
            graph.add_node(
                PipelineNode::new(NodeKind::LoadPreMergeQc).with_output(Signal::PreMergeQc),
            )?;
        }
        graph.add_node(
            PipelineNode::new(NodeKind::BeforeAfterQc)
                .with_inputs(groups.iter().map(|g| Signal::GroupData(g.clone())))
                .with_input(final_dataset.clone())
                .with_output(Signal::MergedQc),
        )?;
        graph.add_node(
            PipelineNode::new(NodeKind::SamplingReport)
                .with_input(Signal::GradientTable)
                .with_input(final_dataset.clone())
                .with_output(Signal::SamplingReport),
        )?;
        graph.add_node(
            PipelineNode::new(NodeKind::SeriesQc)
                .with_input(Signal::DiceScore)
                .with_input(Signal::PreMergeQc)
                .with_input(Signal::MergedQc)
                .with_input(Signal::GradientTable)
                .with_output(Signal::SeriesQc),
        )?;

        let mut sink_inputs = vec![
            final_dataset,
            Signal::GradientTable,
            Signal::MergedQc,
            Signal::SamplingReport,
            Signal::SeriesQc,
        ];
        match placement {
            DenoisePlacement::BeforeMerge => {
                sink_inputs.extend(groups.iter().map(|g| Signal::NoiseMap(g.clone())))
            }
            DenoisePlacement::AfterMerge => sink_inputs.push(Signal::MergedNoiseMap),
            DenoisePlacement::Skipped => {}
        }
        graph.add_node(
            PipelineNode::new(NodeKind::WriteDerivatives)
                .with_inputs(sink_inputs)
                .with_output(Signal::Derivatives),
        )?;

        graph.validate()?;
        Ok(graph)
    }

    pub fn add_node(&mut self, node: PipelineNode) -> Result<(), DomainError> {
        if self.nodes.iter().any(|n| n.id == node.id) {
            return Err(DomainError::validation(
                "pipeline",
                format!("duplicate node '{}'", node.id),
            ));
        }
        self.nodes.push(node);
        Ok(())
    }

    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    pub fn get(&self, id: &str) -> Option<&PipelineNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, kind: &NodeKind) -> bool {
        self.nodes.iter().any(|n| &n.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn producers(&self) -> Result<HashMap<&Signal, usize>, DomainError> {
        let mut producers = HashMap::new();
        for (index, node) in self.nodes.iter().enumerate() {
            for signal in &node.outputs {
                if let Some(previous) = producers.insert(signal, index) {
                    return Err(DomainError::validation(
                        "pipeline",
                        format!(
                            "signal '{}' is produced by both '{}' and '{}'",
                            signal, self.nodes[previous].id, node.id
                        ),
                    ));
                }
            }
        }
        Ok(producers)
    }

    /// Node indices each node depends on
    fn dependencies(&self) -> Result<Vec<Vec<usize>>, DomainError> {
        let producers = self.producers()?;
        self.nodes
            .iter()
            .map(|node| {
                let mut deps = node
                    .inputs
                    .iter()
                    .map(|signal| {
                        producers
                            .get(signal)
                            .copied()
                            .ok_or_else(|| DomainError::missing_input(&node.id, signal.name()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                deps.sort_unstable();
                deps.dedup();
                Ok(deps)
            })
            .collect()
    }

    /// Check producers and acyclicity
    pub fn validate(&self) -> Result<(), DomainError> {
        self.levels().map(|_| ())
    }

    /// Nodes grouped into waves; every node depends only on earlier waves
    ///
    /// Within a wave, nodes keep insertion order.
    pub fn levels(&self) -> Result<Vec<Vec<&PipelineNode>>, DomainError> {
        let deps = self.dependencies()?;
        let mut level_of: Vec<Option<usize>> = vec![None; self.nodes.len()];
        let mut remaining = self.nodes.len();
        let mut levels: Vec<Vec<&PipelineNode>> = Vec::new();

        while remaining > 0 {
            let ready: Vec<usize> = (0..self.nodes.len())
                .filter(|&i| level_of[i].is_none())
                .filter(|&i| {
                    deps[i]
                        .iter()
                        .all(|&d| level_of[d].is_some_and(|l| l < levels.len()))
                })
                .collect();
            if ready.is_empty() {
                let stuck: Vec<&str> = (0..self.nodes.len())
                    .filter(|&i| level_of[i].is_none())
                    .map(|i| self.nodes[i].id.as_str())
                    .collect();
                return Err(DomainError::validation(
                    "pipeline",
                    format!("dependency cycle among {}", stuck.join(", ")),
                ));
            }
            for &i in &ready {
                level_of[i] = Some(levels.len());
            }
            remaining -= ready.len();
            levels.push(ready.into_iter().map(|i| &self.nodes[i]).collect());
        }

        Ok(levels)
    }

    /// Flattened [`levels`](Self::levels)
    pub fn topological_order(&self) -> Result<Vec<&PipelineNode>, DomainError> {
        Ok(self.levels()?.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denoise::DenoiseSettings;

    fn groups() -> Vec<GroupId> {
        vec![GroupId::new("dir-AP").unwrap(), GroupId::new("dir-PA").unwrap()]
    }

    fn full() -> PlanOptions {
        PlanOptions::default().with_masks(true).with_pre_merge_qc(true)
    }

    fn position(order: &[&PipelineNode], id: &str) -> usize {
        order.iter().position(|n| n.id == id).unwrap()
    }

    #[test]
    fn test_plan_without_denoise() {
        let graph = PipelineGraph::plan(&groups(), &MergeConfig::default(), full()).unwrap();
        assert_eq!(graph.len(), 10);
        assert!(!graph.contains(&NodeKind::DenoiseMerged));

        let order = graph.topological_order().unwrap();
        assert!(position(&order, "load_group[dir_AP]") < position(&order, "merge"));
        assert!(position(&order, "merge") < position(&order, "gradient_table"));
        assert!(position(&order, "gradient_table") < position(&order, "series_qc"));
        assert_eq!(order.last().unwrap().id, "ds_derivatives");
    }

    #[test]
    fn test_group_nodes_share_first_level() {
        let graph = PipelineGraph::plan(&groups(), &MergeConfig::default(), full()).unwrap();
        let levels = graph.levels().unwrap();
        let first: Vec<&str> = levels[0].iter().map(|n| n.id.as_str()).collect();
        assert!(first.contains(&"load_group[dir_AP]"));
        assert!(first.contains(&"load_group[dir_PA]"));
        assert_eq!(levels[1][0].id, "merge");
    }

    #[test]
    fn test_plan_denoise_before_merge() {
        let config =
            MergeConfig::default().with_denoise(DenoiseSettings::new(5).with_before_merge(true));
        let graph = PipelineGraph::plan(&groups(), &config, full()).unwrap();
        let merge = graph.get("merge").unwrap();
        assert!(merge.inputs.iter().all(|s| matches!(s, Signal::DenoisedGroup(_))));
        let sink = graph.get("ds_derivatives").unwrap();
        assert!(sink.inputs.iter().any(|s| matches!(s, Signal::NoiseMap(_))));
    }

    #[test]
    fn test_plan_denoise_after_merge() {
        let config = MergeConfig::default().with_denoise(DenoiseSettings::new(5));
        let graph = PipelineGraph::plan(&groups(), &config, full()).unwrap();
        assert!(graph.contains(&NodeKind::DenoiseMerged));
        assert_eq!(
            graph.get("gradient_table").unwrap().inputs,
            vec![Signal::DenoisedDataset]
        );
    }

    #[test]
    fn test_missing_masks_is_missing_input() {
        let options = PlanOptions::default().with_pre_merge_qc(true);
        let err = PipelineGraph::plan(&groups(), &MergeConfig::default(), options).unwrap_err();
        assert_eq!(err, DomainError::missing_input("series_qc", "t1_dice_score"));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut graph = PipelineGraph::new();
        graph
            .add_node(
                PipelineNode::new(NodeKind::Merge)
                    .with_input(Signal::GradientTable)
                    .with_output(Signal::MergedDataset),
            )
            .unwrap();
        graph
            .add_node(
                PipelineNode::new(NodeKind::GradientTable)
                    .with_input(Signal::MergedDataset)
                    .with_output(Signal::GradientTable),
            )
            .unwrap();
        let err = graph.validate().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_duplicate_producer_is_rejected() {
        let mut graph = PipelineGraph::new();
        graph
            .add_node(PipelineNode::new(NodeKind::Merge).with_output(Signal::MergedDataset))
            .unwrap();
        graph
            .add_node(
                PipelineNode::new(NodeKind::DenoiseMerged).with_output(Signal::MergedDataset),
            )
            .unwrap();
        assert!(graph.validate().unwrap_err().is_validation());
        assert!(
            graph
                .add_node(PipelineNode::new(NodeKind::Merge))
                .is_err()
        );
    }

    #[test]
    fn test_empty_groups_rejected() {
        assert!(PipelineGraph::plan(&[], &MergeConfig::default(), full()).is_err());
    }
}
