//! Progress notification port
//!
//! Defines the interface for reporting progress while a merge run executes.

use dwimerge_domain::PipelineNode;

/// Callback for progress updates during a run
///
/// Implementations live in the presentation layer.
pub trait PipelineProgress: Send + Sync {
    /// Called once the graph is validated
    fn on_run_start(&self, total_nodes: usize);

    fn on_node_start(&self, node: &PipelineNode);

    fn on_node_complete(&self, node: &PipelineNode, success: bool);

    fn on_run_complete(&self, success: bool);
}

/// No-op progress for when progress reporting is not needed
pub struct NoProgress;

impl PipelineProgress for NoProgress {
    fn on_run_start(&self, _total_nodes: usize) {}
    fn on_node_start(&self, _node: &PipelineNode) {}
    fn on_node_complete(&self, _node: &PipelineNode, _success: bool) {}
    fn on_run_complete(&self, _success: bool) {}
}
