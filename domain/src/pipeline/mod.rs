//! Dependency graph of a merge run.

pub mod graph;
pub mod node;

pub use graph::{PipelineGraph, PlanOptions};
pub use node::{NodeKind, PipelineNode, Signal};
