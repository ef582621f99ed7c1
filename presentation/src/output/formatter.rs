//! Output formatter trait

use crate::output::summary::RunSummary;
use dwimerge_domain::PipelineGraph;

/// Trait for formatting run results
pub trait OutputFormatter {
    /// Format the complete run summary
    fn format(&self, summary: &RunSummary) -> String;

    /// Format as JSON
    fn format_json(&self, summary: &RunSummary) -> String;

    /// Format a planned pipeline (dry run)
    fn format_plan(&self, graph: &PipelineGraph) -> String;
}
