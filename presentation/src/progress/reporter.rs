//! Progress reporting for pipeline execution

use colored::Colorize;
use dwimerge_application::ports::progress::PipelineProgress;
use dwimerge_domain::PipelineNode;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Reports progress with a single bar across all pipeline nodes
pub struct ProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn run_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock()
            && let Some(bar) = guard.as_ref()
        {
            f(bar);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineProgress for ProgressReporter {
    fn on_run_start(&self, total_nodes: usize) {
        let bar = ProgressBar::new(total_nodes as u64);
        bar.set_style(Self::run_style());
        bar.set_prefix("Merging");
        bar.set_message("Starting...");

        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn on_node_start(&self, node: &PipelineNode) {
        self.with_bar(|bar| bar.set_message(node.id.clone()));
    }

    fn on_node_complete(&self, node: &PipelineNode, success: bool) {
        self.with_bar(|bar| {
            let status = if success {
                format!("{} {}", "v".green(), node.id)
            } else {
                format!("{} {}", "x".red(), node.id)
            };
            bar.set_message(status);
            bar.inc(1);
        });
    }

    fn on_run_complete(&self, success: bool) {
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };
        if let Some(bar) = guard.take() {
            if success {
                bar.finish_with_message(format!("{}", "complete!".green()));
            } else {
                bar.abandon_with_message(format!("{}", "failed".red()));
            }
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl PipelineProgress for SimpleProgress {
    fn on_run_start(&self, total_nodes: usize) {
        println!("{} {} ({} nodes)", "->".cyan(), "Merging".bold(), total_nodes);
    }

    fn on_node_start(&self, _node: &PipelineNode) {}

    fn on_node_complete(&self, node: &PipelineNode, success: bool) {
        if success {
            println!("  {} {}", "v".green(), node.id);
        } else {
            println!("  {} {} (failed)", "x".red(), node.id);
        }
    }

    fn on_run_complete(&self, _success: bool) {
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwimerge_domain::NodeKind;

    #[test]
    fn test_reporter_counts_completed_nodes() {
        let reporter = ProgressReporter::new();
        reporter.on_run_start(3);
        let node = PipelineNode::new(NodeKind::Merge);
        reporter.on_node_start(&node);
        reporter.on_node_complete(&node, true);
        reporter.on_node_complete(&PipelineNode::new(NodeKind::GradientTable), false);

        let position = reporter.bar.lock().unwrap().as_ref().map(|b| b.position());
        assert_eq!(position, Some(2));

        reporter.on_run_complete(true);
        assert!(reporter.bar.lock().unwrap().is_none());
    }

    #[test]
    fn test_events_before_start_are_ignored() {
        let reporter = ProgressReporter::default();
        reporter.on_node_complete(&PipelineNode::new(NodeKind::Merge), true);
        reporter.on_run_complete(false);
        assert!(reporter.bar.lock().unwrap().is_none());
    }
}
