//! Console output formatter for run results

use crate::output::formatter::OutputFormatter;
use crate::output::summary::RunSummary;
use colored::Colorize;
use dwimerge_domain::PipelineGraph;
use dwimerge_domain::qc::ImageQc;

/// Formats run results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete run summary
    pub fn format(summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("dwimerge"));
        output.push('\n');

        output.push_str(&format!("{} {}\n", "Series:".cyan().bold(), summary.series));
        output.push_str(&format!(
            "{} {} ({})\n",
            "Groups:".cyan().bold(),
            summary.groups.join(", "),
            summary.groups.len()
        ));
        output.push_str(&format!("{} {}\n", "Strategy:".cyan().bold(), summary.strategy));
        output.push_str(&format!("{} {}\n", "Denoise:".cyan().bold(), summary.denoise));

        output.push_str(&Self::section_header("Merged dataset"));
        output.push_str(&format!(
            "  volumes: {} ({} averaged, {} single-source)\n",
            summary.volumes, summary.matched, summary.unmatched
        ));
        output.push_str(&format!("  shells:  {}\n", Self::shells(&summary.shells)));
        if !summary.unmatchable_groups.is_empty() {
            output.push_str(&format!(
                "  {} {}\n",
                "passed through without matching:".yellow(),
                summary.unmatchable_groups.join(", ")
            ));
        }

        output.push_str(&Self::section_header("Quality control"));
        output.push_str(&format!(
            "  t1 dice:  {}\n",
            Self::dice(summary.t1_dice_score)
        ));
        output.push_str(&format!("  raw:      {}\n", Self::image_qc(&summary.raw)));
        output.push_str(&format!("  merged:   {}\n", Self::image_qc(&summary.merged)));
        if summary.volumes_removed() > 0 {
            output.push_str(&format!(
                "  removed:  {} volumes\n",
                summary.volumes_removed()
            ));
        }
        if let Some(fd) = &summary.framewise_displacement {
            output.push_str(&format!("  fd:       mean {:.3}, max {:.3}\n", fd.mean, fd.max));
        }

        if !summary.written.is_empty() {
            output.push_str(&Self::section_header("Outputs"));
            for artifact in &summary.written {
                let kind = match &artifact.label {
                    Some(label) => format!("{} [{}]", artifact.kind, label),
                    None => artifact.kind.to_string(),
                };
                output.push_str(&format!(
                    "  {} {}\n",
                    format!("{:<28}", kind).green(),
                    artifact.path.display()
                ));
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(summary: &RunSummary) -> String {
        serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the planned graph in execution order
    pub fn format_plan(graph: &PipelineGraph) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("dwimerge plan"));
        output.push('\n');

        let levels = match graph.levels() {
            Ok(levels) => levels,
            Err(e) => return format!("{} {}\n", "Invalid pipeline:".red().bold(), e),
        };

        for (index, level) in levels.iter().enumerate() {
            output.push_str(&Self::section_header(&format!("Wave {}", index + 1)));
            for node in level {
                let marker = if node.is_lightweight() { "inline" } else { "worker" };
                let inputs: Vec<String> = node.inputs.iter().map(|s| s.name()).collect();
                output.push_str(&format!(
                    "  {} {}",
                    format!("{:<24}", node.id).yellow().bold(),
                    marker.dimmed()
                ));
                if !inputs.is_empty() {
                    output.push_str(&format!(" <- {}", inputs.join(", ")));
                }
                output.push('\n');
            }
        }

        output.push_str(&format!("\n{} nodes\n", graph.len()));
        output
    }

    fn image_qc(qc: &ImageQc) -> String {
        let b0 = qc
            .mean_b0_intensity
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "n/a".to_string());
        let corr = qc
            .mean_neighbor_correlation
            .map(|v| format!("{:.3}", v))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "{} volumes, {} b0 (mean {}), neighbor corr {}",
            qc.num_volumes, qc.num_b0, b0, corr
        )
    }

    fn shells(shells: &[f64]) -> String {
        let values: Vec<String> = shells.iter().map(|b| format!("{}", b)).collect();
        values.join(", ")
    }

    fn dice(score: f64) -> String {
        let text = format!("{:.3}", score);
        if score >= 0.8 {
            text.green().to_string()
        } else if score >= 0.6 {
            text.yellow().to_string()
        } else {
            text.red().to_string()
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, summary: &RunSummary) -> String {
        Self::format(summary)
    }

    fn format_json(&self, summary: &RunSummary) -> String {
        Self::format_json(summary)
    }

    fn format_plan(&self, graph: &PipelineGraph) -> String {
        Self::format_plan(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwimerge_application::WrittenArtifact;
    use dwimerge_domain::{GroupId, MergeConfig, OutputKind, PlanOptions};
    use std::path::PathBuf;

    fn summary() -> RunSummary {
        RunSummary {
            series: "sub-01_dwi".to_string(),
            strategy: "average".to_string(),
            groups: vec!["dir_AP".to_string(), "dir_PA".to_string()],
            volumes: 5,
            matched: 5,
            unmatched: 0,
            unmatchable_groups: Vec::new(),
            denoise: "skipped".to_string(),
            shells: vec![0.0, 1000.0],
            t1_dice_score: 0.91,
            raw: ImageQc {
                num_volumes: 10,
                num_b0: 2,
                mean_b0_intensity: Some(400.0),
                mean_neighbor_correlation: Some(0.95),
            },
            merged: ImageQc {
                num_volumes: 5,
                num_b0: 1,
                mean_b0_intensity: Some(400.0),
                mean_neighbor_correlation: None,
            },
            framewise_displacement: None,
            written: vec![WrittenArtifact {
                kind: OutputKind::NoiseImage,
                label: Some("dir_AP".to_string()),
                path: PathBuf::from("/out/sub-01_noise_image_dir_AP.json"),
            }],
        }
    }

    #[test]
    fn test_format_mentions_key_facts() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format(&summary());
        assert!(text.contains("Series: sub-01_dwi"));
        assert!(text.contains("dir_AP, dir_PA (2)"));
        assert!(text.contains("volumes: 5 (5 averaged, 0 single-source)"));
        assert!(text.contains("removed:  5 volumes"));
        assert!(text.contains("neighbor corr n/a"));
        assert!(text.contains("noise_image [dir_AP]"));
    }

    #[test]
    fn test_format_json_is_parseable() {
        let json = ConsoleFormatter::format_json(&summary());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["volumes"], 5);
        assert_eq!(value["written"][0]["kind"], "noise_image");
        assert_eq!(value["raw"]["num_b0"], 2);
    }

    #[test]
    fn test_format_plan_lists_waves() {
        colored::control::set_override(false);
        let groups = vec![GroupId::new("dir-AP").unwrap(), GroupId::new("dir-PA").unwrap()];
        let options = PlanOptions::default().with_masks(true).with_pre_merge_qc(true);
        let graph = PipelineGraph::plan(&groups, &MergeConfig::default(), options).unwrap();

        let text = ConsoleFormatter::format_plan(&graph);
        assert!(text.contains("Wave 1"));
        assert!(text.contains("load_group[dir_AP]"));
        assert!(text.contains("ds_derivatives"));
        assert!(text.contains(&format!("{} nodes", graph.len())));
        let merge_at = text.find("merge ").unwrap();
        let load_at = text.find("load_group[dir_PA]").unwrap();
        assert!(load_at < merge_at);
    }
}
