//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for run results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored summary of the merge, QC and written files
    Summary,
    /// JSON output
    Json,
}

/// CLI arguments for dwimerge
#[derive(Parser, Debug)]
#[command(name = "dwimerge")]
#[command(author, version, about = "Merge distortion groups of a diffusion series")]
#[command(long_about = r#"
dwimerge combines independently corrected diffusion acquisition groups of one
series (e.g. opposite phase-encoding directions) into one dataset plus a QC record.

Groups are either concatenated along the diffusion axis or averaged where
they sampled the same q-space coordinate.

Configuration files are loaded from (in priority order):
1. DWIMERGE_<SECTION>__<KEY>             Environment
2. --config <path>                      Explicit config file
3. ./dwimerge.toml or ./.dwimerge.toml  Project-level config
4. ~/.config/dwimerge/config.toml       Global config

Example:
  dwimerge --manifest sub-01_run.toml
  dwimerge --manifest sub-01_run.toml --strategy average --output json
  dwimerge --manifest sub-01_run.toml --dry-run
"#)]
pub struct Cli {
    /// Run manifest listing groups and their artifacts
    #[arg(short, long, value_name = "PATH", required_unless_present = "show_config")]
    pub manifest: Option<PathBuf>,

    /// Merge strategy: "average" or "concat" (overrides config)
    #[arg(short, long, value_name = "STRATEGY")]
    pub strategy: Option<String>,

    /// Derivatives directory (overrides config)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    pub output: OutputFormat,

    /// Print the validated pipeline graph without running it
    #[arg(long)]
    pub dry_run: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
