//! CLI entrypoint for dwimerge
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use dwimerge_application::{MergePorts, RunMergeInput, RunMergeUseCase};
use dwimerge_domain::ReportSettings;
use dwimerge_infrastructure::{
    CommandDenoiser, ConfigLoader, FileConfig, FileQcSource, FsDerivativesSink, FslGradientStore,
    JsonImageStore, JsonlRunLogger, RunManifest, StoreDiceCalculator,
};
use dwimerge_presentation::{
    Cli, ConsoleFormatter, OutputFormat, ProgressReporter, RunSummary,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging based on verbosity level, optionally teeing into a file
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            if let Some(dir) = dir {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating log directory {}", dir.display()))?;
            }
            let Some(name) = path.file_name() else {
                bail!("--log-file must name a file: {}", path.display());
            };
            let appender = tracing_appender::rolling::never(dir.unwrap_or(Path::new(".")), name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(level))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn report_settings(config: &FileConfig, cli: &Cli, manifest: &RunManifest) -> ReportSettings {
    let output_dir = cli
        .output_dir
        .clone()
        .or_else(|| config.output.output_dir.clone())
        .unwrap_or_else(|| manifest.base_dir().to_path_buf());

    let mut settings = ReportSettings::new(
        output_dir,
        config.output.output_prefix.clone().unwrap_or_default(),
    );
    if let Some(dir) = &config.output.reportlets_dir {
        settings = settings.with_reportlets_dir(dir.clone());
    }
    if let Some(source) = manifest.source_file() {
        settings = settings.with_source_file(source);
    }
    settings
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    // === Configuration ===
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())?
    };
    if !config.output.color {
        colored::control::set_override(false);
    }

    let mut merge_config = config.into_merge_config()?;
    if let Some(strategy) = &cli.strategy {
        merge_config = merge_config.with_strategy(strategy.parse()?);
    }

    let Some(manifest_path) = cli.manifest.as_deref() else {
        bail!("--manifest is required");
    };
    let manifest = RunManifest::load(manifest_path)?;
    let groups = manifest.group_set()?;
    let settings = report_settings(&config, &cli, &manifest);
    let series = manifest.series.clone().unwrap_or_else(|| settings.stem());

    info!(
        "Starting dwimerge for {} ({} groups) from {}",
        series,
        groups.len(),
        manifest_path.display()
    );

    // === Dependency Injection ===
    let images = Arc::new(JsonImageStore::new());
    let ports = MergePorts {
        images: images.clone(),
        gradients: Arc::new(FslGradientStore::new()),
        denoiser: Arc::new(CommandDenoiser::from_config(&config.denoise)),
        masks: Arc::new(StoreDiceCalculator::new(images)),
        qc: Arc::new(FileQcSource::new()),
        sink: Arc::new(FsDerivativesSink::new(settings)),
    };

    let mut use_case =
        RunMergeUseCase::new(ports).with_execution_params(config.execution_params());
    if let Some(path) = &config.execution.journal {
        match JsonlRunLogger::new(path) {
            Some(logger) => use_case = use_case.with_run_logger(Arc::new(logger)),
            None => warn!("Run journal disabled: cannot write {}", path.display()),
        }
    }

    let input = RunMergeInput::new(series, groups, merge_config).with_artifacts(manifest.artifacts());

    if cli.dry_run {
        let graph = use_case.plan(&input)?;
        println!("{}", ConsoleFormatter::format_plan(&graph));
        return Ok(());
    }

    // Execute with or without progress reporting
    let result = if cli.quiet {
        use_case.execute(input).await
    } else {
        let progress = ProgressReporter::new();
        use_case.execute_with_progress(input, &progress).await
    };

    let output = match result {
        Ok(output) => output,
        Err(e) => bail!("merge failed ({}): {}", e.kind(), e),
    };

    let summary = RunSummary::from_output(&output);
    let text = match cli.output {
        OutputFormat::Summary => ConsoleFormatter::format(&summary),
        OutputFormat::Json => ConsoleFormatter::format_json(&summary),
    };
    println!("{}", text);

    Ok(())
}
