//! Denoiser that shells out to an external tool
//!
//! The image is written to a scratch directory in the JSON image format and
//! the configured argument template is rendered with `{input}`, `{output}`,
//! `{noise}` and `{extent}` (as `x,y,z`). The tool must write both the
//! denoised image and the noise map in the same format.

use crate::config::FileDenoiseConfig;
use crate::storage::{decode_series, encode_series};
use async_trait::async_trait;
use dwimerge_application::ports::denoiser::{DenoiseError, DenoiseOutput, Denoiser};
use dwimerge_domain::DwiSeries;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// [`Denoiser`] running a command-line tool per call
#[derive(Debug, Clone)]
pub struct CommandDenoiser {
    command: String,
    args: Vec<String>,
    scratch_root: PathBuf,
}

impl CommandDenoiser {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            scratch_root: std::env::temp_dir(),
        }
    }

    pub fn from_config(config: &FileDenoiseConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
    }

    /// Directory under which per-call scratch directories are created
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    fn render_args(&self, input: &Path, output: &Path, noise: &Path, extent: [u32; 3]) -> Vec<String> {
        let extent = format!("{},{},{}", extent[0], extent[1], extent[2]);
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input.to_string_lossy())
                    .replace("{output}", &output.to_string_lossy())
                    .replace("{noise}", &noise.to_string_lossy())
                    .replace("{extent}", &extent)
            })
            .collect()
    }

    /// Per-call scratch directory, removed when the guard is dropped
    fn scratch_dir(&self, label: &str) -> std::io::Result<TempDir> {
        let label: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        tempfile::Builder::new()
            .prefix(&format!("dwimerge-denoise-{}-", label))
            .tempdir_in(&self.scratch_root)
    }

    async fn run_in(
        &self,
        program: &Path,
        dir: &Path,
        image: &DwiSeries,
        extent: [u32; 3],
        label: &str,
    ) -> Result<DenoiseOutput, DenoiseError> {
        let input = dir.join("input.json");
        let output = dir.join("denoised.json");
        let noise = dir.join("noise.json");

        let bytes = encode_series(image).map_err(|e| DenoiseError::Io(e.to_string()))?;
        tokio::fs::write(&input, bytes)
            .await
            .map_err(|e| DenoiseError::Io(format!("{}: {}", input.display(), e)))?;

        let args = self.render_args(&input, &output, &noise, extent);
        debug!("Running {} {:?}", program.display(), args);
        let result = tokio::process::Command::new(program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DenoiseError::Failed {
                label: label.to_string(),
                message: format!("failed to spawn {}: {}", self.command, e),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(DenoiseError::Failed {
                label: label.to_string(),
                message: format!(
                    "{} exited with {}: {}",
                    self.command,
                    result.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            });
        }

        Ok(DenoiseOutput {
            image: read_output(&output, label).await?,
            noise: read_output(&noise, label).await?,
        })
    }
}

async fn read_output(path: &Path, label: &str) -> Result<DwiSeries, DenoiseError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| DenoiseError::Failed {
        label: label.to_string(),
        message: format!("missing output {}: {}", path.display(), e),
    })?;
    decode_series(&bytes).map_err(|e| DenoiseError::Failed {
        label: label.to_string(),
        message: format!("unreadable output {}: {}", path.display(), e),
    })
}

#[async_trait]
impl Denoiser for CommandDenoiser {
    async fn denoise(
        &self,
        image: &DwiSeries,
        extent: [u32; 3],
        label: &str,
    ) -> Result<DenoiseOutput, DenoiseError> {
        let program = which::which(&self.command)
            .map_err(|e| DenoiseError::NotAvailable(format!("{}: {}", self.command, e)))?;

        tokio::fs::create_dir_all(&self.scratch_root)
            .await
            .map_err(|e| DenoiseError::Io(format!("{}: {}", self.scratch_root.display(), e)))?;
        let dir = self
            .scratch_dir(label)
            .map_err(|e| DenoiseError::Io(format!("{}: {}", self.scratch_root.display(), e)))?;

        info!(
            "Denoising {} ({} volumes, extent {:?})",
            label,
            image.volume_count(),
            extent
        );
        self.run_in(&program, dir.path(), image, extent, label).await
    }
}
