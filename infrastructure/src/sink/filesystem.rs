//! Filesystem derivatives sink
//!
//! Every output is named `<stem>_<kind>[_<label>].<ext>` where the stem
//! comes from [`ReportSettings::stem`]. Reportlets go to the reportlets
//! directory, everything else to the output directory.

use crate::storage::{encode_series, format_bvals, format_bvecs, format_confounds};
use async_trait::async_trait;
use dwimerge_application::ports::derivatives_sink::{
    Derivative, DerivativesSink, SinkError, WrittenArtifact,
};
use dwimerge_domain::{OutputKind, ReportSettings};
use std::path::{Path, PathBuf};
use tracing::debug;

/// [`DerivativesSink`] writing into the configured output tree
#[derive(Debug, Clone)]
pub struct FsDerivativesSink {
    settings: ReportSettings,
}

impl FsDerivativesSink {
    pub fn new(settings: ReportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Destination path of an output
    pub fn destination(&self, kind: OutputKind, label: Option<&str>, extension: &str) -> PathBuf {
        let dir = if kind.is_reportlet() {
            &self.settings.reportlets_dir
        } else {
            &self.settings.output_dir
        };
        let mut name = format!("{}_{}", self.settings.stem(), kind);
        if let Some(label) = label {
            name.push('_');
            name.push_str(label);
        }
        if !extension.is_empty() {
            name.push('.');
            name.push_str(extension);
        }
        dir.join(name)
    }
}

/// Extension of a copied file, keeping compound extensions such as `nii.gz`
fn source_extension(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .and_then(|name| name.split_once('.').map(|(_, ext)| ext.to_string()))
        .unwrap_or_default()
}

fn write_error(kind: OutputKind, path: &Path, e: impl std::fmt::Display) -> SinkError {
    SinkError::Write {
        kind,
        message: format!("{}: {}", path.display(), e),
    }
}

#[async_trait]
impl DerivativesSink for FsDerivativesSink {
    async fn write(
        &self,
        kind: OutputKind,
        label: Option<&str>,
        derivative: Derivative<'_>,
    ) -> Result<WrittenArtifact, SinkError> {
        let encode_error = |e: serde_json::Error| SinkError::Encode {
            kind,
            message: e.to_string(),
        };

        let (extension, contents) = match derivative {
            Derivative::Image(series) => ("json".to_string(), encode_series(series).map_err(encode_error)?),
            Derivative::Bvals(bvals) => ("bval".to_string(), format_bvals(bvals).into_bytes()),
            Derivative::Bvecs(bvecs) => ("bvec".to_string(), format_bvecs(bvecs).into_bytes()),
            Derivative::GradientTable(table) => ("b".to_string(), table.to_mrtrix().into_bytes()),
            Derivative::Json(value) => (
                "json".to_string(),
                serde_json::to_vec_pretty(value).map_err(encode_error)?,
            ),
            Derivative::Confounds(traces) => (
                "tsv".to_string(),
                format_confounds(traces).map_err(|message| SinkError::Encode { kind, message })?,
            ),
            Derivative::Copy(source) => {
                let path = self.destination(kind, label, &source_extension(source.path()));
                create_parent(kind, &path).await?;
                tokio::fs::copy(source.path(), &path)
                    .await
                    .map_err(|e| SinkError::Copy {
                        kind,
                        source_path: source.to_string(),
                        message: e.to_string(),
                    })?;
                debug!("Copied {} to {}", source, path.display());
                return Ok(WrittenArtifact {
                    kind,
                    label: label.map(str::to_string),
                    path,
                });
            }
        };

        let path = self.destination(kind, label, &extension);
        create_parent(kind, &path).await?;
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| write_error(kind, &path, e))?;

        Ok(WrittenArtifact {
            kind,
            label: label.map(str::to_string),
            path,
        })
    }
}

async fn create_parent(kind: OutputKind, path: &Path) -> Result<(), SinkError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| write_error(kind, parent, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{decode_series, parse_bvals};
    use dwimerge_domain::{ArtifactRef, ConfoundTraces, DwiSeries, GradientTable, SpatialGrid};

    fn sink(root: &Path) -> FsDerivativesSink {
        FsDerivativesSink::new(
            ReportSettings::new(root.join("out"), "")
                .with_source_file("/bids/sub-01/dwi/sub-01_dir-AP_dwi.nii.gz"),
        )
    }

    #[test]
    fn test_destination_naming() {
        let sink = sink(Path::new("/data"));
        assert_eq!(
            sink.destination(OutputKind::MergedImage, None, "json"),
            PathBuf::from("/data/out/sub-01_dir-AP_merged_image.json")
        );
        assert_eq!(
            sink.destination(OutputKind::NoiseImage, Some("dir_PA"), "json"),
            PathBuf::from("/data/out/sub-01_dir-AP_noise_image_dir_PA.json")
        );
        assert_eq!(
            sink.destination(OutputKind::SamplingScheme, None, "json"),
            PathBuf::from("/data/out/reports/sub-01_dir-AP_sampling_scheme.json")
        );
    }

    #[test]
    fn test_source_extension_keeps_compound_suffix() {
        assert_eq!(source_extension(Path::new("/a/mask.nii.gz")), "nii.gz");
        assert_eq!(source_extension(Path::new("/a/confounds.tsv")), "tsv");
        assert_eq!(source_extension(Path::new("/a/README")), "");
    }

    #[tokio::test]
    async fn test_writes_image_and_tables() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink(dir.path());
        let series = DwiSeries::zeros(SpatialGrid::new(2, 2, 1), 2);

        let image = sink
            .write(OutputKind::MergedImage, None, Derivative::Image(&series))
            .await
            .unwrap();
        let bytes = std::fs::read(&image.path).unwrap();
        assert_eq!(decode_series(&bytes).unwrap(), series);

        let bvals = sink
            .write(OutputKind::BvalsT1, None, Derivative::Bvals(&[0.0, 1000.0]))
            .await
            .unwrap();
        let text = std::fs::read_to_string(&bvals.path).unwrap();
        assert_eq!(parse_bvals(&text).unwrap(), vec![0.0, 1000.0]);

        let table = GradientTable::build(&[0.0, 1000.0], &[[0.0; 3], [1.0, 0.0, 0.0]]).unwrap();
        let written = sink
            .write(OutputKind::GradientTableT1, None, Derivative::GradientTable(&table))
            .await
            .unwrap();
        assert!(written.path.to_string_lossy().ends_with("_gradient_table_t1.b"));
        assert_eq!(std::fs::read_to_string(&written.path).unwrap().lines().count(), 2);
    }

    #[tokio::test]
    async fn test_reportlet_goes_to_reportlets_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsDerivativesSink::new(
            ReportSettings::new(dir.path().join("out"), "sub-02")
                .with_reportlets_dir(dir.path().join("figures")),
        );
        let value = serde_json::json!({"shells": [0, 1000]});
        let written = sink
            .write(OutputKind::SamplingScheme, None, Derivative::Json(&value))
            .await
            .unwrap();
        assert_eq!(
            written.path,
            dir.path().join("figures").join("sub-02_sampling_scheme.json")
        );
    }

    #[tokio::test]
    async fn test_copy_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("confounds.tsv");
        std::fs::write(&source, "framewise_displacement\n0.1\n").unwrap();

        let written = sink(dir.path())
            .write(
                OutputKind::Confounds,
                None,
                Derivative::Copy(&ArtifactRef::new(&source)),
            )
            .await
            .unwrap();
        assert!(written.path.to_string_lossy().ends_with("_confounds.tsv"));
        assert_eq!(
            std::fs::read_to_string(&written.path).unwrap(),
            "framewise_displacement\n0.1\n"
        );
    }

    #[tokio::test]
    async fn test_writes_stacked_confounds_table() {
        let dir = tempfile::tempdir().unwrap();
        let traces = ConfoundTraces::new()
            .with_column("framewise_displacement", vec![f64::NAN, 0.2, f64::NAN, 0.4])
            .unwrap();

        let written = sink(dir.path())
            .write(OutputKind::Confounds, None, Derivative::Confounds(&traces))
            .await
            .unwrap();
        assert!(written.path.to_string_lossy().ends_with("_confounds.tsv"));
        assert_eq!(
            std::fs::read_to_string(&written.path).unwrap(),
            "framewise_displacement\nn/a\n0.2\nn/a\n0.4\n"
        );
    }

    #[tokio::test]
    async fn test_copy_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = sink(dir.path())
            .write(
                OutputKind::CnrMapT1,
                None,
                Derivative::Copy(&ArtifactRef::new(dir.path().join("absent.json"))),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Copy { kind: OutputKind::CnrMapT1, .. }));
    }
}
