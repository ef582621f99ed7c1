//! Merge run configuration

use crate::core::error::DomainError;
use crate::denoise::DenoiseSettings;
use crate::merge::average::Averager;
use crate::merge::concatenate::Concatenator;
use crate::merge::matching::QSpaceTolerance;
use crate::merge::strategy::{MergeStrategy, MergeStrategyKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_B0_THRESHOLD: f64 = 100.0;

/// Everything that shapes one merge run
///
/// Built from layered file configuration plus CLI overrides and validated
/// before any group is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub strategy: MergeStrategyKind,
    pub harmonize_b0_intensities: bool,
    pub b0_threshold: f64,
    /// External b0 reference intensity; the first group's b0 mean otherwise
    pub b0_reference_intensity: Option<f64>,
    pub tolerance: QSpaceTolerance,
    pub denoise: DenoiseSettings,
    pub combine_all_dwis: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            strategy: MergeStrategyKind::default(),
            harmonize_b0_intensities: true,
            b0_threshold: DEFAULT_B0_THRESHOLD,
            b0_reference_intensity: None,
            tolerance: QSpaceTolerance::default(),
            denoise: DenoiseSettings::default(),
            combine_all_dwis: true,
        }
    }
}

impl MergeConfig {
    pub fn with_strategy(mut self, strategy: MergeStrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_b0_threshold(mut self, threshold: f64) -> Self {
        self.b0_threshold = threshold;
        self
    }

    pub fn with_harmonization(mut self, enabled: bool) -> Self {
        self.harmonize_b0_intensities = enabled;
        self
    }

    pub fn with_denoise(mut self, denoise: DenoiseSettings) -> Self {
        self.denoise = denoise;
        self
    }

    pub fn with_combine_all_dwis(mut self, combine: bool) -> Self {
        self.combine_all_dwis = combine;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.b0_threshold.is_finite() || self.b0_threshold < 0.0 {
            return Err(DomainError::config(
                "b0_threshold",
                format!("must be a non-negative number, got {}", self.b0_threshold),
            ));
        }
        if let Some(reference) = self.b0_reference_intensity {
            if !reference.is_finite() || reference <= 0.0 {
                return Err(DomainError::config(
                    "b0_reference_intensity",
                    format!("must be positive, got {reference}"),
                ));
            }
        }
        self.tolerance.validate()?;
        self.denoise.validate(self.combine_all_dwis)
    }

    pub fn build_strategy(&self) -> Box<dyn MergeStrategy> {
        match self.strategy {
            MergeStrategyKind::Average => {
                Box::new(Averager::new(self.b0_threshold).with_tolerance(self.tolerance))
            }
            MergeStrategyKind::Concatenate => Box::new(
                Concatenator::new(self.b0_threshold)
                    .with_harmonization(self.harmonize_b0_intensities)
                    .with_reference_b0_mean(self.b0_reference_intensity),
            ),
        }
    }
}

/// Where derivatives and reportlets are written
///
/// Passed to every reporting component when it is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
    pub reportlets_dir: PathBuf,
    /// File-name stem shared by every output, e.g. `sub-01_ses-1`
    pub output_prefix: String,
    /// Source file the derivatives are keyed by
    pub source_file: Option<PathBuf>,
}

impl ReportSettings {
    /// Reportlets default to `<output_dir>/reports`
    pub fn new(output_dir: impl Into<PathBuf>, output_prefix: impl Into<String>) -> Self {
        let output_dir = output_dir.into();
        Self {
            reportlets_dir: output_dir.join("reports"),
            output_dir,
            output_prefix: output_prefix.into(),
            source_file: None,
        }
    }

    pub fn with_reportlets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reportlets_dir = dir.into();
        self
    }

    pub fn with_source_file(mut self, source: impl Into<PathBuf>) -> Self {
        self.source_file = Some(source.into());
        self
    }

    /// Stem used for file names: the prefix, or the source file's stem
    pub fn stem(&self) -> String {
        if !self.output_prefix.is_empty() {
            return self.output_prefix.clone();
        }
        self.source_file
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| {
                let name = n.to_string_lossy();
                let name = name.split('.').next().unwrap_or_default();
                name.strip_suffix("_dwi").unwrap_or(name).to_string()
            })
            .unwrap_or_else(|| "dwi".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MergeConfig::default();
        assert_eq!(config.strategy, MergeStrategyKind::Concatenate);
        assert!(config.harmonize_b0_intensities);
        assert!(config.combine_all_dwis);
        assert_eq!(config.denoise.window, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_build_strategy_follows_kind() {
        let config = MergeConfig::default().with_strategy(MergeStrategyKind::Average);
        assert_eq!(config.build_strategy().kind(), MergeStrategyKind::Average);
        assert_eq!(
            MergeConfig::default().build_strategy().kind(),
            MergeStrategyKind::Concatenate
        );
    }

    #[test]
    fn test_validate_rejects_denoise_before_combining_without_combine() {
        let config = MergeConfig::default()
            .with_denoise(DenoiseSettings::new(7).with_before_merge(true))
            .with_combine_all_dwis(false);
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("denoise_before_combining"));
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let err = MergeConfig::default().with_b0_threshold(-1.0).validate().unwrap_err();
        assert!(err.to_string().contains("b0_threshold"));
    }

    #[test]
    fn test_report_settings_stem() {
        let settings = ReportSettings::new("/out", "");
        assert_eq!(settings.reportlets_dir, PathBuf::from("/out/reports"));
        assert_eq!(settings.stem(), "dwi");

        let settings = settings.with_source_file("/bids/sub-01/dwi/sub-01_dir-AP_dwi.nii.gz");
        assert_eq!(settings.stem(), "sub-01_dir-AP");

        let settings = ReportSettings::new("/out", "sub-02").with_reportlets_dir("/reports");
        assert_eq!(settings.stem(), "sub-02");
        assert_eq!(settings.reportlets_dir, PathBuf::from("/reports"));
    }
}
