//! Run manifest
//!
//! A TOML file naming the acquisition groups of one series and where every
//! artifact lives. Relative paths are resolved against the manifest's
//! directory.
//!
//! ```toml
//! groups = ["dir-AP", "dir-PA"]
//! source_file = "sub-01/dwi/sub-01_dir-AP_dwi.nii.gz"
//!
//! [inputs]
//! dir-AP_image = "ap/dwi.json"
//! dir-AP_bval = "ap/dwi.bval"
//! # ... one entry per slot and group
//!
//! [qc]
//! anatomical_mask = "anat/t1_mask.json"
//! dwi_mask = "dwi/mask.json"
//! raw_qc = "dwi/raw_qc.csv"
//! confounds = "dwi/confounds.tsv"
//!
//! [passthrough]
//! hmc_optimization_data = "dwi/hmc.csv"
//! cnr_map = "dwi/cnr.json"
//! ```

use dwimerge_application::RunArtifacts;
use dwimerge_domain::{AcquisitionGroupSet, ArtifactRef, DomainError, GroupId};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse manifest {path}: {message}")]
    Parse { path: String, message: String },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ManifestQc {
    pub anatomical_mask: Option<PathBuf>,
    pub dwi_mask: Option<PathBuf>,
    pub raw_qc: Option<PathBuf>,
    pub confounds: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ManifestPassthrough {
    pub hmc_optimization_data: Option<PathBuf>,
    pub cnr_map: Option<PathBuf>,
}

/// Parsed run manifest
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunManifest {
    /// Series name for the QC record; defaults to the output stem
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub source_file: Option<PathBuf>,
    pub groups: Vec<String>,
    #[serde(default)]
    pub inputs: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub qc: ManifestQc,
    #[serde(default)]
    pub passthrough: ManifestPassthrough,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl RunManifest {
    /// Read and parse a manifest file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::parse(&text, base_dir).map_err(|e| match e {
            ManifestError::Parse { message, .. } => ManifestError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Parse manifest text; relative paths resolve against `base_dir`
    pub fn parse(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let mut manifest: RunManifest = toml::from_str(text).map_err(|e| ManifestError::Parse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        manifest.base_dir = base_dir.into();
        Ok(manifest)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn artifact(&self, path: &Option<PathBuf>) -> Option<ArtifactRef> {
        path.as_deref().map(|p| ArtifactRef::new(self.resolve(p)))
    }

    /// Build the validated group set from `groups` and `[inputs]`
    ///
    /// Slot keys are sanitized the same way as group identifiers, so
    /// `dir-AP_image` and `dir_AP_image` name the same slot and may not
    /// both appear.
    pub fn group_set(&self) -> Result<AcquisitionGroupSet, DomainError> {
        let mut fields: HashMap<String, ArtifactRef> = HashMap::with_capacity(self.inputs.len());
        let mut origins: HashMap<String, &str> = HashMap::with_capacity(self.inputs.len());
        for (key, path) in &self.inputs {
            let slot = GroupId::sanitize(key);
            if let Some(previous) = origins.insert(slot.clone(), key.as_str()) {
                return Err(DomainError::validation(
                    "inputs",
                    format!("'{}' and '{}' both name slot '{}'", previous, key, slot),
                ));
            }
            fields.insert(slot, ArtifactRef::new(self.resolve(path)));
        }
        AcquisitionGroupSet::build(&self.groups, &fields)
    }

    /// Run-level artifacts from `[qc]` and `[passthrough]`
    pub fn artifacts(&self) -> RunArtifacts {
        RunArtifacts {
            anatomical_mask: self.artifact(&self.qc.anatomical_mask),
            dwi_mask: self.artifact(&self.qc.dwi_mask),
            raw_qc: self.artifact(&self.qc.raw_qc),
            confounds: self.artifact(&self.qc.confounds),
            hmc_optimization_data: self.artifact(&self.passthrough.hmc_optimization_data),
            cnr_map: self.artifact(&self.passthrough.cnr_map),
        }
    }

    /// Source file resolved against the manifest directory
    pub fn source_file(&self) -> Option<PathBuf> {
        self.source_file.as_deref().map(|p| self.resolve(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwimerge_domain::ArtifactSlot;

    fn manifest_text(groups: &[&str]) -> String {
        let mut text = format!(
            "groups = [{}]\nsource_file = \"bids/sub-01_dwi.nii.gz\"\n\n[inputs]\n",
            groups
                .iter()
                .map(|g| format!("\"{}\"", g))
                .collect::<Vec<_>>()
                .join(", ")
        );
        for g in groups {
            for slot in ArtifactSlot::REQUIRED {
                text.push_str(&format!("{}_{} = \"{}/{}\"\n", g, slot.suffix(), g, slot.suffix()));
            }
        }
        text
    }

    #[test]
    fn test_group_set_resolves_relative_paths() {
        let manifest = RunManifest::parse(&manifest_text(&["dir-AP", "dir-PA"]), "/study").unwrap();
        let set = manifest.group_set().unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.ids()[1].as_str(), "dir_PA");
        assert_eq!(
            set.groups()[0].bval.path(),
            Path::new("/study/dir-AP/bval")
        );
        assert_eq!(
            manifest.source_file(),
            Some(PathBuf::from("/study/bids/sub-01_dwi.nii.gz"))
        );
    }

    #[test]
    fn test_missing_slot_is_validation_error() {
        let text = manifest_text(&["run1"]).replace("run1_b0_ref = \"run1/b0_ref\"\n", "");
        let manifest = RunManifest::parse(&text, "/study").unwrap();
        let err = manifest.group_set().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("run1_b0_ref"));
    }

    #[test]
    fn test_sanitized_slot_collision_is_rejected() {
        let mut text = manifest_text(&["dir-AP"]);
        text.push_str("dir_AP_image = \"other/image\"\n");
        let manifest = RunManifest::parse(&text, "/study").unwrap();
        let err = manifest.group_set().unwrap_err();
        assert_eq!(
            err,
            DomainError::validation(
                "inputs",
                "'dir-AP_image' and 'dir_AP_image' both name slot 'dir_AP_image'"
            )
        );
    }

    #[test]
    fn test_artifacts_from_qc_sections() {
        let mut text = manifest_text(&["run1"]);
        text.push_str("\n[qc]\ndwi_mask = \"/abs/mask.json\"\nraw_qc = \"qc.csv\"\n");
        text.push_str("\n[passthrough]\ncnr_map = \"cnr.json\"\n");
        let manifest = RunManifest::parse(&text, "/study").unwrap();

        let artifacts = manifest.artifacts();
        assert_eq!(artifacts.dwi_mask, Some(ArtifactRef::new("/abs/mask.json")));
        assert_eq!(artifacts.raw_qc, Some(ArtifactRef::new("/study/qc.csv")));
        assert_eq!(artifacts.cnr_map, Some(ArtifactRef::new("/study/cnr.json")));
        assert!(artifacts.anatomical_mask.is_none());
        assert!(!artifacts.plan_options().has_masks);
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(&path, "groups = \"not-a-list\"\n").unwrap();
        let err = RunManifest::load(&path).unwrap_err();
        match err {
            ManifestError::Parse { path: p, .. } => assert!(p.ends_with("run.toml")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_uses_manifest_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(&path, manifest_text(&["run1"])).unwrap();
        let manifest = RunManifest::load(&path).unwrap();
        assert_eq!(manifest.base_dir(), dir.path());
    }
}
