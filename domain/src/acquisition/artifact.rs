//! Artifact references and slot naming

use crate::core::group_id::GroupId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reference to an artifact produced outside this core (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(PathBuf);

impl ArtifactRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// File name without directories, or the full path if there is none
    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.display().to_string())
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<&str> for ArtifactRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The seven artifact streams every acquisition group must provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSlot {
    Image,
    Bval,
    Bvec,
    OriginalBvec,
    OriginalImage,
    RawConcatenatedImage,
    B0Reference,
}

impl ArtifactSlot {
    /// All required slots, in fan-in order
    pub const REQUIRED: [ArtifactSlot; 7] = [
        ArtifactSlot::Image,
        ArtifactSlot::Bval,
        ArtifactSlot::Bvec,
        ArtifactSlot::OriginalBvec,
        ArtifactSlot::OriginalImage,
        ArtifactSlot::RawConcatenatedImage,
        ArtifactSlot::B0Reference,
    ];

    /// Suffix used in slot names
    pub fn suffix(&self) -> &'static str {
        match self {
            ArtifactSlot::Image => "image",
            ArtifactSlot::Bval => "bval",
            ArtifactSlot::Bvec => "bvec",
            ArtifactSlot::OriginalBvec => "original_bvec",
            ArtifactSlot::OriginalImage => "original_image",
            ArtifactSlot::RawConcatenatedImage => "raw_concatenated_image",
            ArtifactSlot::B0Reference => "b0_ref",
        }
    }

    /// Slot name for a group, e.g. `dir_AP_original_bvec`
    pub fn slot_name(&self, group: &GroupId) -> String {
        format!("{}_{}", group, self.suffix())
    }
}

impl std::fmt::Display for ArtifactSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Suffix of the optional per-group confounds slot
pub const CONFOUNDS_SUFFIX: &str = "confounds";
