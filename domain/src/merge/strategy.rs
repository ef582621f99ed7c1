//! Merge strategy selection and contract

use crate::acquisition::data::GroupData;
use crate::core::error::DomainError;
use crate::image::series::SpatialGrid;
use crate::merge::dataset::MergedDataset;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Which merge algorithm a run uses
///
/// Parsed case-insensitively: `"average"` selects [`MergeStrategyKind::Average`],
/// any value starting with `"concat"` selects [`MergeStrategyKind::Concatenate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MergeStrategyKind {
    /// Average volumes that sampled the same q-space coordinate
    Average,
    /// Stack all volumes along the diffusion axis
    #[default]
    Concatenate,
}

impl MergeStrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategyKind::Average => "average",
            MergeStrategyKind::Concatenate => "concat",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MergeStrategyKind::Average => "q-space averaging",
            MergeStrategyKind::Concatenate => "concatenation",
        }
    }
}

impl std::fmt::Display for MergeStrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MergeStrategyKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized == "average" {
            Ok(MergeStrategyKind::Average)
        } else if normalized.starts_with("concat") {
            Ok(MergeStrategyKind::Concatenate)
        } else {
            Err(DomainError::config(
                "merging_strategy",
                format!("unknown merging strategy '{s}'. Valid: average, concat"),
            ))
        }
    }
}

impl Serialize for MergeStrategyKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MergeStrategyKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Contract shared by both merge algorithms
///
/// A strategy is selected once per run and invoked exactly once with every
/// group of the set, in group order.
pub trait MergeStrategy: Send + Sync {
    fn kind(&self) -> MergeStrategyKind;

    fn merge(&self, groups: &[GroupData]) -> Result<MergedDataset, DomainError>;
}

/// Check that every group shares the first group's spatial grid
pub fn require_common_grid(groups: &[GroupData]) -> Result<SpatialGrid, DomainError> {
    let first = groups
        .first()
        .ok_or_else(|| DomainError::validation("<groups>", "no acquisition groups to merge"))?;
    let grid = first.image().grid();
    for group in &groups[1..] {
        let other = group.image().grid();
        if other != grid {
            return Err(DomainError::validation(
                group.id().as_str(),
                format!(
                    "spatial grid {} differs from {} of group {}",
                    other,
                    grid,
                    first.id()
                ),
            ));
        }
    }
    Ok(grid)
}
