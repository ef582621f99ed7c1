//! Denoising parameters
//!
//! The denoising algorithm itself runs behind the `Denoiser` port; the
//! domain only decides whether and where in the pipeline it runs.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Where the denoise stage sits relative to the merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenoisePlacement {
    Skipped,
    /// Once per group, producing one noise map per group
    BeforeMerge,
    /// Once on the merged series
    AfterMerge,
}

impl DenoisePlacement {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenoisePlacement::Skipped => "skipped",
            DenoisePlacement::BeforeMerge => "before_merge",
            DenoisePlacement::AfterMerge => "after_merge",
        }
    }
}

impl std::fmt::Display for DenoisePlacement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseSettings {
    /// Cubic window edge length in voxels; 0 disables denoising
    pub window: u32,
    pub apply_before_merge: bool,
}

impl DenoiseSettings {
    pub fn new(window: u32) -> Self {
        Self {
            window,
            apply_before_merge: false,
        }
    }

    pub fn with_before_merge(mut self, before: bool) -> Self {
        self.apply_before_merge = before;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.window > 0
    }

    /// Check the settings against the run's `combine_all_dwis` flag
    pub fn validate(&self, combine_all_dwis: bool) -> Result<(), DomainError> {
        if self.window > 0 && self.window % 2 == 0 {
            return Err(DomainError::config(
                "dwi_denoise_window",
                format!("window must be odd, got {}", self.window),
            ));
        }
        if self.apply_before_merge && !combine_all_dwis {
            return Err(DomainError::config(
                "denoise_before_combining",
                "denoising before combining requires combine_all_dwis",
            ));
        }
        Ok(())
    }

    pub fn placement(&self) -> DenoisePlacement {
        match (self.is_enabled(), self.apply_before_merge) {
            (false, _) => DenoisePlacement::Skipped,
            (true, true) => DenoisePlacement::BeforeMerge,
            (true, false) => DenoisePlacement::AfterMerge,
        }
    }

    /// Window extent as `(w, w, w)`
    pub fn extent(&self) -> [u32; 3] {
        [self.window; 3]
    }
}
