//! Names of the derivatives a run produces

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    MergedImage,
    MergedBval,
    MergedBvec,
    MergedQc,
    DwiMaskT1,
    CnrMapT1,
    BvalsT1,
    BvecsT1,
    GradientTableT1,
    Confounds,
    HmcOptimizationData,
    NoiseImage,
    SeriesQc,
    SamplingScheme,
}

impl OutputKind {
    pub const ALL: [OutputKind; 14] = [
        OutputKind::MergedImage,
        OutputKind::MergedBval,
        OutputKind::MergedBvec,
        OutputKind::MergedQc,
        OutputKind::DwiMaskT1,
        OutputKind::CnrMapT1,
        OutputKind::BvalsT1,
        OutputKind::BvecsT1,
        OutputKind::GradientTableT1,
        OutputKind::Confounds,
        OutputKind::HmcOptimizationData,
        OutputKind::NoiseImage,
        OutputKind::SeriesQc,
        OutputKind::SamplingScheme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::MergedImage => "merged_image",
            OutputKind::MergedBval => "merged_bval",
            OutputKind::MergedBvec => "merged_bvec",
            OutputKind::MergedQc => "merged_qc",
            OutputKind::DwiMaskT1 => "dwi_mask_t1",
            OutputKind::CnrMapT1 => "cnr_map_t1",
            OutputKind::BvalsT1 => "bvals_t1",
            OutputKind::BvecsT1 => "bvecs_t1",
            OutputKind::GradientTableT1 => "gradient_table_t1",
            OutputKind::Confounds => "confounds",
            OutputKind::HmcOptimizationData => "hmc_optimization_data",
            OutputKind::NoiseImage => "noise_image",
            OutputKind::SeriesQc => "series_qc",
            OutputKind::SamplingScheme => "sampling_scheme",
        }
    }

    /// Reportlets go to the reportlets directory instead of the derivatives tree
    pub fn is_reportlet(&self) -> bool {
        matches!(self, OutputKind::SamplingScheme)
    }

    /// Outputs copied through from upstream steps without modification
    pub fn is_passthrough(&self) -> bool {
        matches!(
            self,
            OutputKind::DwiMaskT1
                | OutputKind::CnrMapT1
                | OutputKind::Confounds
                | OutputKind::HmcOptimizationData
        )
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = OutputKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), OutputKind::ALL.len());
    }

    #[test]
    fn test_serde_matches_as_str() {
        for kind in OutputKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_reportlets() {
        assert!(OutputKind::SamplingScheme.is_reportlet());
        assert!(!OutputKind::MergedImage.is_reportlet());
        assert!(OutputKind::CnrMapT1.is_passthrough());
    }
}
