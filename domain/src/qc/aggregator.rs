//! Assembles the per-series QC record from upstream signals

use crate::core::error::DomainError;
use crate::core::group_id::GroupId;
use crate::gradient::table::GradientTable;
use crate::merge::strategy::MergeStrategyKind;
use crate::qc::confounds::ConfoundTraces;
use crate::qc::image_qc::BeforeAfterQc;
use crate::qc::record::{GradientSummary, PreMergeQc, SeriesQcRecord};

pub const NODE_NAME: &str = "series_qc";

/// Shells closer than this are reported as one
const SHELL_TOLERANCE: f64 = 100.0;

/// Upstream signals collected for one series
///
/// Every field except `confounds` is required by [`QcAggregator::aggregate`].
#[derive(Debug, Clone, Default)]
pub struct QcInputs {
    pub t1_dice_score: Option<f64>,
    pub pre_merge: Option<PreMergeQc>,
    pub before_after: Option<BeforeAfterQc>,
    pub gradient_table: Option<GradientTable>,
    pub confounds: Option<ConfoundTraces>,
}

impl QcInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dice_score(mut self, score: f64) -> Self {
        self.t1_dice_score = Some(score);
        self
    }

    pub fn with_pre_merge(mut self, qc: PreMergeQc) -> Self {
        self.pre_merge = Some(qc);
        self
    }

    pub fn with_before_after(mut self, qc: BeforeAfterQc) -> Self {
        self.before_after = Some(qc);
        self
    }

    pub fn with_gradient_table(mut self, table: GradientTable) -> Self {
        self.gradient_table = Some(table);
        self
    }

    pub fn with_confounds(mut self, confounds: ConfoundTraces) -> Self {
        self.confounds = Some(confounds);
        self
    }
}

#[derive(Debug, Clone)]
pub struct QcAggregator {
    series_name: String,
    strategy: MergeStrategyKind,
    groups: Vec<GroupId>,
    b0_threshold: f64,
}

impl QcAggregator {
    pub fn new(
        series_name: impl Into<String>,
        strategy: MergeStrategyKind,
        groups: Vec<GroupId>,
        b0_threshold: f64,
    ) -> Self {
        Self {
            series_name: series_name.into(),
            strategy,
            groups,
            b0_threshold,
        }
    }

    pub fn aggregate(&self, inputs: QcInputs) -> Result<SeriesQcRecord, DomainError> {
        let t1_dice_score = inputs
            .t1_dice_score
            .ok_or_else(|| DomainError::missing_input(NODE_NAME, "t1_dice_score"))?;
        let pre_merge = inputs
            .pre_merge
            .ok_or_else(|| DomainError::missing_input(NODE_NAME, "pre_qc"))?;
        let before_after = inputs
            .before_after
            .ok_or_else(|| DomainError::missing_input(NODE_NAME, "t1_qc"))?;
        let table = inputs
            .gradient_table
            .ok_or_else(|| DomainError::missing_input(NODE_NAME, "gradient_table"))?;

        if !(0.0..=1.0).contains(&t1_dice_score) {
            return Err(DomainError::validation(
                "t1_dice_score",
                format!("dice score {t1_dice_score} is outside [0, 1]"),
            ));
        }
        if table.len() != before_after.merged.num_volumes {
            return Err(DomainError::validation(
                "gradient_table",
                format!(
                    "gradient table has {} rows but the merged series has {} volumes",
                    table.len(),
                    before_after.merged.num_volumes
                ),
            ));
        }

        Ok(SeriesQcRecord {
            series: self.series_name.clone(),
            strategy: self.strategy,
            groups: self.groups.clone(),
            t1_dice_score,
            pre_merge,
            confounds: inputs.confounds.map(|c| c.summarize()),
            raw: before_after.raw,
            merged: before_after.merged,
            gradients: GradientSummary {
                num_volumes: table.len(),
                num_b0: table.b0_count(self.b0_threshold),
                shells: table.shells(self.b0_threshold, SHELL_TOLERANCE),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::data::fixtures::{GRID, group};
    use crate::merge::average::Averager;
    use crate::merge::concatenate::Concatenator;
    use crate::merge::strategy::MergeStrategy;
    use crate::qc::confounds::FRAMEWISE_DISPLACEMENT;

    fn complete_inputs(strategy: &dyn MergeStrategy) -> QcInputs {
        let groups = [
            group("dir-AP", &[100.0, 1.0, 2.0, 3.0, 4.0], 1.0, GRID),
            group("dir-PA", &[100.0, 5.0, 6.0, 7.0, 8.0], -1.0, GRID),
        ];
        let merged = strategy.merge(&groups).unwrap();
        QcInputs::new()
            .with_dice_score(0.87)
            .with_pre_merge(PreMergeQc::new().with_metric("mean_fd", 0.1))
            .with_before_after(BeforeAfterQc::compute(&groups, &merged, 50.0).unwrap())
            .with_gradient_table(merged.gradient_table(50.0).unwrap())
    }

    fn aggregator(kind: MergeStrategyKind) -> QcAggregator {
        QcAggregator::new(
            "sub-01_dwi",
            kind,
            vec![GroupId::new("dir-AP").unwrap(), GroupId::new("dir-PA").unwrap()],
            50.0,
        )
    }

    #[test]
    fn test_aggregate_average() {
        let record = aggregator(MergeStrategyKind::Average)
            .aggregate(complete_inputs(&Averager::new(50.0)))
            .unwrap();
        assert_eq!(record.t1_dice_score, 0.87);
        assert_eq!(record.raw.num_volumes, 10);
        assert_eq!(record.merged.num_volumes, 5);
        assert_eq!(record.volumes_removed(), 5);
        assert_eq!(record.gradients.num_b0, 1);
        assert_eq!(record.gradients.shells, vec![1000.0]);
        assert!(record.confounds.is_none());
    }

    #[test]
    fn test_missing_dice_fails_for_both_strategies() {
        let strategies: [(MergeStrategyKind, Box<dyn MergeStrategy>); 2] = [
            (MergeStrategyKind::Average, Box::new(Averager::new(50.0))),
            (MergeStrategyKind::Concatenate, Box::new(Concatenator::new(50.0))),
        ];
        for (kind, strategy) in strategies {
            let mut inputs = complete_inputs(strategy.as_ref());
            inputs.t1_dice_score = None;
            let err = aggregator(kind).aggregate(inputs).unwrap_err();
            assert_eq!(err, DomainError::missing_input(NODE_NAME, "t1_dice_score"));
        }
    }

    #[test]
    fn test_missing_inputs_are_named() {
        let mut inputs = complete_inputs(&Concatenator::new(50.0));
        inputs.pre_merge = None;
        let err = aggregator(MergeStrategyKind::Concatenate)
            .aggregate(inputs)
            .unwrap_err();
        assert!(err.to_string().contains("pre_qc"));

        let mut inputs = complete_inputs(&Concatenator::new(50.0));
        inputs.gradient_table = None;
        let err = aggregator(MergeStrategyKind::Concatenate)
            .aggregate(inputs)
            .unwrap_err();
        assert!(err.is_missing_input());
    }

    #[test]
    fn test_dice_out_of_range() {
        let inputs = complete_inputs(&Concatenator::new(50.0)).with_dice_score(1.5);
        let err = aggregator(MergeStrategyKind::Concatenate)
            .aggregate(inputs)
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_confounds_are_summarized() {
        let traces = ConfoundTraces::new()
            .with_column(FRAMEWISE_DISPLACEMENT, vec![f64::NAN, 0.5])
            .unwrap();
        let inputs = complete_inputs(&Concatenator::new(50.0)).with_confounds(traces);
        let record = aggregator(MergeStrategyKind::Concatenate)
            .aggregate(inputs)
            .unwrap();
        let fd = record.confounds.unwrap().framewise_displacement.unwrap();
        assert_eq!(fd.max, 0.5);
    }
}
