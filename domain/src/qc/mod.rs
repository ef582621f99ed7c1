//! Quality control: image metrics, confound summaries and the series record.

pub mod aggregator;
pub mod confounds;
pub mod image_qc;
pub mod record;

pub use aggregator::{QcAggregator, QcInputs};
pub use confounds::{ColumnSummary, ConfoundSummary, ConfoundTraces, FRAMEWISE_DISPLACEMENT};
pub use image_qc::{BeforeAfterQc, ImageQc};
pub use record::{GradientSummary, PreMergeQc, SeriesQcRecord};
