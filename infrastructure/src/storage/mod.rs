//! File-system adapters for the loading ports

mod fsl_gradients;
mod json_image;
mod qc_files;

pub use fsl_gradients::{FslGradientStore, format_bvals, format_bvecs, parse_bvals, parse_bvecs};
pub use json_image::{JsonImageStore, decode_series, encode_series};
pub use qc_files::{FileQcSource, format_confounds, parse_confounds, parse_pre_merge_qc};
