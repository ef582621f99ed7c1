//! In-memory diffusion image data.

pub mod series;

pub use series::{DwiSeries, SpatialGrid};
