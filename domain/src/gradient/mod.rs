//! Gradient tables: b-values, b-vectors and their derived projections.
//!
//! - [`scheme::GradientScheme`]: the raw `(bval, bvec)` pair for a series
//! - [`table::GradientTable`]: normalized direction + magnitude rows
//! - [`sampling::SamplingSchemeReport`]: q-space points for the sampling-scheme reportlet

pub mod sampling;
pub mod scheme;
pub mod table;

pub use sampling::{SamplingPoint, SamplingSchemeReport};
pub use scheme::GradientScheme;
pub use table::{GradientRow, GradientTable, GradientTableBuilder};
