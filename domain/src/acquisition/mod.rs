//! Acquisition groups and their artifact streams.
//!
//! - [`artifact`]: artifact references and the seven required slots
//! - [`group`]: [`AcquisitionGroup`] and the validated [`AcquisitionGroupSet`]
//! - [`data`]: [`GroupData`], a group's artifacts once loaded into memory

pub mod artifact;
pub mod data;
pub mod group;

pub use artifact::{ArtifactRef, ArtifactSlot};
pub use data::GroupData;
pub use group::{AcquisitionGroup, AcquisitionGroupSet};
