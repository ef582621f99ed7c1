//! Mask overlap scoring

mod dice;

pub use dice::{StoreDiceCalculator, dice_coefficient};
