//! q-space identity matching
//!
//! Two volumes are considered to sample the same q-space coordinate when
//! their b-values agree within [`QSpaceTolerance::bval_tolerance`] and their
//! directions agree within [`QSpaceTolerance::max_angle_degrees`]. With
//! `antipodal` enabled, `v` and `-v` are the same direction. Volumes at or
//! below the b0 threshold match every other b0 volume.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BVAL_TOLERANCE: f64 = 10.0;
pub const DEFAULT_MAX_ANGLE_DEGREES: f64 = 5.0;

const MIN_DIRECTION_NORM: f64 = 1e-6;

/// A b-value plus the direction used for matching
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QSpacePoint {
    pub bval: f64,
    pub direction: [f64; 3],
}

impl QSpacePoint {
    pub fn new(bval: f64, direction: [f64; 3]) -> Self {
        Self { bval, direction }
    }

    fn norm(&self) -> f64 {
        self.direction.iter().map(|c| c * c).sum::<f64>().sqrt()
    }
}

/// Tolerances for cross-group q-space matching
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QSpaceTolerance {
    /// Maximum absolute b-value difference
    pub bval_tolerance: f64,
    /// Maximum angle between directions, in degrees
    pub max_angle_degrees: f64,
    /// Treat opposite directions as identical
    pub antipodal: bool,
}

impl Default for QSpaceTolerance {
    fn default() -> Self {
        Self {
            bval_tolerance: DEFAULT_BVAL_TOLERANCE,
            max_angle_degrees: DEFAULT_MAX_ANGLE_DEGREES,
            antipodal: true,
        }
    }
}

impl QSpaceTolerance {
    pub fn with_bval_tolerance(mut self, tolerance: f64) -> Self {
        self.bval_tolerance = tolerance;
        self
    }

    pub fn with_max_angle_degrees(mut self, degrees: f64) -> Self {
        self.max_angle_degrees = degrees;
        self
    }

    pub fn with_antipodal(mut self, antipodal: bool) -> Self {
        self.antipodal = antipodal;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.bval_tolerance.is_finite() || self.bval_tolerance < 0.0 {
            return Err(DomainError::config(
                "matching.bval_tolerance",
                format!("must be a non-negative number, got {}", self.bval_tolerance),
            ));
        }
        if !(0.0..=90.0).contains(&self.max_angle_degrees) {
            return Err(DomainError::config(
                "matching.max_angle_degrees",
                format!("must be within [0, 90], got {}", self.max_angle_degrees),
            ));
        }
        Ok(())
    }

    /// Matching cost between two points, or `None` if they do not match
    ///
    /// Lower is better; b0 pairs always cost `0.0`.
    pub fn match_cost(&self, a: QSpacePoint, b: QSpacePoint, b0_threshold: f64) -> Option<f64> {
        let a_b0 = a.bval <= b0_threshold;
        let b_b0 = b.bval <= b0_threshold;
        if a_b0 && b_b0 {
            return Some(0.0);
        }
        if a_b0 != b_b0 {
            return None;
        }

        let bval_diff = (a.bval - b.bval).abs();
        if bval_diff > self.bval_tolerance {
            return None;
        }

        let (na, nb) = (a.norm(), b.norm());
        if na < MIN_DIRECTION_NORM || nb < MIN_DIRECTION_NORM {
            return None;
        }
        let dot: f64 = a
            .direction
            .iter()
            .zip(&b.direction)
            .map(|(x, y)| x * y)
            .sum::<f64>()
            / (na * nb);
        let cosine = if self.antipodal { dot.abs() } else { dot };
        let angle = cosine.clamp(-1.0, 1.0).acos().to_degrees();
        if angle > self.max_angle_degrees {
            return None;
        }

        let bval_term = if self.bval_tolerance > 0.0 {
            bval_diff / self.bval_tolerance
        } else {
            0.0
        };
        Some(angle / 90.0 + bval_term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const B0_THRESHOLD: f64 = 50.0;

    #[test]
    fn test_b0_volumes_always_match() {
        let tol = QSpaceTolerance::default();
        let a = QSpacePoint::new(0.0, [0.0; 3]);
        let b = QSpacePoint::new(45.0, [1.0, 0.0, 0.0]);
        assert_eq!(tol.match_cost(a, b, B0_THRESHOLD), Some(0.0));
    }

    #[test]
    fn test_b0_never_matches_weighted() {
        let tol = QSpaceTolerance::default();
        let a = QSpacePoint::new(0.0, [1.0, 0.0, 0.0]);
        let b = QSpacePoint::new(1000.0, [1.0, 0.0, 0.0]);
        assert_eq!(tol.match_cost(a, b, B0_THRESHOLD), None);
    }

    #[test]
    fn test_antipodal_directions_match() {
        let tol = QSpaceTolerance::default();
        let a = QSpacePoint::new(1000.0, [0.0, 1.0, 0.0]);
        let b = QSpacePoint::new(1000.0, [0.0, -1.0, 0.0]);
        assert!(tol.match_cost(a, b, B0_THRESHOLD).is_some());
        assert_eq!(
            tol.with_antipodal(false).match_cost(a, b, B0_THRESHOLD),
            None
        );
    }

    #[test]
    fn test_bval_tolerance() {
        let tol = QSpaceTolerance::default().with_bval_tolerance(5.0);
        let a = QSpacePoint::new(1000.0, [1.0, 0.0, 0.0]);
        assert!(tol.match_cost(a, QSpacePoint::new(1004.0, [1.0, 0.0, 0.0]), B0_THRESHOLD).is_some());
        assert!(tol.match_cost(a, QSpacePoint::new(1010.0, [1.0, 0.0, 0.0]), B0_THRESHOLD).is_none());
    }

    #[test]
    fn test_angle_tolerance() {
        let tol = QSpaceTolerance::default().with_max_angle_degrees(5.0);
        let a = QSpacePoint::new(1000.0, [1.0, 0.0, 0.0]);
        let close = QSpacePoint::new(1000.0, [1.0, 0.05, 0.0]);
        let far = QSpacePoint::new(1000.0, [1.0, 0.2, 0.0]);
        assert!(tol.match_cost(a, close, B0_THRESHOLD).is_some());
        assert!(tol.match_cost(a, far, B0_THRESHOLD).is_none());
    }

    #[test]
    fn test_exact_match_is_cheaper_than_near_match() {
        let tol = QSpaceTolerance::default();
        let a = QSpacePoint::new(1000.0, [1.0, 0.0, 0.0]);
        let exact = tol.match_cost(a, QSpacePoint::new(1000.0, [-1.0, 0.0, 0.0]), B0_THRESHOLD);
        let near = tol.match_cost(a, QSpacePoint::new(1005.0, [1.0, 0.03, 0.0]), B0_THRESHOLD);
        assert!(exact.unwrap() < near.unwrap());
    }

    #[test]
    fn test_validate() {
        assert!(QSpaceTolerance::default().validate().is_ok());
        assert!(QSpaceTolerance::default().with_bval_tolerance(-1.0).validate().is_err());
        assert!(QSpaceTolerance::default().with_max_angle_degrees(120.0).validate().is_err());
    }
}
