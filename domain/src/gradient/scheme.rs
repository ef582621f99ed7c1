//! Paired b-value / b-vector tables

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// The b-value and b-vector tables of one series (Value Object)
///
/// Row `i` of both tables describes volume `i` of the series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GradientScheme {
    bvals: Vec<f64>,
    bvecs: Vec<[f64; 3]>,
}

impl GradientScheme {
    /// Pair b-values with b-vectors
    ///
    /// Fails with a format error if the tables disagree on row count or
    /// contain non-finite values.
    pub fn new(bvals: Vec<f64>, bvecs: Vec<[f64; 3]>) -> Result<Self, DomainError> {
        if bvals.len() != bvecs.len() {
            return Err(DomainError::format(format!(
                "bval table has {} rows but bvec table has {}",
                bvals.len(),
                bvecs.len()
            )));
        }
        if let Some(row) = bvals.iter().position(|b| !b.is_finite()) {
            return Err(DomainError::format(format!("bval row {row} is not finite")));
        }
        if let Some(row) = bvecs.iter().position(|v| v.iter().any(|c| !c.is_finite())) {
            return Err(DomainError::format(format!("bvec row {row} is not finite")));
        }
        Ok(Self { bvals, bvecs })
    }

    /// Concatenate schemes row-wise in the given order
    pub fn concatenate(schemes: &[&GradientScheme]) -> Self {
        let mut bvals = Vec::new();
        let mut bvecs = Vec::new();
        for scheme in schemes {
            bvals.extend_from_slice(&scheme.bvals);
            bvecs.extend_from_slice(&scheme.bvecs);
        }
        Self { bvals, bvecs }
    }

    pub fn len(&self) -> usize {
        self.bvals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bvals.is_empty()
    }

    pub fn bvals(&self) -> &[f64] {
        &self.bvals
    }

    pub fn bvecs(&self) -> &[[f64; 3]] {
        &self.bvecs
    }

    pub fn bval(&self, row: usize) -> f64 {
        self.bvals[row]
    }

    pub fn bvec(&self, row: usize) -> [f64; 3] {
        self.bvecs[row]
    }

    pub fn is_b0(&self, row: usize, b0_threshold: f64) -> bool {
        self.bvals[row] <= b0_threshold
    }

    /// Rows at or below the b0 threshold
    pub fn b0_indices(&self, b0_threshold: f64) -> Vec<usize> {
        (0..self.len())
            .filter(|&row| self.is_b0(row, b0_threshold))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_row_mismatch() {
        let err = GradientScheme::new(vec![0.0, 1000.0], vec![[0.0; 3]]).unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn test_rejects_non_finite() {
        assert!(GradientScheme::new(vec![f64::NAN], vec![[0.0; 3]]).is_err());
        assert!(GradientScheme::new(vec![0.0], vec![[f64::INFINITY, 0.0, 0.0]]).is_err());
    }

    #[test]
    fn test_b0_indices() {
        let scheme = GradientScheme::new(
            vec![0.0, 1000.0, 45.0, 2000.0],
            vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0; 3], [0.0, 1.0, 0.0]],
        )
        .unwrap();
        assert_eq!(scheme.b0_indices(50.0), vec![0, 2]);
    }

    #[test]
    fn test_concatenate_keeps_order() {
        let a = GradientScheme::new(vec![0.0], vec![[0.0; 3]]).unwrap();
        let b = GradientScheme::new(vec![1000.0], vec![[0.0, 0.0, 1.0]]).unwrap();
        let merged = GradientScheme::concatenate(&[&a, &b]);
        assert_eq!(merged.bvals(), &[0.0, 1000.0]);
        assert_eq!(merged.bvec(1), [0.0, 0.0, 1.0]);
    }
}
