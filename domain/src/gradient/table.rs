//! Normalized gradient table
//!
//! The canonical text form is the MRtrix `x y z b` table: one row per
//! volume, unit direction followed by the b-value.

use crate::core::error::DomainError;
use crate::gradient::scheme::GradientScheme;
use serde::{Deserialize, Serialize};

/// Directions shorter than this are treated as "no direction" (b0 rows).
const MIN_DIRECTION_NORM: f64 = 1e-6;

/// One row of a gradient table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientRow {
    /// Unit direction, or all zeros for volumes without a direction
    pub direction: [f64; 3],
    /// Diffusion-weighting magnitude
    pub b_value: f64,
}

/// Read-only projection of `(bval, bvec)` into unit vectors and magnitudes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientTable {
    rows: Vec<GradientRow>,
}

impl GradientTable {
    /// Build a table from raw b-values and b-vectors
    pub fn build(bvals: &[f64], bvecs: &[[f64; 3]]) -> Result<Self, DomainError> {
        if bvals.len() != bvecs.len() {
            return Err(DomainError::format(format!(
                "cannot build gradient table from {} b-values and {} b-vectors",
                bvals.len(),
                bvecs.len()
            )));
        }
        if bvals.is_empty() {
            return Err(DomainError::format("gradient table input is empty"));
        }

        let rows = bvals
            .iter()
            .zip(bvecs)
            .enumerate()
            .map(|(i, (&b_value, vector))| Self::row(i, b_value, *vector))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rows })
    }

    pub fn from_scheme(scheme: &GradientScheme) -> Result<Self, DomainError> {
        Self::build(scheme.bvals(), scheme.bvecs())
    }

    fn row(index: usize, b_value: f64, vector: [f64; 3]) -> Result<GradientRow, DomainError> {
        if !b_value.is_finite() || vector.iter().any(|c| !c.is_finite()) {
            return Err(DomainError::format(format!("row {index} is not finite")));
        }
        if b_value < 0.0 {
            return Err(DomainError::format(format!(
                "row {index} has negative b-value {b_value}"
            )));
        }
        let norm = vector.iter().map(|c| c * c).sum::<f64>().sqrt();
        let direction = if norm < MIN_DIRECTION_NORM {
            [0.0; 3]
        } else {
            [vector[0] / norm, vector[1] / norm, vector[2] / norm]
        };
        Ok(GradientRow { direction, b_value })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[GradientRow] {
        &self.rows
    }

    pub fn b0_count(&self, b0_threshold: f64) -> usize {
        self.rows.iter().filter(|r| r.b_value <= b0_threshold).count()
    }

    /// Distinct diffusion-weighted shells
    ///
    /// b-values above the b0 threshold are sorted and grouped; a new shell
    /// starts whenever the gap to the previous b-value exceeds `tolerance`.
    /// Each shell is reported by its mean b-value.
    pub fn shells(&self, b0_threshold: f64, tolerance: f64) -> Vec<f64> {
        let mut weighted: Vec<f64> = self
            .rows
            .iter()
            .map(|r| r.b_value)
            .filter(|&b| b > b0_threshold)
            .collect();
        weighted.sort_by(|a, b| a.total_cmp(b));

        let mut shells: Vec<Vec<f64>> = Vec::new();
        for b in weighted {
            match shells.last_mut() {
                Some(shell) if b - shell[shell.len() - 1] <= tolerance => shell.push(b),
                _ => shells.push(vec![b]),
            }
        }
        shells
            .iter()
            .map(|s| s.iter().sum::<f64>() / s.len() as f64)
            .collect()
    }

    /// Render in MRtrix `x y z b` format
    pub fn to_mrtrix(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            out.push_str(&format!(
                "{:.8} {:.8} {:.8} {:.2}\n",
                row.direction[0], row.direction[1], row.direction[2], row.b_value
            ));
        }
        out
    }

    /// Parse an MRtrix `x y z b` table; `#` lines are comments
    pub fn from_mrtrix(text: &str) -> Result<Self, DomainError> {
        let mut bvals = Vec::new();
        let mut bvecs = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let values = line
                .split_whitespace()
                .map(|tok| tok.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| DomainError::format(format!("line {}: {}", line_no + 1, e)))?;
            if values.len() != 4 {
                return Err(DomainError::format(format!(
                    "line {}: expected 4 columns, found {}",
                    line_no + 1,
                    values.len()
                )));
            }
            bvecs.push([values[0], values[1], values[2]]);
            bvals.push(values[3]);
        }
        Self::build(&bvals, &bvecs)
    }
}

/// Builds gradient tables for a fixed b0 threshold
///
/// Unlike [`GradientTable::build`], rejects weighted volumes (b above the
/// threshold) whose direction has zero length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientTableBuilder {
    b0_threshold: f64,
}

impl GradientTableBuilder {
    pub fn new(b0_threshold: f64) -> Self {
        Self { b0_threshold }
    }

    pub fn build(&self, bvals: &[f64], bvecs: &[[f64; 3]]) -> Result<GradientTable, DomainError> {
        let table = GradientTable::build(bvals, bvecs)?;
        if let Some(index) = table
            .rows
            .iter()
            .position(|r| r.b_value > self.b0_threshold && r.direction == [0.0; 3])
        {
            return Err(DomainError::format(format!(
                "row {index} has b-value {} but no direction",
                table.rows[index].b_value
            )));
        }
        Ok(table)
    }

    pub fn from_scheme(&self, scheme: &GradientScheme) -> Result<GradientTable, DomainError> {
        self.build(scheme.bvals(), scheme.bvecs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_normalizes_directions() {
        let table = GradientTable::build(&[0.0, 1000.0], &[[0.0; 3], [2.0, 0.0, 0.0]]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].direction, [0.0; 3]);
        assert_eq!(table.rows()[1].direction, [1.0, 0.0, 0.0]);
        assert_eq!(table.rows()[1].b_value, 1000.0);
    }

    #[test]
    fn test_build_rejects_malformed() {
        assert!(GradientTable::build(&[0.0], &[]).unwrap_err().is_format());
        assert!(GradientTable::build(&[], &[]).unwrap_err().is_format());
        assert!(GradientTable::build(&[-5.0], &[[1.0, 0.0, 0.0]]).is_err());
        assert!(GradientTable::build(&[f64::NAN], &[[1.0, 0.0, 0.0]]).is_err());
    }

    #[test]
    fn test_shells() {
        let bvals = [0.0, 995.0, 1000.0, 1005.0, 2000.0, 3010.0, 2990.0];
        let bvecs = [[1.0, 0.0, 0.0]; 7];
        let table = GradientTable::build(&bvals, &bvecs).unwrap();
        assert_eq!(table.shells(50.0, 50.0), vec![1000.0, 2000.0, 3000.0]);
        assert_eq!(table.b0_count(50.0), 1);
    }

    #[test]
    fn test_mrtrix_text_roundtrip() {
        let table = GradientTable::build(
            &[0.0, 1000.0, 2000.0],
            &[[0.0; 3], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]],
        )
        .unwrap();
        let text = table.to_mrtrix();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(GradientTable::from_mrtrix(&text).unwrap(), table);
    }

    #[test]
    fn test_builder_rejects_weighted_row_without_direction() {
        let builder = GradientTableBuilder::new(50.0);
        let err = builder
            .build(&[5.0, 1000.0], &[[0.0; 3], [0.0; 3]])
            .unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("row 1"));

        let table = builder.build(&[5.0, 1000.0], &[[0.0; 3], [0.0, 0.0, 3.0]]).unwrap();
        assert_eq!(table.rows()[1].direction, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_from_mrtrix_rejects_short_rows() {
        let err = GradientTable::from_mrtrix("# comment\n0 0 1\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
