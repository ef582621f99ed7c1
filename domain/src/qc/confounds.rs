//! Confound traces and their per-column summary

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const FRAMEWISE_DISPLACEMENT: &str = "framewise_displacement";

/// Per-volume confound regressors, one named column each
///
/// Missing samples are stored as NaN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfoundTraces {
    columns: Vec<(String, Vec<f64>)>,
}

impl ConfoundTraces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column; every column must have the same number of rows
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), DomainError> {
        let name = name.into();
        if let Some(rows) = self.rows() {
            if values.len() != rows {
                return Err(DomainError::format(format!(
                    "confound column '{}' has {} rows, expected {}",
                    name,
                    values.len(),
                    rows
                )));
            }
        }
        if self.column(&name).is_some() {
            return Err(DomainError::format(format!("duplicate confound column '{name}'")));
        }
        self.columns.push((name, values));
        Ok(())
    }

    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self, DomainError> {
        self.push_column(name, values)?;
        Ok(self)
    }

    /// Row count, `None` before the first column
    pub fn rows(&self) -> Option<usize> {
        self.columns.first().map(|(_, v)| v.len())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Stack traces of several runs row-wise; columns must agree
    pub fn concat_rows(traces: &[ConfoundTraces]) -> Result<Self, DomainError> {
        let Some(first) = traces.first() else {
            return Ok(Self::new());
        };
        let names: Vec<&str> = first.column_names().collect();
        let mut columns: Vec<(String, Vec<f64>)> = names
            .iter()
            .map(|n| (n.to_string(), Vec::new()))
            .collect();
        for t in traces {
            let other: Vec<&str> = t.column_names().collect();
            if other != names {
                return Err(DomainError::format(format!(
                    "confound columns differ: [{}] vs [{}]",
                    names.join(", "),
                    other.join(", ")
                )));
            }
            for ((_, target), (_, values)) in columns.iter_mut().zip(&t.columns) {
                target.extend_from_slice(values);
            }
        }
        Ok(Self { columns })
    }

    pub fn summarize(&self) -> ConfoundSummary {
        let columns = self
            .columns
            .iter()
            .filter_map(|(name, values)| {
                ColumnSummary::from_values(values).map(|s| (name.clone(), s))
            })
            .collect::<BTreeMap<_, _>>();
        ConfoundSummary {
            rows: self.rows().unwrap_or(0),
            framewise_displacement: columns.get(FRAMEWISE_DISPLACEMENT).cloned(),
            columns,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub mean: f64,
    pub max: f64,
}

impl ColumnSummary {
    /// `None` when the column has no finite sample
    fn from_values(values: &[f64]) -> Option<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        Some(Self {
            mean: finite.iter().sum::<f64>() / finite.len() as f64,
            max: finite.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfoundSummary {
    pub rows: usize,
    pub columns: BTreeMap<String, ColumnSummary>,
    pub framewise_displacement: Option<ColumnSummary>,
}
