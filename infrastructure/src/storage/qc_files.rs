//! Readers for upstream QC tables
//!
//! - raw QC: a JSON object of metrics, or a CSV with a header row and one
//!   value row; non-numeric cells are skipped
//! - confounds: a tab-separated table with a header row; `n/a` cells read
//!   as NaN

use async_trait::async_trait;
use dwimerge_application::ports::image_store::StoreError;
use dwimerge_application::ports::qc_source::QcSource;
use dwimerge_domain::{ArtifactRef, ConfoundTraces, PreMergeQc};
use std::io::ErrorKind;

/// Parse raw QC from either JSON or CSV text
pub fn parse_pre_merge_qc(text: &str) -> Result<PreMergeQc, String> {
    if text.trim_start().starts_with('{') {
        let value: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(text).map_err(|e| e.to_string())?;
        return Ok(value
            .into_iter()
            .filter_map(|(name, value)| value.as_f64().map(|v| (name, v)))
            .collect());
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());
    let names = reader.headers().map_err(|e| e.to_string())?.clone();
    if names.is_empty() {
        return Err("QC table is empty".to_string());
    }

    let mut records = reader.records();
    let values = records
        .next()
        .ok_or("QC table has no value row")?
        .map_err(|e| e.to_string())?;
    if records.next().is_some() {
        return Err("QC table has more than one value row".to_string());
    }
    if names.len() != values.len() {
        return Err(format!(
            "QC header has {} columns but value row has {}",
            names.len(),
            values.len()
        ));
    }

    Ok(names
        .iter()
        .zip(values.iter())
        .filter_map(|(name, cell)| cell.parse::<f64>().ok().map(|v| (name.to_string(), v)))
        .collect())
}

/// Parse a confounds TSV into column traces
pub fn parse_confounds(text: &str) -> Result<ConfoundTraces, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());
    let names = reader.headers().map_err(|e| e.to_string())?.clone();
    if names.is_empty() {
        return Ok(ConfoundTraces::new());
    }
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("row {}: {}", row + 1, e))?;
        if record.len() != names.len() {
            return Err(format!(
                "row {} has {} cells, expected {}",
                row + 1,
                record.len(),
                names.len()
            ));
        }
        for (column, cell) in columns.iter_mut().zip(record.iter()) {
            let value = match cell {
                "n/a" | "" => f64::NAN,
                other => other
                    .parse::<f64>()
                    .map_err(|e| format!("row {}: '{}': {}", row + 1, other, e))?,
            };
            column.push(value);
        }
    }

    let mut traces = ConfoundTraces::new();
    for (name, values) in names.iter().zip(columns) {
        traces.push_column(name, values).map_err(|e| e.to_string())?;
    }
    Ok(traces)
}

/// Write column traces as a confounds TSV; NaN cells become `n/a`
pub fn format_confounds(traces: &ConfoundTraces) -> Result<Vec<u8>, String> {
    if traces.is_empty() {
        return Ok(Vec::new());
    }
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(Vec::new());
    writer
        .write_record(traces.column_names())
        .map_err(|e| e.to_string())?;

    let columns: Vec<&[f64]> = traces
        .column_names()
        .filter_map(|name| traces.column(name))
        .collect();
    for row in 0..traces.rows().unwrap_or(0) {
        let cells = columns.iter().map(|column| match column[row] {
            v if v.is_nan() => "n/a".to_string(),
            v => v.to_string(),
        });
        writer.write_record(cells).map_err(|e| e.to_string())?;
    }
    writer.into_inner().map_err(|e| e.to_string())
}

/// [`QcSource`] reading QC files from the local file system
#[derive(Debug, Clone, Default)]
pub struct FileQcSource;

impl FileQcSource {
    pub fn new() -> Self {
        Self
    }

    async fn read(artifact: &ArtifactRef) -> Result<String, StoreError> {
        tokio::fs::read_to_string(artifact.path())
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StoreError::NotFound(artifact.to_string()),
                _ => StoreError::io(artifact, e),
            })
    }
}

#[async_trait]
impl QcSource for FileQcSource {
    async fn pre_merge_qc(&self, artifact: &ArtifactRef) -> Result<PreMergeQc, StoreError> {
        let text = Self::read(artifact).await?;
        parse_pre_merge_qc(&text).map_err(|e| StoreError::malformed(artifact, e))
    }

    async fn confounds(&self, artifact: &ArtifactRef) -> Result<ConfoundTraces, StoreError> {
        let text = Self::read(artifact).await?;
        parse_confounds(&text).map_err(|e| StoreError::malformed(artifact, e))
    }
}
