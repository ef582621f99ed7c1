//! FSL-style `.bval` / `.bvec` tables

use async_trait::async_trait;
use dwimerge_application::ports::gradient_store::GradientStore;
use dwimerge_application::ports::image_store::StoreError;
use dwimerge_domain::ArtifactRef;
use std::io::ErrorKind;

fn parse_rows(text: &str) -> Result<Vec<Vec<f64>>, String> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_no, line)| {
            line.split_whitespace()
                .map(|tok| {
                    tok.parse::<f64>()
                        .map_err(|e| format!("line {}: '{}': {}", line_no + 1, tok, e))
                })
                .collect()
        })
        .collect()
}

/// Parse b-values; any whitespace layout is accepted
pub fn parse_bvals(text: &str) -> Result<Vec<f64>, String> {
    Ok(parse_rows(text)?.into_iter().flatten().collect())
}

/// Parse b-vectors in FSL `3 × N` form or `N × 3` form
///
/// Three rows are always read as the FSL layout.
pub fn parse_bvecs(text: &str) -> Result<Vec<[f64; 3]>, String> {
    let rows = parse_rows(text)?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    if rows.len() == 3 {
        let n = rows[0].len();
        if rows.iter().any(|row| row.len() != n) {
            return Err("b-vector rows have different lengths".to_string());
        }
        return Ok((0..n).map(|i| [rows[0][i], rows[1][i], rows[2][i]]).collect());
    }

    rows.iter()
        .enumerate()
        .map(|(i, row)| match row.as_slice() {
            [x, y, z] => Ok([*x, *y, *z]),
            _ => Err(format!(
                "row {} has {} components, expected 3",
                i + 1,
                row.len()
            )),
        })
        .collect()
}

/// Format b-values as a single FSL line
pub fn format_bvals(bvals: &[f64]) -> String {
    let line: Vec<String> = bvals.iter().map(|b| format!("{}", b)).collect();
    format!("{}\n", line.join(" "))
}

/// Format b-vectors in FSL `3 × N` form
pub fn format_bvecs(bvecs: &[[f64; 3]]) -> String {
    let mut out = String::new();
    for axis in 0..3 {
        let line: Vec<String> = bvecs.iter().map(|v| format!("{:.8}", v[axis])).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

/// [`GradientStore`] reading FSL text tables
#[derive(Debug, Clone, Default)]
pub struct FslGradientStore;

impl FslGradientStore {
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
impl GradientStore for FslGradientStore {
    async fn load_bvals(&self, artifact: &ArtifactRef) -> Result<Vec<f64>, StoreError> {
        let text = Self::read(artifact).await?;
        parse_bvals(&text).map_err(|e| StoreError::malformed(artifact, e))
    }

    async fn load_bvecs(&self, artifact: &ArtifactRef) -> Result<Vec<[f64; 3]>, StoreError> {
        let text = Self::read(artifact).await?;
        parse_bvecs(&text).map_err(|e| StoreError::malformed(artifact, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bvals_single_line() {
        assert_eq!(
            parse_bvals("0 1000 1000\n").unwrap(),
            vec![0.0, 1000.0, 1000.0]
        );
    }

    #[test]
    fn test_parse_bvals_one_per_line() {
        assert_eq!(parse_bvals("5\n995\n2000\n").unwrap(), vec![5.0, 995.0, 2000.0]);
    }

    #[test]
    fn test_parse_bvecs_fsl_layout() {
        let text = "0 1 0 0\n0 0 1 0\n0 0 0 1\n";
        let bvecs = parse_bvecs(text).unwrap();
        assert_eq!(bvecs.len(), 4);
        assert_eq!(bvecs[1], [1.0, 0.0, 0.0]);
        assert_eq!(bvecs[3], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_parse_bvecs_row_layout() {
        let text = "0 0 0\n1 0 0\n0 1 0\n0 0 1\n";
        let bvecs = parse_bvecs(text).unwrap();
        assert_eq!(bvecs.len(), 4);
        assert_eq!(bvecs[2], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_parse_empty_tables() {
        assert!(parse_bvals("").unwrap().is_empty());
        assert!(parse_bvecs("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_bvecs_rejects_ragged_rows() {
        assert!(parse_bvecs("0 1\n0 0 1\n0 0\n").is_err());
        assert!(parse_bvecs("0 1\n1 0\n").is_err());
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = parse_bvals("0 1000\nabc\n").unwrap_err();
        assert!(err.starts_with("line 2"));
    }

    #[test]
    fn test_format_bvecs_is_readable_back() {
        let bvecs = vec![[0.0, 0.0, 0.0], [0.6, 0.8, 0.0]];
        let parsed = parse_bvecs(&format_bvecs(&bvecs)).unwrap();
        assert_eq!(parsed, bvecs);
        assert_eq!(parse_bvals(&format_bvals(&[0.0, 1000.0])).unwrap(), vec![0.0, 1000.0]);
    }

    #[tokio::test]
    async fn test_store_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let bval = dir.path().join("dwi.bval");
        let bvec = dir.path().join("dwi.bvec");
        std::fs::write(&bval, "0 1000\n").unwrap();
        std::fs::write(&bvec, "0 1\n0 0\n0 0\n").unwrap();

        let store = FslGradientStore::new();
        let bvals = store.load_bvals(&ArtifactRef::new(&bval)).await.unwrap();
        let bvecs = store.load_bvecs(&ArtifactRef::new(&bvec)).await.unwrap();
        assert_eq!(bvals.len(), bvecs.len());

        let missing = store
            .load_bvals(&ArtifactRef::new(dir.path().join("none.bval")))
            .await
            .unwrap_err();
        assert!(matches!(missing, StoreError::NotFound(_)));
    }
}
