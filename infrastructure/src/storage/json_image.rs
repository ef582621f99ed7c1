//! JSON image store
//!
//! Series are stored as `{"shape": [nx, ny, nz, volumes], "data": [...]}`
//! with `data` in row-major order. A three-element shape is read as a
//! single-volume series, which is how masks are stored.

use async_trait::async_trait;
use dwimerge_application::ports::image_store::{ImageStore, StoreError};
use dwimerge_domain::{ArtifactRef, DwiSeries};
use ndarray::Array4;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct ImageFile {
    shape: Vec<usize>,
    data: Vec<f32>,
}

/// Serialize a series into the JSON image format
pub fn encode_series(series: &DwiSeries) -> Result<Vec<u8>, serde_json::Error> {
    let file = ImageFile {
        shape: series.data().shape().to_vec(),
        data: series.data().iter().copied().collect(),
    };
    serde_json::to_vec(&file)
}

/// Parse the JSON image format
pub fn decode_series(bytes: &[u8]) -> Result<DwiSeries, String> {
    let file: ImageFile = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    let shape = match file.shape.as_slice() {
        [nx, ny, nz] => (*nx, *ny, *nz, 1),
        [nx, ny, nz, nv] => (*nx, *ny, *nz, *nv),
        other => return Err(format!("expected a 3D or 4D shape, got {:?}", other)),
    };
    let expected = [shape.0, shape.1, shape.2, shape.3]
        .into_iter()
        .try_fold(1usize, usize::checked_mul)
        .ok_or("shape overflows")?;
    if file.data.len() != expected {
        return Err(format!(
            "shape {:?} needs {} values, found {}",
            file.shape,
            expected,
            file.data.len()
        ));
    }
    Array4::from_shape_vec(shape, file.data)
        .map(DwiSeries::new)
        .map_err(|e| e.to_string())
}

/// [`ImageStore`] reading JSON images from the local file system
#[derive(Debug, Clone, Default)]
pub struct JsonImageStore;

impl JsonImageStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageStore for JsonImageStore {
    async fn load(&self, artifact: &ArtifactRef) -> Result<DwiSeries, StoreError> {
        let bytes = tokio::fs::read(artifact.path()).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::NotFound(artifact.to_string())
            } else {
                StoreError::io(artifact, e)
            }
        })?;
        let series = decode_series(&bytes).map_err(|e| StoreError::malformed(artifact, e))?;
        debug!(
            "Loaded {} ({} volumes, grid {})",
            artifact,
            series.volume_count(),
            series.grid()
        );
        Ok(series)
    }
}
