//! 4D diffusion series value object
//!
//! A series is stored as `x × y × z × volumes`; the fourth axis is the
//! diffusion axis along which groups are concatenated.

use crate::core::error::DomainError;
use ndarray::{Array3, Array4, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

/// In-plane and slice geometry of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpatialGrid {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl SpatialGrid {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    pub fn voxel_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }
}

impl std::fmt::Display for SpatialGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.nx, self.ny, self.nz)
    }
}

/// A diffusion-weighted series (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwiSeries {
    data: Array4<f32>,
}

impl DwiSeries {
    pub fn new(data: Array4<f32>) -> Self {
        Self { data }
    }

    /// A series with `volumes` volumes filled with zeros
    pub fn zeros(grid: SpatialGrid, volumes: usize) -> Self {
        Self::new(Array4::zeros((grid.nx, grid.ny, grid.nz, volumes)))
    }

    /// Stack 3D volumes along the diffusion axis
    pub fn from_volumes(volumes: &[Array3<f32>]) -> Result<Self, DomainError> {
        if volumes.is_empty() {
            return Err(DomainError::validation(
                "series",
                "cannot build a series from zero volumes",
            ));
        }
        let views: Vec<ArrayView3<f32>> = volumes.iter().map(|v| v.view()).collect();
        let data = ndarray::stack(Axis(3), &views)
            .map_err(|e| DomainError::validation("series", format!("volume shapes differ: {e}")))?;
        Ok(Self::new(data))
    }

    /// Concatenate series along the diffusion axis, in the given order
    pub fn concatenate(series: &[&DwiSeries]) -> Result<Self, DomainError> {
        if series.is_empty() {
            return Err(DomainError::validation(
                "series",
                "cannot concatenate zero series",
            ));
        }
        let views: Vec<_> = series.iter().map(|s| s.data.view()).collect();
        let data = ndarray::concatenate(Axis(3), &views).map_err(|e| {
            DomainError::validation("series", format!("spatial grids differ: {e}"))
        })?;
        Ok(Self::new(data))
    }

    pub fn grid(&self) -> SpatialGrid {
        let (nx, ny, nz, _) = self.data.dim();
        SpatialGrid::new(nx, ny, nz)
    }

    pub fn volume_count(&self) -> usize {
        self.data.len_of(Axis(3))
    }

    /// View of a single volume
    ///
    /// # Panics
    /// Panics if `index` is out of range
    pub fn volume(&self, index: usize) -> ArrayView3<'_, f32> {
        self.data.index_axis(Axis(3), index)
    }

    pub fn data(&self) -> &Array4<f32> {
        &self.data
    }

    pub fn into_data(self) -> Array4<f32> {
        self.data
    }

    /// Multiply every voxel of every volume by `factor`
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.data.mapv(|v| v * factor))
    }

    /// Mean intensity over all voxels of the selected volumes
    ///
    /// Returns `None` when no volume is selected or the series is empty.
    pub fn mean_of_volumes(&self, indices: &[usize]) -> Option<f64> {
        let mut sum = 0.0_f64;
        let mut count = 0_usize;
        for &index in indices {
            if index >= self.volume_count() {
                return None;
            }
            for &v in self.volume(index).iter() {
                sum += v as f64;
                count += 1;
            }
        }
        (count > 0).then(|| sum / count as f64)
    }

    /// Mean intensity over the whole series
    pub fn mean_intensity(&self) -> Option<f64> {
        let indices: Vec<usize> = (0..self.volume_count()).collect();
        self.mean_of_volumes(&indices)
    }

    /// Voxelwise mean of several volumes sharing one grid
    pub fn average_volumes(volumes: &[ArrayView3<f32>]) -> Result<Array3<f32>, DomainError> {
        let first = volumes.first().ok_or_else(|| {
            DomainError::validation("series", "cannot average zero volumes")
        })?;
        let mut acc = Array3::<f32>::zeros(first.raw_dim());
        for volume in volumes {
            if volume.raw_dim() != acc.raw_dim() {
                return Err(DomainError::validation(
                    "series",
                    "cannot average volumes with different spatial grids",
                ));
            }
            acc += volume;
        }
        acc /= volumes.len() as f32;
        Ok(acc)
    }
}
