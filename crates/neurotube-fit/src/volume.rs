//! Image volumes sampled by the fitter.

use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};

/// Storage type of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelType {
    /// Unsigned 8-bit.
    Gray8,
    /// Unsigned 16-bit.
    Gray16,
    /// 32-bit float.
    Gray32,
}

/// Read access to a 3D grayscale image, indexed in voxels.
///
/// Implementations must be shareable across the fitting threads.
pub trait Volume: Sync {
    /// Number of voxels along x.
    fn width(&self) -> usize;
    /// Number of voxels along y.
    fn height(&self) -> usize;
    /// Number of slices.
    fn depth(&self) -> usize;
    /// Storage type of the samples.
    fn pixel_type(&self) -> PixelType;
    /// Intensity of voxel `(x, y, z)`. Callers stay within bounds.
    fn voxel(&self, x: usize, y: usize, z: usize) -> f32;

    /// Whether `(x, y, z)` lies inside the volume.
    fn in_bounds(&self, x: i64, y: i64, z: i64) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.width()
            && (y as usize) < self.height()
            && (z as usize) < self.depth()
    }
}

/// An in-memory volume, stored slice by slice in row-major order.
#[derive(Debug, Clone)]
pub struct VoxelVolume {
    width: usize,
    height: usize,
    depth: usize,
    pixel_type: PixelType,
    data: Vec<f32>,
}

impl VoxelVolume {
    fn checked(width: usize, height: usize, depth: usize, len: usize) -> Result<()> {
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(depth))
            .ok_or_else(|| FitError::InvalidSettings("volume dimensions overflow".into()))?;
        if expected != len {
            return Err(FitError::InvalidSettings(format!(
                "volume of {width}x{height}x{depth} needs {expected} samples, got {len}"
            )));
        }
        Ok(())
    }

    /// Build from 8-bit samples.
    pub fn from_u8(width: usize, height: usize, depth: usize, data: &[u8]) -> Result<Self> {
        Self::checked(width, height, depth, data.len())?;
        Ok(Self {
            width,
            height,
            depth,
            pixel_type: PixelType::Gray8,
            data: data.iter().map(|&v| f32::from(v)).collect(),
        })
    }

    /// Build from 16-bit samples.
    pub fn from_u16(width: usize, height: usize, depth: usize, data: &[u16]) -> Result<Self> {
        Self::checked(width, height, depth, data.len())?;
        Ok(Self {
            width,
            height,
            depth,
            pixel_type: PixelType::Gray16,
            data: data.iter().map(|&v| f32::from(v)).collect(),
        })
    }

    /// Build from 32-bit float samples.
    pub fn from_f32(width: usize, height: usize, depth: usize, data: Vec<f32>) -> Result<Self> {
        Self::checked(width, height, depth, data.len())?;
        Ok(Self {
            width,
            height,
            depth,
            pixel_type: PixelType::Gray32,
            data,
        })
    }

    /// Build a float volume by evaluating `f` at every voxel.
    pub fn from_fn(
        width: usize,
        height: usize,
        depth: usize,
        mut f: impl FnMut(usize, usize, usize) -> f32,
    ) -> Self {
        let mut data = Vec::with_capacity(width * height * depth);
        for z in 0..depth {
            for y in 0..height {
                for x in 0..width {
                    data.push(f(x, y, z));
                }
            }
        }
        Self {
            width,
            height,
            depth,
            pixel_type: PixelType::Gray32,
            data,
        }
    }
}

impl Volume for VoxelVolume {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    fn voxel(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[(z * self.height + y) * self.width + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let data: Vec<u8> = (0..24).collect();
        let vol = VoxelVolume::from_u8(4, 3, 2, &data).unwrap();
        assert_eq!(vol.voxel(1, 0, 0), 1.0);
        assert_eq!(vol.voxel(0, 1, 0), 4.0);
        assert_eq!(vol.voxel(0, 0, 1), 12.0);
        assert_eq!(vol.voxel(3, 2, 1), 23.0);
        assert_eq!(vol.pixel_type(), PixelType::Gray8);
    }

    #[test]
    fn test_size_mismatch() {
        assert!(matches!(
            VoxelVolume::from_u16(2, 2, 2, &[0; 7]),
            Err(FitError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_bounds() {
        let vol = VoxelVolume::from_fn(2, 3, 4, |x, y, z| (x + y + z) as f32);
        assert!(vol.in_bounds(1, 2, 3));
        assert!(!vol.in_bounds(2, 0, 0));
        assert!(!vol.in_bounds(0, -1, 0));
        assert_eq!(vol.voxel(1, 2, 3), 6.0);
    }
}
