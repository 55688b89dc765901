#![warn(missing_docs)]

//! Math types for neurotube.
//!
//! Thin wrappers around nalgebra providing the domain types used by traced
//! paths: calibrated points and vectors, voxel calibration, and the
//! tolerance constants used by the geometric tests.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A point in calibrated 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// Voxel spacing of an image volume along each axis, plus the unit name.
///
/// World coordinates divided by the spacing give voxel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Spacing along x.
    pub x: f64,
    /// Spacing along y.
    pub y: f64,
    /// Spacing along z.
    pub z: f64,
    /// Unit of the spacing values (e.g. "µm").
    pub unit: String,
}

impl Calibration {
    /// Create a calibration from the three axis spacings and a unit name.
    pub fn new(x: f64, y: f64, z: f64, unit: impl Into<String>) -> Self {
        Self {
            x,
            y,
            z,
            unit: unit.into(),
        }
    }

    /// Unit spacing along every axis, measured in pixels.
    pub fn pixels() -> Self {
        Self::new(1.0, 1.0, 1.0, "pixels")
    }

    /// Smallest absolute axis spacing.
    pub fn min_separation(&self) -> f64 {
        self.x.abs().min(self.y.abs()).min(self.z.abs())
    }

    /// Convert a world-space point to (fractional) voxel coordinates.
    pub fn to_voxel(&self, p: &Point3) -> Point3 {
        Point3::new(p.x / self.x, p.y / self.y, p.z / self.z)
    }

    /// Convert voxel coordinates back to world space.
    pub fn to_world(&self, v: &Point3) -> Point3 {
        Point3::new(v.x * self.x, v.y * self.y, v.z * self.z)
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::pixels()
    }
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear tolerance, used for near-zero vector components and
    /// near-parallel plane tests.
    pub linear: f64,
}

impl Tolerance {
    /// Default tolerance (1e-6).
    pub const DEFAULT: Self = Self { linear: 1e-6 };

    /// Check if a scalar is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.linear
    }

    /// Check if every component of a vector is effectively zero.
    pub fn is_zero_vec(&self, v: &Vec3) -> bool {
        self.is_zero(v.x) && self.is_zero(v.y) && self.is_zero(v.z)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Bit-exact coordinate equality.
///
/// Only meaningful for points that were copied, never recomputed; any
/// transformation of the coordinates breaks it.
pub fn exactly_equal(a: &Point3, b: &Point3) -> bool {
    a.x == b.x && a.y == b.y && a.z == b.z
}
