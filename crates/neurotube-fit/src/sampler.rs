//! Oriented cross-sections through a volume.
//!
//! A square grid of `side x side` samples is laid out in the plane through a
//! node orthogonal to its tangent, spaced by the smallest voxel spacing, and
//! each sample is trilinearly interpolated from the volume.

use neurotube_math::{Calibration, Point3, Tolerance, Vec3};

use crate::volume::Volume;

/// A sampled plane orthogonal to a path tangent.
#[derive(Debug, Clone)]
pub struct CrossSection {
    /// Samples, `values[j * side + i]` for grid cell `(i, j)`.
    pub values: Vec<f32>,
    /// Samples per row and column.
    pub side: usize,
    /// In-plane basis along grid `i`, scaled to one sample step.
    pub x_basis: Vec3,
    /// In-plane basis along grid `j`, scaled to one sample step.
    pub y_basis: Vec3,
    /// Smallest sample.
    pub min: f32,
    /// Largest sample.
    pub max: f32,
}

impl CrossSection {
    /// Sample at grid cell `(i, j)`.
    pub fn at(&self, i: usize, j: usize) -> f32 {
        self.values[j * self.side + i]
    }
}

/// Two unit vectors spanning the plane orthogonal to `normal`.
///
/// The first is `normal x (0, 0, 1)` unless the normal is (nearly) parallel
/// to z, in which case `normal x (0, 1, 0)` is used; the second is
/// `a x normal`. A zero normal has no plane and yields the x and y axes.
pub fn plane_basis(normal: &Vec3) -> (Vec3, Vec3) {
    let tol = Tolerance::DEFAULT;
    let a = if tol.is_zero(normal.x) && tol.is_zero(normal.y) {
        Vec3::new(normal.z, 0.0, -normal.x)
    } else {
        Vec3::new(-normal.y, normal.x, 0.0)
    };
    let b = a.cross(normal);
    if a.norm_squared() == 0.0 || b.norm_squared() == 0.0 {
        log::warn!("tangent {normal:?} has no normal plane, sampling in the xy plane");
        return (Vec3::x(), Vec3::y());
    }
    (a.normalize(), b.normalize())
}

/// Trilinear interpolation at fractional voxel coordinates.
///
/// Any of the eight surrounding voxels falling outside the volume makes the
/// sample zero.
pub fn trilinear(volume: &dyn Volume, v: &Point3) -> f32 {
    if !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()) {
        return 0.0;
    }
    let (xf, yf, zf) = (v.x.floor(), v.y.floor(), v.z.floor());
    let (xc, yc, zc) = (v.x.ceil(), v.y.ceil(), v.z.ceil());
    if !volume.in_bounds(xf as i64, yf as i64, zf as i64)
        || !volume.in_bounds(xc as i64, yc as i64, zc as i64)
    {
        return 0.0;
    }
    let (xd, yd, zd) = (v.x - xf, v.y - yf, v.z - zf);
    let (xf, yf, zf) = (xf as usize, yf as usize, zf as usize);
    let (xc, yc, zc) = (xc as usize, yc as usize, zc as usize);
    let s = |x, y, z| f64::from(volume.voxel(x, y, z));

    let lerp = |a: f64, b: f64, t: f64| a * (1.0 - t) + b * t;
    let x0y0 = lerp(s(xf, yf, zf), s(xf, yf, zc), zd);
    let x0y1 = lerp(s(xf, yc, zf), s(xf, yc, zc), zd);
    let x1y0 = lerp(s(xc, yf, zf), s(xc, yf, zc), zd);
    let x1y1 = lerp(s(xc, yc, zf), s(xc, yc, zc), zd);
    let x0 = lerp(x0y0, x0y1, yd);
    let x1 = lerp(x1y0, x1y1, yd);
    lerp(x0, x1, xd) as f32
}

/// Sample the `side x side` plane through `origin` orthogonal to `normal`.
///
/// `origin` is in calibrated units; `step` is the world distance between
/// neighbouring samples.
pub fn sample_cross_section(
    volume: &dyn Volume,
    calibration: &Calibration,
    origin: &Point3,
    normal: &Vec3,
    step: f64,
    side: usize,
) -> CrossSection {
    let (a, b) = plane_basis(normal);
    let (a, b) = (a * step, b * step);
    let mid = (side as f64 - 1.0) / 2.0;

    let mut values = vec![0.0f32; side * side];
    for i in 0..side {
        for j in 0..side {
            let gi = mid - i as f64;
            let gj = mid - j as f64;
            let world = origin + a * gi + b * gj;
            values[j * side + i] = trilinear(volume, &calibration.to_voxel(&world));
        }
    }

    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    CrossSection {
        values,
        side,
        x_basis: a,
        y_basis: b,
        min,
        max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::VoxelVolume;
    use approx::assert_relative_eq;

    #[test]
    fn test_basis_is_orthonormal() {
        for n in [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.0, -1.0, 0.0),
        ] {
            let (a, b) = plane_basis(&n);
            assert_relative_eq!(a.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(b.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(a.dot(&b), 0.0, epsilon = 1e-12);
            assert_relative_eq!(a.dot(&n), 0.0, epsilon = 1e-12);
            assert_relative_eq!(b.dot(&n), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_basis_along_x() {
        let (a, b) = plane_basis(&Vec3::new(4.0, 0.0, 0.0));
        assert_relative_eq!(a, Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(b, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_zero_tangent_falls_back() {
        let (a, b) = plane_basis(&Vec3::zeros());
        assert_eq!(a, Vec3::x());
        assert_eq!(b, Vec3::y());
    }

    #[test]
    fn test_trilinear() {
        let vol = VoxelVolume::from_fn(3, 3, 3, |x, y, z| (x + 10 * y + 100 * z) as f32);
        assert_relative_eq!(trilinear(&vol, &Point3::new(1.0, 1.0, 1.0)), 111.0);
        assert_relative_eq!(trilinear(&vol, &Point3::new(0.5, 1.5, 1.25)), 140.5);
        assert_eq!(trilinear(&vol, &Point3::new(1.5, 1.0, 2.5)), 0.0);
        assert_eq!(trilinear(&vol, &Point3::new(-0.1, 1.0, 1.0)), 0.0);
    }

    #[test]
    fn test_cross_section_centre_and_layout() {
        // Intensity grows with y; the tangent runs along x.
        let vol = VoxelVolume::from_fn(5, 9, 9, |_, y, _| y as f32);
        let cal = Calibration::pixels();
        let cs = sample_cross_section(
            &vol,
            &cal,
            &Point3::new(2.0, 4.0, 4.0),
            &Vec3::new(2.0, 0.0, 0.0),
            1.0,
            5,
        );
        assert_eq!(cs.values.len(), 25);
        assert_relative_eq!(cs.at(2, 2), 4.0);
        // a = +y and grid offsets run backwards: i = 0 sits at y + 2.
        assert_relative_eq!(cs.at(0, 2), 6.0);
        assert_relative_eq!(cs.at(4, 2), 2.0);
        assert_relative_eq!(cs.min, 2.0);
        assert_relative_eq!(cs.max, 6.0);
        assert_relative_eq!(cs.x_basis, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_cross_section_outside_is_zero() {
        let vol = VoxelVolume::from_fn(3, 3, 3, |_, _, _| 7.0);
        let cs = sample_cross_section(
            &vol,
            &Calibration::pixels(),
            &Point3::new(1.0, 1.0, 1.0),
            &Vec3::new(0.0, 0.0, 1.0),
            1.0,
            5,
        );
        assert_relative_eq!(cs.at(2, 2), 7.0);
        assert_eq!(cs.at(0, 0), 0.0);
        assert_eq!(cs.min, 0.0);
    }
}
