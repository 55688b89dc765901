//! Intersection test between two disks in 3D.
//!
//! Each disk lies in the plane through its centre with the given normal.
//! When the planes meet, both disks are intersected with the common line and
//! the disks overlap iff the resulting intervals on that line overlap.

use neurotube_math::{Point3, Tolerance, Vec3};
use thiserror::Error;

/// A disk: centre, plane normal (any length) and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Disk {
    /// Centre.
    pub centre: Point3,
    /// Plane normal, not necessarily normalised.
    pub normal: Vec3,
    /// Radius.
    pub radius: f64,
}

/// Configurations the intersection test cannot classify.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum DegenerateGeometry {
    /// The plane normals are nearly parallel but not caught as such.
    #[error("plane system determinant is nearly zero ({0})")]
    SingularPlanes(f64),

    /// The plane intersection line has a vanishing direction.
    #[error("quadratic leading coefficient is nearly zero ({0})")]
    VanishingLine(f64),

    /// The chord intervals fit none of the expected cases.
    #[error("unclassifiable chord intervals [{0}, {1}] and [{2}, {3}]")]
    Unclassified(f64, f64, f64, f64),
}

/// Coefficients `a`, `b` and the discriminant of `|line(u) - centre|^2 = r^2`
/// for the line `origin + u * direction`.
fn chord(origin: &Vec3, direction: &Vec3, disk: &Disk) -> (f64, f64, f64) {
    let offset = origin - disk.centre.coords;
    let a = direction.norm_squared();
    let b = 2.0 * direction.dot(&offset);
    let c = offset.norm_squared() - disk.radius * disk.radius;
    (a, b, b * b - 4.0 * a * c)
}

/// Whether two disks intersect.
pub fn circles_overlap(d1: &Disk, d2: &Disk) -> Result<bool, DegenerateGeometry> {
    let eps = Tolerance::DEFAULT.linear;
    let (n1, n2) = (&d1.normal, &d2.normal);

    let cross = n1.cross(n2);
    if Tolerance::DEFAULT.is_zero_vec(&cross) {
        // Parallel planes: overlap only when coplanar.
        return Ok((d2.centre - d1.centre).dot(n1).abs() < eps);
    }

    let n1n1 = n1.norm_squared();
    let n2n2 = n2.norm_squared();
    let n1n2 = n1.dot(n2);
    let det = n1n1 * n2n2 - n1n2 * n1n2;
    if det.abs() < eps {
        return Err(DegenerateGeometry::SingularPlanes(det));
    }

    let p1 = n1.dot(&d1.centre.coords);
    let p2 = n2.dot(&d2.centre.coords);
    let k1 = (p1 * n2n2 - p2 * n1n2) / det;
    let k2 = (p2 * n1n1 - p1 * n1n2) / det;
    // Common line: origin + u * cross.
    let origin = n1 * k1 + n2 * k2;

    let (a1, b1, disc1) = chord(&origin, &cross, d1);
    let (a2, b2, disc2) = chord(&origin, &cross, d2);
    if disc1 < 0.0 || disc2 < 0.0 {
        return Ok(false);
    }
    if a1.abs() < eps {
        return Err(DegenerateGeometry::VanishingLine(a1));
    }

    let roots = |a: f64, b: f64, disc: f64| {
        let (u, v) = ((-b + disc.sqrt()) / (2.0 * a), (-b - disc.sqrt()) / (2.0 * a));
        (u.min(v), u.max(v))
    };
    let (s1, l1) = roots(a1, b1, disc1);
    let (s2, l2) = roots(a2, b2, disc2);

    if l1 < s2 || l2 < s1 {
        return Ok(false);
    }
    let contains = (s1 <= s2 && l2 <= l1) || (s2 <= s1 && l1 <= l2);
    let straddles = (s1 <= s2 && s2 <= l1 && l1 <= l2) || (s2 <= s1 && s1 <= l2 && l2 <= l1);
    if contains || straddles {
        return Ok(true);
    }
    Err(DegenerateGeometry::Unclassified(s1, l1, s2, l2))
}

/// [`circles_overlap`], treating degenerate configurations as overlapping.
pub fn overlaps(d1: &Disk, d2: &Disk) -> bool {
    circles_overlap(d1, d2).unwrap_or_else(|e| {
        log::warn!("treating degenerate disk pair as overlapping: {e}");
        true
    })
}
