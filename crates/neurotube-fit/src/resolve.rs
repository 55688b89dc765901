//! Validation and pruning of per-node circle fits.
//!
//! Applied in order by the pipeline: displacement against the local mode
//! radius, angular continuity of the fitted centres, greedy removal of
//! overlapping disks, then the gap fallback that reinstates original nodes
//! where too many fits in a row were rejected.

use neurotube_math::{Point3, Vec3};
use serde::Serialize;

use crate::overlap::{overlaps, Disk};

/// Per-node fitting state, in grid units unless noted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeFit {
    /// Fitted centre along the grid `i` axis.
    pub grid_x: f64,
    /// Fitted centre along the grid `j` axis.
    pub grid_y: f64,
    /// Fitted radius.
    pub grid_radius: f64,
    /// Fitted radius in calibrated units.
    pub radius: f64,
    /// Fitted centre in calibrated units.
    pub centre: [f64; 3],
    /// Unnormalised tangent used for the cross-section.
    pub tangent: [f64; 3],
    /// Minimum badness reached.
    pub score: f64,
    /// Distance of the fitted centre from the grid centre, in calibrated units.
    pub moved: f64,
    /// Median of the nearby clamped radii.
    pub mode_radius: f64,
    /// Angle at the fitted centre between its valid neighbours, radians.
    pub angle: f64,
    /// Whether the node survives into the fitted path.
    pub valid: bool,
    /// Whether the node was reinstated at its original position.
    pub reinstated: bool,
}

impl NodeFit {
    /// Fitted centre as a point.
    pub fn centre_point(&self) -> Point3 {
        Point3::from(self.centre)
    }

    /// Tangent as a vector.
    pub fn tangent_vec(&self) -> Vec3 {
        Vec3::from(self.tangent)
    }

    fn disk(&self) -> Disk {
        Disk {
            centre: self.centre_point(),
            normal: self.tangent_vec(),
            radius: self.radius,
        }
    }
}

/// Median of the `2 * window + 1` grid radii around each node, each clamped
/// to at least 1. Positions before the start count as `-inf`, past the end
/// as `+inf`.
pub fn mode_radii(grid_radii: &[f64], window: usize) -> Vec<f64> {
    let n = grid_radii.len() as isize;
    let w = window as isize;
    (0..n)
        .map(|i| {
            let mut values: Vec<f64> = (i - w..=i + w)
                .map(|k| {
                    if k < 0 {
                        f64::NEG_INFINITY
                    } else if k >= n {
                        f64::INFINITY
                    } else {
                        grid_radii[k as usize].max(1.0)
                    }
                })
                .collect();
            values.sort_by(f64::total_cmp);
            values[window]
        })
        .collect()
}

/// Mark nodes whose fitted centre moved at least the local mode radius.
///
/// `moved` is in calibrated units and `mode_radius` in grid units; the two
/// only agree when the smallest voxel spacing is 1.
pub fn check_displacement(fits: &mut [NodeFit]) {
    for fit in fits.iter_mut() {
        fit.valid = fit.moved < fit.mode_radius;
    }
}

/// Reject interior nodes whose fitted centre makes an acute angle with the
/// nearest valid centres before and after it.
///
/// Runs front to back, so a rejection affects the neighbours seen by later
/// nodes. Missing neighbours default to the path ends; endpoints get an
/// angle of pi and a NaN angle leaves the node alone.
pub fn check_angles(fits: &mut [NodeFit]) {
    let n = fits.len();
    if n == 0 {
        return;
    }
    fits[0].angle = std::f64::consts::PI;
    fits[n - 1].angle = std::f64::consts::PI;
    for i in 1..n.saturating_sub(1) {
        let previous = (0..i).rev().find(|&j| fits[j].valid).unwrap_or(0);
        let next = (i + 1..n).find(|&j| fits[j].valid).unwrap_or(n - 1);
        let here = fits[i].centre_point();
        let a = fits[previous].centre_point() - here;
        let b = fits[next].centre_point() - here;
        let angle = (a.dot(&b) / (a.norm() * b.norm())).acos();
        fits[i].angle = angle;
        if angle < std::f64::consts::FRAC_PI_2 {
            fits[i].valid = false;
        }
    }
}

/// Number of other valid disks each valid disk overlaps.
fn count_overlaps(fits: &[NodeFit]) -> Vec<usize> {
    let disks: Vec<Disk> = fits.iter().map(NodeFit::disk).collect();
    (0..fits.len())
        .map(|i| {
            if !fits[i].valid {
                return 0;
            }
            (0..fits.len())
                .filter(|&j| j != i && fits[j].valid && overlaps(&disks[i], &disks[j]))
                .count()
        })
        .collect()
}

/// Invalidate disks until no two valid disks overlap. Returns the number
/// of nodes removed.
///
/// Each round removes the first node with the most overlaps, or the next
/// valid node instead when it has as many overlaps and a larger radius.
pub fn prune_overlaps(fits: &mut [NodeFit]) -> usize {
    let mut removed = 0;
    loop {
        let counts = count_overlaps(fits);
        let most = counts.iter().copied().max().unwrap_or(0);
        if most == 0 {
            return removed;
        }
        let Some(worst) = (0..fits.len()).find(|&i| fits[i].valid && counts[i] == most) else {
            return removed;
        };
        let next = (worst + 1..fits.len()).find(|&j| fits[j].valid);
        let victim = match next {
            Some(j) if counts[j] == most && fits[j].radius > fits[worst].radius => j,
            _ => worst,
        };
        log::debug!("dropping node {victim} overlapping {most} others");
        fits[victim].valid = false;
        removed += 1;
    }
}

/// Reinstate rejected nodes so that the path keeps its ends and never skips
/// `max_gap` or more nodes in a row before a rejected stretch, then clamp
/// every surviving radius to at least one grid step.
///
/// A reinstated node takes its original position, unit grid radius and the
/// grid centre.
pub fn fill_gaps(fits: &mut [NodeFit], originals: &[Point3], scale: f64, side: usize, max_gap: usize) {
    let n = fits.len();
    let mut last_valid = 0;
    for i in 0..n {
        let first_or_last = i == 0 || i == n - 1;
        if !fits[i].valid {
            let gone_too_far = i - last_valid >= max_gap;
            let next_valid = i + 1 < n && fits[i + 1].valid;
            if (gone_too_far && !next_valid) || first_or_last {
                let fit = &mut fits[i];
                fit.valid = true;
                fit.reinstated = true;
                fit.centre = originals[i].coords.into();
                fit.grid_radius = 1.0;
                fit.radius = scale;
                fit.mode_radius = 1.0;
                fit.grid_x = side as f64 / 2.0;
                fit.grid_y = side as f64 / 2.0;
            }
        }
        if fits[i].valid {
            if fits[i].radius < scale {
                fits[i].grid_radius = 1.0;
                fits[i].radius = scale;
            }
            last_valid = i;
        }
    }
}
