//! Fixed-point preserving polyline simplification.
//!
//! Douglas-Peucker runs independently on each stretch of the path between
//! consecutive fixed points (the endpoints and every index where a join
//! lands), so joins never move.

use std::collections::BTreeSet;

use neurotube_math::{Point3, Vec3};

use crate::path::{Path, EDIT_TANGENT_WINDOW};

/// A node snapshot used by the simplifier: its position and the index it
/// had in the path when the snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplePoint {
    /// Node position.
    pub position: Point3,
    /// Index of the node in the path.
    pub original_index: usize,
}

/// Distance from `p` to the segment `a`-`b`.
fn distance_to_segment(p: &Point3, a: &Point3, b: &Point3) -> f64 {
    let ab: Vec3 = b - a;
    let len_sq = ab.norm_squared();
    if len_sq == 0.0 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Douglas-Peucker simplification keeping both ends.
///
/// A point survives when it lies further than `max_deviation` from the chord
/// of the span it was tested against.
pub fn simplify(points: &[SimplePoint], max_deviation: f64) -> Vec<SimplePoint> {
    let n = points.len();
    if n <= 2 {
        return points.to_vec();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }
        let a = &points[first].position;
        let b = &points[last].position;
        let mut max_dist = 0.0;
        let mut max_idx = first;
        for (i, p) in points.iter().enumerate().take(last).skip(first + 1) {
            let d = distance_to_segment(&p.position, a, b);
            if d > max_dist {
                max_dist = d;
                max_idx = i;
            }
        }
        if max_dist > max_deviation {
            keep[max_idx] = true;
            stack.push((first, max_idx));
            stack.push((max_idx, last));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Mean of `radii[from..=to]`.
fn mean(radii: &[f64], from: usize, to: usize) -> f64 {
    let span = &radii[from..=to];
    span.iter().sum::<f64>() / span.len() as f64
}

impl Path {
    /// Simplify the path between `fixed` indices (the endpoints are always
    /// added). Returns the number of nodes removed.
    ///
    /// Each kept node's radius becomes the mean of the radii between the
    /// midpoints to its kept neighbours; the node closing a stretch keeps
    /// its own radius. Tangents are re-guessed and the render is flagged
    /// stale.
    pub fn downsample_with_fixed(&mut self, fixed: &BTreeSet<usize>, max_deviation: f64) -> usize {
        let n = self.len();
        if n < 2 {
            self.invalidate_render();
            return 0;
        }

        let mut fixed: BTreeSet<usize> = fixed.iter().copied().filter(|&i| i < n).collect();
        fixed.insert(0);
        fixed.insert(n - 1);

        let mut positions = self.positions().to_vec();
        let mut radii = self.radii().map(<[f64]>::to_vec);
        let mut dropped = 0usize;

        let fixed: Vec<usize> = fixed.into_iter().collect();
        for pair in fixed.windows(2) {
            let start = pair[0] - dropped;
            let end = pair[1] - dropped;
            let stretch: Vec<SimplePoint> = (start..=end)
                .map(|i| SimplePoint {
                    position: positions[i],
                    original_index: i,
                })
                .collect();
            let kept = simplify(&stretch, max_deviation);
            dropped += stretch.len() - kept.len();

            if let Some(old) = &radii {
                let mut averaged = Vec::with_capacity(kept.len());
                for (i, sp) in kept.iter().enumerate() {
                    let idx = sp.original_index;
                    if i + 1 == kept.len() {
                        averaged.push(old[idx]);
                        continue;
                    }
                    let next = kept[i + 1].original_index;
                    let from = if i == 0 {
                        idx
                    } else {
                        (idx + kept[i - 1].original_index) / 2
                    };
                    averaged.push(mean(old, from, (idx + next) / 2));
                }
                let mut spliced = old[..start].to_vec();
                spliced.extend(averaged);
                spliced.extend_from_slice(&old[end + 1..]);
                radii = Some(spliced);
            }

            let mut spliced = positions[..start].to_vec();
            spliced.extend(kept.iter().map(|sp| sp.position));
            spliced.extend_from_slice(&positions[end + 1..]);
            positions = spliced;
        }

        let has_radii = radii.is_some();
        self.replace_nodes(positions, radii);
        if has_radii {
            // Cannot fail: radius data was just installed.
            let _ = self.set_guessed_tangents(EDIT_TANGENT_WINDOW);
        }
        self.invalidate_render();
        log::debug!("downsampled {} to {} nodes", n, self.len());
        dropped
    }
}
