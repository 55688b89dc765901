//! Circle-on-cross-section objective.

use crate::optimizer::Objective;
use crate::sampler::CrossSection;

/// How badly the disk `(x, y, r)` (grid units) explains a cross-section.
///
/// Pixels inside the disk are penalised by their squared distance to the
/// section maximum, pixels outside by their squared distance to the minimum.
/// Every integer-spaced probe of the disk's bounding square that falls off
/// the grid adds the full `(max - min)^2`. The sum is normalised by the
/// number of pixels.
#[derive(Debug, Clone, Copy)]
pub struct CircleAttempt<'a> {
    section: &'a CrossSection,
}

impl<'a> CircleAttempt<'a> {
    /// Objective over `section`.
    pub fn new(section: &'a CrossSection) -> Self {
        Self { section }
    }

    /// Badness of the disk centred at `(x, y)` with radius `r`.
    pub fn badness(&self, x: f64, y: f64, r: f64) -> f64 {
        let side = self.section.side;
        let max = f64::from(self.section.max);
        let min = f64::from(self.section.min);

        let mut badness = 0.0;
        for i in 0..side {
            let di = i as f64 - x;
            for j in 0..side {
                let dj = j as f64 - y;
                let v = f64::from(self.section.at(i, j));
                badness += if r * r > di * di + dj * dj {
                    (max - v) * (max - v)
                } else {
                    (v - min) * (v - min)
                };
            }
        }

        let penalty = (max - min) * (max - min);
        let limit = side as f64;
        let mut ic = x - r;
        while ic <= x + r {
            let mut jc = y - r;
            while jc <= y + r {
                if ic < 0.0 || ic > limit || jc < 0.0 || jc > limit {
                    badness += penalty;
                }
                jc += 1.0;
            }
            ic += 1.0;
        }

        badness / (side * side) as f64
    }
}

impl Objective for CircleAttempt<'_> {
    fn dimensions(&self) -> usize {
        3
    }

    fn bounds(&self, _n: usize) -> (f64, f64) {
        (0.0, self.section.side as f64)
    }

    fn evaluate(&self, x: &[f64]) -> f64 {
        self.badness(x[0], x[1], x[2])
    }
}
