//! Derivative-free bounded minimisation.
//!
//! Powell's direction-set method: each iteration line-minimises along every
//! direction of the set, then replaces the direction of largest decrease by
//! the overall displacement when extrapolating along it still pays off.
//! Line minimisation scans the feasible segment at the configured step and
//! refines the best bracket by golden-section search.

use thiserror::Error;

/// A scalar function of a bounded parameter vector.
pub trait Objective {
    /// Number of parameters.
    fn dimensions(&self) -> usize;

    /// Inclusive `(lower, upper)` bounds of parameter `n`.
    fn bounds(&self, n: usize) -> (f64, f64);

    /// Value at `x`.
    fn evaluate(&self, x: &[f64]) -> f64;
}

/// Ways a search can fail.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SearchError {
    /// The iteration cap was reached before the tolerances were met.
    #[error("no convergence after {iterations} iterations")]
    NoConvergence {
        /// Iterations performed.
        iterations: usize,
    },

    /// The objective returned NaN or an infinity.
    #[error("objective returned a non-finite value")]
    NonFinite,

    /// A parameter's lower bound exceeds its upper bound, or one is NaN.
    #[error("invalid bounds for parameter {dimension}: [{lower}, {upper}]")]
    InvalidBounds {
        /// Offending parameter.
        dimension: usize,
        /// Reported lower bound.
        lower: f64,
        /// Reported upper bound.
        upper: f64,
    },
}

/// Result of a successful search.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Parameters of the best point found.
    pub x: Vec<f64>,
    /// Objective value there.
    pub value: f64,
    /// Direction-set iterations performed.
    pub iterations: usize,
    /// Objective evaluations performed.
    pub evaluations: usize,
}

/// Golden section ratio, `(3 - sqrt(5)) / 2`.
const GOLDEN: f64 = 0.381_966_011_250_105_1;

/// Upper limit on coarse samples per line.
const MAX_SCAN: usize = 256;

/// Powell direction-set search over a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionSetSearch {
    /// Coarse sampling interval along each line, in parameter units.
    pub step: f64,
    /// Relative function tolerance (absolute below magnitude 1).
    pub f_tolerance: f64,
    /// Relative argument tolerance (absolute below magnitude 1).
    pub x_tolerance: f64,
    /// Iteration cap.
    pub max_iterations: usize,
}

struct Counted<'a> {
    objective: &'a dyn Objective,
    lower: Vec<f64>,
    upper: Vec<f64>,
    evaluations: usize,
}

impl Counted<'_> {
    fn clamp(&self, x: &mut [f64]) {
        for (i, v) in x.iter_mut().enumerate() {
            *v = v.clamp(self.lower[i], self.upper[i]);
        }
    }

    fn eval(&mut self, x: &[f64]) -> Result<f64, SearchError> {
        self.evaluations += 1;
        let f = self.objective.evaluate(x);
        if f.is_finite() {
            Ok(f)
        } else {
            Err(SearchError::NonFinite)
        }
    }

    fn eval_along(&mut self, x: &[f64], d: &[f64], t: f64) -> Result<f64, SearchError> {
        let mut p: Vec<f64> = x.iter().zip(d).map(|(xi, di)| xi + t * di).collect();
        self.clamp(&mut p);
        self.eval(&p)
    }

    /// Range of `t` keeping `x + t * d` inside the box.
    fn feasible(&self, x: &[f64], d: &[f64]) -> (f64, f64) {
        let mut lo = f64::NEG_INFINITY;
        let mut hi = f64::INFINITY;
        for i in 0..x.len() {
            if d[i] == 0.0 {
                continue;
            }
            let a = (self.lower[i] - x[i]) / d[i];
            let b = (self.upper[i] - x[i]) / d[i];
            lo = lo.max(a.min(b));
            hi = hi.min(a.max(b));
        }
        (lo.min(0.0), hi.max(0.0))
    }
}

impl DirectionSetSearch {
    /// Minimise `objective` starting from `start` (clamped into bounds).
    pub fn minimize(&self, objective: &dyn Objective, start: &[f64]) -> Result<Minimum, SearchError> {
        let n = objective.dimensions();
        let (lower, upper): (Vec<f64>, Vec<f64>) = (0..n).map(|i| objective.bounds(i)).unzip();
        for (dimension, (&lo, &hi)) in lower.iter().zip(&upper).enumerate() {
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(SearchError::InvalidBounds {
                    dimension,
                    lower: lo,
                    upper: hi,
                });
            }
        }
        let mut f = Counted {
            objective,
            lower,
            upper,
            evaluations: 0,
        };

        let mut x: Vec<f64> = start.iter().copied().take(n).collect();
        x.resize(n, 0.0);
        f.clamp(&mut x);
        let mut fx = f.eval(&x)?;

        let mut directions: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let mut d = vec![0.0; n];
                d[i] = 1.0;
                d
            })
            .collect();

        for iteration in 1..=self.max_iterations {
            let x0 = x.clone();
            let f0 = fx;
            let mut biggest_drop = 0.0;
            let mut biggest = 0;

            for (k, d) in directions.iter().enumerate() {
                let before = fx;
                fx = self.line_minimize(&mut f, &mut x, d, fx)?;
                if before - fx > biggest_drop {
                    biggest_drop = before - fx;
                    biggest = k;
                }
            }

            let dx = x
                .iter()
                .zip(&x0)
                .map(|(a, b)| (a - b).abs() / a.abs().max(1.0))
                .fold(0.0, f64::max);
            if f0 - fx <= self.f_tolerance * fx.abs().max(1.0) && dx <= self.x_tolerance {
                return Ok(Minimum {
                    x,
                    value: fx,
                    iterations: iteration,
                    evaluations: f.evaluations,
                });
            }

            let displacement: Vec<f64> = x.iter().zip(&x0).map(|(a, b)| a - b).collect();
            let norm = displacement.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm == 0.0 {
                continue;
            }
            let mut extrapolated: Vec<f64> = x.iter().zip(&x0).map(|(a, b)| 2.0 * a - b).collect();
            f.clamp(&mut extrapolated);
            let fe = f.eval(&extrapolated)?;
            if fe < f0 {
                let t = 2.0 * (f0 - 2.0 * fx + fe) * (f0 - fx - biggest_drop).powi(2)
                    - biggest_drop * (f0 - fe).powi(2);
                if t < 0.0 {
                    let d: Vec<f64> = displacement.iter().map(|v| v / norm).collect();
                    fx = self.line_minimize(&mut f, &mut x, &d, fx)?;
                    directions[biggest] = directions[n - 1].clone();
                    directions[n - 1] = d;
                }
            }
        }

        Err(SearchError::NoConvergence {
            iterations: self.max_iterations,
        })
    }

    /// Move `x` to the best point found along `d`, returning its value.
    /// `x` only moves on strict improvement.
    fn line_minimize(
        &self,
        f: &mut Counted<'_>,
        x: &mut [f64],
        d: &[f64],
        fx: f64,
    ) -> Result<f64, SearchError> {
        let (lo, hi) = f.feasible(x, d);
        if hi - lo <= 0.0 || !lo.is_finite() || !hi.is_finite() {
            return Ok(fx);
        }

        let samples = (((hi - lo) / self.step.max(f64::EPSILON)).ceil() as usize).clamp(1, MAX_SCAN);
        let spacing = (hi - lo) / samples as f64;
        let mut best_t = 0.0;
        let mut best_f = fx;
        for k in 0..=samples {
            let t = lo + spacing * k as f64;
            let v = f.eval_along(x, d, t)?;
            if v < best_f {
                best_t = t;
                best_f = v;
            }
        }

        let tol = (self.x_tolerance * 0.1).max(1e-12);
        let (mut a, mut b) = ((best_t - spacing).max(lo), (best_t + spacing).min(hi));
        let mut c = a + GOLDEN * (b - a);
        let mut e = b - GOLDEN * (b - a);
        let mut fc = f.eval_along(x, d, c)?;
        let mut fe = f.eval_along(x, d, e)?;
        while b - a > tol {
            if fc <= fe {
                b = e;
                e = c;
                fe = fc;
                c = a + GOLDEN * (b - a);
                fc = f.eval_along(x, d, c)?;
            } else {
                a = c;
                c = e;
                fc = fe;
                e = b - GOLDEN * (b - a);
                fe = f.eval_along(x, d, e)?;
            }
        }
        for (t, v) in [(c, fc), (e, fe)] {
            if v < best_f {
                best_t = t;
                best_f = v;
            }
        }

        if best_f < fx {
            for (xi, di) in x.iter_mut().zip(d) {
                *xi += best_t * di;
            }
            f.clamp(x);
            Ok(best_f)
        } else {
            Ok(fx)
        }
    }
}
