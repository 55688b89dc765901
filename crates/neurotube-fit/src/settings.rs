//! Fitting parameters.

use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};
use crate::optimizer::DirectionSetSearch;

/// Parameters of the per-node circle search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Initial line-search step as a fraction of the grid side.
    pub step_fraction: f64,
    /// Starting radius, in grid units.
    pub initial_radius: f64,
    /// Decimal digits of relative precision required of the badness.
    pub f_digits: u32,
    /// Decimal digits of relative precision required of the parameters.
    pub x_digits: u32,
    /// Direction-set iteration cap per node.
    pub max_iterations: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            step_fraction: 0.25,
            initial_radius: 3.0,
            f_digits: 2,
            x_digits: 2,
            max_iterations: 500,
        }
    }
}

impl SearchSettings {
    /// Search configured for a grid of `side` samples.
    pub fn search_for(&self, side: usize) -> DirectionSetSearch {
        DirectionSetSearch {
            step: side as f64 * self.step_fraction,
            f_tolerance: 10f64.powi(-(self.f_digits as i32)),
            x_tolerance: 10f64.powi(-(self.x_digits as i32)),
            max_iterations: self.max_iterations,
        }
    }
}

/// Circle fitting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitSettings {
    /// Samples per side of each cross-section grid.
    pub side: usize,
    /// Nodes either side used for the sampling tangents.
    pub tangent_window: usize,
    /// Nodes either side used for the mode radius.
    pub mode_window: usize,
    /// Rejected nodes after which the original node is reinstated.
    pub max_gap: usize,
    /// Fit nodes on the rayon pool.
    pub parallel: bool,
    /// Per-node search.
    pub search: SearchSettings,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            side: 40,
            tangent_window: 4,
            mode_window: 4,
            max_gap: 2,
            parallel: true,
            search: SearchSettings::default(),
        }
    }
}

impl FitSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.side < 2 {
            return Err(FitError::InvalidSettings(
                "side must be at least 2 samples".into(),
            ));
        }
        if self.tangent_window == 0 {
            return Err(FitError::InvalidSettings(
                "tangent_window must be positive".into(),
            ));
        }
        if self.max_gap == 0 {
            return Err(FitError::InvalidSettings("max_gap must be positive".into()));
        }
        let search = &self.search;
        if !(search.step_fraction > 0.0 && search.step_fraction <= 1.0) {
            return Err(FitError::InvalidSettings(
                "step_fraction must be in (0, 1]".into(),
            ));
        }
        if !(search.initial_radius >= 0.0 && search.initial_radius <= self.side as f64) {
            return Err(FitError::InvalidSettings(
                "initial_radius must lie within the grid".into(),
            ));
        }
        if search.f_digits > 15 || search.x_digits > 15 {
            return Err(FitError::InvalidSettings(
                "tolerance digits must not exceed 15".into(),
            ));
        }
        Ok(())
    }
}
