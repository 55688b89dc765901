//! Fitting circles along a path.
//!
//! Every node is cut by a plane orthogonal to its tangent, a disk is fitted
//! to the sampled cross-section, and the per-node fits are then validated,
//! pruned and gap-filled before a new fitted path is emitted.

use std::sync::atomic::{AtomicUsize, Ordering};

use neurotube_math::{Point3, Vec3};
use neurotube_path::{Path, PathError, PathGraph, PathId};
use rayon::prelude::*;
use serde::Serialize;

use crate::badness::CircleAttempt;
use crate::error::{FitError, Result};
use crate::optimizer::SearchError;
use crate::resolve::{check_angles, check_displacement, fill_gaps, mode_radii, prune_overlaps, NodeFit};
use crate::sampler::{sample_cross_section, CrossSection};
use crate::settings::FitSettings;
use crate::volume::Volume;

/// Phase of a fit, reported to [`FitProgress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FitStage {
    /// Estimating tangents and sampling cross-sections.
    Sampling,
    /// Searching for the best disk on each cross-section.
    Optimizing,
    /// Displacement and angle checks.
    Validating,
    /// Removing overlapping disks and reinstating gaps.
    Pruning,
    /// Building the fitted path.
    Emitting,
    /// The fit failed; no path is produced.
    Failed,
}

/// Observer of a running fit. Called from the fitting threads.
pub trait FitProgress: Sync {
    /// A new stage started.
    fn stage(&self, stage: FitStage);

    /// Another node finished optimising; `fraction` of all nodes are done.
    fn node_done(&self, _fraction: f64) {}
}

/// Diagnostics of a completed fit.
#[derive(Debug, Clone, Serialize)]
pub struct FitReport {
    /// Integer id of the source path.
    pub source_id: Option<u32>,
    /// Grid side used.
    pub side: usize,
    /// World length of one grid step.
    pub scale: f64,
    /// Per-node fits, in source order.
    pub nodes: Vec<NodeFit>,
    /// Nodes dropped for overlapping their neighbours.
    pub pruned: usize,
    /// Nodes reinstated at their original position.
    pub reinstated: usize,
    /// Nodes in the fitted path.
    pub emitted: usize,
}

/// A fitted path not yet added to a graph, with its diagnostics.
#[derive(Debug, Clone)]
pub struct FittedPath {
    /// The fitted path.
    pub path: Path,
    /// How it was obtained.
    pub report: FitReport,
}

struct Progress<'a> {
    observer: Option<&'a dyn FitProgress>,
    done: AtomicUsize,
    total: usize,
}

impl Progress<'_> {
    fn stage(&self, stage: FitStage) {
        log::debug!("fit stage {stage:?}");
        if let Some(observer) = self.observer {
            observer.stage(stage);
        }
    }

    fn node_done(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(observer) = self.observer {
            observer.node_done(done as f64 / self.total as f64);
        }
    }
}

fn run<T, F>(parallel: bool, n: usize, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync + Send,
{
    if parallel {
        (0..n).into_par_iter().map(f).collect()
    } else {
        (0..n).map(f).collect()
    }
}

/// Fit a circle at every node of `path` against `volume`.
///
/// The source path is left untouched. If any node fails to converge or
/// produces a non-finite badness, the whole fit fails. Every error,
/// including rejected settings and an empty path, is reported to `progress`
/// as [`FitStage::Failed`].
pub fn fit_path(
    path: &Path,
    volume: &dyn Volume,
    settings: &FitSettings,
    progress: Option<&dyn FitProgress>,
) -> Result<FittedPath> {
    let progress = Progress {
        observer: progress,
        done: AtomicUsize::new(0),
        total: path.len(),
    };
    let result = settings.validate().and_then(|()| {
        if path.is_empty() {
            Err(FitError::EmptyPath)
        } else {
            fit_nodes(path, volume, settings, &progress)
        }
    });
    if let Err(e) = &result {
        log::warn!("fit failed: {e}");
        progress.stage(FitStage::Failed);
    }
    result
}

fn fit_nodes(
    path: &Path,
    volume: &dyn Volume,
    settings: &FitSettings,
    progress: &Progress<'_>,
) -> Result<FittedPath> {
    let n = path.len();
    let side = settings.side;
    let half = side as f64 / 2.0;
    let calibration = path.calibration();
    let scale = calibration.min_separation();
    let positions = path.positions();

    progress.stage(FitStage::Sampling);
    let tangents: Vec<Vec3> = (0..n)
        .map(|i| path.tangent_at(i, settings.tangent_window))
        .collect::<std::result::Result<_, PathError>>()?;
    let sections: Vec<CrossSection> = run(settings.parallel, n, |i| {
        Ok(sample_cross_section(
            volume,
            calibration,
            &positions[i],
            &tangents[i],
            scale,
            side,
        ))
    })?;

    progress.stage(FitStage::Optimizing);
    let search = settings.search.search_for(side);
    let start = [half, half, settings.search.initial_radius];
    let mut fits: Vec<NodeFit> = run(settings.parallel, n, |i| {
        let section = &sections[i];
        let minimum = search
            .minimize(&CircleAttempt::new(section), &start)
            .map_err(|e| match e {
                SearchError::NoConvergence { .. } => FitError::NoConvergence { node: i },
                SearchError::NonFinite => FitError::NonFinite { node: i },
                e @ SearchError::InvalidBounds { .. } => {
                    FitError::InvalidSettings(format!("node {i}: {e}"))
                }
            })?;
        let (cx, cy, r) = (minimum.x[0], minimum.x[1], minimum.x[2]);
        let (dx, dy) = (cx - half, cy - half);
        let centre = positions[i] - (section.x_basis * dx + section.y_basis * dy);
        log::debug!(
            "node {i}: grid ({cx:.2}, {cy:.2}) r {r:.2}, badness {:.4} after {} iterations",
            minimum.value,
            minimum.iterations
        );
        progress.node_done();
        Ok(NodeFit {
            grid_x: cx,
            grid_y: cy,
            grid_radius: r,
            radius: r * scale,
            centre: centre.coords.into(),
            tangent: tangents[i].into(),
            score: minimum.value,
            moved: scale * (dx * dx + dy * dy).sqrt(),
            mode_radius: 0.0,
            angle: 0.0,
            valid: true,
            reinstated: false,
        })
    })?;

    progress.stage(FitStage::Validating);
    let grid_radii: Vec<f64> = fits.iter().map(|f| f.grid_radius).collect();
    for (fit, mode) in fits.iter_mut().zip(mode_radii(&grid_radii, settings.mode_window)) {
        fit.mode_radius = mode;
    }
    check_displacement(&mut fits);
    check_angles(&mut fits);

    progress.stage(FitStage::Pruning);
    let pruned = prune_overlaps(&mut fits);
    fill_gaps(&mut fits, positions, scale, side, settings.max_gap);
    let reinstated = fits.iter().filter(|f| f.reinstated).count();

    progress.stage(FitStage::Emitting);
    let valid = fits.iter().filter(|f| f.valid).count();
    let mut fitted_positions: Vec<Point3> = Vec::with_capacity(valid);
    let mut fitted_tangents: Vec<Vec3> = Vec::with_capacity(valid);
    let mut fitted_radii: Vec<f64> = Vec::with_capacity(valid);
    for fit in fits.iter().filter(|f| f.valid) {
        fitted_positions.push(fit.centre_point());
        fitted_tangents.push(fit.tangent_vec());
        fitted_radii.push(fit.radius);
    }
    debug_assert_eq!(fitted_positions.len(), valid);

    let mut fitted = Path::with_capacity(calibration.clone(), valid);
    fitted.set_fitted_circles(fitted_positions, fitted_tangents, fitted_radii)?;
    fitted.set_name(match path.id() {
        Some(id) => format!("Fitted Path [{id}]"),
        None => "Fitted Path".to_string(),
    });
    log::debug!("fitted {valid} of {n} nodes ({pruned} pruned, {reinstated} reinstated)");

    Ok(FittedPath {
        path: fitted,
        report: FitReport {
            source_id: path.id(),
            side,
            scale,
            nodes: fits,
            pruned,
            reinstated,
            emitted: valid,
        },
    })
}

/// Add `fitted` to `graph` as the fitted version of `original`, copying the
/// original's SWC type and color.
pub fn attach_fitted(graph: &mut PathGraph, original: PathId, fitted: Path) -> Result<PathId> {
    let source = graph.path(original)?;
    if source.fitted().is_some() {
        return Err(PathError::InvalidState("path already has a fitted version".into()).into());
    }
    let (swc_type, color) = (source.swc_type(), source.color());
    let id = graph.insert(fitted)?;
    graph.set_fitted(original, id)?;
    graph.set_swc_type(original, swc_type, true)?;
    graph.set_color(original, color)?;
    Ok(id)
}

/// Fit circles along path `id` and link the result as its fitted version.
pub fn fit_circles(
    graph: &mut PathGraph,
    id: PathId,
    volume: &dyn Volume,
    settings: &FitSettings,
    progress: Option<&dyn FitProgress>,
) -> Result<PathId> {
    let fitted = fit_path(graph.path(id)?, volume, settings, progress)?;
    attach_fitted(graph, id, fitted.path)
}
