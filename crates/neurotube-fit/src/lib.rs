#![warn(missing_docs)]

//! Cross-section circle fitting for neurotube paths.
//!
//! Each node of a traced [`Path`](neurotube_path::Path) is cut by a plane
//! orthogonal to its tangent. A disk is fitted to the interpolated
//! cross-section by a derivative-free search, and the resulting disks are
//! validated for displacement, angular continuity and mutual overlap before
//! a fitted path is emitted.
//!
//! # Example
//!
//! ```
//! use neurotube_fit::{fit_circles, FitSettings, VoxelVolume};
//! use neurotube_math::{Calibration, Point3};
//! use neurotube_path::{Path, PathGraph};
//!
//! // A bright rod of radius 2 running along x.
//! let volume = VoxelVolume::from_fn(16, 16, 16, |_, y, z| {
//!     let (dy, dz) = (y as f64 - 8.0, z as f64 - 8.0);
//!     if dy * dy + dz * dz <= 4.0 { 200.0 } else { 10.0 }
//! });
//! let points: Vec<Point3> = (4..9).map(|x| Point3::new(x as f64, 8.0, 8.0)).collect();
//!
//! let mut graph = PathGraph::new();
//! let id = graph.insert(Path::from_points(Calibration::pixels(), &points)).unwrap();
//! let settings = FitSettings { side: 12, ..Default::default() };
//! let fitted = fit_circles(&mut graph, id, &volume, &settings, None).unwrap();
//! assert!(graph.path(fitted).unwrap().has_radii());
//! ```

pub mod badness;
pub mod error;
pub mod optimizer;
pub mod overlap;
pub mod pipeline;
pub mod resolve;
pub mod sampler;
pub mod settings;
pub mod volume;

pub use badness::CircleAttempt;
pub use error::{FitError, Result};
pub use optimizer::{DirectionSetSearch, Minimum, Objective, SearchError};
pub use overlap::{circles_overlap, overlaps, DegenerateGeometry, Disk};
pub use pipeline::{
    attach_fitted, fit_circles, fit_path, FitProgress, FitReport, FitStage, FittedPath,
};
pub use resolve::NodeFit;
pub use sampler::{plane_basis, sample_cross_section, trilinear, CrossSection};
pub use settings::{FitSettings, SearchSettings};
pub use volume::{PixelType, Volume, VoxelVolume};
