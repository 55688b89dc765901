#![warn(missing_docs)]

//! Traced neurite paths for neurotube.
//!
//! A [`Path`] is an ordered sequence of calibrated 3D nodes, optionally
//! carrying a radius and tangent per node. Paths live in a [`PathGraph`]
//! arena where their start/end joins, derived tree structure and fitted
//! counterparts are kept consistent.
//!
//! # Example
//!
//! ```
//! use neurotube_math::{Calibration, Point3};
//! use neurotube_path::{Path, PathEnd, PathGraph};
//!
//! let cal = Calibration::pixels();
//! let mut graph = PathGraph::new();
//! let trunk = graph.insert(Path::from_points(
//!     cal.clone(),
//!     &[Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)],
//! ))
//! .unwrap();
//! let branch = graph.insert(Path::from_points(
//!     cal,
//!     &[Point3::new(5.0, 0.0, 0.0), Point3::new(5.0, 8.0, 0.0)],
//! ))
//! .unwrap();
//! graph
//!     .set_join(branch, PathEnd::Start, trunk, Point3::new(5.0, 0.0, 0.0))
//!     .unwrap();
//! assert!(graph.path(trunk).unwrap().somehow_joins().contains(&branch));
//! ```

pub mod downsample;
pub mod error;
pub mod graph;
pub mod path;
pub mod swc;

pub use downsample::{simplify, SimplePoint};
pub use error::{PathError, Result};
pub use graph::{PathGraph, TreeOrder};
pub use path::{
    Join, Path, PathEnd, PathTransformer, DEFAULT_RESERVE, EDIT_TANGENT_WINDOW, GROWTH_FACTOR,
};
pub use swc::{Rgb, SwcType};

slotmap::new_key_type! {
    /// Handle of a [`Path`] stored in a [`PathGraph`].
    pub struct PathId;
}
