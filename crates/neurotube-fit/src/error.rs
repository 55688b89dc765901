//! Error types for circle fitting.

use neurotube_path::PathError;
use thiserror::Error;

/// Errors that can occur while fitting a path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    /// A path operation failed.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The optimizer hit its iteration cap on a node.
    #[error("circle search did not converge at node {node}")]
    NoConvergence {
        /// Index of the node being fitted.
        node: usize,
    },

    /// The badness function produced a non-finite value on a node.
    #[error("circle search produced a non-finite value at node {node}")]
    NonFinite {
        /// Index of the node being fitted.
        node: usize,
    },

    /// Invalid fit settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The path has no nodes to fit.
    #[error("path has no nodes")]
    EmptyPath,
}

/// Result type for fitting operations.
pub type Result<T> = std::result::Result<T, FitError>;
