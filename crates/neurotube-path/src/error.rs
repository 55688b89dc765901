//! Error types for path editing.

use thiserror::Error;

use crate::PathId;

/// Errors that can occur while editing paths or their joins.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    /// A node index was outside the valid range.
    #[error("node index {index} out of range for a path of {len} nodes")]
    InvalidIndex {
        /// The offending index.
        index: usize,
        /// Number of nodes in the path.
        len: usize,
    },

    /// The operation is not allowed in the current state of the path.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The handle does not refer to a path in the graph.
    #[error("no path with handle {0:?}")]
    UnknownPath(PathId),
}

/// Result type for path operations.
pub type Result<T> = std::result::Result<T, PathError>;
