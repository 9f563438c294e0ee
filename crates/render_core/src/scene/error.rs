//! Scene graph errors

use thiserror::Error;

use crate::foundation::collections::NodeId;

/// Errors raised by scene graph mutations
///
/// A mutation that returns an error leaves the graph exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Making `child` a child of `parent` would create a cycle
    #[error("Adding {child:?} under {parent:?} would create a cycle")]
    Cycle {
        /// Requested parent
        parent: NodeId,
        /// Requested child (the parent itself or one of its ancestors)
        child: NodeId,
    },

    /// The node handle does not refer to a live node
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// The node is not a child of the given parent
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Expected parent
        parent: NodeId,
        /// Node that was expected under it
        child: NodeId,
    },

    /// The node's world matrix cannot be inverted
    #[error("World matrix of {0:?} is singular")]
    SingularMatrix(NodeId),
}

/// Result type for scene graph operations
pub type SceneResult<T> = Result<T, SceneError>;
