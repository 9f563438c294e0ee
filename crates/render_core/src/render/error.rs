//! Rendering errors

use thiserror::Error;

use crate::foundation::collections::{GeometryId, MaterialId, ProgramId};
use crate::scene::SceneError;

use super::device::{ShaderSource, ShaderStage};

/// Errors raised while preparing or drawing a frame
///
/// Only scene errors abort a frame. Everything else is local to one draw:
/// the object is skipped and the frame continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The device rejected a generated program
    #[error("Shader compilation failed for '{key}' ({stage:?}): {diagnostic}")]
    ShaderCompile {
        /// Program cache key
        key: String,
        /// Failing stage
        stage: ShaderStage,
        /// Generated source that failed
        shader: Box<ShaderSource>,
        /// Compiler log
        diagnostic: String,
    },

    /// Geometry lacks an attribute the program reads
    #[error("Program '{program}' requires attribute '{attribute}'")]
    MissingAttribute {
        /// Program cache key
        program: String,
        /// Missing attribute name
        attribute: String,
    },

    /// A fixed budget was reached
    #[error("{resource} limit of {limit} reached")]
    ResourceExhausted {
        /// Exhausted resource
        resource: &'static str,
        /// Configured limit
        limit: usize,
    },

    /// Material handle is stale
    #[error("Material not found: {0:?}")]
    MaterialNotFound(MaterialId),

    /// Geometry handle is stale
    #[error("Geometry not found: {0:?}")]
    GeometryNotFound(GeometryId),

    /// Program handle is stale
    #[error("Program not found: {0:?}")]
    ProgramNotFound(ProgramId),

    /// Scene graph error
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
