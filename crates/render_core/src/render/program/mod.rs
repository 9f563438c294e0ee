//! Shader programs
//!
//! ## Architecture
//!
//! ```text
//! Material + Geometry + object flags + ProgramEnvironment
//!                        │
//!                        ▼
//!               ProgramParameters ──► defines() ──┬──► cache_key()
//!                                                 └──► build_source()
//!                        │
//!                        ▼
//!                  ProgramCache (key → refcounted device program)
//! ```

mod cache;
mod chunks;
mod parameters;
mod source;

pub use cache::{Program, ProgramCache};
pub use parameters::{
    ObjectProgramFlags, ProgramEnvironment, ProgramKey, ProgramParameters, ShaderDefine, ShaderFeatures,
};
pub use source::build_source;
