//! Rendering pipeline
//!
//! Resources (geometry, materials, lights), the program cache, the GPU state
//! binder and the frame renderer that ties them to the scene graph.
//!
//! ## Architecture
//!
//! ```text
//! FrameRenderer::render_frame
//!      │
//!      ├─► SceneGraph::update_world_transforms
//!      ├─► LightState (per-frame light block + counts)
//!      ├─► RenderLists::build / sort
//!      └─► for each entry:
//!             StateBinder::prepare ─► ProgramCache::acquire ─► GraphicsDevice
//!                                  └► GpuState (diffed state calls)
//! ```

pub mod binder;
pub mod camera;
pub mod device;
pub mod error;
pub mod geometry;
pub mod lighting;
pub mod material;
pub mod program;
pub mod recording;
pub mod renderer;
pub mod resources;
pub mod state;
pub mod stats;

mod renderer_tests;

pub use binder::{FrameContext, ObjectUniforms, Prepared, StateBinder};
pub use camera::Camera;
pub use device::{
    BufferId, BufferKind, CompileFailure, CullFace, DeviceProgram, DrawCall, FrontFace, GraphicsDevice,
    RenderTargetId, ShaderSource, ShaderStage, TextureId, UniformBlock,
};
pub use error::{RenderError, RenderResult};
pub use geometry::{attributes, Geometry, GeometryGroup, VertexAttribute};
pub use lighting::{Light, LightCounts, LightState, LightType};
pub use material::{
    Blending, CompareFunc, CustomShader, MapSlot, Material, MaterialParams, MaterialUniforms, ShadingModel, Side,
    StencilOp, StencilState,
};
pub use program::{
    build_source, ObjectProgramFlags, Program, ProgramCache, ProgramEnvironment, ProgramKey, ProgramParameters,
    ShaderDefine, ShaderFeatures,
};
pub use recording::{DeviceCommand, RecordingDevice};
pub use renderer::{Fog, FrameCancel, FramePhase, FrameRenderer};
pub use resources::ResourceRegistry;
pub use state::GpuState;
pub use stats::{FrameStats, UniformUploads};
