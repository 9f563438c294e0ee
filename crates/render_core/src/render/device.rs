//! Graphics device capability
//!
//! The renderer talks to the GPU only through [`GraphicsDevice`]. Every
//! method maps to one backend call; the renderer's state mirror decides
//! which calls are needed, so implementations should not add their own
//! redundancy filtering.

use super::material::{Blending, CompareFunc, StencilState};

/// Handle to a compiled program owned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceProgram(pub u64);

/// Handle to a GPU buffer owned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Handle to a texture owned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Handle to an off-screen render target owned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetId(pub u64);

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
    /// Program link step
    Link,
}

/// Vertex and fragment source for one program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Name used in diagnostics
    pub name: String,
    /// Vertex stage source
    pub vertex: String,
    /// Fragment stage source
    pub fragment: String,
}

/// Compiler diagnostic returned by a failed compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileFailure {
    /// Stage that failed
    pub stage: ShaderStage,
    /// Compiler log
    pub diagnostic: String,
}

/// Kind of GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Vertex attribute data
    Vertex,
    /// 32-bit index data
    Index,
}

/// Uniform block slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformBlock {
    /// View/projection, camera position, fog, clipping planes
    Camera,
    /// Model, model-view and normal matrices
    Object,
    /// Material parameters
    Material,
    /// Packed light state
    Lights,
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullFace {
    /// Draw both faces
    None,
    /// Cull back faces
    Back,
    /// Cull front faces
    Front,
}

/// Winding of front faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    /// Counter-clockwise (default)
    CounterClockwise,
    /// Clockwise (mirrored objects)
    Clockwise,
}

/// Primitive draw request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// First element
    pub start: u32,
    /// Number of elements
    pub count: u32,
    /// Read elements through the bound index buffer
    pub indexed: bool,
    /// Instances to draw
    pub instances: u32,
}

/// Opaque GPU backend
pub trait GraphicsDevice {
    /// Compile and link a program
    fn compile_program(&mut self, source: &ShaderSource) -> Result<DeviceProgram, CompileFailure>;

    /// Whether an asynchronously compiled program can be used yet
    fn is_program_ready(&mut self, _program: DeviceProgram) -> bool {
        true
    }

    /// Free a program
    fn delete_program(&mut self, program: DeviceProgram);

    /// Make a program current
    fn use_program(&mut self, program: DeviceProgram);

    /// Set the blend equation
    fn set_blending(&mut self, blending: Blending);

    /// Enable or disable depth testing
    fn set_depth_test(&mut self, enabled: bool);

    /// Enable or disable depth writes
    fn set_depth_write(&mut self, enabled: bool);

    /// Set the depth comparison
    fn set_depth_func(&mut self, func: CompareFunc);

    /// Set the stencil state
    fn set_stencil(&mut self, stencil: &StencilState);

    /// Enable or disable color writes
    fn set_color_write(&mut self, enabled: bool);

    /// Set the culled face
    fn set_cull_face(&mut self, cull: CullFace);

    /// Set the front face winding
    fn set_front_face(&mut self, front: FrontFace);

    /// Bind a texture to a sampler unit
    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    /// Upload a buffer
    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BufferId;

    /// Free a buffer
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Bind a vertex buffer to a named attribute of the current program
    fn bind_vertex_buffer(&mut self, attribute: &str, buffer: BufferId, item_size: usize);

    /// Bind the index buffer
    fn bind_index_buffer(&mut self, buffer: BufferId);

    /// Upload a uniform block for the current program
    fn upload_uniforms(&mut self, block: UniformBlock, data: &[u8]);

    /// Create an off-screen color+depth target
    fn create_render_target(&mut self, width: u32, height: u32) -> RenderTargetId;

    /// Color texture of a render target
    fn render_target_texture(&self, target: RenderTargetId) -> TextureId;

    /// Draw into a render target, or the default framebuffer with `None`
    fn set_render_target(&mut self, target: Option<RenderTargetId>);

    /// Clear color and depth of the current target
    fn clear(&mut self);

    /// Issue a draw
    fn draw(&mut self, call: DrawCall);

    /// Number of texture units available to one draw
    fn max_texture_units(&self) -> u32 {
        16
    }
}
