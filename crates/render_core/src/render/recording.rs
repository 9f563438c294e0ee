//! Recording graphics device
//!
//! A [`GraphicsDevice`] that executes nothing and records every call as a
//! [`DeviceCommand`]. Used to verify the exact command stream a frame
//! produces, and as a headless backend for tools that only need the
//! renderer's decisions (draw order, program selection).

use std::collections::HashSet;

use super::device::{
    BufferId, BufferKind, CompileFailure, CullFace, DeviceProgram, DrawCall, FrontFace, GraphicsDevice,
    RenderTargetId, ShaderSource, ShaderStage, TextureId, UniformBlock,
};
use super::material::{Blending, CompareFunc, StencilState};

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Program compiled
    CompileProgram {
        /// Handle returned
        program: DeviceProgram,
        /// Source name
        name: String,
    },
    /// Program deleted
    DeleteProgram(DeviceProgram),
    /// Program bound
    UseProgram(DeviceProgram),
    /// Blending changed
    SetBlending(Blending),
    /// Depth test toggled
    SetDepthTest(bool),
    /// Depth writes toggled
    SetDepthWrite(bool),
    /// Depth comparison changed
    SetDepthFunc(CompareFunc),
    /// Stencil changed
    SetStencil(StencilState),
    /// Color writes toggled
    SetColorWrite(bool),
    /// Culling changed
    SetCullFace(CullFace),
    /// Winding changed
    SetFrontFace(FrontFace),
    /// Texture bound
    BindTexture {
        /// Sampler unit
        unit: u32,
        /// Texture
        texture: TextureId,
    },
    /// Buffer created
    CreateBuffer {
        /// Handle returned
        buffer: BufferId,
        /// Buffer kind
        kind: BufferKind,
        /// Size in bytes
        len: usize,
    },
    /// Buffer deleted
    DeleteBuffer(BufferId),
    /// Vertex buffer bound
    BindVertexBuffer {
        /// Attribute name
        attribute: String,
        /// Buffer
        buffer: BufferId,
        /// Floats per vertex
        item_size: usize,
    },
    /// Index buffer bound
    BindIndexBuffer(BufferId),
    /// Uniform block uploaded
    UploadUniforms {
        /// Block slot
        block: UniformBlock,
        /// Raw bytes
        data: Vec<u8>,
    },
    /// Render target created
    CreateRenderTarget {
        /// Handle returned
        target: RenderTargetId,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Render target selected
    SetRenderTarget(Option<RenderTargetId>),
    /// Target cleared
    Clear,
    /// Draw issued
    Draw(DrawCall),
}

/// Command-recording device
#[derive(Debug)]
pub struct RecordingDevice {
    commands: Vec<DeviceCommand>,
    next_handle: u64,
    live_programs: HashSet<DeviceProgram>,
    pending: HashSet<DeviceProgram>,
    failing_defines: Vec<String>,
    deferred_compilation: bool,
    max_texture_units: u32,
    compiled: usize,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    /// Create a device that accepts every program
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            next_handle: 1,
            live_programs: HashSet::new(),
            pending: HashSet::new(),
            failing_defines: Vec::new(),
            deferred_compilation: false,
            max_texture_units: 16,
            compiled: 0,
        }
    }

    /// Reject any program whose source defines `name`
    pub fn with_failing_define(mut self, name: impl Into<String>) -> Self {
        self.failing_defines.push(name.into());
        self
    }

    /// Report new programs as not ready until [`Self::mark_all_ready`]
    pub fn with_deferred_compilation(mut self) -> Self {
        self.deferred_compilation = true;
        self
    }

    /// Override the texture unit budget
    pub fn with_max_texture_units(mut self, units: u32) -> Self {
        self.max_texture_units = units;
        self
    }

    /// Recorded commands
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Take and clear the recorded commands
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Clear the recorded commands
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Number of recorded commands matching `pred`
    pub fn count(&self, pred: impl Fn(&DeviceCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }

    /// Recorded draws in order
    pub fn draws(&self) -> Vec<DrawCall> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::Draw(call) => Some(*call),
                _ => None,
            })
            .collect()
    }

    /// Compile attempts, successful or not
    pub fn compile_count(&self) -> usize {
        self.compiled
    }

    /// Programs compiled and not yet deleted
    pub fn live_program_count(&self) -> usize {
        self.live_programs.len()
    }

    /// Finish every pending compilation
    pub fn mark_all_ready(&mut self) {
        self.pending.clear();
    }

    fn next(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn failing_define(&self, source: &ShaderSource) -> Option<&str> {
        self.failing_defines
            .iter()
            .find(|name| {
                source.fragment.lines().any(|line| {
                    line.strip_prefix("#define ")
                        .and_then(|rest| rest.split_whitespace().next())
                        == Some(name.as_str())
                })
            })
            .map(String::as_str)
    }
}

impl GraphicsDevice for RecordingDevice {
    fn compile_program(&mut self, source: &ShaderSource) -> Result<DeviceProgram, CompileFailure> {
        self.compiled += 1;
        if let Some(name) = self.failing_define(source) {
            return Err(CompileFailure {
                stage: ShaderStage::Fragment,
                diagnostic: format!("ERROR: 0:1: '{name}' : unsupported feature"),
            });
        }

        let program = DeviceProgram(self.next());
        self.live_programs.insert(program);
        if self.deferred_compilation {
            self.pending.insert(program);
        }
        self.commands.push(DeviceCommand::CompileProgram {
            program,
            name: source.name.clone(),
        });
        Ok(program)
    }

    fn is_program_ready(&mut self, program: DeviceProgram) -> bool {
        !self.pending.contains(&program)
    }

    fn delete_program(&mut self, program: DeviceProgram) {
        self.live_programs.remove(&program);
        self.pending.remove(&program);
        self.commands.push(DeviceCommand::DeleteProgram(program));
    }

    fn use_program(&mut self, program: DeviceProgram) {
        self.commands.push(DeviceCommand::UseProgram(program));
    }

    fn set_blending(&mut self, blending: Blending) {
        self.commands.push(DeviceCommand::SetBlending(blending));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::SetDepthTest(enabled));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::SetDepthWrite(enabled));
    }

    fn set_depth_func(&mut self, func: CompareFunc) {
        self.commands.push(DeviceCommand::SetDepthFunc(func));
    }

    fn set_stencil(&mut self, stencil: &StencilState) {
        self.commands.push(DeviceCommand::SetStencil(*stencil));
    }

    fn set_color_write(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::SetColorWrite(enabled));
    }

    fn set_cull_face(&mut self, cull: CullFace) {
        self.commands.push(DeviceCommand::SetCullFace(cull));
    }

    fn set_front_face(&mut self, front: FrontFace) {
        self.commands.push(DeviceCommand::SetFrontFace(front));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.commands.push(DeviceCommand::BindTexture { unit, texture });
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BufferId {
        let buffer = BufferId(self.next());
        self.commands.push(DeviceCommand::CreateBuffer { buffer, kind, len: data.len() });
        buffer
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.commands.push(DeviceCommand::DeleteBuffer(buffer));
    }

    fn bind_vertex_buffer(&mut self, attribute: &str, buffer: BufferId, item_size: usize) {
        self.commands.push(DeviceCommand::BindVertexBuffer {
            attribute: attribute.to_string(),
            buffer,
            item_size,
        });
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.commands.push(DeviceCommand::BindIndexBuffer(buffer));
    }

    fn upload_uniforms(&mut self, block: UniformBlock, data: &[u8]) {
        self.commands.push(DeviceCommand::UploadUniforms { block, data: data.to_vec() });
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> RenderTargetId {
        let target = RenderTargetId(self.next());
        self.commands.push(DeviceCommand::CreateRenderTarget { target, width, height });
        target
    }

    fn render_target_texture(&self, target: RenderTargetId) -> TextureId {
        TextureId(target.0 | (1 << 63))
    }

    fn set_render_target(&mut self, target: Option<RenderTargetId>) {
        self.commands.push(DeviceCommand::SetRenderTarget(target));
    }

    fn clear(&mut self) {
        self.commands.push(DeviceCommand::Clear);
    }

    fn draw(&mut self, call: DrawCall) {
        self.commands.push(DeviceCommand::Draw(call));
    }

    fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }
}
