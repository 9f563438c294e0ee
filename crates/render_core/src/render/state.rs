//! GPU state mirror
//!
//! Shadows the pipeline state last sent to the device. Every setter compares
//! against the mirror and only forwards a change. Unknown fields (`None`)
//! always forward, so a freshly reset mirror re-establishes everything.

use std::collections::HashMap;

use crate::render::device::{
    BufferId, CullFace, DeviceProgram, FrontFace, GraphicsDevice, RenderTargetId, TextureId,
};
use crate::render::material::{Blending, CompareFunc, StencilState};

fn diff<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    if slot.as_ref() == Some(&value) {
        false
    } else {
        *slot = Some(value);
        true
    }
}

/// Mirror of device pipeline state
#[derive(Debug, Default)]
pub struct GpuState {
    program: Option<DeviceProgram>,
    blending: Option<Blending>,
    depth_test: Option<bool>,
    depth_write: Option<bool>,
    depth_func: Option<CompareFunc>,
    stencil: Option<StencilState>,
    color_write: Option<bool>,
    cull_face: Option<CullFace>,
    front_face: Option<FrontFace>,
    textures: HashMap<u32, TextureId>,
    vertex_buffers: HashMap<String, BufferId>,
    index_buffer: Option<BufferId>,
    render_target: Option<Option<RenderTargetId>>,
    issued: u64,
    elided: u64,
}

impl GpuState {
    /// Create an empty mirror
    pub fn new() -> Self {
        Self::default()
    }

    fn count(&mut self, changed: bool) -> bool {
        if changed {
            self.issued += 1;
        } else {
            self.elided += 1;
        }
        changed
    }

    /// Forget everything, e.g. after another user touched the device
    pub fn reset(&mut self) {
        let (issued, elided) = (self.issued, self.elided);
        *self = Self { issued, elided, ..Self::default() };
    }

    /// Bind a program; returns whether it was a switch
    pub fn use_program<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, program: DeviceProgram) -> bool {
        let changed = diff(&mut self.program, program);
        if changed {
            device.use_program(program);
            // Uniform/attribute bindings belong to the program
            self.vertex_buffers.clear();
            self.index_buffer = None;
        }
        self.count(changed)
    }

    /// Currently bound program
    pub fn program(&self) -> Option<DeviceProgram> {
        self.program
    }

    /// Drop the program from the mirror if it was deleted
    pub fn forget_program(&mut self, program: DeviceProgram) {
        if self.program == Some(program) {
            self.program = None;
        }
    }

    /// Set blending
    pub fn set_blending<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, blending: Blending) {
        let changed = diff(&mut self.blending, blending);
        if self.count(changed) {
            device.set_blending(blending);
        }
    }

    /// Set depth test
    pub fn set_depth_test<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, enabled: bool) {
        let changed = diff(&mut self.depth_test, enabled);
        if self.count(changed) {
            device.set_depth_test(enabled);
        }
    }

    /// Set depth writes
    pub fn set_depth_write<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, enabled: bool) {
        let changed = diff(&mut self.depth_write, enabled);
        if self.count(changed) {
            device.set_depth_write(enabled);
        }
    }

    /// Set depth comparison
    pub fn set_depth_func<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, func: CompareFunc) {
        let changed = diff(&mut self.depth_func, func);
        if self.count(changed) {
            device.set_depth_func(func);
        }
    }

    /// Set stencil state
    pub fn set_stencil<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, stencil: &StencilState) {
        let changed = diff(&mut self.stencil, *stencil);
        if self.count(changed) {
            device.set_stencil(stencil);
        }
    }

    /// Set color writes
    pub fn set_color_write<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, enabled: bool) {
        let changed = diff(&mut self.color_write, enabled);
        if self.count(changed) {
            device.set_color_write(enabled);
        }
    }

    /// Set culled face
    pub fn set_cull_face<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, cull: CullFace) {
        let changed = diff(&mut self.cull_face, cull);
        if self.count(changed) {
            device.set_cull_face(cull);
        }
    }

    /// Set front face winding
    pub fn set_front_face<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, front: FrontFace) {
        let changed = diff(&mut self.front_face, front);
        if self.count(changed) {
            device.set_front_face(front);
        }
    }

    /// Bind a texture unit
    pub fn bind_texture<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, unit: u32, texture: TextureId) {
        let changed = self.textures.insert(unit, texture) != Some(texture);
        if self.count(changed) {
            device.bind_texture(unit, texture);
        }
    }

    /// Bind a vertex buffer to an attribute
    pub fn bind_vertex_buffer<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        attribute: &str,
        buffer: BufferId,
        item_size: usize,
    ) {
        let changed = self.vertex_buffers.get(attribute) != Some(&buffer);
        if changed {
            self.vertex_buffers.insert(attribute.to_string(), buffer);
        }
        if self.count(changed) {
            device.bind_vertex_buffer(attribute, buffer, item_size);
        }
    }

    /// Bind the index buffer
    pub fn bind_index_buffer<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, buffer: BufferId) {
        let changed = diff(&mut self.index_buffer, buffer);
        if self.count(changed) {
            device.bind_index_buffer(buffer);
        }
    }

    /// Drop a deleted buffer from every binding
    pub fn forget_buffer(&mut self, buffer: BufferId) {
        self.vertex_buffers.retain(|_, bound| *bound != buffer);
        if self.index_buffer == Some(buffer) {
            self.index_buffer = None;
        }
    }

    /// Select the render target (`None` is the default framebuffer)
    pub fn set_render_target<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, target: Option<RenderTargetId>) {
        let changed = diff(&mut self.render_target, target);
        if self.count(changed) {
            device.set_render_target(target);
        }
    }

    /// State-change calls forwarded to the device
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// State-change calls elided
    pub fn elided(&self) -> u64 {
        self.elided
    }
}
