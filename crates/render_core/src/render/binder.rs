//! State and uniform binder
//!
//! Turns one [`RenderListEntry`] into device calls. Per entry it:
//!
//! 1. resolves the program for the (node, material) pair, re-deriving the
//!    key only when the material's `program_version`, the geometry version
//!    or the program environment moved,
//! 2. binds the program if it is not already current,
//! 3. uploads per-object uniforms (always), camera uniforms (once per
//!    program per frame), material uniforms (on change or first use this
//!    frame) and light uniforms (when the light state version moved),
//! 4. diffs pipeline state and buffer bindings through [`GpuState`].
//!
//! Failures are per draw: the caller skips the entry and moves on.

use std::collections::{HashMap, HashSet};

use bytemuck::{Pod, Zeroable};

use crate::foundation::collections::{GeometryId, MaterialId, NodeId, ProgramId, SecondaryMap};
use crate::foundation::logging::{debug, warn};
use crate::foundation::math::{normal_matrix, Mat4};
use crate::render::device::{BufferId, BufferKind, CullFace, DrawCall, FrontFace, GraphicsDevice, TextureId, UniformBlock};
use crate::render::error::{RenderError, RenderResult};
use crate::render::geometry::Geometry;
use crate::render::lighting::LightState;
use crate::render::material::{Material, Side};
use crate::render::program::{ObjectProgramFlags, ProgramCache, ProgramEnvironment, ProgramKey, ProgramParameters};
use crate::render::resources::ResourceRegistry;
use crate::render::state::GpuState;
use crate::render::stats::FrameStats;
use crate::scene::{RenderListEntry, SceneGraph};

/// Per-object uniform block
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    /// Object to world
    pub model: [[f32; 4]; 4],
    /// Object to view
    pub model_view: [[f32; 4]; 4],
    /// View-space normal matrix, one padded column per row
    pub normal: [[f32; 4]; 3],
}

impl ObjectUniforms {
    /// Uniforms for an object seen through `view`
    pub fn new(model: &Mat4, view: &Mat4) -> Self {
        let model_view = view * model;
        let n = normal_matrix(&model_view);
        let column = |c: usize| [n[(0, c)], n[(1, c)], n[(2, c)], 0.0];
        Self {
            model: (*model).into(),
            model_view: model_view.into(),
            normal: [column(0), column(1), column(2)],
        }
    }
}

/// Frame-wide inputs to [`StateBinder::prepare`]
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    /// Frame number
    pub frame: u64,
    /// World to view
    pub view: &'a Mat4,
    /// Aggregated lights
    pub lights: &'a LightState,
    /// Program selection inputs
    pub environment: &'a ProgramEnvironment,
    /// Bumped whenever `environment` changes
    pub environment_version: u64,
    /// Packed camera block
    pub camera_uniforms: &'a [u8],
    /// Transmission pre-pass color, when available
    pub transmission_texture: Option<TextureId>,
    /// Sampler units available to one draw
    pub texture_units: u32,
}

/// Outcome of preparing one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prepared {
    /// State is bound; issue this draw
    Draw(DrawCall),
    /// Program is still compiling; retry next frame
    Deferred,
}

#[derive(Debug, Default)]
struct ProgramBinding {
    key: Option<ProgramKey>,
    program: Option<ProgramId>,
    failure: Option<RenderError>,
    program_version: Option<u64>,
    geometry: Option<(GeometryId, u64)>,
    flags: Option<ObjectProgramFlags>,
    environment_version: Option<u64>,
}

impl ProgramBinding {
    fn is_current(
        &self,
        material: &Material,
        geometry: (GeometryId, &Geometry),
        flags: ObjectProgramFlags,
        environment_version: u64,
    ) -> bool {
        self.program_version == Some(material.program_version())
            && self.geometry == Some((geometry.0, geometry.1.version()))
            && self.flags == Some(flags)
            && self.environment_version == Some(environment_version)
    }

    fn outcome(&self) -> RenderResult<ProgramId> {
        match (&self.failure, self.program) {
            (Some(failure), _) => Err(failure.clone()),
            (None, Some(id)) => Ok(id),
            (None, None) => Err(RenderError::ResourceExhausted { resource: "programs", limit: 0 }),
        }
    }
}

#[derive(Debug, Default)]
struct ProgramUploads {
    frame: Option<u64>,
    material: Option<(MaterialId, u64)>,
    lights_version: Option<u64>,
}

#[derive(Debug)]
struct GeometryBuffers {
    version: u64,
    vertex: HashMap<String, (BufferId, usize)>,
    index: Option<BufferId>,
}

/// Binds programs, uniforms, pipeline state and buffers for draws
#[derive(Debug, Default)]
pub struct StateBinder {
    state: GpuState,
    bindings: HashMap<(NodeId, MaterialId), ProgramBinding>,
    uploads: SecondaryMap<ProgramId, ProgramUploads>,
    buffers: HashMap<GeometryId, GeometryBuffers>,
    warned_not_ready: HashSet<ProgramId>,
    warned_attributes: HashSet<(ProgramId, GeometryId)>,
}

impl StateBinder {
    /// Create a binder with an empty state mirror
    pub fn new() -> Self {
        Self::default()
    }

    /// GPU state mirror
    pub fn state(&self) -> &GpuState {
        &self.state
    }

    /// Mutable GPU state mirror
    pub fn state_mut(&mut self) -> &mut GpuState {
        &mut self.state
    }

    /// Program currently held for a (node, material) pair
    pub fn program_for(&self, node: NodeId, material: MaterialId) -> Option<ProgramId> {
        self.bindings.get(&(node, material)).and_then(|b| b.program)
    }

    /// Number of (node, material) program bindings
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Bind everything `entry` needs and return its draw call
    ///
    /// # Errors
    /// Stale handles, shader compile failures, missing attributes and
    /// exhausted budgets. None of them leave the mirror inconsistent.
    pub fn prepare<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        programs: &mut ProgramCache,
        resources: &ResourceRegistry,
        entry: &RenderListEntry,
        ctx: &FrameContext<'_>,
        stats: &mut FrameStats,
    ) -> RenderResult<Prepared> {
        let material = resources
            .material(entry.material)
            .ok_or(RenderError::MaterialNotFound(entry.material))?;
        let geometry = resources
            .geometry(entry.geometry)
            .ok_or(RenderError::GeometryNotFound(entry.geometry))?;

        let id = self.resolve_program(device, programs, entry, material, geometry, ctx)?;
        let program = programs.get(id).ok_or(RenderError::ProgramNotFound(id))?;
        let handle = program.handle();

        if !device.is_program_ready(handle) {
            if self.warned_not_ready.insert(id) {
                debug!("Program {} still compiling, deferring draws", program.key());
            }
            return Ok(Prepared::Deferred);
        }
        self.warned_not_ready.remove(&id);

        if let Some(missing) = program
            .required_attributes()
            .iter()
            .find(|name| !geometry.has_attribute(name))
        {
            if self.warned_attributes.insert((id, entry.geometry)) {
                warn!(
                    "Geometry '{}' lacks attribute '{}' required by program {}",
                    geometry.name,
                    missing,
                    program.key()
                );
            }
            return Err(RenderError::MissingAttribute {
                program: program.key().to_string(),
                attribute: missing.clone(),
            });
        }

        let transmission = program.parameters().uses_transmission().then_some(ctx.transmission_texture).flatten();
        let texture_count = material.maps().count() + usize::from(transmission.is_some());
        if texture_count > ctx.texture_units as usize {
            return Err(RenderError::ResourceExhausted {
                resource: "texture units",
                limit: ctx.texture_units as usize,
            });
        }

        if self.state.use_program(device, handle) {
            stats.program_switches += 1;
        }

        // Object block never carries over between draws
        let object = ObjectUniforms::new(&entry.world_matrix, ctx.view);
        device.upload_uniforms(UniformBlock::Object, bytemuck::bytes_of(&object));
        stats.uploads.object += 1;

        let uploads = self
            .uploads
            .entry(id)
            .ok_or(RenderError::ProgramNotFound(id))?
            .or_default();

        let first_use = uploads.frame != Some(ctx.frame);
        if first_use {
            uploads.frame = Some(ctx.frame);
            device.upload_uniforms(UniformBlock::Camera, ctx.camera_uniforms);
            stats.uploads.camera += 1;
        }

        let material_stamp = (entry.material, material.version());
        if first_use || uploads.material != Some(material_stamp) {
            uploads.material = Some(material_stamp);
            device.upload_uniforms(UniformBlock::Material, bytemuck::bytes_of(&material.uniforms()));
            stats.uploads.material += 1;
        }

        if program.uses_lights() && uploads.lights_version != Some(ctx.lights.version()) {
            uploads.lights_version = Some(ctx.lights.version());
            device.upload_uniforms(UniformBlock::Lights, ctx.lights.as_bytes());
            stats.uploads.lights += 1;
        }

        let mut unit = 0;
        for (_, texture) in material.maps() {
            self.state.bind_texture(device, unit, texture);
            unit += 1;
        }
        if let Some(texture) = transmission {
            self.state.bind_texture(device, unit, texture);
        }

        self.apply_pipeline_state(device, material, &entry.world_matrix);

        self.bind_buffers(device, entry.geometry, geometry, program.required_attributes(), stats);

        let total = u32::try_from(geometry.draw_count()).unwrap_or(u32::MAX);
        let (start, count) = match entry.group {
            Some(group) => {
                let start = group.start.min(total);
                (start, group.count.min(total - start))
            }
            None => (0, total),
        };

        Ok(Prepared::Draw(DrawCall {
            start,
            count,
            indexed: geometry.index().is_some(),
            instances: entry.instance_count,
        }))
    }

    fn resolve_program<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        programs: &mut ProgramCache,
        entry: &RenderListEntry,
        material: &Material,
        geometry: &Geometry,
        ctx: &FrameContext<'_>,
    ) -> RenderResult<ProgramId> {
        let flags = ObjectProgramFlags {
            skinned: entry.skinned,
            instanced: entry.instance_count > 1,
        };
        let binding = self.bindings.entry((entry.node, entry.material)).or_default();
        if binding.is_current(material, (entry.geometry, geometry), flags, ctx.environment_version) {
            return binding.outcome();
        }

        let params = ProgramParameters::new(material, geometry, flags, ctx.environment);
        let key = params.cache_key();

        binding.program_version = Some(material.program_version());
        binding.geometry = Some((entry.geometry, geometry.version()));
        binding.flags = Some(flags);
        binding.environment_version = Some(ctx.environment_version);

        if binding.key.as_ref() == Some(&key) && (binding.program.is_some() || binding.failure.is_some()) {
            return binding.outcome();
        }

        let mut previous = binding.program.take();
        binding.key = Some(key);
        binding.failure = None;

        let mut result = programs.acquire(&params, device);
        if matches!(result, Err(RenderError::ResourceExhausted { .. })) {
            if let Some(old) = previous.take() {
                // Our own reference may be the one holding the last slot
                release_program(&mut self.state, &mut self.uploads, programs, device, old);
                result = programs.acquire(&params, device);
            }
        }
        if let Some(old) = previous {
            release_program(&mut self.state, &mut self.uploads, programs, device, old);
        }

        match result {
            Ok(id) => {
                binding.program = Some(id);
                Ok(id)
            }
            Err(err) => {
                if matches!(err, RenderError::ShaderCompile { .. }) {
                    binding.failure = Some(err.clone());
                } else {
                    // Budget errors are retried on the next frame
                    binding.key = None;
                    binding.program_version = None;
                }
                Err(err)
            }
        }
    }

    fn apply_pipeline_state<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, material: &Material, world: &Mat4) {
        let state = &mut self.state;
        state.set_blending(device, material.effective_blending());
        state.set_depth_test(device, material.depth_test());
        state.set_depth_write(device, material.depth_write());
        state.set_depth_func(device, material.depth_func());
        state.set_stencil(device, material.stencil());
        state.set_color_write(device, material.color_write());

        let cull = match material.side() {
            Side::Front => CullFace::Back,
            Side::Back => CullFace::Front,
            Side::Double => CullFace::None,
        };
        state.set_cull_face(device, cull);

        let mirrored = world.fixed_view::<3, 3>(0, 0).determinant() < 0.0;
        let front = if mirrored { FrontFace::Clockwise } else { FrontFace::CounterClockwise };
        state.set_front_face(device, front);
    }

    fn bind_buffers<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        id: GeometryId,
        geometry: &Geometry,
        required: &[String],
        stats: &mut FrameStats,
    ) {
        let stale = self.buffers.get(&id).map_or(true, |b| b.version != geometry.version());
        if stale {
            if let Some(old) = self.buffers.remove(&id) {
                delete_buffers(&mut self.state, device, old);
            }

            let mut vertex = HashMap::new();
            for (name, attribute) in geometry.attributes() {
                let buffer = device.create_buffer(BufferKind::Vertex, attribute.as_bytes());
                vertex.insert(name.to_string(), (buffer, attribute.item_size()));
                stats.buffer_uploads += 1;
            }
            let index = geometry.index_bytes().map(|bytes| {
                stats.buffer_uploads += 1;
                device.create_buffer(BufferKind::Index, bytes)
            });
            self.buffers.insert(id, GeometryBuffers { version: geometry.version(), vertex, index });
        }

        let Some(buffers) = self.buffers.get(&id) else {
            return;
        };
        for name in required {
            if let Some(&(buffer, item_size)) = buffers.vertex.get(name) {
                self.state.bind_vertex_buffer(device, name, buffer, item_size);
            }
        }
        if let Some(index) = buffers.index {
            self.state.bind_index_buffer(device, index);
        }
    }

    /// Release every program reference held for `node`
    pub fn release_node<D: GraphicsDevice + ?Sized>(&mut self, node: NodeId, programs: &mut ProgramCache, device: &mut D) {
        self.release_where(programs, device, |(n, _)| *n == node);
    }

    /// Release every program reference held for `material`
    pub fn release_material<D: GraphicsDevice + ?Sized>(
        &mut self,
        material: MaterialId,
        programs: &mut ProgramCache,
        device: &mut D,
    ) {
        self.release_where(programs, device, |(_, m)| *m == material);
    }

    /// Delete the device buffers of `geometry`
    pub fn release_geometry<D: GraphicsDevice + ?Sized>(&mut self, geometry: GeometryId, device: &mut D) {
        if let Some(buffers) = self.buffers.remove(&geometry) {
            delete_buffers(&mut self.state, device, buffers);
        }
    }

    /// Release bindings and buffers whose node, material or geometry is gone
    ///
    /// A binding is also stale once its node no longer draws with its
    /// material. Returns the number of program references released.
    pub fn release_stale<D: GraphicsDevice + ?Sized>(
        &mut self,
        graph: &SceneGraph,
        resources: &ResourceRegistry,
        programs: &mut ProgramCache,
        device: &mut D,
    ) -> usize {
        let released = self.release_where(programs, device, |(node, material)| {
            let drawn = graph
                .node(*node)
                .and_then(|n| n.render_object())
                .is_some_and(|object| object.materials.contains(material));
            !drawn || !resources.contains_material(*material)
        });

        let gone: Vec<GeometryId> = self
            .buffers
            .keys()
            .copied()
            .filter(|id| !resources.contains_geometry(*id))
            .collect();
        for id in gone {
            self.release_geometry(id, device);
        }
        released
    }

    fn release_where<D: GraphicsDevice + ?Sized>(
        &mut self,
        programs: &mut ProgramCache,
        device: &mut D,
        predicate: impl Fn(&(NodeId, MaterialId)) -> bool,
    ) -> usize {
        let keys: Vec<(NodeId, MaterialId)> = self.bindings.keys().copied().filter(|k| predicate(k)).collect();
        let mut released = 0;
        for key in keys {
            if let Some(binding) = self.bindings.remove(&key) {
                if let Some(id) = binding.program {
                    release_program(&mut self.state, &mut self.uploads, programs, device, id);
                    released += 1;
                }
            }
        }
        released
    }
}

fn release_program<D: GraphicsDevice + ?Sized>(
    state: &mut GpuState,
    uploads: &mut SecondaryMap<ProgramId, ProgramUploads>,
    programs: &mut ProgramCache,
    device: &mut D,
    id: ProgramId,
) {
    let handle = programs.get(id).map(|p| p.handle());
    if programs.release(id, device) {
        uploads.remove(id);
        if let Some(handle) = handle {
            state.forget_program(handle);
        }
    }
}

fn delete_buffers<D: GraphicsDevice + ?Sized>(state: &mut GpuState, device: &mut D, buffers: GeometryBuffers) {
    for (buffer, _) in buffers.vertex.into_values() {
        state.forget_buffer(buffer);
        device.delete_buffer(buffer);
    }
    if let Some(index) = buffers.index {
        state.forget_buffer(index);
        device.delete_buffer(index);
    }
}
