//! Frame renderer
//!
//! Top-level orchestration of one frame.
//!
//! ## Frame phases
//!
//! ```text
//! Begin → UpdateTransforms → BuildLightState → BuildRenderLists → Sort
//!       → DrawBucket(Opaque) → DrawBucket(Transmissive) → DrawBucket(Transparent)
//!       → End
//! ```
//!
//! The transmissive bucket first renders the opaque and transparent lists
//! into an off-screen target and binds its color texture as input. That
//! pre-pass never includes transmissive objects, so transmissive surfaces
//! do not see each other.
//!
//! Only transform errors abort a frame. Anything that goes wrong for a
//! single draw is counted in [`FrameStats`] and the draw is skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::config::{ConfigError, RendererConfig};
use crate::foundation::collections::{GeometryId, MaterialId, NodeId};
use crate::foundation::logging::{debug, trace};
use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::binder::{FrameContext, Prepared, StateBinder};
use crate::render::camera::Camera;
use crate::render::device::{GraphicsDevice, RenderTargetId, TextureId};
use crate::render::error::{RenderError, RenderResult};
use crate::render::geometry::Geometry;
use crate::render::lighting::LightState;
use crate::render::material::Material;
use crate::render::program::{ProgramCache, ProgramEnvironment};
use crate::render::resources::ResourceRegistry;
use crate::render::state::GpuState;
use crate::render::stats::FrameStats;
use crate::scene::{Plane, RenderBucket, RenderListEntry, RenderLists, SceneGraph, SortFn};

/// Cancels the remainder of a frame
///
/// Clones share one flag. The renderer checks it between buckets; the
/// frame that observes it stops drawing and clears it.
#[derive(Debug, Clone, Default)]
pub struct FrameCancel(Arc<AtomicBool>);

impl FrameCancel {
    /// Create an unset handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the request
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Where the renderer is in the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// Between frames
    Idle,
    /// Frame started
    Begin,
    /// Refreshing world matrices
    UpdateTransforms,
    /// Collecting lights
    BuildLightState,
    /// Culling and bucketing
    BuildRenderLists,
    /// Sorting buckets
    Sort,
    /// Drawing one bucket
    DrawBucket(RenderBucket),
    /// Restoring state and releasing stale bindings
    End,
}

/// Linear distance fog
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    /// Fog color
    pub color: Vec3,
    /// Distance where fog starts
    pub near: f32,
    /// Distance where fog is opaque
    pub far: f32,
}

impl Fog {
    /// Create linear fog
    pub fn new(color: Vec3, near: f32, far: f32) -> Self {
        Self { color, near, far }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CameraUniforms {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    position: [f32; 4],
    fog_color: [f32; 4],
    fog_range: [f32; 4],
}

/// Renders a scene graph through a [`GraphicsDevice`]
pub struct FrameRenderer<D: GraphicsDevice> {
    device: D,
    config: RendererConfig,
    programs: ProgramCache,
    binder: StateBinder,
    lists: RenderLists,
    lights: LightState,
    environment: ProgramEnvironment,
    environment_version: u64,
    fog: Option<Fog>,
    clipping_planes: Vec<Plane>,
    opaque_sort: Option<Box<SortFn>>,
    transparent_sort: Option<Box<SortFn>>,
    transmission_target: Option<RenderTargetId>,
    camera_block: Vec<u8>,
    cancel: FrameCancel,
    phase: FramePhase,
    frame: u64,
    last_stats: FrameStats,
}

impl<D: GraphicsDevice> FrameRenderer<D> {
    /// Create a renderer for `device`
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the configuration fails validation.
    pub fn new(device: D, config: RendererConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        debug!(
            "Creating frame renderer: {} programs max, {} texture units",
            config.max_programs, config.max_texture_units
        );

        Ok(Self {
            device,
            programs: ProgramCache::new(config.max_programs),
            binder: StateBinder::new(),
            lists: RenderLists::new(),
            lights: LightState::new(),
            environment: ProgramEnvironment::new(&config, Default::default(), false, 0),
            environment_version: 0,
            fog: None,
            clipping_planes: Vec::new(),
            opaque_sort: None,
            transparent_sort: None,
            transmission_target: None,
            camera_block: Vec::new(),
            cancel: FrameCancel::new(),
            phase: FramePhase::Idle,
            frame: 0,
            last_stats: FrameStats::default(),
            config,
        })
    }

    /// Graphics device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable graphics device
    ///
    /// Calls made directly on the device bypass the state mirror; call
    /// [`GpuState::reset`] through [`Self::reset_state`] afterwards.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Program cache
    pub fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    /// GPU state mirror
    pub fn gpu_state(&self) -> &GpuState {
        self.binder.state()
    }

    /// Forget mirrored GPU state so the next frame re-establishes it
    pub fn reset_state(&mut self) {
        self.binder.state_mut().reset();
    }

    /// State binder
    pub fn binder(&self) -> &StateBinder {
        &self.binder
    }

    /// Handle for cancelling the current or next frame
    pub fn cancel_handle(&self) -> FrameCancel {
        self.cancel.clone()
    }

    /// Current phase
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Lists built by the last frame
    pub fn render_lists(&self) -> &RenderLists {
        &self.lists
    }

    /// Lights collected by the last frame
    pub fn light_state(&self) -> &LightState {
        &self.lights
    }

    /// Statistics of the last frame
    pub fn last_stats(&self) -> &FrameStats {
        &self.last_stats
    }

    /// Enable or disable scene fog
    pub fn set_fog(&mut self, fog: Option<Fog>) {
        self.fog = fog;
    }

    /// Set world-space clipping planes
    pub fn set_clipping_planes(&mut self, planes: Vec<Plane>) {
        self.clipping_planes = planes;
    }

    /// Comparator for opaque entries with equal group and render order
    pub fn set_opaque_sort(&mut self, sort: Option<Box<SortFn>>) {
        self.opaque_sort = sort;
    }

    /// Comparator for blended entries with equal group and render order
    pub fn set_transparent_sort(&mut self, sort: Option<Box<SortFn>>) {
        self.transparent_sort = sort;
    }

    /// Render the subtree at `root` as seen by `camera`
    ///
    /// # Errors
    /// Only scene errors from the transform update (e.g. a stale `root`).
    /// Per-object failures are reported through the returned stats.
    pub fn render_frame(
        &mut self,
        graph: &mut SceneGraph,
        root: NodeId,
        resources: &ResourceRegistry,
        camera: &Camera,
    ) -> RenderResult<FrameStats> {
        self.frame += 1;
        let mut stats = FrameStats { frame: self.frame, ..FrameStats::default() };
        let issued_before = self.binder.state().issued();
        let elided_before = self.binder.state().elided();

        self.phase = FramePhase::Begin;
        trace!("Begin frame {}", self.frame);
        self.binder.state_mut().set_render_target(&mut self.device, None);
        self.device.clear();

        self.phase = FramePhase::UpdateTransforms;
        stats.transforms_updated = match graph.update_world_transforms(root) {
            Ok(rebuilt) => rebuilt,
            Err(err) => {
                self.phase = FramePhase::Idle;
                return Err(RenderError::from(err));
            }
        };

        self.phase = FramePhase::BuildLightState;
        self.collect_lights(graph, root);

        self.phase = FramePhase::BuildRenderLists;
        let view = camera.view_matrix();
        let frustum = self.config.frustum_culling.then(|| camera.frustum());
        let built = self.lists.build(graph, root, resources, &view, frustum.as_ref());
        stats.culled = built.culled;
        stats.skipped_missing_resource += built.skipped;
        stats.opaque = self.lists.opaque().len();
        stats.transmissive = self.lists.transmissive().len();
        stats.transparent = self.lists.transparent().len();

        self.phase = FramePhase::Sort;
        if self.config.sort_objects {
            self.lists.sort(self.opaque_sort.as_deref(), self.transparent_sort.as_deref());
        }

        self.pack_camera(camera, &view);
        let texture_units = self.config.max_texture_units.min(self.device.max_texture_units());

        for bucket in RenderBucket::ORDER {
            if self.cancel.is_cancelled() {
                debug!("Frame {} cancelled before {:?} bucket", self.frame, bucket);
                stats.cancelled = true;
                self.cancel.reset();
                break;
            }

            self.phase = FramePhase::DrawBucket(bucket);
            let entries = self.lists.bucket(bucket);
            if entries.is_empty() {
                continue;
            }

            let transmission_texture = if bucket == RenderBucket::Transmissive {
                Some(self.transmission_pass(resources, &view, texture_units, &mut stats))
            } else {
                None
            };

            let ctx = FrameContext {
                frame: self.frame,
                view: &view,
                lights: &self.lights,
                environment: &self.environment,
                environment_version: self.environment_version,
                camera_uniforms: &self.camera_block,
                transmission_texture,
                texture_units,
            };
            draw_entries(
                &mut self.device,
                &mut self.programs,
                &mut self.binder,
                resources,
                self.lists.bucket(bucket),
                &ctx,
                &mut stats,
            );
        }

        self.phase = FramePhase::End;
        self.binder.state_mut().set_render_target(&mut self.device, None);
        let released = self
            .binder
            .release_stale(graph, resources, &mut self.programs, &mut self.device);
        if released > 0 {
            debug!("Released {} program references for removed objects", released);
        }

        stats.state_changes = self.binder.state().issued() - issued_before;
        stats.state_changes_elided = self.binder.state().elided() - elided_before;
        self.phase = FramePhase::Idle;

        trace!(
            "Frame {} done: {} draws, {} skipped, {} program switches, {} programs live",
            stats.frame,
            stats.draws,
            stats.skipped(),
            stats.program_switches,
            self.programs.len()
        );
        self.last_stats = stats.clone();
        Ok(stats)
    }

    fn collect_lights(&mut self, graph: &SceneGraph, root: NodeId) {
        let lights = &mut self.lights;
        lights.begin();
        graph.for_each_visible(root, |_, node| {
            if let Some(light) = node.as_light() {
                lights.push(light, node.world_matrix());
            }
        });
        lights.finish();

        let clipping_planes = u32::try_from(self.clipping_planes.len()).unwrap_or(u32::MAX);
        let environment =
            ProgramEnvironment::new(&self.config, self.lights.counts(), self.fog.is_some(), clipping_planes);
        if environment != self.environment {
            debug!("Program environment changed: {:?}", environment.lights);
            self.environment = environment;
            self.environment_version += 1;
        }
    }

    fn pack_camera(&mut self, camera: &Camera, view: &Mat4) {
        let fog = self.fog.unwrap_or(Fog::new(Vec3::zeros(), 0.0, 0.0));
        let position = camera.position;
        let uniforms = CameraUniforms {
            view: (*view).into(),
            projection: camera.projection_matrix().into(),
            position: [position.x, position.y, position.z, 1.0],
            fog_color: [fog.color.x, fog.color.y, fog.color.z, 1.0],
            fog_range: [fog.near, fog.far, 0.0, 0.0],
        };

        self.camera_block.clear();
        self.camera_block.extend_from_slice(bytemuck::bytes_of(&uniforms));

        // Planes go to view space: p' = inverse(view)^T * p
        let to_view = view.try_inverse().map_or(*view, |inverse| inverse.transpose());
        for plane in &self.clipping_planes {
            let p = to_view * Vec4::new(plane.normal.x, plane.normal.y, plane.normal.z, plane.distance);
            self.camera_block.extend_from_slice(bytemuck::bytes_of(&[p.x, p.y, p.z, p.w]));
        }
    }

    fn transmission_pass(
        &mut self,
        resources: &ResourceRegistry,
        view: &Mat4,
        texture_units: u32,
        stats: &mut FrameStats,
    ) -> TextureId {
        let target = match self.transmission_target {
            Some(target) => target,
            None => {
                let (width, height) = self.config.transmission_target_size;
                let target = self.device.create_render_target(width, height);
                debug!("Created {}x{} transmission target {:?}", width, height, target);
                self.transmission_target = Some(target);
                target
            }
        };

        self.binder.state_mut().set_render_target(&mut self.device, Some(target));
        self.device.clear();

        let ctx = FrameContext {
            frame: self.frame,
            view,
            lights: &self.lights,
            environment: &self.environment,
            environment_version: self.environment_version,
            camera_uniforms: &self.camera_block,
            transmission_texture: None,
            texture_units,
        };
        for bucket in [RenderBucket::Opaque, RenderBucket::Transparent] {
            draw_entries(
                &mut self.device,
                &mut self.programs,
                &mut self.binder,
                resources,
                self.lists.bucket(bucket),
                &ctx,
                stats,
            );
        }

        self.binder.state_mut().set_render_target(&mut self.device, None);
        stats.transmission_pass = true;
        self.device.render_target_texture(target)
    }

    /// Release the program references held for a node
    ///
    /// Removing the node from the graph does the same at the end of the
    /// next frame; call this to release immediately.
    pub fn dispose_object(&mut self, node: NodeId) {
        self.binder.release_node(node, &mut self.programs, &mut self.device);
    }

    /// Remove a material and release every program reference held for it
    pub fn dispose_material(&mut self, resources: &mut ResourceRegistry, id: MaterialId) -> Option<Material> {
        self.binder.release_material(id, &mut self.programs, &mut self.device);
        resources.remove_material(id)
    }

    /// Remove a geometry and delete its device buffers
    pub fn dispose_geometry(&mut self, resources: &mut ResourceRegistry, id: GeometryId) -> Option<Geometry> {
        self.binder.release_geometry(id, &mut self.device);
        resources.remove_geometry(id)
    }
}

fn draw_entries<D: GraphicsDevice>(
    device: &mut D,
    programs: &mut ProgramCache,
    binder: &mut StateBinder,
    resources: &ResourceRegistry,
    entries: &[RenderListEntry],
    ctx: &FrameContext<'_>,
    stats: &mut FrameStats,
) {
    for entry in entries {
        match binder.prepare(device, programs, resources, entry, ctx, stats) {
            Ok(Prepared::Draw(call)) => {
                device.draw(call);
                stats.draws += 1;
            }
            Ok(Prepared::Deferred) => stats.skipped_not_ready += 1,
            Err(err) => {
                trace!("Skipping draw of {:?}: {}", entry.node, err);
                match err {
                    RenderError::ShaderCompile { .. } => stats.skipped_compile += 1,
                    RenderError::MissingAttribute { .. } => stats.skipped_missing_attribute += 1,
                    RenderError::ResourceExhausted { .. } => stats.skipped_resource += 1,
                    RenderError::MaterialNotFound(_)
                    | RenderError::GeometryNotFound(_)
                    | RenderError::ProgramNotFound(_)
                    | RenderError::Scene(_) => stats.skipped_missing_resource += 1,
                }
            }
        }
    }
}
