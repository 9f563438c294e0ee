//! Program cache
//!
//! Maps a [`ProgramKey`] to one compiled device program, shared by every
//! material/object pair whose parameters project onto that key.
//!
//! ## Lifecycle
//!
//! ```text
//! acquire(key) ── miss ──► build_source ─► compile ─► insert (used_times = 1)
//!      │                                      │
//!      └── hit ──► used_times += 1            └── failure ─► remembered, logged once
//!
//! release(id) ──► used_times -= 1 ──► 0 ? delete device program, drop entry
//! ```
//!
//! Compile failures are remembered by key so that a broken material is not
//! recompiled (and re-logged) every frame. [`ProgramCache::clear_failures`]
//! forgets them, e.g. after custom shader sources were edited.

use std::collections::HashMap;

use crate::foundation::collections::{ProgramId, SlotMap};
use crate::foundation::logging::{debug, error};
use crate::render::device::{DeviceProgram, GraphicsDevice, ShaderSource};
use crate::render::error::{RenderError, RenderResult};

use super::parameters::{ProgramKey, ProgramParameters};
use super::source::build_source;

/// One compiled program and its bookkeeping
#[derive(Debug)]
pub struct Program {
    key: ProgramKey,
    handle: DeviceProgram,
    used_times: usize,
    parameters: ProgramParameters,
    required_attributes: Vec<String>,
    source: ShaderSource,
}

impl Program {
    /// Cache key
    pub fn key(&self) -> &ProgramKey {
        &self.key
    }

    /// Device handle
    pub fn handle(&self) -> DeviceProgram {
        self.handle
    }

    /// Number of live acquisitions
    pub fn used_times(&self) -> usize {
        self.used_times
    }

    /// Parameters the program was built from
    pub fn parameters(&self) -> &ProgramParameters {
        &self.parameters
    }

    /// Vertex attributes the program reads
    pub fn required_attributes(&self) -> &[String] {
        &self.required_attributes
    }

    /// Whether the program reads the light block
    pub fn uses_lights(&self) -> bool {
        self.parameters.uses_lights()
    }

    /// Generated source
    pub fn source(&self) -> &ShaderSource {
        &self.source
    }
}

/// Reference-counted cache of compiled programs
#[derive(Debug)]
pub struct ProgramCache {
    programs: SlotMap<ProgramId, Program>,
    by_key: HashMap<ProgramKey, ProgramId>,
    failures: HashMap<ProgramKey, RenderError>,
    max_programs: usize,
    compiled: u64,
    deleted: u64,
}

impl ProgramCache {
    /// Create an empty cache holding at most `max_programs` programs
    pub fn new(max_programs: usize) -> Self {
        Self {
            programs: SlotMap::with_key(),
            by_key: HashMap::new(),
            failures: HashMap::new(),
            max_programs,
            compiled: 0,
            deleted: 0,
        }
    }

    /// Get or compile the program for `params`, taking one reference
    ///
    /// # Errors
    /// `ShaderCompile` if the device rejects the generated source (also for
    /// later requests of the same key), `ResourceExhausted` when a new
    /// program would exceed the capacity.
    pub fn acquire<D: GraphicsDevice + ?Sized>(
        &mut self,
        params: &ProgramParameters,
        device: &mut D,
    ) -> RenderResult<ProgramId> {
        let key = params.cache_key();

        if let Some(&id) = self.by_key.get(&key) {
            if let Some(program) = self.programs.get_mut(id) {
                program.used_times += 1;
                return Ok(id);
            }
        }

        if let Some(failure) = self.failures.get(&key) {
            return Err(failure.clone());
        }

        if self.programs.len() >= self.max_programs {
            return Err(RenderError::ResourceExhausted {
                resource: "programs",
                limit: self.max_programs,
            });
        }

        let source = build_source(params);
        let handle = match device.compile_program(&source) {
            Ok(handle) => handle,
            Err(failure) => {
                error!(
                    "Failed to compile program '{}' ({:?}): {}",
                    source.name, failure.stage, failure.diagnostic
                );
                let err = RenderError::ShaderCompile {
                    key: key.to_string(),
                    stage: failure.stage,
                    shader: Box::new(source),
                    diagnostic: failure.diagnostic,
                };
                self.failures.insert(key, err.clone());
                return Err(err);
            }
        };

        self.compiled += 1;
        debug!("Compiled program {:?} for key {}", handle, key);

        let id = self.programs.insert(Program {
            key: key.clone(),
            handle,
            used_times: 1,
            parameters: params.clone(),
            required_attributes: params.required_attributes(),
            source,
        });
        self.by_key.insert(key, id);
        Ok(id)
    }

    /// Drop one reference; frees the program when none remain
    ///
    /// Returns `true` when the program was destroyed.
    pub fn release<D: GraphicsDevice + ?Sized>(&mut self, id: ProgramId, device: &mut D) -> bool {
        let Some(program) = self.programs.get_mut(id) else {
            return false;
        };

        program.used_times = program.used_times.saturating_sub(1);
        if program.used_times > 0 {
            return false;
        }

        if let Some(program) = self.programs.remove(id) {
            self.by_key.remove(&program.key);
            device.delete_program(program.handle);
            self.deleted += 1;
            debug!("Deleted program {:?} ({})", program.handle, program.key);
        }
        true
    }

    /// Look up a live program
    pub fn get(&self, id: ProgramId) -> Option<&Program> {
        self.programs.get(id)
    }

    /// Find the live program for a key
    pub fn find(&self, key: &ProgramKey) -> Option<ProgramId> {
        self.by_key.get(key).copied()
    }

    /// Reference count of a live program (0 if gone)
    pub fn usage(&self, id: ProgramId) -> usize {
        self.programs.get(id).map_or(0, Program::used_times)
    }

    /// Live program count
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether no program is live
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Capacity
    pub fn max_programs(&self) -> usize {
        self.max_programs
    }

    /// Programs compiled since creation
    pub fn compiled_count(&self) -> u64 {
        self.compiled
    }

    /// Programs deleted since creation
    pub fn deleted_count(&self) -> u64 {
        self.deleted
    }

    /// Whether `key` is remembered as failing
    pub fn has_failed(&self, key: &ProgramKey) -> bool {
        self.failures.contains_key(key)
    }

    /// Forget remembered compile failures so they are retried
    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// Iterate live programs
    pub fn iter(&self) -> impl Iterator<Item = (ProgramId, &Program)> {
        self.programs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use crate::foundation::math::Vec3;
    use crate::render::device::TextureId;
    use crate::render::geometry::Geometry;
    use crate::render::lighting::LightCounts;
    use crate::render::material::{MapSlot, Material};
    use crate::render::program::parameters::{ObjectProgramFlags, ProgramEnvironment};
    use crate::render::recording::RecordingDevice;

    fn params(material: &Material) -> ProgramParameters {
        let env = ProgramEnvironment::new(&RendererConfig::default(), LightCounts::default(), false, 0);
        ProgramParameters::new(material, &Geometry::plane(1.0, 1.0), ObjectProgramFlags::default(), &env)
    }

    #[test]
    fn test_identical_projection_shares_entry() {
        let mut device = RecordingDevice::new();
        let mut cache = ProgramCache::new(8);

        let a = Material::basic(Vec3::new(1.0, 0.0, 0.0));
        let b = Material::basic(Vec3::new(0.0, 1.0, 0.0));

        let first = cache.acquire(&params(&a), &mut device).unwrap();
        let second = cache.acquire(&params(&b), &mut device).unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.usage(first), 2);
        assert_eq!(device.compile_count(), 1);
    }

    #[test]
    fn test_refcount_is_exact() {
        let mut device = RecordingDevice::new();
        let mut cache = ProgramCache::new(8);
        let material = Material::basic(Vec3::new(1.0, 1.0, 1.0));
        let p = params(&material);

        let n = 4;
        let ids: Vec<ProgramId> = (0..n).map(|_| cache.acquire(&p, &mut device).unwrap()).collect();
        for id in &ids[..n - 1] {
            assert!(!cache.release(*id, &mut device));
        }
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.usage(ids[0]), 1);
        assert_eq!(device.live_program_count(), 1);

        assert!(cache.release(ids[0], &mut device));
        assert!(cache.is_empty());
        assert_eq!(cache.find(&p.cache_key()), None);
        assert_eq!(device.live_program_count(), 0);
    }

    #[test]
    fn test_compile_failure_is_remembered() {
        let mut device = RecordingDevice::new().with_failing_define("USE_MAP");
        let mut cache = ProgramCache::new(8);
        let material = Material::basic(Vec3::new(1.0, 1.0, 1.0)).with_map(MapSlot::Map, TextureId(1));
        let p = params(&material);

        let err = cache.acquire(&p, &mut device).unwrap_err();
        match &err {
            RenderError::ShaderCompile { shader, diagnostic, .. } => {
                assert!(shader.fragment.contains("#define USE_MAP"));
                assert!(diagnostic.contains("USE_MAP"));
            }
            other => panic!("unexpected error {other:?}"),
        }

        assert_eq!(cache.acquire(&p, &mut device).unwrap_err(), err);
        assert_eq!(device.compile_count(), 1);
        assert!(cache.has_failed(&p.cache_key()));

        cache.clear_failures();
        assert!(cache.acquire(&p, &mut device).is_err());
        assert_eq!(device.compile_count(), 2);
    }

    #[test]
    fn test_capacity_refuses_new_programs_only() {
        let mut device = RecordingDevice::new();
        let mut cache = ProgramCache::new(1);

        let basic = params(&Material::basic(Vec3::new(1.0, 1.0, 1.0)));
        let mapped = params(&Material::basic(Vec3::new(1.0, 1.0, 1.0)).with_map(MapSlot::Map, TextureId(2)));

        let id = cache.acquire(&basic, &mut device).unwrap();
        assert_eq!(
            cache.acquire(&mapped, &mut device),
            Err(RenderError::ResourceExhausted { resource: "programs", limit: 1 })
        );
        assert_eq!(cache.acquire(&basic, &mut device), Ok(id));
        assert_eq!(cache.usage(id), 2);
    }
}
