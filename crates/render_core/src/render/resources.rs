//! Resource registry
//!
//! Geometries and materials are shared: any number of render objects can
//! reference the same handle. The registry owns them; render objects and
//! renderer caches only hold keys.

use crate::foundation::collections::{GeometryId, MaterialId, SlotMap};

use super::geometry::Geometry;
use super::material::Material;

/// Storage for shared geometry and material resources
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    geometries: SlotMap<GeometryId, Geometry>,
    materials: SlotMap<MaterialId, Material>,
}

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a geometry
    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        let id = self.geometries.insert(geometry);
        log::debug!("Registered geometry {:?}", id);
        id
    }

    /// Register a material
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let name = material.name.clone();
        let id = self.materials.insert(material);
        log::debug!("Registered material {:?} '{}'", id, name);
        id
    }

    /// Get a geometry
    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id)
    }

    /// Get a geometry for editing
    pub fn geometry_mut(&mut self, id: GeometryId) -> Option<&mut Geometry> {
        self.geometries.get_mut(id)
    }

    /// Get a material
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Get a material for editing
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    /// Remove a geometry; GPU buffers are released by the renderer
    pub fn remove_geometry(&mut self, id: GeometryId) -> Option<Geometry> {
        self.geometries.remove(id)
    }

    /// Remove a material; program references are released by the renderer
    pub fn remove_material(&mut self, id: MaterialId) -> Option<Material> {
        self.materials.remove(id)
    }

    /// Whether a material handle is live
    pub fn contains_material(&self, id: MaterialId) -> bool {
        self.materials.contains_key(id)
    }

    /// Whether a geometry handle is live
    pub fn contains_geometry(&self, id: GeometryId) -> bool {
        self.geometries.contains_key(id)
    }

    /// Number of registered materials
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Number of registered geometries
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }
}
