//! Drawable payload of a scene node

use crate::foundation::collections::{GeometryId, MaterialId};

/// Geometry and materials drawn for a mesh node
///
/// Resources are referenced by handle; the same geometry or material can be
/// shared by any number of render objects. With more than one material the
/// geometry's groups pick a material by `material_index`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderObject {
    /// Geometry to draw
    pub geometry: GeometryId,

    /// One material, or one per geometry group
    pub materials: Vec<MaterialId>,

    /// Test the world bounding sphere against the camera frustum
    pub frustum_culled: bool,

    /// Geometry is deformed by a skeleton
    pub skinned: bool,

    /// Number of instances per draw (1 for regular meshes)
    pub instance_count: u32,
}

impl RenderObject {
    /// Create a render object with a single material
    pub fn new(geometry: GeometryId, material: MaterialId) -> Self {
        Self {
            geometry,
            materials: vec![material],
            frustum_culled: true,
            skinned: false,
            instance_count: 1,
        }
    }

    /// Create a render object with one material per geometry group
    pub fn with_materials(geometry: GeometryId, materials: Vec<MaterialId>) -> Self {
        Self {
            geometry,
            materials,
            frustum_culled: true,
            skinned: false,
            instance_count: 1,
        }
    }

    /// Enable or disable frustum culling for this object
    pub fn with_frustum_culling(mut self, enabled: bool) -> Self {
        self.frustum_culled = enabled;
        self
    }

    /// Mark the object as skinned
    pub fn with_skinning(mut self, skinned: bool) -> Self {
        self.skinned = skinned;
        self
    }

    /// Draw `count` instances per call
    pub fn with_instances(mut self, count: u32) -> Self {
        self.instance_count = count.max(1);
        self
    }

    /// Whether groups select per-group materials
    pub fn is_multi_material(&self) -> bool {
        self.materials.len() > 1
    }

    /// Whether this object draws with instancing
    pub fn is_instanced(&self) -> bool {
        self.instance_count > 1
    }
}
