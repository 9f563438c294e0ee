//! Geometry resources
//!
//! CPU-side vertex data: named attributes, optional indices, draw groups for
//! multi-material meshes and morph targets. Bounds are computed on first use
//! and cached until the positions change. Any change bumps the version,
//! which tells the binder to re-upload GPU buffers.

use std::cell::OnceCell;
use std::collections::BTreeMap;

use crate::foundation::math::Vec3;
use crate::scene::{AABB, BoundingSphere};

/// Well-known attribute names
pub mod attributes {
    /// Vertex position (vec3)
    pub const POSITION: &str = "position";
    /// Vertex normal (vec3)
    pub const NORMAL: &str = "normal";
    /// Texture coordinate (vec2)
    pub const UV: &str = "uv";
    /// Vertex color (vec3 or vec4)
    pub const COLOR: &str = "color";
    /// Tangent with handedness (vec4)
    pub const TANGENT: &str = "tangent";
    /// Joint indices (vec4)
    pub const SKIN_INDEX: &str = "skin_index";
    /// Joint weights (vec4)
    pub const SKIN_WEIGHT: &str = "skin_weight";
    /// Per-instance model matrix (mat4)
    pub const INSTANCE_MATRIX: &str = "instance_matrix";

    /// Attribute name of the `index`-th morph target
    pub fn morph_target(index: usize) -> String {
        format!("morph_target{index}")
    }
}

/// Flat `f32` vertex attribute
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttribute {
    data: Vec<f32>,
    item_size: usize,
}

impl VertexAttribute {
    /// Create an attribute with `item_size` components per vertex
    pub fn new(data: Vec<f32>, item_size: usize) -> Self {
        Self { data, item_size: item_size.max(1) }
    }

    /// Attribute from 3-component vectors
    pub fn from_vec3(values: &[Vec3]) -> Self {
        Self::new(values.iter().flat_map(|v| [v.x, v.y, v.z]).collect(), 3)
    }

    /// Components per vertex
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Number of vertices
    pub fn count(&self) -> usize {
        self.data.len() / self.item_size
    }

    /// Raw component data
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Components of vertex `index`
    pub fn get(&self, index: usize) -> Option<&[f32]> {
        let start = index * self.item_size;
        self.data.get(start..start + self.item_size)
    }

    /// Vertex `index` read as a vec3 (missing components are zero)
    pub fn get_vec3(&self, index: usize) -> Option<Vec3> {
        let item = self.get(index)?;
        let c = |i: usize| item.get(i).copied().unwrap_or(0.0);
        Some(Vec3::new(c(0), c(1), c(2)))
    }

    /// Data as bytes for buffer upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

/// Sub-range of a geometry drawn with one material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryGroup {
    /// First index (or vertex) of the range
    pub start: u32,
    /// Number of indices (or vertices)
    pub count: u32,
    /// Position of the material in the render object's material list
    pub material_index: usize,
}

/// Vertex data for one mesh
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    /// Debug name
    pub name: String,
    attributes: BTreeMap<String, VertexAttribute>,
    index: Option<Vec<u32>>,
    groups: Vec<GeometryGroup>,
    morph_targets: usize,
    bounding_box: OnceCell<Option<AABB>>,
    bounding_sphere: OnceCell<Option<BoundingSphere>>,
    version: u64,
}

impl Geometry {
    /// Create an empty geometry
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, name: &str, attribute: VertexAttribute) -> Self {
        self.set_attribute(name, attribute);
        self
    }

    /// Set the index buffer
    pub fn with_index(mut self, index: Vec<u32>) -> Self {
        self.set_index(Some(index));
        self
    }

    /// Add a draw group
    pub fn with_group(mut self, start: u32, count: u32, material_index: usize) -> Self {
        self.add_group(start, count, material_index);
        self
    }

    /// Set or replace an attribute
    pub fn set_attribute(&mut self, name: &str, attribute: VertexAttribute) {
        if name == attributes::POSITION {
            self.invalidate_bounds();
        }
        self.attributes.insert(name.to_string(), attribute);
        self.version += 1;
    }

    /// Remove an attribute
    pub fn remove_attribute(&mut self, name: &str) -> Option<VertexAttribute> {
        let removed = self.attributes.remove(name)?;
        if name == attributes::POSITION {
            self.invalidate_bounds();
        }
        self.version += 1;
        Some(removed)
    }

    /// Get an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.get(name)
    }

    /// Whether the attribute exists
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// All attributes in name order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &VertexAttribute)> {
        self.attributes.iter().map(|(name, attribute)| (name.as_str(), attribute))
    }

    /// Set or clear the index buffer
    pub fn set_index(&mut self, index: Option<Vec<u32>>) {
        self.index = index;
        self.version += 1;
    }

    /// Index data
    pub fn index(&self) -> Option<&[u32]> {
        self.index.as_deref()
    }

    /// Index data as bytes for buffer upload
    pub fn index_bytes(&self) -> Option<&[u8]> {
        self.index.as_deref().map(bytemuck::cast_slice)
    }

    /// Add a draw group
    pub fn add_group(&mut self, start: u32, count: u32, material_index: usize) {
        self.groups.push(GeometryGroup { start, count, material_index });
        self.version += 1;
    }

    /// Remove every draw group
    pub fn clear_groups(&mut self) {
        self.groups.clear();
        self.version += 1;
    }

    /// Draw groups
    pub fn groups(&self) -> &[GeometryGroup] {
        &self.groups
    }

    /// Add a morph target (position offsets)
    pub fn add_morph_target(&mut self, offsets: VertexAttribute) {
        let name = attributes::morph_target(self.morph_targets);
        self.attributes.insert(name, offsets);
        self.morph_targets += 1;
        self.version += 1;
    }

    /// Number of morph targets
    pub fn morph_target_count(&self) -> usize {
        self.morph_targets
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.attribute(attributes::POSITION).map_or(0, VertexAttribute::count)
    }

    /// Number of elements drawn for the whole geometry
    pub fn draw_count(&self) -> usize {
        self.index.as_ref().map_or_else(|| self.vertex_count(), Vec::len)
    }

    /// Change counter; bumped by every mutation
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Position of vertex `index`
    pub fn position(&self, index: usize) -> Option<Vec3> {
        self.attribute(attributes::POSITION)?.get_vec3(index)
    }

    /// Corners of the triangle starting at element `element` of the draw order
    pub fn triangle_at(&self, element: usize) -> Option<[Vec3; 3]> {
        let vertex = |i: usize| -> Option<Vec3> {
            let v = match &self.index {
                Some(index) => *index.get(i)? as usize,
                None => i,
            };
            self.position(v)
        };
        Some([vertex(element)?, vertex(element + 1)?, vertex(element + 2)?])
    }

    /// Axis-aligned bounds of the positions
    pub fn bounding_box(&self) -> Option<AABB> {
        *self.bounding_box.get_or_init(|| {
            let positions = self.attribute(attributes::POSITION)?;
            AABB::from_points((0..positions.count()).filter_map(|i| positions.get_vec3(i)))
        })
    }

    /// Bounding sphere centred on the box
    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        *self.bounding_sphere.get_or_init(|| {
            let positions = self.attribute(attributes::POSITION)?;
            let points: Vec<Vec3> = (0..positions.count()).filter_map(|i| positions.get_vec3(i)).collect();
            BoundingSphere::from_points(&points)
        })
    }

    fn invalidate_bounds(&mut self) {
        self.bounding_box = OnceCell::new();
        self.bounding_sphere = OnceCell::new();
    }

    /// Flat rectangle in the XY plane facing +Z
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Self::new("plane")
            .with_attribute(attributes::POSITION, VertexAttribute::new(vec![
                -hw, -hh, 0.0,
                hw, -hh, 0.0,
                hw, hh, 0.0,
                -hw, hh, 0.0,
            ], 3))
            .with_attribute(attributes::NORMAL, VertexAttribute::new([0.0, 0.0, 1.0].repeat(4), 3))
            .with_attribute(attributes::UV, VertexAttribute::new(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0], 2))
            .with_index(vec![0, 1, 2, 0, 2, 3])
    }

    /// Axis-aligned box centred on the origin, one group per face pair
    ///
    /// Groups are `+X/-X`, `+Y/-Y` and `+Z/-Z`, using material indices 0-2.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let half = Vec3::new(width * 0.5, height * 0.5, depth * 0.5);
        // (normal axis, u axis, v axis)
        let faces = [
            (Vec3::x(), -Vec3::z(), Vec3::y()),
            (-Vec3::x(), Vec3::z(), Vec3::y()),
            (Vec3::y(), Vec3::x(), -Vec3::z()),
            (-Vec3::y(), Vec3::x(), Vec3::z()),
            (Vec3::z(), Vec3::x(), Vec3::y()),
            (-Vec3::z(), -Vec3::x(), Vec3::y()),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(48);
        let mut index = Vec::with_capacity(36);

        for (n, u, v) in faces {
            let base = u32::try_from(positions.len()).unwrap_or(0);
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let corner = n + u * su + v * sv;
                positions.push(corner.component_mul(&half));
                normals.push(n);
                uvs.extend_from_slice(&[(su + 1.0) * 0.5, (sv + 1.0) * 0.5]);
            }
            index.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new("cuboid")
            .with_attribute(attributes::POSITION, VertexAttribute::from_vec3(&positions))
            .with_attribute(attributes::NORMAL, VertexAttribute::from_vec3(&normals))
            .with_attribute(attributes::UV, VertexAttribute::new(uvs, 2))
            .with_index(index)
            .with_group(0, 12, 0)
            .with_group(12, 12, 1)
            .with_group(24, 12, 2)
    }
}
