//! Scene nodes
//!
//! A node owns its local transform and caches the derived local and world
//! matrices. Parent links are plain handles into the owning graph; the
//! children list is ordered and owned by the parent.

use crate::foundation::collections::NodeId;
use crate::foundation::math::{Mat4, Quat, Transform, Vec3};
use crate::render::lighting::Light;

use super::render_object::RenderObject;

/// What a node contributes to a frame
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Pure transform node; its render order becomes the group order below it
    Group,
    /// Drawable geometry
    Mesh(RenderObject),
    /// Light source
    Light(Light),
}

/// A node in the scene hierarchy
///
/// Transform setters live on [`SceneGraph`](super::SceneGraph) so that dirty
/// state can be propagated to ancestors.
#[derive(Debug, Clone)]
pub struct Node {
    /// Debug name
    pub name: String,

    /// Hidden nodes and their subtrees are neither drawn nor picked
    pub visible: bool,

    /// Draw order override (ascending); for groups it orders whole subtrees
    pub render_order: i32,

    /// Payload
    pub kind: NodeKind,

    pub(super) transform: Transform,
    pub(super) local_matrix: Mat4,
    pub(super) world_matrix: Mat4,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,

    /// Local TRS changed since the local matrix was built
    pub(super) local_dirty: bool,
    /// World matrix must be rebuilt on the next update pass
    pub(super) world_dirty: bool,
    /// Some descendant is dirty
    pub(super) subtree_dirty: bool,
}

impl Node {
    /// Create a detached node with an identity transform
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            visible: true,
            render_order: 0,
            kind,
            transform: Transform::identity(),
            local_matrix: Mat4::identity(),
            world_matrix: Mat4::identity(),
            parent: None,
            children: Vec::new(),
            local_dirty: false,
            world_dirty: true,
            subtree_dirty: false,
        }
    }

    /// Create a group node
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    /// Create a mesh node
    pub fn mesh(name: impl Into<String>, object: RenderObject) -> Self {
        Self::new(name, NodeKind::Mesh(object))
    }

    /// Create a light node
    pub fn light(name: impl Into<String>, light: Light) -> Self {
        Self::new(name, NodeKind::Light(light))
    }

    /// Set the initial local transform
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self.local_dirty = true;
        self
    }

    /// Set the initial local position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self.local_dirty = true;
        self
    }

    /// Set the render order
    pub fn with_render_order(mut self, render_order: i32) -> Self {
        self.render_order = render_order;
        self
    }

    /// Set initial visibility
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Local transform
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Local position
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// Local rotation
    pub fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    /// Local scale
    pub fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    /// Cached local matrix (valid after the last update pass)
    pub fn local_matrix(&self) -> &Mat4 {
        &self.local_matrix
    }

    /// Cached world matrix (valid after the last update pass)
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// Parent handle, `None` for roots
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the next update pass will touch this node
    pub fn needs_update(&self) -> bool {
        self.local_dirty || self.world_dirty
    }

    /// Local matrix reflecting pending TRS edits
    pub(super) fn current_local_matrix(&self) -> Mat4 {
        if self.local_dirty {
            self.transform.to_matrix()
        } else {
            self.local_matrix
        }
    }

    /// Render object payload, if this is a mesh
    pub fn render_object(&self) -> Option<&RenderObject> {
        match &self.kind {
            NodeKind::Mesh(object) => Some(object),
            _ => None,
        }
    }

    /// Light payload, if this is a light
    pub fn as_light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }
}
