//! Per-frame render lists
//!
//! The builder walks the scene graph depth-first, drops hidden subtrees and
//! objects outside the camera frustum, and sorts what remains into three
//! buckets: opaque, transmissive and transparent. Entries are plain values
//! rebuilt every frame; the vectors are reused so steady-state frames do
//! not allocate.
//!
//! Sorting is stable. Opaque entries go front-to-back with material identity
//! ahead of depth to limit program switches; blended buckets go
//! back-to-front.

use std::cmp::Ordering;

use crate::foundation::collections::{GeometryId, MaterialId, NodeId};
use crate::foundation::math::Mat4;
use crate::render::geometry::GeometryGroup;
use crate::render::resources::ResourceRegistry;

use super::bounds::{world_center, Frustum};
use super::node::{Node, NodeKind};
use super::render_object::RenderObject;
use super::scene_graph::SceneGraph;

/// One draw request for the current frame
#[derive(Debug, Clone, PartialEq)]
pub struct RenderListEntry {
    /// Source node
    pub node: NodeId,
    /// Geometry to draw
    pub geometry: GeometryId,
    /// Material for this entry
    pub material: MaterialId,
    /// Sub-range for multi-material geometry
    pub group: Option<GeometryGroup>,
    /// Render order of the nearest ordered group ancestor
    pub group_order: i32,
    /// The node's own render order
    pub render_order: i32,
    /// Distance along the view direction
    pub depth: f32,
    /// Snapshot of the node's world matrix
    pub world_matrix: Mat4,
    /// Skinned mesh
    pub skinned: bool,
    /// Instances per draw
    pub instance_count: u32,
}

/// Render list buckets, in draw order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderBucket {
    /// Depth-tested, not blended
    Opaque,
    /// Samples the transmission pre-pass
    Transmissive,
    /// Alpha blended
    Transparent,
}

impl RenderBucket {
    /// Buckets in draw order
    pub const ORDER: [RenderBucket; 3] = [
        RenderBucket::Opaque,
        RenderBucket::Transmissive,
        RenderBucket::Transparent,
    ];
}

/// Comparator applied after group and render order
pub type SortFn = dyn Fn(&RenderListEntry, &RenderListEntry) -> Ordering;

/// Counters from one build pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Objects rejected by the frustum test
    pub culled: usize,
    /// Entries dropped for missing geometry or material
    pub skipped: usize,
}

/// Front-to-back order for opaque entries
pub fn painter_order(a: &RenderListEntry, b: &RenderListEntry) -> Ordering {
    a.group_order
        .cmp(&b.group_order)
        .then(a.render_order.cmp(&b.render_order))
        .then(a.material.cmp(&b.material))
        .then(a.depth.total_cmp(&b.depth))
        .then(a.node.cmp(&b.node))
}

/// Back-to-front order for blended entries
pub fn reverse_painter_order(a: &RenderListEntry, b: &RenderListEntry) -> Ordering {
    a.group_order
        .cmp(&b.group_order)
        .then(a.render_order.cmp(&b.render_order))
        .then(b.depth.total_cmp(&a.depth))
        .then(a.node.cmp(&b.node))
}

/// The three sorted buckets for one frame
#[derive(Debug, Default)]
pub struct RenderLists {
    opaque: Vec<RenderListEntry>,
    transmissive: Vec<RenderListEntry>,
    transparent: Vec<RenderListEntry>,
}

impl RenderLists {
    /// Create empty lists
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all entries, keeping capacity
    pub fn clear(&mut self) {
        self.opaque.clear();
        self.transmissive.clear();
        self.transparent.clear();
    }

    /// Entries of a bucket
    pub fn bucket(&self, bucket: RenderBucket) -> &[RenderListEntry] {
        match bucket {
            RenderBucket::Opaque => &self.opaque,
            RenderBucket::Transmissive => &self.transmissive,
            RenderBucket::Transparent => &self.transparent,
        }
    }

    /// Opaque entries
    pub fn opaque(&self) -> &[RenderListEntry] {
        &self.opaque
    }

    /// Transmissive entries
    pub fn transmissive(&self) -> &[RenderListEntry] {
        &self.transmissive
    }

    /// Transparent entries
    pub fn transparent(&self) -> &[RenderListEntry] {
        &self.transparent
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.opaque.len() + self.transmissive.len() + self.transparent.len()
    }

    /// Whether every bucket is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuild the lists from the subtree at `root`
    ///
    /// World matrices must be current. `view` is the camera's world-to-view
    /// matrix; pass a frustum to enable culling.
    pub fn build(
        &mut self,
        graph: &SceneGraph,
        root: NodeId,
        resources: &ResourceRegistry,
        view: &Mat4,
        frustum: Option<&Frustum>,
    ) -> BuildStats {
        self.clear();
        let mut stats = BuildStats::default();
        let mut stack = vec![(root, 0)];

        while let Some((id, group_order)) = stack.pop() {
            let Some(node) = graph.node(id) else {
                continue;
            };
            if !node.visible {
                continue;
            }

            let child_group_order = match node.kind {
                NodeKind::Group if node.render_order != 0 => node.render_order,
                _ => group_order,
            };

            if let NodeKind::Mesh(object) = &node.kind {
                self.push_object(id, node, object, group_order, resources, view, frustum, &mut stats);
            }

            stack.extend(node.children().iter().rev().map(|&child| (child, child_group_order)));
        }

        log::trace!(
            "Built render lists: {} opaque, {} transmissive, {} transparent, {} culled",
            self.opaque.len(),
            self.transmissive.len(),
            self.transparent.len(),
            stats.culled
        );
        stats
    }

    /// Sort every bucket
    ///
    /// Custom comparators only decide between entries with equal group and
    /// render order. The transparent comparator also orders transmissive
    /// entries.
    pub fn sort(&mut self, opaque: Option<&SortFn>, transparent: Option<&SortFn>) {
        sort_bucket(&mut self.opaque, opaque, painter_order);
        sort_bucket(&mut self.transmissive, transparent, reverse_painter_order);
        sort_bucket(&mut self.transparent, transparent, reverse_painter_order);
    }

    #[allow(clippy::too_many_arguments)]
    fn push_object(
        &mut self,
        id: NodeId,
        node: &Node,
        object: &RenderObject,
        group_order: i32,
        resources: &ResourceRegistry,
        view: &Mat4,
        frustum: Option<&Frustum>,
        stats: &mut BuildStats,
    ) {
        let Some(geometry) = resources.geometry(object.geometry) else {
            log::debug!("Skipping {:?} '{}': geometry {:?} missing", id, node.name, object.geometry);
            stats.skipped += 1;
            return;
        };

        let world = node.world_matrix();
        let sphere = geometry.bounding_sphere();

        if let (Some(frustum), Some(sphere)) = (frustum, sphere.as_ref()) {
            if object.frustum_culled && !frustum.intersects_sphere(&sphere.transformed(world)) {
                stats.culled += 1;
                return;
            }
        }

        let center = world_center(sphere.as_ref(), world);
        let depth = -view.transform_point(&center.into()).z;

        let entry = |material: MaterialId, group: Option<GeometryGroup>| RenderListEntry {
            node: id,
            geometry: object.geometry,
            material,
            group,
            group_order,
            render_order: node.render_order,
            depth,
            world_matrix: *world,
            skinned: object.skinned,
            instance_count: object.instance_count,
        };

        if object.is_multi_material() && !geometry.groups().is_empty() {
            for group in geometry.groups() {
                match object.materials.get(group.material_index) {
                    Some(&material) => self.push_entry(resources, entry(material, Some(*group)), stats),
                    None => stats.skipped += 1,
                }
            }
        } else if let Some(&material) = object.materials.first() {
            self.push_entry(resources, entry(material, None), stats);
        }
    }

    fn push_entry(&mut self, resources: &ResourceRegistry, entry: RenderListEntry, stats: &mut BuildStats) {
        let Some(material) = resources.material(entry.material) else {
            log::debug!("Skipping {:?}: material {:?} missing", entry.node, entry.material);
            stats.skipped += 1;
            return;
        };
        if !material.visible() {
            return;
        }

        if material.is_transmissive() {
            self.transmissive.push(entry);
        } else if material.transparent() {
            self.transparent.push(entry);
        } else {
            self.opaque.push(entry);
        }
    }
}

fn sort_bucket(
    entries: &mut [RenderListEntry],
    custom: Option<&SortFn>,
    default: fn(&RenderListEntry, &RenderListEntry) -> Ordering,
) {
    match custom {
        Some(compare) => entries.sort_by(|a, b| {
            a.group_order
                .cmp(&b.group_order)
                .then(a.render_order.cmp(&b.render_order))
                .then_with(|| compare(a, b))
        }),
        None => entries.sort_by(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::camera::Camera;
    use crate::render::geometry::Geometry;
    use crate::render::material::Material;

    struct Fixture {
        graph: SceneGraph,
        resources: ResourceRegistry,
        root: NodeId,
        plane: GeometryId,
        camera: Camera,
    }

    impl Fixture {
        fn new() -> Self {
            let mut graph = SceneGraph::new();
            let mut resources = ResourceRegistry::new();
            let root = graph.add_node(Node::group("root"));
            let plane = resources.add_geometry(Geometry::plane(1.0, 1.0));
            let camera = Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 100.0);
            Self { graph, resources, root, plane, camera }
        }

        fn mesh(&mut self, parent: NodeId, material: MaterialId, z: f32) -> NodeId {
            let node = Node::mesh("mesh", RenderObject::new(self.plane, material)).with_position(Vec3::new(0.0, 0.0, z));
            self.graph.add_node_under(parent, node).unwrap()
        }

        fn build(&mut self) -> RenderLists {
            self.graph.update_all();
            let mut lists = RenderLists::new();
            let frustum = self.camera.frustum();
            lists.build(&self.graph, self.root, &self.resources, &self.camera.view_matrix(), Some(&frustum));
            lists.sort(None, None);
            lists
        }
    }

    fn nodes(entries: &[RenderListEntry]) -> Vec<NodeId> {
        entries.iter().map(|e| e.node).collect()
    }

    #[test]
    fn test_transparent_back_to_front() {
        let mut f = Fixture::new();
        let glass = f.resources.add_material(Material::default().with_transparent(true));
        let near = f.mesh(f.root, glass, -1.0);
        let far = f.mesh(f.root, glass, -5.0);
        let middle = f.mesh(f.root, glass, -3.0);

        let lists = f.build();
        assert!(lists.opaque().is_empty());
        assert_eq!(nodes(lists.transparent()), vec![far, middle, near]);

        let depths: Vec<f32> = lists.transparent().iter().map(|e| e.depth).collect();
        assert!(depths.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_opaque_front_to_back_within_material() {
        let mut f = Fixture::new();
        let solid = f.resources.add_material(Material::default());
        let far = f.mesh(f.root, solid, -5.0);
        let near = f.mesh(f.root, solid, 2.0);
        let middle = f.mesh(f.root, solid, 0.0);

        let lists = f.build();
        assert_eq!(nodes(lists.opaque()), vec![near, middle, far]);
    }

    #[test]
    fn test_render_order_and_group_order_take_precedence() {
        let mut f = Fixture::new();
        let solid = f.resources.add_material(Material::default());

        let ordered_group = f.graph.add_node_under(f.root, Node::group("late").with_render_order(5)).unwrap();
        let in_group = f.mesh(ordered_group, solid, 5.0);

        let late = f.mesh(f.root, solid, 4.0);
        f.graph.node_mut(late).unwrap().render_order = 10;
        let early = f.mesh(f.root, solid, -20.0);

        let lists = f.build();
        assert_eq!(nodes(lists.opaque()), vec![early, late, in_group]);
        assert_eq!(lists.opaque()[2].group_order, 5);
    }

    #[test]
    fn test_invisible_subtree_and_culling() {
        let mut f = Fixture::new();
        let solid = f.resources.add_material(Material::default());

        let hidden = f.graph.add_node_under(f.root, Node::group("hidden").with_visible(false)).unwrap();
        f.mesh(hidden, solid, 0.0);

        // Behind the camera
        let culled = f.mesh(f.root, solid, 50.0);
        let kept = f.mesh(f.root, solid, 60.0);
        if let Some(NodeKind::Mesh(object)) = f.graph.node_mut(kept).map(|n| &mut n.kind) {
            object.frustum_culled = false;
        }

        f.graph.update_all();
        let mut lists = RenderLists::new();
        let frustum = f.camera.frustum();
        let stats = lists.build(&f.graph, f.root, &f.resources, &f.camera.view_matrix(), Some(&frustum));

        assert_eq!(stats.culled, 1);
        assert_eq!(nodes(lists.opaque()), vec![kept]);
        assert!(!nodes(lists.opaque()).contains(&culled));

        // Culling disabled globally
        lists.build(&f.graph, f.root, &f.resources, &f.camera.view_matrix(), None);
        assert_eq!(lists.opaque().len(), 2);
    }

    #[test]
    fn test_buckets_and_missing_resources() {
        let mut f = Fixture::new();
        let solid = f.resources.add_material(Material::default());
        let glass = f.resources.add_material(Material::default().with_transparent(true));
        let water = f.resources.add_material(Material::physical(Vec3::new(0.5, 0.7, 1.0), 1.0));
        let gone = f.resources.add_material(Material::default());
        f.resources.remove_material(gone);

        f.mesh(f.root, solid, 0.0);
        f.mesh(f.root, glass, 0.0);
        f.mesh(f.root, water, 0.0);
        f.mesh(f.root, gone, 0.0);

        f.graph.update_all();
        let mut lists = RenderLists::new();
        let stats = lists.build(&f.graph, f.root, &f.resources, &f.camera.view_matrix(), None);

        assert_eq!(lists.opaque().len(), 1);
        assert_eq!(lists.transparent().len(), 1);
        assert_eq!(lists.transmissive().len(), 1);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_multi_material_geometry_emits_one_entry_per_group() {
        let mut f = Fixture::new();
        let cuboid = f.resources.add_geometry(Geometry::cuboid(1.0, 1.0, 1.0));
        let materials: Vec<MaterialId> = (0..3).map(|_| f.resources.add_material(Material::default())).collect();
        let node = Node::mesh("box", RenderObject::with_materials(cuboid, materials.clone()));
        f.graph.add_node_under(f.root, node).unwrap();

        let lists = f.build();
        assert_eq!(lists.opaque().len(), 3);
        let mut used: Vec<MaterialId> = lists.opaque().iter().map(|e| e.material).collect();
        used.sort();
        let mut expected = materials;
        expected.sort();
        assert_eq!(used, expected);
        assert!(lists.opaque().iter().all(|e| e.group.is_some()));
    }

    #[test]
    fn test_custom_comparator_keeps_render_order_precedence() {
        let mut f = Fixture::new();
        let solid = f.resources.add_material(Material::default());
        let first = f.mesh(f.root, solid, 0.0);
        let second = f.mesh(f.root, solid, 1.0);
        let last = f.mesh(f.root, solid, 2.0);
        f.graph.node_mut(last).unwrap().render_order = 1;

        f.graph.update_all();
        let mut lists = RenderLists::new();
        lists.build(&f.graph, f.root, &f.resources, &f.camera.view_matrix(), None);

        // Reverse everything; render order still wins
        let reverse = |a: &RenderListEntry, b: &RenderListEntry| b.node.cmp(&a.node);
        lists.sort(Some(&reverse), None);
        assert_eq!(nodes(lists.opaque()), vec![second, first, last]);
    }
}
