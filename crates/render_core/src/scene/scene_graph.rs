//! Scene graph
//!
//! Nodes live in a slot map and reference each other by [`NodeId`]. World
//! matrices are cached and only rebuilt for nodes whose local transform
//! changed, whose parent changed, or whose ancestor's world matrix was
//! rebuilt in the same pass. Clean subtrees are skipped entirely, which keeps
//! large static scenes cheap to update.
//!
//! Every mutation validates before touching the graph: a rejected call
//! (cycle, missing node, singular parent) leaves it unchanged.

use crate::foundation::collections::{NodeId, SlotMap};
use crate::foundation::math::{Mat4, Quat, Transform, Vec3};

use super::error::{SceneError, SceneResult};
use super::node::Node;

/// Hierarchy of transform nodes
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
    /// World matrices rebuilt since creation
    recomputed: u64,
}

impl SceneGraph {
    /// Create an empty scene graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node as a new root
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        node.parent = None;
        node.children.clear();
        node.world_dirty = true;
        let id = self.nodes.insert(node);
        log::trace!("Added node {:?}", id);
        id
    }

    /// Insert a node directly under `parent`
    pub fn add_node_under(&mut self, parent: NodeId, node: Node) -> SceneResult<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        let id = self.add_node(node);
        self.add_child(parent, id)?;
        Ok(id)
    }

    /// Whether `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Get a node
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get a node for editing its name, visibility, render order or payload
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes without a parent
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
    }

    /// Cached world matrix of a node
    pub fn world_matrix(&self, id: NodeId) -> Option<&Mat4> {
        self.nodes.get(id).map(|node| &node.world_matrix)
    }

    /// Total number of world matrices rebuilt by update passes
    pub fn recompute_count(&self) -> u64 {
        self.recomputed
    }

    /// Whether `ancestor` is `node` or lies on its parent chain
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Make `child` the last child of `parent`
    ///
    /// `child` is detached from its previous parent first. Its local
    /// transform is kept, so its world transform follows the new parent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.validate_move(parent, child)?;

        self.detach(child);
        self.link(parent, child, None);
        Ok(())
    }

    /// Detach `child` from `parent`; it becomes a root and is not destroyed
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.require(parent)?;
        let node = self.require(child)?;
        if node.parent != Some(parent) {
            return Err(SceneError::NotAChild { parent, child });
        }

        self.detach(child);
        self.mark_world_dirty(child);
        Ok(())
    }

    /// Reparent `child` under `parent` keeping its world transform
    ///
    /// The new local transform is `inverse(parent_world) * child_world`,
    /// decomposed into position, rotation and scale. The child's world
    /// matrix is valid as soon as this returns.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.validate_move(parent, child)?;

        let parent_world = self.compute_world_matrix(parent)?;
        let inverse = parent_world
            .try_inverse()
            .ok_or(SceneError::SingularMatrix(parent))?;
        let child_world = self.compute_world_matrix(child)?;

        let transform = Transform::from_matrix(&(inverse * child_world));

        self.detach(child);
        self.link(parent, child, None);

        if let Some(node) = self.nodes.get_mut(child) {
            node.local_matrix = transform.to_matrix();
            node.world_matrix = parent_world * node.local_matrix;
            node.transform = transform;
            node.local_dirty = false;
            // Descendants still hold matrices derived from the old world
            node.world_dirty = true;
        }
        Ok(())
    }

    /// Apply several `(parent, child)` moves as one operation
    ///
    /// Moves are applied in order with [`add_child`](Self::add_child)
    /// semantics. If any move fails, every move already applied is undone
    /// and the error is returned.
    pub fn reparent_all(&mut self, moves: &[(NodeId, NodeId)]) -> SceneResult<()> {
        let mut applied: Vec<(NodeId, Option<(NodeId, usize)>)> = Vec::with_capacity(moves.len());

        for &(parent, child) in moves {
            let previous = match self.require(child) {
                Ok(_) => self.slot_of(child),
                Err(err) => {
                    self.rollback(applied);
                    return Err(err);
                }
            };

            if let Err(err) = self.add_child(parent, child) {
                log::debug!("Batch reparent failed after {} moves: {}", applied.len(), err);
                self.rollback(applied);
                return Err(err);
            }
            applied.push((child, previous));
        }
        Ok(())
    }

    /// Remove a node from the graph
    ///
    /// With `cascade` the whole subtree is removed; otherwise the node's
    /// children become roots. Returns the removed handles.
    pub fn remove(&mut self, id: NodeId, cascade: bool) -> SceneResult<Vec<NodeId>> {
        self.require(id)?;
        self.detach(id);

        let removed = if cascade {
            self.descendants(id)
        } else {
            let children = self.nodes.get(id).map(|n| n.children.clone()).unwrap_or_default();
            for child in children {
                if let Some(node) = self.nodes.get_mut(child) {
                    node.parent = None;
                    node.world_dirty = true;
                }
            }
            vec![id]
        };

        for node in &removed {
            self.nodes.remove(*node);
        }
        log::debug!("Removed {} node(s) starting at {:?}", removed.len(), id);
        Ok(removed)
    }

    /// Replace a node's local transform
    pub fn set_local_transform(&mut self, id: NodeId, transform: Transform) -> SceneResult<()> {
        self.edit_transform(id, |t| *t = transform)
    }

    /// Set a node's local position
    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> SceneResult<()> {
        self.edit_transform(id, |t| t.position = position)
    }

    /// Set a node's local rotation
    pub fn set_rotation(&mut self, id: NodeId, rotation: Quat) -> SceneResult<()> {
        self.edit_transform(id, |t| t.rotation = rotation)
    }

    /// Set a node's local scale
    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) -> SceneResult<()> {
        self.edit_transform(id, |t| t.scale = scale)
    }

    /// Bring world matrices under `root` up to date
    ///
    /// Returns the number of world matrices rebuilt. A second call with no
    /// intervening mutation returns zero.
    pub fn update_world_transforms(&mut self, root: NodeId) -> SceneResult<usize> {
        self.require(root)?;

        let mut rebuilt = 0;
        let mut stack = vec![(root, false)];

        while let Some((id, parent_changed)) = stack.pop() {
            let parent_world = self
                .nodes
                .get(id)
                .and_then(|node| node.parent)
                .and_then(|parent| self.nodes.get(parent))
                .map(|parent| parent.world_matrix);

            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };

            if node.local_dirty {
                node.local_matrix = node.transform.to_matrix();
                node.local_dirty = false;
                node.world_dirty = true;
            }

            let changed = parent_changed || node.world_dirty;
            if changed {
                node.world_matrix = match parent_world {
                    Some(parent_world) => parent_world * node.local_matrix,
                    None => node.local_matrix,
                };
                node.world_dirty = false;
                rebuilt += 1;
            }

            if changed || node.subtree_dirty {
                node.subtree_dirty = false;
                stack.extend(node.children.iter().rev().map(|&child| (child, changed)));
            }
        }

        self.recomputed += rebuilt as u64;
        log::trace!("Updated world transforms under {:?}: {} rebuilt", root, rebuilt);
        Ok(rebuilt)
    }

    /// Update every root
    pub fn update_all(&mut self) -> usize {
        let roots: Vec<NodeId> = self.roots().collect();
        roots
            .into_iter()
            .filter_map(|root| self.update_world_transforms(root).ok())
            .sum()
    }

    /// World matrix computed from the current local transforms of the
    /// node and all its ancestors, ignoring cached state
    pub fn compute_world_matrix(&self, id: NodeId) -> SceneResult<Mat4> {
        let mut matrix = self.require(id)?.current_local_matrix();
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            let node = self.require(parent)?;
            matrix = node.current_local_matrix() * matrix;
            current = node.parent;
        }
        Ok(matrix)
    }

    /// `root` and all its descendants in depth-first pre-order
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                out.push(id);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Visit `root` and every descendant whose ancestors are all visible
    pub fn for_each_visible<F: FnMut(NodeId, &Node)>(&self, root: NodeId, mut visit: F) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            visit(id, node);
            stack.extend(node.children.iter().rev());
        }
    }

    fn require(&self, id: NodeId) -> SceneResult<&Node> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    fn validate_move(&self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.require(parent)?;
        self.require(child)?;
        if self.is_ancestor(child, parent) {
            return Err(SceneError::Cycle { parent, child });
        }
        Ok(())
    }

    fn slot_of(&self, child: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.nodes.get(child)?.parent?;
        let index = self.nodes.get(parent)?.children.iter().position(|&c| c == child)?;
        Some((parent, index))
    }

    /// Unlink `child` from its parent's children list
    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes.get_mut(child).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|&c| c != child);
        }
    }

    /// Link a detached `child` under `parent`, appending unless `index` is given
    fn link(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            let at = index.map_or(parent_node.children.len(), |i| i.min(parent_node.children.len()));
            parent_node.children.insert(at, child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        self.mark_world_dirty(child);
    }

    fn rollback(&mut self, applied: Vec<(NodeId, Option<(NodeId, usize)>)>) {
        for (child, previous) in applied.into_iter().rev() {
            self.detach(child);
            match previous {
                Some((parent, index)) => self.link(parent, child, Some(index)),
                None => self.mark_world_dirty(child),
            }
        }
    }

    fn edit_transform<F: FnOnce(&mut Transform)>(&mut self, id: NodeId, edit: F) -> SceneResult<()> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        edit(&mut node.transform);
        node.local_dirty = true;
        self.mark_ancestors(id);
        Ok(())
    }

    fn mark_world_dirty(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.world_dirty = true;
        }
        self.mark_ancestors(id);
    }

    /// Flag every ancestor as having a dirty descendant
    fn mark_ancestors(&mut self, id: NodeId) {
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            let Some(node) = self.nodes.get_mut(parent) else {
                break;
            };
            if node.subtree_dirty {
                break;
            }
            node.subtree_dirty = true;
            current = node.parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Unit;
    use approx::assert_relative_eq;

    fn rotated(position: Vec3, angle: f32, scale: Vec3) -> Transform {
        Transform::new(
            position,
            Quat::from_axis_angle(&Unit::new_normalize(Vec3::new(0.3, 1.0, 0.2)), angle),
            scale,
        )
    }

    /// root -> a -> b, each with a non-trivial transform
    fn chain() -> (SceneGraph, NodeId, NodeId, NodeId) {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(Node::group("root").with_transform(rotated(Vec3::new(1.0, 0.0, 0.0), 0.4, Vec3::new(2.0, 2.0, 2.0))));
        let a = graph.add_node_under(root, Node::group("a").with_transform(rotated(Vec3::new(0.0, 3.0, 0.0), -1.1, Vec3::new(1.0, 0.5, 1.5)))).unwrap();
        let b = graph.add_node_under(a, Node::group("b").with_position(Vec3::new(0.0, 0.0, -4.0))).unwrap();
        (graph, root, a, b)
    }

    #[test]
    fn test_world_matrix_is_product_of_ancestors() {
        let (mut graph, root, a, b) = chain();
        graph.update_world_transforms(root).unwrap();

        let expected = graph.node(root).unwrap().transform().to_matrix()
            * graph.node(a).unwrap().transform().to_matrix()
            * graph.node(b).unwrap().transform().to_matrix();

        assert_relative_eq!(*graph.world_matrix(b).unwrap(), expected, epsilon = 1e-5);
        assert_relative_eq!(graph.compute_world_matrix(b).unwrap(), expected, epsilon = 1e-5);
    }

    #[test]
    fn test_second_update_does_no_work() {
        let (mut graph, root, _, b) = chain();

        assert_eq!(graph.update_world_transforms(root).unwrap(), 3);
        let before = *graph.world_matrix(b).unwrap();
        let count = graph.recompute_count();

        assert_eq!(graph.update_world_transforms(root).unwrap(), 0);
        assert_eq!(graph.recompute_count(), count);
        assert_eq!(*graph.world_matrix(b).unwrap(), before);
    }

    #[test]
    fn test_dirty_leaf_under_clean_ancestors_is_updated() {
        let (mut graph, root, a, b) = chain();
        graph.update_world_transforms(root).unwrap();

        graph.set_position(b, Vec3::new(5.0, 0.0, 0.0)).unwrap();
        assert_eq!(graph.update_world_transforms(root).unwrap(), 1);

        let expected = *graph.world_matrix(a).unwrap() * Mat4::new_translation(&Vec3::new(5.0, 0.0, 0.0));
        assert_relative_eq!(*graph.world_matrix(b).unwrap(), expected, epsilon = 1e-5);
    }

    #[test]
    fn test_parent_change_propagates_to_children() {
        let (mut graph, root, a, _) = chain();
        graph.update_world_transforms(root).unwrap();

        graph.set_scale(a, Vec3::new(3.0, 3.0, 3.0)).unwrap();
        assert_eq!(graph.update_world_transforms(root).unwrap(), 2);
    }

    #[test]
    fn test_cycle_is_rejected_and_graph_unchanged() {
        let (mut graph, root, a, b) = chain();

        let err = graph.add_child(b, root).unwrap_err();
        assert_eq!(err, SceneError::Cycle { parent: b, child: root });
        assert_eq!(graph.add_child(a, a).unwrap_err(), SceneError::Cycle { parent: a, child: a });

        assert_eq!(graph.node(root).unwrap().parent(), None);
        assert_eq!(graph.node(b).unwrap().parent(), Some(a));
        assert_eq!(graph.node(a).unwrap().children(), &[b]);
    }

    #[test]
    fn test_add_child_moves_between_parents_in_order() {
        let mut graph = SceneGraph::new();
        let p1 = graph.add_node(Node::group("p1"));
        let p2 = graph.add_node(Node::group("p2"));
        let c1 = graph.add_node_under(p1, Node::group("c1")).unwrap();
        let c2 = graph.add_node_under(p1, Node::group("c2")).unwrap();
        let c3 = graph.add_node_under(p2, Node::group("c3")).unwrap();

        graph.add_child(p2, c1).unwrap();

        assert_eq!(graph.node(p1).unwrap().children(), &[c2]);
        assert_eq!(graph.node(p2).unwrap().children(), &[c3, c1]);
        assert_eq!(graph.node(c1).unwrap().parent(), Some(p2));
    }

    #[test]
    fn test_remove_child_makes_root() {
        let (mut graph, root, a, b) = chain();
        graph.update_world_transforms(root).unwrap();

        assert_eq!(graph.remove_child(root, b).unwrap_err(), SceneError::NotAChild { parent: root, child: b });
        graph.remove_child(a, b).unwrap();
        assert!(graph.node(b).unwrap().parent().is_none());

        graph.update_world_transforms(b).unwrap();
        assert_relative_eq!(*graph.world_matrix(b).unwrap(), Mat4::new_translation(&Vec3::new(0.0, 0.0, -4.0)), epsilon = 1e-6);
    }

    #[test]
    fn test_remove_without_cascade_orphans_children() {
        let (mut graph, root, a, b) = chain();

        let removed = graph.remove(a, false).unwrap();
        assert_eq!(removed, vec![a]);
        assert!(graph.contains(b));
        assert!(graph.node(b).unwrap().parent().is_none());
        assert!(graph.node(root).unwrap().children().is_empty());
        assert_eq!(graph.roots().count(), 2);
    }

    #[test]
    fn test_remove_with_cascade_drops_subtree() {
        let (mut graph, root, a, b) = chain();

        let removed = graph.remove(a, true).unwrap();
        assert_eq!(removed, vec![a, b]);
        assert_eq!(graph.len(), 1);
        assert!(graph.contains(root));
        assert_eq!(graph.remove(a, true).unwrap_err(), SceneError::NodeNotFound(a));
    }

    #[test]
    fn test_attach_preserves_world_position_immediately() {
        let mut graph = SceneGraph::new();
        let b = graph.add_node(Node::group("b").with_transform(rotated(Vec3::new(10.0, 0.0, 0.0), 0.9, Vec3::new(2.0, 1.0, 3.0))));
        let a = graph.add_node(Node::group("a").with_position(Vec3::new(1.0, 2.0, 3.0)));
        graph.update_all();

        graph.attach(b, a).unwrap();

        let world = graph.world_matrix(a).unwrap();
        assert_relative_eq!(world.m14, 1.0, epsilon = 1e-4);
        assert_relative_eq!(world.m24, 2.0, epsilon = 1e-4);
        assert_relative_eq!(world.m34, 3.0, epsilon = 1e-4);
        assert_eq!(graph.node(a).unwrap().parent(), Some(b));

        graph.update_world_transforms(b).unwrap();
        let world = graph.world_matrix(a).unwrap();
        assert_relative_eq!(Vec3::new(world.m14, world.m24, world.m34), Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-4);
    }

    #[test]
    fn test_attach_under_singular_parent_fails() {
        let mut graph = SceneGraph::new();
        let flat = graph.add_node(Node::group("flat").with_transform(Transform::new(Vec3::zeros(), Quat::identity(), Vec3::new(1.0, 0.0, 1.0))));
        let a = graph.add_node(Node::group("a"));

        assert_eq!(graph.attach(flat, a).unwrap_err(), SceneError::SingularMatrix(flat));
        assert!(graph.node(a).unwrap().parent().is_none());
    }

    #[test]
    fn test_reparent_all_rolls_back_on_cycle() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(Node::group("root"));
        let x = graph.add_node_under(root, Node::group("x")).unwrap();
        let y = graph.add_node_under(root, Node::group("y")).unwrap();
        let z = graph.add_node_under(root, Node::group("z")).unwrap();

        // y under x succeeds, x under y would cycle
        let err = graph.reparent_all(&[(x, y), (y, x)]).unwrap_err();
        assert_eq!(err, SceneError::Cycle { parent: y, child: x });

        assert_eq!(graph.node(root).unwrap().children(), &[x, y, z]);
        assert_eq!(graph.node(y).unwrap().parent(), Some(root));
        assert!(graph.node(x).unwrap().children().is_empty());

        graph.reparent_all(&[(x, y), (y, z)]).unwrap();
        assert_eq!(graph.node(z).unwrap().parent(), Some(y));
        assert_eq!(graph.node(root).unwrap().children(), &[x]);
    }
}
