//! Ray picking
//!
//! Independent of the draw pipeline: walks the visible part of the scene
//! graph and intersects a ray with each mesh, either against its world
//! bounding sphere only or, after the sphere test, exactly against its
//! triangles in object space. World matrices must be current.

use crate::foundation::collections::NodeId;
use crate::foundation::math::Vec3;
use crate::render::camera::Camera;
use crate::render::geometry::Geometry;
use crate::render::resources::ResourceRegistry;

use super::bounds::Ray;
use super::node::Node;
use super::scene_graph::SceneGraph;

/// Intersection test used per object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickMode {
    /// World bounding sphere only
    BoundingSphere,
    /// Bounding sphere, then every triangle (both faces)
    #[default]
    Triangles,
}

/// Nearest intersection with one object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Node that was hit
    pub node: NodeId,
    /// Distance from the ray origin in world units
    pub distance: f32,
    /// World-space hit point
    pub point: Vec3,
}

/// Nearest visible mesh under a normalized device coordinate
pub fn pick(
    graph: &SceneGraph,
    root: NodeId,
    resources: &ResourceRegistry,
    camera: &Camera,
    ndc: (f32, f32),
    mode: PickMode,
) -> Option<PickHit> {
    let ray = camera.screen_to_world_ray(ndc.0, ndc.1)?;
    raycast(graph, root, resources, &ray, mode).into_iter().next()
}

/// Every visible mesh hit by `ray`, nearest first
pub fn raycast(
    graph: &SceneGraph,
    root: NodeId,
    resources: &ResourceRegistry,
    ray: &Ray,
    mode: PickMode,
) -> Vec<PickHit> {
    let mut hits = Vec::new();

    graph.for_each_visible(root, |id, node| {
        let Some(object) = node.render_object() else {
            return;
        };
        let Some(geometry) = resources.geometry(object.geometry) else {
            return;
        };
        if let Some(hit) = intersect(id, node, geometry, ray, mode) {
            hits.push(hit);
        }
    });

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

fn intersect(id: NodeId, node: &Node, geometry: &Geometry, ray: &Ray, mode: PickMode) -> Option<PickHit> {
    let world = node.world_matrix();
    let sphere = geometry.bounding_sphere()?.transformed(world);
    let sphere_distance = sphere.intersect_ray(ray)?;

    if mode == PickMode::BoundingSphere {
        return Some(PickHit {
            node: id,
            distance: sphere_distance,
            point: ray.point_at(sphere_distance),
        });
    }

    let inverse = world.try_inverse()?;
    let local_ray = ray.transformed(&inverse);

    let nearest = (0..geometry.draw_count() / 3)
        .filter_map(|triangle| geometry.triangle_at(triangle * 3))
        .filter_map(|[a, b, c]| local_ray.intersect_triangle(a, b, c))
        .map(|t| world.transform_point(&local_ray.point_at(t).into()).coords)
        .map(|point| (point - ray.origin).magnitude())
        .fold(None, |best: Option<f32>, d| Some(best.map_or(d, |b| b.min(d))))?;

    Some(PickHit {
        node: id,
        distance: nearest,
        point: ray.point_at(nearest),
    })
}
