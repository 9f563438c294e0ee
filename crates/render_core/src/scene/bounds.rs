//! Bounding volumes, planes, frustums and rays
//!
//! Spatial primitives shared by culling (render-list construction) and
//! picking. Frustum planes are extracted from a view-projection matrix with
//! the Gribb-Hartmann method and point inwards.

use crate::foundation::math::{Vec3, Vec4, Mat4, matrix_position, max_axis_scale};

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }
    
    /// Smallest box enclosing every point, `None` for an empty set
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Self::new(first, first);
        for p in iter {
            aabb.min = aabb.min.inf(&p);
            aabb.max = aabb.max.sup(&p);
        }
        Some(aabb)
    }
    
    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
    
    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
    
    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }
    
    /// Test ray intersection with this AABB using slab method
    /// Returns the distance to the entry point if the ray intersects, None otherwise
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let inv = |d: f32| if d != 0.0 { 1.0 / d } else { f32::INFINITY };
        let inv_dir = Vec3::new(inv(ray.direction.x), inv(ray.direction.y), inv(ray.direction.z));
        
        let t1 = (self.min.x - ray.origin.x) * inv_dir.x;
        let t2 = (self.max.x - ray.origin.x) * inv_dir.x;
        let t3 = (self.min.y - ray.origin.y) * inv_dir.y;
        let t4 = (self.max.y - ray.origin.y) * inv_dir.y;
        let t5 = (self.min.z - ray.origin.z) * inv_dir.z;
        let t6 = (self.max.z - ray.origin.z) * inv_dir.z;
        
        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));
        
        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

/// A bounding sphere for culling and picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// The center position of the sphere
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
    
    /// Sphere centred on the box, enclosing every point of `points`
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let center = AABB::from_points(points.iter().copied())?.center();
        let radius = points
            .iter()
            .map(|p| (p - center).magnitude_squared())
            .fold(0.0_f32, f32::max)
            .sqrt();
        Some(Self::new(center, radius))
    }
    
    /// Move the sphere into another space; the radius grows by the largest axis scale
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let center = matrix.transform_point(&self.center.into()).coords;
        Self::new(center, self.radius * max_axis_scale(matrix))
    }

    /// Test ray intersection with this sphere
    /// Returns the distance to the nearest hit in front of the origin
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let oc = ray.origin - self.center;
        let a = ray.direction.dot(&ray.direction);
        let b = 2.0 * oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;
        
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }
        
        let sqrt_discriminant = discriminant.sqrt();
        let t1 = (-b - sqrt_discriminant) / (2.0 * a);
        let t2 = (-b + sqrt_discriminant) / (2.0 * a);
        
        if t1 >= 0.0 {
            Some(t1)
        } else if t2 >= 0.0 {
            // Origin inside the sphere
            Some(0.0)
        } else {
            None
        }
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal: normal.normalize(), distance }
    }
    
    /// Plane from the raw `(a, b, c, d)` coefficients, normalized
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = Vec3::new(coefficients.x, coefficients.y, coefficients.z);
        let length = normal.magnitude();
        if length <= f32::EPSILON {
            return Self { normal: Vec3::zeros(), distance: coefficients.w };
        }
        Self {
            normal: normal / length,
            distance: coefficients.w / length,
        }
    }
    
    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// Frustum for visibility culling
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix
    ///
    /// Gribb-Hartmann extraction for clip space depth in -1..1. Planes are
    /// in the space the matrix maps from (world space for `P * V`).
    pub fn from_matrix(vp_matrix: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { vp_matrix.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        
        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r3 + r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }
    
    /// Check if a sphere is inside or intersects the frustum
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(sphere.center) >= -sphere.radius)
    }
    
    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        for plane in &self.planes {
            // Corner furthest along the plane normal
            let mut p = aabb.min;
            if plane.normal.x >= 0.0 { p.x = aabb.max.x; }
            if plane.normal.y >= 0.0 { p.y = aabb.max.y; }
            if plane.normal.z >= 0.0 { p.z = aabb.max.z; }
            
            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }
        true
    }
}

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray
    pub origin: Vec3,
    /// The direction of the ray (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }
    
    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
    
    /// The same ray expressed in another space (direction is not renormalized)
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let origin = matrix.transform_point(&self.origin.into()).coords;
        let direction = matrix.transform_vector(&self.direction);
        Self { origin, direction }
    }
    
    /// Möller-Trumbore ray-triangle intersection
    ///
    /// Returns the ray parameter `t` of the hit. Both faces are hit.
    pub fn intersect_triangle(&self, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
        const EPSILON: f32 = 0.000_001;
        
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let h = self.direction.cross(&edge2);
        let a = edge1.dot(&h);
        
        if a.abs() < EPSILON {
            return None;
        }
        
        let f = 1.0 / a;
        let s = self.origin - v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        
        let q = s.cross(&edge1);
        let v = f * self.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        
        let t = f * edge2.dot(&q);
        (t >= 0.0).then_some(t)
    }
}

/// World-space position of a bounding sphere's center, or the matrix origin
pub fn world_center(sphere: Option<&BoundingSphere>, world: &Mat4) -> Vec3 {
    sphere.map_or_else(
        || matrix_position(world),
        |s| world.transform_point(&s.center.into()).coords,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4Ext;
    use approx::assert_relative_eq;
    
    fn test_frustum() -> Frustum {
        let projection = Mat4::perspective(60_f32.to_radians(), 1.0, 0.1, 100.0);
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros(), Vec3::y());
        Frustum::from_matrix(&(projection * view))
    }
    
    #[test]
    fn test_aabb_contains_point() {
        let aabb = AABB::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        
        assert!(aabb.contains_point(Vec3::zeros()));
        assert!(aabb.contains_point(Vec3::new(0.5, 0.5, 0.5)));
        assert!(!aabb.contains_point(Vec3::new(2.0, 0.0, 0.0)));
    }
    
    #[test]
    fn test_frustum_sphere_inside_and_outside() {
        let frustum = test_frustum();
        
        assert!(frustum.intersects_sphere(&BoundingSphere::new(Vec3::zeros(), 1.0)));
        // Behind the camera
        assert!(!frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(0.0, 0.0, 20.0), 1.0)));
        // Far off to the side
        assert!(!frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(100.0, 0.0, 0.0), 1.0)));
        // Straddling the left plane
        assert!(frustum.intersects_sphere(&BoundingSphere::new(Vec3::new(-6.2, 0.0, 0.0), 1.0)));
    }
    
    #[test]
    fn test_frustum_aabb() {
        let frustum = test_frustum();
        assert!(frustum.intersects_aabb(&AABB::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0))));
        assert!(!frustum.intersects_aabb(&AABB::new(Vec3::new(50.0, 50.0, 0.0), Vec3::new(51.0, 51.0, 1.0))));
    }
    
    #[test]
    fn test_sphere_transformed_by_scale() {
        let sphere = BoundingSphere::new(Vec3::new(1.0, 0.0, 0.0), 1.0);
        let matrix = Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0)) * Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 3.0, 1.0));
        let moved = sphere.transformed(&matrix);
        
        assert_relative_eq!(moved.center, Vec3::new(2.0, 5.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(moved.radius, 3.0, epsilon = 1e-6);
    }
    
    #[test]
    fn test_ray_sphere_and_triangle() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        
        let hit = BoundingSphere::new(Vec3::zeros(), 1.0).intersect_ray(&ray);
        assert_relative_eq!(hit.unwrap(), 9.0, epsilon = 1e-5);
        
        let t = ray.intersect_triangle(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(t.unwrap(), 10.0, epsilon = 1e-5);
        
        let miss = ray.intersect_triangle(
            Vec3::new(2.0, 2.0, 0.0),
            Vec3::new(3.0, 2.0, 0.0),
            Vec3::new(2.0, 3.0, 0.0),
        );
        assert!(miss.is_none());
    }
    
    #[test]
    fn test_aabb_ray_slab() {
        let aabb = AABB::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(aabb.intersect_ray(&ray).unwrap(), 4.0, epsilon = 1e-6);
    }
}
