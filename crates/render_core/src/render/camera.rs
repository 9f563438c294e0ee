//! Camera
//!
//! A perspective camera described by position, target and up vector. View
//! space is right-handed with the camera looking down -Z; clip space depth
//! runs from -1 (near) to 1 (far).

use crate::foundation::math::{Mat4, Mat4Ext, Vec3, Vec4};
use crate::scene::{Frustum, Ray};

/// 3D perspective camera
///
/// Matrices are computed on demand. Depth used for sorting is the distance
/// along the view direction, not the Euclidean distance to the eye.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking at the origin with +Y up
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::y(),
            fov: fov_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Update camera target (look-at point)
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Point the camera at `target` from `position`
    pub fn look_at(&mut self, position: Vec3, target: Vec3, up: Vec3) {
        self.position = position;
        self.target = target;
        self.up = up;
    }

    /// Update the aspect ratio after a viewport resize
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// View-to-clip matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }

    /// World-to-clip matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space frustum
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.view_projection_matrix())
    }

    /// Unit view direction
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// World-space ray through a normalized device coordinate
    ///
    /// `ndc_x` and `ndc_y` run from -1 to 1 with +Y up. Returns `None` when
    /// the camera matrices are degenerate.
    pub fn screen_to_world_ray(&self, ndc_x: f32, ndc_y: f32) -> Option<Ray> {
        let inv_view_proj = self.view_projection_matrix().try_inverse()?;

        let unproject = |z: f32| -> Option<Vec3> {
            let h = inv_view_proj * Vec4::new(ndc_x, ndc_y, z, 1.0);
            (h.w.abs() > f32::EPSILON).then(|| Vec3::new(h.x / h.w, h.y / h.w, h.z / h.w))
        };

        let world_near = unproject(-1.0)?;
        let world_far = unproject(1.0)?;

        // Origin at the eye so hits between eye and near plane still count
        Some(Ray::new(self.position, world_far - world_near))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 0.0, 5.0), 60.0, 16.0 / 9.0, 0.1, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_center_ray_points_at_target() {
        let camera = Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 100.0);
        let ray = camera.screen_to_world_ray(0.0, 0.0).unwrap();

        assert_relative_eq!(ray.origin, Vec3::new(0.0, 0.0, 10.0));
        assert_relative_eq!(ray.direction, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_corner_ray_matches_field_of_view() {
        let camera = Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 90.0, 1.0, 0.1, 100.0);
        let ray = camera.screen_to_world_ray(0.0, 1.0).unwrap();

        // 90 degree vertical fov: top edge is 45 degrees up
        assert_relative_eq!(ray.direction.y, -ray.direction.z, epsilon = 1e-4);
    }

    #[test]
    fn test_projection_maps_near_and_far() {
        let camera = Camera::perspective(Vec3::zeros(), 60.0, 1.0, 1.0, 10.0);
        let projection = camera.projection_matrix();

        let near = projection * Vec4::new(0.0, 0.0, -1.0, 1.0);
        let far = projection * Vec4::new(0.0, 0.0, -10.0, 1.0);
        assert_relative_eq!(near.z / near.w, -1.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }
}
