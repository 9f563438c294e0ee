//! Lighting system
//!
//! Lights live on scene nodes and take their position and orientation from
//! the node's world matrix. Once per frame the renderer collects every
//! visible light into a [`LightState`]: per-type counts (part of the program
//! key) plus a packed uniform block whose version only moves when the
//! packed bytes actually change.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Vec3, Vec4, Mat4, matrix_position};

/// Light types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    /// Directional light (like sunlight), shining along the node's -Z
    Directional,
    /// Point light (like a lightbulb)
    Point,
    /// Spot light (like a flashlight), shining along the node's -Z
    Spot,
    /// Constant light added to every surface
    Ambient,
    /// Sky/ground gradient, sky along the node's +Y
    Hemisphere,
    /// Rectangular area emitter facing the node's -Z
    RectArea,
}

/// Light source attached to a scene node
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Light type
    pub light_type: LightType,
    /// Light color (sky color for hemisphere lights)
    pub color: Vec3,
    /// Light intensity
    pub intensity: f32,
    /// Light range for point/spot lights (0 = unlimited)
    pub range: f32,
    /// Distance falloff exponent for point/spot lights
    pub decay: f32,
    /// Inner cone angle for spot lights (in radians)
    pub inner_cone_angle: f32,
    /// Outer cone angle for spot lights (in radians)
    pub outer_cone_angle: f32,
    /// Ground color for hemisphere lights
    pub ground_color: Vec3,
    /// Width and height of rect area lights
    pub size: (f32, f32),
}

impl Light {
    fn base(light_type: LightType, color: Vec3, intensity: f32) -> Self {
        Self {
            light_type,
            color,
            intensity,
            range: 0.0,
            decay: 2.0,
            inner_cone_angle: 0.0,
            outer_cone_angle: 0.0,
            ground_color: Vec3::zeros(),
            size: (1.0, 1.0),
        }
    }

    /// Create a directional light
    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self::base(LightType::Directional, color, intensity)
    }

    /// Create a point light
    pub fn point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            range,
            ..Self::base(LightType::Point, color, intensity)
        }
    }

    /// Create a spot light
    pub fn spot(
        color: Vec3,
        intensity: f32,
        range: f32,
        inner_cone_angle: f32,
        outer_cone_angle: f32,
    ) -> Self {
        Self {
            range,
            inner_cone_angle,
            outer_cone_angle,
            ..Self::base(LightType::Spot, color, intensity)
        }
    }

    /// Create an ambient light
    pub fn ambient(color: Vec3, intensity: f32) -> Self {
        Self::base(LightType::Ambient, color, intensity)
    }

    /// Create a hemisphere light
    pub fn hemisphere(sky_color: Vec3, ground_color: Vec3, intensity: f32) -> Self {
        Self {
            ground_color,
            ..Self::base(LightType::Hemisphere, sky_color, intensity)
        }
    }

    /// Create a rectangular area light
    pub fn rect_area(color: Vec3, intensity: f32, width: f32, height: f32) -> Self {
        Self {
            size: (width, height),
            ..Self::base(LightType::RectArea, color, intensity)
        }
    }
}

/// Number of lights of each type that shaders must loop over
///
/// Ambient lights fold into a single color and are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LightCounts {
    /// Directional lights
    pub directional: u32,
    /// Point lights
    pub point: u32,
    /// Spot lights
    pub spot: u32,
    /// Hemisphere lights
    pub hemisphere: u32,
    /// Rect area lights
    pub rect_area: u32,
}

impl LightCounts {
    /// Total number of counted lights
    pub fn total(&self) -> u32 {
        self.directional + self.point + self.spot + self.hemisphere + self.rect_area
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct LightHeader {
    ambient: [f32; 4],
    counts: [u32; 8],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct DirectionalLightUniform {
    direction: [f32; 4],
    color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct PointLightUniform {
    position: [f32; 4],
    color: [f32; 4],
    // range, decay
    params: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct SpotLightUniform {
    position: [f32; 4],
    direction: [f32; 4],
    color: [f32; 4],
    // cos(outer), cos(inner), range, decay
    cone: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct HemisphereLightUniform {
    direction: [f32; 4],
    sky_color: [f32; 4],
    ground_color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct RectAreaLightUniform {
    position: [f32; 4],
    half_width: [f32; 4],
    half_height: [f32; 4],
    color: [f32; 4],
}

fn xyz(v: Vec3, w: f32) -> [f32; 4] {
    [v.x, v.y, v.z, w]
}

fn axis(world: &Mat4, local: Vec3) -> Vec3 {
    let v = world.transform_vector(&local);
    let length = v.magnitude();
    if length > f32::EPSILON { v / length } else { local }
}

/// Aggregated lighting for one frame
///
/// Call [`begin`](Self::begin), [`push`](Self::push) every light, then
/// [`finish`](Self::finish). Directions point from the surface towards the
/// light.
#[derive(Debug, Default)]
pub struct LightState {
    counts: LightCounts,
    ambient: Vec3,
    directional: Vec<DirectionalLightUniform>,
    point: Vec<PointLightUniform>,
    spot: Vec<SpotLightUniform>,
    hemisphere: Vec<HemisphereLightUniform>,
    rect_area: Vec<RectAreaLightUniform>,
    packed: Vec<u8>,
    version: u64,
}

impl LightState {
    /// Create an empty light state
    pub fn new() -> Self {
        Self::default()
    }

    /// Start collecting a new frame's lights
    pub fn begin(&mut self) {
        self.ambient = Vec3::zeros();
        self.directional.clear();
        self.point.clear();
        self.spot.clear();
        self.hemisphere.clear();
        self.rect_area.clear();
    }

    /// Add a light placed by `world`
    pub fn push(&mut self, light: &Light, world: &Mat4) {
        let color = light.color * light.intensity;
        let position = matrix_position(world);
        match light.light_type {
            LightType::Ambient => self.ambient += color,
            LightType::Directional => self.directional.push(DirectionalLightUniform {
                direction: xyz(axis(world, Vec3::z()), 0.0),
                color: xyz(color, 1.0),
            }),
            LightType::Point => self.point.push(PointLightUniform {
                position: xyz(position, 1.0),
                color: xyz(color, 1.0),
                params: [light.range, light.decay, 0.0, 0.0],
            }),
            LightType::Spot => self.spot.push(SpotLightUniform {
                position: xyz(position, 1.0),
                direction: xyz(axis(world, Vec3::z()), 0.0),
                color: xyz(color, 1.0),
                cone: [
                    light.outer_cone_angle.cos(),
                    light.inner_cone_angle.cos(),
                    light.range,
                    light.decay,
                ],
            }),
            LightType::Hemisphere => self.hemisphere.push(HemisphereLightUniform {
                direction: xyz(axis(world, Vec3::y()), 0.0),
                sky_color: xyz(color, 1.0),
                ground_color: xyz(light.ground_color * light.intensity, 1.0),
            }),
            LightType::RectArea => {
                let half_width = world.transform_vector(&Vec3::x()) * (light.size.0 * 0.5);
                let half_height = world.transform_vector(&Vec3::y()) * (light.size.1 * 0.5);
                self.rect_area.push(RectAreaLightUniform {
                    position: xyz(position, 1.0),
                    half_width: xyz(half_width, 0.0),
                    half_height: xyz(half_height, 0.0),
                    color: xyz(color, 1.0),
                });
            }
        }
    }

    /// Finish the frame: update counts and repack
    ///
    /// Returns true when the packed block differs from the previous frame's,
    /// in which case the version is bumped.
    pub fn finish(&mut self) -> bool {
        let len = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        self.counts = LightCounts {
            directional: len(self.directional.len()),
            point: len(self.point.len()),
            spot: len(self.spot.len()),
            hemisphere: len(self.hemisphere.len()),
            rect_area: len(self.rect_area.len()),
        };

        let header = LightHeader {
            ambient: xyz(self.ambient, 1.0),
            counts: [
                self.counts.directional,
                self.counts.point,
                self.counts.spot,
                self.counts.hemisphere,
                self.counts.rect_area,
                0,
                0,
                0,
            ],
        };

        let mut packed = Vec::with_capacity(self.packed.len());
        packed.extend_from_slice(bytemuck::bytes_of(&header));
        packed.extend_from_slice(bytemuck::cast_slice(&self.directional));
        packed.extend_from_slice(bytemuck::cast_slice(&self.point));
        packed.extend_from_slice(bytemuck::cast_slice(&self.spot));
        packed.extend_from_slice(bytemuck::cast_slice(&self.hemisphere));
        packed.extend_from_slice(bytemuck::cast_slice(&self.rect_area));

        if packed == self.packed && self.version != 0 {
            return false;
        }
        self.packed = packed;
        self.version += 1;
        log::trace!("Light state v{} ({:?})", self.version, self.counts);
        true
    }

    /// Per-type light counts of the last finished frame
    pub fn counts(&self) -> LightCounts {
        self.counts
    }

    /// Ambient color (sum of every ambient light)
    pub fn ambient(&self) -> Vec4 {
        Vec4::new(self.ambient.x, self.ambient.y, self.ambient.z, 1.0)
    }

    /// Version of the packed block; starts at 1 after the first `finish`
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Packed uniform block
    pub fn as_bytes(&self) -> &[u8] {
        &self.packed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn collect(state: &mut LightState, lights: &[(Light, Mat4)]) -> bool {
        state.begin();
        for (light, world) in lights {
            state.push(light, world);
        }
        state.finish()
    }

    #[test]
    fn test_counts_exclude_ambient() {
        let mut state = LightState::new();
        collect(&mut state, &[
            (Light::ambient(Vec3::new(1.0, 1.0, 1.0), 0.2), Mat4::identity()),
            (Light::directional(Vec3::new(1.0, 1.0, 1.0), 1.0), Mat4::identity()),
            (Light::point(Vec3::new(1.0, 0.0, 0.0), 2.0, 10.0), Mat4::identity()),
            (Light::point(Vec3::new(0.0, 1.0, 0.0), 2.0, 10.0), Mat4::identity()),
        ]);

        let counts = state.counts();
        assert_eq!(counts.directional, 1);
        assert_eq!(counts.point, 2);
        assert_eq!(counts.total(), 3);
        assert_relative_eq!(state.ambient().x, 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_version_moves_only_on_data_change() {
        let mut state = LightState::new();
        let lights = vec![(Light::directional(Vec3::new(1.0, 1.0, 1.0), 1.0), Mat4::identity())];

        assert!(collect(&mut state, &lights));
        assert_eq!(state.version(), 1);

        assert!(!collect(&mut state, &lights));
        assert_eq!(state.version(), 1);

        let brighter = vec![(Light::directional(Vec3::new(1.0, 1.0, 1.0), 3.0), Mat4::identity())];
        assert!(collect(&mut state, &brighter));
        assert_eq!(state.version(), 2);
        assert_eq!(state.counts().directional, 1);
    }

    #[test]
    fn test_empty_state_still_has_a_version() {
        let mut state = LightState::new();
        assert!(collect(&mut state, &[]));
        assert_eq!(state.version(), 1);
        assert!(!state.as_bytes().is_empty());
    }
}
