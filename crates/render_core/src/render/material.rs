//! Material definitions
//!
//! A material is a bag of shading parameters plus the feature switches that
//! select a shader program. It keeps two counters:
//!
//! - `version` moves on every change and tells the binder to refresh the
//!   material uniform block and pipeline state.
//! - `program_version` moves only when a change can alter the generated
//!   shader (texture slot filled or emptied, shading model, defines, ...),
//!   which makes the binder re-derive the program key.
//!
//! Builders (`with_*`) are for construction; setters on a registered
//! material keep both counters honest.

use std::collections::BTreeMap;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;

use super::device::TextureId;

/// Built-in shading models plus user-provided shaders
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShadingModel {
    /// Unlit color and texture
    Basic,
    /// Diffuse-only lighting
    Lambert,
    /// Blinn-Phong lighting
    Phong,
    /// Metallic-roughness PBR
    Standard,
    /// Standard with transmission and extra lobes
    Physical,
    /// Visualizes normals
    Normal,
    /// Visualizes depth
    Depth,
    /// User shader bodies wrapped with the generated prefix
    Custom(CustomShader),
}

/// Source of a user shader
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomShader {
    /// Identity of the shader; part of the program key
    pub name: String,
    /// Vertex stage body
    pub vertex: String,
    /// Fragment stage body
    pub fragment: String,
    /// Receives light uniforms
    pub lit: bool,
}

impl ShadingModel {
    /// Shader family name used in program keys and `SHADER_NAME`
    pub fn family(&self) -> &str {
        match self {
            ShadingModel::Basic => "basic",
            ShadingModel::Lambert => "lambert",
            ShadingModel::Phong => "phong",
            ShadingModel::Standard => "standard",
            ShadingModel::Physical => "physical",
            ShadingModel::Normal => "normal",
            ShadingModel::Depth => "depth",
            ShadingModel::Custom(shader) => &shader.name,
        }
    }

    /// Whether the model reads the light state
    pub fn is_lit(&self) -> bool {
        match self {
            ShadingModel::Lambert | ShadingModel::Phong | ShadingModel::Standard | ShadingModel::Physical => true,
            ShadingModel::Custom(shader) => shader.lit,
            ShadingModel::Basic | ShadingModel::Normal | ShadingModel::Depth => false,
        }
    }

    /// Whether the model reads vertex normals
    pub fn uses_normals(&self) -> bool {
        self.is_lit() || matches!(self, ShadingModel::Normal)
    }
}

/// Texture slots a material can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapSlot {
    /// Base color
    Map,
    /// Tangent-space normals
    NormalMap,
    /// Emissive color
    EmissiveMap,
    /// Roughness (green channel)
    RoughnessMap,
    /// Metalness (blue channel)
    MetalnessMap,
    /// Opacity
    AlphaMap,
    /// Environment reflection
    EnvMap,
}

impl MapSlot {
    /// Every slot in binding order
    pub const ALL: [MapSlot; 7] = [
        MapSlot::Map,
        MapSlot::NormalMap,
        MapSlot::EmissiveMap,
        MapSlot::RoughnessMap,
        MapSlot::MetalnessMap,
        MapSlot::AlphaMap,
        MapSlot::EnvMap,
    ];

    /// Sampler uniform name
    pub fn uniform_name(self) -> &'static str {
        match self {
            MapSlot::Map => "map",
            MapSlot::NormalMap => "normalMap",
            MapSlot::EmissiveMap => "emissiveMap",
            MapSlot::RoughnessMap => "roughnessMap",
            MapSlot::MetalnessMap => "metalnessMap",
            MapSlot::AlphaMap => "alphaMap",
            MapSlot::EnvMap => "envMap",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Color blending mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Blending {
    /// Overwrite
    None,
    /// Standard alpha blending
    #[default]
    Normal,
    /// Add source to destination
    Additive,
    /// Subtract source from destination
    Subtractive,
    /// Multiply destination by source
    Multiply,
}

/// Which faces are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    /// Front faces only
    #[default]
    Front,
    /// Back faces only
    Back,
    /// Both faces
    Double,
}

/// Depth and stencil comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompareFunc {
    /// Never pass
    Never,
    /// Pass if less
    Less,
    /// Pass if equal
    Equal,
    /// Pass if less or equal
    #[default]
    LessEqual,
    /// Pass if greater
    Greater,
    /// Pass if not equal
    NotEqual,
    /// Pass if greater or equal
    GreaterEqual,
    /// Always pass
    Always,
}

/// Stencil buffer update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StencilOp {
    /// Keep the current value
    #[default]
    Keep,
    /// Set to zero
    Zero,
    /// Set to the reference value
    Replace,
    /// Increment and clamp
    Increment,
    /// Decrement and clamp
    Decrement,
    /// Bitwise invert
    Invert,
}

/// Stencil test configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StencilState {
    /// Enable the stencil test
    pub enabled: bool,
    /// Comparison against the reference
    pub func: CompareFunc,
    /// Reference value
    pub reference: i32,
    /// Mask applied before comparing
    pub read_mask: u32,
    /// Mask applied when writing
    pub write_mask: u32,
    /// Operation when the stencil test fails
    pub fail: StencilOp,
    /// Operation when the depth test fails
    pub depth_fail: StencilOp,
    /// Operation when both pass
    pub pass: StencilOp,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            enabled: false,
            func: CompareFunc::Always,
            reference: 0,
            read_mask: 0xff,
            write_mask: 0xff,
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
        }
    }
}

/// Uniform-only parameters; editing them never changes the program
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialParams {
    /// Base color
    pub color: Vec3,
    /// Opacity (used when transparent)
    pub opacity: f32,
    /// Emissive color
    pub emissive: Vec3,
    /// Emissive multiplier
    pub emissive_intensity: f32,
    /// Specular color (Phong)
    pub specular: Vec3,
    /// Specular exponent (Phong)
    pub shininess: f32,
    /// Roughness (Standard/Physical)
    pub roughness: f32,
    /// Metalness (Standard/Physical)
    pub metalness: f32,
    /// Index of refraction (Physical)
    pub ior: f32,
    /// Volume thickness for transmission (Physical)
    pub thickness: f32,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            color: Vec3::new(1.0, 1.0, 1.0),
            opacity: 1.0,
            emissive: Vec3::zeros(),
            emissive_intensity: 1.0,
            specular: Vec3::new(0.07, 0.07, 0.07),
            shininess: 30.0,
            roughness: 1.0,
            metalness: 0.0,
            ior: 1.5,
            thickness: 0.0,
        }
    }
}

/// Material uniform block layout
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialUniforms {
    /// RGB color + opacity
    pub color: [f32; 4],
    /// RGB emissive + intensity
    pub emissive: [f32; 4],
    /// RGB specular + shininess
    pub specular: [f32; 4],
    /// Roughness, metalness, transmission, ior
    pub surface: [f32; 4],
    /// Alpha-test cutoff, thickness, unused, unused
    pub extra: [f32; 4],
}

/// A surface description
#[derive(Debug, Clone)]
pub struct Material {
    /// Debug name
    pub name: String,
    shading: ShadingModel,
    params: MaterialParams,
    maps: [Option<TextureId>; MapSlot::ALL.len()],
    transmission: f32,
    alpha_test: f32,
    vertex_colors: bool,
    flat_shading: bool,
    fog: bool,
    tone_mapped: bool,
    transparent: bool,
    blending: Blending,
    side: Side,
    depth_test: bool,
    depth_write: bool,
    depth_func: CompareFunc,
    stencil: StencilState,
    color_write: bool,
    visible: bool,
    defines: BTreeMap<String, String>,
    version: u64,
    program_version: u64,
}

impl Material {
    /// Create a material with the given shading model and default parameters
    pub fn new(shading: ShadingModel) -> Self {
        Self {
            name: String::new(),
            shading,
            params: MaterialParams::default(),
            maps: [None; MapSlot::ALL.len()],
            transmission: 0.0,
            alpha_test: 0.0,
            vertex_colors: false,
            flat_shading: false,
            fog: true,
            tone_mapped: true,
            transparent: false,
            blending: Blending::Normal,
            side: Side::Front,
            depth_test: true,
            depth_write: true,
            depth_func: CompareFunc::LessEqual,
            stencil: StencilState::default(),
            color_write: true,
            visible: true,
            defines: BTreeMap::new(),
            version: 0,
            program_version: 0,
        }
    }

    /// Unlit material
    pub fn basic(color: Vec3) -> Self {
        Self::new(ShadingModel::Basic).with_color(color)
    }

    /// Metallic-roughness material
    pub fn standard(color: Vec3, roughness: f32, metalness: f32) -> Self {
        let mut material = Self::new(ShadingModel::Standard).with_color(color);
        material.params.roughness = roughness;
        material.params.metalness = metalness;
        material
    }

    /// Physical material with a transmission amount
    pub fn physical(color: Vec3, transmission: f32) -> Self {
        Self::new(ShadingModel::Physical).with_color(color).with_transmission(transmission)
    }

    /// Set the debug name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the base color
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.params.color = color;
        self
    }

    /// Set the opacity
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.params.opacity = opacity;
        self
    }

    /// Fill a texture slot
    pub fn with_map(mut self, slot: MapSlot, texture: TextureId) -> Self {
        self.maps[slot.index()] = Some(texture);
        self
    }

    /// Enable alpha blending
    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    /// Set the transmission amount
    pub fn with_transmission(mut self, transmission: f32) -> Self {
        self.transmission = transmission.clamp(0.0, 1.0);
        self
    }

    /// Set the alpha-test cutoff (0 disables)
    pub fn with_alpha_test(mut self, cutoff: f32) -> Self {
        self.alpha_test = cutoff;
        self
    }

    /// Multiply by the vertex color attribute
    pub fn with_vertex_colors(mut self, enabled: bool) -> Self {
        self.vertex_colors = enabled;
        self
    }

    /// Set the rendered side
    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// Set the blending mode
    pub fn with_blending(mut self, blending: Blending) -> Self {
        self.blending = blending;
        self
    }

    /// Set depth test and depth write
    pub fn with_depth(mut self, test: bool, write: bool) -> Self {
        self.depth_test = test;
        self.depth_write = write;
        self
    }

    /// Add a preprocessor define
    pub fn with_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.insert(name.into(), value.into());
        self
    }

    /// Shading model
    pub fn shading(&self) -> &ShadingModel {
        &self.shading
    }

    /// Uniform-only parameters
    pub fn params(&self) -> &MaterialParams {
        &self.params
    }

    /// Texture in a slot
    pub fn map(&self, slot: MapSlot) -> Option<TextureId> {
        self.maps[slot.index()]
    }

    /// Filled texture slots in binding order
    pub fn maps(&self) -> impl Iterator<Item = (MapSlot, TextureId)> + '_ {
        MapSlot::ALL
            .iter()
            .filter_map(|&slot| self.map(slot).map(|texture| (slot, texture)))
    }

    /// Transmission amount
    pub fn transmission(&self) -> f32 {
        self.transmission
    }

    /// Alpha-test cutoff
    pub fn alpha_test(&self) -> f32 {
        self.alpha_test
    }

    /// Uses vertex colors
    pub fn vertex_colors(&self) -> bool {
        self.vertex_colors
    }

    /// Uses face normals
    pub fn flat_shading(&self) -> bool {
        self.flat_shading
    }

    /// Affected by scene fog
    pub fn fog(&self) -> bool {
        self.fog
    }

    /// Tone mapping applied
    pub fn tone_mapped(&self) -> bool {
        self.tone_mapped
    }

    /// Alpha blended
    pub fn transparent(&self) -> bool {
        self.transparent
    }

    /// Configured blending mode
    pub fn blending(&self) -> Blending {
        self.blending
    }

    /// Blending actually applied: opaque materials with normal blending draw without blending
    pub fn effective_blending(&self) -> Blending {
        if !self.transparent && self.blending == Blending::Normal {
            Blending::None
        } else {
            self.blending
        }
    }

    /// Rendered side
    pub fn side(&self) -> Side {
        self.side
    }

    /// Depth test enabled
    pub fn depth_test(&self) -> bool {
        self.depth_test
    }

    /// Depth write enabled
    pub fn depth_write(&self) -> bool {
        self.depth_write
    }

    /// Depth comparison
    pub fn depth_func(&self) -> CompareFunc {
        self.depth_func
    }

    /// Stencil configuration
    pub fn stencil(&self) -> &StencilState {
        &self.stencil
    }

    /// Color writes enabled
    pub fn color_write(&self) -> bool {
        self.color_write
    }

    /// Drawn at all
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// User defines
    pub fn defines(&self) -> &BTreeMap<String, String> {
        &self.defines
    }

    /// Needs the transmission pre-pass
    pub fn is_transmissive(&self) -> bool {
        self.transmission > 0.0
    }

    /// Any change counter
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Program-affecting change counter
    pub fn program_version(&self) -> u64 {
        self.program_version
    }

    /// Edit uniform-only parameters
    pub fn params_mut(&mut self) -> &mut MaterialParams {
        self.touch();
        &mut self.params
    }

    /// Fill or empty a texture slot
    ///
    /// Swapping one texture for another keeps the program; filling an empty
    /// slot or emptying a filled one does not.
    pub fn set_map(&mut self, slot: MapSlot, texture: Option<TextureId>) {
        let previous = std::mem::replace(&mut self.maps[slot.index()], texture);
        if previous.is_some() != texture.is_some() {
            self.needs_update();
        } else if previous != texture {
            self.touch();
        }
    }

    /// Change the shading model
    pub fn set_shading(&mut self, shading: ShadingModel) {
        if self.shading != shading {
            self.shading = shading;
            self.needs_update();
        }
    }

    /// Set the transmission amount
    pub fn set_transmission(&mut self, transmission: f32) {
        let transmission = transmission.clamp(0.0, 1.0);
        let toggled = (self.transmission > 0.0) != (transmission > 0.0);
        self.transmission = transmission;
        if toggled {
            self.needs_update();
        } else {
            self.touch();
        }
    }

    /// Set the alpha-test cutoff (0 disables)
    pub fn set_alpha_test(&mut self, cutoff: f32) {
        let toggled = (self.alpha_test > 0.0) != (cutoff > 0.0);
        self.alpha_test = cutoff;
        if toggled {
            self.needs_update();
        } else {
            self.touch();
        }
    }

    /// Toggle vertex colors
    pub fn set_vertex_colors(&mut self, enabled: bool) {
        self.set_feature(|m| &mut m.vertex_colors, enabled);
    }

    /// Toggle flat shading
    pub fn set_flat_shading(&mut self, enabled: bool) {
        self.set_feature(|m| &mut m.flat_shading, enabled);
    }

    /// Toggle fog participation
    pub fn set_fog(&mut self, enabled: bool) {
        self.set_feature(|m| &mut m.fog, enabled);
    }

    /// Toggle tone mapping
    pub fn set_tone_mapped(&mut self, enabled: bool) {
        self.set_feature(|m| &mut m.tone_mapped, enabled);
    }

    /// Set the rendered side
    pub fn set_side(&mut self, side: Side) {
        if self.side != side {
            self.side = side;
            self.needs_update();
        }
    }

    /// Toggle alpha blending
    pub fn set_transparent(&mut self, transparent: bool) {
        self.set_state(|m| &mut m.transparent, transparent);
    }

    /// Set the blending mode
    pub fn set_blending(&mut self, blending: Blending) {
        self.set_state(|m| &mut m.blending, blending);
    }

    /// Toggle the depth test
    pub fn set_depth_test(&mut self, enabled: bool) {
        self.set_state(|m| &mut m.depth_test, enabled);
    }

    /// Toggle depth writes
    pub fn set_depth_write(&mut self, enabled: bool) {
        self.set_state(|m| &mut m.depth_write, enabled);
    }

    /// Set the depth comparison
    pub fn set_depth_func(&mut self, func: CompareFunc) {
        self.set_state(|m| &mut m.depth_func, func);
    }

    /// Set the stencil configuration
    pub fn set_stencil(&mut self, stencil: StencilState) {
        self.set_state(|m| &mut m.stencil, stencil);
    }

    /// Toggle color writes
    pub fn set_color_write(&mut self, enabled: bool) {
        self.set_state(|m| &mut m.color_write, enabled);
    }

    /// Show or hide every object using this material
    pub fn set_visible(&mut self, visible: bool) {
        self.set_state(|m| &mut m.visible, visible);
    }

    /// Add or replace a preprocessor define
    pub fn set_define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if self.defines.get(&name) != Some(&value) {
            self.defines.insert(name, value);
            self.needs_update();
        }
    }

    /// Remove a preprocessor define
    pub fn remove_define(&mut self, name: &str) {
        if self.defines.remove(name).is_some() {
            self.needs_update();
        }
    }

    /// Force the program to be re-derived on next use
    pub fn needs_update(&mut self) {
        self.program_version += 1;
        self.touch();
    }

    /// Uniform block for the current parameters
    pub fn uniforms(&self) -> MaterialUniforms {
        let p = &self.params;
        MaterialUniforms {
            color: [p.color.x, p.color.y, p.color.z, p.opacity],
            emissive: [p.emissive.x, p.emissive.y, p.emissive.z, p.emissive_intensity],
            specular: [p.specular.x, p.specular.y, p.specular.z, p.shininess],
            surface: [p.roughness, p.metalness, self.transmission, p.ior],
            extra: [self.alpha_test, p.thickness, 0.0, 0.0],
        }
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    fn set_feature(&mut self, field: fn(&mut Self) -> &mut bool, value: bool) {
        let slot = field(self);
        if *slot != value {
            *slot = value;
            self.needs_update();
        }
    }

    fn set_state<T: PartialEq>(&mut self, field: fn(&mut Self) -> &mut T, value: T) {
        let slot = field(self);
        if *slot != value {
            *slot = value;
            self.touch();
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(ShadingModel::Basic)
    }
}
