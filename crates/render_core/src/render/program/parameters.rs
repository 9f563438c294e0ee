//! Program parameters
//!
//! [`ProgramParameters`] is the projection of material, geometry, object
//! and environment onto everything that changes generated shader code.
//! Both the cache key and the source prefix come from
//! [`ProgramParameters::defines`], so the two cannot drift apart: a
//! feature that reaches the source always reaches the key.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::config::{ColorSpace, Precision, RendererConfig, ShadowMapType, ToneMapping};
use crate::render::geometry::{attributes, Geometry};
use crate::render::lighting::LightCounts;
use crate::render::material::{MapSlot, Material, ShadingModel, Side};

macro_rules! shader_features {
    ($($(#[doc = $doc:literal])* $flag:ident = $bit:literal => $define:literal;)*) => {
        bitflags::bitflags! {
            /// Boolean shader features; every flag is exactly one `#define`
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
            pub struct ShaderFeatures: u32 {
                $($(#[doc = $doc])* const $flag = 1 << $bit;)*
            }
        }

        impl ShaderFeatures {
            /// Every flag with its define name, in key order
            pub const DEFINES: &'static [(ShaderFeatures, &'static str)] = &[
                $((ShaderFeatures::$flag, $define),)*
            ];
        }
    };
}

shader_features! {
    /// Base color texture
    MAP = 0 => "USE_MAP";
    /// Normal map
    NORMAL_MAP = 1 => "USE_NORMALMAP";
    /// Emissive texture
    EMISSIVE_MAP = 2 => "USE_EMISSIVEMAP";
    /// Roughness texture
    ROUGHNESS_MAP = 3 => "USE_ROUGHNESSMAP";
    /// Metalness texture
    METALNESS_MAP = 4 => "USE_METALNESSMAP";
    /// Opacity texture
    ALPHA_MAP = 5 => "USE_ALPHAMAP";
    /// Environment map
    ENV_MAP = 6 => "USE_ENVMAP";
    /// Texture coordinates are read
    UV = 7 => "USE_UV";
    /// Vertex colors
    VERTEX_COLORS = 8 => "USE_COLOR";
    /// Face normals from derivatives
    FLAT_SHADING = 9 => "FLAT_SHADED";
    /// Both faces shaded
    DOUBLE_SIDED = 10 => "DOUBLE_SIDED";
    /// Back faces shaded
    FLIP_SIDED = 11 => "FLIP_SIDED";
    /// Scene fog
    FOG = 12 => "USE_FOG";
    /// Alpha test discard
    ALPHA_TEST = 13 => "USE_ALPHATEST";
    /// Samples the transmission pre-pass
    TRANSMISSION = 14 => "USE_TRANSMISSION";
    /// Skeletal skinning
    SKINNING = 15 => "USE_SKINNING";
    /// Per-instance matrices
    INSTANCING = 16 => "USE_INSTANCING";
    /// Morph targets
    MORPH_TARGETS = 17 => "USE_MORPHTARGETS";
    /// Geometry tangents for normal mapping
    TANGENT = 18 => "USE_TANGENT";
    /// Shadow map lookups
    SHADOW_MAP = 19 => "USE_SHADOWMAP";
    /// Tone mapping applied
    TONE_MAPPED = 20 => "TONE_MAPPED";
    /// Reads light uniforms
    LIGHTS = 21 => "USE_LIGHTS";
}

impl ShaderFeatures {
    /// Define names of the set flags
    pub fn define_names(self) -> impl Iterator<Item = &'static str> {
        Self::DEFINES
            .iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
    }

    fn for_map(slot: MapSlot) -> Self {
        match slot {
            MapSlot::Map => Self::MAP,
            MapSlot::NormalMap => Self::NORMAL_MAP,
            MapSlot::EmissiveMap => Self::EMISSIVE_MAP,
            MapSlot::RoughnessMap => Self::ROUGHNESS_MAP,
            MapSlot::MetalnessMap => Self::METALNESS_MAP,
            MapSlot::AlphaMap => Self::ALPHA_MAP,
            MapSlot::EnvMap => Self::ENV_MAP,
        }
    }
}

/// One `#define NAME [VALUE]` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDefine {
    /// Macro name
    pub name: String,
    /// Macro value, empty for flags
    pub value: String,
}

impl ShaderDefine {
    fn flag(name: &str) -> Self {
        Self { name: name.to_string(), value: String::new() }
    }

    fn value(name: &str, value: impl fmt::Display) -> Self {
        Self { name: name.to_string(), value: value.to_string() }
    }
}

impl fmt::Display for ShaderDefine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "#define {}", self.name)
        } else {
            write!(f, "#define {} {}", self.name, self.value)
        }
    }
}

/// Deterministic program cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramKey(String);

impl ProgramKey {
    /// Key text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = self.0.lines();
        if let Some(family) = lines.next() {
            f.write_str(family)?;
        }
        for line in lines {
            write!(f, " | {}", line.trim_start_matches("#define "))?;
        }
        Ok(())
    }
}

/// Renderer-wide inputs to program selection
///
/// A change here re-evaluates every program binding on next use.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramEnvironment {
    /// Visible light counts
    pub lights: LightCounts,
    /// Active clipping planes
    pub clipping_planes: u32,
    /// Scene fog is enabled
    pub fog: bool,
    /// Float precision
    pub precision: Precision,
    /// Tone mapping operator
    pub tone_mapping: ToneMapping,
    /// Output color space
    pub output_color_space: ColorSpace,
    /// Shadow filtering
    pub shadow_map_type: ShadowMapType,
}

impl ProgramEnvironment {
    /// Environment from renderer settings and the frame's scene state
    pub fn new(config: &RendererConfig, lights: LightCounts, fog: bool, clipping_planes: u32) -> Self {
        Self {
            lights,
            clipping_planes,
            fog,
            precision: config.precision,
            tone_mapping: config.tone_mapping,
            output_color_space: config.output_color_space,
            shadow_map_type: config.shadow_map_type,
        }
    }
}

/// Per-object inputs to program selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectProgramFlags {
    /// Skinned mesh
    pub skinned: bool,
    /// Drawn with more than one instance
    pub instanced: bool,
}

fn tone_mapping_index(tone_mapping: ToneMapping) -> u32 {
    match tone_mapping {
        ToneMapping::None => 0,
        ToneMapping::Linear => 1,
        ToneMapping::Reinhard => 2,
        ToneMapping::AcesFilmic => 3,
    }
}

fn color_space_index(color_space: ColorSpace) -> u32 {
    match color_space {
        ColorSpace::Linear => 0,
        ColorSpace::Srgb => 1,
    }
}

fn shadow_map_index(shadow_map_type: ShadowMapType) -> u32 {
    match shadow_map_type {
        ShadowMapType::Disabled => 0,
        ShadowMapType::Basic => 1,
        ShadowMapType::Pcf => 2,
        ShadowMapType::PcfSoft => 3,
    }
}

/// Everything that selects a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramParameters {
    /// Shading model (custom shaders carry their source)
    pub shading: ShadingModel,
    /// Boolean features
    pub features: ShaderFeatures,
    /// Light counts (zero for unlit models)
    pub lights: LightCounts,
    /// Clipping planes
    pub clipping_planes: u32,
    /// Morph target count
    pub morph_targets: u32,
    /// Float precision
    pub precision: Precision,
    /// Tone mapping operator
    pub tone_mapping: ToneMapping,
    /// Output color space
    pub output_color_space: ColorSpace,
    /// Shadow filtering
    pub shadow_map_type: ShadowMapType,
    /// Material defines
    pub custom_defines: BTreeMap<String, String>,
}

impl ProgramParameters {
    /// Project material, geometry, object and environment onto program inputs
    pub fn new(
        material: &Material,
        geometry: &Geometry,
        object: ObjectProgramFlags,
        environment: &ProgramEnvironment,
    ) -> Self {
        let shading = material.shading().clone();
        let lit = shading.is_lit();
        let mut features = ShaderFeatures::empty();

        for (slot, _) in material.maps() {
            features |= ShaderFeatures::for_map(slot);
        }
        let uv_maps = ShaderFeatures::MAP
            | ShaderFeatures::NORMAL_MAP
            | ShaderFeatures::EMISSIVE_MAP
            | ShaderFeatures::ROUGHNESS_MAP
            | ShaderFeatures::METALNESS_MAP
            | ShaderFeatures::ALPHA_MAP;
        features.set(ShaderFeatures::UV, features.intersects(uv_maps));
        features.set(
            ShaderFeatures::TANGENT,
            features.contains(ShaderFeatures::NORMAL_MAP) && geometry.has_attribute(attributes::TANGENT),
        );

        features.set(ShaderFeatures::VERTEX_COLORS, material.vertex_colors());
        features.set(ShaderFeatures::FLAT_SHADING, material.flat_shading());
        features.set(ShaderFeatures::DOUBLE_SIDED, material.side() == Side::Double);
        features.set(ShaderFeatures::FLIP_SIDED, material.side() == Side::Back);
        features.set(ShaderFeatures::FOG, material.fog() && environment.fog);
        features.set(ShaderFeatures::ALPHA_TEST, material.alpha_test() > 0.0);
        features.set(ShaderFeatures::TRANSMISSION, material.is_transmissive());
        features.set(ShaderFeatures::SKINNING, object.skinned);
        features.set(ShaderFeatures::INSTANCING, object.instanced);
        features.set(ShaderFeatures::MORPH_TARGETS, geometry.morph_target_count() > 0);
        features.set(ShaderFeatures::LIGHTS, lit);
        features.set(
            ShaderFeatures::SHADOW_MAP,
            lit && environment.shadow_map_type != ShadowMapType::Disabled,
        );
        features.set(
            ShaderFeatures::TONE_MAPPED,
            material.tone_mapped() && environment.tone_mapping != ToneMapping::None,
        );

        Self {
            shading,
            features,
            lights: if lit { environment.lights } else { LightCounts::default() },
            clipping_planes: environment.clipping_planes,
            morph_targets: u32::try_from(geometry.morph_target_count()).unwrap_or(u32::MAX),
            precision: environment.precision,
            tone_mapping: environment.tone_mapping,
            output_color_space: environment.output_color_space,
            shadow_map_type: environment.shadow_map_type,
            custom_defines: material.defines().clone(),
        }
    }

    /// Every define of the generated source, in key order
    pub fn defines(&self) -> Vec<ShaderDefine> {
        let mut defines: Vec<ShaderDefine> = self.features.define_names().map(ShaderDefine::flag).collect();

        defines.push(ShaderDefine::value("PRECISION", self.precision.qualifier()));
        if self.features.contains(ShaderFeatures::LIGHTS) {
            defines.push(ShaderDefine::value("NUM_DIR_LIGHTS", self.lights.directional));
            defines.push(ShaderDefine::value("NUM_POINT_LIGHTS", self.lights.point));
            defines.push(ShaderDefine::value("NUM_SPOT_LIGHTS", self.lights.spot));
            defines.push(ShaderDefine::value("NUM_HEMI_LIGHTS", self.lights.hemisphere));
            defines.push(ShaderDefine::value("NUM_RECT_AREA_LIGHTS", self.lights.rect_area));
        }
        if self.clipping_planes > 0 {
            defines.push(ShaderDefine::value("NUM_CLIPPING_PLANES", self.clipping_planes));
        }
        if self.features.contains(ShaderFeatures::MORPH_TARGETS) {
            defines.push(ShaderDefine::value("MORPHTARGETS_COUNT", self.morph_targets));
        }
        if self.features.contains(ShaderFeatures::TONE_MAPPED) {
            defines.push(ShaderDefine::value("TONE_MAPPING", tone_mapping_index(self.tone_mapping)));
        }
        if self.features.contains(ShaderFeatures::SHADOW_MAP) {
            defines.push(ShaderDefine::value("SHADOWMAP_TYPE", shadow_map_index(self.shadow_map_type)));
        }
        defines.push(ShaderDefine::value("OUTPUT_COLOR_SPACE", color_space_index(self.output_color_space)));

        defines.extend(self.custom_defines.iter().map(|(name, value)| ShaderDefine {
            name: name.clone(),
            value: value.clone(),
        }));
        defines
    }

    /// Cache key: shader family, custom source digest and every define line
    pub fn cache_key(&self) -> ProgramKey {
        let mut key = String::from(self.shading.family());
        if let ShadingModel::Custom(shader) = &self.shading {
            let mut hasher = DefaultHasher::new();
            shader.vertex.hash(&mut hasher);
            shader.fragment.hash(&mut hasher);
            key.push_str(&format!("#{:016x}", hasher.finish()));
        }
        // Rendered define lines, so equal keys always mean equal source prefixes
        for define in self.defines() {
            key.push('\n');
            key.push_str(&define.to_string());
        }
        ProgramKey(key)
    }

    /// Whether the program reads light uniforms
    pub fn uses_lights(&self) -> bool {
        self.features.contains(ShaderFeatures::LIGHTS)
    }

    /// Whether the program samples the transmission target
    pub fn uses_transmission(&self) -> bool {
        self.features.contains(ShaderFeatures::TRANSMISSION)
    }

    /// Vertex attributes the generated vertex stage declares
    pub fn required_attributes(&self) -> Vec<String> {
        let mut required = vec![attributes::POSITION.to_string()];
        let f = self.features;

        if self.shading.uses_normals() && !f.contains(ShaderFeatures::FLAT_SHADING) {
            required.push(attributes::NORMAL.to_string());
        }
        if f.contains(ShaderFeatures::UV) {
            required.push(attributes::UV.to_string());
        }
        if f.contains(ShaderFeatures::VERTEX_COLORS) {
            required.push(attributes::COLOR.to_string());
        }
        if f.contains(ShaderFeatures::TANGENT) {
            required.push(attributes::TANGENT.to_string());
        }
        if f.contains(ShaderFeatures::SKINNING) {
            required.push(attributes::SKIN_INDEX.to_string());
            required.push(attributes::SKIN_WEIGHT.to_string());
        }
        if f.contains(ShaderFeatures::INSTANCING) {
            required.push(attributes::INSTANCE_MATRIX.to_string());
        }
        for i in 0..self.morph_targets as usize {
            required.push(attributes::morph_target(i));
        }
        required
    }
}
