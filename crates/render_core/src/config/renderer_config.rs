//! # Renderer Configuration
//!
//! Settings for the frame renderer: resource budgets, culling and sorting
//! switches, and the environment flags that take part in program selection.

use serde::{Serialize, Deserialize};

use super::{Config, ConfigError};

/// Tone mapping operator applied at the end of the fragment stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToneMapping {
    /// No tone mapping
    #[default]
    None,
    /// Linear exposure scale
    Linear,
    /// Reinhard operator
    Reinhard,
    /// ACES filmic approximation
    AcesFilmic,
}

/// Color space of the final render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorSpace {
    /// Linear sRGB primaries, no transfer function
    Linear,
    /// sRGB with the standard transfer function
    #[default]
    Srgb,
}

/// Shadow map filtering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShadowMapType {
    /// Shadows disabled
    #[default]
    Disabled,
    /// Single tap
    Basic,
    /// Percentage-closer filtering
    Pcf,
    /// Soft PCF
    PcfSoft,
}

/// Floating-point precision requested from the shader compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Precision {
    /// `lowp`
    Low,
    /// `mediump`
    Medium,
    /// `highp`
    #[default]
    High,
}

impl Precision {
    /// GLSL qualifier for this precision
    pub fn qualifier(self) -> &'static str {
        match self {
            Precision::Low => "lowp",
            Precision::Medium => "mediump",
            Precision::High => "highp",
        }
    }
}

/// # Renderer Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Maximum number of distinct compiled programs kept alive at once
    pub max_programs: usize,
    /// Maximum texture units a single draw may bind
    pub max_texture_units: u32,
    /// Global frustum culling switch
    pub frustum_culling: bool,
    /// Sort render lists; when false, traversal order is kept
    pub sort_objects: bool,
    /// Size of the off-screen target used by the transmission pre-pass
    pub transmission_target_size: (u32, u32),
    /// Tone mapping operator
    pub tone_mapping: ToneMapping,
    /// Output color space
    pub output_color_space: ColorSpace,
    /// Shadow map filtering
    pub shadow_map_type: ShadowMapType,
    /// Shader float precision
    pub precision: Precision,
    /// Default log filter used by `foundation::logging::init`
    pub log_level: String,
}

impl RendererConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            max_programs: 256,
            max_texture_units: 16,
            frustum_culling: true,
            sort_objects: true,
            transmission_target_size: (1024, 1024),
            tone_mapping: ToneMapping::None,
            output_color_space: ColorSpace::Srgb,
            shadow_map_type: ShadowMapType::Disabled,
            precision: Precision::High,
            log_level: "info".to_string(),
        }
    }
    
    /// Set the program cache capacity
    pub fn with_max_programs(mut self, max_programs: usize) -> Self {
        self.max_programs = max_programs;
        self
    }
    
    /// Set the per-draw texture unit budget
    pub fn with_max_texture_units(mut self, units: u32) -> Self {
        self.max_texture_units = units;
        self
    }
    
    /// Enable or disable frustum culling
    pub fn with_frustum_culling(mut self, enabled: bool) -> Self {
        self.frustum_culling = enabled;
        self
    }
    
    /// Enable or disable render list sorting
    pub fn with_sorting(mut self, enabled: bool) -> Self {
        self.sort_objects = enabled;
        self
    }
    
    /// Set the tone mapping operator
    pub fn with_tone_mapping(mut self, tone_mapping: ToneMapping) -> Self {
        self.tone_mapping = tone_mapping;
        self
    }
    
    /// Set the output color space
    pub fn with_output_color_space(mut self, color_space: ColorSpace) -> Self {
        self.output_color_space = color_space;
        self
    }
    
    /// Set the log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
    
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_programs == 0 {
            return Err(ConfigError::Invalid("max_programs must be at least 1".to_string()));
        }
        if self.max_texture_units == 0 {
            return Err(ConfigError::Invalid("max_texture_units must be at least 1".to_string()));
        }
        let (width, height) = self.transmission_target_size;
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid(format!(
                "transmission target must have a non-zero size, got {width}x{height}"
            )));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for RendererConfig {}
