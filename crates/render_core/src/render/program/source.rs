//! Shader source assembly

use crate::render::device::ShaderSource;
use crate::render::material::ShadingModel;

use super::chunks;
use super::parameters::{ProgramParameters, ShaderFeatures};

fn prefix(params: &ProgramParameters, stage: &str) -> String {
    let mut out = format!(
        "{}\nprecision {} float;\n#define SHADER_NAME {}\n#define SHADER_STAGE_{}\n",
        chunks::VERSION,
        params.precision.qualifier(),
        params.shading.family(),
        stage,
    );
    if params.shading.uses_normals() && !params.features.contains(ShaderFeatures::FLAT_SHADING) {
        out.push_str("#define USE_NORMAL\n");
    }
    for define in params.defines() {
        out.push_str(&define.to_string());
        out.push('\n');
    }
    out
}

fn fragment_body(shading: &ShadingModel) -> &'static str {
    match shading {
        ShadingModel::Basic | ShadingModel::Custom(_) => chunks::BODY_UNLIT,
        ShadingModel::Normal => chunks::BODY_NORMAL,
        ShadingModel::Depth => chunks::BODY_DEPTH,
        ShadingModel::Lambert => chunks::BODY_LAMBERT,
        ShadingModel::Phong => chunks::BODY_PHONG,
        ShadingModel::Standard | ShadingModel::Physical => chunks::BODY_STANDARD,
    }
}

/// Generate vertex and fragment source for a parameter set
///
/// The source is a pure function of the parameters: equal parameters
/// always produce byte-identical source.
pub fn build_source(params: &ProgramParameters) -> ShaderSource {
    let features = params.features;

    let mut vertex = prefix(params, "VERTEX");
    vertex.push_str(chunks::COMMON);
    vertex.push_str(chunks::ATTRIBUTES);
    if features.contains(ShaderFeatures::MORPH_TARGETS) {
        vertex.push_str(chunks::MORPH_TARGETS);
    }
    if params.clipping_planes > 0 {
        vertex.push_str(chunks::CLIPPING_VERTEX);
    }

    let mut fragment = prefix(params, "FRAGMENT");
    fragment.push_str(chunks::COMMON);
    fragment.push_str(chunks::MATERIAL);
    if params.uses_lights() {
        fragment.push_str(chunks::LIGHTS);
    }
    if params.clipping_planes > 0 {
        fragment.push_str(chunks::CLIPPING_FRAGMENT);
    }
    fragment.push_str(chunks::FRAGMENT_HEADER);
    if features.contains(ShaderFeatures::TRANSMISSION) {
        fragment.push_str(chunks::TRANSMISSION);
    }
    if features.contains(ShaderFeatures::FOG) {
        fragment.push_str(chunks::FOG);
    }
    if features.contains(ShaderFeatures::TONE_MAPPED) {
        fragment.push_str(chunks::TONE_MAPPING);
    }

    match &params.shading {
        ShadingModel::Custom(shader) => {
            vertex.push_str(&shader.vertex);
            fragment.push_str(&shader.fragment);
        }
        shading => {
            vertex.push_str(chunks::VERTEX_MAIN);
            fragment.push_str(chunks::FRAGMENT_BEGIN);
            fragment.push_str(fragment_body(shading));
            fragment.push_str(chunks::FRAGMENT_END);
        }
    }

    ShaderSource {
        name: params.shading.family().to_string(),
        vertex,
        fragment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use crate::foundation::math::Vec3;
    use crate::render::geometry::Geometry;
    use crate::render::lighting::LightCounts;
    use crate::render::material::Material;
    use crate::render::program::parameters::{ObjectProgramFlags, ProgramEnvironment};

    fn params(material: &Material, lights: LightCounts) -> ProgramParameters {
        let env = ProgramEnvironment::new(&RendererConfig::default(), lights, true, 0);
        ProgramParameters::new(material, &Geometry::plane(1.0, 1.0), ObjectProgramFlags::default(), &env)
    }

    #[test]
    fn test_source_is_deterministic() {
        let material = Material::standard(Vec3::new(1.0, 1.0, 1.0), 0.5, 0.0);
        let p = params(&material, LightCounts { directional: 2, ..LightCounts::default() });
        assert_eq!(build_source(&p), build_source(&p));
    }

    #[test]
    fn test_prefix_carries_every_define() {
        let material = Material::standard(Vec3::new(1.0, 1.0, 1.0), 0.5, 0.0).with_define("QUALITY", "3");
        let p = params(&material, LightCounts { point: 4, ..LightCounts::default() });
        let source = build_source(&p);

        for define in p.defines() {
            assert!(source.vertex.contains(&define.to_string()), "vertex lacks {}", define);
            assert!(source.fragment.contains(&define.to_string()), "fragment lacks {}", define);
        }
        assert!(source.fragment.contains("#define NUM_POINT_LIGHTS 4"));
        assert!(source.fragment.contains("#define QUALITY 3"));
        assert!(source.fragment.contains("LightsBlock"));
    }

    #[test]
    fn test_unlit_source_has_no_light_block() {
        let material = Material::basic(Vec3::new(1.0, 0.0, 0.0));
        let source = build_source(&params(&material, LightCounts { directional: 1, ..LightCounts::default() }));
        assert!(!source.fragment.contains("LightsBlock"));
        assert!(source.fragment.contains("#define SHADER_NAME basic"));
    }
}
