//! GLSL snippets assembled by the source builder
//!
//! Every chunk is guarded by a feature define, so including a chunk that
//! is not needed costs nothing but compile time. The builder still only
//! includes what the parameters select.

pub const VERSION: &str = "#version 300 es";

pub const COMMON: &str = r#"
uniform CameraBlock {
    mat4 viewMatrix;
    mat4 projectionMatrix;
    vec4 cameraPosition;
    vec4 fogColor;
    vec4 fogRange;
};

uniform ObjectBlock {
    mat4 modelMatrix;
    mat4 modelViewMatrix;
    mat3 normalMatrix;
};
"#;

pub const MATERIAL: &str = r#"
uniform MaterialBlock {
    vec4 diffuse;
    vec4 emissive;
    vec4 specular;
    vec4 surface;
    vec4 extra;
};
"#;

pub const LIGHTS: &str = r#"
struct DirectionalLight { vec4 direction; vec4 color; };
struct PointLight { vec4 position; vec4 color; vec4 params; };
struct SpotLight { vec4 position; vec4 direction; vec4 color; vec4 cone; };
struct HemisphereLight { vec4 direction; vec4 skyColor; vec4 groundColor; };
struct RectAreaLight { vec4 position; vec4 halfWidth; vec4 halfHeight; vec4 color; };

uniform LightsBlock {
    vec4 ambientLightColor;
#if NUM_DIR_LIGHTS > 0
    DirectionalLight directionalLights[NUM_DIR_LIGHTS];
#endif
#if NUM_POINT_LIGHTS > 0
    PointLight pointLights[NUM_POINT_LIGHTS];
#endif
#if NUM_SPOT_LIGHTS > 0
    SpotLight spotLights[NUM_SPOT_LIGHTS];
#endif
#if NUM_HEMI_LIGHTS > 0
    HemisphereLight hemisphereLights[NUM_HEMI_LIGHTS];
#endif
#if NUM_RECT_AREA_LIGHTS > 0
    RectAreaLight rectAreaLights[NUM_RECT_AREA_LIGHTS];
#endif
};
"#;

pub const ATTRIBUTES: &str = r#"
in vec3 position;
#ifdef USE_NORMAL
in vec3 normal;
#endif
#ifdef USE_UV
in vec2 uv;
#endif
#ifdef USE_COLOR
in vec4 color;
#endif
#ifdef USE_TANGENT
in vec4 tangent;
#endif
#ifdef USE_SKINNING
in vec4 skin_index;
in vec4 skin_weight;
uniform mat4 boneMatrices[64];
#endif
#ifdef USE_INSTANCING
in mat4 instance_matrix;
#endif
"#;

pub const MORPH_TARGETS: &str = r#"
#ifdef USE_MORPHTARGETS
uniform float morphTargetInfluences[MORPHTARGETS_COUNT];
#endif
"#;

pub const CLIPPING_VERTEX: &str = r#"
#if NUM_CLIPPING_PLANES > 0
out vec3 vClipPosition;
#endif
"#;

pub const CLIPPING_FRAGMENT: &str = r#"
#if NUM_CLIPPING_PLANES > 0
in vec3 vClipPosition;
uniform vec4 clippingPlanes[NUM_CLIPPING_PLANES];
#endif
"#;

pub const VERTEX_MAIN: &str = r#"
out vec3 vViewPosition;
out vec3 vNormal;
out vec2 vUv;
out vec4 vColor;

void main() {
    vec4 local = vec4(position, 1.0);
    vec3 objectNormal = vec3(0.0, 0.0, 1.0);
#ifdef USE_NORMAL
    objectNormal = normal;
#endif
#ifdef USE_SKINNING
    mat4 skin = skin_weight.x * boneMatrices[int(skin_index.x)]
              + skin_weight.y * boneMatrices[int(skin_index.y)]
              + skin_weight.z * boneMatrices[int(skin_index.z)]
              + skin_weight.w * boneMatrices[int(skin_index.w)];
    local = skin * local;
    objectNormal = mat3(skin) * objectNormal;
#endif
#ifdef USE_INSTANCING
    local = instance_matrix * local;
    objectNormal = mat3(instance_matrix) * objectNormal;
#endif
    vec4 viewPosition = modelViewMatrix * local;
    vViewPosition = -viewPosition.xyz;
    vNormal = normalize(normalMatrix * objectNormal);
#ifdef USE_UV
    vUv = uv;
#endif
#ifdef USE_COLOR
    vColor = color;
#else
    vColor = vec4(1.0);
#endif
#if NUM_CLIPPING_PLANES > 0
    vClipPosition = -viewPosition.xyz;
#endif
    gl_Position = projectionMatrix * viewPosition;
}
"#;

pub const FRAGMENT_HEADER: &str = r#"
in vec3 vViewPosition;
in vec3 vNormal;
in vec2 vUv;
in vec4 vColor;
out vec4 fragColor;

#ifdef USE_MAP
uniform sampler2D map;
#endif
#ifdef USE_NORMALMAP
uniform sampler2D normalMap;
#endif
#ifdef USE_EMISSIVEMAP
uniform sampler2D emissiveMap;
#endif
#ifdef USE_ROUGHNESSMAP
uniform sampler2D roughnessMap;
#endif
#ifdef USE_METALNESSMAP
uniform sampler2D metalnessMap;
#endif
#ifdef USE_ALPHAMAP
uniform sampler2D alphaMap;
#endif
#ifdef USE_ENVMAP
uniform samplerCube envMap;
#endif
"#;

pub const TRANSMISSION: &str = r#"
#ifdef USE_TRANSMISSION
uniform sampler2D transmissionSamplerMap;
vec3 transmittedLight(vec2 screenUv) {
    return texture(transmissionSamplerMap, screenUv).rgb * extra.x;
}
#endif
"#;

pub const FOG: &str = r#"
#ifdef USE_FOG
vec3 applyFog(vec3 color) {
    float depth = length(vViewPosition);
    float factor = smoothstep(fogRange.x, fogRange.y, depth);
    return mix(color, fogColor.rgb, factor);
}
#endif
"#;

pub const TONE_MAPPING: &str = r#"
#ifdef TONE_MAPPED
vec3 toneMap(vec3 color) {
#if TONE_MAPPING == 1
    return color;
#elif TONE_MAPPING == 2
    return color / (color + vec3(1.0));
#else
    color *= 0.6;
    return clamp((color * (2.51 * color + 0.03)) / (color * (2.43 * color + 0.59) + 0.14), 0.0, 1.0);
#endif
}
#endif
"#;

pub const FRAGMENT_BEGIN: &str = r#"
void main() {
#if NUM_CLIPPING_PLANES > 0
    for (int i = 0; i < NUM_CLIPPING_PLANES; i++) {
        if (dot(vClipPosition, clippingPlanes[i].xyz) > clippingPlanes[i].w) discard;
    }
#endif
    vec4 diffuseColor = vec4(diffuse.rgb, diffuse.a) * vColor;
#ifdef USE_MAP
    diffuseColor *= texture(map, vUv);
#endif
#ifdef USE_ALPHAMAP
    diffuseColor.a *= texture(alphaMap, vUv).g;
#endif
#ifdef USE_ALPHATEST
    if (diffuseColor.a < extra.y) discard;
#endif
    vec3 normal = normalize(vNormal);
#ifdef FLAT_SHADED
    normal = normalize(cross(dFdx(vViewPosition), dFdy(vViewPosition)));
#endif
#ifdef DOUBLE_SIDED
    normal *= gl_FrontFacing ? 1.0 : -1.0;
#endif
    vec3 outgoing = diffuseColor.rgb;
"#;

pub const BODY_UNLIT: &str = r#"
"#;

pub const BODY_NORMAL: &str = r#"
    outgoing = normal * 0.5 + 0.5;
"#;

pub const BODY_DEPTH: &str = r#"
    outgoing = vec3(1.0 - gl_FragCoord.z);
"#;

pub const BODY_LAMBERT: &str = r#"
    vec3 irradiance = ambientLightColor.rgb;
#if NUM_DIR_LIGHTS > 0
    for (int i = 0; i < NUM_DIR_LIGHTS; i++) {
        irradiance += max(dot(normal, directionalLights[i].direction.xyz), 0.0) * directionalLights[i].color.rgb;
    }
#endif
#if NUM_POINT_LIGHTS > 0
    for (int i = 0; i < NUM_POINT_LIGHTS; i++) {
        vec3 toLight = pointLights[i].position.xyz + vViewPosition;
        float attenuation = pow(clamp(1.0 - length(toLight) / pointLights[i].params.x, 0.0, 1.0), pointLights[i].params.y);
        irradiance += max(dot(normal, normalize(toLight)), 0.0) * pointLights[i].color.rgb * attenuation;
    }
#endif
    outgoing = diffuseColor.rgb * irradiance;
"#;

pub const BODY_PHONG: &str = r#"
    vec3 irradiance = ambientLightColor.rgb;
    vec3 highlight = vec3(0.0);
    vec3 viewDir = normalize(vViewPosition);
#if NUM_DIR_LIGHTS > 0
    for (int i = 0; i < NUM_DIR_LIGHTS; i++) {
        vec3 l = directionalLights[i].direction.xyz;
        irradiance += max(dot(normal, l), 0.0) * directionalLights[i].color.rgb;
        highlight += pow(max(dot(normal, normalize(l + viewDir)), 0.0), surface.z) * specular.rgb;
    }
#endif
    outgoing = diffuseColor.rgb * irradiance + highlight;
"#;

pub const BODY_STANDARD: &str = r#"
    float roughness = surface.x;
    float metalness = surface.y;
#ifdef USE_ROUGHNESSMAP
    roughness *= texture(roughnessMap, vUv).g;
#endif
#ifdef USE_METALNESSMAP
    metalness *= texture(metalnessMap, vUv).b;
#endif
    vec3 albedo = diffuseColor.rgb * (1.0 - metalness);
    vec3 f0 = mix(vec3(0.04), diffuseColor.rgb, metalness);
    vec3 irradiance = ambientLightColor.rgb * albedo;
    vec3 viewDir = normalize(vViewPosition);
#if NUM_DIR_LIGHTS > 0
    for (int i = 0; i < NUM_DIR_LIGHTS; i++) {
        vec3 l = directionalLights[i].direction.xyz;
        vec3 h = normalize(l + viewDir);
        float nl = max(dot(normal, l), 0.0);
        float a = roughness * roughness;
        float nh = max(dot(normal, h), 0.0);
        float d = a * a / (3.14159265 * pow(nh * nh * (a * a - 1.0) + 1.0, 2.0));
        irradiance += (albedo / 3.14159265 + f0 * d * 0.25) * nl * directionalLights[i].color.rgb;
    }
#endif
    outgoing = irradiance;
#ifdef USE_TRANSMISSION
    outgoing = mix(outgoing, transmittedLight(gl_FragCoord.xy / vec2(textureSize(transmissionSamplerMap, 0))), extra.x);
#endif
"#;

pub const FRAGMENT_END: &str = r#"
#ifdef USE_EMISSIVEMAP
    outgoing += emissive.rgb * emissive.a * texture(emissiveMap, vUv).rgb;
#else
    outgoing += emissive.rgb * emissive.a;
#endif
#ifdef TONE_MAPPED
    outgoing = toneMap(outgoing);
#endif
#if OUTPUT_COLOR_SPACE == 1
    outgoing = pow(outgoing, vec3(1.0 / 2.2));
#endif
#ifdef USE_FOG
    outgoing = applyFog(outgoing);
#endif
    fragColor = vec4(outgoing, diffuseColor.a);
}
"#;
