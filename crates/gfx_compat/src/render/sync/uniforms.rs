//! Uniform names and resolved locations of the fixed-function program
//!
//! Locations are looked up once after the program links. A name the program
//! does not declare resolves to `None` and is never written.

use crate::render::api::{GraphicsContext, ProgramId, UniformLocation};
use crate::render::state::{MAX_LIGHT_COUNT, MAX_TEXTURE_STAGE_COUNT};

/// Names of the global uniforms
pub mod names {
    /// `mat4` eye to clip
    pub const PROJECTION_MATRIX: &str = "projection_matrix";
    /// `mat4` world to eye
    pub const VIEW_MATRIX: &str = "view_matrix";
    /// `mat4` object to world
    pub const MODEL_MATRIX: &str = "model_matrix";
    /// `mat4` object to eye
    pub const MODEL_VIEW_MATRIX: &str = "model_view_matrix";
    /// `mat4` normal transform
    pub const NORMAL_MATRIX: &str = "normal_matrix";
    /// `mat4` world to shadow map clip space
    pub const SHADOW_MATRIX: &str = "shadow_matrix";

    /// `bool`
    pub const LIGHTING_ENABLED: &str = "lighting_enabled";
    /// `bool` selects the per-fragment lighting branch
    pub const PER_PIXEL_LIGHTING: &str = "per_pixel_lighting";
    /// `vec4`
    pub const GLOBAL_AMBIENT: &str = "global_ambient";
    /// `bool`
    pub const SMOOTH_SHADING: &str = "smooth_shading";
    /// `vec4`
    pub const SHADOW_COLOR: &str = "shadow_color";

    /// `vec4`
    pub const MATERIAL_AMBIENT: &str = "material_ambient";
    /// `vec4`
    pub const MATERIAL_DIFFUSE: &str = "material_diffuse";
    /// `vec4`
    pub const MATERIAL_SPECULAR: &str = "material_specular";
    /// `vec4`
    pub const MATERIAL_EMISSIVE: &str = "material_emissive";
    /// `float`
    pub const MATERIAL_SHININESS: &str = "material_shininess";

    /// `bool`
    pub const FOG_ENABLED: &str = "fog_enabled";
    /// `int`
    pub const FOG_MODE: &str = "fog_mode";
    /// `vec2` start and end distance
    pub const FOG_RANGE: &str = "fog_range";
    /// `float`
    pub const FOG_DENSITY: &str = "fog_density";
    /// `vec4`
    pub const FOG_COLOR: &str = "fog_color";

    /// `bool`
    pub const ALPHA_TEST_ENABLED: &str = "alpha_test_enabled";
    /// `int`
    pub const ALPHA_TEST_FUNC: &str = "alpha_test_func";
    /// `float`
    pub const ALPHA_REFERENCE: &str = "alpha_reference";
}

/// Name of a field of light slot `index`
pub fn light_uniform_name(index: usize, field: &str) -> String {
    format!("lights[{}].{}", index, field)
}

/// Name of a field of texture stage `index`
pub fn stage_uniform_name(index: usize, field: &str) -> String {
    format!("texture_stages[{}].{}", index, field)
}

const LIGHT_FIELDS: [&str; 10] = [
    "enabled",
    "type",
    "position",
    "direction",
    "ambient",
    "diffuse",
    "specular",
    "attenuation",
    "spot_angle",
    "spot_intensity",
];

const STAGE_FIELDS: [&str; 18] = [
    "enabled",
    "sampler",
    "color_operation",
    "color_arg1",
    "color_arg2",
    "alpha_operation",
    "alpha_arg1",
    "alpha_arg2",
    "factor",
    "texgen_enabled",
    "texgen_mode[0]",
    "texgen_mode[1]",
    "texgen_mode[2]",
    "texgen_mode[3]",
    "texgen_plane[0]",
    "texgen_plane[1]",
    "texgen_plane[2]",
    "texgen_plane[3]",
];

/// Every uniform name of the fixed-function program interface
pub fn all_uniform_names() -> Vec<String> {
    let globals = [
        names::PROJECTION_MATRIX,
        names::VIEW_MATRIX,
        names::MODEL_MATRIX,
        names::MODEL_VIEW_MATRIX,
        names::NORMAL_MATRIX,
        names::SHADOW_MATRIX,
        names::LIGHTING_ENABLED,
        names::PER_PIXEL_LIGHTING,
        names::GLOBAL_AMBIENT,
        names::SMOOTH_SHADING,
        names::SHADOW_COLOR,
        names::MATERIAL_AMBIENT,
        names::MATERIAL_DIFFUSE,
        names::MATERIAL_SPECULAR,
        names::MATERIAL_EMISSIVE,
        names::MATERIAL_SHININESS,
        names::FOG_ENABLED,
        names::FOG_MODE,
        names::FOG_RANGE,
        names::FOG_DENSITY,
        names::FOG_COLOR,
        names::ALPHA_TEST_ENABLED,
        names::ALPHA_TEST_FUNC,
        names::ALPHA_REFERENCE,
    ];

    let mut all: Vec<String> = globals.iter().map(|name| name.to_string()).collect();
    for index in 0..MAX_LIGHT_COUNT {
        all.extend(LIGHT_FIELDS.iter().map(|field| light_uniform_name(index, field)));
    }
    for index in 0..MAX_TEXTURE_STAGE_COUNT {
        all.extend(STAGE_FIELDS.iter().map(|field| stage_uniform_name(index, field)));
    }
    all
}

fn lookup<C: GraphicsContext>(context: &C, program: ProgramId, name: &str) -> Option<UniformLocation> {
    let location = context.uniform_location(program, name);
    if location.is_none() {
        log::trace!("Program has no uniform '{}'", name);
    }
    location
}

/// Locations of one light slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightUniforms {
    /// `bool`
    pub enabled: Option<UniformLocation>,
    /// `int` light type code
    pub light_type: Option<UniformLocation>,
    /// `vec4` homogeneous position
    pub position: Option<UniformLocation>,
    /// `vec3`
    pub direction: Option<UniformLocation>,
    /// `vec4`
    pub ambient: Option<UniformLocation>,
    /// `vec4`
    pub diffuse: Option<UniformLocation>,
    /// `vec4`
    pub specular: Option<UniformLocation>,
    /// `vec3` constant, linear, quadratic
    pub attenuation: Option<UniformLocation>,
    /// `float`
    pub spot_angle: Option<UniformLocation>,
    /// `float`
    pub spot_intensity: Option<UniformLocation>,
}

impl LightUniforms {
    fn resolve<C: GraphicsContext>(context: &C, program: ProgramId, index: usize) -> Self {
        let find = |field: &str| lookup(context, program, &light_uniform_name(index, field));
        Self {
            enabled: find("enabled"),
            light_type: find("type"),
            position: find("position"),
            direction: find("direction"),
            ambient: find("ambient"),
            diffuse: find("diffuse"),
            specular: find("specular"),
            attenuation: find("attenuation"),
            spot_angle: find("spot_angle"),
            spot_intensity: find("spot_intensity"),
        }
    }
}

/// Locations of one texture stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageUniforms {
    /// `bool`
    pub enabled: Option<UniformLocation>,
    /// `sampler2D` unit
    pub sampler: Option<UniformLocation>,
    /// `int`
    pub color_operation: Option<UniformLocation>,
    /// `int`
    pub color_arg1: Option<UniformLocation>,
    /// `int`
    pub color_arg2: Option<UniformLocation>,
    /// `int`
    pub alpha_operation: Option<UniformLocation>,
    /// `int`
    pub alpha_arg1: Option<UniformLocation>,
    /// `int`
    pub alpha_arg2: Option<UniformLocation>,
    /// `vec4`
    pub factor: Option<UniformLocation>,
    /// `bool` any coordinate generated
    pub texgen_enabled: Option<UniformLocation>,
    /// `int` per S, T, R, Q
    pub texgen_mode: [Option<UniformLocation>; 4],
    /// `vec4` per S, T, R, Q
    pub texgen_plane: [Option<UniformLocation>; 4],
}

impl StageUniforms {
    fn resolve<C: GraphicsContext>(context: &C, program: ProgramId, index: usize) -> Self {
        let find = |field: &str| lookup(context, program, &stage_uniform_name(index, field));
        Self {
            enabled: find("enabled"),
            sampler: find("sampler"),
            color_operation: find("color_operation"),
            color_arg1: find("color_arg1"),
            color_arg2: find("color_arg2"),
            alpha_operation: find("alpha_operation"),
            alpha_arg1: find("alpha_arg1"),
            alpha_arg2: find("alpha_arg2"),
            factor: find("factor"),
            texgen_enabled: find("texgen_enabled"),
            texgen_mode: std::array::from_fn(|coord| find(&format!("texgen_mode[{}]", coord))),
            texgen_plane: std::array::from_fn(|coord| find(&format!("texgen_plane[{}]", coord))),
        }
    }
}

/// Every uniform location the synchronizer writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniformLocations {
    /// See [`names::PROJECTION_MATRIX`]
    pub projection_matrix: Option<UniformLocation>,
    /// See [`names::VIEW_MATRIX`]
    pub view_matrix: Option<UniformLocation>,
    /// See [`names::MODEL_MATRIX`]
    pub model_matrix: Option<UniformLocation>,
    /// See [`names::MODEL_VIEW_MATRIX`]
    pub model_view_matrix: Option<UniformLocation>,
    /// See [`names::NORMAL_MATRIX`]
    pub normal_matrix: Option<UniformLocation>,
    /// See [`names::SHADOW_MATRIX`]
    pub shadow_matrix: Option<UniformLocation>,
    /// See [`names::LIGHTING_ENABLED`]
    pub lighting_enabled: Option<UniformLocation>,
    /// See [`names::PER_PIXEL_LIGHTING`]
    pub per_pixel_lighting: Option<UniformLocation>,
    /// See [`names::GLOBAL_AMBIENT`]
    pub global_ambient: Option<UniformLocation>,
    /// See [`names::SMOOTH_SHADING`]
    pub smooth_shading: Option<UniformLocation>,
    /// See [`names::SHADOW_COLOR`]
    pub shadow_color: Option<UniformLocation>,
    /// See [`names::MATERIAL_AMBIENT`]
    pub material_ambient: Option<UniformLocation>,
    /// See [`names::MATERIAL_DIFFUSE`]
    pub material_diffuse: Option<UniformLocation>,
    /// See [`names::MATERIAL_SPECULAR`]
    pub material_specular: Option<UniformLocation>,
    /// See [`names::MATERIAL_EMISSIVE`]
    pub material_emissive: Option<UniformLocation>,
    /// See [`names::MATERIAL_SHININESS`]
    pub material_shininess: Option<UniformLocation>,
    /// See [`names::FOG_ENABLED`]
    pub fog_enabled: Option<UniformLocation>,
    /// See [`names::FOG_MODE`]
    pub fog_mode: Option<UniformLocation>,
    /// See [`names::FOG_RANGE`]
    pub fog_range: Option<UniformLocation>,
    /// See [`names::FOG_DENSITY`]
    pub fog_density: Option<UniformLocation>,
    /// See [`names::FOG_COLOR`]
    pub fog_color: Option<UniformLocation>,
    /// See [`names::ALPHA_TEST_ENABLED`]
    pub alpha_test_enabled: Option<UniformLocation>,
    /// See [`names::ALPHA_TEST_FUNC`]
    pub alpha_test_func: Option<UniformLocation>,
    /// See [`names::ALPHA_REFERENCE`]
    pub alpha_reference: Option<UniformLocation>,
    /// Per light slot
    pub lights: [LightUniforms; MAX_LIGHT_COUNT],
    /// Per texture stage
    pub stages: [StageUniforms; MAX_TEXTURE_STAGE_COUNT],
}

impl UniformLocations {
    /// Look up every location in a linked program
    pub fn resolve<C: GraphicsContext>(context: &C, program: ProgramId) -> Self {
        let find = |name: &str| lookup(context, program, name);

        let mut lights = [LightUniforms::default(); MAX_LIGHT_COUNT];
        for (index, slot) in lights.iter_mut().enumerate() {
            *slot = LightUniforms::resolve(context, program, index);
        }
        let mut stages = [StageUniforms::default(); MAX_TEXTURE_STAGE_COUNT];
        for (index, slot) in stages.iter_mut().enumerate() {
            *slot = StageUniforms::resolve(context, program, index);
        }

        let locations = Self {
            projection_matrix: find(names::PROJECTION_MATRIX),
            view_matrix: find(names::VIEW_MATRIX),
            model_matrix: find(names::MODEL_MATRIX),
            model_view_matrix: find(names::MODEL_VIEW_MATRIX),
            normal_matrix: find(names::NORMAL_MATRIX),
            shadow_matrix: find(names::SHADOW_MATRIX),
            lighting_enabled: find(names::LIGHTING_ENABLED),
            per_pixel_lighting: find(names::PER_PIXEL_LIGHTING),
            global_ambient: find(names::GLOBAL_AMBIENT),
            smooth_shading: find(names::SMOOTH_SHADING),
            shadow_color: find(names::SHADOW_COLOR),
            material_ambient: find(names::MATERIAL_AMBIENT),
            material_diffuse: find(names::MATERIAL_DIFFUSE),
            material_specular: find(names::MATERIAL_SPECULAR),
            material_emissive: find(names::MATERIAL_EMISSIVE),
            material_shininess: find(names::MATERIAL_SHININESS),
            fog_enabled: find(names::FOG_ENABLED),
            fog_mode: find(names::FOG_MODE),
            fog_range: find(names::FOG_RANGE),
            fog_density: find(names::FOG_DENSITY),
            fog_color: find(names::FOG_COLOR),
            alpha_test_enabled: find(names::ALPHA_TEST_ENABLED),
            alpha_test_func: find(names::ALPHA_TEST_FUNC),
            alpha_reference: find(names::ALPHA_REFERENCE),
            lights,
            stages,
        };

        log::debug!("Resolved {} uniform locations", locations.resolved_count());
        locations
    }

    /// Number of names the program actually declares
    pub fn resolved_count(&self) -> usize {
        let globals = [
            self.projection_matrix,
            self.view_matrix,
            self.model_matrix,
            self.model_view_matrix,
            self.normal_matrix,
            self.shadow_matrix,
            self.lighting_enabled,
            self.per_pixel_lighting,
            self.global_ambient,
            self.smooth_shading,
            self.shadow_color,
            self.material_ambient,
            self.material_diffuse,
            self.material_specular,
            self.material_emissive,
            self.material_shininess,
            self.fog_enabled,
            self.fog_mode,
            self.fog_range,
            self.fog_density,
            self.fog_color,
            self.alpha_test_enabled,
            self.alpha_test_func,
            self.alpha_reference,
        ];
        let lights = self.lights.iter().flat_map(|l| {
            [
                l.enabled,
                l.light_type,
                l.position,
                l.direction,
                l.ambient,
                l.diffuse,
                l.specular,
                l.attenuation,
                l.spot_angle,
                l.spot_intensity,
            ]
        });
        let stages = self.stages.iter().flat_map(|s| {
            [
                s.enabled,
                s.sampler,
                s.color_operation,
                s.color_arg1,
                s.color_arg2,
                s.alpha_operation,
                s.alpha_arg1,
                s.alpha_arg2,
                s.factor,
                s.texgen_enabled,
                s.texgen_mode[0],
                s.texgen_mode[1],
                s.texgen_mode[2],
                s.texgen_mode[3],
                s.texgen_plane[0],
                s.texgen_plane[1],
                s.texgen_plane[2],
                s.texgen_plane[3],
            ]
        });

        globals.into_iter().chain(lights).chain(stages).filter(Option::is_some).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ShaderConfig;
    use crate::render::backends::headless::HeadlessContext;

    #[test]
    fn test_indexed_names() {
        assert_eq!(light_uniform_name(3, "diffuse"), "lights[3].diffuse");
        assert_eq!(stage_uniform_name(0, "sampler"), "texture_stages[0].sampler");
    }

    #[test]
    fn test_full_interface_resolves_every_location() {
        let mut context = HeadlessContext::new();
        let program = context.compile_program(&ShaderConfig::default()).unwrap();

        let locations = UniformLocations::resolve(&context, program);
        assert_eq!(locations.resolved_count(), all_uniform_names().len());
        assert_eq!(all_uniform_names().len(), 24 + 10 * MAX_LIGHT_COUNT + 18 * MAX_TEXTURE_STAGE_COUNT);
    }

    #[test]
    fn test_missing_uniforms_resolve_to_none() {
        let mut context = HeadlessContext::new().with_declared_uniforms(&[names::PROJECTION_MATRIX, "lights[0].enabled"]);
        let program = context.compile_program(&ShaderConfig::default()).unwrap();

        let locations = UniformLocations::resolve(&context, program);
        assert!(locations.projection_matrix.is_some());
        assert!(locations.view_matrix.is_none());
        assert!(locations.lights[0].enabled.is_some());
        assert!(locations.lights[1].enabled.is_none());
        assert_eq!(locations.resolved_count(), 2);
    }
}
