//! Uniform synchronizer
//!
//! Turns the pending changes of a [`PipelineState`] into the minimal set of
//! uniform writes and raster state calls. Nothing is written for categories
//! that did not change since the previous flush.

use super::uniforms::UniformLocations;
use crate::render::api::{Capability, GraphicsContext, UniformLocation, UniformValue};
use crate::render::resources::TextureRegistry;
use crate::render::state::{
    DirtyFlags, PipelineState, RenderState, ShadeModel, MAX_LIGHT_COUNT, MAX_TEXTURE_STAGE_COUNT,
};

/// Pushes pipeline state into the bound program
#[derive(Debug)]
pub struct UniformSynchronizer {
    locations: UniformLocations,
    uniform_uploads: u64,
    flushes: u64,
}

impl UniformSynchronizer {
    /// Create a synchronizer writing to the given locations
    pub fn new(locations: UniformLocations) -> Self {
        Self { locations, uniform_uploads: 0, flushes: 0 }
    }

    /// Resolved locations
    pub fn locations(&self) -> &UniformLocations {
        &self.locations
    }

    /// Uniform writes issued so far
    pub fn uniform_uploads(&self) -> u64 {
        self.uniform_uploads
    }

    /// Flushes that had something to push
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    fn write<C: GraphicsContext>(
        &mut self,
        context: &mut C,
        location: Option<UniformLocation>,
        value: impl Into<UniformValue>,
    ) {
        if let Some(location) = location {
            context.set_uniform(location, value.into());
            self.uniform_uploads += 1;
        }
    }

    /// Push every pending change
    pub fn flush<C: GraphicsContext>(
        &mut self,
        context: &mut C,
        state: &mut PipelineState,
        textures: &TextureRegistry,
    ) {
        let pending = state.take_pending();
        if pending.is_empty() {
            return;
        }
        self.flushes += 1;
        log::trace!("Flushing {:?}, lights {:#b}, stages {:#b}", pending.flags, pending.lights, pending.stages);

        apply_raster(context, state, pending.flags & DirtyFlags::RASTER);
        self.push_matrices(context, state, pending.flags);
        self.push_globals(context, state, pending.flags);

        for index in (0..MAX_LIGHT_COUNT).filter(|&i| pending.light(i)) {
            self.push_light(context, state, index);
        }
        for index in (0..MAX_TEXTURE_STAGE_COUNT).filter(|&i| pending.stage(i)) {
            self.push_stage(context, state, textures, index);
        }
    }

    /// Apply only the raster part of the pending changes
    ///
    /// Used before a clear, which depends on clear color, color mask and
    /// viewport but not on any uniform.
    pub fn flush_raster<C: GraphicsContext>(&mut self, context: &mut C, state: &mut PipelineState) {
        let flags = state.take_raster_pending();
        apply_raster(context, state, flags);
    }

    fn push_matrices<C: GraphicsContext>(&mut self, context: &mut C, state: &mut PipelineState, flags: DirtyFlags) {
        use crate::render::state::TransformType;

        let locations = self.locations;
        if flags.contains(DirtyFlags::PROJECTION) {
            self.write(context, locations.projection_matrix, state.transform(TransformType::Projection));
        }
        if flags.contains(DirtyFlags::VIEW) {
            self.write(context, locations.view_matrix, state.transform(TransformType::View));
        }
        if flags.contains(DirtyFlags::WORLD) {
            self.write(context, locations.model_matrix, state.transform(TransformType::World));
            let normal = state.normal_matrix();
            self.write(context, locations.normal_matrix, normal);
        }
        if flags.intersects(DirtyFlags::VIEW | DirtyFlags::WORLD) {
            let model_view = state.model_view();
            self.write(context, locations.model_view_matrix, model_view);
        }
        if flags.contains(DirtyFlags::SHADOW_MATRIX) {
            self.write(context, locations.shadow_matrix, state.transform(TransformType::Shadow));
        }
    }

    fn push_globals<C: GraphicsContext>(&mut self, context: &mut C, state: &PipelineState, flags: DirtyFlags) {
        let locations = self.locations;

        if flags.contains(DirtyFlags::MATERIAL) {
            let material = *state.material();
            self.write(context, locations.material_ambient, material.ambient);
            self.write(context, locations.material_diffuse, material.diffuse);
            self.write(context, locations.material_specular, material.specular);
            self.write(context, locations.material_emissive, material.emissive);
            self.write(context, locations.material_shininess, material.shininess);
        }
        if flags.contains(DirtyFlags::LIGHTING) {
            self.write(context, locations.lighting_enabled, state.render_state(RenderState::Lighting));
        }
        if flags.contains(DirtyFlags::PER_PIXEL) {
            self.write(context, locations.per_pixel_lighting, state.per_pixel_lighting());
        }
        if flags.contains(DirtyFlags::GLOBAL_AMBIENT) {
            self.write(context, locations.global_ambient, state.global_ambient());
        }
        if flags.contains(DirtyFlags::SHADING) {
            self.write(context, locations.smooth_shading, state.shade_model() == ShadeModel::Smooth);
        }
        if flags.contains(DirtyFlags::SHADOW_COLOR) {
            self.write(context, locations.shadow_color, state.shadow_color());
        }
        if flags.contains(DirtyFlags::FOG) {
            let fog = state.fog_params();
            self.write(context, locations.fog_enabled, state.render_state(RenderState::Fog));
            self.write(context, locations.fog_mode, fog.mode.shader_code());
            self.write(context, locations.fog_range, UniformValue::Vec2([fog.start, fog.end]));
            self.write(context, locations.fog_density, fog.density);
            self.write(context, locations.fog_color, fog.color);
        }
        if flags.contains(DirtyFlags::ALPHA_TEST) {
            let alpha = state.alpha_test();
            self.write(context, locations.alpha_test_enabled, state.render_state(RenderState::AlphaTest));
            self.write(context, locations.alpha_test_func, alpha.func.shader_code());
            self.write(context, locations.alpha_reference, alpha.reference);
        }
    }

    fn push_light<C: GraphicsContext>(&mut self, context: &mut C, state: &PipelineState, index: usize) {
        let slot = self.locations.lights[index];
        let (Ok(light), Ok(enabled)) = (state.light(index), state.light_enabled(index)) else {
            return;
        };

        self.write(context, slot.enabled, enabled);
        if !enabled {
            return;
        }

        let position = light.homogeneous_position();
        let direction = light.direction;
        let attenuation = light.attenuation();
        self.write(context, slot.light_type, light.light_type.shader_code());
        self.write(context, slot.position, UniformValue::Vec4([position.x, position.y, position.z, position.w]));
        self.write(context, slot.direction, UniformValue::Vec3([direction.x, direction.y, direction.z]));
        self.write(context, slot.ambient, light.ambient);
        self.write(context, slot.diffuse, light.diffuse);
        self.write(context, slot.specular, light.specular);
        self.write(context, slot.attenuation, UniformValue::Vec3([attenuation.x, attenuation.y, attenuation.z]));
        self.write(context, slot.spot_angle, light.spot_angle);
        self.write(context, slot.spot_intensity, light.spot_intensity);
    }

    /// Bind the stage's texture, then apply its sampler parameters
    ///
    /// Parameters always follow the bind, so the order in which the texture
    /// and its stage parameters were set never matters.
    fn push_stage<C: GraphicsContext>(
        &mut self,
        context: &mut C,
        state: &PipelineState,
        textures: &TextureRegistry,
        index: usize,
    ) {
        let slot = self.locations.stages[index];
        let Ok(stage) = state.stage(index) else {
            return;
        };

        let gpu_texture = if state.stage_active(index) {
            stage.texture.and_then(|handle| textures.gpu_texture(handle).ok())
        } else {
            None
        };

        let Some(gpu_texture) = gpu_texture else {
            context.bind_texture(index, None);
            self.write(context, slot.enabled, false);
            return;
        };

        context.bind_texture(index, Some(gpu_texture));
        context.set_texture_wrap(index, stage.params.wrap_s, stage.params.wrap_t);

        let params = stage.params;
        self.write(context, slot.enabled, true);
        self.write(context, slot.sampler, index as i32);
        self.write(context, slot.color_operation, params.color_operation.shader_code());
        self.write(context, slot.color_arg1, params.color_arg1.shader_code());
        self.write(context, slot.color_arg2, params.color_arg2.shader_code());
        self.write(context, slot.alpha_operation, params.alpha_operation.shader_code());
        self.write(context, slot.alpha_arg1, params.alpha_arg1.shader_code());
        self.write(context, slot.alpha_arg2, params.alpha_arg2.shader_code());
        self.write(context, slot.factor, params.factor);

        let generation = stage.generation;
        self.write(context, slot.texgen_enabled, generation.is_active());
        for (coord, generated) in generation.coords.iter().enumerate() {
            self.write(context, slot.texgen_mode[coord], generated.mode.shader_code());
            self.write(context, slot.texgen_plane[coord], UniformValue::Vec4(generated.plane));
        }
    }
}

/// Apply raster state categories to the context
fn apply_raster<C: GraphicsContext>(context: &mut C, state: &PipelineState, flags: DirtyFlags) {
    if flags.is_empty() {
        return;
    }

    if flags.contains(DirtyFlags::VIEWPORT) {
        context.set_viewport(state.viewport());
    }
    if flags.contains(DirtyFlags::DEPTH_TEST) {
        context.set_capability(Capability::DepthTest, state.render_state(RenderState::DepthTest));
    }
    if flags.contains(DirtyFlags::DEPTH_WRITE) {
        context.set_depth_mask(state.render_state(RenderState::DepthWrite));
    }
    if flags.contains(DirtyFlags::DEPTH_FUNC) {
        context.set_depth_func(state.depth_test_func());
    }
    if flags.contains(DirtyFlags::BLEND) {
        context.set_capability(Capability::Blend, state.render_state(RenderState::Blending));
    }
    if flags.contains(DirtyFlags::BLEND_FUNC) {
        let blend = state.blend_func();
        context.set_blend_func(blend.src, blend.dst);
    }
    if flags.contains(DirtyFlags::CULL) {
        context.set_capability(Capability::CullFace, state.render_state(RenderState::Culling));
    }
    if flags.contains(DirtyFlags::CULL_MODE) {
        context.set_front_face(state.cull_mode());
    }
    if flags.contains(DirtyFlags::COLOR_MASK) {
        context.set_color_mask(state.color_mask());
    }
    if flags.contains(DirtyFlags::FILL_MODE) {
        context.set_polygon_mode(state.fill_mode());
    }
    if flags.contains(DirtyFlags::DEPTH_BIAS) {
        let bias = state.depth_bias();
        context.set_capability(Capability::PolygonOffsetFill, state.render_state(RenderState::DepthBias));
        context.set_polygon_offset(bias.factor, bias.units);
    }
    if flags.contains(DirtyFlags::CLEAR_COLOR) {
        context.set_clear_color(state.clear_color());
    }
}
