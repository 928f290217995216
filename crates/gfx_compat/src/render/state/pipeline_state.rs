//! Pipeline state cache
//!
//! Holds the current logical fixed-function state and records which parts of
//! it changed since the last flush. Setters compare against the cached value
//! and only mark a category dirty on an actual change, so repeated calls with
//! the same value never cause uploads.

use bitflags::bitflags;

use super::render_state::{
    AlphaTest, BlendFunc, BlendState, ColorMask, CompFunc, CullMode, DepthBias, FillMode,
    FogParams, RenderState, ShadeModel, Viewport,
};
use crate::foundation::math::Mat4;
use crate::render::primitives::Color;
use crate::render::resources::{
    Material, TexWrapMode, TextureGenerationParams, TextureHandle, TextureStageParams,
};
use crate::render::systems::lighting::Light;
use crate::render::{DeviceError, DeviceResult};

/// Number of light slots
pub const MAX_LIGHT_COUNT: usize = 8;

/// Number of texture stages: primary, secondary and shadow
pub const MAX_TEXTURE_STAGE_COUNT: usize = 3;

/// Stage sampled for shadow mapping
pub const SHADOW_STAGE: usize = 2;

/// Transform slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformType {
    /// Object to world
    World,
    /// World to eye
    View,
    /// Eye to clip
    Projection,
    /// World to shadow map clip space
    Shadow,
}

bitflags! {
    /// State categories changed since the last flush
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u32 {
        /// Projection matrix
        const PROJECTION = 1 << 0;
        /// View matrix
        const VIEW = 1 << 1;
        /// World matrix
        const WORLD = 1 << 2;
        /// Shadow projection matrix
        const SHADOW_MATRIX = 1 << 3;
        /// Material terms
        const MATERIAL = 1 << 4;
        /// Lighting switch
        const LIGHTING = 1 << 5;
        /// Global ambient color
        const GLOBAL_AMBIENT = 1 << 6;
        /// Fog switch and parameters
        const FOG = 1 << 7;
        /// Alpha test switch and reference
        const ALPHA_TEST = 1 << 8;
        /// Shadow color
        const SHADOW_COLOR = 1 << 9;
        /// Shade model
        const SHADING = 1 << 10;
        /// Per-pixel lighting branch
        const PER_PIXEL = 1 << 11;
        /// Viewport rectangle
        const VIEWPORT = 1 << 12;
        /// Depth test switch
        const DEPTH_TEST = 1 << 13;
        /// Depth write mask
        const DEPTH_WRITE = 1 << 14;
        /// Depth comparison
        const DEPTH_FUNC = 1 << 15;
        /// Blend switch
        const BLEND = 1 << 16;
        /// Blend factors
        const BLEND_FUNC = 1 << 17;
        /// Cull switch
        const CULL = 1 << 18;
        /// Front-face winding
        const CULL_MODE = 1 << 19;
        /// Color write mask
        const COLOR_MASK = 1 << 20;
        /// Polygon mode
        const FILL_MODE = 1 << 21;
        /// Depth bias switch and parameters
        const DEPTH_BIAS = 1 << 22;
        /// Clear color
        const CLEAR_COLOR = 1 << 23;
    }
}

impl DirtyFlags {
    /// Categories applied as context raster state instead of uniforms
    pub const RASTER: DirtyFlags = DirtyFlags::VIEWPORT
        .union(DirtyFlags::DEPTH_TEST)
        .union(DirtyFlags::DEPTH_WRITE)
        .union(DirtyFlags::DEPTH_FUNC)
        .union(DirtyFlags::BLEND)
        .union(DirtyFlags::BLEND_FUNC)
        .union(DirtyFlags::CULL)
        .union(DirtyFlags::CULL_MODE)
        .union(DirtyFlags::COLOR_MASK)
        .union(DirtyFlags::FILL_MODE)
        .union(DirtyFlags::DEPTH_BIAS)
        .union(DirtyFlags::CLEAR_COLOR);

    /// Matrix categories
    pub const MATRICES: DirtyFlags = DirtyFlags::PROJECTION
        .union(DirtyFlags::VIEW)
        .union(DirtyFlags::WORLD)
        .union(DirtyFlags::SHADOW_MATRIX);

    fn for_render_state(state: RenderState) -> DirtyFlags {
        match state {
            RenderState::Blending => DirtyFlags::BLEND,
            RenderState::Fog => DirtyFlags::FOG,
            RenderState::DepthTest => DirtyFlags::DEPTH_TEST,
            RenderState::DepthWrite => DirtyFlags::DEPTH_WRITE,
            RenderState::AlphaTest => DirtyFlags::ALPHA_TEST,
            RenderState::Culling => DirtyFlags::CULL,
            RenderState::DepthBias => DirtyFlags::DEPTH_BIAS,
            RenderState::Lighting => DirtyFlags::LIGHTING,
            // shadow mapping toggles the shadow stage, tracked per stage
            RenderState::ShadowMapping => DirtyFlags::empty(),
        }
    }
}

/// Everything a flush has to push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingChanges {
    /// Dirty categories
    pub flags: DirtyFlags,
    /// Bit `i` set when light slot `i` changed
    pub lights: u32,
    /// Bit `i` set when texture stage `i` changed
    pub stages: u32,
}

impl PendingChanges {
    /// Nothing to push
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.lights == 0 && self.stages == 0
    }

    /// Whether light slot `index` is dirty
    pub fn light(&self, index: usize) -> bool {
        self.lights & (1 << index) != 0
    }

    /// Whether texture stage `index` is dirty
    pub fn stage(&self, index: usize) -> bool {
        self.stages & (1 << index) != 0
    }
}

/// One texture binding slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureStage {
    /// Bound texture
    pub texture: Option<TextureHandle>,
    /// Stage switch; a stage samples only when enabled and bound
    pub enabled: bool,
    /// Combine and wrap parameters
    pub params: TextureStageParams,
    /// Coordinate generation
    pub generation: TextureGenerationParams,
}

impl Default for TextureStage {
    fn default() -> Self {
        Self {
            texture: None,
            enabled: true,
            params: TextureStageParams::default(),
            generation: TextureGenerationParams::default(),
        }
    }
}

/// Current logical fixed-function state
#[derive(Debug, Clone)]
pub struct PipelineState {
    world: Mat4,
    view: Mat4,
    projection: Mat4,
    shadow: Mat4,
    model_view: Option<Mat4>,
    normal: Option<Mat4>,
    model_view_recomputes: u64,

    material: Material,
    lights: [Light; MAX_LIGHT_COUNT],
    light_enabled: [bool; MAX_LIGHT_COUNT],
    stages: [TextureStage; MAX_TEXTURE_STAGE_COUNT],

    render_states: [bool; RenderState::COUNT],
    viewport: Viewport,
    color_mask: ColorMask,
    depth_func: CompFunc,
    depth_bias: DepthBias,
    alpha_test: AlphaTest,
    blend: BlendState,
    clear_color: Color,
    global_ambient: Color,
    fog: FogParams,
    cull_mode: CullMode,
    shade_model: ShadeModel,
    shadow_color: Color,
    fill_mode: FillMode,
    per_pixel_lighting: bool,

    pending: PendingChanges,
}

impl Default for PipelineState {
    fn default() -> Self {
        let mut render_states = [false; RenderState::COUNT];
        for state in RenderState::ALL {
            render_states[state.index()] = state.default_enabled();
        }

        Self {
            world: Mat4::identity(),
            view: Mat4::identity(),
            projection: Mat4::identity(),
            shadow: Mat4::identity(),
            model_view: None,
            normal: None,
            model_view_recomputes: 0,
            material: Material::default(),
            lights: [Light::default(); MAX_LIGHT_COUNT],
            light_enabled: [false; MAX_LIGHT_COUNT],
            stages: [TextureStage::default(); MAX_TEXTURE_STAGE_COUNT],
            render_states,
            viewport: Viewport::default(),
            color_mask: ColorMask::ALL,
            depth_func: CompFunc::LessEqual,
            depth_bias: DepthBias::default(),
            alpha_test: AlphaTest::default(),
            blend: BlendState::default(),
            clear_color: Color::BLACK,
            global_ambient: Color::new(0.2, 0.2, 0.2, 1.0),
            fog: FogParams::default(),
            cull_mode: CullMode::Ccw,
            shade_model: ShadeModel::Smooth,
            shadow_color: Color::new(0.5, 0.5, 0.5, 1.0),
            fill_mode: FillMode::Polygon,
            per_pixel_lighting: false,
            pending: PendingChanges::default(),
        }
    }
}

/// Assign `value` to `slot` and report whether it changed
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

fn check_light(index: usize) -> DeviceResult<()> {
    if index >= MAX_LIGHT_COUNT {
        return Err(DeviceError::LightIndexOutOfRange { index, max: MAX_LIGHT_COUNT });
    }
    Ok(())
}

fn check_stage(index: usize) -> DeviceResult<()> {
    if index >= MAX_TEXTURE_STAGE_COUNT {
        return Err(DeviceError::TextureStageOutOfRange { index, max: MAX_TEXTURE_STAGE_COUNT });
    }
    Ok(())
}

impl PipelineState {
    /// Fresh state with every category dirty
    pub fn new() -> Self {
        let mut state = Self::default();
        state.mark_all_dirty();
        state
    }

    // ---------------------------------------------------------------------
    // Transforms
    // ---------------------------------------------------------------------

    /// Set one transform slot
    pub fn set_transform(&mut self, kind: TransformType, matrix: Mat4) {
        let (slot, flag) = match kind {
            TransformType::World => (&mut self.world, DirtyFlags::WORLD),
            TransformType::View => (&mut self.view, DirtyFlags::VIEW),
            TransformType::Projection => (&mut self.projection, DirtyFlags::PROJECTION),
            TransformType::Shadow => (&mut self.shadow, DirtyFlags::SHADOW_MATRIX),
        };
        if replace(slot, matrix) {
            self.pending.flags |= flag;
            match kind {
                TransformType::World => {
                    self.model_view = None;
                    self.normal = None;
                }
                TransformType::View => self.model_view = None,
                TransformType::Projection | TransformType::Shadow => {}
            }
        }
    }

    /// Current value of a transform slot
    pub fn transform(&self, kind: TransformType) -> Mat4 {
        match kind {
            TransformType::World => self.world,
            TransformType::View => self.view,
            TransformType::Projection => self.projection,
            TransformType::Shadow => self.shadow,
        }
    }

    /// Combined model-view matrix: world applied first, then view
    ///
    /// Computed on first use after world or view changed, cached otherwise.
    pub fn model_view(&mut self) -> Mat4 {
        match self.model_view {
            Some(matrix) => matrix,
            None => {
                let matrix = self.view * self.world;
                self.model_view = Some(matrix);
                self.model_view_recomputes += 1;
                matrix
            }
        }
    }

    /// Inverse-transpose of the world matrix
    ///
    /// A singular world matrix yields the identity.
    pub fn normal_matrix(&mut self) -> Mat4 {
        match self.normal {
            Some(matrix) => matrix,
            None => {
                let matrix = self
                    .world
                    .try_inverse()
                    .map(|inverse| inverse.transpose())
                    .unwrap_or_else(Mat4::identity);
                self.normal = Some(matrix);
                matrix
            }
        }
    }

    /// Projection × model-view, the full object-to-clip transform
    pub fn clip_matrix(&mut self) -> Mat4 {
        self.projection * self.model_view()
    }

    /// Number of model-view recomputations so far
    pub fn model_view_recomputes(&self) -> u64 {
        self.model_view_recomputes
    }

    // ---------------------------------------------------------------------
    // Material and lights
    // ---------------------------------------------------------------------

    /// Replace the current material
    pub fn set_material(&mut self, material: Material) {
        if replace(&mut self.material, material) {
            self.pending.flags |= DirtyFlags::MATERIAL;
        }
    }

    /// Current material
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Configure a light slot
    pub fn set_light(&mut self, index: usize, light: Light) -> DeviceResult<()> {
        check_light(index)?;
        if replace(&mut self.lights[index], light) {
            self.pending.lights |= 1 << index;
        }
        Ok(())
    }

    /// Enable or disable a light slot, keeping its configuration
    pub fn set_light_enabled(&mut self, index: usize, enabled: bool) -> DeviceResult<()> {
        check_light(index)?;
        if replace(&mut self.light_enabled[index], enabled) {
            self.pending.lights |= 1 << index;
        }
        Ok(())
    }

    /// Configuration of a light slot
    pub fn light(&self, index: usize) -> DeviceResult<&Light> {
        check_light(index)?;
        Ok(&self.lights[index])
    }

    /// Whether a light slot is enabled
    pub fn light_enabled(&self, index: usize) -> DeviceResult<bool> {
        check_light(index)?;
        Ok(self.light_enabled[index])
    }

    // ---------------------------------------------------------------------
    // Texture stages
    // ---------------------------------------------------------------------

    /// Bind a texture to a stage, or unbind with `None`
    pub fn set_texture(&mut self, stage: usize, texture: Option<TextureHandle>) -> DeviceResult<()> {
        check_stage(stage)?;
        if replace(&mut self.stages[stage].texture, texture) {
            self.pending.stages |= 1 << stage;
        }
        Ok(())
    }

    /// Enable or disable a stage
    pub fn set_texture_enabled(&mut self, stage: usize, enabled: bool) -> DeviceResult<()> {
        check_stage(stage)?;
        if replace(&mut self.stages[stage].enabled, enabled) {
            self.pending.stages |= 1 << stage;
        }
        Ok(())
    }

    /// Replace the combine and wrap parameters of a stage
    pub fn set_texture_stage_params(&mut self, stage: usize, params: TextureStageParams) -> DeviceResult<()> {
        check_stage(stage)?;
        if replace(&mut self.stages[stage].params, params) {
            self.pending.stages |= 1 << stage;
        }
        Ok(())
    }

    /// Change only the wrap modes of a stage
    pub fn set_texture_stage_wrap(&mut self, stage: usize, wrap_s: TexWrapMode, wrap_t: TexWrapMode) -> DeviceResult<()> {
        check_stage(stage)?;
        let params = TextureStageParams { wrap_s, wrap_t, ..self.stages[stage].params };
        self.set_texture_stage_params(stage, params)
    }

    /// Set coordinate generation of a stage
    pub fn set_texture_coord_generation(&mut self, stage: usize, generation: TextureGenerationParams) -> DeviceResult<()> {
        check_stage(stage)?;
        if replace(&mut self.stages[stage].generation, generation) {
            self.pending.stages |= 1 << stage;
        }
        Ok(())
    }

    /// A texture stage
    pub fn stage(&self, stage: usize) -> DeviceResult<&TextureStage> {
        check_stage(stage)?;
        Ok(&self.stages[stage])
    }

    /// Whether a stage samples its texture in the next draw
    ///
    /// The shadow stage additionally requires [`RenderState::ShadowMapping`].
    pub fn stage_active(&self, stage: usize) -> bool {
        let Some(slot) = self.stages.get(stage) else {
            return false;
        };
        let gated = stage != SHADOW_STAGE || self.render_state(RenderState::ShadowMapping);
        slot.texture.is_some() && slot.enabled && gated
    }

    /// Unbind `texture` from every stage that references it
    pub fn unbind_texture(&mut self, texture: TextureHandle) {
        for (index, stage) in self.stages.iter_mut().enumerate() {
            if stage.texture == Some(texture) {
                stage.texture = None;
                self.pending.stages |= 1 << index;
            }
        }
    }

    /// Unbind every stage
    pub fn unbind_all_textures(&mut self) {
        for (index, stage) in self.stages.iter_mut().enumerate() {
            if stage.texture.take().is_some() {
                self.pending.stages |= 1 << index;
            }
        }
    }

    // ---------------------------------------------------------------------
    // Render states and raster parameters
    // ---------------------------------------------------------------------

    /// Turn a render state on or off
    pub fn set_render_state(&mut self, state: RenderState, enabled: bool) {
        if replace(&mut self.render_states[state.index()], enabled) {
            self.pending.flags |= DirtyFlags::for_render_state(state);
            if state == RenderState::ShadowMapping {
                self.pending.stages |= 1 << SHADOW_STAGE;
            }
        }
    }

    /// Whether a render state is on
    pub fn render_state(&self, state: RenderState) -> bool {
        self.render_states[state.index()]
    }

    /// Set the viewport
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if replace(&mut self.viewport, viewport) {
            self.pending.flags |= DirtyFlags::VIEWPORT;
        }
    }

    /// Current viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Set the color write mask
    pub fn set_color_mask(&mut self, mask: ColorMask) {
        if replace(&mut self.color_mask, mask) {
            self.pending.flags |= DirtyFlags::COLOR_MASK;
        }
    }

    /// Current color write mask
    pub fn color_mask(&self) -> ColorMask {
        self.color_mask
    }

    /// Set the depth comparison
    pub fn set_depth_test_func(&mut self, func: CompFunc) {
        if replace(&mut self.depth_func, func) {
            self.pending.flags |= DirtyFlags::DEPTH_FUNC;
        }
    }

    /// Current depth comparison
    pub fn depth_test_func(&self) -> CompFunc {
        self.depth_func
    }

    /// Set polygon offset parameters
    pub fn set_depth_bias(&mut self, factor: f32, units: f32) {
        if replace(&mut self.depth_bias, DepthBias { factor, units }) {
            self.pending.flags |= DirtyFlags::DEPTH_BIAS;
        }
    }

    /// Current polygon offset parameters
    pub fn depth_bias(&self) -> DepthBias {
        self.depth_bias
    }

    /// Set the alpha test comparison and reference
    pub fn set_alpha_test_func(&mut self, func: CompFunc, reference: f32) {
        if replace(&mut self.alpha_test, AlphaTest { func, reference }) {
            self.pending.flags |= DirtyFlags::ALPHA_TEST;
        }
    }

    /// Current alpha test parameters
    pub fn alpha_test(&self) -> AlphaTest {
        self.alpha_test
    }

    /// Set blend factors
    pub fn set_blend_func(&mut self, src: BlendFunc, dst: BlendFunc) {
        if replace(&mut self.blend, BlendState { src, dst }) {
            self.pending.flags |= DirtyFlags::BLEND_FUNC;
        }
    }

    /// Current blend factors
    pub fn blend_func(&self) -> BlendState {
        self.blend
    }

    /// Set the clear color
    pub fn set_clear_color(&mut self, color: Color) {
        if replace(&mut self.clear_color, color) {
            self.pending.flags |= DirtyFlags::CLEAR_COLOR;
        }
    }

    /// Current clear color
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    /// Set the global ambient color
    pub fn set_global_ambient(&mut self, color: Color) {
        if replace(&mut self.global_ambient, color) {
            self.pending.flags |= DirtyFlags::GLOBAL_AMBIENT;
        }
    }

    /// Current global ambient color
    pub fn global_ambient(&self) -> Color {
        self.global_ambient
    }

    /// Set fog parameters
    pub fn set_fog_params(&mut self, fog: FogParams) {
        if replace(&mut self.fog, fog) {
            self.pending.flags |= DirtyFlags::FOG;
        }
    }

    /// Current fog parameters
    pub fn fog_params(&self) -> FogParams {
        self.fog
    }

    /// Set the front-face winding
    pub fn set_cull_mode(&mut self, mode: CullMode) {
        if replace(&mut self.cull_mode, mode) {
            self.pending.flags |= DirtyFlags::CULL_MODE;
        }
    }

    /// Current front-face winding
    pub fn cull_mode(&self) -> CullMode {
        self.cull_mode
    }

    /// Set the shade model
    pub fn set_shade_model(&mut self, model: ShadeModel) {
        if replace(&mut self.shade_model, model) {
            self.pending.flags |= DirtyFlags::SHADING;
        }
    }

    /// Current shade model
    pub fn shade_model(&self) -> ShadeModel {
        self.shade_model
    }

    /// Set the shadow color
    pub fn set_shadow_color(&mut self, color: Color) {
        if replace(&mut self.shadow_color, color) {
            self.pending.flags |= DirtyFlags::SHADOW_COLOR;
        }
    }

    /// Current shadow color
    pub fn shadow_color(&self) -> Color {
        self.shadow_color
    }

    /// Set the polygon mode
    pub fn set_fill_mode(&mut self, mode: FillMode) {
        if replace(&mut self.fill_mode, mode) {
            self.pending.flags |= DirtyFlags::FILL_MODE;
        }
    }

    /// Current polygon mode
    pub fn fill_mode(&self) -> FillMode {
        self.fill_mode
    }

    /// Select the per-pixel lighting branch
    pub fn set_per_pixel_lighting(&mut self, enabled: bool) {
        if replace(&mut self.per_pixel_lighting, enabled) {
            self.pending.flags |= DirtyFlags::PER_PIXEL;
        }
    }

    /// Whether per-pixel lighting is selected
    pub fn per_pixel_lighting(&self) -> bool {
        self.per_pixel_lighting
    }

    // ---------------------------------------------------------------------
    // Dirty tracking
    // ---------------------------------------------------------------------

    /// Pending changes without consuming them
    pub fn pending(&self) -> PendingChanges {
        self.pending
    }

    /// Whether anything waits to be flushed
    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Consume the pending changes
    pub fn take_pending(&mut self) -> PendingChanges {
        std::mem::take(&mut self.pending)
    }

    /// Consume only the raster part of the pending changes
    pub fn take_raster_pending(&mut self) -> DirtyFlags {
        let raster = self.pending.flags & DirtyFlags::RASTER;
        self.pending.flags.remove(raster);
        raster
    }

    /// Mark given categories dirty regardless of their values
    pub fn mark_dirty(&mut self, flags: DirtyFlags) {
        self.pending.flags |= flags;
    }

    /// Mark every category, light and stage dirty
    pub fn mark_all_dirty(&mut self) {
        self.pending = PendingChanges {
            flags: DirtyFlags::all(),
            lights: (1 << MAX_LIGHT_COUNT) - 1,
            stages: (1 << MAX_TEXTURE_STAGE_COUNT) - 1,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    fn translation(x: f32, y: f32, z: f32) -> Mat4 {
        Mat4::new_translation(&Vec3::new(x, y, z))
    }

    #[test]
    fn test_new_state_is_fully_dirty() {
        let mut state = PipelineState::new();
        let pending = state.take_pending();
        assert_eq!(pending.flags, DirtyFlags::all());
        assert!((0..MAX_LIGHT_COUNT).all(|i| pending.light(i)));
        assert!((0..MAX_TEXTURE_STAGE_COUNT).all(|i| pending.stage(i)));
        assert!(!state.is_dirty());
    }

    #[test]
    fn test_setting_same_value_does_not_mark_dirty() {
        let mut state = PipelineState::new();
        state.take_pending();

        state.set_render_state(RenderState::DepthTest, true);
        state.set_clear_color(Color::BLACK);
        state.set_transform(TransformType::World, Mat4::identity());
        assert!(!state.is_dirty());

        state.set_render_state(RenderState::Fog, true);
        state.set_render_state(RenderState::Fog, true);
        assert_eq!(state.take_pending().flags, DirtyFlags::FOG);
    }

    #[test]
    fn test_model_view_is_world_then_view() {
        let mut state = PipelineState::new();
        let world = translation(1.0, 0.0, 0.0);
        let view = Mat4::new_scaling(2.0);

        state.set_transform(TransformType::View, view);
        state.set_transform(TransformType::World, world);

        let point = state.model_view().transform_point(&nalgebra::Point3::origin());
        assert_relative_eq!(point.x, 2.0);
        assert_relative_eq!(state.model_view(), view * world);
    }

    #[test]
    fn test_model_view_is_cached_until_inputs_change() {
        let mut state = PipelineState::new();
        state.model_view();
        state.model_view();
        assert_eq!(state.model_view_recomputes(), 1);

        state.set_transform(TransformType::Projection, translation(0.0, 1.0, 0.0));
        state.model_view();
        assert_eq!(state.model_view_recomputes(), 1);

        state.set_transform(TransformType::View, translation(0.0, 0.0, -5.0));
        state.model_view();
        assert_eq!(state.model_view_recomputes(), 2);
    }

    #[test]
    fn test_normal_matrix_is_inverse_transpose_of_world() {
        let mut state = PipelineState::new();
        let world = Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 4.0, 1.0));
        state.set_transform(TransformType::World, world);

        let expected = world.try_inverse().unwrap().transpose();
        assert_relative_eq!(state.normal_matrix(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_light_configuration_survives_toggle() {
        let mut state = PipelineState::new();
        let light = Light::point(Vec3::new(1.0, 2.0, 3.0), Color::rgb(1.0, 0.0, 0.0), [1.0, 0.5, 0.25]);
        state.set_light(3, light).unwrap();
        state.set_light_enabled(3, true).unwrap();
        state.set_light_enabled(3, false).unwrap();
        state.set_light_enabled(3, false).unwrap();
        state.set_light_enabled(3, true).unwrap();

        assert_eq!(*state.light(3).unwrap(), light);
        assert!(state.light_enabled(3).unwrap());
    }

    #[test]
    fn test_indexed_setters_reject_max_index() {
        let mut state = PipelineState::new();
        assert_eq!(
            state.set_light(MAX_LIGHT_COUNT, Light::default()),
            Err(DeviceError::LightIndexOutOfRange { index: MAX_LIGHT_COUNT, max: MAX_LIGHT_COUNT })
        );
        assert!(state.set_light_enabled(MAX_LIGHT_COUNT - 1, true).is_ok());
        assert!(matches!(
            state.set_texture_enabled(MAX_TEXTURE_STAGE_COUNT, true),
            Err(DeviceError::TextureStageOutOfRange { .. })
        ));
        assert!(state.stage(MAX_TEXTURE_STAGE_COUNT).is_err());
    }

    #[test]
    fn test_shadow_stage_requires_shadow_mapping() {
        let mut state = PipelineState::new();
        let handle = TextureHandle::default();
        state.set_texture(SHADOW_STAGE, Some(handle)).unwrap();
        assert!(!state.stage_active(SHADOW_STAGE));

        state.take_pending();
        state.set_render_state(RenderState::ShadowMapping, true);
        assert!(state.pending().stage(SHADOW_STAGE));
        assert!(state.stage_active(SHADOW_STAGE));
    }

    #[test]
    fn test_wrap_setter_keeps_combine_params() {
        let mut state = PipelineState::new();
        let params = TextureStageParams { factor: Color::rgb(0.5, 0.5, 0.5), ..Default::default() };
        state.set_texture_stage_params(0, params).unwrap();
        state.set_texture_stage_wrap(0, TexWrapMode::Clamp, TexWrapMode::ClampToBorder).unwrap();

        let stage = state.stage(0).unwrap();
        assert_eq!(stage.params.factor, params.factor);
        assert_eq!(stage.params.wrap_s, TexWrapMode::Clamp);
        assert_eq!(stage.params.wrap_t, TexWrapMode::ClampToBorder);
    }

    #[test]
    fn test_raster_pending_is_split_off() {
        let mut state = PipelineState::new();
        state.take_pending();
        state.set_color_mask(ColorMask { alpha: false, ..ColorMask::ALL });
        state.set_material(Material::with_diffuse(Color::rgb(1.0, 0.0, 0.0)));

        assert_eq!(state.take_raster_pending(), DirtyFlags::COLOR_MASK);
        assert_eq!(state.take_pending().flags, DirtyFlags::MATERIAL);
    }
}
