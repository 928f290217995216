//! # Device
//!
//! The public fixed-function command surface. A [`Device`] owns its
//! [`GraphicsContext`] and translates state setters, resource calls and draws
//! into program uniforms, vertex buffers and raster state.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --create--> Created --begin_scene--> InScene
//!                              ^                        |
//!                              +-------end_scene--------+
//! any --destroy--> Destroyed         any --context loss--> Lost
//! ```
//!
//! State setters and resource calls are valid while `Created` or `InScene`;
//! draws require `InScene`. Once `Lost`, every call except `destroy` reports
//! [`DeviceError::ContextLost`].
//!
//! ## Usage
//!
//! ```rust
//! use gfx_compat::prelude::*;
//!
//! # fn main() -> Result<(), DeviceError> {
//! let mut device = Device::new(HeadlessContext::new(), DeviceConfig::default());
//! device.create()?;
//!
//! device.begin_scene()?;
//! device.set_transform(TransformType::World, Mat4::identity())?;
//! let triangle = [
//!     VertexCol::new([0.0, 0.0, 0.0], Color::WHITE),
//!     VertexCol::new([1.0, 0.0, 0.0], Color::WHITE),
//!     VertexCol::new([0.0, 1.0, 0.0], Color::WHITE),
//! ];
//! device.draw_primitive(PrimitiveType::Triangles, &triangle, Color::WHITE)?;
//! device.end_scene()?;
//!
//! device.destroy()?;
//! # Ok(())
//! # }
//! ```

mod drawing;
mod offscreen;
mod textures;

#[cfg(test)]
mod tests;

pub use offscreen::FramePixels;

use offscreen::OffscreenTarget;

use crate::core::DeviceConfig;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::api::{ClearFlags, ContextCapabilities, GraphicsContext, ProgramId};
use crate::render::primitives::Color;
use crate::render::resources::{effective_anisotropy, BufferRegistry, Material, ScratchBuffers, TextureRegistry};
use crate::render::state::{
    BlendFunc, ColorMask, CompFunc, CullMode, DirtyFlags, FillMode, FogParams, PipelineState,
    RenderState, ShadeModel, TransformType, Viewport, MAX_LIGHT_COUNT, MAX_TEXTURE_STAGE_COUNT,
};
use crate::render::sync::{UniformLocations, UniformSynchronizer};
use crate::render::systems::lighting::Light;
use crate::render::visibility::{Frustum, FrustumPlanes, SphereVisibility};
use crate::render::{DeviceError, DeviceResult};

/// Minimum context version
const REQUIRED_VERSION: (u32, u32) = (3, 3);

/// Lifecycle state of a [`Device`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceLifecycle {
    /// Constructed, `create` not yet called
    Uninitialized,
    /// Ready, outside a scene
    Created,
    /// Between `begin_scene` and `end_scene`
    InScene,
    /// Released; terminal
    Destroyed,
    /// The context is gone; only `destroy` is accepted
    Lost,
}

/// Counters for observing the device's work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStats {
    /// Model-view matrix recomputations
    pub model_view_recomputes: u64,
    /// Uniform writes issued
    pub uniform_uploads: u64,
    /// Flushes that pushed at least one change
    pub flushes: u64,
    /// Draws issued
    pub draw_calls: u64,
}

/// Program-side objects that exist between `create` and `destroy`
#[derive(Debug)]
struct Pipeline {
    program: ProgramId,
    sync: UniformSynchronizer,
    scratch: ScratchBuffers,
}

/// Fixed-function rendering device
pub struct Device<C: GraphicsContext> {
    context: C,
    config: DeviceConfig,
    lifecycle: DeviceLifecycle,
    capabilities: ContextCapabilities,
    anisotropy: u32,
    state: PipelineState,
    pipeline: Option<Pipeline>,
    buffers: BufferRegistry,
    textures: TextureRegistry,
    offscreen: Option<OffscreenTarget>,
    draw_calls: u64,
}

impl<C: GraphicsContext> Device<C> {
    /// Wrap a ready context; no GPU work happens until [`Device::create`]
    pub fn new(context: C, config: DeviceConfig) -> Self {
        let capabilities = context.capabilities();
        Self {
            context,
            config,
            lifecycle: DeviceLifecycle::Uninitialized,
            capabilities,
            anisotropy: 1,
            state: PipelineState::new(),
            pipeline: None,
            buffers: BufferRegistry::new(),
            textures: TextureRegistry::new(),
            offscreen: None,
            draw_calls: 0,
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Validate the context, build the program and push the default state
    pub fn create(&mut self) -> DeviceResult<()> {
        if self.lifecycle != DeviceLifecycle::Uninitialized {
            return Err(self.lifecycle_error("create"));
        }
        self.config.validate().map_err(DeviceError::Initialization)?;

        let capabilities = self.context.capabilities();
        if capabilities.version < REQUIRED_VERSION {
            return Err(DeviceError::Initialization(format!(
                "context version {}.{} is below the required {}.{}",
                capabilities.version.0, capabilities.version.1, REQUIRED_VERSION.0, REQUIRED_VERSION.1
            )));
        }
        if (capabilities.max_texture_units as usize) < MAX_TEXTURE_STAGE_COUNT {
            return Err(DeviceError::Initialization(format!(
                "context offers {} texture units, {} required",
                capabilities.max_texture_units, MAX_TEXTURE_STAGE_COUNT
            )));
        }
        self.capabilities = capabilities;
        self.anisotropy = self.resolve_anisotropy(self.config.anisotropy_level);

        let program = self.context.compile_program(&self.config.shaders);
        let program = self.track(program.map_err(DeviceError::from))?;
        self.context.use_program(Some(program));
        let locations = UniformLocations::resolve(&self.context, program);

        let scratch = match ScratchBuffers::new(&mut self.context) {
            Ok(scratch) => scratch,
            Err(err) => {
                self.context.use_program(None);
                self.context.delete_program(program);
                return self.track(Err(err));
            }
        };

        let mut pipeline = Pipeline { program, sync: UniformSynchronizer::new(locations), scratch };

        self.state = PipelineState::new();
        self.state.set_per_pixel_lighting(self.config.per_pixel_lighting);
        let (width, height) = capabilities.surface_size;
        self.state.set_viewport(Viewport::new(0, 0, width, height));
        pipeline.sync.flush(&mut self.context, &mut self.state, &self.textures);

        self.pipeline = Some(pipeline);
        self.lifecycle = DeviceLifecycle::Created;

        log::info!(
            "Device created: context {}.{}, anisotropy {} (max {}), max renderbuffer {}",
            capabilities.version.0,
            capabilities.version.1,
            self.anisotropy,
            capabilities.max_anisotropy,
            capabilities.max_renderbuffer_size
        );
        self.check_errors()
    }

    /// Release every resource; the device cannot be used afterwards
    pub fn destroy(&mut self) -> DeviceResult<()> {
        if self.lifecycle == DeviceLifecycle::Destroyed {
            return Err(self.lifecycle_error("destroy"));
        }

        self.release_offscreen();
        self.state.unbind_all_textures();
        self.buffers.destroy_all(&mut self.context);
        self.textures.destroy_all(&mut self.context);
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.scratch.release(&mut self.context);
            self.context.use_program(None);
            self.context.delete_program(pipeline.program);
        }

        self.lifecycle = DeviceLifecycle::Destroyed;
        log::info!("Device destroyed");
        Ok(())
    }

    /// Start a frame: clear and force a full matrix push
    pub fn begin_scene(&mut self) -> DeviceResult<()> {
        match self.lifecycle {
            DeviceLifecycle::Created => {}
            DeviceLifecycle::InScene => return Err(DeviceError::UnmatchedScene("begin_scene inside a scene")),
            _ => return Err(self.lifecycle_error("begin_scene")),
        }

        self.state.mark_dirty(DirtyFlags::MATRICES);
        self.clear()?;
        self.lifecycle = DeviceLifecycle::InScene;
        Ok(())
    }

    /// Close the frame
    pub fn end_scene(&mut self) -> DeviceResult<()> {
        match self.lifecycle {
            DeviceLifecycle::InScene => {}
            DeviceLifecycle::Created => return Err(DeviceError::UnmatchedScene("end_scene without begin_scene")),
            _ => return Err(self.lifecycle_error("end_scene")),
        }

        self.lifecycle = DeviceLifecycle::Created;
        self.check_errors()
    }

    /// Clear color and depth of the current target
    ///
    /// Depth writes are forced on for the clear and restored afterwards.
    pub fn clear(&mut self) -> DeviceResult<()> {
        self.ensure_ready("clear")?;
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.sync.flush_raster(&mut self.context, &mut self.state);
        }

        let depth_write = self.state.render_state(RenderState::DepthWrite);
        if !depth_write {
            self.context.set_depth_mask(true);
        }
        self.context.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
        if !depth_write {
            self.context.set_depth_mask(false);
        }
        self.check_errors()
    }

    /// Apply a new configuration
    ///
    /// Re-applies anisotropy to every texture and re-selects the lighting
    /// branch. Shader paths only take effect on the next `create`.
    pub fn config_changed(&mut self, config: DeviceConfig) -> DeviceResult<()> {
        self.ensure_ready("config_changed")?;
        config.validate().map_err(DeviceError::Initialization)?;

        if config.shaders != self.config.shaders {
            log::warn!("Shader paths changed; the running program is kept until the device is recreated");
        }

        self.anisotropy = self.resolve_anisotropy(config.anisotropy_level);
        self.textures.apply_anisotropy(&mut self.context, self.anisotropy);
        self.state.set_per_pixel_lighting(config.per_pixel_lighting);
        self.state.mark_dirty(DirtyFlags::PER_PIXEL);
        self.config = config;

        log::debug!("Configuration applied: anisotropy {}, per-pixel lighting {}", self.anisotropy, self.config.per_pixel_lighting);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Transforms, material, lights
    // ---------------------------------------------------------------------

    /// Set a transform slot
    pub fn set_transform(&mut self, kind: TransformType, matrix: Mat4) -> DeviceResult<()> {
        self.ensure_ready("set_transform")?;
        self.state.set_transform(kind, matrix);
        Ok(())
    }

    /// Replace the current material
    pub fn set_material(&mut self, material: Material) -> DeviceResult<()> {
        self.ensure_ready("set_material")?;
        self.state.set_material(material);
        Ok(())
    }

    /// Configure light slot `index`
    pub fn set_light(&mut self, index: usize, light: Light) -> DeviceResult<()> {
        self.ensure_ready("set_light")?;
        self.state.set_light(index, light)
    }

    /// Enable or disable light slot `index`, keeping its configuration
    pub fn set_light_enabled(&mut self, index: usize, enabled: bool) -> DeviceResult<()> {
        self.ensure_ready("set_light_enabled")?;
        self.state.set_light_enabled(index, enabled)
    }

    /// Number of light slots
    pub fn get_max_light_count(&self) -> usize {
        MAX_LIGHT_COUNT
    }

    /// Number of texture stages
    pub fn get_max_texture_stage_count(&self) -> usize {
        MAX_TEXTURE_STAGE_COUNT
    }

    /// Log every light slot
    pub fn debug_lights(&self) {
        for index in 0..MAX_LIGHT_COUNT {
            let (Ok(light), Ok(enabled)) = (self.state.light(index), self.state.light_enabled(index)) else {
                continue;
            };
            log::debug!(
                "Light {}: enabled={} type={:?} position={:?} direction={:?} ambient={:?} diffuse={:?} specular={:?} attenuation={:?}",
                index,
                enabled,
                light.light_type,
                light.position,
                light.direction,
                light.ambient.to_array(),
                light.diffuse.to_array(),
                light.specular.to_array(),
                light.attenuation()
            );
        }
    }

    // ---------------------------------------------------------------------
    // Render state
    // ---------------------------------------------------------------------

    /// Set the viewport
    pub fn set_viewport(&mut self, viewport: Viewport) -> DeviceResult<()> {
        self.ensure_ready("set_viewport")?;
        self.state.set_viewport(viewport);
        Ok(())
    }

    /// Turn a render state on or off
    pub fn set_render_state(&mut self, state: RenderState, enabled: bool) -> DeviceResult<()> {
        self.ensure_ready("set_render_state")?;
        self.state.set_render_state(state, enabled);
        Ok(())
    }

    /// Set the color write mask
    pub fn set_color_mask(&mut self, mask: ColorMask) -> DeviceResult<()> {
        self.ensure_ready("set_color_mask")?;
        self.state.set_color_mask(mask);
        Ok(())
    }

    /// Set the depth comparison
    pub fn set_depth_test_func(&mut self, func: CompFunc) -> DeviceResult<()> {
        self.ensure_ready("set_depth_test_func")?;
        self.state.set_depth_test_func(func);
        Ok(())
    }

    /// Set polygon offset factor and units
    pub fn set_depth_bias(&mut self, factor: f32, units: f32) -> DeviceResult<()> {
        self.ensure_ready("set_depth_bias")?;
        self.state.set_depth_bias(factor, units);
        Ok(())
    }

    /// Set the alpha test comparison and reference value
    pub fn set_alpha_test_func(&mut self, func: CompFunc, reference: f32) -> DeviceResult<()> {
        self.ensure_ready("set_alpha_test_func")?;
        self.state.set_alpha_test_func(func, reference);
        Ok(())
    }

    /// Set blend factors
    pub fn set_blend_func(&mut self, src: BlendFunc, dst: BlendFunc) -> DeviceResult<()> {
        self.ensure_ready("set_blend_func")?;
        self.state.set_blend_func(src, dst);
        Ok(())
    }

    /// Set the clear color
    pub fn set_clear_color(&mut self, color: Color) -> DeviceResult<()> {
        self.ensure_ready("set_clear_color")?;
        self.state.set_clear_color(color);
        Ok(())
    }

    /// Set the global ambient color
    pub fn set_global_ambient(&mut self, color: Color) -> DeviceResult<()> {
        self.ensure_ready("set_global_ambient")?;
        self.state.set_global_ambient(color);
        Ok(())
    }

    /// Set fog parameters
    pub fn set_fog_params(&mut self, fog: FogParams) -> DeviceResult<()> {
        self.ensure_ready("set_fog_params")?;
        self.state.set_fog_params(fog);
        Ok(())
    }

    /// Set the front-face winding
    pub fn set_cull_mode(&mut self, mode: CullMode) -> DeviceResult<()> {
        self.ensure_ready("set_cull_mode")?;
        self.state.set_cull_mode(mode);
        Ok(())
    }

    /// Set the shade model
    pub fn set_shade_model(&mut self, model: ShadeModel) -> DeviceResult<()> {
        self.ensure_ready("set_shade_model")?;
        self.state.set_shade_model(model);
        Ok(())
    }

    /// Set the shadow color
    pub fn set_shadow_color(&mut self, color: Color) -> DeviceResult<()> {
        self.ensure_ready("set_shadow_color")?;
        self.state.set_shadow_color(color);
        Ok(())
    }

    /// Set the polygon fill mode
    pub fn set_fill_mode(&mut self, mode: FillMode) -> DeviceResult<()> {
        self.ensure_ready("set_fill_mode")?;
        self.state.set_fill_mode(mode);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Visibility
    // ---------------------------------------------------------------------

    /// Classify a sphere, in object space of the current world transform,
    /// against the current view frustum
    pub fn compute_sphere_visibility(&mut self, center: &Vec3, radius: f32) -> DeviceResult<SphereVisibility> {
        self.ensure_ready("compute_sphere_visibility")?;
        Ok(self.frustum().classify_sphere(center, radius))
    }

    /// Frustum planes the sphere is not entirely beyond
    pub fn frustum_plane_mask(&mut self, center: &Vec3, radius: f32) -> DeviceResult<FrustumPlanes> {
        self.ensure_ready("frustum_plane_mask")?;
        Ok(self.frustum().plane_mask(center, radius))
    }

    fn frustum(&mut self) -> Frustum {
        Frustum::from_clip_matrix(&self.state.clip_matrix())
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    /// Current lifecycle state
    pub fn lifecycle(&self) -> DeviceLifecycle {
        self.lifecycle
    }

    /// Current logical state
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Active configuration
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Capabilities detected at `create`
    pub fn capabilities(&self) -> &ContextCapabilities {
        &self.capabilities
    }

    /// Anisotropy level applied to new textures
    pub fn anisotropy_level(&self) -> u32 {
        self.anisotropy
    }

    /// Work counters
    pub fn stats(&self) -> DeviceStats {
        let (uniform_uploads, flushes) = self
            .pipeline
            .as_ref()
            .map_or((0, 0), |p| (p.sync.uniform_uploads(), p.sync.flushes()));
        DeviceStats {
            model_view_recomputes: self.state.model_view_recomputes(),
            uniform_uploads,
            flushes,
            draw_calls: self.draw_calls,
        }
    }

    /// The owned context
    pub fn context(&self) -> &C {
        &self.context
    }

    /// The owned context, mutably
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Give the context back
    pub fn into_context(self) -> C {
        self.context
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn lifecycle_error(&self, operation: &'static str) -> DeviceError {
        match self.lifecycle {
            DeviceLifecycle::Lost => DeviceError::ContextLost,
            state => DeviceError::InvalidLifecycle { operation, state },
        }
    }

    fn ensure_ready(&self, operation: &'static str) -> DeviceResult<()> {
        match self.lifecycle {
            DeviceLifecycle::Created | DeviceLifecycle::InScene => Ok(()),
            _ => Err(self.lifecycle_error(operation)),
        }
    }

    fn ensure_in_scene(&self, operation: &'static str) -> DeviceResult<()> {
        match self.lifecycle {
            DeviceLifecycle::InScene => Ok(()),
            _ => Err(self.lifecycle_error(operation)),
        }
    }

    /// Move to `Lost` when a result reports context loss
    fn track<T>(&mut self, result: DeviceResult<T>) -> DeviceResult<T> {
        if let Err(DeviceError::ContextLost) = &result {
            if self.lifecycle != DeviceLifecycle::Lost {
                log::error!("Rendering context lost");
            }
            self.lifecycle = DeviceLifecycle::Lost;
        }
        result
    }

    /// Drain context errors in debug mode
    fn check_errors(&mut self) -> DeviceResult<()> {
        if !self.config.debug {
            return Ok(());
        }
        while let Some(error) = self.context.poll_error() {
            let error = DeviceError::from(error);
            if error.is_fatal() {
                return self.track(Err(error));
            }
            log::error!("Context error: {}", error);
        }
        Ok(())
    }

    fn flush(&mut self) {
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.sync.flush(&mut self.context, &mut self.state, &self.textures);
        }
    }

    fn resolve_anisotropy(&self, requested: u32) -> u32 {
        if requested > 1 && !self.capabilities.anisotropy_available {
            log::warn!("Anisotropic filtering requested (level {}) but not supported; using 1", requested);
        }
        effective_anisotropy(&self.capabilities, requested)
    }
}
