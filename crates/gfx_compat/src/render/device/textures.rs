//! Texture creation and texture stage setters

use super::Device;
use crate::assets::ImageData;
use crate::render::api::GraphicsContext;
use crate::render::resources::{
    RenderTarget, TexWrapMode, Texture, TextureCreateParams, TextureGenerationParams, TextureHandle,
    TextureStageParams,
};
use crate::render::DeviceResult;

impl<C: GraphicsContext> Device<C> {
    /// Upload decoded pixels as a color texture
    ///
    /// Data length and format are validated; the configured anisotropy level
    /// applies.
    pub fn create_texture(&mut self, image: &ImageData, params: TextureCreateParams) -> DeviceResult<TextureHandle> {
        self.ensure_ready("create_texture")?;
        let created = self.textures.create(&mut self.context, image, params, self.anisotropy);
        self.track(created).map(|(handle, _)| handle)
    }

    /// Upload an `image` crate image as a color texture
    pub fn create_texture_from_image(
        &mut self,
        image: &image::DynamicImage,
        params: TextureCreateParams,
    ) -> DeviceResult<TextureHandle> {
        self.create_texture(&ImageData::from_dynamic(image), params)
    }

    /// Allocate a depth texture, usable as a depth attachment
    pub fn create_depth_texture(&mut self, width: u32, height: u32, depth_bits: u8) -> DeviceResult<TextureHandle> {
        self.ensure_ready("create_depth_texture")?;
        let created = self.textures.create_depth(&mut self.context, width, height, depth_bits);
        self.track(created).map(|(handle, _)| handle)
    }

    /// Release a texture, unbinding it from every stage and attachment
    pub fn destroy_texture(&mut self, handle: TextureHandle) -> DeviceResult<()> {
        self.ensure_ready("destroy_texture")?;
        // unknown handles are rejected before anything is unbound
        self.textures.get(handle)?;

        self.state.unbind_texture(handle);
        self.detach_from_offscreen(handle)?;
        self.textures.destroy(&mut self.context, handle)
    }

    /// Release every texture
    pub fn destroy_all_textures(&mut self) -> DeviceResult<()> {
        self.ensure_ready("destroy_all_textures")?;
        self.state.unbind_all_textures();

        let attached: Vec<TextureHandle> = self
            .offscreen
            .iter()
            .flat_map(|target| [target.color, target.depth])
            .flatten()
            .collect();
        for handle in attached {
            self.detach_from_offscreen(handle)?;
        }

        self.textures.destroy_all(&mut self.context);
        Ok(())
    }

    /// Metadata of a live texture
    pub fn texture(&self, handle: TextureHandle) -> DeviceResult<&Texture> {
        self.textures.get(handle)
    }

    /// Every live texture
    pub fn textures(&self) -> impl Iterator<Item = (TextureHandle, &Texture)> + '_ {
        self.textures.iter()
    }

    /// Bind a texture to a stage, or clear the stage with `None`
    pub fn set_texture(&mut self, stage: usize, texture: Option<TextureHandle>) -> DeviceResult<()> {
        self.ensure_ready("set_texture")?;
        if let Some(handle) = texture {
            self.textures.get(handle)?;
        }
        self.state.set_texture(stage, texture)
    }

    /// Enable or disable a stage without changing its binding
    pub fn set_texture_enabled(&mut self, stage: usize, enabled: bool) -> DeviceResult<()> {
        self.ensure_ready("set_texture_enabled")?;
        self.state.set_texture_enabled(stage, enabled)
    }

    /// Set color and alpha combine parameters of a stage
    pub fn set_texture_stage_params(&mut self, stage: usize, params: TextureStageParams) -> DeviceResult<()> {
        self.ensure_ready("set_texture_stage_params")?;
        self.state.set_texture_stage_params(stage, params)
    }

    /// Set wrap modes of a stage
    pub fn set_texture_stage_wrap(&mut self, stage: usize, wrap_s: TexWrapMode, wrap_t: TexWrapMode) -> DeviceResult<()> {
        self.ensure_ready("set_texture_stage_wrap")?;
        self.state.set_texture_stage_wrap(stage, wrap_s, wrap_t)
    }

    /// Set texture coordinate generation of a stage
    pub fn set_texture_coord_generation(&mut self, stage: usize, generation: TextureGenerationParams) -> DeviceResult<()> {
        self.ensure_ready("set_texture_coord_generation")?;
        self.state.set_texture_coord_generation(stage, generation)
    }

    fn detach_from_offscreen(&mut self, handle: TextureHandle) -> DeviceResult<()> {
        let Some(target) = self.offscreen.as_mut() else {
            return Ok(());
        };

        let slot = if target.color == Some(handle) {
            target.color = None;
            RenderTarget::Color
        } else if target.depth == Some(handle) {
            target.depth = None;
            RenderTarget::Depth
        } else {
            return Ok(());
        };

        let framebuffer = target.framebuffer;
        let detached = self.context.attach_texture(framebuffer, slot, None).map_err(Into::into);
        log::debug!("Detached texture {:?} from the offscreen {:?} attachment", handle, slot);
        self.track(detached)
    }
}
