//! Offscreen render target and framebuffer read-back

use super::Device;
use crate::render::api::{FramebufferId, GraphicsContext};
use crate::render::resources::{RenderTarget, TextureHandle};
use crate::render::state::Viewport;
use crate::render::{DeviceError, DeviceResult};

const RGBA: usize = 4;

/// The active offscreen framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct OffscreenTarget {
    pub(super) framebuffer: FramebufferId,
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) color: Option<TextureHandle>,
    pub(super) depth: Option<TextureHandle>,
}

/// RGBA8 pixels read back from the current target, top row first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePixels {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Tightly packed rows, `stride()` bytes each
    pub data: Vec<u8>,
}

impl FramePixels {
    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.width as usize * RGBA
    }

    /// Row `y`, counted from the top
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.stride();
        self.data.get(start..start + self.stride())
    }

    /// Pixel at `(x, y)`, counted from the top-left corner
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width {
            return None;
        }
        let row = self.row(y)?;
        let start = x as usize * RGBA;
        Some([row[start], row[start + 1], row[start + 2], row[start + 3]])
    }
}

/// Drop the part of a span that lies below zero
fn clip_to_origin(start: i32, extent: u32) -> (u32, u32) {
    match u32::try_from(start) {
        Ok(start) => (start, extent),
        Err(_) => (0, extent.saturating_sub(start.unsigned_abs())),
    }
}

impl<C: GraphicsContext> Device<C> {
    /// Create an offscreen framebuffer and direct rendering into it
    ///
    /// Any previous offscreen target is released once the new one exists; if
    /// creation fails the previous target stays current. The viewport is set
    /// to cover the new target.
    pub fn init_offscreen_buffer(&mut self, width: u32, height: u32) -> DeviceResult<()> {
        self.ensure_ready("init_offscreen_buffer")?;
        if width == 0 || height == 0 {
            return Err(DeviceError::InvalidDimensions { width, height });
        }
        let max = self.capabilities.max_renderbuffer_size;
        if width > max || height > max {
            return Err(DeviceError::OffscreenTooLarge { width, height, max });
        }

        let created = self.context.create_framebuffer(width, height).map_err(DeviceError::from);
        let framebuffer = self.track(created)?;

        self.release_offscreen();
        self.context.bind_framebuffer(Some(framebuffer));
        self.offscreen = Some(OffscreenTarget { framebuffer, width, height, color: None, depth: None });
        self.state.set_viewport(Viewport::new(0, 0, width, height));

        log::debug!("Offscreen buffer {:?} initialized at {}x{}", framebuffer, width, height);
        Ok(())
    }

    /// Attach a texture to the offscreen color or depth slot, or restore the
    /// renderbuffer with `None`
    pub fn set_render_texture(&mut self, target: RenderTarget, texture: Option<TextureHandle>) -> DeviceResult<()> {
        self.ensure_ready("set_render_texture")?;
        let offscreen = self.offscreen.ok_or(DeviceError::OffscreenNotInitialized)?;

        let gpu_texture = match texture {
            Some(handle) => {
                let info = self.textures.get(handle)?;
                match (target, info.is_depth()) {
                    (RenderTarget::Color, true) => {
                        return Err(DeviceError::InvalidTextureData("depth texture attached as color".to_string()));
                    }
                    (RenderTarget::Depth, false) => {
                        return Err(DeviceError::InvalidTextureData("color texture attached as depth".to_string()));
                    }
                    _ => {}
                }
                Some(self.textures.gpu_texture(handle)?)
            }
            None => None,
        };

        let attached = self
            .context
            .attach_texture(offscreen.framebuffer, target, gpu_texture)
            .map_err(DeviceError::from);
        self.track(attached)?;

        if let Some(current) = self.offscreen.as_mut() {
            match target {
                RenderTarget::Color => current.color = texture,
                RenderTarget::Depth => current.depth = texture,
            }
        }
        log::trace!("Offscreen {:?} attachment set to {:?}", target, texture);
        Ok(())
    }

    /// Render into the primary surface again
    ///
    /// The offscreen framebuffer is released; attached textures stay alive.
    pub fn restore_primary_target(&mut self) -> DeviceResult<()> {
        self.ensure_ready("restore_primary_target")?;
        if self.offscreen.is_none() {
            return Err(DeviceError::OffscreenNotInitialized);
        }

        self.release_offscreen();
        let (width, height) = self.capabilities.surface_size;
        self.state.set_viewport(Viewport::new(0, 0, width, height));
        Ok(())
    }

    /// Whether draws currently go to an offscreen framebuffer
    pub fn offscreen_size(&self) -> Option<(u32, u32)> {
        self.offscreen.map(|target| (target.width, target.height))
    }

    /// Copy a rectangle of the current target into a texture
    ///
    /// `x`/`y` address the source with a bottom-left origin; the offsets
    /// address the destination texture.
    #[allow(clippy::too_many_arguments)]
    pub fn copy_framebuffer_to_texture(
        &mut self,
        texture: TextureHandle,
        x_offset: u32,
        y_offset: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> DeviceResult<()> {
        self.ensure_ready("copy_framebuffer_to_texture")?;
        let gpu_texture = self.textures.gpu_texture(texture)?;
        if self.textures.get(texture)?.is_depth() {
            return Err(DeviceError::InvalidTextureData("cannot copy color into a depth texture".to_string()));
        }

        let copied = self
            .context
            .copy_framebuffer_to_texture(gpu_texture, x_offset, y_offset, x, y, width, height)
            .map_err(DeviceError::from);
        self.track(copied)?;
        self.check_errors()
    }

    /// Read the viewport region of the current target as top-down RGBA8 rows
    pub fn get_frame_buffer_pixels(&mut self) -> DeviceResult<FramePixels> {
        self.ensure_ready("get_frame_buffer_pixels")?;
        let viewport = self.state.viewport();
        let (x, width) = clip_to_origin(viewport.x, viewport.width);
        let (y, height) = clip_to_origin(viewport.y, viewport.height);

        let read = self.context.read_pixels(x, y, width, height).map_err(DeviceError::from);
        let bottom_up = self.track(read)?;

        let stride = width as usize * RGBA;
        let data = if stride == 0 {
            Vec::new()
        } else {
            bottom_up.chunks_exact(stride).rev().flatten().copied().collect()
        };

        Ok(FramePixels { width, height, data })
    }

    pub(super) fn release_offscreen(&mut self) {
        if let Some(target) = self.offscreen.take() {
            self.context.bind_framebuffer(None);
            self.context.delete_framebuffer(target.framebuffer);
            log::debug!("Offscreen buffer {:?} released", target.framebuffer);
        }
    }
}
