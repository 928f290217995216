//! Texture registry
//!
//! Validates pixel data, optionally pads it to power-of-two dimensions,
//! uploads it through the context and hands out generational
//! [`TextureHandle`]s.

use slotmap::{new_key_type, SlotMap};

use super::texture::{Texture, TextureCreateParams};
use crate::assets::ImageData;
use crate::foundation::math::utils::next_power_of_two;
use crate::render::api::{ContextCapabilities, GpuTextureId, GraphicsContext, TextureUpload};
use crate::render::{DeviceError, DeviceResult};

new_key_type! {
    /// Handle to a color or depth texture
    pub struct TextureHandle;
}

#[derive(Debug, Clone, Copy)]
struct TextureEntry {
    texture: Texture,
    gpu_texture: GpuTextureId,
}

/// Anisotropy level actually applied for a requested level
///
/// Without anisotropy support every texture uses level 1.
pub fn effective_anisotropy(capabilities: &ContextCapabilities, requested: u32) -> u32 {
    if capabilities.anisotropy_available {
        requested.clamp(1, capabilities.max_anisotropy.max(1))
    } else {
        1
    }
}

/// Registry of live textures
#[derive(Debug, Default)]
pub struct TextureRegistry {
    textures: SlotMap<TextureHandle, TextureEntry>,
}

impl TextureRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload a color texture from decoded pixels
    pub fn create<C: GraphicsContext>(
        &mut self,
        context: &mut C,
        image: &ImageData,
        params: TextureCreateParams,
        anisotropy: u32,
    ) -> DeviceResult<(TextureHandle, Texture)> {
        if image.width == 0 || image.height == 0 {
            return Err(DeviceError::InvalidDimensions { width: image.width, height: image.height });
        }

        let expected = image.width as usize * image.height as usize * image.format.channels();
        if image.data.len() != expected {
            return Err(DeviceError::InvalidTextureData(format!(
                "{}x{} {:?} image needs {} bytes, got {}",
                image.width,
                image.height,
                image.format,
                expected,
                image.data.len()
            )));
        }

        let format = params.format.resolve(image.format);
        if format.channels() != image.format.channels() {
            return Err(DeviceError::InvalidTextureData(format!(
                "requested {:?} but image data is {:?}",
                format, image.format
            )));
        }

        let original_size = (image.width, image.height);
        let padded;
        let source = if params.pad_to_nearest_power_of_two && !image.is_power_of_two() {
            padded = image.padded_to(next_power_of_two(image.width), next_power_of_two(image.height));
            &padded
        } else {
            image
        };
        let size = (source.width, source.height);

        let max = context.capabilities().max_texture_size;
        if size.0 > max || size.1 > max {
            return Err(DeviceError::ResourceCreation(format!(
                "texture {}x{} exceeds maximum size {}",
                size.0, size.1, max
            )));
        }

        let gpu_texture = context.create_texture(&TextureUpload {
            width: size.0,
            height: size.1,
            format,
            data: &source.data,
            filter: params.filter,
            mipmap: params.mipmap,
            anisotropy,
        })?;

        let texture = Texture {
            size,
            original_size,
            alpha: format.has_alpha(),
            format: Some(format),
            depth_bits: None,
            params,
        };
        let handle = self.textures.insert(TextureEntry { texture, gpu_texture });

        log::debug!(
            "Created texture {:?}: {}x{} {:?} (source {}x{})",
            handle,
            size.0,
            size.1,
            format,
            original_size.0,
            original_size.1
        );
        Ok((handle, texture))
    }

    /// Allocate a depth texture, typically a shadow map
    pub fn create_depth<C: GraphicsContext>(
        &mut self,
        context: &mut C,
        width: u32,
        height: u32,
        depth_bits: u8,
    ) -> DeviceResult<(TextureHandle, Texture)> {
        if width == 0 || height == 0 {
            return Err(DeviceError::InvalidDimensions { width, height });
        }

        let gpu_texture = context.create_depth_texture(width, height, depth_bits)?;
        let texture = Texture {
            size: (width, height),
            original_size: (width, height),
            alpha: false,
            format: None,
            depth_bits: Some(depth_bits),
            params: TextureCreateParams::default(),
        };
        let handle = self.textures.insert(TextureEntry { texture, gpu_texture });

        log::debug!("Created depth texture {:?}: {}x{}, {} bits", handle, width, height, depth_bits);
        Ok((handle, texture))
    }

    /// Metadata of a live texture
    pub fn get(&self, handle: TextureHandle) -> DeviceResult<&Texture> {
        self.textures
            .get(handle)
            .map(|entry| &entry.texture)
            .ok_or(DeviceError::UnknownTexture(handle))
    }

    /// Context texture object of a live texture
    pub fn gpu_texture(&self, handle: TextureHandle) -> DeviceResult<GpuTextureId> {
        self.textures
            .get(handle)
            .map(|entry| entry.gpu_texture)
            .ok_or(DeviceError::UnknownTexture(handle))
    }

    /// Whether `handle` refers to a live texture
    pub fn contains(&self, handle: TextureHandle) -> bool {
        self.textures.contains_key(handle)
    }

    /// Every live texture
    pub fn iter(&self) -> impl Iterator<Item = (TextureHandle, &Texture)> + '_ {
        self.textures.iter().map(|(handle, entry)| (handle, &entry.texture))
    }

    /// Re-apply an anisotropy level to every color texture
    pub fn apply_anisotropy<C: GraphicsContext>(&self, context: &mut C, level: u32) {
        for entry in self.textures.values().filter(|entry| !entry.texture.is_depth()) {
            context.set_texture_anisotropy(entry.gpu_texture, level);
        }
    }

    /// Release one texture
    pub fn destroy<C: GraphicsContext>(&mut self, context: &mut C, handle: TextureHandle) -> DeviceResult<()> {
        let entry = self.textures.remove(handle).ok_or(DeviceError::UnknownTexture(handle))?;
        context.delete_texture(entry.gpu_texture);
        log::debug!("Destroyed texture {:?}", handle);
        Ok(())
    }

    /// Release every texture
    pub fn destroy_all<C: GraphicsContext>(&mut self, context: &mut C) {
        let count = self.textures.len();
        for (_, entry) in self.textures.drain() {
            context.delete_texture(entry.gpu_texture);
        }
        if count > 0 {
            log::debug!("Destroyed {} textures", count);
        }
    }

    /// Number of live textures
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether no texture is live
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
