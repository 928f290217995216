//! Image loading utilities for texture data
//!
//! Decoded pixel buffers are the only thing the device needs from the image
//! layer. `ImageData` can be built from raw bytes or through the `image` crate.

use std::path::Path;

use crate::assets::AssetError;

/// Channel layout of a decoded pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 3 bytes per pixel, red first
    Rgb,
    /// 3 bytes per pixel, blue first
    Bgr,
    /// 4 bytes per pixel, red first
    Rgba,
    /// 4 bytes per pixel, blue first
    Bgra,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb | PixelFormat::Bgr => 3,
            PixelFormat::Rgba | PixelFormat::Bgra => 4,
        }
    }

    /// Whether the layout carries an alpha channel
    pub fn has_alpha(self) -> bool {
        matches!(self, PixelFormat::Rgba | PixelFormat::Bgra)
    }
}

/// Decoded image data ready for GPU upload
///
/// Rows are stored top-down, `width * channels` bytes each, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Channel layout of `data`
    pub format: PixelFormat,
}

impl ImageData {
    /// Wrap an existing pixel buffer, checking its length
    pub fn from_raw(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Result<Self, AssetError> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(AssetError::InvalidData(format!(
                "{}x{} {:?} image needs {} bytes, got {}",
                width,
                height,
                format,
                expected,
                data.len()
            )));
        }
        Ok(Self { data, width, height, format })
    }

    /// Load an image from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();

        log::debug!("Loading image from: {:?}", path_ref);

        let img = image::open(path_ref)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image: {}", e)))?;

        let loaded = Self::from_dynamic(&img);
        log::info!("Loaded image {}x{} from {:?}", loaded.width, loaded.height, path_ref);
        Ok(loaded)
    }

    /// Load image from memory (useful for embedded resources)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image from bytes: {}", e)))?;

        let loaded = Self::from_dynamic(&img);
        log::debug!("Loaded image {}x{} from memory", loaded.width, loaded.height);
        Ok(loaded)
    }

    /// Convert an already decoded `image` buffer, keeping alpha only when present
    pub fn from_dynamic(img: &image::DynamicImage) -> Self {
        if img.color().has_alpha() {
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            Self { data: rgba.into_raw(), width, height, format: PixelFormat::Rgba }
        } else {
            let rgb = img.to_rgb8();
            let (width, height) = rgb.dimensions();
            Self { data: rgb.into_raw(), width, height, format: PixelFormat::Rgb }
        }
    }

    /// Create a solid color image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        let mut data = Vec::with_capacity(pixel_count * 4);

        for _ in 0..pixel_count {
            data.extend_from_slice(&color);
        }

        Self { data, width, height, format: PixelFormat::Rgba }
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Check if image dimensions are power of two (useful for mipmaps)
    pub fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }

    /// Copy into a larger zero-filled canvas, anchored at the top-left corner
    pub fn padded_to(&self, width: u32, height: u32) -> Self {
        if width == self.width && height == self.height {
            return self.clone();
        }

        let channels = self.format.channels();
        let src_stride = self.width as usize * channels;
        let dst_stride = width as usize * channels;
        let mut data = vec![0u8; dst_stride * height as usize];

        for (row, src) in self.data.chunks_exact(src_stride).enumerate() {
            let start = row * dst_stride;
            data[start..start + src_stride].copy_from_slice(src);
        }

        Self { data, width, height, format: self.format }
    }
}
