//! Texture descriptions and per-stage texture parameters

use serde::{Deserialize, Serialize};

use crate::assets::PixelFormat;
use crate::render::primitives::Color;

/// Pixel format requested at texture creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TexImgFormat {
    /// Use the format of the supplied image
    #[default]
    Auto,
    /// Interpret data as RGB
    Rgb,
    /// Interpret data as BGR
    Bgr,
    /// Interpret data as RGBA
    Rgba,
    /// Interpret data as BGRA
    Bgra,
}

impl TexImgFormat {
    /// Resolve against the image's own format
    pub fn resolve(self, image_format: PixelFormat) -> PixelFormat {
        match self {
            TexImgFormat::Auto => image_format,
            TexImgFormat::Rgb => PixelFormat::Rgb,
            TexImgFormat::Bgr => PixelFormat::Bgr,
            TexImgFormat::Rgba => PixelFormat::Rgba,
            TexImgFormat::Bgra => PixelFormat::Bgra,
        }
    }
}

/// Minification/magnification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TexFilter {
    /// Nearest texel
    #[default]
    Nearest,
    /// Linear within a level
    Bilinear,
    /// Linear within and across mip levels
    Trilinear,
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TexWrapMode {
    /// Clamp to the edge texel
    Clamp,
    /// Clamp to the border color
    ClampToBorder,
    /// Repeat
    #[default]
    Repeat,
}

/// Parameters for creating a color texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextureCreateParams {
    /// How to interpret the pixel data
    pub format: TexImgFormat,
    /// Sampling filter
    pub filter: TexFilter,
    /// Generate a mipmap chain
    pub mipmap: bool,
    /// Pad non power-of-two images up to the next power of two
    pub pad_to_nearest_power_of_two: bool,
}

/// Texture as seen by callers: metadata only, pixels live on the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture {
    /// Allocated size in pixels (after padding)
    pub size: (u32, u32),
    /// Size of the source image
    pub original_size: (u32, u32),
    /// Whether the texture carries alpha
    pub alpha: bool,
    /// Pixel format of the color data, `None` for depth textures
    pub format: Option<PixelFormat>,
    /// Depth precision in bits, `Some` only for depth textures
    pub depth_bits: Option<u8>,
    /// Creation parameters
    pub params: TextureCreateParams,
}

impl Texture {
    /// Whether this is a depth texture
    pub fn is_depth(&self) -> bool {
        self.depth_bits.is_some()
    }
}

/// Color/alpha combine operation of a texture stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TexMixOperation {
    /// Stage default (modulate)
    #[default]
    Default,
    /// Use the first argument
    Replace,
    /// `arg1 * arg2`
    Modulate,
    /// `arg1 + arg2`
    Add,
    /// `arg1 - arg2`
    Subtract,
}

impl TexMixOperation {
    /// Integer code passed to the program; the default maps to modulate
    pub fn shader_code(self) -> i32 {
        match self {
            TexMixOperation::Default | TexMixOperation::Modulate => 2,
            TexMixOperation::Replace => 1,
            TexMixOperation::Add => 3,
            TexMixOperation::Subtract => 4,
        }
    }
}

/// Source of a combine argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TexMixArgument {
    /// This stage's texture sample
    #[default]
    Texture,
    /// Result of the previous stage
    Computed,
    /// Interpolated vertex color
    Src,
    /// The stage factor color
    Factor,
}

impl TexMixArgument {
    /// Integer code passed to the program
    pub fn shader_code(self) -> i32 {
        self as i32
    }
}

/// Per-stage combine and wrap parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextureStageParams {
    /// Color operation
    pub color_operation: TexMixOperation,
    /// First color argument
    pub color_arg1: TexMixArgument,
    /// Second color argument
    pub color_arg2: TexMixArgument,
    /// Alpha operation
    pub alpha_operation: TexMixOperation,
    /// First alpha argument
    pub alpha_arg1: TexMixArgument,
    /// Second alpha argument
    pub alpha_arg2: TexMixArgument,
    /// Wrap along S
    pub wrap_s: TexWrapMode,
    /// Wrap along T
    pub wrap_t: TexWrapMode,
    /// Constant factor color
    pub factor: Color,
}

impl Default for TextureStageParams {
    fn default() -> Self {
        Self {
            color_operation: TexMixOperation::Default,
            color_arg1: TexMixArgument::Texture,
            color_arg2: TexMixArgument::Computed,
            alpha_operation: TexMixOperation::Default,
            alpha_arg1: TexMixArgument::Texture,
            alpha_arg2: TexMixArgument::Computed,
            wrap_s: TexWrapMode::Repeat,
            wrap_t: TexWrapMode::Repeat,
            factor: Color::WHITE,
        }
    }
}

/// Automatic texture coordinate generation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TexGenMode {
    /// Use the vertex texture coordinates
    #[default]
    None,
    /// Plane equation in object space
    ObjectLinear,
    /// Plane equation in eye space
    EyeLinear,
    /// Sphere map
    Sphere,
    /// Eye-space normal
    Normal,
    /// Eye-space reflection vector
    Reflection,
}

/// Generation parameters for one coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TexGenCoord {
    /// Generation mode
    pub mode: TexGenMode,
    /// Plane for the linear modes
    pub plane: [f32; 4],
}

/// Coordinate generation for the S, T, R and Q coordinates of a stage
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TextureGenerationParams {
    /// S, T, R, Q in order
    pub coords: [TexGenCoord; 4],
}

impl TexGenMode {
    /// Integer code passed to the program
    pub fn shader_code(self) -> i32 {
        self as i32
    }
}

impl TextureGenerationParams {
    /// Whether any coordinate is generated
    pub fn is_active(&self) -> bool {
        self.coords.iter().any(|c| c.mode != TexGenMode::None)
    }
}

/// Framebuffer attachment addressed by `set_render_texture`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// Color attachment
    Color,
    /// Depth attachment
    Depth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_format_follows_image() {
        assert_eq!(TexImgFormat::Auto.resolve(PixelFormat::Bgra), PixelFormat::Bgra);
        assert_eq!(TexImgFormat::Rgb.resolve(PixelFormat::Bgr), PixelFormat::Rgb);
    }

    #[test]
    fn test_generation_params_activity() {
        let mut params = TextureGenerationParams::default();
        assert!(!params.is_active());
        params.coords[1].mode = TexGenMode::Sphere;
        assert!(params.is_active());
    }
}
