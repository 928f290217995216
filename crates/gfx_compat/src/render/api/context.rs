//! Graphics context abstraction
//!
//! The windowing layer hands the device a ready context. This trait is the
//! function table the device drives: programs and uniforms, vertex buffers,
//! textures, raster state, framebuffers and read-back. Everything here is a
//! thin, stateful, shader-era API; the fixed-function emulation lives
//! entirely above it.
//!
//! Conventions follow OpenGL 3.3 core:
//! - framebuffer and texture rows are stored bottom-up
//! - viewport and copy rectangles use a bottom-left origin
//! - writing to an unresolved uniform location is skipped by the caller

use bitflags::bitflags;
use thiserror::Error;

use crate::assets::PixelFormat;
use crate::core::ShaderConfig;
use crate::foundation::math::Mat4;
use crate::render::primitives::{Color, PrimitiveType, VertexAttribute, VertexLayout};
use crate::render::resources::{RenderTarget, TexFilter, TexWrapMode};
use crate::render::state::{BlendFunc, ColorMask, CompFunc, CullMode, FillMode, Viewport};

/// Result type for context operations
pub type ContextResult<T> = Result<T, ContextError>;

/// Errors reported by a graphics context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The context could not allocate GPU storage
    #[error("Out of GPU memory: {0}")]
    OutOfMemory(String),

    /// The context is gone; nothing further will succeed
    #[error("Rendering context lost")]
    ContextLost,

    /// Program compilation or linking failed
    #[error("Program compilation failed: {0}")]
    CompileFailed(String),

    /// The context cannot do what was asked
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The call was malformed for the context's current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Vertex buffer plus its vertex array setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuBufferId(pub u32);

/// Texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuTextureId(pub u32);

/// Framebuffer object with its own color and depth renderbuffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

/// Resolved uniform slot of a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// Value written into a uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `bool`
    Bool(bool),
    /// `int` / sampler unit
    Int(i32),
    /// `float`
    Float(f32),
    /// `vec2`
    Vec2([f32; 2]),
    /// `vec3`
    Vec3([f32; 3]),
    /// `vec4`
    Vec4([f32; 4]),
    /// `mat4`
    Mat4(Mat4),
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Color> for UniformValue {
    fn from(v: Color) -> Self {
        UniformValue::Vec4(v.to_array())
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

/// Limits and features reported by the context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextCapabilities {
    /// Major and minor API version
    pub version: (u32, u32),
    /// Whether anisotropic filtering is available
    pub anisotropy_available: bool,
    /// Highest anisotropy level accepted
    pub max_anisotropy: u32,
    /// Largest renderbuffer edge in pixels
    pub max_renderbuffer_size: u32,
    /// Largest texture edge in pixels
    pub max_texture_size: u32,
    /// Number of texture units usable from the fragment stage
    pub max_texture_units: u32,
    /// Size of the primary surface
    pub surface_size: (u32, u32),
}

/// Raster switches toggled with enable/disable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Depth test
    DepthTest,
    /// Blending
    Blend,
    /// Face culling
    CullFace,
    /// Polygon offset for filled polygons
    PolygonOffsetFill,
}

bitflags! {
    /// Buffers affected by a clear
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        /// Color buffer
        const COLOR = 1 << 0;
        /// Depth buffer
        const DEPTH = 1 << 1;
    }
}

/// Pixel upload for a color texture
#[derive(Debug, Clone, Copy)]
pub struct TextureUpload<'a> {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Layout of `data`
    pub format: PixelFormat,
    /// Tightly packed rows, first row first
    pub data: &'a [u8],
    /// Sampling filter
    pub filter: TexFilter,
    /// Generate mipmaps
    pub mipmap: bool,
    /// Anisotropy level, 1 when disabled
    pub anisotropy: u32,
}

/// Function table of a ready rendering context
pub trait GraphicsContext {
    /// Limits and features of this context
    fn capabilities(&self) -> ContextCapabilities;

    /// Compile and link a program from the configured sources
    fn compile_program(&mut self, shaders: &ShaderConfig) -> ContextResult<ProgramId>;

    /// Resolve a named uniform; `None` when the program has no such input
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Bind a program, or unbind with `None`
    fn use_program(&mut self, program: Option<ProgramId>);

    /// Write a uniform of the bound program
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    /// Release a program
    fn delete_program(&mut self, program: ProgramId);

    /// Allocate a vertex buffer sized for `data` and upload it
    fn create_vertex_buffer(&mut self, layout: VertexLayout, data: &[u8]) -> ContextResult<GpuBufferId>;

    /// Replace storage with a new allocation sized for `data`
    fn reallocate_vertex_buffer(&mut self, buffer: GpuBufferId, data: &[u8]) -> ContextResult<()>;

    /// Overwrite part of the existing storage without reallocating
    fn update_vertex_buffer(&mut self, buffer: GpuBufferId, offset: usize, data: &[u8]) -> ContextResult<()>;

    /// Release a vertex buffer
    fn delete_vertex_buffer(&mut self, buffer: GpuBufferId);

    /// Value used for an attribute the bound vertex layout does not provide
    fn set_constant_attribute(&mut self, attribute: VertexAttribute, value: [f32; 4]);

    /// Draw `count` vertices starting at `first` from `buffer`
    fn draw_arrays(&mut self, buffer: GpuBufferId, primitive: PrimitiveType, first: usize, count: usize) -> ContextResult<()>;

    /// Allocate and upload a color texture
    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> ContextResult<GpuTextureId>;

    /// Allocate a depth texture with no initial data
    fn create_depth_texture(&mut self, width: u32, height: u32, depth_bits: u8) -> ContextResult<GpuTextureId>;

    /// Release a texture
    fn delete_texture(&mut self, texture: GpuTextureId);

    /// Bind a texture to a unit, or unbind with `None`
    fn bind_texture(&mut self, unit: usize, texture: Option<GpuTextureId>);

    /// Wrap modes for the texture bound to `unit`
    fn set_texture_wrap(&mut self, unit: usize, wrap_s: TexWrapMode, wrap_t: TexWrapMode);

    /// Anisotropy level of a texture
    fn set_texture_anisotropy(&mut self, texture: GpuTextureId, level: u32);

    /// Enable or disable a raster switch
    fn set_capability(&mut self, capability: Capability, enabled: bool);

    /// Enable or disable depth writes
    fn set_depth_mask(&mut self, enabled: bool);

    /// Depth comparison
    fn set_depth_func(&mut self, func: CompFunc);

    /// Blend factors
    fn set_blend_func(&mut self, src: BlendFunc, dst: BlendFunc);

    /// Front-face winding
    fn set_front_face(&mut self, mode: CullMode);

    /// Polygon rasterization mode
    fn set_polygon_mode(&mut self, mode: FillMode);

    /// Polygon offset parameters
    fn set_polygon_offset(&mut self, factor: f32, units: f32);

    /// Color write mask
    fn set_color_mask(&mut self, mask: ColorMask);

    /// Viewport rectangle
    fn set_viewport(&mut self, viewport: Viewport);

    /// Clear color
    fn set_clear_color(&mut self, color: Color);

    /// Clear the bound framebuffer
    fn clear(&mut self, flags: ClearFlags);

    /// Create a framebuffer with color and depth renderbuffers of the given size
    fn create_framebuffer(&mut self, width: u32, height: u32) -> ContextResult<FramebufferId>;

    /// Attach a texture to a framebuffer slot; `None` restores the renderbuffer
    fn attach_texture(&mut self, framebuffer: FramebufferId, target: RenderTarget, texture: Option<GpuTextureId>) -> ContextResult<()>;

    /// Bind a framebuffer for drawing and reading; `None` selects the primary surface
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    /// Release a framebuffer and its renderbuffers
    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    /// Copy a rectangle of the bound framebuffer into a texture
    #[allow(clippy::too_many_arguments)]
    fn copy_framebuffer_to_texture(
        &mut self,
        texture: GpuTextureId,
        x_offset: u32,
        y_offset: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> ContextResult<()>;

    /// Read RGBA8 pixels of the bound framebuffer, bottom row first
    fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32) -> ContextResult<Vec<u8>>;

    /// Take the oldest pending error, if any
    fn poll_error(&mut self) -> Option<ContextError>;
}
