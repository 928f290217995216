//! Objects stored by the headless context

use std::collections::HashMap;

use crate::assets::PixelFormat;
use crate::render::api::{FramebufferId, GpuTextureId, ProgramId, UniformLocation, UniformValue};
use crate::render::primitives::{Color, PrimitiveType, VertexLayout};
use crate::render::resources::{TexFilter, TexWrapMode};
use crate::render::state::{BlendFunc, ColorMask, CompFunc, CullMode, FillMode, Viewport};

/// Linked program with its uniform table
#[derive(Debug, Clone, Default)]
pub struct HeadlessProgram {
    pub(super) locations: HashMap<String, UniformLocation>,
    pub(super) names: HashMap<UniformLocation, String>,
    pub(super) values: HashMap<UniformLocation, UniformValue>,
}

impl HeadlessProgram {
    pub(super) fn declaring<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut program = Self::default();
        for (index, name) in names.into_iter().enumerate() {
            let name = name.into();
            let location = UniformLocation(index as i32);
            program.names.insert(location, name.clone());
            program.locations.insert(name, location);
        }
        program
    }

    /// Current value of a uniform by name
    pub fn value(&self, name: &str) -> Option<UniformValue> {
        self.locations.get(name).and_then(|location| self.values.get(location)).copied()
    }

    /// Every written uniform keyed by name
    pub fn snapshot(&self) -> HashMap<String, UniformValue> {
        self.values
            .iter()
            .filter_map(|(location, value)| self.names.get(location).map(|name| (name.clone(), *value)))
            .collect()
    }
}

/// Vertex buffer contents
#[derive(Debug, Clone)]
pub struct HeadlessBuffer {
    /// Layout given at creation
    pub layout: VertexLayout,
    /// Current bytes
    pub data: Vec<u8>,
    /// Number of storage reallocations
    pub reallocations: u32,
}

/// Texture contents and sampler state
#[derive(Debug, Clone)]
pub struct HeadlessTexture {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Color layout, `None` for depth textures
    pub format: Option<PixelFormat>,
    /// Depth precision of depth textures
    pub depth_bits: Option<u8>,
    /// Pixel bytes, first row first
    pub data: Vec<u8>,
    /// Sampling filter
    pub filter: TexFilter,
    /// Mipmaps requested
    pub mipmap: bool,
    /// Anisotropy level
    pub anisotropy: u32,
    /// Wrap along S
    pub wrap_s: TexWrapMode,
    /// Wrap along T
    pub wrap_t: TexWrapMode,
}

impl HeadlessTexture {
    pub(super) fn channels(&self) -> usize {
        self.format.map_or(0, PixelFormat::channels)
    }
}

/// Framebuffer object
#[derive(Debug, Clone)]
pub struct HeadlessFramebuffer {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Color renderbuffer, RGBA8 bottom-up
    pub color: Vec<u8>,
    /// Texture replacing the color renderbuffer
    pub color_texture: Option<GpuTextureId>,
    /// Texture replacing the depth renderbuffer
    pub depth_texture: Option<GpuTextureId>,
}

/// Raster state as last set on the context
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterSnapshot {
    /// Depth test switch
    pub depth_test: bool,
    /// Depth write mask
    pub depth_mask: bool,
    /// Depth comparison
    pub depth_func: CompFunc,
    /// Blend switch
    pub blend: bool,
    /// Blend source factor
    pub blend_src: BlendFunc,
    /// Blend destination factor
    pub blend_dst: BlendFunc,
    /// Cull switch
    pub cull_face: bool,
    /// Front-face winding
    pub front_face: CullMode,
    /// Polygon mode
    pub polygon_mode: FillMode,
    /// Polygon offset switch
    pub polygon_offset_fill: bool,
    /// Polygon offset factor and units
    pub polygon_offset: (f32, f32),
    /// Color write mask
    pub color_mask: ColorMask,
    /// Viewport rectangle
    pub viewport: Viewport,
    /// Clear color
    pub clear_color: Color,
}

impl Default for RasterSnapshot {
    fn default() -> Self {
        Self {
            depth_test: false,
            depth_mask: true,
            depth_func: CompFunc::Less,
            blend: false,
            blend_src: BlendFunc::One,
            blend_dst: BlendFunc::Zero,
            cull_face: false,
            front_face: CullMode::Ccw,
            polygon_mode: FillMode::Polygon,
            polygon_offset_fill: false,
            polygon_offset: (0.0, 0.0),
            color_mask: ColorMask::ALL,
            viewport: Viewport::default(),
            clear_color: Color::TRANSPARENT,
        }
    }
}

/// One recorded draw
#[derive(Debug, Clone)]
pub struct DrawCall {
    /// Program bound at draw time
    pub program: Option<ProgramId>,
    /// Topology
    pub primitive: PrimitiveType,
    /// First vertex
    pub first: usize,
    /// Vertex count
    pub count: usize,
    /// Layout of the drawn buffer
    pub layout: VertexLayout,
    /// Bytes of the drawn vertices
    pub vertex_data: Vec<u8>,
    /// Constant color used when the layout has no color attribute
    pub constant_color: [f32; 4],
    /// Uniform values of the bound program
    pub uniforms: HashMap<String, UniformValue>,
    /// Texture bound to each unit
    pub textures: Vec<Option<GpuTextureId>>,
    /// Framebuffer drawn into, `None` for the primary surface
    pub framebuffer: Option<FramebufferId>,
    /// Raster state at draw time
    pub raster: RasterSnapshot,
}

impl DrawCall {
    /// Uniform value by name
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }
}
