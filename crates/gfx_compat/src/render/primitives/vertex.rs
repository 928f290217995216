//! Vertex formats accepted by the device
//!
//! Three fixed layouts exist: plain (position, normal, one texture
//! coordinate), two-texture-coordinate, and per-vertex colored. Draw and
//! buffer entry points are generic over [`VertexFormat`] so that the upload
//! path is written once and only the [`VertexLayout`] tag differs.

use super::Color;

/// Primitive topology of a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Independent points
    Points,
    /// Independent line segments
    Lines,
    /// Connected line segments
    LineStrip,
    /// Closed connected line segments
    LineLoop,
    /// Independent triangles
    Triangles,
    /// Triangle strip
    TriangleStrip,
    /// Triangle fan
    TriangleFan,
}

/// Shader attribute slots shared by every layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    /// `vec3` position
    Position = 0,
    /// `vec3` normal
    Normal = 1,
    /// `vec4` color
    Color = 2,
    /// `vec2` primary texture coordinate
    TexCoord0 = 3,
    /// `vec2` secondary texture coordinate
    TexCoord1 = 4,
}

/// One attribute inside an interleaved vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    /// Attribute slot
    pub attribute: VertexAttribute,
    /// Number of `f32` components
    pub components: u8,
    /// Byte offset inside the vertex
    pub offset: usize,
}

/// Tag identifying one of the three vertex layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    /// [`Vertex`]
    Plain,
    /// [`VertexTex2`]
    Tex2,
    /// [`VertexCol`]
    Colored,
}

impl VertexLayout {
    /// All layouts, in scratch-buffer order
    pub const ALL: [VertexLayout; 3] = [VertexLayout::Plain, VertexLayout::Tex2, VertexLayout::Colored];

    /// Size of one vertex in bytes
    pub fn stride(self) -> usize {
        match self {
            VertexLayout::Plain => std::mem::size_of::<Vertex>(),
            VertexLayout::Tex2 => std::mem::size_of::<VertexTex2>(),
            VertexLayout::Colored => std::mem::size_of::<VertexCol>(),
        }
    }

    /// Whether colors come from the vertices rather than a flat draw color
    pub fn has_vertex_color(self) -> bool {
        matches!(self, VertexLayout::Colored)
    }

    /// Dense index, used to address per-layout tables
    pub fn index(self) -> usize {
        match self {
            VertexLayout::Plain => 0,
            VertexLayout::Tex2 => 1,
            VertexLayout::Colored => 2,
        }
    }

    /// Interleaved attribute description for vertex array setup
    pub fn attributes(self) -> &'static [AttributeDescriptor] {
        const PLAIN: [AttributeDescriptor; 3] = [
            AttributeDescriptor { attribute: VertexAttribute::Position, components: 3, offset: 0 },
            AttributeDescriptor { attribute: VertexAttribute::Normal, components: 3, offset: 12 },
            AttributeDescriptor { attribute: VertexAttribute::TexCoord0, components: 2, offset: 24 },
        ];
        const TEX2: [AttributeDescriptor; 4] = [
            AttributeDescriptor { attribute: VertexAttribute::Position, components: 3, offset: 0 },
            AttributeDescriptor { attribute: VertexAttribute::Normal, components: 3, offset: 12 },
            AttributeDescriptor { attribute: VertexAttribute::TexCoord0, components: 2, offset: 24 },
            AttributeDescriptor { attribute: VertexAttribute::TexCoord1, components: 2, offset: 32 },
        ];
        const COLORED: [AttributeDescriptor; 2] = [
            AttributeDescriptor { attribute: VertexAttribute::Position, components: 3, offset: 0 },
            AttributeDescriptor { attribute: VertexAttribute::Color, components: 4, offset: 12 },
        ];

        match self {
            VertexLayout::Plain => &PLAIN,
            VertexLayout::Tex2 => &TEX2,
            VertexLayout::Colored => &COLORED,
        }
    }
}

/// A vertex type the device can upload
pub trait VertexFormat: bytemuck::Pod {
    /// Layout tag of this vertex type
    const LAYOUT: VertexLayout;
}

/// Position, normal and one texture coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    /// Position
    pub coord: [f32; 3],
    /// Normal
    pub normal: [f32; 3],
    /// Texture coordinate
    pub tex_coord: [f32; 2],
}

/// Position, normal and two texture coordinates
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexTex2 {
    /// Position
    pub coord: [f32; 3],
    /// Normal
    pub normal: [f32; 3],
    /// Primary texture coordinate
    pub tex_coord: [f32; 2],
    /// Secondary texture coordinate
    pub tex_coord2: [f32; 2],
}

/// Position and per-vertex color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexCol {
    /// Position
    pub coord: [f32; 3],
    /// Vertex color
    pub color: Color,
}

unsafe impl bytemuck::Pod for Vertex {}
unsafe impl bytemuck::Zeroable for Vertex {}
unsafe impl bytemuck::Pod for VertexTex2 {}
unsafe impl bytemuck::Zeroable for VertexTex2 {}
unsafe impl bytemuck::Pod for VertexCol {}
unsafe impl bytemuck::Zeroable for VertexCol {}

impl VertexFormat for Vertex {
    const LAYOUT: VertexLayout = VertexLayout::Plain;
}

impl VertexFormat for VertexTex2 {
    const LAYOUT: VertexLayout = VertexLayout::Tex2;
}

impl VertexFormat for VertexCol {
    const LAYOUT: VertexLayout = VertexLayout::Colored;
}

impl Vertex {
    /// Create a plain vertex
    pub fn new(coord: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self { coord, normal, tex_coord }
    }
}

impl VertexTex2 {
    /// Create a two-texture-coordinate vertex
    pub fn new(coord: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2], tex_coord2: [f32; 2]) -> Self {
        Self { coord, normal, tex_coord, tex_coord2 }
    }
}

impl VertexCol {
    /// Create a colored vertex
    pub fn new(coord: [f32; 3], color: Color) -> Self {
        Self { coord, color }
    }
}
