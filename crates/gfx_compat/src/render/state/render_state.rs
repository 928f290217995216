//! Fixed-function state vocabulary
//!
//! These are the knobs a classic state-driven pipeline exposes. Some of them
//! become context raster state, others become uniforms of the bound program;
//! callers never need to know which.

use serde::{Deserialize, Serialize};

use crate::render::primitives::Color;

/// Boolean render states
///
/// The set is closed: a state outside this enum cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderState {
    /// Color blending
    Blending,
    /// Fog
    Fog,
    /// Depth testing
    DepthTest,
    /// Depth buffer writes
    DepthWrite,
    /// Alpha testing
    AlphaTest,
    /// Back face culling
    Culling,
    /// Polygon depth offset
    DepthBias,
    /// Shadow map sampling on the shadow texture stage
    ShadowMapping,
    /// Vertex lighting
    Lighting,
}

impl RenderState {
    /// Number of render states
    pub const COUNT: usize = 9;

    /// Every render state
    pub const ALL: [RenderState; Self::COUNT] = [
        RenderState::Blending,
        RenderState::Fog,
        RenderState::DepthTest,
        RenderState::DepthWrite,
        RenderState::AlphaTest,
        RenderState::Culling,
        RenderState::DepthBias,
        RenderState::ShadowMapping,
        RenderState::Lighting,
    ];

    /// Dense index for table storage
    pub fn index(self) -> usize {
        self as usize
    }

    /// Value a freshly created device starts with
    pub fn default_enabled(self) -> bool {
        matches!(self, RenderState::DepthTest | RenderState::DepthWrite)
    }
}

/// Comparison function for depth and alpha tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompFunc {
    /// Never passes
    Never,
    /// `value < reference`
    Less,
    /// `value == reference`
    Equal,
    /// `value != reference`
    NotEqual,
    /// `value <= reference`
    LessEqual,
    /// `value > reference`
    Greater,
    /// `value >= reference`
    GreaterEqual,
    /// Always passes
    Always,
}

impl CompFunc {
    /// Evaluate the comparison
    pub fn compare(self, value: f32, reference: f32) -> bool {
        match self {
            CompFunc::Never => false,
            CompFunc::Less => value < reference,
            CompFunc::Equal => value == reference,
            CompFunc::NotEqual => value != reference,
            CompFunc::LessEqual => value <= reference,
            CompFunc::Greater => value > reference,
            CompFunc::GreaterEqual => value >= reference,
            CompFunc::Always => true,
        }
    }

    /// Integer code passed to the program
    pub fn shader_code(self) -> i32 {
        self as i32
    }
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFunc {
    /// `0`
    Zero,
    /// `1`
    One,
    /// Source color
    SrcColor,
    /// `1 - source color`
    InvSrcColor,
    /// Destination color
    DstColor,
    /// `1 - destination color`
    InvDstColor,
    /// Source alpha
    SrcAlpha,
    /// `1 - source alpha`
    InvSrcAlpha,
    /// Destination alpha
    DstAlpha,
    /// `1 - destination alpha`
    InvDstAlpha,
    /// `min(source alpha, 1 - destination alpha)`
    SrcAlphaSaturate,
}

/// Fog falloff model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FogMode {
    /// Linear between start and end
    Linear,
    /// Exponential in density
    Exp,
    /// Squared exponential in density
    Exp2,
}

impl FogMode {
    /// Integer code passed to the program
    pub fn shader_code(self) -> i32 {
        self as i32
    }
}

/// Winding considered front-facing when culling is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CullMode {
    /// Clockwise polygons face the viewer
    Cw,
    /// Counter-clockwise polygons face the viewer
    Ccw,
}

/// Interpolation of lit colors across a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShadeModel {
    /// One color per primitive
    Flat,
    /// Interpolated colors
    Smooth,
}

/// Polygon rasterization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillMode {
    /// Vertices only
    Point,
    /// Edges only
    Lines,
    /// Filled polygons
    Polygon,
}

/// Per-channel color write mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorMask {
    /// Write red
    pub red: bool,
    /// Write green
    pub green: bool,
    /// Write blue
    pub blue: bool,
    /// Write alpha
    pub alpha: bool,
}

impl ColorMask {
    /// Every channel writable
    pub const ALL: ColorMask = ColorMask { red: true, green: true, blue: true, alpha: true };

    /// Mask as an array in RGBA order
    pub fn to_array(self) -> [bool; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }
}

impl Default for ColorMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Viewport rectangle in window pixels, origin at the bottom-left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Viewport {
    /// Left edge
    pub x: i32,
    /// Bottom edge
    pub y: i32,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Viewport {
    /// Create a viewport
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Fog parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FogParams {
    /// Falloff model
    pub mode: FogMode,
    /// Fog color
    pub color: Color,
    /// Distance where linear fog starts
    pub start: f32,
    /// Distance where linear fog is total
    pub end: f32,
    /// Density for exponential modes
    pub density: f32,
}

impl Default for FogParams {
    fn default() -> Self {
        Self { mode: FogMode::Linear, color: Color::BLACK, start: 0.0, end: 1.0, density: 1.0 }
    }
}

/// Polygon offset parameters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DepthBias {
    /// Slope-scaled factor
    pub factor: f32,
    /// Constant units
    pub units: f32,
}

/// Alpha test parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlphaTest {
    /// Comparison function
    pub func: CompFunc,
    /// Reference value in `[0, 1]`
    pub reference: f32,
}

impl Default for AlphaTest {
    fn default() -> Self {
        Self { func: CompFunc::Greater, reference: 0.5 }
    }
}

/// Source and destination blend factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendState {
    /// Source factor
    pub src: BlendFunc,
    /// Destination factor
    pub dst: BlendFunc,
}

impl Default for BlendState {
    fn default() -> Self {
        Self { src: BlendFunc::One, dst: BlendFunc::Zero }
    }
}
