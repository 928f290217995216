//! # gfx_compat
//!
//! A fixed-function 3D device emulated on a shader-based graphics context.
//!
//! Callers speak the classic vocabulary: transforms, a material, indexed
//! lights, texture stages with combine operations, boolean render states,
//! fog and alpha test. The device caches that state, tracks what changed and
//! pushes only the changes into a single program's uniforms right before each
//! draw.
//!
//! ## Features
//!
//! - **Resource Registry**: generational handles for vertex buffers and textures
//! - **Pipeline State Cache**: one setter per state category with dirty tracking
//! - **Uniform Synchronizer**: lazy model-view/normal matrices, per-light and
//!   per-stage uniform blocks, raster state
//! - **Command Surface**: scene lifecycle, immediate and buffered draws,
//!   offscreen rendering and read-back
//! - **Visibility Helpers**: sphere vs. frustum classification
//!
//! ## Quick Start
//!
//! ```rust
//! use gfx_compat::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut device = Device::new(HeadlessContext::new(), DeviceConfig::default());
//!     device.create()?;
//!
//!     device.set_light(0, Light::directional(Vec3::new(0.0, -1.0, 0.0), Color::WHITE))?;
//!     device.set_light_enabled(0, true)?;
//!     device.set_render_state(RenderState::Lighting, true)?;
//!
//!     device.begin_scene()?;
//!     let quad = [
//!         Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
//!         Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
//!         Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
//!         Vertex::new([1.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
//!     ];
//!     device.draw_primitive(PrimitiveType::TriangleStrip, &quad, Color::WHITE)?;
//!     device.end_scene()?;
//!
//!     device.destroy()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core modules
pub mod core;
pub mod config;

pub mod foundation;
pub mod assets;
pub mod render;

/// Common imports for device users
pub mod prelude {
    pub use crate::{
        assets::{ImageData, PixelFormat},
        core::{Config, DeviceConfig, ShaderConfig},
        foundation::math::{Mat4, Mat4Ext, Vec3, Vec4},
        render::{
            backends::HeadlessContext, BlendFunc, BufferHandle, Color, ColorMask, CompFunc,
            CullMode, Device, DeviceError, DeviceLifecycle, DeviceResult, FillMode, FogMode,
            FrustumPlanes, GraphicsContext, Light, LightType, Material, PrimitiveType,
            RenderState, RenderTarget, ShadeModel, SphereVisibility, TexMixArgument,
            TexMixOperation, TexWrapMode, TextureCreateParams, TextureHandle,
            TextureStageParams, TransformType, Vertex, VertexCol, VertexTex2, Viewport,
        },
    };
    pub use crate::render::state::FogParams;
}
