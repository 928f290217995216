//! # Rendering System
//!
//! A fixed-function style device emulated on top of a shader-based context.
//!
//! ## Architecture
//!
//! - **Resource Registry** (`resources`): handle → GPU buffer/texture tables
//! - **Pipeline State Cache** (`state`): current logical state plus dirty tracking
//! - **Uniform Synchronizer** (`sync`): pushes dirty state into the bound program
//! - **Command Surface** (`device`): the public [`Device`]
//! - **Visibility Helpers** (`visibility`): sphere vs. frustum classification
//! - **Backends** (`backends`): context implementations, currently headless
//!
//! Callers only see the fixed-function vocabulary; programs, vertex arrays and
//! uniforms never leak through the device API.

pub mod api;
pub mod backends;
pub mod device;
pub mod primitives;
pub mod resources;
pub mod state;
pub mod sync;
pub mod systems;
pub mod visibility;

pub use api::{ContextCapabilities, ContextError, GraphicsContext, UniformValue};
pub use device::{Device, DeviceLifecycle, DeviceStats, FramePixels};
pub use primitives::{Color, PrimitiveType, Vertex, VertexCol, VertexFormat, VertexLayout, VertexTex2};
pub use resources::{
    BufferHandle, Material, RenderTarget, TexFilter, TexGenMode, TexImgFormat, TexMixArgument,
    TexMixOperation, TexWrapMode, Texture, TextureCreateParams, TextureGenerationParams,
    TextureHandle, TextureStageParams,
};
pub use state::{
    BlendFunc, ColorMask, CompFunc, CullMode, FillMode, FogMode, RenderState, ShadeModel,
    TransformType, Viewport,
};
pub use systems::lighting::{Light, LightType};
pub use visibility::{FrustumPlanes, SphereVisibility};

use thiserror::Error;

/// Errors reported by the device
///
/// Contract violations are caller bugs and leave the device untouched.
/// Resource exhaustion leaves the device usable. [`DeviceError::ContextLost`]
/// is the only fatal condition.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// Operation not valid in the device's current lifecycle state
    #[error("{operation} is not valid while the device is {state:?}")]
    InvalidLifecycle {
        /// Operation attempted
        operation: &'static str,
        /// Lifecycle state at the time
        state: DeviceLifecycle,
    },

    /// `begin_scene`/`end_scene` called out of order
    #[error("Unmatched scene bracket: {0}")]
    UnmatchedScene(&'static str),

    /// Buffer handle was never created or has been destroyed
    #[error("Unknown buffer handle {0:?}")]
    UnknownBuffer(BufferHandle),

    /// Texture handle was never created or has been destroyed
    #[error("Unknown texture handle {0:?}")]
    UnknownTexture(TextureHandle),

    /// Light slot outside `0..max`
    #[error("Light index {index} out of range (max {max})")]
    LightIndexOutOfRange {
        /// Requested slot
        index: usize,
        /// Slot count
        max: usize,
    },

    /// Texture stage outside `0..max`
    #[error("Texture stage {index} out of range (max {max})")]
    TextureStageOutOfRange {
        /// Requested stage
        index: usize,
        /// Stage count
        max: usize,
    },

    /// Buffer update used a different vertex layout than creation
    #[error("Buffer layout mismatch: created as {expected:?}, updated with {found:?}")]
    BufferLayoutMismatch {
        /// Layout at creation
        expected: VertexLayout,
        /// Layout supplied
        found: VertexLayout,
    },

    /// Buffer update used a different vertex count than creation
    #[error("Buffer vertex count mismatch: created with {expected}, updated with {found}")]
    BufferCountMismatch {
        /// Count at creation
        expected: usize,
        /// Count supplied
        found: usize,
    },

    /// Zero-sized or otherwise unusable dimensions
    #[error("Invalid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// Pixel data inconsistent with the requested texture
    #[error("Invalid texture data: {0}")]
    InvalidTextureData(String),

    /// Off-screen operation without an off-screen target
    #[error("Off-screen buffer is not initialized")]
    OffscreenNotInitialized,

    /// Off-screen target larger than the context supports
    #[error("Off-screen buffer {width}x{height} exceeds maximum renderbuffer size {max}")]
    OffscreenTooLarge {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Largest supported edge
        max: u32,
    },

    /// GPU allocation failed
    #[error("Resource creation failed: {0}")]
    ResourceCreation(String),

    /// Device setup failed (unsupported context, program compilation)
    #[error("Device initialization failed: {0}")]
    Initialization(String),

    /// Context rejected an operation
    #[error("Backend error: {0}")]
    Backend(String),

    /// The rendering context is gone; recreate the device
    #[error("Rendering context lost")]
    ContextLost,
}

impl DeviceError {
    /// Whether this error reports a caller bug
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            DeviceError::InvalidLifecycle { .. }
                | DeviceError::UnmatchedScene(_)
                | DeviceError::UnknownBuffer(_)
                | DeviceError::UnknownTexture(_)
                | DeviceError::LightIndexOutOfRange { .. }
                | DeviceError::TextureStageOutOfRange { .. }
                | DeviceError::BufferLayoutMismatch { .. }
                | DeviceError::BufferCountMismatch { .. }
                | DeviceError::InvalidDimensions { .. }
                | DeviceError::InvalidTextureData(_)
                | DeviceError::OffscreenNotInitialized
        )
    }

    /// Whether the device can no longer be used
    pub fn is_fatal(&self) -> bool {
        matches!(self, DeviceError::ContextLost)
    }
}

impl From<ContextError> for DeviceError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::OutOfMemory(msg) => DeviceError::ResourceCreation(msg),
            ContextError::ContextLost => DeviceError::ContextLost,
            ContextError::CompileFailed(msg) => DeviceError::Initialization(msg),
            ContextError::Unsupported(msg) | ContextError::InvalidOperation(msg) => {
                DeviceError::Backend(msg)
            }
        }
    }
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(DeviceError::UnmatchedScene("end_scene").is_contract_violation());
        assert!(DeviceError::LightIndexOutOfRange { index: 8, max: 8 }.is_contract_violation());
        assert!(!DeviceError::ResourceCreation("oom".into()).is_contract_violation());
        assert!(DeviceError::ContextLost.is_fatal());
        assert!(!DeviceError::ContextLost.is_contract_violation());
    }

    #[test]
    fn test_context_errors_map_to_device_errors() {
        assert_eq!(
            DeviceError::from(ContextError::OutOfMemory("vbo".into())),
            DeviceError::ResourceCreation("vbo".into())
        );
        assert_eq!(DeviceError::from(ContextError::ContextLost), DeviceError::ContextLost);
        assert!(matches!(
            DeviceError::from(ContextError::CompileFailed("link".into())),
            DeviceError::Initialization(_)
        ));
    }
}
