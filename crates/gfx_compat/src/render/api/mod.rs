//! Context-facing API
//!
//! The trait a rendering context implements to host a [`Device`](crate::render::Device).

pub mod context;

pub use context::{
    Capability, ClearFlags, ContextCapabilities, ContextError, ContextResult, FramebufferId,
    GpuBufferId, GpuTextureId, GraphicsContext, ProgramId, TextureUpload, UniformLocation,
    UniformValue,
};
