//! Resource management
//!
//! Handle-based registries for static vertex buffers and textures, the
//! streaming scratch buffers used by immediate draws, and the passive
//! material and texture descriptions.

pub mod buffer_registry;
pub mod material;
pub mod scratch;
pub mod texture;
pub mod texture_registry;

pub use buffer_registry::{BufferHandle, BufferInfo, BufferRegistry};
pub use material::Material;
pub use scratch::{ScratchBuffers, INITIAL_SCRATCH_VERTICES};
pub use texture::{
    RenderTarget, TexFilter, TexGenCoord, TexGenMode, TexImgFormat, TexMixArgument,
    TexMixOperation, TexWrapMode, Texture, TextureCreateParams, TextureGenerationParams,
    TextureStageParams,
};
pub use texture_registry::{effective_anisotropy, TextureHandle, TextureRegistry};
