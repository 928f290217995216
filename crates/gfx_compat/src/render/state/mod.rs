//! Render state vocabulary and the pipeline state cache

pub mod pipeline_state;
pub mod render_state;

pub use pipeline_state::{
    DirtyFlags, PendingChanges, PipelineState, TextureStage, TransformType, MAX_LIGHT_COUNT,
    MAX_TEXTURE_STAGE_COUNT, SHADOW_STAGE,
};
pub use render_state::{
    AlphaTest, BlendFunc, BlendState, ColorMask, CompFunc, CullMode, DepthBias, FillMode, FogMode,
    FogParams, RenderState, ShadeModel, Viewport,
};
