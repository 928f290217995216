//! State synchronization into the shader program

pub mod synchronizer;
pub mod uniforms;

pub use synchronizer::UniformSynchronizer;
pub use uniforms::{
    all_uniform_names, light_uniform_name, names, stage_uniform_name, LightUniforms,
    StageUniforms, UniformLocations,
};
