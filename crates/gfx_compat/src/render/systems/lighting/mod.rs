//! Lighting
//!
//! Light definitions consumed by the device's light slots.

#[allow(clippy::module_inception)]
pub mod lighting;

pub use lighting::{Light, LightType};
