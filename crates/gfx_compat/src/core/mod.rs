//! # Core Module
//!
//! Shared configuration types used by the device and its callers.

pub mod config;

// Re-export commonly used config types
pub use crate::config::{Config, ConfigError};
pub use config::{ContextFormatHints, DeviceConfig, ShaderConfig};
