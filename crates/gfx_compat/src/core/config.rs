//! # Device Configuration
//!
//! Configuration handed to a [`Device`](crate::render::Device) at construction
//! and re-appliable later through `config_changed`. Every option maps onto a
//! concrete pipeline effect:
//!
//! - **anisotropy_level**: sampler anisotropy for every texture (clamped to
//!   what the context reports, ignored when unsupported)
//! - **debug**: poll the context for errors after flushes and draws
//! - **per_pixel_lighting**: selects the lighting branch evaluated by the
//!   bound program
//! - **shaders**: program sources handed to the compile step
//! - **format**: context-format hints for the windowing layer

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// # Shader Configuration
///
/// Paths of the program sources the device asks the context to compile and link.
/// The device never reads or parses these files itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Path to the vertex shader source
    pub vertex_shader_path: String,
    /// Path to the fragment shader source
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Validate that both stages are named
    pub fn validate(&self) -> Result<(), String> {
        if self.vertex_shader_path.is_empty() {
            return Err("Vertex shader path cannot be empty".to_string());
        }
        if self.fragment_shader_path.is_empty() {
            return Err("Fragment shader path cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::new("shaders/gl33/vs_fixed.glsl", "shaders/gl33/fs_fixed.glsl")
    }
}

/// Context-format hints forwarded to whoever creates the rendering context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextFormatHints {
    /// Red channel bits
    pub red_size: u8,
    /// Green channel bits
    pub green_size: u8,
    /// Blue channel bits
    pub blue_size: u8,
    /// Alpha channel bits
    pub alpha_size: u8,
    /// Depth buffer bits
    pub depth_size: u8,
    /// Request a double-buffered surface
    pub double_buffer: bool,
    /// Synchronize presentation with vertical blank
    pub vsync: bool,
}

impl Default for ContextFormatHints {
    fn default() -> Self {
        Self {
            red_size: 8,
            green_size: 8,
            blue_size: 8,
            alpha_size: 8,
            depth_size: 24,
            double_buffer: true,
            vsync: true,
        }
    }
}

/// # Device Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Requested anisotropic filtering level (1 disables it)
    pub anisotropy_level: u32,
    /// Validation mode: check context errors after each flush and draw
    pub debug: bool,
    /// Evaluate lighting per fragment instead of per vertex
    pub per_pixel_lighting: bool,
    /// Program sources
    pub shaders: ShaderConfig,
    /// Context-format hints
    pub format: ContextFormatHints,
}

impl DeviceConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self {
            anisotropy_level: 1,
            debug: cfg!(debug_assertions),
            per_pixel_lighting: true,
            shaders: ShaderConfig::default(),
            format: ContextFormatHints::default(),
        }
    }

    /// Set the requested anisotropy level
    pub fn with_anisotropy(mut self, level: u32) -> Self {
        self.anisotropy_level = level;
        self
    }

    /// Enable or disable validation mode
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Choose per-pixel or per-vertex lighting
    pub fn with_per_pixel_lighting(mut self, enabled: bool) -> Self {
        self.per_pixel_lighting = enabled;
        self
    }

    /// Set custom shader configuration
    pub fn with_shaders(mut self, shaders: ShaderConfig) -> Self {
        self.shaders = shaders;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.anisotropy_level == 0 {
            return Err("Anisotropy level must be at least 1".to_string());
        }
        self.shaders.validate()
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for DeviceConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DeviceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.anisotropy_level, 1);
        assert!(config.per_pixel_lighting);
    }

    #[test]
    fn test_zero_anisotropy_rejected() {
        let config = DeviceConfig::new().with_anisotropy(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_partial_file_uses_defaults() {
        let text = "anisotropy_level = 8\nper_pixel_lighting = false\n";
        let config = DeviceConfig::from_str_with_format(text, "device.toml").unwrap();
        assert_eq!(config.anisotropy_level, 8);
        assert!(!config.per_pixel_lighting);
        assert_eq!(config.shaders, ShaderConfig::default());
        assert_eq!(config.format.depth_size, 24);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let config = DeviceConfig::new()
            .with_anisotropy(4)
            .with_debug(true)
            .with_per_pixel_lighting(false)
            .with_shaders(ShaderConfig::new("shaders/ff.vert", "shaders/ff.frag"));

        for extension in ["toml", "ron"] {
            let path = std::env::temp_dir().join(format!("gfx_compat_device_{}.{}", std::process::id(), extension));
            let path = path.to_str().unwrap();

            config.save_to_file(path).unwrap();
            let loaded = DeviceConfig::load_from_file(path).unwrap();
            std::fs::remove_file(path).unwrap();
            assert_eq!(loaded, config, "{} round trip", extension);
        }
    }

    #[test]
    fn test_save_rejects_unknown_extension() {
        let path = std::env::temp_dir().join("gfx_compat_device.ini");
        let result = DeviceConfig::default().save_to_file(path.to_str().unwrap());
        assert!(matches!(result, Err(crate::config::ConfigError::UnsupportedFormat(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = DeviceConfig::load_from_file("/nonexistent/gfx_compat/device.toml");
        assert!(matches!(result, Err(crate::config::ConfigError::Io(_))));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = DeviceConfig::from_str_with_format("", "device.ini");
        assert!(matches!(result, Err(crate::config::ConfigError::UnsupportedFormat(_))));
    }
}
