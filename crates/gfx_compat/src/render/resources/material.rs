//! Surface material

use serde::{Deserialize, Serialize};

use crate::render::primitives::Color;

/// Fixed-function material
///
/// There is a single current material; every `set_material` call replaces it
/// entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Ambient reflectance
    pub ambient: Color,
    /// Diffuse reflectance
    pub diffuse: Color,
    /// Specular reflectance
    pub specular: Color,
    /// Emitted color
    pub emissive: Color,
    /// Specular exponent
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Color::new(0.2, 0.2, 0.2, 1.0),
            diffuse: Color::new(0.8, 0.8, 0.8, 1.0),
            specular: Color::BLACK,
            emissive: Color::BLACK,
            shininess: 0.0,
        }
    }
}

impl Material {
    /// Material with the given diffuse color and a matching ambient term
    pub fn with_diffuse(diffuse: Color) -> Self {
        Self { ambient: diffuse, diffuse, ..Default::default() }
    }

    /// Set the specular term
    pub fn with_specular(mut self, specular: Color, shininess: f32) -> Self {
        self.specular = specular;
        self.shininess = shininess;
        self
    }

    /// Set the emissive term
    pub fn with_emissive(mut self, emissive: Color) -> Self {
        self.emissive = emissive;
        self
    }
}
