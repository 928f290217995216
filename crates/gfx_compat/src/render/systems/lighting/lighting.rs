//! Fixed-function light sources
//!
//! A light is pure data; the device keeps one per slot and the uniform
//! synchronizer turns it into per-slot program inputs.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Vec3, Vec4};
use crate::render::primitives::Color;

/// Light types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightType {
    /// Point light (like a lightbulb)
    Point,
    /// Directional light (like sunlight)
    Directional,
    /// Spot light (like a flashlight)
    Spot,
}

impl LightType {
    /// Integer code passed to the program
    pub fn shader_code(self) -> i32 {
        match self {
            LightType::Point => 0,
            LightType::Directional => 1,
            LightType::Spot => 2,
        }
    }
}

/// Light source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// Light type
    pub light_type: LightType,
    /// Position (point and spot lights)
    pub position: Vec3,
    /// Direction (directional and spot lights)
    pub direction: Vec3,
    /// Ambient contribution
    pub ambient: Color,
    /// Diffuse contribution
    pub diffuse: Color,
    /// Specular contribution
    pub specular: Color,
    /// Constant attenuation
    pub attenuation0: f32,
    /// Linear attenuation
    pub attenuation1: f32,
    /// Quadratic attenuation
    pub attenuation2: f32,
    /// Spot cone angle in radians
    pub spot_angle: f32,
    /// Spot falloff exponent
    pub spot_intensity: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            light_type: LightType::Point,
            position: Vec3::zeros(),
            direction: Vec3::new(0.0, 0.0, 1.0),
            ambient: Color::new(0.4, 0.4, 0.4, 1.0),
            diffuse: Color::new(0.8, 0.8, 0.8, 1.0),
            specular: Color::WHITE,
            attenuation0: 1.0,
            attenuation1: 0.0,
            attenuation2: 0.0,
            spot_angle: std::f32::consts::FRAC_PI_2,
            spot_intensity: 1.0,
        }
    }
}

impl Light {
    /// Create a directional light
    pub fn directional(direction: Vec3, diffuse: Color) -> Self {
        Self {
            light_type: LightType::Directional,
            direction: direction.normalize(),
            diffuse,
            ..Default::default()
        }
    }

    /// Create a point light
    pub fn point(position: Vec3, diffuse: Color, attenuation: [f32; 3]) -> Self {
        Self {
            light_type: LightType::Point,
            position,
            diffuse,
            attenuation0: attenuation[0],
            attenuation1: attenuation[1],
            attenuation2: attenuation[2],
            ..Default::default()
        }
    }

    /// Create a spot light
    pub fn spot(position: Vec3, direction: Vec3, diffuse: Color, spot_angle: f32, spot_intensity: f32) -> Self {
        Self {
            light_type: LightType::Spot,
            position,
            direction: direction.normalize(),
            diffuse,
            spot_angle,
            spot_intensity,
            ..Default::default()
        }
    }

    /// Homogeneous position handed to the program
    ///
    /// Directional lights point *towards* the light with `w = 0`; positional
    /// lights carry `w = 1`.
    pub fn homogeneous_position(&self) -> Vec4 {
        match self.light_type {
            LightType::Directional => {
                Vec4::new(-self.direction.x, -self.direction.y, -self.direction.z, 0.0)
            }
            LightType::Point | LightType::Spot => {
                Vec4::new(self.position.x, self.position.y, self.position.z, 1.0)
            }
        }
    }

    /// Attenuation coefficients as a vector
    pub fn attenuation(&self) -> Vec3 {
        Vec3::new(self.attenuation0, self.attenuation1, self.attenuation2)
    }
}
