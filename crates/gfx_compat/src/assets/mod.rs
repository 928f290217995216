//! Asset input for the device
//!
//! Only decoded pixel buffers cross this boundary.

pub mod image_loader;

pub use image_loader::{ImageData, PixelFormat};

use thiserror::Error;

/// Asset loading errors
#[derive(Debug, Error)]
pub enum AssetError {
    /// Asset could not be read or decoded
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// Decoded data is inconsistent with its metadata
    #[error("Invalid asset data: {0}")]
    InvalidData(String),
}
