//! Rendering primitives
//!
//! Value types shared by the device, its context and its callers.

pub mod color;
pub mod vertex;

pub use color::Color;
pub use vertex::{
    AttributeDescriptor, PrimitiveType, Vertex, VertexAttribute, VertexCol, VertexFormat,
    VertexLayout, VertexTex2,
};
