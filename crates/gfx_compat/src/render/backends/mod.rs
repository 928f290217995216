//! Backend implementations of [`GraphicsContext`](crate::render::api::GraphicsContext)
//!
//! Platform contexts are created by the windowing layer and implement the
//! trait outside this crate. The headless context ships here for tests,
//! tools and the demo.

/// In-memory context
pub mod headless;

pub use headless::HeadlessContext;
