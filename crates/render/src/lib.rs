//! Slide markup renderer.
//!
//! Turns content-unit markup into positioned slide elements.

pub mod renderer;

pub use renderer::SlideRenderer;
