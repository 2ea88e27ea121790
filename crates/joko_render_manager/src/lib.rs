//! Turns published packs and the live camera into 2d draw primitives, once per frame.

pub mod billboard;
pub mod fade;
pub mod marker;
pub mod math;
pub mod renderer;
pub mod trail;

pub use renderer::PathingRenderer;
