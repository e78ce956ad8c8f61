//! Value types shared by the renderer, the scene and the window host.
//!
//! Scene space is normalized device coordinates:
//! - origin at the window center
//! - +X right, +Y up, visible range `[-1, 1]` on both axes
//!
//! Surface sizes and viewports are in physical pixels.

mod color;
mod size;
mod vec3;
mod viewport;

pub use color::ColorRgba;
pub use size::SurfaceSize;
pub use vec3::Vec3;
pub use viewport::Viewport;
