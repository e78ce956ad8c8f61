//! PoppingBall engine crate.
//!
//! A small forward renderer: one device, one surface, one pipeline state, one
//! shader program and one constants buffer, driven once per frame through a
//! [`render::Frame`] session. Geometry is caller-owned.
//!
//! Every GPU resource is created through a [`device::GraphicsBackend`]; the wgpu
//! backend drives a real window, the headless backend runs without a GPU.

pub mod core;
pub mod coords;
pub mod device;
pub mod error;
pub mod event;
pub mod logging;
pub mod render;
pub mod time;
pub mod window;

pub use error::{RenderError, RenderResult};
