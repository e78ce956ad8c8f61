//! GPU device + presentation surface management.
//!
//! This module is responsible for:
//! - the `GraphicsBackend` seam every renderer resource is created through
//! - the wgpu backend (Instance/Adapter/Device/Queue + window Surface)
//! - a headless backend that counts resources and records passes without a GPU
//! - `GraphicsDevice`, the owning wrapper that flushes and releases a backend

mod backend;
mod error;
mod frame;
mod graphics;
mod init;
mod pass;
mod surface;

pub mod headless;
pub mod wgpu_backend;

pub use backend::GraphicsBackend;
pub use error::SurfaceErrorAction;
pub use frame::WgpuTarget;
pub use graphics::GraphicsDevice;
pub use init::DeviceInit;
pub use pass::{DrawCall, Pass};
pub use surface::PresentationSurface;
pub use wgpu_backend::WgpuBackend;
