//! Contracts between the runtime (platform loop) and the application.
//!
//! The application never sees winit or wgpu setup; it gets the renderer once at
//! start, host events as they are drained, and a `FrameCtx` per frame.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
