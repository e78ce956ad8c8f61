//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the window, and stores the renderer beside
//! the window it borrows.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
