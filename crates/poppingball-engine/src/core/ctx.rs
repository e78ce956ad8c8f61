use winit::window::{Window, WindowId};

use crate::coords::SurfaceSize;
use crate::device::WgpuBackend;
use crate::error::RenderResult;
use crate::render::{Frame, WgpuRenderer};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// The window a frame is rendered into.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Client area in physical pixels.
    pub fn size(&self) -> SurfaceSize {
        SurfaceSize::from(self.window.inner_size())
    }

    pub fn scale_factor(&self) -> f64 {
        self.window.scale_factor()
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by the renderer
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub renderer: &'a mut WgpuRenderer<'w>,
    pub time: FrameTime,
    /// Smoothed frames per second.
    pub fps: f32,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Prepares a frame, lets `draw` record into it, then presents.
    ///
    /// A frame the surface cannot provide is skipped. A lost device ends the
    /// application; other draw errors are logged and the frame is dropped.
    pub fn render<'g, F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&mut Frame<'_, 'g, WgpuBackend<'w>>) -> RenderResult<()>,
    {
        let window = self.window.window;
        let result = self.renderer.prepare().and_then(|mut frame| {
            draw(&mut frame)?;
            window.pre_present_notify();
            frame.swap_buffer()
        });

        match result {
            Ok(()) => AppControl::Continue,
            Err(e) if e.is_transient() => AppControl::Continue,
            Err(e) if e.is_fatal() => {
                log::error!("{e}; shutting down");
                AppControl::Exit
            }
            Err(e) => {
                log::error!("frame dropped: {e}");
                AppControl::Continue
            }
        }
    }
}
