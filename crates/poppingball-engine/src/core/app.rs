use crate::event::HostEvent;
use crate::render::WgpuRenderer;

use super::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
pub trait App {
    /// Called once the renderer exists: load shaders, create geometry.
    fn on_start(&mut self, renderer: &mut WgpuRenderer<'_>) -> anyhow::Result<()>;

    /// Called for every drained host event the renderer did not consume.
    fn on_event(&mut self, event: &HostEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called before the renderer is released; drop geometry here.
    fn on_exit(&mut self) {}
}
