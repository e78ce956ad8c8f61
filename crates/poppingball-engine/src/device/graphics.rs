use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::coords::SurfaceSize;
use crate::error::{RenderError, RenderResult};

use super::{DeviceInit, GraphicsBackend, WgpuBackend};

/// Owns the backend (logical device, queue, surface) for the renderer's lifetime.
///
/// Created first and released last. Release flushes outstanding work before the
/// surface and device are dropped, and is safe to repeat.
pub struct GraphicsDevice<B: GraphicsBackend> {
    backend: Option<B>,
}

impl<B: GraphicsBackend> GraphicsDevice<B> {
    pub fn new(backend: B) -> Self {
        log::info!("graphics device ready ({} backend)", backend.name());
        Self {
            backend: Some(backend),
        }
    }

    pub fn is_released(&self) -> bool {
        self.backend.is_none()
    }

    pub fn backend(&self) -> RenderResult<&B> {
        self.backend
            .as_ref()
            .ok_or_else(|| RenderError::precondition("graphics device already released"))
    }

    pub fn backend_mut(&mut self) -> RenderResult<&mut B> {
        self.backend
            .as_mut()
            .ok_or_else(|| RenderError::precondition("graphics device already released"))
    }

    /// Flushes submitted work, then drops surface and device.
    pub fn release(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.flush();
            log::debug!("releasing {} graphics device", backend.name());
            drop(backend);
        }
    }
}

impl<'w> GraphicsDevice<WgpuBackend<'w>> {
    /// Requests a hardware device and a surface bound to `window`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu; this blocks on it.
    pub fn create<W>(window: &'w W, size: SurfaceSize, init: DeviceInit) -> RenderResult<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync,
    {
        let backend = pollster::block_on(WgpuBackend::new(window, size, init))?;
        Ok(Self::new(backend))
    }
}

impl<B: GraphicsBackend> Drop for GraphicsDevice<B> {
    fn drop(&mut self) {
        self.release();
    }
}
