use crate::coords::SurfaceSize;

/// The acquired back buffer of a wgpu surface and its render-target view.
///
/// Short-lived: holding the surface texture prevents acquisition of the next
/// frame. Presented (and released) by `WgpuBackend::present`.
pub struct WgpuTarget {
    pub(crate) surface_texture: wgpu::SurfaceTexture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) size: SurfaceSize,
}

impl WgpuTarget {
    /// Render-target view of the current back buffer.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }
}
