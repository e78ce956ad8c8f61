use crate::coords::SurfaceSize;
use crate::error::RenderResult;
use crate::render::{CompiledShader, RasterDesc};

use super::Pass;

/// Resource factory and command sink behind a [`GraphicsDevice`](super::GraphicsDevice).
///
/// Every handle type is owned by the component that requested it and released on
/// drop. All calls happen on the thread that owns the renderer.
pub trait GraphicsBackend {
    /// Acquired back buffer plus its render-target view.
    type Target;
    /// Immutable rasterizer configuration.
    type Raster;
    /// Vertex + fragment programs and their input layout.
    type Program;
    /// A program linked against a rasterizer configuration and the surface format.
    type Pipeline;
    /// Immutable vertex buffer.
    type Geometry;
    /// Host-writable uniform buffer holding one constants block per slot.
    type Uniforms;

    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Current surface size in physical pixels.
    fn surface_size(&self) -> SurfaceSize;

    /// Required alignment of dynamic uniform offsets, in bytes.
    fn uniform_alignment(&self) -> u64;

    /// Reconfigures the surface. Zero-sized requests are recorded and deferred.
    fn resize_surface(&mut self, size: SurfaceSize);

    /// Acquires the current back buffer and builds its render-target view.
    fn acquire_target(&mut self) -> RenderResult<Self::Target>;

    /// Size of an acquired target.
    fn target_size(&self, target: &Self::Target) -> SurfaceSize;

    fn create_raster(&mut self, desc: &RasterDesc) -> RenderResult<Self::Raster>;

    fn create_program(&mut self, shader: &CompiledShader) -> RenderResult<Self::Program>;

    fn link_pipeline(
        &mut self,
        program: &Self::Program,
        raster: &Self::Raster,
    ) -> RenderResult<Self::Pipeline>;

    /// Uploads `bytes` once into an immutable vertex buffer.
    fn create_geometry(&mut self, label: &str, bytes: &[u8]) -> RenderResult<Self::Geometry>;

    /// Allocates a uniform buffer with room for `slots` blocks spaced `slot_stride` apart.
    fn create_uniforms(&mut self, slot_stride: u64, slots: u64) -> RenderResult<Self::Uniforms>;

    /// Replaces the uniform contents, growing the buffer when `bytes` does not fit.
    fn write_uniforms(&mut self, uniforms: &mut Self::Uniforms, bytes: &[u8]) -> RenderResult<()>;

    /// Records and submits one pass against `target`.
    fn execute(&mut self, target: &mut Self::Target, pass: &Pass<'_, Self>) -> RenderResult<()>;

    /// Presents `target`, paced to `vsync_intervals` vertical syncs.
    fn present(&mut self, target: Self::Target, vsync_intervals: u32) -> RenderResult<()>;

    /// Blocks until all submitted work has completed.
    fn flush(&mut self);
}
