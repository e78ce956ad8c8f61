use crate::coords::{SurfaceSize, Viewport};
use crate::device::GraphicsBackend;
use crate::error::RenderResult;

/// Polygon fill mode.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum FillMode {
    #[default]
    Solid,
    /// Requires `wgpu::Features::POLYGON_MODE_LINE` on the wgpu backend.
    Wireframe,
}

/// Which faces are discarded. Front faces wind clockwise.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

/// Rasterizer configuration. Solid fill with back-face culling by default.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct RasterDesc {
    pub fill: FillMode,
    pub cull: CullMode,
}

impl RasterDesc {
    pub const fn new(fill: FillMode, cull: CullMode) -> Self {
        Self { fill, cull }
    }

    pub(crate) fn primitive_state(self) -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Cw,
            cull_mode: match self.cull {
                CullMode::None => None,
                CullMode::Front => Some(wgpu::Face::Front),
                CullMode::Back => Some(wgpu::Face::Back),
            },
            polygon_mode: match self.fill {
                FillMode::Solid => wgpu::PolygonMode::Fill,
                FillMode::Wireframe => wgpu::PolygonMode::Line,
            },
            unclipped_depth: false,
            conservative: false,
        }
    }
}

/// Fixed-function state: an immutable rasterizer configuration plus a viewport
/// that follows the presentation surface.
///
/// Changing fill or cull mode means building a new `PipelineState` and swapping
/// it in (`Renderer::set_pipeline_state`).
pub struct PipelineState<B: GraphicsBackend> {
    desc: RasterDesc,
    raster: B::Raster,
    viewport: Viewport,
}

impl<B: GraphicsBackend> PipelineState<B> {
    pub fn create(backend: &mut B, desc: RasterDesc, surface: SurfaceSize) -> RenderResult<Self> {
        let raster = backend.create_raster(&desc)?;
        log::debug!("pipeline state {desc:?}");
        Ok(Self {
            desc,
            raster,
            viewport: Viewport::covering(surface),
        })
    }

    pub fn desc(&self) -> RasterDesc {
        self.desc
    }

    pub fn raster(&self) -> &B::Raster {
        &self.raster
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Recomputes the viewport after the surface was resized.
    pub(crate) fn track_surface(&mut self, surface: SurfaceSize) {
        self.viewport = Viewport::covering(surface);
    }
}
