use std::rc::Rc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::coords::{ColorRgba, SurfaceSize, Viewport};
use crate::device::{DeviceInit, GraphicsBackend, GraphicsDevice, WgpuBackend};
use crate::error::{RenderError, RenderResult};
use crate::event::HostEvent;

use super::{
    Frame, FrameUniforms, GeometryBuffer, PipelineState, RasterDesc, ShaderDesc, ShaderProgram,
    Vertex,
};

/// Lifecycle of a [`Renderer`].
///
/// A renderer only exists once its device is up, so there is no uninitialized
/// state to observe.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RendererState {
    /// Device, surface and pipeline state exist; no shader yet.
    DeviceReady,
    /// A shader program is loaded and linked.
    ShadersReady,
    /// A frame session is open.
    FramePrepared,
    /// The last frame was presented.
    Presented,
    /// Terminal.
    Released,
}

/// Program plus the pipeline it was linked into.
pub(super) struct LinkedShader<B: GraphicsBackend> {
    pub(super) pipeline: B::Pipeline,
    pub(super) program: ShaderProgram<B>,
}

/// Facade over device, surface, pipeline state, shader program and constants.
///
/// Resources are released in reverse creation order by [`Renderer::release`],
/// which also runs on drop. Geometry buffers are owned by callers.
pub struct Renderer<B: GraphicsBackend> {
    pub(super) pipeline_state: Option<PipelineState<B>>,
    pub(super) shader: Option<LinkedShader<B>>,
    pub(super) uniforms: Option<FrameUniforms<B>>,
    pub(super) state: RendererState,
    pub(super) vsync_intervals: u32,
    pub(super) clear_color: ColorRgba,

    pending_resize: Option<SurfaceSize>,
    geometry_alive: Rc<()>,

    // Last: outlives everything created through it.
    pub(super) device: GraphicsDevice<B>,
}

impl<B: GraphicsBackend> Renderer<B> {
    /// Wraps a ready backend and builds the default pipeline state
    /// (solid fill, back-face culling).
    pub fn new(backend: B) -> RenderResult<Self> {
        Self::with_device(GraphicsDevice::new(backend))
    }

    pub fn with_device(mut device: GraphicsDevice<B>) -> RenderResult<Self> {
        let backend = device.backend_mut()?;
        let size = backend.surface_size();
        let pipeline_state = PipelineState::create(backend, RasterDesc::default(), size)?;

        log::info!(
            "renderer ready ({} backend, {}x{})",
            backend.name(),
            size.width,
            size.height
        );

        Ok(Self {
            pipeline_state: Some(pipeline_state),
            shader: None,
            uniforms: None,
            state: RendererState::DeviceReady,
            vsync_intervals: 1,
            clear_color: ColorRgba::background(),
            pending_resize: None,
            geometry_alive: Rc::new(()),
            device,
        })
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn device(&self) -> &GraphicsDevice<B> {
        &self.device
    }

    /// Surface size, including a resize that has not been applied yet.
    pub fn surface_size(&self) -> SurfaceSize {
        if let Some(size) = self.pending_resize {
            return size;
        }
        self.device
            .backend()
            .map(|backend| backend.surface_size())
            .unwrap_or_default()
    }

    pub fn viewport(&self) -> Viewport {
        self.pipeline_state
            .as_ref()
            .map(PipelineState::viewport)
            .unwrap_or_default()
    }

    pub fn pipeline_desc(&self) -> Option<RasterDesc> {
        self.pipeline_state.as_ref().map(PipelineState::desc)
    }

    pub fn has_shader(&self) -> bool {
        self.shader.is_some()
    }

    pub fn has_constant_buffer(&self) -> bool {
        self.uniforms.is_some()
    }

    /// Vertical syncs per present; `0` presents without waiting where supported.
    pub fn set_vsync_intervals(&mut self, intervals: u32) {
        self.vsync_intervals = intervals;
    }

    pub fn vsync_intervals(&self) -> u32 {
        self.vsync_intervals
    }

    pub fn set_clear_color(&mut self, color: ColorRgba) {
        self.clear_color = color;
    }

    fn ensure_live(&self, op: &str) -> RenderResult<()> {
        if self.state == RendererState::Released {
            return Err(RenderError::precondition(format!(
                "{op} called on a released renderer"
            )));
        }
        Ok(())
    }

    fn ready_state(&self) -> RendererState {
        if self.shader.is_some() {
            RendererState::ShadersReady
        } else {
            RendererState::DeviceReady
        }
    }

    // ── resources ─────────────────────────────────────────────────────────

    /// Loads a program and links it against the current pipeline state.
    ///
    /// On failure the previous program (if any) stays in place.
    pub fn create_shader(&mut self, desc: &ShaderDesc) -> RenderResult<()> {
        self.ensure_live("create_shader")?;

        let backend = self.device.backend_mut()?;
        let program = ShaderProgram::load(backend, desc)?;
        let raster = match &self.pipeline_state {
            Some(state) => state.raster(),
            None => return Err(RenderError::precondition("no pipeline state")),
        };
        let pipeline = backend.link_pipeline(program.raw(), raster)?;

        self.shader = Some(LinkedShader { pipeline, program });
        if self.state == RendererState::DeviceReady {
            self.state = RendererState::ShadersReady;
        }
        Ok(())
    }

    /// Allocates the constants buffer. A second call keeps the existing one.
    pub fn create_constant_buffer(&mut self) -> RenderResult<()> {
        self.ensure_live("create_constant_buffer")?;
        if self.uniforms.is_some() {
            log::debug!("constants buffer already exists");
            return Ok(());
        }

        let uniforms = FrameUniforms::create(self.device.backend_mut()?)?;
        self.uniforms = Some(uniforms);
        Ok(())
    }

    /// Uploads raw vertex bytes. `bytes.len()` must equal
    /// `vertex_count * Vertex::STRIDE`.
    pub fn create_vertex_buffer(
        &mut self,
        bytes: &[u8],
        vertex_count: u32,
    ) -> RenderResult<GeometryBuffer<B::Geometry>> {
        self.ensure_live("create_vertex_buffer")?;
        GeometryBuffer::create(
            self.device.backend_mut()?,
            bytes,
            vertex_count,
            &self.geometry_alive,
        )
    }

    pub fn create_geometry(
        &mut self,
        vertices: &[Vertex],
    ) -> RenderResult<GeometryBuffer<B::Geometry>> {
        let count = u32::try_from(vertices.len())
            .map_err(|_| RenderError::resource("vertex buffer", "too many vertices"))?;
        self.create_vertex_buffer(bytemuck::cast_slice(vertices), count)
    }

    /// Swaps in a new rasterizer configuration and relinks the loaded program.
    pub fn set_pipeline_state(&mut self, desc: RasterDesc) -> RenderResult<()> {
        self.ensure_live("set_pipeline_state")?;

        let backend = self.device.backend_mut()?;
        let size = backend.surface_size();
        let state = PipelineState::create(backend, desc, size)?;

        if let Some(shader) = &mut self.shader {
            shader.pipeline = backend.link_pipeline(shader.program.raw(), state.raster())?;
        }

        self.pipeline_state = Some(state);
        Ok(())
    }

    // ── surface ───────────────────────────────────────────────────────────

    /// Queues a resize; applied at the start of the next [`Renderer::prepare`].
    pub fn resize(&mut self, size: SurfaceSize) {
        if self.state == RendererState::Released {
            return;
        }
        log::debug!("resize queued: {}x{}", size.width, size.height);
        self.pending_resize = Some(size);
    }

    /// Consumes host events that concern the surface. Returns `true` if handled.
    pub fn handle_event(&mut self, event: &HostEvent) -> bool {
        match event {
            HostEvent::Resized(size) => {
                self.resize(*size);
                true
            }
            _ => false,
        }
    }

    fn apply_pending_resize(&mut self) -> RenderResult<()> {
        let Some(size) = self.pending_resize.take() else {
            return Ok(());
        };

        self.device.backend_mut()?.resize_surface(size);
        if !size.is_empty() {
            if let Some(state) = &mut self.pipeline_state {
                state.track_surface(size);
            }
        }
        log::debug!("surface resized to {}x{}", size.width, size.height);
        Ok(())
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Applies any queued resize, acquires the back buffer and opens a frame
    /// session that clears it to the background color.
    ///
    /// A zero-sized or temporarily unavailable surface yields
    /// [`RenderError::SurfaceUnavailable`]; skip the frame and try again.
    pub fn prepare<'g>(&mut self) -> RenderResult<Frame<'_, 'g, B>> {
        self.ensure_live("prepare")?;
        self.apply_pending_resize()?;

        let backend = self.device.backend_mut()?;
        let target = match backend.acquire_target() {
            Ok(target) => target,
            Err(e) => {
                if e.is_transient() {
                    log::debug!("skipping frame: {e}");
                }
                return Err(e);
            }
        };

        let target_size = backend.target_size(&target);
        if let Some(state) = &mut self.pipeline_state {
            if state.viewport() != Viewport::covering(target_size) {
                state.track_surface(target_size);
            }
        }

        if let Some(uniforms) = &mut self.uniforms {
            uniforms.reset();
        }

        self.state = RendererState::FramePrepared;
        Ok(Frame::begin(self, target))
    }

    /// Called by a frame session that ended without presenting.
    pub(super) fn abandon_frame(&mut self) {
        if let Some(uniforms) = &mut self.uniforms {
            uniforms.reset();
        }
        self.state = self.ready_state();
    }

    // ── teardown ──────────────────────────────────────────────────────────

    /// Releases everything in reverse creation order. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.state == RendererState::Released {
            return;
        }
        log::debug!("releasing renderer");

        drop(self.pipeline_state.take());
        drop(self.shader.take());
        drop(self.uniforms.take());

        let outstanding = Rc::strong_count(&self.geometry_alive) - 1;
        if outstanding > 0 {
            log::warn!("{outstanding} geometry buffer(s) still alive at release");
        }

        self.pending_resize = None;
        self.device.release();
        self.state = RendererState::Released;
    }
}

/// The hardware renderer bound to a window borrowed for `'w`.
pub type WgpuRenderer<'w> = Renderer<WgpuBackend<'w>>;

impl<'w> Renderer<WgpuBackend<'w>> {
    /// Creates a hardware device plus a surface bound to `window`.
    pub fn create<W>(window: &'w W, size: SurfaceSize, init: DeviceInit) -> RenderResult<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync,
    {
        Self::with_device(GraphicsDevice::create(window, size, init)?)
    }
}

impl<B: GraphicsBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec3;
    use crate::device::headless::{HeadlessBackend, HeadlessProbe};
    use crate::render::{mesh, CullMode, FillMode, FrameConstants};

    fn renderer(w: u32, h: u32) -> (Renderer<HeadlessBackend>, HeadlessProbe) {
        let (backend, probe) = HeadlessBackend::new(SurfaceSize::new(w, h));
        (Renderer::new(backend).unwrap(), probe)
    }

    fn ready(w: u32, h: u32) -> (Renderer<HeadlessBackend>, HeadlessProbe) {
        let (mut r, probe) = renderer(w, h);
        r.create_shader(&ShaderDesc::builtin()).unwrap();
        r.create_constant_buffer().unwrap();
        (r, probe)
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn release_leaves_no_resources() {
        let (mut r, probe) = ready(64, 64);
        assert!(probe.live_resources() > 2);

        r.release();
        assert_eq!(probe.live_resources(), 0);
        assert_eq!(probe.flushes(), 1);
        assert_eq!(r.state(), RendererState::Released);
    }

    #[test]
    fn release_twice_is_harmless() {
        let (mut r, probe) = ready(64, 64);
        r.release();
        r.release();
        drop(r);
        assert_eq!(probe.flushes(), 1);
    }

    #[test]
    fn state_follows_lifecycle() {
        let (mut r, _probe) = renderer(64, 64);
        assert_eq!(r.state(), RendererState::DeviceReady);

        r.create_shader(&ShaderDesc::builtin()).unwrap();
        assert_eq!(r.state(), RendererState::ShadersReady);

        let frame = r.prepare().unwrap();
        frame.swap_buffer().unwrap();
        assert_eq!(r.state(), RendererState::Presented);

        drop(r.prepare().unwrap());
        assert_eq!(r.state(), RendererState::ShadersReady);
    }

    #[test]
    fn operations_after_release_fail() {
        let (mut r, _probe) = ready(64, 64);
        r.release();

        assert!(matches!(r.prepare(), Err(RenderError::Precondition(_))));
        assert!(matches!(
            r.create_geometry(&mesh::triangle()),
            Err(RenderError::Precondition(_))
        ));
    }

    #[test]
    fn bad_shader_keeps_previous_program() {
        let (mut r, _probe) = ready(64, 64);
        let bad = ShaderDesc::single(crate::render::ShaderSource::inline("bad", "fn ("));
        assert!(matches!(
            r.create_shader(&bad),
            Err(RenderError::ShaderCompile { .. })
        ));
        assert!(r.has_shader());
    }

    // ── geometry ──────────────────────────────────────────────────────────

    #[test]
    fn vertex_buffer_byte_width_must_match() {
        let (mut r, _probe) = renderer(64, 64);
        assert!(r.create_vertex_buffer(&[0; 84], 3).is_ok());
        assert!(matches!(
            r.create_vertex_buffer(&[0; 80], 3),
            Err(RenderError::Precondition(_))
        ));
        assert!(matches!(
            r.create_vertex_buffer(&[0; 84], 4),
            Err(RenderError::Precondition(_))
        ));
    }

    #[test]
    fn empty_vertex_buffer_is_precondition() {
        let (mut r, probe) = renderer(64, 64);
        let live = probe.live_resources();
        assert!(matches!(
            r.create_vertex_buffer(&[], 0),
            Err(RenderError::Precondition(_))
        ));
        assert!(matches!(r.create_geometry(&[]), Err(RenderError::Precondition(_))));
        assert_eq!(probe.live_resources(), live);
    }

    // ── frames ────────────────────────────────────────────────────────────

    #[test]
    fn triangle_frame() {
        let (mut r, probe) = ready(1024, 1024);
        let tri = r.create_geometry(&mesh::triangle()).unwrap();

        let mut frame = r.prepare().unwrap();
        frame.prepare_shader().unwrap();
        frame.update_constant(Vec3::zero(), 1.0, Vec3::splat(1.0));
        frame.render_primitive(&tri, 3).unwrap();
        frame.swap_buffer().unwrap();

        let passes = probe.passes();
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].clear, Some(ColorRgba::background()));
        assert_eq!(passes[0].draws.len(), 1);
        assert_eq!(passes[0].draws[0].vertex_count, 3);
        assert_eq!(probe.presents(), vec![1]);
    }

    #[test]
    fn draw_observes_last_update() {
        let (mut r, probe) = ready(64, 64);
        let tri = r.create_geometry(&mesh::triangle()).unwrap();

        let first = (Vec3::new(0.5, -0.5, 0.0), 0.25, Vec3::new(1.0, 0.0, 0.0));
        let second = (Vec3::new(-0.5, 0.5, 0.0), 0.75, Vec3::new(0.0, 0.0, 1.0));

        let mut frame = r.prepare().unwrap();
        frame.prepare_shader().unwrap();
        frame.update_constant(first.0, first.1, first.2);
        frame.render_primitive(&tri, 3).unwrap();
        frame.update_constant(second.0, second.1, second.2);
        frame.render_primitive(&tri, 3).unwrap();
        frame.swap_buffer().unwrap();

        let draws = &probe.passes()[0].draws;
        assert_eq!(
            draws[0].constants,
            Some(FrameConstants::new(first.0, first.1, first.2))
        );
        assert_eq!(
            draws[1].constants,
            Some(FrameConstants::new(second.0, second.1, second.2))
        );
    }

    #[test]
    fn constants_carry_into_next_frame() {
        let (mut r, probe) = ready(64, 64);
        let tri = r.create_geometry(&mesh::triangle()).unwrap();
        let value = FrameConstants::new(Vec3::new(0.1, 0.1, 0.0), 0.5, Vec3::splat(0.5));

        let mut frame = r.prepare().unwrap();
        frame.prepare_shader().unwrap();
        frame.update_constant(Vec3::new(0.1, 0.1, 0.0), 0.5, Vec3::splat(0.5));
        frame.swap_buffer().unwrap();

        let mut frame = r.prepare().unwrap();
        frame.prepare_shader().unwrap();
        frame.render_primitive(&tri, 3).unwrap();
        frame.swap_buffer().unwrap();

        assert_eq!(probe.passes()[1].draws[0].constants, Some(value));
    }

    #[test]
    fn first_draw_sees_zeroes() {
        let (mut r, probe) = ready(64, 64);
        let tri = r.create_geometry(&mesh::triangle()).unwrap();

        let mut frame = r.prepare().unwrap();
        frame.prepare_shader().unwrap();
        frame.render_primitive(&tri, 3).unwrap();
        frame.swap_buffer().unwrap();

        assert_eq!(
            probe.passes()[0].draws[0].constants,
            Some(FrameConstants::default())
        );
    }

    #[test]
    fn update_without_constant_buffer_is_noop() {
        let (mut r, probe) = renderer(64, 64);
        r.create_shader(&ShaderDesc::builtin()).unwrap();
        let tri = r.create_geometry(&mesh::triangle()).unwrap();

        let mut frame = r.prepare().unwrap();
        frame.prepare_shader().unwrap();
        frame.update_constant(Vec3::splat(1.0), 2.0, Vec3::splat(1.0));
        frame.render_primitive(&tri, 3).unwrap();
        frame.swap_buffer().unwrap();

        assert_eq!(probe.passes()[0].draws[0].constants, None);
    }

    #[test]
    fn zero_vertex_draw_is_skipped() {
        let (mut r, probe) = ready(64, 64);
        let tri = r.create_geometry(&mesh::triangle()).unwrap();

        let mut frame = r.prepare().unwrap();
        frame.prepare_shader().unwrap();
        frame.render_primitive(&tri, 0).unwrap();
        frame.swap_buffer().unwrap();

        assert!(probe.passes()[0].draws.is_empty());
    }

    #[test]
    fn draw_requires_bound_shader() {
        let (mut r, _probe) = ready(64, 64);
        let tri = r.create_geometry(&mesh::triangle()).unwrap();

        let mut frame = r.prepare().unwrap();
        assert!(matches!(
            frame.render_primitive(&tri, 3),
            Err(RenderError::Precondition(_))
        ));
    }

    #[test]
    fn prepare_shader_requires_program() {
        let (mut r, _probe) = renderer(64, 64);
        let mut frame = r.prepare().unwrap();
        assert!(matches!(
            frame.prepare_shader(),
            Err(RenderError::Precondition(_))
        ));
    }

    #[test]
    fn vertex_count_cannot_exceed_buffer() {
        let (mut r, _probe) = ready(64, 64);
        let tri = r.create_geometry(&mesh::triangle()).unwrap();

        let mut frame = r.prepare().unwrap();
        frame.prepare_shader().unwrap();
        assert!(matches!(
            frame.render_primitive(&tri, 4),
            Err(RenderError::Precondition(_))
        ));
    }

    #[test]
    fn many_draws_grow_constants_buffer() {
        let (mut r, probe) = ready(64, 64);
        let tri = r.create_geometry(&mesh::triangle()).unwrap();

        let mut frame = r.prepare().unwrap();
        frame.prepare_shader().unwrap();
        for i in 0..100 {
            frame.update_constant(Vec3::zero(), i as f32, Vec3::splat(1.0));
            frame.render_primitive(&tri, 3).unwrap();
        }
        frame.swap_buffer().unwrap();

        assert_eq!(probe.uniform_grows(), 1);
        let draws = &probe.passes()[0].draws;
        assert_eq!(draws.len(), 100);
        assert_eq!(draws[99].constants.map(|c| c.scale_mod), Some(99.0));
    }

    #[test]
    fn abandoned_frame_does_not_present() {
        let (mut r, probe) = ready(64, 64);
        drop(r.prepare().unwrap());
        assert!(probe.presents().is_empty());
    }

    // ── surface ───────────────────────────────────────────────────────────

    #[test]
    fn resize_applies_on_next_prepare() {
        let (mut r, probe) = ready(1024, 1024);
        r.prepare().unwrap().swap_buffer().unwrap();

        assert!(r.handle_event(&HostEvent::Resized(SurfaceSize::new(800, 600))));
        assert_eq!(r.surface_size(), SurfaceSize::new(800, 600));
        r.prepare().unwrap().swap_buffer().unwrap();

        let passes = probe.passes();
        assert_eq!(passes[0].target_size, SurfaceSize::new(1024, 1024));
        assert_eq!(passes[1].target_size, SurfaceSize::new(800, 600));
        assert_eq!(passes[1].viewport, Viewport::covering(SurfaceSize::new(800, 600)));
        assert_eq!(r.viewport(), passes[1].viewport);
    }

    #[test]
    fn minimized_surface_skips_frames() {
        let (mut r, probe) = ready(64, 64);
        r.resize(SurfaceSize::new(0, 0));
        let err = r.prepare().err().unwrap();
        assert!(err.is_transient());

        r.resize(SurfaceSize::new(32, 32));
        r.prepare().unwrap().swap_buffer().unwrap();
        assert_eq!(probe.passes()[0].target_size, SurfaceSize::new(32, 32));
    }

    #[test]
    fn acquire_timeout_is_transient() {
        let (mut r, probe) = ready(64, 64);
        probe.fail_next_acquire();
        assert!(r.prepare().err().unwrap().is_transient());
        assert!(r.prepare().is_ok());
    }

    #[test]
    fn device_loss_is_fatal() {
        let (mut r, probe) = ready(64, 64);
        probe.lose_device("adapter removed");

        let err = r.prepare().err().unwrap();
        assert!(err.is_fatal());

        r.release();
        assert_eq!(probe.live_resources(), 0);
    }

    #[test]
    fn device_loss_mid_frame_fails_swap() {
        let (mut r, probe) = ready(64, 64);
        let tri = r.create_geometry(&mesh::triangle()).unwrap();

        let mut frame = r.prepare().unwrap();
        frame.prepare_shader().unwrap();
        frame.render_primitive(&tri, 3).unwrap();
        probe.lose_device("driver reset");

        let err = frame.swap_buffer().unwrap_err();
        assert!(err.is_fatal());
        assert!(probe.presents().is_empty());

        drop(tri);
        r.release();
        assert_eq!(probe.live_resources(), 0);
    }

    #[test]
    fn failed_present_ends_the_frame() {
        let (mut r, probe) = ready(64, 64);

        let mut frame = r.prepare().unwrap();
        frame.submit_pending().unwrap();
        probe.lose_device("driver reset");
        assert!(frame.swap_buffer().unwrap_err().is_fatal());

        assert_eq!(probe.passes().len(), 1);
        assert!(probe.presents().is_empty());
        assert_eq!(r.state(), RendererState::ShadersReady);
    }

    #[test]
    fn pipeline_state_swap_relinks() {
        let (mut r, probe) = ready(64, 64);
        let before = probe.live_resources();

        r.set_pipeline_state(RasterDesc::new(FillMode::Wireframe, CullMode::None))
            .unwrap();
        assert_eq!(
            r.pipeline_desc(),
            Some(RasterDesc::new(FillMode::Wireframe, CullMode::None))
        );
        assert_eq!(probe.live_resources(), before);
    }

    #[test]
    fn vsync_interval_is_forwarded() {
        let (mut r, probe) = ready(64, 64);
        r.set_vsync_intervals(0);
        r.prepare().unwrap().swap_buffer().unwrap();
        assert_eq!(probe.presents(), vec![0]);
    }
}
