//! Headless backend: no GPU, no window.
//!
//! Resources are plain host objects that count themselves while alive, and every
//! submitted pass is recorded with its draws and the constants each draw read.
//! A [`HeadlessProbe`] shares that state so tests can inspect it while the
//! renderer owns the backend.

use std::cell::RefCell;
use std::rc::Rc;

use crate::coords::{ColorRgba, SurfaceSize, Viewport};
use crate::error::{RenderError, RenderResult};
use crate::render::{CompiledShader, FrameConstants, RasterDesc, CONSTANTS_SIZE};

use super::{GraphicsBackend, Pass};

/// Matches the largest `min_uniform_buffer_offset_alignment` seen on desktop GPUs.
pub const HEADLESS_UNIFORM_ALIGNMENT: u64 = 256;

// ── recorded state ────────────────────────────────────────────────────────

/// One draw as the backend saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub geometry: u64,
    pub vertex_count: u32,
    /// Constants at the draw's uniform offset, `None` without a uniform buffer.
    pub constants: Option<FrameConstants>,
}

/// One submitted render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPass {
    pub target_size: SurfaceSize,
    pub clear: Option<ColorRgba>,
    pub viewport: Viewport,
    pub pipeline: Option<u64>,
    pub draws: Vec<RecordedDraw>,
}

#[derive(Debug, Default)]
struct ProbeState {
    live: usize,
    next_id: u64,
    surface_size: SurfaceSize,
    passes: Vec<RecordedPass>,
    presents: Vec<u32>,
    flushes: usize,
    uniform_grows: usize,
    lost: Option<String>,
    fail_next_acquire: bool,
}

type Shared = Rc<RefCell<ProbeState>>;

/// Decrements the live count when the owning resource is dropped.
#[derive(Debug)]
struct Tracked {
    id: u64,
    state: Shared,
}

impl Tracked {
    fn new(state: &Shared) -> Self {
        let mut s = state.borrow_mut();
        s.live += 1;
        s.next_id += 1;
        Self {
            id: s.next_id,
            state: Rc::clone(state),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        let mut s = self.state.borrow_mut();
        s.live = s.live.saturating_sub(1);
    }
}

// ── resources ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct HeadlessTarget {
    size: SurfaceSize,
}

#[derive(Debug)]
pub struct HeadlessRaster {
    desc: RasterDesc,
    _handle: Tracked,
}

impl HeadlessRaster {
    pub fn desc(&self) -> RasterDesc {
        self.desc
    }
}

#[derive(Debug)]
pub struct HeadlessProgram {
    label: String,
    _handle: Tracked,
}

#[derive(Debug)]
pub struct HeadlessPipeline {
    handle: Tracked,
}

impl HeadlessPipeline {
    pub fn id(&self) -> u64 {
        self.handle.id
    }
}

#[derive(Debug)]
pub struct HeadlessGeometry {
    handle: Tracked,
    len: usize,
}

impl HeadlessGeometry {
    pub fn id(&self) -> u64 {
        self.handle.id
    }

    pub fn byte_len(&self) -> usize {
        self.len
    }
}

#[derive(Debug)]
pub struct HeadlessUniforms {
    bytes: Vec<u8>,
    capacity: u64,
    slot_stride: u64,
    _handle: Tracked,
}

impl HeadlessUniforms {
    fn constants_at(&self, offset: u32) -> Option<FrameConstants> {
        let start = offset as usize;
        let end = start + CONSTANTS_SIZE as usize;
        self.bytes
            .get(start..end)
            .map(bytemuck::pod_read_unaligned::<FrameConstants>)
    }
}

// ── backend ───────────────────────────────────────────────────────────────

pub struct HeadlessBackend {
    state: Shared,
    _device: Tracked,
    _surface: Tracked,
}

impl HeadlessBackend {
    /// Creates a backend with a virtual surface of `size` and a probe onto it.
    pub fn new(size: SurfaceSize) -> (Self, HeadlessProbe) {
        let state: Shared = Rc::new(RefCell::new(ProbeState {
            surface_size: size,
            ..Default::default()
        }));

        let backend = Self {
            _device: Tracked::new(&state),
            _surface: Tracked::new(&state),
            state: Rc::clone(&state),
        };
        (backend, HeadlessProbe { state })
    }

    fn check_device(&self) -> RenderResult<()> {
        match &self.state.borrow().lost {
            Some(msg) => Err(RenderError::DeviceLost(msg.clone())),
            None => Ok(()),
        }
    }
}

impl GraphicsBackend for HeadlessBackend {
    type Target = HeadlessTarget;
    type Raster = HeadlessRaster;
    type Program = HeadlessProgram;
    type Pipeline = HeadlessPipeline;
    type Geometry = HeadlessGeometry;
    type Uniforms = HeadlessUniforms;

    fn name(&self) -> &'static str {
        "headless"
    }

    fn surface_size(&self) -> SurfaceSize {
        self.state.borrow().surface_size
    }

    fn uniform_alignment(&self) -> u64 {
        HEADLESS_UNIFORM_ALIGNMENT
    }

    fn resize_surface(&mut self, size: SurfaceSize) {
        self.state.borrow_mut().surface_size = size;
    }

    fn acquire_target(&mut self) -> RenderResult<HeadlessTarget> {
        self.check_device()?;

        let mut s = self.state.borrow_mut();
        if s.surface_size.is_empty() {
            return Err(RenderError::SurfaceUnavailable(
                "surface has zero size".to_string(),
            ));
        }
        if std::mem::take(&mut s.fail_next_acquire) {
            return Err(RenderError::SurfaceUnavailable("timeout".to_string()));
        }

        Ok(HeadlessTarget {
            size: s.surface_size,
        })
    }

    fn target_size(&self, target: &HeadlessTarget) -> SurfaceSize {
        target.size
    }

    fn create_raster(&mut self, desc: &RasterDesc) -> RenderResult<HeadlessRaster> {
        Ok(HeadlessRaster {
            desc: *desc,
            _handle: Tracked::new(&self.state),
        })
    }

    fn create_program(&mut self, shader: &CompiledShader) -> RenderResult<HeadlessProgram> {
        self.check_device()?;
        Ok(HeadlessProgram {
            label: shader.vertex.label.clone(),
            _handle: Tracked::new(&self.state),
        })
    }

    fn link_pipeline(
        &mut self,
        program: &HeadlessProgram,
        _raster: &HeadlessRaster,
    ) -> RenderResult<HeadlessPipeline> {
        log::trace!("linking headless pipeline for '{}'", program.label);
        Ok(HeadlessPipeline {
            handle: Tracked::new(&self.state),
        })
    }

    fn create_geometry(&mut self, _label: &str, bytes: &[u8]) -> RenderResult<HeadlessGeometry> {
        self.check_device()?;
        if bytes.is_empty() {
            return Err(RenderError::resource("vertex buffer", "no vertex data"));
        }
        Ok(HeadlessGeometry {
            handle: Tracked::new(&self.state),
            len: bytes.len(),
        })
    }

    fn create_uniforms(&mut self, slot_stride: u64, slots: u64) -> RenderResult<HeadlessUniforms> {
        if slot_stride < CONSTANTS_SIZE || slot_stride % HEADLESS_UNIFORM_ALIGNMENT != 0 {
            return Err(RenderError::resource(
                "constants buffer",
                format!("slot stride {slot_stride} is not a valid uniform offset"),
            ));
        }
        let capacity = slot_stride * slots.max(1);
        Ok(HeadlessUniforms {
            bytes: vec![0; capacity as usize],
            capacity,
            slot_stride,
            _handle: Tracked::new(&self.state),
        })
    }

    fn write_uniforms(
        &mut self,
        uniforms: &mut HeadlessUniforms,
        bytes: &[u8],
    ) -> RenderResult<()> {
        self.check_device()?;

        let needed = bytes.len() as u64;
        if needed > uniforms.capacity {
            let slots = needed.div_ceil(uniforms.slot_stride).next_power_of_two();
            uniforms.capacity = slots * uniforms.slot_stride;
            uniforms.bytes.resize(uniforms.capacity as usize, 0);
            self.state.borrow_mut().uniform_grows += 1;
        }

        uniforms.bytes[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn execute(
        &mut self,
        target: &mut HeadlessTarget,
        pass: &Pass<'_, Self>,
    ) -> RenderResult<()> {
        self.check_device()?;

        let vp = pass.viewport;
        if vp.x + vp.width > target.size.width as f32 || vp.y + vp.height > target.size.height as f32
        {
            return Err(RenderError::precondition(format!(
                "viewport {}x{} exceeds target {}x{}",
                vp.width, vp.height, target.size.width, target.size.height
            )));
        }

        let draws = match pass.pipeline {
            Some(_) => pass
                .draws
                .iter()
                .map(|draw| RecordedDraw {
                    geometry: draw.geometry.id(),
                    vertex_count: draw.vertex_count,
                    constants: pass
                        .uniforms
                        .and_then(|u| u.constants_at(draw.uniform_offset.unwrap_or(0))),
                })
                .collect(),
            None => Vec::new(),
        };

        self.state.borrow_mut().passes.push(RecordedPass {
            target_size: target.size,
            clear: pass.clear,
            viewport: vp,
            pipeline: pass.pipeline.map(HeadlessPipeline::id),
            draws,
        });
        Ok(())
    }

    fn present(&mut self, _target: HeadlessTarget, vsync_intervals: u32) -> RenderResult<()> {
        self.check_device()?;
        self.state.borrow_mut().presents.push(vsync_intervals);
        Ok(())
    }

    fn flush(&mut self) {
        self.state.borrow_mut().flushes += 1;
    }
}

// ── probe ─────────────────────────────────────────────────────────────────

/// Read side of a [`HeadlessBackend`], valid after the backend is dropped.
#[derive(Clone)]
pub struct HeadlessProbe {
    state: Shared,
}

impl HeadlessProbe {
    /// Device, surface and every resource handle still alive.
    pub fn live_resources(&self) -> usize {
        self.state.borrow().live
    }

    pub fn passes(&self) -> Vec<RecordedPass> {
        self.state.borrow().passes.clone()
    }

    /// Vsync interval of every present, in order.
    pub fn presents(&self) -> Vec<u32> {
        self.state.borrow().presents.clone()
    }

    pub fn flushes(&self) -> usize {
        self.state.borrow().flushes
    }

    pub fn uniform_grows(&self) -> usize {
        self.state.borrow().uniform_grows
    }

    /// Every later device operation fails with `DeviceLost`.
    pub fn lose_device(&self, reason: impl Into<String>) {
        self.state.borrow_mut().lost = Some(reason.into());
    }

    /// The next acquire fails as if it timed out.
    pub fn fail_next_acquire(&self) {
        self.state.borrow_mut().fail_next_acquire = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resources_count_while_alive() {
        let (mut backend, probe) = HeadlessBackend::new(SurfaceSize::new(64, 64));
        assert_eq!(probe.live_resources(), 2);

        let geometry = backend.create_geometry("g", &[0; 28]).unwrap();
        assert_eq!(probe.live_resources(), 3);
        assert_eq!(geometry.byte_len(), 28);

        drop(geometry);
        drop(backend);
        assert_eq!(probe.live_resources(), 0);
    }

    #[test]
    fn uniforms_grow_to_power_of_two() {
        let (mut backend, probe) = HeadlessBackend::new(SurfaceSize::new(64, 64));
        let mut uniforms = backend.create_uniforms(256, 1).unwrap();

        backend.write_uniforms(&mut uniforms, &[1; 256 * 3]).unwrap();
        assert_eq!(uniforms.capacity, 256 * 4);
        assert_eq!(probe.uniform_grows(), 1);
    }

    #[test]
    fn misaligned_stride_rejected() {
        let (mut backend, _probe) = HeadlessBackend::new(SurfaceSize::new(64, 64));
        assert!(backend.create_uniforms(32, 4).is_err());
    }

    #[test]
    fn lost_device_fails_acquire() {
        let (mut backend, probe) = HeadlessBackend::new(SurfaceSize::new(64, 64));
        probe.lose_device("removed");
        assert_eq!(
            backend.acquire_target().unwrap_err(),
            RenderError::DeviceLost("removed".into())
        );
    }
}
