use crate::coords::{ColorRgba, Vec3};
use crate::device::{DrawCall, GraphicsBackend, Pass, WgpuBackend};
use crate::error::{RenderError, RenderResult};

use super::{FrameConstants, GeometryBuffer, RenderCtx, RenderTarget, Renderer, RendererState};

/// Anything drawn with a shared mesh: a translation, a uniform scale and a tint.
pub trait SceneObject {
    fn offset(&self) -> Vec3;
    fn scale(&self) -> f32;
    fn color(&self) -> Vec3;
}

/// One frame between [`Renderer::prepare`] and [`Frame::swap_buffer`].
///
/// Holds the acquired back buffer and mutably borrows the renderer, so the
/// surface cannot be resized or re-acquired while it is open. Draws borrow
/// their geometry for `'g`.
///
/// Draws are recorded here and submitted in one pass when the frame is
/// swapped or an overlay runs. Dropping the frame without swapping discards it.
pub struct Frame<'r, 'g, B: GraphicsBackend> {
    renderer: &'r mut Renderer<B>,
    target: Option<B::Target>,
    draws: Vec<DrawCall<'g, B::Geometry>>,

    /// Pending until the first submission of the frame.
    clear: Option<ColorRgba>,
    shader_bound: bool,
}

impl<'r, 'g, B: GraphicsBackend> Frame<'r, 'g, B> {
    pub(super) fn begin(renderer: &'r mut Renderer<B>, target: B::Target) -> Self {
        let clear = Some(renderer.clear_color);
        Self {
            renderer,
            target: Some(target),
            draws: Vec::new(),
            clear,
            shader_bound: false,
        }
    }

    /// Binds the loaded program and the constants buffer for the draws that follow.
    pub fn prepare_shader(&mut self) -> RenderResult<()> {
        if self.renderer.shader.is_none() {
            return Err(RenderError::precondition(
                "prepare_shader called before a shader was created",
            ));
        }
        self.shader_bound = true;
        Ok(())
    }

    /// Sets the constants the next draws read. No-op without a constants buffer.
    pub fn update_constant(&mut self, offset: Vec3, scale_mod: f32, color: Vec3) {
        if let Some(uniforms) = &mut self.renderer.uniforms {
            uniforms.update(FrameConstants::new(offset, scale_mod, color));
        }
    }

    /// Records a draw of the first `vertex_count` vertices of `geometry`.
    pub fn render_primitive(
        &mut self,
        geometry: &'g GeometryBuffer<B::Geometry>,
        vertex_count: u32,
    ) -> RenderResult<()> {
        if vertex_count == 0 {
            return Ok(());
        }
        if !self.shader_bound {
            return Err(RenderError::precondition(
                "render_primitive called before prepare_shader",
            ));
        }
        if vertex_count > geometry.vertex_count() {
            return Err(RenderError::precondition(format!(
                "draw of {vertex_count} vertices from a buffer holding {}",
                geometry.vertex_count()
            )));
        }

        let uniform_offset = self.renderer.uniforms.as_mut().map(|u| u.slot_for_draw());
        self.draws.push(DrawCall {
            geometry: geometry.raw(),
            vertex_count,
            uniform_offset,
        });
        Ok(())
    }

    /// Updates the constants from `object` and draws all of `geometry`.
    pub fn draw_object<O>(
        &mut self,
        object: &O,
        geometry: &'g GeometryBuffer<B::Geometry>,
    ) -> RenderResult<()>
    where
        O: SceneObject + ?Sized,
    {
        self.update_constant(object.offset(), object.scale(), object.color());
        self.render_primitive(geometry, geometry.vertex_count())
    }

    pub fn recorded_draws(&self) -> usize {
        self.draws.len()
    }

    /// Submits the draws recorded so far (and the pending clear) as one pass.
    ///
    /// Draws recorded afterwards go into a later pass that loads the target
    /// instead of clearing it, reading the constants carried over from here.
    pub fn submit_pending(&mut self) -> RenderResult<()> {
        if self.clear.is_none() && self.draws.is_empty() {
            return Ok(());
        }

        let Self {
            renderer,
            target,
            draws,
            clear,
            shader_bound,
        } = self;
        let Some(target) = target.as_mut() else {
            return Err(RenderError::precondition("frame has no render target"));
        };

        let renderer = &mut **renderer;
        let viewport = renderer.viewport();
        let backend = renderer.device.backend_mut()?;
        if let Some(uniforms) = &mut renderer.uniforms {
            uniforms.upload(backend)?;
        }

        let pass = Pass {
            clear: *clear,
            viewport,
            pipeline: match (&renderer.shader, *shader_bound) {
                (Some(shader), true) => Some(&shader.pipeline),
                _ => None,
            },
            uniforms: renderer.uniforms.as_ref().map(|u| u.raw()),
            draws: draws.as_slice(),
        };

        backend.execute(target, &pass)?;

        *clear = None;
        draws.clear();
        Ok(())
    }

    /// Submits the frame and presents it.
    pub fn swap_buffer(mut self) -> RenderResult<()> {
        self.submit_pending()?;

        let Some(target) = self.target.take() else {
            return Err(RenderError::precondition("frame already presented"));
        };
        let vsync = self.renderer.vsync_intervals;
        let presented = self
            .renderer
            .device
            .backend_mut()
            .and_then(|backend| backend.present(target, vsync));
        if let Err(e) = presented {
            self.renderer.abandon_frame();
            return Err(e);
        }

        self.renderer.state = RendererState::Presented;
        Ok(())
    }
}

impl<'r, 'g, 'w> Frame<'r, 'g, WgpuBackend<'w>> {
    /// Runs `draw` on top of the core draws, with the same target bound.
    ///
    /// Draws recorded so far are submitted first; anything recorded afterwards
    /// loads the target instead of clearing it.
    pub fn overlay<F>(&mut self, draw: F) -> RenderResult<()>
    where
        F: FnOnce(&RenderCtx<'_>, &mut RenderTarget<'_>),
    {
        self.submit_pending()?;

        let viewport = self.renderer.viewport();
        let Some(target) = self.target.as_ref() else {
            return Err(RenderError::precondition("frame has no render target"));
        };
        self.renderer
            .device
            .backend_mut()?
            .record_overlay(target, viewport, draw)
    }
}

impl<B: GraphicsBackend> Drop for Frame<'_, '_, B> {
    fn drop(&mut self) {
        if self.target.take().is_some() {
            log::debug!("frame dropped without swap_buffer; discarding");
            self.renderer.abandon_frame();
        }
    }
}
