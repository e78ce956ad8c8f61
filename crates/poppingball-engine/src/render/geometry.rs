use std::rc::Rc;

use crate::device::GraphicsBackend;
use crate::error::{RenderError, RenderResult};

use super::Vertex;

/// Immutable vertex data for one mesh, owned by whoever requested it.
///
/// `G` is the backend's vertex buffer type. Draws borrow the buffer for the
/// lifetime of the frame session they were recorded in, so it cannot be
/// dropped while a frame still references it.
pub struct GeometryBuffer<G> {
    raw: G,
    vertex_count: u32,

    // Shared with the renderer so release can report buffers still alive.
    _alive: Rc<()>,
}

impl<G> GeometryBuffer<G> {
    /// Uploads `bytes` once. The byte width must be exactly
    /// `vertex_count * Vertex::STRIDE`, and there must be at least one vertex.
    pub(crate) fn create<B: GraphicsBackend<Geometry = G>>(
        backend: &mut B,
        bytes: &[u8],
        vertex_count: u32,
        alive: &Rc<()>,
    ) -> RenderResult<Self> {
        if vertex_count == 0 {
            return Err(RenderError::precondition(
                "vertex buffer needs at least one vertex",
            ));
        }
        let expected = u64::from(vertex_count) * Vertex::STRIDE;
        if bytes.len() as u64 != expected {
            return Err(RenderError::precondition(format!(
                "vertex data is {} bytes; {vertex_count} vertices need {expected}",
                bytes.len()
            )));
        }

        let raw = backend.create_geometry("poppingball vertex buffer", bytes)?;
        log::debug!("geometry buffer: {vertex_count} vertices");

        Ok(Self {
            raw,
            vertex_count,
            _alive: Rc::clone(alive),
        })
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn byte_width(&self) -> u64 {
        u64::from(self.vertex_count) * Vertex::STRIDE
    }

    pub fn raw(&self) -> &G {
        &self.raw
    }
}
