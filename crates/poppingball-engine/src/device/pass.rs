use crate::coords::{ColorRgba, Viewport};

use super::GraphicsBackend;

/// One recorded draw: a borrowed vertex buffer, a vertex count and the byte offset
/// of the constants block it reads.
#[derive(Debug)]
pub struct DrawCall<'a, G> {
    pub geometry: &'a G,
    pub vertex_count: u32,
    /// `None` when the renderer has no uniform buffer.
    pub uniform_offset: Option<u32>,
}

impl<G> Clone for DrawCall<'_, G> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<G> Copy for DrawCall<'_, G> {}

/// Everything a backend needs to record a single render pass.
///
/// Topology is always a triangle list.
pub struct Pass<'a, B: GraphicsBackend + ?Sized> {
    /// `Some` clears the target first; `None` loads the existing contents.
    pub clear: Option<ColorRgba>,
    pub viewport: Viewport,
    pub pipeline: Option<&'a B::Pipeline>,
    pub uniforms: Option<&'a B::Uniforms>,
    pub draws: &'a [DrawCall<'a, B::Geometry>],
}
