//! Rendering subsystem.
//!
//! [`Renderer`] owns the device, pipeline state, shader program and constants
//! buffer; callers own their [`GeometryBuffer`]s. A frame is a [`Frame`] session
//! opened by [`Renderer::prepare`] and closed by [`Frame::swap_buffer`].
//!
//! Convention:
//! - Geometry is in clip space (+Y up); front faces wind clockwise.
//! - The vertex stage places a mesh at `position * scale_mod + offset` and
//!   tints it with the constants color.

mod ctx;
mod frame;
mod geometry;
mod pipeline;
mod renderer;
mod shader;
mod uniforms;
mod vertex;

pub mod mesh;

pub use ctx::{RenderCtx, RenderTarget};
pub use frame::{Frame, SceneObject};
pub use geometry::GeometryBuffer;
pub use pipeline::{CullMode, FillMode, PipelineState, RasterDesc};
pub use renderer::{Renderer, RendererState, WgpuRenderer};
pub use shader::{
    CompiledShader, CompiledStage, EntryPoints, ShaderDesc, ShaderProgram, ShaderSource,
    VertexInput,
};
pub use uniforms::{FrameUniforms, INITIAL_UNIFORM_SLOTS};
pub use vertex::{align_up, FrameConstants, Vertex, CONSTANTS_SIZE};
