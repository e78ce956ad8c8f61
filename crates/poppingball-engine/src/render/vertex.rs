//! Binary layouts shared by the CPU side, the backends and the shape shader.

use bytemuck::{Pod, Zeroable};

use crate::coords::Vec3;

// ── vertex ────────────────────────────────────────────────────────────────

/// Vertex layout (28 bytes):
///
///  offset  0  position  [f32; 3]   loc 0
///  offset 12  color     [f32; 4]   loc 1
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

const _: () = assert!(std::mem::size_of::<Vertex>() == Vertex::STRIDE as usize);

impl Vertex {
    /// Byte distance between consecutive vertices.
    pub const STRIDE: u64 = 28;

    pub const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x4  // color
    ];

    #[inline]
    pub const fn new(position: [f32; 3], color: [f32; 4]) -> Self {
        Self { position, color }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

// ── frame constants ───────────────────────────────────────────────────────

/// Constants block read by the vertex stage at `@group(0) @binding(0)` (32 bytes):
///
///  offset  0  offset     [f32; 3]
///  offset 12  scale_mod  f32
///  offset 16  color      [f32; 3]
///  offset 28  _pad       f32       16-byte alignment
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct FrameConstants {
    pub offset: [f32; 3],
    pub scale_mod: f32,
    pub color: [f32; 3],
    pub _pad: f32,
}

/// Size of the constants block rounded up to the 16-byte constant alignment.
pub const CONSTANTS_SIZE: u64 = align_up(28, 16);

const _: () = assert!(std::mem::size_of::<FrameConstants>() as u64 == CONSTANTS_SIZE);

impl FrameConstants {
    pub fn new(offset: Vec3, scale_mod: f32, color: Vec3) -> Self {
        Self {
            offset: offset.to_array(),
            scale_mod,
            color: color.to_array(),
            _pad: 0.0,
        }
    }
}

/// Rounds `size` up to a multiple of `align` (a power of two).
#[inline]
pub const fn align_up(size: u64, align: u64) -> u64 {
    (size + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_follows_position() {
        assert_eq!(Vertex::ATTRS[0].offset, 0);
        assert_eq!(Vertex::ATTRS[1].offset, 12);
        assert_eq!(Vertex::layout().array_stride, 28);
    }

    #[test]
    fn constants_are_padded_to_16() {
        assert_eq!(CONSTANTS_SIZE, 32);
        let floats: [f32; 8] = bytemuck::cast(FrameConstants::new(
            Vec3::new(1.0, 2.0, 3.0),
            4.0,
            Vec3::new(5.0, 6.0, 7.0),
        ));
        assert_eq!(floats, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 0.0]);
    }

    #[test]
    fn align_up_rounds_to_multiple() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(32, 256), 256);
        assert_eq!(align_up(256, 256), 256);
    }
}
