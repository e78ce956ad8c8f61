use crate::device::GraphicsBackend;
use crate::error::RenderResult;

use super::{align_up, FrameConstants, CONSTANTS_SIZE};

/// Slots allocated up front; the buffer grows past this on demand.
pub const INITIAL_UNIFORM_SLOTS: u64 = 64;

/// Per-draw constants visible to the vertex stage at `@group(0) @binding(0)`.
///
/// Every `update` stages a new slot on the host. Draws reference the slot that was
/// current when they were recorded through a dynamic offset, and all slots are
/// uploaded in one write right before the commands are submitted. A draw issued
/// before any update reads the last value written, zeroes at first.
pub struct FrameUniforms<B: GraphicsBackend> {
    raw: B::Uniforms,
    slot_stride: u64,

    /// Host copy of the slots for the next submission.
    staged: Vec<u8>,

    /// Byte offset of the slot draws currently read, if one is staged.
    current: Option<u32>,

    /// Carries over between submissions and frames.
    last: FrameConstants,
}

impl<B: GraphicsBackend> FrameUniforms<B> {
    pub fn create(backend: &mut B) -> RenderResult<Self> {
        let slot_stride = align_up(CONSTANTS_SIZE, backend.uniform_alignment());
        let raw = backend.create_uniforms(slot_stride, INITIAL_UNIFORM_SLOTS)?;
        log::debug!("constants buffer: {INITIAL_UNIFORM_SLOTS} slots of {slot_stride} bytes");

        Ok(Self {
            raw,
            slot_stride,
            staged: Vec::new(),
            current: None,
            last: FrameConstants::default(),
        })
    }

    pub fn raw(&self) -> &B::Uniforms {
        &self.raw
    }

    pub fn slot_stride(&self) -> u64 {
        self.slot_stride
    }

    /// Value the next draw observes unless `update` is called first.
    pub fn last(&self) -> FrameConstants {
        self.last
    }

    /// Number of slots staged for the next submission.
    pub fn staged_slots(&self) -> usize {
        (self.staged.len() as u64 / self.slot_stride) as usize
    }

    /// Records a new constants value for subsequent draws.
    pub fn update(&mut self, constants: FrameConstants) {
        self.last = constants;
        self.current = Some(self.push_slot(constants));
    }

    /// Offset of the slot the next draw reads, staging the carried-over value
    /// when nothing was written since the last submission.
    pub(crate) fn slot_for_draw(&mut self) -> u32 {
        match self.current {
            Some(offset) => offset,
            None => {
                let offset = self.push_slot(self.last);
                self.current = Some(offset);
                offset
            }
        }
    }

    /// Uploads the staged slots and starts a fresh staging area.
    pub(crate) fn upload(&mut self, backend: &mut B) -> RenderResult<()> {
        if !self.staged.is_empty() {
            backend.write_uniforms(&mut self.raw, &self.staged)?;
        }
        self.reset();
        Ok(())
    }

    /// Drops staged slots without uploading them.
    pub(crate) fn reset(&mut self) {
        self.staged.clear();
        self.current = None;
    }

    fn push_slot(&mut self, constants: FrameConstants) -> u32 {
        let start = self.staged.len();
        self.staged.resize(start + self.slot_stride as usize, 0);
        self.staged[start..start + CONSTANTS_SIZE as usize]
            .copy_from_slice(bytemuck::bytes_of(&constants));
        start as u32
    }
}
