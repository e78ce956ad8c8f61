//! Frame timing.
//!
//! - one `FrameClock` per render loop; `tick()` once per frame yields `FrameTime`
//! - `FpsCounter` smooths the tick rate for display and logging

mod fps;
mod frame_clock;

pub use fps::FpsCounter;
pub use frame_clock::{FrameClock, FrameTime};
