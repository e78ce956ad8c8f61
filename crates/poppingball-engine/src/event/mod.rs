//! Host events.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! The runtime translates window-system events into `HostEvent`s, queues them in
//! an `EventQueue`, and drains the queue once per frame: resizes go to the
//! renderer, everything else to the application.

mod queue;
mod types;

pub mod platform;

pub use queue::EventQueue;
pub use types::{HostEvent, Key, KeyState, Modifiers, MouseButton};
