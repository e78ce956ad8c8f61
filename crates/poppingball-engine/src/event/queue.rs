use std::collections::VecDeque;

use super::HostEvent;

/// FIFO of host events waiting for the next frame.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<HostEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: HostEvent) {
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Removes and yields every queued event in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = HostEvent> + '_ {
        self.events.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::SurfaceSize;

    #[test]
    fn drain_preserves_order_and_empties() {
        let mut q = EventQueue::new();
        q.push(HostEvent::Focused(true));
        q.push(HostEvent::Resized(SurfaceSize::new(800, 600)));
        q.push(HostEvent::CloseRequested);

        let drained: Vec<_> = q.drain().collect();
        assert_eq!(
            drained,
            vec![
                HostEvent::Focused(true),
                HostEvent::Resized(SurfaceSize::new(800, 600)),
                HostEvent::CloseRequested,
            ]
        );
        assert!(q.is_empty());
    }
}
