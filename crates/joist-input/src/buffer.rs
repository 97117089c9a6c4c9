//! Buffer for live input collected between ticks.
//!
//! Hosts push events into the [`InputBuffer`] as they arrive; the sim runner
//! drains it once per tick. When the simulation is inactive the buffer is
//! discarded instead of drained, and discarded events are gone for good.

use crate::InputEvent;

/// FIFO holding live input until the next tick.
#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    pending: Vec<InputEvent>,
    /// Total events thrown away via [`discard`](Self::discard) since creation.
    discarded_total: u64,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            discarded_total: 0,
        }
    }

    /// Queue one event for the next tick.
    pub fn push(&mut self, event: InputEvent) {
        self.pending.push(event);
    }

    /// Queue a batch of events, preserving order.
    pub fn extend<I: IntoIterator<Item = InputEvent>>(&mut self, events: I) {
        self.pending.extend(events);
    }

    /// Take every pending event in arrival order, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Drop every pending event. Returns how many were dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        if dropped > 0 {
            tracing::debug!(dropped, "discarding buffered live input");
        }
        self.pending.clear();
        self.discarded_total += dropped as u64;
        dropped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Events dropped over the buffer's lifetime.
    pub fn discarded_total(&self) -> u64 {
        self.discarded_total
    }
}
