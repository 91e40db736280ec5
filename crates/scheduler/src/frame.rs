//! Per-frame coalescing of high-frequency input
//!
//! Pointer moves arrive far more often than the view can repaint. The
//! coalescer keeps only the latest value pushed since the last frame tick so
//! that at most one value is processed per frame.

/// Latest-wins buffer drained once per frame
#[derive(Debug, Clone)]
pub struct FrameCoalescer<T> {
    pending: Option<T>,
    dropped: u64,
}

impl<T> FrameCoalescer<T> {
    pub fn new() -> Self {
        Self { pending: None, dropped: 0 }
    }

    /// Buffer a value, replacing any value not yet taken this frame
    pub fn push(&mut self, value: T) {
        if self.pending.replace(value).is_some() {
            self.dropped += 1;
        }
    }

    /// Frame boundary: hand out the latest buffered value, if any
    pub fn tick(&mut self) -> Option<T> {
        self.pending.take()
    }

    /// Number of values overwritten before they reached a tick
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl<T> Default for FrameCoalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}
