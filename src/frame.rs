//! Redraw scheduling.
//!
//! Any number of redraw requests between two display frames collapse into
//! a single paint. The scheduler is driven by the host's per-frame callback
//! and stops handing out frames once cancelled.

/// Metadata for one painted frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based index of painted frames.
    pub index: u64,
}

#[derive(Debug, Default)]
pub struct FrameScheduler {
    pending: bool,
    painted: u64,
    cancelled: bool,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a redraw on the next frame. Returns `false` when one is
    /// already pending or the loop has been cancelled.
    pub fn request(&mut self) -> bool {
        if self.pending || self.cancelled {
            return false;
        }
        self.pending = true;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Called once per display frame: yields a frame if a redraw was requested.
    pub fn take(&mut self) -> Option<Frame> {
        if !self.pending || self.cancelled {
            return None;
        }
        self.pending = false;
        let frame = Frame { index: self.painted };
        self.painted += 1;
        Some(frame)
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.pending = false;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_coalesce_per_frame() {
        let mut s = FrameScheduler::new();
        assert!(s.take().is_none());
        assert!(s.request());
        assert!(!s.request());
        assert!(!s.request());
        assert_eq!(s.take(), Some(Frame { index: 0 }));
        assert!(s.take().is_none());
        assert!(s.request());
        assert_eq!(s.take(), Some(Frame { index: 1 }));
    }

    #[test]
    fn cancel_stops_the_loop() {
        let mut s = FrameScheduler::new();
        s.request();
        s.cancel();
        assert!(s.is_cancelled());
        assert!(s.take().is_none());
        assert!(!s.request());
        assert!(!s.is_pending());
    }
}
