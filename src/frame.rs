//! Host-driven frame scheduling.
//!
//! A task asks for frames one at a time. The host calls [`FrameLoop::drive`]
//! once per frame; the task answers whether it wants another one. Stopping
//! is simply not asking again.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    Again,
    Done,
}

#[derive(Debug, Default)]
pub struct FrameLoop {
    pending: bool,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for one more frame. Requesting twice before it fires is the same
    /// as requesting once.
    pub fn request(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Deliver the pending frame, if any, to `task`. Returns true when the
    /// task asked for another frame.
    pub fn drive<F>(&mut self, task: F) -> bool
    where
        F: FnOnce() -> Frame,
    {
        if !self.pending {
            return false;
        }

        self.pending = false;

        if task() == Frame::Again {
            self.pending = true;
        }
        self.pending
    }
}
