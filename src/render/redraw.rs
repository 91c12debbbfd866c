//! Frame coalescing and resize gating.

/// Coalesces redraw requests into at most one draw per display refresh.
///
/// A pending redraw has no cancel path; when it fires it replays whatever
/// state is current at that moment.
#[derive(Debug, Clone, Default)]
pub struct RedrawScheduler {
    pending: bool,
    frames_drawn: u64,
}

impl RedrawScheduler {
    /// Idle scheduler.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: false,
            frames_drawn: 0,
        }
    }

    /// Ask for a redraw. Returns `true` when this is the first request since
    /// the last tick, meaning the caller must register a refresh callback.
    pub fn request(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    /// Whether a redraw is waiting for the next tick.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the pending request on a refresh tick. Returns `true` when a
    /// frame should be drawn.
    pub fn take(&mut self) -> bool {
        let fire = std::mem::replace(&mut self.pending, false);
        if fire {
            self.frames_drawn += 1;
        }
        fire
    }

    /// Number of ticks that produced a draw.
    #[must_use]
    pub const fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }
}

/// Suppresses surface-resize handling while a pointer drag is in progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResizeGate {
    dragging: bool,
}

impl ResizeGate {
    /// A pointer button went down.
    pub fn pointer_down(&mut self) {
        self.dragging = true;
    }

    /// A pointer button went up.
    pub fn pointer_up(&mut self) {
        self.dragging = false;
    }

    /// Whether resize notifications should be processed right now.
    #[must_use]
    pub const fn should_handle_resize(&self) -> bool {
        !self.dragging
    }
}
