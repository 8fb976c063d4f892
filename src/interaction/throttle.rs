/// Single-slot frame throttle.
///
/// At most one value is pending. Scheduling while a value is already pending
/// overwrites it instead of queueing, so a burst of pointer moves costs one
/// render per frame.
#[derive(Debug, Clone)]
pub struct FrameThrottle<T> {
    pending: Option<T>,
}

impl<T> FrameThrottle<T> {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Stores `value` for the next frame. Returns `true` when the slot was
    /// empty and the caller must request a frame.
    pub fn schedule(&mut self, value: T) -> bool {
        self.pending.replace(value).is_none()
    }

    /// Called on the frame tick.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<T> Default for FrameThrottle<T> {
    fn default() -> Self {
        Self::new()
    }
}
