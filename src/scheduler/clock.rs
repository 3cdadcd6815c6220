/*!
 * Virtual Clock
 * Monotonic simulated time, advanced only by the scheduler
 */

use crate::core::types::VirtualTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualClock {
    now: VirtualTime,
}

impl VirtualClock {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Move forward by `delta` ticks and return the new time
    #[inline]
    pub fn advance(&mut self, delta: u64) -> VirtualTime {
        self.now = self.now.saturating_add(delta);
        self.now
    }
}
