/*!
 * Lock-Free Scheduler Statistics
 * Atomic counters updated on the dispatch path without touching the state lock
 */

use super::types::SchedulerStats;
use crate::core::types::VirtualTime;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Atomic scheduler statistics
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - All operations use relaxed ordering; a snapshot is not a consistent cut
#[repr(C, align(64))]
pub struct AtomicSchedulerStats {
    ticks: AtomicU64,
    steps: AtomicU64,
    yields: AtomicU64,
    suspensions: AtomicU64,
    active_threads: AtomicUsize,
}

impl AtomicSchedulerStats {
    #[inline]
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            steps: AtomicU64::new(0),
            yields: AtomicU64::new(0),
            suspensions: AtomicU64::new(0),
            active_threads: AtomicUsize::new(0),
        }
    }

    #[inline(always)]
    pub fn inc_ticks(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Called once per dispatched step
    #[inline(always)]
    pub fn inc_steps(&self) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_yields(&self) {
        self.yields.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_suspensions(&self) {
        self.suspensions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_active(&self) {
        self.active_threads.fetch_add(1, Ordering::Relaxed);
    }

    /// Saturates at zero
    #[inline(always)]
    pub fn dec_active(&self) {
        let _ = self
            .active_threads
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    #[inline]
    pub fn snapshot(&self, now: VirtualTime) -> SchedulerStats {
        SchedulerStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            steps: self.steps.load(Ordering::Relaxed),
            yields: self.yields.load(Ordering::Relaxed),
            suspensions: self.suspensions.load(Ordering::Relaxed),
            active_threads: self.active_threads.load(Ordering::Relaxed),
            now,
        }
    }
}

impl Default for AtomicSchedulerStats {
    fn default() -> Self {
        Self::new()
    }
}
