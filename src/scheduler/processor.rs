/*!
 * Virtual Processor
 * A clock plus a FIFO ready queue of logical threads
 */

use super::clock::VirtualClock;
use super::types::ProcessorSnapshot;
use crate::core::types::{ProcessorId, ThreadId, VirtualTime};
use std::collections::BTreeSet;

/// Ready queue entries are ordered by the virtual time they became
/// runnable, ties broken by thread id, so dispatch order is a pure
/// function of the schedule.
#[derive(Debug)]
pub struct VirtualProcessor {
    id: ProcessorId,
    clock: VirtualClock,
    ready: BTreeSet<(VirtualTime, ThreadId)>,
    current: Option<ThreadId>,
}

impl VirtualProcessor {
    pub fn new(id: ProcessorId) -> Self {
        Self {
            id,
            clock: VirtualClock::new(),
            ready: BTreeSet::new(),
            current: None,
        }
    }

    #[inline]
    pub fn id(&self) -> ProcessorId {
        self.id
    }

    #[inline]
    pub fn now(&self) -> VirtualTime {
        self.clock.now()
    }

    pub fn advance(&mut self, delta: u64) -> VirtualTime {
        self.clock.advance(delta)
    }

    #[inline]
    pub fn current(&self) -> Option<ThreadId> {
        self.current
    }

    pub fn enqueue(&mut self, thread: ThreadId, ready_at: VirtualTime) {
        self.ready.insert((ready_at, thread));
    }

    /// Pop the head of the ready queue and make it current
    pub fn dispatch(&mut self) -> Option<ThreadId> {
        let (_, thread) = self.ready.pop_first()?;
        self.current = Some(thread);
        Some(thread)
    }

    /// Give up the processor if `thread` holds it
    pub fn release(&mut self, thread: ThreadId) -> bool {
        if self.current == Some(thread) {
            self.current = None;
            true
        } else {
            false
        }
    }

    /// Drop `thread` from the ready queue and release it
    pub fn remove(&mut self, thread: ThreadId) {
        self.ready.retain(|(_, queued)| *queued != thread);
        self.release(thread);
    }

    #[inline]
    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    pub fn snapshot(&self) -> ProcessorSnapshot {
        ProcessorSnapshot {
            id: self.id,
            clock: self.clock.now(),
            current: self.current,
            ready: self.ready.iter().map(|(_, thread)| *thread).collect(),
        }
    }
}
