/*!
 * Deterministic Scheduler
 * Grants one logical thread at a time the right to run on a virtual processor
 *
 * Every logical thread is backed by a native thread, but only the thread
 * whose status is `Running` makes progress; all others wait on the
 * scheduler's condition variable. A tick visits processors in id order and
 * runs the head of each ready queue for exactly one step, so with the same
 * program the interleaving is reproducible.
 */

use crate::core::config::RuntimeConfig;
use crate::core::types::{ProcessorId, ThreadId};
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod atomic_stats;
mod clock;
mod operations;
mod processor;
pub mod types;

pub use atomic_stats::AtomicSchedulerStats;
pub use clock::VirtualClock;
pub use processor::VirtualProcessor;
pub use types::{
    LogicalThread, ProcessorSnapshot, SchedulerStats, ThreadSignal, ThreadStatus,
};

/// Everything guarded by the scheduler lock
#[derive(Debug, Default)]
struct SchedState {
    processors: BTreeMap<ProcessorId, VirtualProcessor>,
    threads: BTreeMap<ThreadId, LogicalThread>,
    clock: VirtualClock,
    next_thread: u64,
    /// The single thread holding the execution turn, if any
    running: Option<ThreadId>,
}

impl SchedState {
    fn has_ready(&self) -> bool {
        self.processors.values().any(VirtualProcessor::has_ready)
    }

    fn is_live(&self, thread: ThreadId) -> bool {
        self.threads
            .get(&thread)
            .map_or(false, |t| t.status.is_live())
    }

    /// Give up whatever processor and turn `thread` holds
    fn release(&mut self, thread: ThreadId, processor: ProcessorId) {
        if let Some(cpu) = self.processors.get_mut(&processor) {
            cpu.release(thread);
        }
        if self.running == Some(thread) {
            self.running = None;
        }
    }
}

/// Deterministic cooperative scheduler
///
/// # Performance
/// - Cache-line aligned; cloned handles share one state
/// - Lock-free atomic stats on the dispatch path
#[repr(C, align(64))]
pub struct Scheduler {
    state: Arc<Mutex<SchedState>>,

    // Signalled whenever a status, signal or ready queue changes
    turn: Arc<Condvar>,

    stats: Arc<AtomicSchedulerStats>,

    step_warn_after: Duration,
    terminate_timeout: Duration,
}

impl Scheduler {
    /// Create a scheduler with no processors
    pub fn new(config: &RuntimeConfig) -> Self {
        info!(
            terminate_timeout_ms = config.terminate_timeout_ms,
            step_warn_after_ms = config.step_warn_after_ms,
            "Scheduler initialized"
        );

        Self {
            state: Arc::new(Mutex::new(SchedState::default())),
            turn: Arc::new(Condvar::new()),
            stats: Arc::new(AtomicSchedulerStats::new()),
            step_warn_after: config.step_warn_after(),
            terminate_timeout: config.terminate_timeout(),
        }
    }

    /// Create a scheduler with processors `0..config.processors`
    pub fn with_processors(config: &RuntimeConfig) -> Self {
        let scheduler = Self::new(config);
        {
            let mut state = scheduler.state.lock();
            for id in 0..config.processors {
                state
                    .processors
                    .insert(ProcessorId(id), VirtualProcessor::new(ProcessorId(id)));
            }
        }
        scheduler
    }
}

impl Clone for Scheduler {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            turn: Arc::clone(&self.turn),
            stats: Arc::clone(&self.stats),
            step_warn_after: self.step_warn_after,
            terminate_timeout: self.terminate_timeout,
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::with_processors(&RuntimeConfig::default())
    }
}
