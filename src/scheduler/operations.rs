/*!
 * Scheduler Operations
 * Driver side (tick, run, terminate) and thread side (yield, suspend, exit)
 *
 * Driver-side calls run on the thread that owns the run loop. Thread-side
 * calls are made by a logical thread on its own native thread.
 */

use super::types::{
    LogicalThread, ProcessorSnapshot, SchedulerStats, ThreadSignal, ThreadStatus,
};
use super::{Scheduler, VirtualProcessor};
use crate::core::errors::{SchedulerError, SchedulerResult};
use crate::core::limits::STEP_COST;
use crate::core::types::{ProcessorId, ThreadId, VirtualTime};
use std::time::Instant;
use tracing::{debug, error, info, warn};

impl Scheduler {
    // =========================================================================
    // Topology
    // =========================================================================

    pub fn add_processor(&self, id: ProcessorId) -> SchedulerResult<()> {
        let mut state = self.state.lock();
        if state.processors.contains_key(&id) {
            return Err(SchedulerError::DuplicateProcessor(id));
        }
        state.processors.insert(id, VirtualProcessor::new(id));
        info!(processor = %id, "Processor added");
        Ok(())
    }

    /// Create a thread record and place it at the tail of `processor`'s
    /// ready queue. The thread's first turn comes from a later tick.
    pub fn register(&self, name: &str, processor: ProcessorId) -> SchedulerResult<ThreadId> {
        let mut state = self.state.lock();
        let now = state.clock.now();
        state.next_thread += 1;
        let id = ThreadId(state.next_thread);

        let cpu = state
            .processors
            .get_mut(&processor)
            .ok_or(SchedulerError::UnknownProcessor(processor))?;
        cpu.enqueue(id, now);
        state
            .threads
            .insert(id, LogicalThread::new(id, name, processor));

        self.stats.inc_active();
        self.turn.notify_all();
        info!(thread = %id, name, processor = %processor, "Thread registered");
        Ok(id)
    }

    // =========================================================================
    // Driver side
    // =========================================================================

    /// Run one step on every processor that has a ready thread, in
    /// processor id order. Returns the number of steps taken.
    pub fn tick(&self) -> SchedulerResult<usize> {
        let mut state = self.state.lock();
        let processors: Vec<ProcessorId> = state.processors.keys().copied().collect();
        let mut steps = 0;

        for pid in processors {
            let Some(tid) = state.processors.get_mut(&pid).and_then(|cpu| cpu.dispatch()) else {
                continue;
            };

            if let Some(holder) = state.running {
                return Err(SchedulerError::Inconsistent(format!(
                    "thread {} dispatched on {} while {} still runs",
                    tid, pid, holder
                )));
            }
            match state.threads.get_mut(&tid) {
                Some(thread) if thread.processor == pid => thread.status = ThreadStatus::Running,
                Some(thread) => {
                    return Err(SchedulerError::Inconsistent(format!(
                        "thread {} queued on {} but assigned to {}",
                        tid, pid, thread.processor
                    )))
                }
                None => {
                    return Err(SchedulerError::Inconsistent(format!(
                        "processor {} queued unknown thread {}",
                        pid, tid
                    )))
                }
            }
            state.running = Some(tid);
            self.stats.inc_steps();
            self.turn.notify_all();

            // The step ends when the thread yields, suspends or exits
            let started = Instant::now();
            let mut warned = false;
            while state
                .threads
                .get(&tid)
                .map_or(false, |t| t.status == ThreadStatus::Running)
            {
                let waited = self.turn.wait_for(&mut state, self.step_warn_after);
                if waited.timed_out() && !warned {
                    warn!(
                        thread = %tid,
                        processor = %pid,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Thread has not yielded"
                    );
                    warned = true;
                }
            }

            state.release(tid, pid);
            if let Some(cpu) = state.processors.get_mut(&pid) {
                cpu.advance(STEP_COST);
            }
            steps += 1;
        }

        if steps > 0 {
            let now = state.clock.advance(STEP_COST);
            self.stats.inc_ticks();
            debug!(now, steps, "Tick");
        }
        Ok(steps)
    }

    /// Drive ticks until `main` has exited. Idles on the condition variable
    /// while every live thread is suspended.
    pub fn run(&self, main: ThreadId) -> SchedulerResult<()> {
        info!(thread = %main, "Run started");
        loop {
            if !self.state.lock().is_live(main) {
                break;
            }
            if self.tick()? == 0 {
                let mut state = self.state.lock();
                while state.is_live(main) && !state.has_ready() {
                    self.turn.wait(&mut state);
                }
            }
        }
        info!(thread = %main, now = self.now(), "Run finished");
        Ok(())
    }

    /// Signal TERMINATE to every thread and wait, bounded, for them to exit.
    /// Threads still present after the timeout are dropped and reported.
    pub fn terminate_all(&self) -> SchedulerResult<()> {
        let deadline = Instant::now() + self.terminate_timeout;
        let mut state = self.state.lock();
        for thread in state.threads.values_mut() {
            thread.signal = ThreadSignal::Terminate;
        }
        self.turn.notify_all();

        while !state.threads.is_empty() {
            if self.turn.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        if state.threads.is_empty() {
            info!("All threads terminated");
            return Ok(());
        }

        let stragglers: Vec<ThreadId> = state.threads.keys().copied().collect();
        error!(threads = ?stragglers, "Threads did not observe TERMINATE, dropping");
        for id in &stragglers {
            if let Some(thread) = state.threads.remove(id) {
                if let Some(cpu) = state.processors.get_mut(&thread.processor) {
                    cpu.remove(*id);
                }
                self.stats.dec_active();
            }
        }
        state.running = None;
        self.turn.notify_all();
        Err(SchedulerError::NonYieldingThreads(stragglers))
    }

    // =========================================================================
    // Thread side
    // =========================================================================

    /// Block until `thread` holds the turn or must stop. Returns the signal
    /// the thread has to act on; `Run` means it owns the turn.
    pub fn wait_turn(&self, thread: ThreadId) -> ThreadSignal {
        let mut state = self.state.lock();
        loop {
            match state.threads.get(&thread) {
                None => return ThreadSignal::Terminate,
                Some(t) if t.signal == ThreadSignal::Terminate => return ThreadSignal::Terminate,
                Some(t) if t.status == ThreadStatus::Running => return t.signal,
                Some(_) => self.turn.wait(&mut state),
            }
        }
    }

    /// End the current step. With a pending PAUSE or TERMINATE the thread
    /// keeps the turn and the signal is returned for it to act on at once;
    /// otherwise it goes to the back of its ready queue and waits.
    pub fn yield_now(&self, thread: ThreadId) -> ThreadSignal {
        {
            let mut state = self.state.lock();
            let now = state.clock.now();
            let Some(t) = state.threads.get_mut(&thread) else {
                return ThreadSignal::Terminate;
            };
            if t.signal != ThreadSignal::Run {
                return t.signal;
            }
            t.status = ThreadStatus::Runnable;
            let processor = t.processor;
            state.release(thread, processor);
            if let Some(cpu) = state.processors.get_mut(&processor) {
                cpu.enqueue(thread, now);
            }
            self.stats.inc_yields();
            self.turn.notify_all();
        }
        self.wait_turn(thread)
    }

    /// Park `thread` outside every ready queue
    pub fn suspend(&self, thread: ThreadId) -> SchedulerResult<()> {
        let mut state = self.state.lock();
        let t = state
            .threads
            .get_mut(&thread)
            .ok_or(SchedulerError::UnknownThread(thread))?;
        t.status = ThreadStatus::Suspended;
        // Stopping is how a PAUSE is honoured
        if t.signal == ThreadSignal::Pause {
            t.signal = ThreadSignal::Run;
        }
        let processor = t.processor;
        state.release(thread, processor);
        self.stats.inc_suspensions();
        self.turn.notify_all();
        Ok(())
    }

    /// Make a suspended thread runnable again. A PAUSE or TERMINATE that
    /// arrived while it was suspended stays pending and is acted on at
    /// its first turn.
    pub fn resume(&self, thread: ThreadId) -> SchedulerResult<()> {
        let mut state = self.state.lock();
        let now = state.clock.now();
        let t = state
            .threads
            .get_mut(&thread)
            .ok_or(SchedulerError::UnknownThread(thread))?;
        t.status = ThreadStatus::Runnable;
        let processor = t.processor;
        if let Some(cpu) = state.processors.get_mut(&processor) {
            cpu.enqueue(thread, now);
        }
        self.turn.notify_all();
        Ok(())
    }

    /// Ask every other live thread to stop at its next yield. Suspended
    /// threads keep the request until they are resumed.
    pub fn pause_others(&self, except: ThreadId) {
        let mut state = self.state.lock();
        for t in state.threads.values_mut() {
            if t.id != except && t.signal == ThreadSignal::Run && t.status.is_live() {
                t.signal = ThreadSignal::Pause;
            }
        }
        self.turn.notify_all();
    }

    /// Deliver `signal` to every live thread. TERMINATE is never downgraded.
    pub fn signal_all(&self, signal: ThreadSignal) {
        let mut state = self.state.lock();
        for t in state.threads.values_mut() {
            if t.signal != ThreadSignal::Terminate {
                t.signal = signal;
            }
        }
        self.turn.notify_all();
    }

    /// Current signal for `thread`; a missing record reads as TERMINATE
    pub fn signal(&self, thread: ThreadId) -> ThreadSignal {
        self.state
            .lock()
            .threads
            .get(&thread)
            .map_or(ThreadSignal::Terminate, |t| t.signal)
    }

    /// Stop counting `thread` as live; its record stays until `exit`
    pub fn mark_terminated(&self, thread: ThreadId) {
        let mut state = self.state.lock();
        let Some(t) = state.threads.get_mut(&thread) else {
            return;
        };
        t.status = ThreadStatus::Terminated;
        t.signal = ThreadSignal::Terminate;
        let processor = t.processor;
        if let Some(cpu) = state.processors.get_mut(&processor) {
            cpu.remove(thread);
        }
        if state.running == Some(thread) {
            state.running = None;
        }
        self.turn.notify_all();
    }

    /// Remove `thread` for good
    pub fn exit(&self, thread: ThreadId) -> Option<LogicalThread> {
        let mut state = self.state.lock();
        let record = state.threads.remove(&thread)?;
        if let Some(cpu) = state.processors.get_mut(&record.processor) {
            cpu.remove(thread);
        }
        if state.running == Some(thread) {
            state.running = None;
        }
        self.stats.dec_active();
        self.turn.notify_all();
        debug!(thread = %thread, name = %record.name, "Thread exited");
        Some(record)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Threads that are runnable, running or suspended
    pub fn thread_count(&self) -> usize {
        self.state
            .lock()
            .threads
            .values()
            .filter(|t| t.status.is_live())
            .count()
    }

    pub fn thread(&self, thread: ThreadId) -> Option<LogicalThread> {
        self.state.lock().threads.get(&thread).cloned()
    }

    pub fn threads(&self) -> Vec<LogicalThread> {
        self.state.lock().threads.values().cloned().collect()
    }

    pub fn processors(&self) -> Vec<ProcessorSnapshot> {
        self.state
            .lock()
            .processors
            .values()
            .map(VirtualProcessor::snapshot)
            .collect()
    }

    /// Global virtual time
    pub fn now(&self) -> VirtualTime {
        self.state.lock().clock.now()
    }

    pub fn stats(&self) -> SchedulerStats {
        let now = self.now();
        self.stats.snapshot(now)
    }
}
