/*!
 * Debug Link
 * The rendezvous between stopped logical threads and the debugger console
 *
 * A thread that stops registers itself in the stopped set and then serves
 * commands from its mailbox until it is told to RESUME or TERMINATE. The
 * console waits for the quorum (every live thread stopped), talks to one
 * thread at a time, and releases them all together.
 *
 * Lock order: link state, then scheduler.
 */

use super::command::DebugCommand;
use super::executor::{DebugExecutor, ExecutorEnv};
use crate::context::ContextId;
use crate::core::errors::{DebugProtocolError, DebugResult};
use crate::core::limits::STOPPOINT_NUMBER;
use crate::core::types::{Location, ProcessorId, ThreadId, VirtualTime};
use crate::scheduler::{Scheduler, ThreadSignal};
use crate::thread::{Mailbox, ThreadHandle};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Why a thread stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "number", rename_all = "snake_case")]
pub enum StopReason {
    /// A user breakpoint whose conditions held
    Breakpoint(u32),
    /// A step, next or out completed
    Step,
    /// Another thread stopped and this one was asked to join it
    Paused,
}

impl StopReason {
    /// Breakpoint number reported for the stop; stepping uses the
    /// ephemeral stoppoint number
    pub fn breakpoint(self) -> Option<u32> {
        match self {
            StopReason::Breakpoint(n) => Some(n),
            StopReason::Step => Some(STOPPOINT_NUMBER),
            StopReason::Paused => None,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Breakpoint(n) => write!(f, "breakpoint [{}]", n),
            StopReason::Step => write!(f, "step"),
            StopReason::Paused => write!(f, "paused"),
        }
    }
}

/// How a stop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resumption {
    Resume,
    Terminate,
}

/// Output of a tracepoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub thread: ThreadId,
    pub number: u32,
    pub location: Location,
    pub text: String,
}

pub type TraceCallback = Arc<dyn Fn(&TraceEvent) + Send + Sync>;

#[derive(Debug)]
struct StoppedEntry {
    name: String,
    processor: ProcessorId,
    mailbox: Arc<Mailbox>,
    location: Location,
    reason: StopReason,
    guard_op: Option<String>,
    since: VirtualTime,
}

/// A member of the stopped set, as shown by `threads`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoppedThread {
    pub id: ThreadId,
    pub name: String,
    pub processor: ProcessorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakpoint: Option<u32>,
    pub location: Location,
    pub reason: StopReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard_op: Option<String>,
    pub since: VirtualTime,
}

impl fmt::Display for StoppedThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} on {} stopped at {} ({})",
            self.id, self.name, self.processor, self.location, self.reason
        )?;
        if let Some(op) = &self.guard_op {
            write!(f, " waiting on {}", op)?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct LinkState {
    stopped: BTreeMap<ThreadId, StoppedEntry>,
    reports: Vec<String>,
    trace: Option<TraceCallback>,
    interrupted: bool,
}

pub struct DebugLink {
    state: Mutex<LinkState>,
    changed: Condvar,
    scheduler: Scheduler,
}

impl DebugLink {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            state: Mutex::new(LinkState::default()),
            changed: Condvar::new(),
            scheduler,
        }
    }

    // =========================================================================
    // Thread side
    // =========================================================================

    /// Called by a thread that has to stop. Blocks serving debugger commands
    /// until RESUME or TERMINATE arrives.
    pub fn stopped(
        &self,
        thread: &mut ThreadHandle,
        location: &Location,
        ctx: ContextId,
        reason: StopReason,
    ) -> Resumption {
        let id = thread.id();
        {
            let mut state = self.state.lock();
            // Checked under the link lock so a concurrent kill_all either
            // sees this entry or this thread sees its TERMINATE
            if self.scheduler.signal(id) == ThreadSignal::Terminate {
                return Resumption::Terminate;
            }
            if let Err(e) = self.scheduler.suspend(id) {
                error!(thread = %id, error = %e, "Cannot suspend stopping thread");
                return Resumption::Terminate;
            }
            if reason != StopReason::Paused {
                self.scheduler.pause_others(id);
            }
            state.stopped.insert(
                id,
                StoppedEntry {
                    name: thread.name().to_string(),
                    processor: thread.processor(),
                    mailbox: Arc::clone(thread.mailbox()),
                    location: location.clone(),
                    reason,
                    guard_op: thread.guard_op().map(str::to_string),
                    since: self.scheduler.now(),
                },
            );
            self.changed.notify_all();
        }
        if reason != StopReason::Paused {
            thread.step_state_mut().clear();
        }
        info!(thread = %id, location = %location, reason = %reason, "Thread stopped");

        let shared = Arc::clone(thread.shared());
        let env = ExecutorEnv {
            evaluator: shared.evaluator.as_ref(),
            sources: &shared.sources,
            source_context: shared.config.source_context,
        };
        let mailbox = Arc::clone(thread.mailbox());
        let mut executor = DebugExecutor::new(id, location, ctx, thread.contexts());

        loop {
            let command = match mailbox.take() {
                Ok(command) => command,
                Err(e) => {
                    error!(thread = %id, error = %e, "Mailbox closed while stopped");
                    self.scheduler.mark_terminated(id);
                    return Resumption::Terminate;
                }
            };
            debug!(thread = %id, command = %command, "Debug command");

            let reply = match command {
                DebugCommand::Resume => {
                    if let Err(e) = self.scheduler.resume(id) {
                        error!(thread = %id, error = %e, "Cannot resume thread");
                    }
                    let _ = mailbox.reply(DebugCommand::Ack);
                    return Resumption::Resume;
                }
                DebugCommand::Terminate => {
                    self.scheduler.mark_terminated(id);
                    let _ = mailbox.reply(DebugCommand::Ack);
                    return Resumption::Terminate;
                }
                // Evaluation must not trigger breakpoints on this thread
                DebugCommand::Print(expr) => {
                    thread.atomically(|t| executor.print(&expr, t.contexts(), &env))
                }
                other => {
                    let (contexts, step) = thread.debug_parts();
                    executor.run(other, contexts, step, &env)
                }
            };

            if let Err(e) = mailbox.reply(reply) {
                error!(thread = %id, error = %e, "Cannot reply to debugger");
                self.scheduler.mark_terminated(id);
                return Resumption::Terminate;
            }
        }
    }

    /// Record a non-fatal problem (e.g. a failed breakpoint condition) for
    /// the console to show at its next prompt
    pub fn report(&self, message: impl Into<String>) {
        self.state.lock().reports.push(message.into());
    }

    /// Emit tracepoint output through the callback, or the log when none is set
    pub fn trace(&self, event: &TraceEvent) {
        let callback = self.state.lock().trace.clone();
        match callback {
            Some(callback) => callback(event),
            None => info!(
                target: "specrun::trace",
                thread = %event.thread,
                location = %event.location,
                "{}",
                event.text
            ),
        }
    }

    /// A thread left the population; wake quorum waiters
    pub fn thread_exited(&self, thread: ThreadId) {
        let mut state = self.state.lock();
        state.stopped.remove(&thread);
        self.changed.notify_all();
    }

    // =========================================================================
    // Console side
    // =========================================================================

    /// Block until every live thread is stopped, or none are left.
    /// Returns false if the wait was interrupted.
    pub fn wait_for_stop(&self) -> bool {
        let mut state = self.state.lock();
        loop {
            if state.interrupted {
                state.interrupted = false;
                return false;
            }
            if self.quorum(&state) {
                return true;
            }
            self.changed.wait(&mut state);
        }
    }

    /// As [`wait_for_stop`](Self::wait_for_stop), giving up after `timeout`
    pub fn wait_for_stop_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if state.interrupted {
                state.interrupted = false;
                return false;
            }
            if self.quorum(&state) {
                return true;
            }
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return self.quorum(&state);
            }
        }
    }

    fn quorum(&self, state: &LinkState) -> bool {
        let live = self.scheduler.thread_count();
        live == 0 || state.stopped.len() >= live
    }

    /// Abandon any current or future wait_for_stop
    pub fn interrupt(&self) {
        self.state.lock().interrupted = true;
        self.changed.notify_all();
    }

    /// Send one command to a stopped thread and return its reply.
    /// RESUME and TERMINATE also update the stopped set.
    pub fn send(&self, thread: ThreadId, command: DebugCommand) -> DebugResult<DebugCommand> {
        match command {
            DebugCommand::Resume => self.resume(thread).map(|_| DebugCommand::Ack),
            DebugCommand::Terminate => self.terminate(thread).map(|_| DebugCommand::Ack),
            command => {
                let mailbox = self
                    .state
                    .lock()
                    .stopped
                    .get(&thread)
                    .map(|entry| Arc::clone(&entry.mailbox))
                    .ok_or(DebugProtocolError::NotStopped(thread))?;
                mailbox.request(command)
            }
        }
    }

    /// Release a single stopped thread
    pub fn resume(&self, thread: ThreadId) -> DebugResult<()> {
        let entry = self
            .state
            .lock()
            .stopped
            .remove(&thread)
            .ok_or(DebugProtocolError::NotStopped(thread))?;
        deliver(thread, &entry.mailbox, DebugCommand::Resume)
    }

    /// Terminate a single stopped thread
    pub fn terminate(&self, thread: ThreadId) -> DebugResult<()> {
        let entry = self
            .state
            .lock()
            .stopped
            .remove(&thread)
            .ok_or(DebugProtocolError::NotStopped(thread))?;
        deliver(thread, &entry.mailbox, DebugCommand::Terminate)?;
        self.changed.notify_all();
        Ok(())
    }

    /// Release every stopped thread. The set is emptied before the first
    /// RESUME goes out, so a thread that stops again straight away is
    /// registered afresh rather than erased.
    pub fn resume_all(&self) -> DebugResult<()> {
        let drained = std::mem::take(&mut self.state.lock().stopped);
        info!(threads = drained.len(), "Resuming stopped threads");
        deliver_all(drained, DebugCommand::Resume)
    }

    /// Terminate every thread: stopped ones through their mailboxes, running
    /// ones at their next yield. Clears the trace callback.
    pub fn kill_all(&self) -> DebugResult<()> {
        let drained = {
            let mut state = self.state.lock();
            self.scheduler.signal_all(ThreadSignal::Terminate);
            state.trace = None;
            std::mem::take(&mut state.stopped)
        };
        info!(threads = drained.len(), "Terminating all threads");
        let delivered = deliver_all(drained, DebugCommand::Terminate);
        self.changed.notify_all();
        delivered
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The stopped set, in thread id order
    pub fn threads(&self) -> Vec<StoppedThread> {
        self.state
            .lock()
            .stopped
            .iter()
            .map(|(id, entry)| StoppedThread {
                id: *id,
                name: entry.name.clone(),
                processor: entry.processor,
                breakpoint: entry.reason.breakpoint(),
                location: entry.location.clone(),
                reason: entry.reason,
                guard_op: entry.guard_op.clone(),
                since: entry.since,
            })
            .collect()
    }

    pub fn is_stopped(&self, thread: ThreadId) -> bool {
        self.state.lock().stopped.contains_key(&thread)
    }

    pub fn stopped_count(&self) -> usize {
        self.state.lock().stopped.len()
    }

    pub fn set_trace_callback(&self, callback: Option<TraceCallback>) {
        self.state.lock().trace = callback;
    }

    pub fn has_trace_callback(&self) -> bool {
        self.state.lock().trace.is_some()
    }

    /// Drain reports queued since the last call
    pub fn take_reports(&self) -> Vec<String> {
        std::mem::take(&mut self.state.lock().reports)
    }
}

/// Post a control command and insist on an ACK
fn deliver(thread: ThreadId, mailbox: &Mailbox, command: DebugCommand) -> DebugResult<()> {
    let expected = command.to_string();
    match mailbox.request(command)? {
        DebugCommand::Ack => Ok(()),
        other => Err(DebugProtocolError::UnexpectedReply {
            thread,
            expected,
            got: other.to_string(),
        }),
    }
}

/// Deliver to every drained entry even if one fails; the first failure
/// is returned
fn deliver_all(
    drained: BTreeMap<ThreadId, StoppedEntry>,
    command: DebugCommand,
) -> DebugResult<()> {
    let mut first_error = None;
    for (thread, entry) in drained {
        if let Err(e) = deliver(thread, &entry.mailbox, command.clone()) {
            error!(thread = %thread, error = %e, command = %command, "Control command not acknowledged");
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

impl fmt::Debug for DebugLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DebugLink")
            .field("stopped", &state.stopped.keys().collect::<Vec<_>>())
            .field("reports", &state.reports.len())
            .field("interrupted", &state.interrupted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_numbers() {
        assert_eq!(StopReason::Breakpoint(4).breakpoint(), Some(4));
        assert_eq!(StopReason::Step.breakpoint(), Some(STOPPOINT_NUMBER));
        assert_eq!(StopReason::Paused.breakpoint(), None);
    }

    #[test]
    fn test_empty_population_is_a_quorum() {
        let link = DebugLink::new(Scheduler::default());
        assert!(link.wait_for_stop());
        assert!(link.threads().is_empty());
    }

    #[test]
    fn test_interrupt_abandons_wait() {
        let scheduler = Scheduler::default();
        scheduler.register("t", ProcessorId(0)).unwrap();
        let link = DebugLink::new(scheduler);
        link.interrupt();
        assert!(!link.wait_for_stop());
        assert!(!link.wait_for_stop_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_send_to_running_thread() {
        let link = DebugLink::new(Scheduler::default());
        assert_eq!(
            link.send(ThreadId(1), DebugCommand::Stack),
            Err(DebugProtocolError::NotStopped(ThreadId(1)))
        );
        assert_eq!(link.resume(ThreadId(1)), Err(DebugProtocolError::NotStopped(ThreadId(1))));
    }

    #[test]
    fn test_reports_drain() {
        let link = DebugLink::new(Scheduler::default());
        link.report("one");
        link.report("two");
        assert_eq!(link.take_reports(), vec!["one".to_string(), "two".to_string()]);
        assert!(link.take_reports().is_empty());
    }
}
