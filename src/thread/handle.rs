/*!
 * Thread Handle
 * What a running logical thread holds: its contexts, step state and the
 * notification hook it calls at every statement boundary
 */

use super::mailbox::Mailbox;
use super::step::StepState;
use crate::breakpoints::Breakpoint;
use crate::context::{ContextArena, ContextId};
use crate::core::errors::RuntimeResult;
use crate::core::types::{Location, ProcessorId, ThreadId, VirtualTime};
use crate::debug::{Resumption, StopReason, TraceEvent};
use crate::runtime::{Runtime, Shared};
use crate::scheduler::ThreadSignal;
use std::sync::Arc;
use tracing::warn;

/// Owned by the native thread that backs a logical thread
pub struct ThreadHandle {
    id: ThreadId,
    name: String,
    processor: ProcessorId,
    mailbox: Arc<Mailbox>,
    contexts: ContextArena,
    step: StepState,
    last_point: Option<(Location, ContextId)>,
    atomic: bool,
    guard_op: Option<String>,
    shared: Arc<Shared>,
}

impl ThreadHandle {
    pub(crate) fn new(
        id: ThreadId,
        name: &str,
        processor: ProcessorId,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            processor,
            mailbox: Arc::new(Mailbox::new(id)),
            contexts: ContextArena::new(),
            step: StepState::new(),
            last_point: None,
            atomic: false,
            guard_op: None,
            shared,
        }
    }

    #[inline]
    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn processor(&self) -> ProcessorId {
        self.processor
    }

    pub fn contexts(&self) -> &ContextArena {
        &self.contexts
    }

    pub fn contexts_mut(&mut self) -> &mut ContextArena {
        &mut self.contexts
    }

    pub fn step_state(&self) -> &StepState {
        &self.step
    }

    pub(crate) fn step_state_mut(&mut self) -> &mut StepState {
        &mut self.step
    }

    pub(crate) fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Contexts to inspect and step state to update while stopped
    pub(crate) fn debug_parts(&mut self) -> (&ContextArena, &mut StepState) {
        (&self.contexts, &mut self.step)
    }

    /// True while debugger-initiated evaluation runs on this thread
    #[inline]
    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    /// Run `f` with breakpoint notifications disabled
    pub fn atomically<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.atomic, true);
        let result = f(self);
        self.atomic = previous;
        result
    }

    /// Name the guarded operation this thread is blocked on, if any
    pub fn set_guard_op(&mut self, op: Option<String>) {
        self.guard_op = op;
    }

    pub fn guard_op(&self) -> Option<&str> {
        self.guard_op.as_deref()
    }

    /// Global virtual time
    pub fn now(&self) -> VirtualTime {
        self.shared.scheduler.now()
    }

    /// Start another logical thread
    pub fn spawn_thread<F>(
        &self,
        name: &str,
        processor: ProcessorId,
        body: F,
    ) -> RuntimeResult<ThreadId>
    where
        F: FnOnce(&mut ThreadHandle) + Send + 'static,
    {
        Runtime::from_shared(Arc::clone(&self.shared)).spawn_thread(name, processor, body)
    }

    /// Wait for the first turn. False when the thread must exit at once.
    pub(crate) fn start(&mut self) -> bool {
        // A pause requested before the first turn is honoured at the first
        // statement boundary instead, where there is a location to report
        self.shared.scheduler.wait_turn(self.id) != ThreadSignal::Terminate
    }

    /// Statement boundary. Ends the current step, then checks stepping and
    /// breakpoints at `location`. Returns false when the thread has been
    /// told to terminate and must unwind.
    pub fn notify_point(&mut self, location: &Location, ctx: ContextId) -> bool {
        if self.atomic {
            return true;
        }

        let signal = self.shared.scheduler.yield_now(self.id);
        if !self.obey(signal, location, ctx) {
            return false;
        }

        match self.check_point(location, ctx) {
            None => true,
            Some(reason) => match self.park(location, ctx, reason) {
                Resumption::Terminate => false,
                Resumption::Resume => {
                    let signal = self.shared.scheduler.wait_turn(self.id);
                    self.obey(signal, location, ctx)
                }
            },
        }
    }

    /// Act on a scheduler signal until the thread owns the turn
    fn obey(&mut self, mut signal: ThreadSignal, location: &Location, ctx: ContextId) -> bool {
        loop {
            match signal {
                ThreadSignal::Run => return true,
                ThreadSignal::Terminate => return false,
                ThreadSignal::Pause => match self.park(location, ctx, StopReason::Paused) {
                    Resumption::Terminate => return false,
                    Resumption::Resume => signal = self.shared.scheduler.wait_turn(self.id),
                },
            }
        }
    }

    fn park(&mut self, location: &Location, ctx: ContextId, reason: StopReason) -> Resumption {
        let shared = Arc::clone(&self.shared);
        shared.link.stopped(self, location, ctx, reason)
    }

    /// True when `location` carries on the line visit of the previous
    /// notify point: same line, same frame, further along the line
    fn continues_visit(&self, location: &Location, ctx: ContextId) -> bool {
        matches!(
            &self.last_point,
            Some((last, last_ctx))
                if *last_ctx == ctx && last.same_line(location) && location.column > last.column
        )
    }

    /// Hit counting, tracepoints, then stepping, then user breakpoints.
    /// Breakpoints see one hit per visit to their line, however many
    /// notify points the line holds.
    fn check_point(&mut self, location: &Location, ctx: ContextId) -> Option<StopReason> {
        let shared = Arc::clone(&self.shared);
        let points = if self.continues_visit(location, ctx) {
            Vec::new()
        } else {
            shared.breakpoints.at(location)
        };
        self.last_point = Some((location.clone(), ctx));
        let now = shared.scheduler.now();
        for point in &points {
            point.record_hit(now);
        }

        for point in points.iter().filter(|p| p.is_trace()) {
            self.emit_trace(point, location, ctx);
        }

        if self.step.should_stop(location, ctx, &self.contexts) {
            return Some(StopReason::Step);
        }

        for point in points.iter().filter(|p| !p.is_trace()) {
            let verdict = self.atomically(|thread| {
                point.should_suspend(shared.evaluator.as_ref(), &thread.contexts, ctx)
            });
            match verdict {
                Ok(true) => return Some(StopReason::Breakpoint(point.number())),
                Ok(false) => {}
                Err(e) => {
                    warn!(thread = %self.id, breakpoint = point.number(), error = %e, "Breakpoint condition failed");
                    shared.link.report(e.to_string());
                }
            }
        }
        None
    }

    fn emit_trace(&mut self, point: &Breakpoint, location: &Location, ctx: ContextId) {
        let shared = Arc::clone(&self.shared);
        let text = self.atomically(|thread| {
            point.render_trace(shared.evaluator.as_ref(), &thread.contexts, ctx)
        });
        shared.link.trace(&TraceEvent {
            thread: self.id,
            number: point.number(),
            location: location.clone(),
            text,
        });
    }
}

impl Drop for ThreadHandle {
    fn drop(&mut self) {
        self.shared.scheduler.exit(self.id);
        self.shared.link.thread_exited(self.id);
    }
}

impl std::fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("processor", &self.processor)
            .field("frames", &self.contexts.len())
            .field("atomic", &self.atomic)
            .finish()
    }
}
