/*!
 * Step State
 * Per-thread record of the last stepping command
 */

use crate::context::{ContextArena, ContextId};
use crate::core::types::Location;

/// `stepline` is the line the step started from. `next_ctx` and `out_ctx`
/// are call frames: while one of them is a strict ancestor of the current
/// call frame, execution is still inside a call the user asked to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepState {
    stepline: Option<Location>,
    next_ctx: Option<ContextId>,
    out_ctx: Option<ContextId>,
}

impl StepState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop at the next new line, descending into calls
    pub fn step(&mut self, from: &Location) {
        self.stepline = Some(from.clone());
        self.next_ctx = None;
        self.out_ctx = None;
    }

    /// Stop at the next new line without descending into calls
    pub fn next(&mut self, from: &Location, ctx: ContextId, contexts: &ContextArena) {
        self.stepline = Some(from.clone());
        self.next_ctx = contexts.root_of(ctx);
        self.out_ctx = None;
    }

    /// Stop once the current call has returned. At the outermost call
    /// there is nothing to return to and this behaves like `step`.
    pub fn out(&mut self, from: &Location, ctx: ContextId, contexts: &ContextArena) {
        self.stepline = Some(from.clone());
        self.next_ctx = None;
        self.out_ctx = contexts
            .root_of(ctx)
            .and_then(|root| contexts.outer(root))
            .and_then(|caller| contexts.root_of(caller));
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.stepline.is_some()
    }

    pub fn stepline(&self) -> Option<&Location> {
        self.stepline.as_ref()
    }

    pub fn next_ctx(&self) -> Option<ContextId> {
        self.next_ctx
    }

    pub fn out_ctx(&self) -> Option<ContextId> {
        self.out_ctx
    }

    /// True when a thread at `at` in `ctx` has completed the step
    pub fn should_stop(&self, at: &Location, ctx: ContextId, contexts: &ContextArena) -> bool {
        let Some(stepline) = &self.stepline else {
            return false;
        };
        if stepline.same_line(at) {
            return false;
        }

        let guard = match (self.next_ctx, self.out_ctx) {
            (None, None) => return true,
            (Some(next), _) => next,
            (None, Some(out)) => out,
        };
        // Still below the guarded frame: keep going
        match contexts.root_of(ctx) {
            Some(root) => !contexts.is_strict_ancestor(guard, root),
            None => true,
        }
    }
}
