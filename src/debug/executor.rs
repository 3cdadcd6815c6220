/*!
 * Debug Executor
 * Interprets debugger commands for one stopped thread at one location
 */

use super::command::DebugCommand;
use super::source::SourceCache;
use crate::context::{ContextArena, ContextId};
use crate::core::types::{Location, ThreadId};
use crate::eval::ExpressionEvaluator;
use crate::thread::StepState;
use std::fmt::Write;

/// Read-only services the executor needs from the runtime
pub struct ExecutorEnv<'a> {
    pub evaluator: &'a dyn ExpressionEvaluator,
    pub sources: &'a SourceCache,
    pub source_context: usize,
}

#[derive(Debug, Clone)]
struct FrameRef {
    ctx: ContextId,
    location: Location,
}

/// Bound to a (location, context) pair for the duration of one stop.
/// Frames are held outermost first; the selected frame starts at the
/// innermost one, where the thread actually stopped.
#[derive(Debug)]
pub struct DebugExecutor {
    thread: ThreadId,
    location: Location,
    ctx: ContextId,
    frames: Vec<FrameRef>,
    selected: usize,
}

impl DebugExecutor {
    pub fn new(thread: ThreadId, location: &Location, ctx: ContextId, contexts: &ContextArena) -> Self {
        let levels = contexts.call_levels(ctx);
        let mut frames = Vec::with_capacity(levels.len().max(1));
        let mut at = location.clone();
        for (i, level) in levels.iter().enumerate() {
            frames.push(FrameRef {
                ctx: *level,
                location: at.clone(),
            });
            // The next level out is positioned at the call site of this one
            if let Some(call) = contexts.root_of(*level).and_then(|root| contexts.get(root)) {
                at = call.location.clone();
            } else if i + 1 < levels.len() {
                break;
            }
        }
        if frames.is_empty() {
            frames.push(FrameRef {
                ctx,
                location: location.clone(),
            });
        }
        frames.reverse();
        let selected = frames.len() - 1;

        Self {
            thread,
            location: location.clone(),
            ctx,
            frames,
            selected,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Context of the frame UP/DOWN currently point at
    pub fn selected_context(&self) -> ContextId {
        self.frames[self.selected].ctx
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Handle one command and produce the reply. A `Resume` reply means the
    /// thread should leave the stop.
    pub fn run(
        &mut self,
        command: DebugCommand,
        contexts: &ContextArena,
        step: &mut StepState,
        env: &ExecutorEnv<'_>,
    ) -> DebugCommand {
        match command {
            DebugCommand::Step => {
                step.step(&self.location);
                DebugCommand::Resume
            }
            DebugCommand::Next => {
                step.next(&self.location, self.ctx, contexts);
                DebugCommand::Resume
            }
            DebugCommand::Out => {
                step.out(&self.location, self.ctx, contexts);
                DebugCommand::Resume
            }
            DebugCommand::Continue => {
                step.clear();
                DebugCommand::Resume
            }
            DebugCommand::Stack => DebugCommand::Result(self.stack(contexts)),
            DebugCommand::Up => {
                if self.selected == 0 {
                    return DebugCommand::Error("Already at outermost frame".to_string());
                }
                self.selected -= 1;
                DebugCommand::Result(self.frame_line(self.selected, contexts))
            }
            DebugCommand::Down => {
                if self.selected + 1 == self.frames.len() {
                    return DebugCommand::Error("Already at innermost frame".to_string());
                }
                self.selected += 1;
                DebugCommand::Result(self.frame_line(self.selected, contexts))
            }
            DebugCommand::Source => {
                let at = &self.frames[self.selected].location;
                match env.sources.listing(at, env.source_context) {
                    Ok(text) => DebugCommand::Result(text),
                    Err(e) => DebugCommand::Error(e),
                }
            }
            DebugCommand::Print(expr) => self.print(&expr, contexts, env),
            DebugCommand::Threads
            | DebugCommand::Thread(_)
            | DebugCommand::Breakpoint(_)
            | DebugCommand::Resume
            | DebugCommand::Terminate
            | DebugCommand::Ack
            | DebugCommand::Error(_)
            | DebugCommand::Result(_) => DebugCommand::Error("Bad command".to_string()),
        }
    }

    /// Evaluate `expr` in the selected frame
    pub fn print(&self, expr: &str, contexts: &ContextArena, env: &ExecutorEnv<'_>) -> DebugCommand {
        match env.evaluator.evaluate(expr, contexts, self.selected_context()) {
            Ok(value) => DebugCommand::Result(format!("{} = {}", expr.trim(), value)),
            Err(e) => DebugCommand::Error(e.to_string()),
        }
    }

    fn frame_line(&self, index: usize, contexts: &ContextArena) -> String {
        let frame = &self.frames[index];
        let title = contexts
            .root_of(frame.ctx)
            .and_then(|root| contexts.get(root))
            .map_or("?", |f| f.title.as_str());
        let marker = if index == self.selected { "=>" } else { "  " };
        format!("{} {}: {} at {}", marker, index, title, frame.location)
    }

    fn stack(&self, contexts: &ContextArena) -> String {
        let mut out = format!("Thread {} stopped at {}", self.thread, self.location);
        for index in (0..self.frames.len()).rev() {
            let _ = write!(out, "\n{}", self.frame_line(index, contexts));
            for (ctx, frame) in contexts.chain(self.frames[index].ctx) {
                for (name, value) in frame.bindings() {
                    let _ = write!(out, "\n       {} = {}", name, value);
                }
                if contexts.root_of(ctx) == Some(ctx) {
                    break;
                }
            }
        }
        out
    }
}
