/*!
 * Specrun Kernel Library
 * Deterministic cooperative scheduling of logical threads over virtual
 * processors, with a rendezvous debugger for breakpoints, tracepoints
 * and stepping
 */

pub mod breakpoints;
pub mod console;
pub mod context;
pub mod core;
pub mod debug;
pub mod eval;
pub mod monitoring;
pub mod runtime;
pub mod scheduler;
pub mod thread;

// Re-exports
pub use breakpoints::{Breakpoint, BreakpointTable, HitCondition};
pub use console::{ConsoleCommand, DebugReader, SessionOutcome};
pub use context::{ContextArena, ContextId};
pub use crate::core::errors::*;
pub use crate::core::{Location, ProcessorId, RuntimeConfig, ThreadId, VirtualTime};
pub use debug::{DebugCommand, DebugLink, StopReason, StoppedThread, TraceEvent};
pub use eval::{ExpressionEvaluator, SimpleEvaluator, Value};
pub use monitoring::init_tracing;
pub use runtime::Runtime;
pub use scheduler::{Scheduler, ThreadSignal, ThreadStatus};
pub use thread::ThreadHandle;
