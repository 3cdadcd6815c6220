/*!
 * Debugger Core
 * Commands, the per-stop executor, and the link that rendezvouses
 * stopped threads with the console
 */

mod command;
mod executor;
mod link;
mod source;

pub use command::DebugCommand;
pub use executor::{DebugExecutor, ExecutorEnv};
pub use link::{
    DebugLink, Resumption, StopReason, StoppedThread, TraceCallback, TraceEvent,
};
pub use source::SourceCache;
