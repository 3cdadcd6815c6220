/*!
 * Debug Commands
 * The messages exchanged through a stopped thread's mailbox
 */

use crate::core::types::ThreadId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "arg", rename_all = "snake_case")]
pub enum DebugCommand {
    // Stepping
    Step,
    Next,
    Out,
    Continue,

    // Inspection
    Stack,
    Up,
    Down,
    Source,
    Print(String),

    // Handled by the console, never by a thread
    Threads,
    Thread(ThreadId),
    Breakpoint(String),

    // Rendezvous control
    Resume,
    Terminate,

    // Replies
    Ack,
    Error(String),
    Result(String),
}

impl DebugCommand {
    /// True for commands that end the thread's stop when returned as a
    /// reply from the executor
    #[inline]
    pub fn is_resume(&self) -> bool {
        matches!(self, DebugCommand::Resume)
    }

    #[inline]
    pub fn is_reply(&self) -> bool {
        matches!(
            self,
            DebugCommand::Ack | DebugCommand::Error(_) | DebugCommand::Result(_) | DebugCommand::Resume
        )
    }
}

impl fmt::Display for DebugCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebugCommand::Step => write!(f, "STEP"),
            DebugCommand::Next => write!(f, "NEXT"),
            DebugCommand::Out => write!(f, "OUT"),
            DebugCommand::Continue => write!(f, "CONTINUE"),
            DebugCommand::Stack => write!(f, "STACK"),
            DebugCommand::Up => write!(f, "UP"),
            DebugCommand::Down => write!(f, "DOWN"),
            DebugCommand::Source => write!(f, "SOURCE"),
            DebugCommand::Print(expr) => write!(f, "PRINT {}", expr),
            DebugCommand::Threads => write!(f, "THREADS"),
            DebugCommand::Thread(id) => write!(f, "THREAD {}", id),
            DebugCommand::Breakpoint(spec) => write!(f, "BREAKPOINT {}", spec),
            DebugCommand::Resume => write!(f, "RESUME"),
            DebugCommand::Terminate => write!(f, "TERMINATE"),
            DebugCommand::Ack => write!(f, "ACK"),
            DebugCommand::Error(msg) => write!(f, "ERROR {}", msg),
            DebugCommand::Result(text) => write!(f, "RESULT {}", text),
        }
    }
}
