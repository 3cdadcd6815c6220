/*!
 * Scheduler Types
 * Thread status, control signals and the scheduler's observable state
 */

use crate::core::types::{ProcessorId, ThreadId, VirtualTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a logical thread
///
/// ```text
/// Runnable -> Running -> Runnable      (step finished, yielded)
///                     -> Suspended     (stopped in the debugger)
///                     -> Terminated
/// Suspended -> Runnable                (RESUME)
///           -> Terminated              (TERMINATE)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    /// Waiting in a processor's ready queue
    Runnable,
    /// Holds the single execution turn
    Running,
    /// Parked at a stop, waiting for debugger commands
    Suspended,
    /// Finished or told to terminate; no longer counted as live
    Terminated,
}

impl ThreadStatus {
    /// Counted by `thread_count()`
    #[inline]
    pub fn is_live(self) -> bool {
        !matches!(self, ThreadStatus::Terminated)
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThreadStatus::Runnable => "runnable",
            ThreadStatus::Running => "running",
            ThreadStatus::Suspended => "suspended",
            ThreadStatus::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Control signal observed by a thread at its next yield point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadSignal {
    Run,
    /// Stop at the next yield point and join the stopped set
    Pause,
    /// Unwind and exit at the next yield point
    Terminate,
}

/// The scheduler's record of one logical thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalThread {
    pub id: ThreadId,
    pub name: String,
    pub processor: ProcessorId,
    pub status: ThreadStatus,
    pub signal: ThreadSignal,
}

impl LogicalThread {
    pub fn new(id: ThreadId, name: impl Into<String>, processor: ProcessorId) -> Self {
        Self {
            id,
            name: name.into(),
            processor,
            status: ThreadStatus::Runnable,
            signal: ThreadSignal::Run,
        }
    }
}

/// Point-in-time view of a virtual processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorSnapshot {
    pub id: ProcessorId,
    pub clock: VirtualTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<ThreadId>,
    pub ready: Vec<ThreadId>,
}

/// Scheduler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub steps: u64,
    pub yields: u64,
    pub suspensions: u64,
    pub active_threads: usize,
    pub now: VirtualTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminated_is_not_live() {
        assert!(ThreadStatus::Suspended.is_live());
        assert!(ThreadStatus::Running.is_live());
        assert!(!ThreadStatus::Terminated.is_live());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ThreadStatus::Suspended).unwrap();
        assert_eq!(json, "\"suspended\"");
    }
}
