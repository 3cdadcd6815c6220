/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::{ProcessorId, ThreadId};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scheduler failures. All of these abort the run.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SchedulerError {
    #[error("Processor {0} is not known to the scheduler")]
    #[diagnostic(
        code(scheduler::unknown_processor),
        help("Create the processor with add_processor before placing threads on it.")
    )]
    UnknownProcessor(ProcessorId),

    #[error("Thread {0} is not known to the scheduler")]
    #[diagnostic(
        code(scheduler::unknown_thread),
        help("The thread may have terminated or was never registered.")
    )]
    UnknownThread(ThreadId),

    #[error("Processor {0} already exists")]
    #[diagnostic(code(scheduler::duplicate_processor))]
    DuplicateProcessor(ProcessorId),

    #[error("Threads {0:?} did not yield after TERMINATE")]
    #[diagnostic(
        code(scheduler::non_yielding_threads),
        help("A thread that never reaches a statement boundary cannot be stopped. Check for loops without yield points.")
    )]
    NonYieldingThreads(Vec<ThreadId>),

    #[error("Scheduler state inconsistent: {0}")]
    #[diagnostic(
        code(scheduler::inconsistent),
        help("An internal invariant was broken. Please report this issue.")
    )]
    Inconsistent(String),

    #[error("Failed to start native thread for '{name}': {reason}")]
    #[diagnostic(code(scheduler::spawn_failed))]
    SpawnFailed { name: String, reason: String },
}

/// A breakpoint condition or hit test that could not be evaluated.
/// Treated as "do not suspend" and reported lazily.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum BreakpointConditionError {
    #[error("Breakpoint [{number}] condition '{condition}' failed: {reason}")]
    #[diagnostic(code(breakpoint::condition_failed))]
    Evaluation {
        number: u32,
        condition: String,
        reason: String,
    },

    #[error("Breakpoint [{number}] condition '{condition}' is not boolean (got {value})")]
    #[diagnostic(code(breakpoint::not_boolean))]
    NotBoolean {
        number: u32,
        condition: String,
        value: String,
    },
}

/// Mistakes made while creating or removing breakpoints
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum BreakpointError {
    #[error("Bad breakpoint: {0}")]
    #[diagnostic(
        code(breakpoint::syntax),
        help("Usage: break [<file>:]<line> [=|>|>=|% <n>] [<condition>]")
    )]
    Syntax(String),

    #[error("Breakpoint [{0}] not set")]
    #[diagnostic(code(breakpoint::not_found), help("Use 'list' to see the current breakpoints."))]
    NotFound(u32),
}

/// Rendezvous protocol failures. Fatal to the debug session, not to the program.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum DebugProtocolError {
    #[error("Thread {0} is not stopped")]
    #[diagnostic(code(debug::not_stopped), help("Use 'threads' to list the stopped threads."))]
    NotStopped(ThreadId),

    #[error("Mailbox of thread {0} disconnected")]
    #[diagnostic(code(debug::disconnected))]
    Disconnected(ThreadId),

    #[error("Thread {thread} replied {got} to {expected}")]
    #[diagnostic(
        code(debug::unexpected_reply),
        help("The rendezvous acknowledgement did not match the command sent.")
    )]
    UnexpectedReply {
        thread: ThreadId,
        expected: String,
        got: String,
    },
}

/// Failures raised by expression evaluation (PRINT, conditions, trace displays)
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum EvaluationError {
    #[error("Parse error: {0}")]
    #[diagnostic(code(eval::parse))]
    Parse(String),

    #[error("Name '{0}' is not in scope")]
    #[diagnostic(code(eval::unknown_name))]
    UnknownName(String),

    #[error("Type error: {0}")]
    #[diagnostic(code(eval::type_error))]
    Type(String),

    #[error("Division by zero")]
    #[diagnostic(code(eval::divide_by_zero))]
    DivideByZero,

    #[error("Context is no longer live")]
    #[diagnostic(code(eval::stale_context))]
    StaleContext,
}

/// Configuration loading failures
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("Cannot read configuration: {0}")]
    #[diagnostic(code(config::io))]
    Io(String),

    #[error("Cannot parse configuration: {0}")]
    #[diagnostic(code(config::parse), help("The configuration file must be a JSON object."))]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(config::invalid))]
    Invalid(String),
}

/// Unified runtime error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum RuntimeError {
    #[error("Scheduler error: {0}")]
    #[diagnostic(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Debug protocol error: {0}")]
    #[diagnostic(transparent)]
    Debug(#[from] DebugProtocolError),

    #[error("Breakpoint error: {0}")]
    #[diagnostic(transparent)]
    Breakpoint(#[from] BreakpointError),

    #[error("Evaluation error: {0}")]
    #[diagnostic(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(runtime::io_error),
        help("The debugger console could not be read or written.")
    )]
    Io(String),
}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        RuntimeError::Io(err.to_string())
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
pub type DebugResult<T> = Result<T, DebugProtocolError>;
pub type EvalResult<T> = Result<T, EvaluationError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;
