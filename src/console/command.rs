/*!
 * Console Commands
 * Text forms accepted at the debugger prompt
 */

use crate::core::types::ThreadId;
use crate::debug::DebugCommand;

pub const BAD_COMMAND: &str = "Bad command. Try 'help'";

pub const HELP: &str = "\
step | s                      run to the next line
next | n                      run to the next line, stepping over calls
out | o                       run until the current call returns
continue | c                  resume all threads
stack                         show the selected thread's frames
up / down                     select the caller / callee frame
source                        list source around the selected frame
print | p <expr>              evaluate an expression in the selected frame
threads                       list stopped threads
thread <id>                   select a stopped thread
break [<file>:]<line> [=|>|>=|% <n>] [<condition>]
                              set a breakpoint
trace [<file>:]<line> [<expr>]
                              set a tracepoint
remove <id>                   delete a breakpoint or tracepoint
list                          list breakpoints and tracepoints
quit | q                      terminate the program and leave
stop                          terminate the program
help | ?                      show this text";

/// One line typed at the debugger prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Step,
    Next,
    Out,
    Continue,
    Stack,
    Up,
    Down,
    Source,
    Print(String),
    Threads,
    Thread(ThreadId),
    Break(String),
    Trace(String),
    Remove(u32),
    List,
    Quit,
    Stop,
    Help,
}

impl ConsoleCommand {
    /// Parse a prompt line. `None` for anything that is not a command,
    /// including a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match (word, rest.is_empty()) {
            ("step" | "s", true) => ConsoleCommand::Step,
            ("next" | "n", true) => ConsoleCommand::Next,
            ("out" | "o", true) => ConsoleCommand::Out,
            ("continue" | "c", true) => ConsoleCommand::Continue,
            ("stack", true) => ConsoleCommand::Stack,
            ("up", true) => ConsoleCommand::Up,
            ("down", true) => ConsoleCommand::Down,
            ("source", true) => ConsoleCommand::Source,
            ("print" | "p", false) => ConsoleCommand::Print(rest.to_string()),
            ("threads", true) => ConsoleCommand::Threads,
            ("thread", false) => ConsoleCommand::Thread(ThreadId(rest.parse().ok()?)),
            ("break", false) => ConsoleCommand::Break(rest.to_string()),
            ("trace", false) => ConsoleCommand::Trace(rest.to_string()),
            ("remove", false) => ConsoleCommand::Remove(rest.parse().ok()?),
            ("list", true) => ConsoleCommand::List,
            ("quit" | "q", true) => ConsoleCommand::Quit,
            ("stop", true) => ConsoleCommand::Stop,
            ("help" | "?", true) => ConsoleCommand::Help,
            _ => return None,
        };
        Some(command)
    }

    /// The mailbox command for per-thread commands; `None` for those the
    /// console answers itself
    pub fn to_debug(&self) -> Option<DebugCommand> {
        let command = match self {
            ConsoleCommand::Step => DebugCommand::Step,
            ConsoleCommand::Next => DebugCommand::Next,
            ConsoleCommand::Out => DebugCommand::Out,
            ConsoleCommand::Continue => DebugCommand::Continue,
            ConsoleCommand::Stack => DebugCommand::Stack,
            ConsoleCommand::Up => DebugCommand::Up,
            ConsoleCommand::Down => DebugCommand::Down,
            ConsoleCommand::Source => DebugCommand::Source,
            ConsoleCommand::Print(expr) => DebugCommand::Print(expr.clone()),
            ConsoleCommand::Threads
            | ConsoleCommand::Thread(_)
            | ConsoleCommand::Break(_)
            | ConsoleCommand::Trace(_)
            | ConsoleCommand::Remove(_)
            | ConsoleCommand::List
            | ConsoleCommand::Quit
            | ConsoleCommand::Stop
            | ConsoleCommand::Help => return None,
        };
        Some(command)
    }
}
