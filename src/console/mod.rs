/*!
 * Console
 * Text transport for the debugger: prompt command parsing and the
 * session loop that drives the debug link
 */

mod command;
mod reader;

pub use command::{ConsoleCommand, BAD_COMMAND, HELP};
pub use reader::{DebugReader, SessionOutcome};
