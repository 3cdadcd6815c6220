/*!
 * Breakpoints
 * User breakpoints and tracepoints, and the text syntax used to set them
 */

pub mod parse;
mod table;
mod types;

pub use parse::{parse_break, parse_trace, BreakSpec, TraceSpec};
pub use table::BreakpointTable;
pub use types::{Breakpoint, BreakpointInfo, BreakpointKind, HitCondition};
