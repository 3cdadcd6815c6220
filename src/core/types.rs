/*!
 * Core Types
 * Identifiers and source locations shared across the runtime
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Simulated time, in scheduler ticks
pub type VirtualTime = u64;

/// Logical thread identifier (unique, monotonic, never recycled)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub u64);

/// Virtual processor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessorId(pub u32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CPU{}", self.0)
    }
}

/// A program point: file, line and column
///
/// Two locations on the same line are distinct points but the same
/// "step" as far as line-granular stepping is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: Arc<str>,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Location at column 1 of a line
    pub fn line(file: impl Into<Arc<str>>, line: u32) -> Self {
        Self::new(file, line, 1)
    }

    /// True when both locations sit on the same source line of the same file
    #[inline]
    pub fn same_line(&self, other: &Location) -> bool {
        self.line == other.line && self.file == other.file
    }

    /// The (file, line) pair used to index breakpoints
    #[inline]
    pub fn line_key(&self) -> LineKey {
        LineKey {
            file: Arc::clone(&self.file),
            line: self.line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Line-granular key for breakpoint lookup
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub file: Arc<str>,
    pub line: u32,
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
