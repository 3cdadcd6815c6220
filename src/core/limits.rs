/*!
 * Runtime Limits and Constants
 *
 * Centralized location for defaults, thresholds, and magic numbers,
 * grouped by the subsystem that uses them.
 */

use std::time::Duration;

// =============================================================================
// SCHEDULER
// =============================================================================

/// Virtual processors created when nothing is configured
pub const DEFAULT_PROCESSORS: u32 = 1;

/// Upper bound on configured processors
pub const MAX_PROCESSORS: u32 = 64;

/// How long terminate_all waits for the population to drain
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_millis(2_000);

/// A single cooperative step running longer than this is reported
pub const DEFAULT_STEP_WARN_AFTER: Duration = Duration::from_millis(1_000);

/// Virtual time charged to a processor for one cooperative step
pub const STEP_COST: u64 = 1;

// =============================================================================
// BREAKPOINTS
// =============================================================================

/// Number carried by ephemeral stepping points
pub const STOPPOINT_NUMBER: u32 = 0;

/// First user-visible breakpoint number
pub const FIRST_BREAKPOINT_NUMBER: u32 = 1;

// =============================================================================
// DEBUGGER
// =============================================================================

/// Capacity of each direction of a rendezvous mailbox
pub const MAILBOX_CAPACITY: usize = 1;

/// Lines shown either side of the current line by SOURCE
pub const DEFAULT_SOURCE_CONTEXT: usize = 5;

/// Upper bound on configured SOURCE context lines
pub const MAX_SOURCE_CONTEXT: usize = 1_000;

/// File assumed by `break <line>` when no stop location is known
pub const DEFAULT_SOURCE_FILE: &str = "main.spec";
