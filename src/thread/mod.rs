/*!
 * Logical Threads
 * Per-thread state and the statement-boundary hook
 */

mod handle;
mod mailbox;
mod step;

pub use handle::ThreadHandle;
pub use mailbox::Mailbox;
pub use step::StepState;
