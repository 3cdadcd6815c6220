/*!
 * Monitoring
 * Structured logging and session tracing
 */

mod tracer;

pub use tracer::{generate_session_id, init_tracing, CommandSpan, SessionSpan};
