/*!
 * Structured Tracing
 * Subscriber setup plus spans for debugger sessions and console commands
 *
 * Features:
 * - Session IDs for correlating everything one console did
 * - JSON-formatted logs for structured parsing
 * - Slow command warnings with the elapsed time attached
 */

use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Console commands slower than this are logged at warn level
const SLOW_COMMAND_MS: u128 = 250;

/// Initialize structured tracing
///
/// - RUST_LOG: log level (default: info)
/// - `json`: JSON output instead of the compact human format
///
/// Safe to call more than once; later calls leave the first subscriber
/// in place.
pub fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json, "Structured tracing initialized");
    }
}

/// Generate a unique ID for a debugger session
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one console session, from first prompt to disconnect
pub struct SessionSpan {
    span: tracing::Span,
    start: Instant,
    session_id: String,
    commands: u64,
    failures: u64,
    stops: u64,
    resumes: u64,
}

impl SessionSpan {
    pub fn new() -> Self {
        let session_id = generate_session_id();
        let span = span!(
            Level::INFO,
            "debug_session",
            session_id = %session_id,
            commands = tracing::field::Empty,
            failures = tracing::field::Empty,
            stops = tracing::field::Empty,
            resumes = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );
        span.in_scope(|| info!(session_id = %session_id, "Debug session started"));

        Self {
            span,
            start: Instant::now(),
            session_id,
            commands: 0,
            failures: 0,
            stops: 0,
            resumes: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn commands(&self) -> u64 {
        self.commands
    }

    /// Commands that answered with an error
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// A command answered with an error
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// The console reached a quorum of stopped threads
    pub fn record_stop(&mut self) {
        self.stops += 1;
    }

    /// The console released the stopped set
    pub fn record_resume(&mut self) {
        self.resumes += 1;
    }

    pub fn stops(&self) -> u64 {
        self.stops
    }

    pub fn resumes(&self) -> u64 {
        self.resumes
    }

    /// Open a span for one console command
    pub fn command(&mut self, line: &str) -> CommandSpan {
        self.commands += 1;
        CommandSpan::new(&self.span, &self.session_id, line)
    }

    /// How the session ended: "quit", "stop", "disconnect", "finished"
    pub fn record_outcome(&self, outcome: &str) {
        self.span.record("outcome", outcome);
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Default for SessionSpan {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SessionSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("commands", self.commands);
        self.span.record("failures", self.failures);
        self.span.record("stops", self.stops);
        self.span.record("resumes", self.resumes);
        self.span.record("duration_ms", duration.as_millis() as u64);
        let _entered = self.span.enter();
        info!(
            session_id = %self.session_id,
            commands = self.commands,
            failures = self.failures,
            stops = self.stops,
            resumes = self.resumes,
            duration_ms = duration.as_millis() as u64,
            "Debug session ended"
        );
    }
}

/// Span for one console command
pub struct CommandSpan {
    span: tracing::Span,
    start: Instant,
    session_id: String,
    line: String,
}

impl CommandSpan {
    fn new(parent: &tracing::Span, session_id: &str, line: &str) -> Self {
        let span = span!(
            parent: parent,
            Level::DEBUG,
            "console_command",
            command = line,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            session_id: session_id.to_string(),
            line: line.to_string(),
        }
    }

    pub fn record_result(&self, success: bool) {
        self.span.record("result", if success { "success" } else { "error" });
    }

    pub fn record_error(&self, error: &str) {
        self.span.record("error", error);
        self.span.record("result", "error");
    }
}

impl Drop for CommandSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        if duration.as_millis() > SLOW_COMMAND_MS {
            warn!(
                session_id = %self.session_id,
                command = %self.line,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "Slow console command"
            );
        } else {
            debug!(
                command = %self.line,
                duration_us = duration.as_micros() as u64,
                "Console command completed"
            );
        }
    }
}
