/*!
 * Debug Reader
 * Line-oriented debugger console over any BufRead/Write pair
 *
 * Each round waits for every live thread to stop, shows where the selected
 * thread is, then serves prompt commands until one of them resumes the
 * program. A RESUME reply from any thread releases the whole stopped set.
 */

use super::command::{ConsoleCommand, BAD_COMMAND, HELP};
use crate::core::errors::RuntimeResult;
use crate::core::limits::DEFAULT_SOURCE_FILE;
use crate::core::types::ThreadId;
use crate::debug::{DebugCommand, StopReason, StoppedThread};
use crate::monitoring::SessionSpan;
use crate::runtime::Runtime;
use std::io::{BufRead, Write};
use tracing::{error, info, warn};

/// How a console session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every thread ran to completion
    Finished,
    /// `quit`
    Quit,
    /// `stop`
    Stopped,
    /// Input closed or the wait was interrupted
    Disconnected,
}

impl SessionOutcome {
    fn as_str(self) -> &'static str {
        match self {
            SessionOutcome::Finished => "finished",
            SessionOutcome::Quit => "quit",
            SessionOutcome::Stopped => "stop",
            SessionOutcome::Disconnected => "disconnect",
        }
    }
}

/// What the prompt loop decided
enum Next {
    Prompt,
    Resume,
    End(SessionOutcome),
}

pub struct DebugReader<R, W> {
    runtime: Runtime,
    input: R,
    output: W,
    selected: Option<ThreadId>,
    session: SessionSpan,
    /// Error printed by the command being served
    failure: Option<String>,
}

impl<R: BufRead, W: Write> DebugReader<R, W> {
    pub fn new(runtime: Runtime, input: R, output: W) -> Self {
        Self {
            runtime,
            input,
            output,
            selected: None,
            session: SessionSpan::new(),
            failure: None,
        }
    }

    /// Thread commands currently go to
    pub fn selected(&self) -> Option<ThreadId> {
        self.selected
    }

    /// Commands in this session that answered with an error
    pub fn failed_commands(&self) -> u64 {
        self.session.failures()
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Serve the session until the program finishes or the user leaves.
    /// Every way out other than completion terminates the program.
    pub fn run(&mut self) -> RuntimeResult<SessionOutcome> {
        let outcome = self.serve();
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(session_id = %self.session.session_id(), error = %e, "Debug session failed");
                let _ = self.runtime.link().kill_all();
                return Err(e);
            }
        };
        self.session.record_outcome(outcome.as_str());
        info!(session_id = %self.session.session_id(), outcome = outcome.as_str(), "Debug session over");
        Ok(outcome)
    }

    fn serve(&mut self) -> RuntimeResult<SessionOutcome> {
        loop {
            if !self.runtime.link().wait_for_stop() {
                self.runtime.link().kill_all()?;
                return Ok(SessionOutcome::Disconnected);
            }
            self.show_reports()?;

            let stopped = self.runtime.link().threads();
            if self.runtime.scheduler().thread_count() == 0 || stopped.is_empty() {
                writeln!(self.output, "Program finished")?;
                self.output.flush()?;
                return Ok(SessionOutcome::Finished);
            }
            self.session.record_stop();
            self.select(&stopped);
            self.show_stop(&stopped)?;

            loop {
                match self.prompt()? {
                    Next::Prompt => continue,
                    Next::Resume => {
                        self.runtime.link().resume_all()?;
                        self.session.record_resume();
                        break;
                    }
                    Next::End(outcome) => {
                        self.runtime.link().kill_all()?;
                        return Ok(outcome);
                    }
                }
            }
        }
    }

    /// Keep the current selection if it is still stopped, otherwise prefer
    /// a thread that stopped on its own over one that was paused
    fn select(&mut self, stopped: &[StoppedThread]) {
        if let Some(current) = self.selected {
            if stopped.iter().any(|t| t.id == current) {
                return;
            }
        }
        self.selected = stopped
            .iter()
            .find(|t| t.reason != StopReason::Paused)
            .or_else(|| stopped.first())
            .map(|t| t.id);
    }

    fn show_stop(&mut self, stopped: &[StoppedThread]) -> RuntimeResult<()> {
        let Some(thread) = stopped.iter().find(|t| Some(t.id) == self.selected) else {
            return Ok(());
        };
        match thread.reason {
            StopReason::Breakpoint(n) => writeln!(
                self.output,
                "Thread {} ({}) stopped at [{}] {}",
                thread.id, thread.name, n, thread.location
            )?,
            StopReason::Step => writeln!(
                self.output,
                "Thread {} ({}) stopped at {}",
                thread.id, thread.name, thread.location
            )?,
            StopReason::Paused => writeln!(
                self.output,
                "Thread {} ({}) paused at {}",
                thread.id, thread.name, thread.location
            )?,
        }
        if let Ok(line) = self.runtime.sources().listing(&thread.location, 0) {
            writeln!(self.output, "{}", line)?;
        }
        Ok(())
    }

    fn show_reports(&mut self) -> RuntimeResult<()> {
        for report in self.runtime.link().take_reports() {
            writeln!(self.output, "Warning: {}", report)?;
        }
        Ok(())
    }

    /// Read and act on one prompt line
    fn prompt(&mut self) -> RuntimeResult<Next> {
        match self.selected {
            Some(id) => write!(self.output, "[{}]> ", id)?,
            None => write!(self.output, "> ")?,
        }
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            warn!(session_id = %self.session.session_id(), "Console input closed");
            return Ok(Next::End(SessionOutcome::Disconnected));
        }
        if line.trim().is_empty() {
            return Ok(Next::Prompt);
        }

        let span = self.session.command(line.trim());
        let next = match ConsoleCommand::parse(&line) {
            None => {
                self.fail(BAD_COMMAND)?;
                Next::Prompt
            }
            Some(command) => match command.to_debug() {
                Some(debug) => self.send(debug)?,
                None => self.console(command)?,
            },
        };
        match self.failure.take() {
            Some(message) => {
                span.record_error(&message);
                self.session.record_failure();
            }
            None => span.record_result(true),
        }
        self.show_reports()?;
        Ok(next)
    }

    /// Print an error answer and remember it for the command span
    fn fail(&mut self, message: impl std::fmt::Display) -> RuntimeResult<()> {
        let message = message.to_string();
        writeln!(self.output, "Error: {}", message)?;
        self.failure = Some(message);
        Ok(())
    }

    fn send(&mut self, command: DebugCommand) -> RuntimeResult<Next> {
        let Some(thread) = self.selected else {
            self.fail("No thread selected")?;
            return Ok(Next::Prompt);
        };
        match self.runtime.link().send(thread, command)? {
            DebugCommand::Resume => return Ok(Next::Resume),
            DebugCommand::Result(text) => writeln!(self.output, "{}", text)?,
            DebugCommand::Error(message) => self.fail(message)?,
            DebugCommand::Ack => {}
            other => self.fail(format!("Unexpected reply {}", other))?,
        }
        Ok(Next::Prompt)
    }

    fn console(&mut self, command: ConsoleCommand) -> RuntimeResult<Next> {
        match command {
            ConsoleCommand::Threads => {
                for thread in self.runtime.link().threads() {
                    let marker = if Some(thread.id) == self.selected { "*" } else { " " };
                    writeln!(self.output, "{} {}", marker, thread)?;
                }
            }
            ConsoleCommand::Thread(id) => {
                if self.runtime.link().is_stopped(id) {
                    self.selected = Some(id);
                    writeln!(self.output, "Thread {} selected", id)?;
                } else {
                    self.fail(format!("Thread {} is not stopped", id))?;
                }
            }
            ConsoleCommand::Break(spec) => {
                let file = self.default_file();
                match self.runtime.set_breakpoint(&spec, &file) {
                    Ok(point) => writeln!(self.output, "Created {}", point)?,
                    Err(e) => self.fail(e)?,
                }
            }
            ConsoleCommand::Trace(spec) => {
                let file = self.default_file();
                match self.runtime.set_tracepoint(&spec, &file) {
                    Ok(point) => writeln!(self.output, "Created {}", point)?,
                    Err(e) => self.fail(e)?,
                }
            }
            ConsoleCommand::Remove(number) => match self.runtime.breakpoints().remove(number) {
                Ok(point) => writeln!(self.output, "Cleared [{}]", point.number())?,
                Err(e) => self.fail(e)?,
            },
            ConsoleCommand::List => {
                let points = self.runtime.breakpoints().list();
                if points.is_empty() {
                    writeln!(self.output, "No breakpoints or tracepoints")?;
                }
                for point in points {
                    writeln!(self.output, "{}", point)?;
                }
            }
            ConsoleCommand::Help => writeln!(self.output, "{}", HELP)?,
            ConsoleCommand::Quit => return Ok(Next::End(SessionOutcome::Quit)),
            ConsoleCommand::Stop => return Ok(Next::End(SessionOutcome::Stopped)),
            ConsoleCommand::Step
            | ConsoleCommand::Next
            | ConsoleCommand::Out
            | ConsoleCommand::Continue
            | ConsoleCommand::Stack
            | ConsoleCommand::Up
            | ConsoleCommand::Down
            | ConsoleCommand::Source
            | ConsoleCommand::Print(_) => self.fail(BAD_COMMAND)?,
        }
        Ok(Next::Prompt)
    }

    /// File assumed by `break <line>`: the selected thread's current file
    fn default_file(&self) -> String {
        self.selected
            .and_then(|id| {
                self.runtime
                    .link()
                    .threads()
                    .into_iter()
                    .find(|t| t.id == id)
                    .map(|t| t.location.file.to_string())
            })
            .unwrap_or_else(|| DEFAULT_SOURCE_FILE.to_string())
    }
}
