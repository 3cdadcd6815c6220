/*!
 * Runtime
 * One explicit bundle of scheduler, debug link, breakpoint table, evaluator
 * and source cache. Several runtimes can coexist in one process.
 */

use crate::breakpoints::{parse, Breakpoint, BreakpointTable};
use crate::core::config::RuntimeConfig;
use crate::core::errors::{RuntimeResult, SchedulerError};
use crate::core::types::{ProcessorId, ThreadId};
use crate::debug::{DebugLink, SourceCache};
use crate::eval::{ExpressionEvaluator, SimpleEvaluator};
use crate::scheduler::Scheduler;
use crate::thread::ThreadHandle;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, info};

/// State every logical thread and the console share
pub(crate) struct Shared {
    pub(crate) config: RuntimeConfig,
    pub(crate) scheduler: Scheduler,
    pub(crate) link: DebugLink,
    pub(crate) breakpoints: BreakpointTable,
    pub(crate) evaluator: Arc<dyn ExpressionEvaluator>,
    pub(crate) sources: SourceCache,
}

/// Cheap to clone; clones drive the same threads
#[derive(Clone)]
pub struct Runtime {
    shared: Arc<Shared>,
}

impl Runtime {
    /// Build a runtime with processors `0..config.processors` and the
    /// built-in expression evaluator
    pub fn new(config: RuntimeConfig) -> RuntimeResult<Self> {
        Self::with_evaluator(config, Arc::new(SimpleEvaluator::new()))
    }

    pub fn with_evaluator(
        config: RuntimeConfig,
        evaluator: Arc<dyn ExpressionEvaluator>,
    ) -> RuntimeResult<Self> {
        config.validate()?;
        let scheduler = Scheduler::with_processors(&config);
        let link = DebugLink::new(scheduler.clone());
        info!(processors = config.processors, "Runtime created");

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                scheduler,
                link,
                breakpoints: BreakpointTable::new(),
                evaluator,
                sources: SourceCache::new(),
            }),
        })
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.shared.scheduler
    }

    pub fn link(&self) -> &DebugLink {
        &self.shared.link
    }

    pub fn breakpoints(&self) -> &BreakpointTable {
        &self.shared.breakpoints
    }

    pub fn evaluator(&self) -> &dyn ExpressionEvaluator {
        self.shared.evaluator.as_ref()
    }

    pub fn sources(&self) -> &SourceCache {
        &self.shared.sources
    }

    /// Register a logical thread on `processor` and start the native thread
    /// backing it. `body` first runs when the scheduler hands the thread its
    /// first turn.
    pub fn spawn_thread<F>(
        &self,
        name: &str,
        processor: ProcessorId,
        body: F,
    ) -> RuntimeResult<ThreadId>
    where
        F: FnOnce(&mut ThreadHandle) + Send + 'static,
    {
        let id = self.shared.scheduler.register(name, processor)?;
        let mut handle = ThreadHandle::new(id, name, processor, Arc::clone(&self.shared));

        // On failure the closure, and the handle inside it, is dropped,
        // which unregisters the thread
        std::thread::Builder::new()
            .name(format!("specrun-{}", id))
            .spawn(move || {
                if handle.start() {
                    body(&mut handle);
                }
            })
            .map_err(|e| {
                error!(thread = %id, name, error = %e, "Native thread spawn failed");
                SchedulerError::SpawnFailed {
                    name: name.to_string(),
                    reason: e.to_string(),
                }
            })?;
        Ok(id)
    }

    /// `break [<file>:]<line> [=|>|>=|% <n>] [<condition>]`
    pub fn set_breakpoint(&self, spec: &str, default_file: &str) -> RuntimeResult<Arc<Breakpoint>> {
        let spec = parse::parse_break(spec, default_file)?;
        let point = self.shared.breakpoints.add_breakpoint(
            spec.location,
            spec.condition,
            spec.hit,
            self.evaluator(),
        )?;
        Ok(point)
    }

    /// `trace [<file>:]<line> [<display-expr>]`
    pub fn set_tracepoint(&self, spec: &str, default_file: &str) -> RuntimeResult<Arc<Breakpoint>> {
        let spec = parse::parse_trace(spec, default_file)?;
        let point =
            self.shared
                .breakpoints
                .add_tracepoint(spec.location, spec.display, self.evaluator())?;
        Ok(point)
    }

    /// Drive the scheduler on the calling thread until `main` exits, then
    /// terminate whatever is left
    pub fn run(&self, main: ThreadId) -> RuntimeResult<()> {
        let driven = self.shared.scheduler.run(main);
        let terminated = self.terminate_all();
        driven?;
        terminated
    }

    /// [`run`](Self::run) on a dedicated driver thread, leaving the caller
    /// free to act as the debugger console
    pub fn start(&self, main: ThreadId) -> RuntimeResult<JoinHandle<RuntimeResult<()>>> {
        let runtime = self.clone();
        std::thread::Builder::new()
            .name("specrun-driver".to_string())
            .spawn(move || runtime.run(main))
            .map_err(|e| {
                SchedulerError::SpawnFailed {
                    name: "specrun-driver".to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
    }

    /// Terminate stopped threads through the debug link, then every other
    /// thread through the scheduler, waiting a bounded time for them to go
    pub fn terminate_all(&self) -> RuntimeResult<()> {
        let killed = self.shared.link.kill_all();
        self.shared.scheduler.terminate_all()?;
        killed?;
        Ok(())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.shared.config)
            .field("threads", &self.shared.scheduler.thread_count())
            .field("breakpoints", &self.shared.breakpoints.len())
            .finish()
    }
}
