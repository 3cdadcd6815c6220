/*!
 * Specrun - Main Entry Point
 *
 * Runs a small demo program across the configured virtual processors
 * under the console debugger on stdin/stdout.
 *
 * - SPECRUN_BREAK: initial breakpoint, e.g. `demo.spec:10 % 3`
 * - SPECRUN_STOP_ON_ENTRY=1: stop at the first line of main
 */

use miette::{miette, Result};
use specrun_kernel::{
    init_tracing, ContextId, DebugReader, Location, ProcessorId, Runtime, RuntimeConfig,
    ThreadHandle, Value,
};
use tracing::{info, warn};

const DEMO_FILE: &str = "demo.spec";

const DEMO_SOURCE: &str = "\
-- demo.spec
main() ==
  for i in 1..3 do
    start(worker(i));
  total := fib(6);
  print total

fib(n) ==
  if n < 2 then n
  else fib(n - 1) + fib(n - 2)

worker(id) ==
  for k in 1..4 do
    count := count + k";

const WORKERS: i64 = 3;
const WORKER_ROUNDS: i64 = 4;

fn at(line: u32) -> Location {
    Location::line(DEMO_FILE, line)
}

fn demo_main(thread: &mut ThreadHandle, processors: u32) {
    let main = thread.contexts_mut().push_root("main()", at(2), None);

    for i in 1..=WORKERS {
        if !thread.notify_point(&at(3), main) || !thread.notify_point(&at(4), main) {
            return;
        }
        let processor = ProcessorId((i as u32) % processors);
        if let Err(e) = thread.spawn_thread(&format!("worker({})", i), processor, move |t| {
            demo_worker(t, i)
        }) {
            warn!(error = %e, "Could not start worker");
        }
    }

    if !thread.notify_point(&at(5), main) {
        return;
    }
    let Some(total) = fib(thread, 6, main, at(5)) else {
        return;
    };
    let _ = thread.contexts_mut().bind(main, "total", Value::Int(total));

    if thread.notify_point(&at(6), main) {
        info!(total, "Demo finished");
    }
}

/// `None` once the thread has been told to terminate
fn fib(thread: &mut ThreadHandle, n: i64, caller: ContextId, call_site: Location) -> Option<i64> {
    let ctx = thread
        .contexts_mut()
        .push_root(format!("fib({})", n), call_site, Some(caller));
    let _ = thread.contexts_mut().bind(ctx, "n", Value::Int(n));

    let result = fib_body(thread, n, ctx);
    thread.contexts_mut().pop(ctx);
    result
}

fn fib_body(thread: &mut ThreadHandle, n: i64, ctx: ContextId) -> Option<i64> {
    if !thread.notify_point(&at(9), ctx) {
        return None;
    }
    if n < 2 {
        return Some(n);
    }
    if !thread.notify_point(&at(10), ctx) {
        return None;
    }
    let a = fib(thread, n - 1, ctx, at(10))?;
    let b = fib(thread, n - 2, ctx, at(10))?;
    Some(a + b)
}

fn demo_worker(thread: &mut ThreadHandle, id: i64) {
    let ctx = thread
        .contexts_mut()
        .push_root(format!("worker({})", id), at(4), None);
    let _ = thread.contexts_mut().bind(ctx, "id", Value::Int(id));
    let _ = thread.contexts_mut().bind(ctx, "count", Value::Int(0));

    for k in 1..=WORKER_ROUNDS {
        if !thread.notify_point(&at(13), ctx) {
            return;
        }
        let _ = thread.contexts_mut().bind(ctx, "k", Value::Int(k));
        if !thread.notify_point(&at(14), ctx) {
            return;
        }
        let count = thread
            .contexts()
            .lookup(ctx, "count")
            .and_then(Value::as_int)
            .unwrap_or(0);
        let _ = thread.contexts_mut().assign(ctx, "count", Value::Int(count + k));
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key).map_or(false, |v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn main() -> Result<()> {
    let config = RuntimeConfig::from_env()?;
    init_tracing(config.trace_json);

    info!("Specrun starting...");
    let processors = config.processors;
    let runtime = Runtime::new(config)?;
    runtime.sources().insert(DEMO_FILE, DEMO_SOURCE);

    if let Ok(spec) = std::env::var("SPECRUN_BREAK") {
        let point = runtime.set_breakpoint(&spec, DEMO_FILE)?;
        println!("Created {}", point);
    }
    if env_flag("SPECRUN_STOP_ON_ENTRY") {
        runtime.set_breakpoint("3", DEMO_FILE)?;
    }

    let main = runtime.spawn_thread("main", ProcessorId(0), move |t| demo_main(t, processors))?;
    let driver = runtime.start(main)?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut reader = DebugReader::new(runtime.clone(), stdin.lock(), stdout.lock());
    let outcome = reader.run()?;
    info!(?outcome, "Console closed");

    driver
        .join()
        .map_err(|_| miette!("Scheduler driver thread panicked"))??;

    let stats = runtime.scheduler().stats();
    info!(
        ticks = stats.ticks,
        steps = stats.steps,
        suspensions = stats.suspensions,
        now = stats.now,
        "Specrun stopped"
    );
    Ok(())
}
