/*!
 * Shared helpers: small hand-driven programs and bounded waits
 */

#![allow(dead_code)]

use specrun_kernel::{
    ContextId, Location, Runtime, RuntimeConfig, RuntimeResult, ThreadHandle, Value,
};
use std::thread::JoinHandle;
use std::time::Duration;

pub const FILE: &str = "t.spec";

/// Upper bound on any wait in these tests
pub const WAIT: Duration = Duration::from_secs(10);

pub const SOURCE: &str = "\
main() ==
  rec(depth);
  done
-- 4
-- 5
-- 6
-- 7
-- 8
rec(n) ==
  if n > 1 then
    rec(n - 1)";

pub fn at(line: u32) -> Location {
    Location::line(FILE, line)
}

pub fn runtime(processors: u32) -> Runtime {
    let config = RuntimeConfig::default().with_processors(processors);
    let runtime = Runtime::new(config).unwrap();
    runtime.sources().insert(FILE, SOURCE);
    runtime
}

/// Visits lines 1 and 2 `rounds` times, binding the round as `i`
pub fn looping(rounds: usize) -> impl FnOnce(&mut ThreadHandle) + Send + 'static {
    move |t: &mut ThreadHandle| {
        let ctx = t.contexts_mut().push_root("loop()", at(1), None);
        for i in 0..rounds {
            t.contexts_mut().bind(ctx, "i", Value::Int(i as i64)).unwrap();
            if !t.notify_point(&at(1), ctx) || !t.notify_point(&at(2), ctx) {
                return;
            }
        }
    }
}

/// Like `looping`, but line 2 holds two notify points (columns 1 and 9)
/// before line 3
pub fn two_points(rounds: usize) -> impl FnOnce(&mut ThreadHandle) + Send + 'static {
    move |t: &mut ThreadHandle| {
        let ctx = t.contexts_mut().push_root("loop()", at(1), None);
        let inner = Location::new(FILE, 2, 9);
        for i in 0..rounds {
            t.contexts_mut().bind(ctx, "i", Value::Int(i as i64)).unwrap();
            if !t.notify_point(&at(2), ctx)
                || !t.notify_point(&inner, ctx)
                || !t.notify_point(&at(3), ctx)
            {
                return;
            }
        }
    }
}

/// main() binds x = 7 at line 1, calls rec(depth) at line 2, reaches line 3
/// after the call returns
pub fn recursive(depth: i64) -> impl FnOnce(&mut ThreadHandle) + Send + 'static {
    move |t: &mut ThreadHandle| {
        let main = t.contexts_mut().push_root("main()", at(1), None);
        t.contexts_mut().bind(main, "x", Value::Int(7)).unwrap();
        let _ = t.notify_point(&at(1), main)
            && t.notify_point(&at(2), main)
            && rec(t, depth, main)
            && t.notify_point(&at(3), main);
    }
}

/// rec(n): line 10, then rec(n - 1) while n > 1, then line 11
fn rec(t: &mut ThreadHandle, n: i64, caller: ContextId) -> bool {
    let ctx = t
        .contexts_mut()
        .push_root(format!("rec({})", n), at(2), Some(caller));
    t.contexts_mut().bind(ctx, "n", Value::Int(n)).unwrap();
    let ok = t.notify_point(&at(10), ctx)
        && (n <= 1 || rec(t, n - 1, ctx))
        && t.notify_point(&at(11), ctx);
    t.contexts_mut().pop(ctx);
    ok
}

/// Block until every live thread is stopped, failing the test after WAIT
pub fn wait_stop(runtime: &Runtime) {
    assert!(
        runtime.link().wait_for_stop_timeout(WAIT),
        "threads did not stop within {:?}",
        WAIT
    );
}

/// True when the last quorum was reached because nothing is left running
pub fn finished(runtime: &Runtime) -> bool {
    runtime.link().threads().is_empty()
}

/// Resume until the program ends, returning how many stops were seen
pub fn run_to_end(runtime: &Runtime) -> usize {
    let mut stops = 0;
    loop {
        wait_stop(runtime);
        if finished(runtime) {
            return stops;
        }
        stops += 1;
        runtime.link().resume_all().unwrap();
    }
}

pub fn join(driver: JoinHandle<RuntimeResult<()>>) {
    driver.join().unwrap().unwrap();
}
