/*!
 * Stepping Tests
 * step, next and out over a recursive call
 */

use crate::support::{at, join, recursive, run_to_end, runtime, wait_stop};
use pretty_assertions::assert_eq;
use specrun_kernel::{DebugCommand, ProcessorId, Runtime, StopReason, ThreadId};

/// Send a stepping command to `thread` and release the stopped set
fn step_with(runtime: &Runtime, thread: ThreadId, command: DebugCommand) {
    assert_eq!(
        runtime.link().send(thread, command).unwrap(),
        DebugCommand::Resume
    );
    runtime.link().resume_all().unwrap();
}

fn only_stop(runtime: &Runtime) -> specrun_kernel::StoppedThread {
    let mut stopped = runtime.link().threads();
    assert_eq!(stopped.len(), 1);
    stopped.remove(0)
}

#[test]
fn test_next_steps_over_deep_recursion() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2", "t.spec").unwrap();
    let main = runtime.spawn_thread("main", ProcessorId(0), recursive(5)).unwrap();
    let driver = runtime.start(main).unwrap();

    wait_stop(&runtime);
    assert_eq!(only_stop(&runtime).location, at(2));
    step_with(&runtime, main, DebugCommand::Next);

    wait_stop(&runtime);
    let stop = only_stop(&runtime);
    assert_eq!(stop.location, at(3));
    assert_eq!(stop.reason, StopReason::Step);
    assert_eq!(stop.breakpoint, Some(0));

    step_with(&runtime, main, DebugCommand::Continue);
    assert_eq!(run_to_end(&runtime), 0);
    join(driver);
}

#[test]
fn test_step_enters_the_call() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2", "t.spec").unwrap();
    let main = runtime.spawn_thread("main", ProcessorId(0), recursive(3)).unwrap();
    let driver = runtime.start(main).unwrap();

    wait_stop(&runtime);
    step_with(&runtime, main, DebugCommand::Step);
    wait_stop(&runtime);
    assert_eq!(only_stop(&runtime).location, at(10));

    match runtime.link().send(main, DebugCommand::Print("n".to_string())).unwrap() {
        DebugCommand::Result(text) => assert_eq!(text, "n = 3"),
        other => panic!("unexpected reply {}", other),
    }

    // Line 10 again, one call deeper, is the same line and does not stop
    step_with(&runtime, main, DebugCommand::Step);
    wait_stop(&runtime);
    let stop = only_stop(&runtime);
    assert_eq!(stop.location, at(11));
    match runtime.link().send(main, DebugCommand::Print("n".to_string())).unwrap() {
        DebugCommand::Result(text) => assert_eq!(text, "n = 1"),
        other => panic!("unexpected reply {}", other),
    }

    step_with(&runtime, main, DebugCommand::Continue);
    assert_eq!(run_to_end(&runtime), 0);
    join(driver);
}

#[test]
fn test_out_stops_once_in_the_caller() {
    let runtime = runtime(1);
    runtime.set_breakpoint("10 = 1", "t.spec").unwrap();
    let main = runtime.spawn_thread("main", ProcessorId(0), recursive(5)).unwrap();
    let driver = runtime.start(main).unwrap();

    wait_stop(&runtime);
    let stop = only_stop(&runtime);
    assert_eq!(stop.location, at(10));
    assert_eq!(stop.reason, StopReason::Breakpoint(1));

    match runtime.link().send(main, DebugCommand::Stack).unwrap() {
        DebugCommand::Result(text) => {
            assert!(text.contains("=> 1: rec(5) at t.spec:10:1"));
            assert!(text.contains("   0: main() at t.spec:2:1"));
        }
        other => panic!("unexpected reply {}", other),
    }
    step_with(&runtime, main, DebugCommand::Out);

    wait_stop(&runtime);
    let stop = only_stop(&runtime);
    assert_eq!(stop.location, at(3));
    assert_eq!(stop.reason, StopReason::Step);

    step_with(&runtime, main, DebugCommand::Continue);
    assert_eq!(run_to_end(&runtime), 0);
    join(driver);
}

#[test]
fn test_up_down_select_frames() {
    let runtime = runtime(1);
    runtime.set_breakpoint("10 = 2", "t.spec").unwrap();
    let main = runtime.spawn_thread("main", ProcessorId(0), recursive(3)).unwrap();
    let driver = runtime.start(main).unwrap();
    wait_stop(&runtime);

    let send = |command| runtime.link().send(main, command).unwrap();
    assert_eq!(
        send(DebugCommand::Down),
        DebugCommand::Error("Already at innermost frame".to_string())
    );
    assert_eq!(
        send(DebugCommand::Up),
        DebugCommand::Result("=> 1: rec(3) at t.spec:2:1".to_string())
    );
    assert_eq!(
        send(DebugCommand::Print("n".to_string())),
        DebugCommand::Result("n = 3".to_string())
    );
    assert_eq!(
        send(DebugCommand::Up),
        DebugCommand::Result("=> 0: main() at t.spec:2:1".to_string())
    );
    assert_eq!(
        send(DebugCommand::Up),
        DebugCommand::Error("Already at outermost frame".to_string())
    );
    match send(DebugCommand::Source) {
        DebugCommand::Result(text) => assert!(text.contains(">>   rec(depth);")),
        other => panic!("unexpected reply {}", other),
    }

    runtime.link().kill_all().unwrap();
    join(driver);
}

#[test]
fn test_next_inside_a_pending_next_replaces_it() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2", "t.spec").unwrap();
    runtime.set_breakpoint("10 = 2", "t.spec").unwrap();
    let main = runtime.spawn_thread("main", ProcessorId(0), recursive(3)).unwrap();
    let driver = runtime.start(main).unwrap();

    wait_stop(&runtime);
    assert_eq!(only_stop(&runtime).location, at(2));
    step_with(&runtime, main, DebugCommand::Next);

    // The breakpoint inside the call wins over the pending next
    wait_stop(&runtime);
    let stop = only_stop(&runtime);
    assert_eq!(stop.location, at(10));
    assert_eq!(stop.reason, StopReason::Breakpoint(2));
    step_with(&runtime, main, DebugCommand::Next);

    // The new next is scoped to rec(2), not to main
    wait_stop(&runtime);
    let stop = only_stop(&runtime);
    assert_eq!(stop.location, at(11));
    assert_eq!(stop.reason, StopReason::Step);
    assert_eq!(
        runtime.link().send(main, DebugCommand::Print("n".to_string())).unwrap(),
        DebugCommand::Result("n = 2".to_string())
    );

    // Nothing of the first next survives: main's line 3 passes unnoticed
    step_with(&runtime, main, DebugCommand::Continue);
    assert_eq!(run_to_end(&runtime), 0);
    join(driver);
}
