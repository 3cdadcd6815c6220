/*!
 * Console Tests
 * Scripted sessions through DebugReader
 */

use crate::support::{join, looping, recursive, runtime};
use pretty_assertions::assert_eq;
use specrun_kernel::{DebugReader, ProcessorId, SessionOutcome};
use std::io::Cursor;

fn session(runtime: &specrun_kernel::Runtime, script: &str) -> (SessionOutcome, String) {
    let mut reader = DebugReader::new(runtime.clone(), Cursor::new(script.to_string()), Vec::new());
    let outcome = reader.run().unwrap();
    let output = String::from_utf8(reader.into_output()).unwrap();
    (outcome, output)
}

#[test]
fn test_scripted_session() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2", "t.spec").unwrap();
    let main = runtime.spawn_thread("main", ProcessorId(0), recursive(2)).unwrap();
    let driver = runtime.start(main).unwrap();

    let (outcome, output) = session(
        &runtime,
        "threads\nprint x\nbogus\n\nnext\nprint 1 + 1\nlist\ncontinue\n",
    );
    assert_eq!(outcome, SessionOutcome::Finished);
    join(driver);

    for expected in [
        "Thread 1 (main) stopped at [1] t.spec:2:1",
        "2: >>   rec(depth);",
        "* 1: main on CPU0 stopped at t.spec:2:1 (breakpoint [1])",
        "x = 7",
        "Error: Bad command. Try 'help'",
        "Thread 1 (main) stopped at t.spec:3:1",
        "1 + 1 = 2",
        "[1] break at t.spec:2:1",
        "Program finished",
    ] {
        assert!(output.contains(expected), "missing {:?} in:\n{}", expected, output);
    }
}

#[test]
fn test_breakpoints_from_the_prompt() {
    let runtime = runtime(1);
    runtime.set_breakpoint("1", "t.spec").unwrap();
    let main = runtime.spawn_thread("main", ProcessorId(0), looping(3)).unwrap();
    let driver = runtime.start(main).unwrap();

    let (outcome, output) = session(
        &runtime,
        "remove 1\nbreak 2 i = 2\ntrace 1\nbreak 0\nremove 9\ncontinue\nprint i\nc\n",
    );
    assert_eq!(outcome, SessionOutcome::Finished);
    join(driver);

    for expected in [
        "Cleared [1]",
        "Created [2] break at t.spec:2:1",
        "Created [3] trace at t.spec:1:1",
        "Error: Breakpoint error: Bad breakpoint: lines are numbered from 1",
        "Error: Breakpoint [9] not set",
        "stopped at [2] t.spec:2:1",
        "i = 2",
        "Program finished",
    ] {
        assert!(output.contains(expected), "missing {:?} in:\n{}", expected, output);
    }
}

#[test]
fn test_quit_terminates_program() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2", "t.spec").unwrap();
    let main = runtime.spawn_thread("main", ProcessorId(0), looping(1_000)).unwrap();
    let driver = runtime.start(main).unwrap();

    let (outcome, _) = session(&runtime, "help\nquit\n");
    assert_eq!(outcome, SessionOutcome::Quit);
    assert_eq!(runtime.scheduler().thread_count(), 0);
    join(driver);
}

#[test]
fn test_end_of_input_kills_all() {
    let runtime = runtime(2);
    runtime.set_breakpoint("2", "t.spec").unwrap();
    let main = runtime.spawn_thread("a", ProcessorId(0), looping(1_000)).unwrap();
    runtime.spawn_thread("b", ProcessorId(1), looping(1_000)).unwrap();
    let driver = runtime.start(main).unwrap();

    let (outcome, output) = session(&runtime, "stack\n");
    assert_eq!(outcome, SessionOutcome::Disconnected);
    assert!(output.contains("stopped at"));
    assert_eq!(runtime.scheduler().thread_count(), 0);
    join(driver);
}

#[test]
fn test_thread_selection() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2 = 1", "t.spec").unwrap();
    let main = runtime.spawn_thread("a", ProcessorId(0), looping(20)).unwrap();
    runtime.spawn_thread("b", ProcessorId(0), looping(20)).unwrap();
    let driver = runtime.start(main).unwrap();

    let (outcome, output) = session(&runtime, "thread 2\nthread 7\nstack\nstop\n");
    assert_eq!(outcome, SessionOutcome::Stopped);
    join(driver);

    assert!(output.contains("Thread 2 selected"));
    assert!(output.contains("Error: Thread 7 is not stopped"));
    assert!(output.contains("[2]> "));
    assert!(output.contains("Thread 2 stopped at"));
}

#[test]
fn test_condition_failure_reported_before_stop() {
    let runtime = runtime(1);
    runtime.set_breakpoint("1 nope > 0", "t.spec").unwrap();
    runtime.set_breakpoint("2 = 1", "t.spec").unwrap();
    let main = runtime.spawn_thread("main", ProcessorId(0), looping(2)).unwrap();
    let driver = runtime.start(main).unwrap();

    let (outcome, output) = session(&runtime, "continue\n");
    assert_eq!(outcome, SessionOutcome::Finished);
    join(driver);

    let warning = output
        .find("Warning: Breakpoint [1] condition 'nope > 0' failed")
        .expect("condition failure reported");
    let banner = output
        .find("Thread 1 (main) stopped at [2] t.spec:2:1")
        .expect("stop banner shown");
    assert!(warning < banner, "warning after banner in:\n{}", output);
}

#[test]
fn test_error_answers_count_as_failed_commands() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2", "t.spec").unwrap();
    let main = runtime.spawn_thread("main", ProcessorId(0), looping(1)).unwrap();
    let driver = runtime.start(main).unwrap();

    let script = "bogus\nprint nope\nbreak 0\nthread 9\nprint i\nlist\ncontinue\n";
    let mut reader = DebugReader::new(runtime.clone(), Cursor::new(script.to_string()), Vec::new());
    assert_eq!(reader.run().unwrap(), SessionOutcome::Finished);
    join(driver);
    assert_eq!(reader.failed_commands(), 4);
}
