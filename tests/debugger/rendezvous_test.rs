/*!
 * Rendezvous Tests
 * Quorum, resume_all, kill_all and per-thread commands on the debug link
 */

use crate::support::{at, join, looping, runtime, wait_stop, WAIT};
use pretty_assertions::assert_eq;
use specrun_kernel::{
    DebugCommand, DebugProtocolError, ProcessorId, Runtime, RuntimeConfig, SchedulerError,
    StopReason, ThreadHandle, ThreadId,
};
use std::collections::BTreeSet;
use std::time::Duration;

#[test]
fn test_quorum_includes_paused_threads() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2", "t.spec").unwrap();
    let main = runtime.spawn_thread("a", ProcessorId(0), looping(1_000)).unwrap();
    runtime.spawn_thread("b", ProcessorId(0), looping(1_000)).unwrap();
    let driver = runtime.start(main).unwrap();

    wait_stop(&runtime);
    let stopped = runtime.link().threads();
    assert_eq!(stopped.len(), runtime.scheduler().thread_count());
    assert_eq!(stopped.len(), 2);
    assert!(stopped.iter().any(|t| t.reason == StopReason::Breakpoint(1)));
    for thread in &stopped {
        assert!(thread.location == at(1) || thread.location == at(2));
    }

    runtime.link().kill_all().unwrap();
    join(driver);
}

#[test]
fn test_resume_all_leaves_no_stale_entries() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2", "t.spec").unwrap();
    let main = runtime.spawn_thread("a", ProcessorId(0), looping(1_000)).unwrap();
    runtime.spawn_thread("b", ProcessorId(0), looping(1_000)).unwrap();
    let driver = runtime.start(main).unwrap();

    let mut last_stop = 0;
    for _ in 0..5 {
        wait_stop(&runtime);
        let stopped = runtime.link().threads();
        assert_eq!(stopped.len(), 2);
        for thread in &stopped {
            assert!(thread.since >= last_stop);
        }
        last_stop = stopped.iter().map(|t| t.since).max().unwrap() + 1;

        runtime.link().resume_all().unwrap();
        // Anything present now stopped after the resume
        for thread in runtime.link().threads() {
            assert!(thread.since >= last_stop, "stale entry {}", thread);
        }
    }

    runtime.link().kill_all().unwrap();
    join(driver);
}

#[test]
fn test_kill_all_satisfies_quorum() {
    let runtime = runtime(2);
    runtime.set_breakpoint("2", "t.spec").unwrap();
    let main = runtime.spawn_thread("a", ProcessorId(0), looping(1_000)).unwrap();
    runtime.spawn_thread("b", ProcessorId(1), looping(1_000)).unwrap();
    runtime.spawn_thread("c", ProcessorId(1), looping(1_000)).unwrap();
    let driver = runtime.start(main).unwrap();

    wait_stop(&runtime);
    runtime.link().kill_all().unwrap();

    assert_eq!(runtime.scheduler().thread_count(), 0);
    assert_eq!(runtime.link().stopped_count(), 0);
    assert!(runtime.link().wait_for_stop_timeout(WAIT));
    assert!(!runtime.link().has_trace_callback());
    join(driver);
}

#[test]
fn test_two_processors_four_threads() {
    let runtime = runtime(2);
    runtime.set_breakpoint("2 = 1", "t.spec").unwrap();
    let main = runtime.spawn_thread("t1", ProcessorId(0), looping(50)).unwrap();
    runtime.spawn_thread("t2", ProcessorId(1), looping(50)).unwrap();
    runtime.spawn_thread("t3", ProcessorId(0), looping(50)).unwrap();
    runtime.spawn_thread("t4", ProcessorId(1), looping(50)).unwrap();
    let driver = runtime.start(main).unwrap();

    wait_stop(&runtime);
    let stopped = runtime.link().threads();
    assert_eq!(stopped.len(), 4);
    let ids: BTreeSet<ThreadId> = stopped.iter().map(|t| t.id).collect();
    assert_eq!(ids.len(), 4);
    let again: BTreeSet<ThreadId> = runtime.link().threads().iter().map(|t| t.id).collect();
    assert_eq!(ids, again);
    for thread in &stopped {
        let expected = if thread.id.0 % 2 == 1 { ProcessorId(0) } else { ProcessorId(1) };
        assert_eq!(thread.processor, expected);
    }

    // Talk to one thread only; a CONTINUE reply does not release anyone
    let paused = stopped
        .iter()
        .find(|t| t.reason == StopReason::Paused)
        .map(|t| t.id)
        .unwrap();
    match runtime.link().send(paused, DebugCommand::Stack).unwrap() {
        DebugCommand::Result(text) => {
            assert!(text.starts_with(&format!("Thread {} stopped at", paused)));
            assert!(text.contains("loop()"));
        }
        other => panic!("unexpected reply {}", other),
    }
    assert_eq!(
        runtime.link().send(paused, DebugCommand::Continue).unwrap(),
        DebugCommand::Resume
    );
    assert_eq!(runtime.link().stopped_count(), 4);

    runtime.link().resume_all().unwrap();
    wait_stop(&runtime);
    assert!(runtime.link().threads().is_empty());
    join(driver);
}

#[test]
fn test_resume_single_thread() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2 = 1", "t.spec").unwrap();
    let main = runtime.spawn_thread("a", ProcessorId(0), looping(1_000)).unwrap();
    runtime.spawn_thread("b", ProcessorId(0), looping(50)).unwrap();
    let driver = runtime.start(main).unwrap();

    wait_stop(&runtime);
    let paused = runtime
        .link()
        .threads()
        .into_iter()
        .find(|t| t.reason == StopReason::Paused)
        .map(|t| t.id)
        .unwrap();
    runtime.link().resume(paused).unwrap();

    // The released thread runs to completion while the other stays put
    wait_stop(&runtime);
    assert!(!runtime.link().is_stopped(paused));
    assert_eq!(
        runtime.link().resume(paused),
        Err(DebugProtocolError::NotStopped(paused))
    );

    runtime.link().kill_all().unwrap();
    join(driver);
}

#[test]
fn test_print_in_stopped_thread() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2 = 3", "t.spec").unwrap();
    let main = runtime.spawn_thread("a", ProcessorId(0), looping(10)).unwrap();
    let driver = runtime.start(main).unwrap();

    wait_stop(&runtime);
    assert_eq!(
        runtime.link().send(main, DebugCommand::Print("i * 10".to_string())).unwrap(),
        DebugCommand::Result("i * 10 = 20".to_string())
    );
    assert!(matches!(
        runtime.link().send(main, DebugCommand::Print("nope".to_string())).unwrap(),
        DebugCommand::Error(_)
    ));
    assert_eq!(
        runtime.link().send(main, DebugCommand::Threads).unwrap(),
        DebugCommand::Error("Bad command".to_string())
    );

    runtime.link().resume_all().unwrap();
    wait_stop(&runtime);
    assert!(runtime.link().threads().is_empty());
    join(driver);
}

#[test]
fn test_terminate_all_reports_non_yielding_thread() {
    let config = RuntimeConfig::default().with_terminate_timeout(Duration::from_millis(100));
    let runtime = Runtime::new(config).unwrap();
    let (entered_tx, entered_rx) = flume::bounded(1);
    let (gate_tx, gate_rx) = flume::bounded::<()>(1);

    let main = runtime
        .spawn_thread("stuck", ProcessorId(0), move |t: &mut ThreadHandle| {
            let ctx = t.contexts_mut().push_root("stuck()", at(1), None);
            if t.notify_point(&at(1), ctx) {
                let _ = entered_tx.send(());
                // Holds the turn without reaching another notify point
                let _ = gate_rx.recv();
            }
        })
        .unwrap();
    let driver = runtime.start(main).unwrap();
    entered_rx.recv_timeout(WAIT).unwrap();

    assert_eq!(
        runtime.scheduler().terminate_all(),
        Err(SchedulerError::NonYieldingThreads(vec![main]))
    );
    assert_eq!(runtime.scheduler().thread_count(), 0);

    gate_tx.send(()).unwrap();
    join(driver);
}
