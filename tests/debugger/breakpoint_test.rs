/*!
 * Breakpoint Tests
 * Hit conditions, conditions and tracepoints on running threads
 */

use crate::support::{at, finished, join, looping, run_to_end, runtime, two_points, wait_stop};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use specrun_kernel::{ProcessorId, StopReason, TraceEvent};
use std::sync::Arc;

#[test]
fn test_mod_hit_condition_counts() {
    for (visits, every) in [(10, 3), (9, 3), (2, 3), (7, 1)] {
        let runtime = runtime(1);
        runtime
            .set_breakpoint(&format!("2 % {}", every), "t.spec")
            .unwrap();
        let main = runtime
            .spawn_thread("main", ProcessorId(0), looping(visits))
            .unwrap();
        let driver = runtime.start(main).unwrap();

        assert_eq!(run_to_end(&runtime), visits / every, "{} visits % {}", visits, every);
        join(driver);
        assert_eq!(runtime.breakpoints().get(1).unwrap().hits(), visits as u64);
    }
}

#[test]
fn test_condition_selects_iteration() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2 i = 4", "t.spec").unwrap();
    let main = runtime.spawn_thread("main", ProcessorId(0), looping(10)).unwrap();
    let driver = runtime.start(main).unwrap();

    wait_stop(&runtime);
    let stopped = runtime.link().threads();
    assert_eq!(stopped.len(), 1);
    assert_eq!(stopped[0].reason, StopReason::Breakpoint(1));
    assert_eq!(stopped[0].breakpoint, Some(1));
    assert_eq!(stopped[0].location, at(2));

    assert_eq!(run_to_end(&runtime), 1);
    join(driver);
}

#[test]
fn test_failing_condition_never_stops() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2 missing > 1", "t.spec").unwrap();
    runtime.set_breakpoint("1 i + 1", "t.spec").unwrap();
    let main = runtime.spawn_thread("main", ProcessorId(0), looping(3)).unwrap();
    let driver = runtime.start(main).unwrap();

    assert_eq!(run_to_end(&runtime), 0);
    join(driver);

    let reports = runtime.link().take_reports();
    assert_eq!(reports.len(), 6);
    assert!(reports.iter().any(|r| r.contains("missing")));
    assert!(reports.iter().any(|r| r.contains("not boolean")));
}

#[test]
fn test_tracepoints_never_suspend() {
    let runtime = runtime(1);
    runtime.set_tracepoint("2 i * 2", "t.spec").unwrap();
    runtime.set_tracepoint("2 nope", "t.spec").unwrap();
    runtime.set_tracepoint("1", "t.spec").unwrap();

    let events: Arc<Mutex<Vec<TraceEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    runtime
        .link()
        .set_trace_callback(Some(Arc::new(move |event: &TraceEvent| {
            sink.lock().push(event.clone())
        })));

    let main = runtime.spawn_thread("main", ProcessorId(0), looping(5)).unwrap();
    let driver = runtime.start(main).unwrap();
    assert_eq!(run_to_end(&runtime), 0);
    join(driver);

    assert_eq!(runtime.scheduler().stats().suspensions, 0);
    let events = events.lock();
    assert_eq!(events.len(), 15);
    assert_eq!(events[0].text, "Tracepoint [3]: t.spec:1:1");
    assert_eq!(events[1].text, "Tracepoint [1]: i * 2 = 0");
    assert!(events[2].text.starts_with("Tracepoint [2]: nope failed:"));
    assert_eq!(events[13].text, "Tracepoint [1]: i * 2 = 8");
    assert!(events.iter().all(|e| e.thread == main));
}

#[test]
fn test_removed_breakpoint_stops_nothing() {
    let runtime = runtime(1);
    let point = runtime.set_breakpoint("2", "t.spec").unwrap();
    runtime.breakpoints().remove(point.number()).unwrap();
    assert!(runtime.breakpoints().remove(point.number()).is_err());

    let main = runtime.spawn_thread("main", ProcessorId(0), looping(5)).unwrap();
    let driver = runtime.start(main).unwrap();
    assert_eq!(run_to_end(&runtime), 0);
    join(driver);
}

#[test]
fn test_one_hit_per_line_visit() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2", "t.spec").unwrap();
    let main = runtime.spawn_thread("main", ProcessorId(0), two_points(3)).unwrap();
    let driver = runtime.start(main).unwrap();

    let mut stops = Vec::new();
    loop {
        wait_stop(&runtime);
        if finished(&runtime) {
            break;
        }
        stops.extend(runtime.link().threads().into_iter().map(|t| t.location));
        runtime.link().resume_all().unwrap();
    }
    join(driver);

    assert_eq!(stops, vec![at(2), at(2), at(2)]);
    assert_eq!(runtime.breakpoints().get(1).unwrap().hits(), 3);
}

#[test]
fn test_mod_counts_visits_not_notify_points() {
    let runtime = runtime(1);
    runtime.set_breakpoint("2 % 3", "t.spec").unwrap();
    runtime.set_tracepoint("2", "t.spec").unwrap();
    let main = runtime.spawn_thread("main", ProcessorId(0), two_points(6)).unwrap();
    let driver = runtime.start(main).unwrap();

    assert_eq!(run_to_end(&runtime), 2);
    join(driver);
    assert_eq!(runtime.breakpoints().get(1).unwrap().hits(), 6);
    assert_eq!(runtime.breakpoints().get(2).unwrap().hits(), 6);
}
