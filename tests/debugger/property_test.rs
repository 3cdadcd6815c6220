/*!
 * Property Tests
 * Quorum over random thread populations and MOD hit counting
 */

use crate::support::{at, join, looping, runtime, wait_stop};
use proptest::prelude::*;
use specrun_kernel::{
    BreakpointTable, ContextArena, HitCondition, ProcessorId, SimpleEvaluator,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_quorum_is_never_a_subset(
        threads in 1usize..5,
        processors in 1u32..4,
        rounds in 1usize..4,
    ) {
        let runtime = runtime(processors);
        runtime.set_breakpoint("2", "t.spec").unwrap();
        let ids: Vec<_> = (0..threads)
            .map(|n| {
                let processor = ProcessorId(n as u32 % processors);
                runtime.spawn_thread(&format!("t{}", n), processor, looping(500)).unwrap()
            })
            .collect();
        let driver = runtime.start(ids[0]).unwrap();

        for _ in 0..rounds {
            wait_stop(&runtime);
            let stopped = runtime.link().threads();
            prop_assert_eq!(stopped.len(), runtime.scheduler().thread_count());
            prop_assert_eq!(stopped.len(), threads);
            runtime.link().resume_all().unwrap();
        }

        runtime.link().kill_all().unwrap();
        join(driver);
    }

    #[test]
    fn prop_mod_suspends_on_multiples(visits in 0u64..200, every in 1u64..10) {
        let table = BreakpointTable::new();
        let evaluator = SimpleEvaluator::new();
        let point = table
            .add_breakpoint(at(2), None, Some(HitCondition::Mod(every)), &evaluator)
            .unwrap();
        let mut arena = ContextArena::new();
        let ctx = arena.push_root("main()", at(1), None);

        let mut suspended = Vec::new();
        for _ in 0..visits {
            let hits = point.record_hit(0);
            if point.should_suspend(&evaluator, &arena, ctx).unwrap() {
                suspended.push(hits);
            }
        }
        prop_assert_eq!(suspended.len() as u64, visits / every);
        prop_assert!(suspended.iter().all(|hits| hits % every == 0));
    }
}
