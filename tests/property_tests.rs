//! Property-based tests for the timer and the history store.
//!
//! Time is driven by a manual clock so every property is deterministic for
//! a given input.

use proptest::prelude::*;
use rcountdown::{HistoryStore, ManualClock, MemoryStorage, Tick, Timer, TimerStatus};

fn timer(resolution: u64) -> (Timer<ManualClock>, ManualClock) {
    let clock = ManualClock::new(1_700_000_000_000);
    (Timer::with_resolution(clock.clone(), resolution), clock)
}

fn ignore(_: Tick) {}

prop_compose! {
    fn resolution()(variant in 0..4u8) -> u64 {
        match variant {
            0 => 1,
            1 => 10,
            2 => 100,
            _ => 1_000,
        }
    }
}

proptest! {
    #[test]
    fn fresh_start_reports_full_duration(duration in 1u64..10_000_000, res in resolution()) {
        let (mut timer, _) = timer(res);
        timer.start(duration, &mut ignore).unwrap();

        prop_assert_eq!(timer.status(), TimerStatus::Running);
        prop_assert!(duration - timer.remaining_ms() < res);
        prop_assert_eq!(timer.elapsed_ms(), 0);
    }

    #[test]
    fn pause_then_continue_preserves_elapsed(
        duration in 1_000u64..1_000_000,
        run in 0u64..1_000,
        gap in 0i64..1_000_000,
        res in resolution(),
    ) {
        let (mut timer, clock) = timer(res);
        timer.start(duration, &mut ignore).unwrap();
        clock.advance(run as i64);
        timer.pause().unwrap();
        let frozen = timer.elapsed_ms();

        clock.advance(gap);
        prop_assert_eq!(timer.elapsed_ms(), frozen);

        timer.resume(&mut ignore).unwrap();
        prop_assert!(timer.running());
        prop_assert!(timer.elapsed_ms().abs_diff(frozen) < res);
    }

    #[test]
    fn stop_never_exceeds_duration(
        duration in 1u64..100_000,
        steps in prop::collection::vec((0i64..50_000, any::<bool>()), 0..8),
    ) {
        let (mut timer, clock) = timer(10);
        timer.start(duration, &mut ignore).unwrap();

        for (advance, toggle) in steps {
            clock.advance(advance);
            if toggle {
                if timer.running() {
                    timer.pause().unwrap();
                } else if timer.paused() {
                    timer.resume(&mut ignore).unwrap();
                }
            }
        }

        if !timer.stopped() {
            timer.stop().unwrap();
        }
        prop_assert!(timer.elapsed_ms() <= duration);
        prop_assert!(timer.stopped());
    }

    #[test]
    fn expiry_fires_exactly_once(duration in 1u64..5_000, frame in 1i64..100) {
        let (mut timer, clock) = timer(10);
        let mut expirations = 0;
        let mut count = |t: Tick| if t.expired { expirations += 1 };

        timer.start(duration, &mut count).unwrap();
        let mut frames = 0;
        while timer.frame_pending() {
            clock.advance(frame);
            timer.frame(&mut count);
            frames += 1;
            prop_assert!(frames < 10_000);
        }
        // an idle frame after the chain ended changes nothing
        timer.frame(&mut count);

        prop_assert_eq!(expirations, 1);
        prop_assert!(timer.stopped());
        prop_assert_eq!(timer.remaining_ms(), 0);
    }

    #[test]
    fn remaining_and_elapsed_are_multiples_of_resolution(
        duration in 1u64..1_000_000,
        advance in 0i64..2_000_000,
        res in resolution(),
    ) {
        let (mut timer, clock) = timer(res);
        timer.start(duration, &mut ignore).unwrap();
        clock.advance(advance);

        prop_assert_eq!(timer.elapsed_ms() % res, 0);
        prop_assert_eq!(timer.remaining_ms() % res, 0);
        prop_assert!(timer.remaining_ms() <= duration);
    }

    #[test]
    fn history_ids_follow_last_id(
        ops in prop::collection::vec((any::<bool>(), 0u64..20), 1..30),
    ) {
        let mut store = HistoryStore::new(MemoryStorage::new());

        for (add, target) in ops {
            if add {
                let before = store.load().last_id;
                let id = store.add(target, 0, 0, "").unwrap();
                prop_assert_eq!(id, before + 1);
                prop_assert!(store.load().get(id).is_some());
            } else {
                store.remove(target).unwrap();
                prop_assert!(store.load().get(target).is_none());
            }
        }

        let log = store.load();
        let ids: Vec<u64> = log.entries.iter().map(|e| e.id).collect();
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(ids.iter().all(|id| *id <= log.last_id));

        store.clear().unwrap();
        let cleared = store.load();
        prop_assert!(cleared.entries.is_empty());
        prop_assert_eq!(cleared.last_id, 0);
    }
}
