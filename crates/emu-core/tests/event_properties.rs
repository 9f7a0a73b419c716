//! Property tests for event queue ordering.

use emu_core::{EventQueue, Ticks};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Handle(u8);

proptest! {
    /// Whatever gets scheduled (past ticks included), dispatched ticks never
    /// go backwards across successive runs.
    #[test]
    fn dispatched_ticks_are_monotonic(
        initial in prop::collection::vec((0u8..8, 0u64..500), 1..12),
        runs in prop::collection::vec((1u64..200, prop::collection::vec((0u8..8, -50i64..150), 0..3)), 1..20),
    ) {
        let mut queue = EventQueue::new();
        for (h, at) in initial {
            queue.queue(Handle(h), Ticks(at));
        }
        let mut now = Ticks::ZERO;
        let mut last_seen = Ticks::ZERO;
        for (advance, requeues) in runs {
            now += advance;
            let mut requeues = requeues.into_iter();
            let mut ok = true;
            queue.run_queue(now, |q, _handle, tick| {
                ok &= tick >= last_seen && tick <= now;
                last_seen = tick;
                if let Some((h, delta)) = requeues.next() {
                    q.queue(Handle(h), Ticks::from_offset(tick, delta));
                }
            });
            prop_assert!(ok);
        }
    }

    /// A run leaves nothing due that has not already fired in that run.
    #[test]
    fn run_drains_everything_due(ticks in prop::collection::vec(0u64..100, 1..10), now in 0u64..120) {
        let mut queue = EventQueue::new();
        for (i, at) in ticks.iter().enumerate() {
            queue.queue(Handle(i as u8), Ticks(*at));
        }
        queue.run_queue(Ticks(now), |_, _, _| {});
        prop_assert!(queue.next_tick().is_none_or(|t| t > Ticks(now)));
    }

    /// Periodic handles that re-queue themselves later catch up fully, in
    /// tick order, within a single run.
    #[test]
    fn periodic_handles_catch_up(
        periods in prop::collection::vec(1u64..300, 1..6),
        now in 0u64..3000,
    ) {
        let mut queue = EventQueue::new();
        for (i, _) in periods.iter().enumerate() {
            queue.queue(Handle(i as u8), Ticks::ZERO);
        }
        let mut seen = Vec::new();
        queue.run_queue(Ticks(now), |q, handle, tick| {
            seen.push(tick);
            q.queue(handle, tick + periods[usize::from(handle.0)]);
        });
        let expected: u64 = periods.iter().map(|p| now / p + 1).sum();
        prop_assert_eq!(seen.len() as u64, expected);
        prop_assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(queue.next_tick().is_some_and(|t| t > Ticks(now)));
    }
}
