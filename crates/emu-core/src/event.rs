//! Timed event queue.
//!
//! Chips embed one [`Event`] record per timed callback they own. The queue
//! itself only holds `(tick, handle)` pairs sorted by tick, so it never owns
//! chip state. The owner of the queue maps a fired handle back to the chip
//! method that services it.
//!
//! A machine normally keeps two queues (UI-rate and machine-rate); they are
//! simply two instances of [`EventQueue`].

use crate::Ticks;

#[derive(Debug, Clone, Copy)]
struct Entry<K> {
    at: Ticks,
    handle: K,
}

/// Pending timed events, earliest first. Equal ticks keep insertion order.
#[derive(Debug, Clone)]
pub struct EventQueue<K> {
    entries: Vec<Entry<K>>,
    /// Latest tick handed to a dispatch callback.
    last_dispatched: Ticks,
}

impl<K: Copy + PartialEq> EventQueue<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(16),
            last_dispatched: Ticks::ZERO,
        }
    }

    /// Insert `handle` to fire at `at`.
    ///
    /// An already-queued handle is moved, so rescheduling is idempotent. A
    /// tick in the past is legal: the event fires on the next
    /// [`run_queue`](Self::run_queue).
    pub fn queue(&mut self, handle: K, at: Ticks) {
        self.dequeue(handle);
        let index = self.entries.partition_point(|e| e.at <= at);
        self.entries.insert(index, Entry { at, handle });
    }

    /// Remove `handle` if it is queued.
    pub fn dequeue(&mut self, handle: K) {
        if let Some(index) = self.entries.iter().position(|e| e.handle == handle) {
            self.entries.remove(index);
        }
    }

    #[must_use]
    pub fn is_queued(&self, handle: K) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    /// Tick at which `handle` is due, if queued.
    #[must_use]
    pub fn scheduled(&self, handle: K) -> Option<Ticks> {
        self.entries.iter().find(|e| e.handle == handle).map(|e| e.at)
    }

    /// Tick of the earliest pending event.
    #[must_use]
    pub fn next_tick(&self) -> Option<Ticks> {
        self.entries.first().map(|e| e.at)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every pending event and forget the dispatch history.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.last_dispatched = Ticks::ZERO;
    }

    /// Fire every event due at or before `now`, earliest first.
    ///
    /// `dispatch` receives the queue itself, so callbacks can queue further
    /// events (including their own handle); those are visible to the very
    /// next pop. A handle re-queued at or before the tick it was just
    /// delivered at waits for the next call, so a callback that re-queues
    /// itself at the current tick cannot loop. Re-queued later but still
    /// due, it fires again in this call, in tick order.
    ///
    /// The tick passed to `dispatch` never goes backwards: an event queued
    /// in the past is delivered at the latest tick already dispatched.
    ///
    /// Returns the number of events fired.
    pub fn run_queue<F>(&mut self, now: Ticks, mut dispatch: F) -> usize
    where
        F: FnMut(&mut Self, K, Ticks),
    {
        let mut delivered: Vec<(K, Ticks)> = Vec::new();
        let mut count = 0;
        while let Some(index) = self
            .entries
            .iter()
            .take_while(|e| e.at <= now)
            .position(|e| {
                !delivered
                    .iter()
                    .any(|&(handle, tick)| handle == e.handle && e.at <= tick)
            })
        {
            let entry = self.entries.remove(index);
            let tick = entry.at.max(self.last_dispatched);
            self.last_dispatched = tick;
            match delivered.iter_mut().find(|(handle, _)| *handle == entry.handle) {
                Some(slot) => slot.1 = tick,
                None => delivered.push((entry.handle, tick)),
            }
            count += 1;
            dispatch(self, entry.handle, tick);
        }
        count
    }
}

impl<K: Copy + PartialEq> Default for EventQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// A timed callback owned by a chip.
///
/// The record lives inside the chip for the chip's whole lifetime and is
/// re-armed repeatedly; it is never allocated per firing. It mirrors the
/// tick the handle is queued for, which is what save-states capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event<K> {
    handle: K,
    at: Option<Ticks>,
}

impl<K: Copy> Event<K> {
    /// Bind a handle to a record. Does not schedule anything.
    #[must_use]
    pub const fn new(handle: K) -> Self {
        Self { handle, at: None }
    }

    #[must_use]
    pub fn handle(&self) -> K {
        self.handle
    }

    /// Tick the event is queued for.
    #[must_use]
    pub fn at(&self) -> Option<Ticks> {
        self.at
    }

    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.at.is_some()
    }

    /// Queue (or move) this event to fire at `at`.
    pub fn schedule<Q>(&mut self, queue: &mut EventQueue<Q>, at: Ticks)
    where
        Q: Copy + PartialEq + From<K>,
    {
        self.at = Some(at);
        queue.queue(Q::from(self.handle), at);
    }

    /// Remove this event from the queue. No-op if not queued.
    pub fn cancel<Q>(&mut self, queue: &mut EventQueue<Q>)
    where
        Q: Copy + PartialEq + From<K>,
    {
        if self.at.take().is_some() {
            queue.dequeue(Q::from(self.handle));
        }
    }

    /// Mark the event as delivered. Call at the top of its handler.
    pub fn fire(&mut self) -> Option<Ticks> {
        self.at.take()
    }

    /// Set the pending tick from a save-state without touching any queue.
    pub fn restore(&mut self, at: Option<Ticks>) {
        self.at = at;
    }

    /// Make the live queue agree with this record after a restore.
    pub fn rearm<Q>(&self, queue: &mut EventQueue<Q>)
    where
        Q: Copy + PartialEq + From<K>,
    {
        match self.at {
            Some(at) => queue.queue(Q::from(self.handle), at),
            None => queue.dequeue(Q::from(self.handle)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Ev {
        A,
        B,
        C,
    }

    fn drain(queue: &mut EventQueue<Ev>, now: u64) -> Vec<(Ev, u64)> {
        let mut log = Vec::new();
        queue.run_queue(Ticks(now), |_, ev, tick| log.push((ev, tick.get())));
        log
    }

    #[test]
    fn fires_in_tick_order() {
        let mut queue = EventQueue::new();
        queue.queue(Ev::C, Ticks(30));
        queue.queue(Ev::A, Ticks(10));
        queue.queue(Ev::B, Ticks(20));
        assert_eq!(queue.next_tick(), Some(Ticks(10)));
        assert_eq!(drain(&mut queue, 25), vec![(Ev::A, 10), (Ev::B, 20)]);
        assert_eq!(queue.len(), 1);
        assert_eq!(drain(&mut queue, 30), vec![(Ev::C, 30)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn equal_ticks_fire_in_insertion_order() {
        let mut queue = EventQueue::new();
        queue.queue(Ev::B, Ticks(5));
        queue.queue(Ev::A, Ticks(5));
        queue.queue(Ev::C, Ticks(5));
        assert_eq!(drain(&mut queue, 5), vec![(Ev::B, 5), (Ev::A, 5), (Ev::C, 5)]);
    }

    #[test]
    fn requeue_moves_instead_of_duplicating() {
        let mut queue = EventQueue::new();
        queue.queue(Ev::A, Ticks(10));
        queue.queue(Ev::B, Ticks(15));
        queue.queue(Ev::A, Ticks(20));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.scheduled(Ev::A), Some(Ticks(20)));
        assert_eq!(drain(&mut queue, 100), vec![(Ev::B, 15), (Ev::A, 20)]);
    }

    #[test]
    fn dequeue_unqueued_is_noop() {
        let mut queue = EventQueue::new();
        queue.dequeue(Ev::A);
        queue.queue(Ev::B, Ticks(1));
        queue.dequeue(Ev::A);
        assert!(queue.is_queued(Ev::B));
        queue.dequeue(Ev::B);
        assert!(!queue.is_queued(Ev::B));
    }

    #[test]
    fn self_requeue_at_same_tick_fires_once_per_run() {
        let mut queue = EventQueue::new();
        queue.queue(Ev::A, Ticks(10));
        let mut count = 0;
        let fired = queue.run_queue(Ticks(10), |q, ev, tick| {
            count += 1;
            q.queue(ev, tick);
        });
        assert_eq!(fired, 1);
        assert_eq!(count, 1);
        assert!(queue.is_queued(Ev::A));
        // Still due, so the next run delivers it again.
        assert_eq!(drain(&mut queue, 10), vec![(Ev::A, 10)]);
    }

    #[test]
    fn periodic_event_catches_up_in_one_run() {
        let mut queue = EventQueue::new();
        queue.queue(Ev::A, Ticks(0));
        queue.queue(Ev::B, Ticks(2500));
        let mut log = Vec::new();
        let fired = queue.run_queue(Ticks(3000), |q, ev, tick| {
            log.push((ev, tick.get()));
            if ev == Ev::A {
                q.queue(Ev::A, tick + 912);
            }
        });
        assert_eq!(
            log,
            vec![(Ev::A, 0), (Ev::A, 912), (Ev::A, 1824), (Ev::B, 2500), (Ev::A, 2736)]
        );
        assert_eq!(fired, 5);
        assert_eq!(queue.next_tick(), Some(Ticks(3648)));
    }

    #[test]
    fn past_requeue_waits_for_next_run() {
        let mut queue = EventQueue::new();
        queue.queue(Ev::A, Ticks(40));
        queue.queue(Ev::B, Ticks(50));
        let mut log = Vec::new();
        queue.run_queue(Ticks(60), |q, ev, tick| {
            log.push((ev, tick.get()));
            if ev == Ev::B {
                q.queue(Ev::A, Ticks(45));
            }
        });
        // A was delivered at 40, so a re-queue at 45 is still later.
        assert_eq!(log, vec![(Ev::A, 40), (Ev::B, 50), (Ev::A, 50)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn callback_queued_events_are_seen_before_next_pop() {
        let mut queue = EventQueue::new();
        queue.queue(Ev::A, Ticks(10));
        queue.queue(Ev::C, Ticks(12));
        let mut log = Vec::new();
        queue.run_queue(Ticks(20), |q, ev, tick| {
            log.push((ev, tick.get()));
            if ev == Ev::A {
                q.queue(Ev::B, Ticks(11));
            }
        });
        assert_eq!(log, vec![(Ev::A, 10), (Ev::B, 11), (Ev::C, 12)]);
    }

    #[test]
    fn past_events_fire_without_going_backwards() {
        let mut queue = EventQueue::new();
        queue.queue(Ev::A, Ticks(50));
        assert_eq!(drain(&mut queue, 60), vec![(Ev::A, 50)]);
        queue.queue(Ev::B, Ticks(40));
        assert_eq!(drain(&mut queue, 60), vec![(Ev::B, 50)]);
    }

    #[test]
    fn event_record_tracks_queue() {
        let mut queue: EventQueue<Ev> = EventQueue::new();
        let mut event = Event::new(Ev::B);
        assert!(!event.is_queued());
        event.schedule(&mut queue, Ticks(7));
        assert_eq!(event.at(), Some(Ticks(7)));
        assert_eq!(queue.scheduled(Ev::B), Some(Ticks(7)));
        event.cancel(&mut queue);
        assert!(!event.is_queued());
        assert!(queue.is_empty());

        event.restore(Some(Ticks(9)));
        assert!(queue.is_empty());
        event.rearm(&mut queue);
        assert_eq!(queue.scheduled(Ev::B), Some(Ticks(9)));
        assert_eq!(event.fire(), Some(Ticks(9)));
        event.rearm(&mut queue);
        assert!(queue.is_empty());
    }
}
