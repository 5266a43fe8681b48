//! The host collaborators this model is built against: a monotonic clock and
//! a cancellable event scheduler (spec §6, "Downstream (from host)").
//!
//! The real host simulation kernel is out of scope for this crate — it is
//! named only at this boundary. `SimScheduler` below is a minimal reference
//! implementation good enough to drive the testable properties in §8; it is
//! not part of the Wire/Transmitter/Receiver contract itself, any more than
//! a mock event scheduler is part of a production simulator.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Simulated time, in seconds. Never negative in a well-formed run; `< 0.0`
/// is used as a sentinel by `Wire::blocked_since` to mean "idle".
pub type Time = f64;

/// A handle to a previously-scheduled event, returned by `Scheduler::schedule_at`
/// and accepted by `Scheduler::cancel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(u64);

/// A boxed callback invoked when its scheduled time arrives. Takes the
/// scheduler back so the callback can itself schedule further events — this
/// is how `Wire` chains an end-of-transmission event into a possible
/// free-again fan-out without re-borrowing its own scheduler handle.
pub type ScheduledEvent = Box<dyn FnOnce(&mut dyn Scheduler)>;

pub trait Clock {
    /// The current simulated time. Monotonic non-decreasing.
    fn now(&self) -> Time;
}

pub trait Scheduler: Clock {
    /// Schedule `event` to fire at absolute simulated time `at`.
    fn schedule_at(&mut self, at: Time, event: ScheduledEvent) -> EventHandle;

    /// Withdraw a previously-scheduled event. Returns `false` if the handle
    /// is unknown or the event already fired — cancelling an already-fired
    /// event is a no-op the caller can distinguish from a live cancellation.
    fn cancel(&mut self, handle: EventHandle) -> bool;

    /// Convenience: schedule `delay` seconds from now.
    fn schedule_after(&mut self, delay: Time, event: ScheduledEvent) -> EventHandle {
        let at = self.now() + delay;
        self.schedule_at(at, event)
    }
}

struct HeapItem {
    time: Time,
    seq: u64,
    handle: EventHandle,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}
impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so earliest time (and, among
        // ties, earliest insertion — FIFO, per spec §5) pops first.
        other
            .time
            .partial_cmp(&self.time)
            .expect("simulated time must never be NaN")
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A minimal single-threaded, `BinaryHeap`-backed scheduler/clock. Stands in
/// for the host kernel in tests and examples.
pub struct SimScheduler {
    current_time: Time,
    heap: BinaryHeap<HeapItem>,
    events: HashMap<EventHandle, Option<ScheduledEvent>>,
    next_id: u64,
    next_seq: u64,
}

impl SimScheduler {
    pub fn new() -> Self {
        SimScheduler {
            current_time: 0.0,
            heap: BinaryHeap::new(),
            events: HashMap::new(),
            next_id: 0,
            next_seq: 0,
        }
    }

    /// Pop and run the earliest pending, non-cancelled event. Returns
    /// `false` if there was nothing left to run.
    pub fn run_next(&mut self) -> bool {
        loop {
            let item = match self.heap.pop() {
                Some(item) => item,
                None => return false,
            };
            let slot = self.events.remove(&item.handle).flatten();
            let event = match slot {
                Some(event) => event,
                None => continue, // lazily-deleted: cancelled or already fired
            };
            self.current_time = item.time;
            event(self);
            return true;
        }
    }

    /// Run events until none remain at or before `until`.
    pub fn run_until(&mut self, until: Time) {
        while self.next_event_time().is_some_and(|t| t <= until) {
            self.run_next();
        }
    }

    /// Run every pending event, in time order, to exhaustion.
    pub fn run_all(&mut self) {
        while self.run_next() {}
    }

    fn next_event_time(&self) -> Option<Time> {
        self.heap.peek().map(|item| item.time)
    }

    /// Number of events still pending (cancelled ones excluded).
    pub fn pending_count(&self) -> usize {
        self.events.values().filter(|slot| slot.is_some()).count()
    }
}

impl Default for SimScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimScheduler {
    fn now(&self) -> Time {
        self.current_time
    }
}

impl Scheduler for SimScheduler {
    fn schedule_at(&mut self, at: Time, event: ScheduledEvent) -> EventHandle {
        let handle = EventHandle(self.next_id);
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.insert(handle, Some(event));
        self.heap.push(HeapItem {
            time: at,
            seq,
            handle,
        });
        handle
    }

    fn cancel(&mut self, handle: EventHandle) -> bool {
        match self.events.get_mut(&handle) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                true
            }
            _ => false,
        }
    }
}
