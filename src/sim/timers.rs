//! Single timer queue polled once per tick
//!
//! Replaces a pile of independent per-entity timeouts. Clearing the queue on
//! session reset guarantees nothing scheduled by an old session can fire into
//! a new one.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Handle for cancelling a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

struct Scheduled<T> {
    at: f64,
    id: u64,
    payload: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    // Reversed so the max-heap pops the earliest deadline, FIFO on ties
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .total_cmp(&self.at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Priority queue of payloads keyed by expiry time
pub struct TimerQueue<T> {
    heap: BinaryHeap<Scheduled<T>>,
    cancelled: HashSet<u64>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for TimerQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerQueue")
            .field("pending", &self.len())
            .finish()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            cancelled: HashSet::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, at: f64, payload: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Scheduled { at, id, payload });
        TimerId(id)
    }

    /// Cancel a pending timer. Cancelling a fired or unknown timer does nothing.
    pub fn cancel(&mut self, timer: TimerId) {
        if self.heap.iter().any(|s| s.id == timer.0) {
            self.cancelled.insert(timer.0);
        }
    }

    /// Pop every timer due at or before `now`, earliest first
    pub fn drain_due(&mut self, now: f64) -> Vec<T> {
        let mut due = Vec::new();
        while let Some(next) = self.heap.peek() {
            if next.at > now {
                break;
            }
            let Some(fired) = self.heap.pop() else { break };
            if !self.cancelled.remove(&fired.id) {
                due.push(fired.payload);
            }
        }
        due
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<f64> {
        self.heap
            .iter()
            .filter(|s| !self.cancelled.contains(&s.id))
            .map(|s| s.at)
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn len(&self) -> usize {
        self.heap.len() - self.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.cancelled.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule(2.0, "late");
        q.schedule(0.5, "early");
        q.schedule(1.0, "middle");

        assert!(q.drain_due(0.4).is_empty());
        assert_eq!(q.drain_due(1.0), vec!["early", "middle"]);
        assert_eq!(q.next_deadline(), Some(2.0));
        assert_eq!(q.drain_due(5.0), vec!["late"]);
        assert!(q.is_empty());
    }

    #[test]
    fn equal_deadlines_fire_in_schedule_order() {
        let mut q = TimerQueue::new();
        for i in 0..5 {
            q.schedule(1.0, i);
        }
        assert_eq!(q.drain_due(1.0), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut q = TimerQueue::new();
        let a = q.schedule(1.0, 'a');
        q.schedule(1.5, 'b');
        q.cancel(a);
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_deadline(), Some(1.5));
        assert_eq!(q.drain_due(2.0), vec!['b']);

        // Cancelling something that already fired is harmless
        q.cancel(a);
        assert!(q.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let mut q = TimerQueue::new();
        q.schedule(1.0, ());
        q.schedule(2.0, ());
        q.clear();
        assert!(q.drain_due(10.0).is_empty());
    }
}
