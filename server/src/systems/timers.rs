// tag_arena/server/src/systems/timers.rs
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tracing::trace;

use crate::core::types::{AgentId, Millis, PropId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerEffect {
    /// Ghost window after losing "it" is over.
    BecomeReady(AgentId),
    RespawnProp(PropId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Scheduled {
    deadline: Millis,
    seq: u64,
    effect: TimerEffect,
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.deadline, self.seq).cmp(&(other.deadline, other.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Deferred effects against the simulation clock. Polled once per tick; effects with equal
/// deadlines fire in scheduling order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline: Millis, effect: TimerEffect) {
        let seq = self.next_seq;
        self.next_seq += 1;
        trace!("Timer scheduled: {:?} at {}ms", effect, deadline);
        self.heap.push(Reverse(Scheduled { deadline, seq, effect }));
    }

    /// Removes and returns every effect due at or before `now`.
    pub fn poll(&mut self, now: Millis) -> Vec<TimerEffect> {
        let mut due = Vec::new();
        while let Some(Reverse(next)) = self.heap.peek() {
            if next.deadline > now {
                break;
            }
            if let Some(Reverse(fired)) = self.heap.pop() {
                due.push(fired.effect);
            }
        }
        due
    }

    /// Drops pending effects that no longer apply, e.g. for a removed agent.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&TimerEffect) -> bool) {
        let kept: Vec<_> = self.heap.drain().filter(|Reverse(s)| !predicate(&s.effect)).collect();
        self.heap = kept.into_iter().collect();
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.heap.peek().map(|Reverse(s)| s.deadline)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
