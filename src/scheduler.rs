//! Tick clock and deferred continuations.
//!
//! Timed effects (reload completion, pooled-effect auto-return) are not
//! separate threads or per-effect coroutines; they are entries in a min-heap
//! keyed by expiry time, drained once per tick at the tick where their delay
//! elapses.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::*;

use crate::pool::PoolHandle;

/// Simulation clock. Advanced once per fixed update, before systems run.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimClock {
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
}

impl SimClock {
    pub fn advance(&mut self, dt: f32) {
        self.tick = self.tick.wrapping_add(1);
        self.time += dt;
    }
}

/// A continuation resumed when its expiry time elapses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deferred {
    /// Complete a timed reload: refill the magazine atomically.
    FinishReload { shooter: Entity },
    /// Return a borrowed muzzle flash to its pool.
    ReturnMuzzle { shooter: Entity, handle: PoolHandle },
    /// Return a borrowed impact mark to its pool.
    ReturnImpact { shooter: Entity, handle: PoolHandle },
}

#[derive(Debug)]
struct Scheduled {
    due: f32,
    /// Insertion order; keeps draining FIFO among equal expiries.
    seq: u64,
    action: Deferred,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due.total_cmp(&other.due).is_eq() && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due
            .total_cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Min-heap of scheduled continuations, keyed by simulation time.
#[derive(Resource, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<Scheduled>>,
    seq: u64,
}

impl TimerQueue {
    /// Schedule `action` to resume at absolute simulation time `due`.
    pub fn schedule(&mut self, due: f32, action: Deferred) {
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(Reverse(Scheduled { due, seq, action }));
    }

    /// Schedule `action` to resume `delay` seconds after `now`.
    pub fn schedule_after(&mut self, now: f32, delay: f32, action: Deferred) {
        self.schedule(now + delay, action);
    }

    /// Pop the next continuation whose expiry has elapsed, or `None`.
    /// Continuations are never resumed eagerly.
    pub fn pop_due(&mut self, now: f32) -> Option<Deferred> {
        if self.heap.peek()?.0.due <= now {
            Some(self.heap.pop()?.0.action)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
