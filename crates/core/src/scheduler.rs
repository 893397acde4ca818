// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delay-based scheduling: the engine's only suspension mechanism
//!
//! Nothing in the engine blocks waiting for another resource. A driver
//! that cannot proceed submits a pending call here and returns; the
//! controller pumps the queue and re-enters the driver when the delay has
//! passed.

use crate::condition::ConditionEntry;
use crate::guid::Guid;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

/// Accepts delayed callbacks; implemented by the experiment controller
pub trait Scheduler {
    /// Invoke `call` on `guid`'s resource no earlier than `delay` from now
    fn schedule(&self, delay: Duration, guid: Guid, call: PendingCall);
}

/// A driver invocation captured for later re-dispatch
///
/// Carries everything needed to re-enter the driver, so a callback is a
/// plain value rather than a closure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingCall {
    Deploy,
    Start,
    Stop,
    SetAttribute {
        name: String,
        value: String,
        condition: ConditionEntry,
    },
}

/// Dedup key: at most one pending callback per (resource, kind)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum CallKind {
    Deploy,
    Start,
    Stop,
    SetAttribute(String),
}

impl PendingCall {
    fn kind(&self) -> CallKind {
        match self {
            PendingCall::Deploy => CallKind::Deploy,
            PendingCall::Start => CallKind::Start,
            PendingCall::Stop => CallKind::Stop,
            PendingCall::SetAttribute { name, .. } => CallKind::SetAttribute(name.clone()),
        }
    }
}

impl fmt::Display for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingCall::Deploy => write!(f, "deploy"),
            PendingCall::Start => write!(f, "start"),
            PendingCall::Stop => write!(f, "stop"),
            PendingCall::SetAttribute { name, .. } => write!(f, "set-attribute:{}", name),
        }
    }
}

/// A pending call with its fire time
#[derive(Clone, Debug)]
pub struct ScheduledCall {
    pub guid: Guid,
    pub call: PendingCall,
    pub fire_at: Instant,
    seq: u64,
}

impl PartialEq for ScheduledCall {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq && self.fire_at == other.fire_at
    }
}

impl Eq for ScheduledCall {}

impl PartialOrd for ScheduledCall {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledCall {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: earliest fire time first, submission order for ties
        Reverse(self.fire_at)
            .cmp(&Reverse(other.fire_at))
            .then_with(|| Reverse(self.seq).cmp(&Reverse(other.seq)))
    }
}

/// Min-heap of pending calls, drained by the controller's pump
///
/// Duplicate submissions for the same (resource, kind) are dropped while
/// one is pending, which bounds callback pile-up when a driver re-arms
/// itself each pass. There is no explicit cancellation: a stale callback
/// firing after release hits the `Released` guard and does nothing.
pub struct DelayQueue {
    heap: BinaryHeap<ScheduledCall>,
    pending: HashSet<(Guid, CallKind)>,
    seq: u64,
}

impl DelayQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: HashSet::new(),
            seq: 0,
        }
    }

    /// Push a call; returns false if an equivalent call is already pending
    pub fn push(&mut self, fire_at: Instant, guid: Guid, call: PendingCall) -> bool {
        if !self.pending.insert((guid, call.kind())) {
            return false;
        }
        self.seq += 1;
        self.heap.push(ScheduledCall {
            guid,
            call,
            fire_at,
            seq: self.seq,
        });
        true
    }

    /// Drain every call due at or before `now`, earliest first
    pub fn poll(&mut self, now: Instant) -> Vec<ScheduledCall> {
        let mut due = Vec::new();

        while let Some(next) = self.heap.peek() {
            if next.fire_at > now {
                break;
            }

            let Some(item) = self.heap.pop() else {
                break;
            };

            self.pending.remove(&(item.guid, item.call.kind()));
            due.push(item);
        }

        due
    }

    /// The earliest fire time, if anything is pending
    pub fn next_fire_time(&self) -> Option<Instant> {
        self.heap.peek().map(|item| item.fire_at)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

impl Default for DelayQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
