// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource lifecycle states and stage timestamps

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::time::Instant;

/// Lifecycle stages a resource passes through
///
/// States are ordered by deployment progress. `Started` and `Stopped` share
/// a rank: both mean "has been deployed", and neither precedes the other.
/// `Released` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    New,
    Discovered,
    Reserved,
    Provisioned,
    Ready,
    Started,
    Stopped,
    Failed,
    Released,
}

impl ResourceState {
    fn rank(self) -> u8 {
        match self {
            ResourceState::New => 0,
            ResourceState::Discovered => 1,
            ResourceState::Reserved => 2,
            ResourceState::Provisioned => 3,
            ResourceState::Ready => 4,
            ResourceState::Started | ResourceState::Stopped => 5,
            ResourceState::Failed => 6,
            ResourceState::Released => 7,
        }
    }

    /// Gating comparison: has this state reached at least `required`?
    pub fn at_least(self, required: ResourceState) -> bool {
        self.rank() >= required.rank()
    }

    /// Whether no further transition is permitted from this state
    pub fn is_terminal(self) -> bool {
        matches!(self, ResourceState::Released)
    }
}

impl PartialOrd for ResourceState {
    /// Rank ordering; `Started` and `Stopped` are unordered peers
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        match self.rank().cmp(&other.rank()) {
            Ordering::Equal => None,
            ord => Some(ord),
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceState::New => "new",
            ResourceState::Discovered => "discovered",
            ResourceState::Reserved => "reserved",
            ResourceState::Provisioned => "provisioned",
            ResourceState::Ready => "ready",
            ResourceState::Started => "started",
            ResourceState::Stopped => "stopped",
            ResourceState::Failed => "failed",
            ResourceState::Released => "released",
        };
        write!(f, "{}", name)
    }
}

/// When each stage was entered, if ever
///
/// Re-entering a stage overwrites its timestamp, so a restarted resource
/// reports its latest `started` time.
#[derive(Clone, Copy, Debug, Default)]
pub struct StateTimes {
    pub discovered: Option<Instant>,
    pub reserved: Option<Instant>,
    pub provisioned: Option<Instant>,
    pub ready: Option<Instant>,
    pub started: Option<Instant>,
    pub stopped: Option<Instant>,
    pub failed: Option<Instant>,
    pub released: Option<Instant>,
}

impl StateTimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record entry into a stage
    pub fn record(&mut self, state: ResourceState, at: Instant) {
        match state {
            ResourceState::New => {}
            ResourceState::Discovered => self.discovered = Some(at),
            ResourceState::Reserved => self.reserved = Some(at),
            ResourceState::Provisioned => self.provisioned = Some(at),
            ResourceState::Ready => self.ready = Some(at),
            ResourceState::Started => self.started = Some(at),
            ResourceState::Stopped => self.stopped = Some(at),
            ResourceState::Failed => self.failed = Some(at),
            ResourceState::Released => self.released = Some(at),
        }
    }

    /// When the given stage was entered, if it ever was
    pub fn entered(&self, state: ResourceState) -> Option<Instant> {
        match state {
            ResourceState::New => None,
            ResourceState::Discovered => self.discovered,
            ResourceState::Reserved => self.reserved,
            ResourceState::Provisioned => self.provisioned,
            ResourceState::Ready => self.ready,
            ResourceState::Started => self.started,
            ResourceState::Stopped => self.stopped,
            ResourceState::Failed => self.failed,
            ResourceState::Released => self.released,
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
