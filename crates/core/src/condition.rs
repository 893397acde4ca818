// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Condition registry gating lifecycle actions on peer state
//!
//! A condition says "do not perform this action until every member of a
//! peer group has been in a given state, optionally for a minimum time".
//! Entries registered for the same action are evaluated as a logical AND.

use crate::guid::Guid;
use crate::state::ResourceState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::Duration;

/// Lifecycle action a condition gates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Deploy,
    Start,
    Stop,
    SetAttribute,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Deploy => write!(f, "deploy"),
            Action::Start => write!(f, "start"),
            Action::Stop => write!(f, "stop"),
            Action::SetAttribute => write!(f, "set-attribute"),
        }
    }
}

/// A single gating requirement on a group of peers
///
/// Satisfied when every member of `group` has reached at least `required`
/// and, when `min_elapsed` is set, has held it for that long. `None` means
/// reaching the state is sufficient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionEntry {
    pub group: BTreeSet<Guid>,
    pub required: ResourceState,
    #[serde(default, with = "humantime_serde")]
    pub min_elapsed: Option<Duration>,
}

impl ConditionEntry {
    /// Build an entry; a bare guid passes as a singleton group
    pub fn new(group: impl IntoIterator<Item = Guid>, required: ResourceState) -> Self {
        Self {
            group: group.into_iter().collect(),
            required,
            min_elapsed: None,
        }
    }

    pub fn with_min_elapsed(mut self, min_elapsed: Duration) -> Self {
        self.min_elapsed = Some(min_elapsed);
        self
    }
}

/// Per-resource table of registered conditions, keyed by action
///
/// Mutation happens during experiment build and teardown; evaluation only
/// reads.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConditionTable {
    entries: HashMap<Action, Vec<ConditionEntry>>,
}

impl ConditionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a condition for an action
    pub fn register(&mut self, action: Action, entry: ConditionEntry) {
        self.entries.entry(action).or_default().push(entry);
    }

    /// Remove guids from matching entries' groups (set difference)
    ///
    /// Applies to every action when `action` is `None`. Entries whose group
    /// empties out are dropped.
    pub fn unregister(&mut self, group: &BTreeSet<Guid>, action: Option<Action>) {
        for (key, entries) in self.entries.iter_mut() {
            if let Some(only) = action {
                if only != *key {
                    continue;
                }
            }
            for entry in entries.iter_mut() {
                entry.group.retain(|guid| !group.contains(guid));
            }
            entries.retain(|entry| !entry.group.is_empty());
        }
    }

    /// Registered conditions for an action
    pub fn for_action(&self, action: Action) -> &[ConditionEntry] {
        self.entries.get(&action).map_or(&[], Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
