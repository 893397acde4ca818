// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reschedule evaluator: decides whether a gated action must wait
//!
//! Pure with respect to its inputs aside from reading live peer state;
//! for a fixed snapshot of peer states and a fixed clock reading the
//! result is deterministic.

use crate::clock::Clock;
use crate::condition::ConditionEntry;
use crate::controller::Experiment;
use crate::error::ConditionError;
use crate::guid::Guid;
use crate::state::ResourceState;
use std::collections::BTreeSet;
use std::time::Duration;

/// Outcome of evaluating a condition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reschedule {
    /// All requirements satisfied; the action may dispatch now
    Proceed,
    /// Wait at least this long before re-evaluating
    Wait(Duration),
}

/// Evaluate one (group, state, min-elapsed) requirement
///
/// Failed peers are fatal when critical and skipped otherwise. A peer that
/// has not reached `required` reports the default delay and short-circuits
/// the pass. A peer still serving `min_elapsed` reports exactly the
/// remaining wait, so the engine wakes when the condition can first hold
/// instead of polling.
pub fn needs_reschedule<E: Experiment>(
    experiment: &E,
    group: &BTreeSet<Guid>,
    required: ResourceState,
    min_elapsed: Option<Duration>,
) -> Result<Reschedule, ConditionError> {
    let now = experiment.clock().now();

    for &guid in group {
        let peer = experiment
            .resource(guid)
            .ok_or(ConditionError::UnknownPeer(guid))?;

        let state = peer.state();
        if state == ResourceState::Failed {
            if peer.is_critical() {
                return Err(ConditionError::CriticalPeerFailed(guid));
            }
            continue;
        }

        if !state.at_least(required) {
            return Ok(Reschedule::Wait(experiment.default_delay()));
        }

        if let Some(min_elapsed) = min_elapsed {
            match peer.entered(required) {
                Some(at) => {
                    let waited = now.saturating_duration_since(at);
                    if waited < min_elapsed {
                        return Ok(Reschedule::Wait(min_elapsed - waited));
                    }
                }
                // rank reached but the stage itself was skipped
                None => return Ok(Reschedule::Wait(experiment.default_delay())),
            }
        }
    }

    Ok(Reschedule::Proceed)
}

/// Evaluate a full condition set, returning the longest required wait
///
/// Entries AND together; the accumulated delay is the maximum across unmet
/// entries so one wake-up can re-check all of them.
pub fn evaluate_entries<'a, E, I>(experiment: &E, entries: I) -> Result<Reschedule, ConditionError>
where
    E: Experiment,
    I: IntoIterator<Item = &'a ConditionEntry>,
{
    let mut wait: Option<Duration> = None;

    for entry in entries {
        match needs_reschedule(experiment, &entry.group, entry.required, entry.min_elapsed)? {
            Reschedule::Proceed => {}
            Reschedule::Wait(delay) => {
                wait = Some(wait.map_or(delay, |w| w.max(delay)));
            }
        }
    }

    Ok(wait.map_or(Reschedule::Proceed, Reschedule::Wait))
}

#[cfg(test)]
#[path = "evaluate_tests.rs"]
mod tests;
