// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource manager: the per-resource lifecycle state machine, its failure
//! trap, and the condition-gated drivers
//!
//! Each resource owns one exclusivity lock guarding its state and stage
//! timestamps. The lock is held for the duration of a transition
//! (including the behavior hook) and never across a reschedule or a peer
//! operation.

use crate::attrs::AttributeStore;
use crate::clock::Clock;
use crate::condition::{Action, ConditionEntry, ConditionTable};
use crate::controller::Experiment;
use crate::error::{BehaviorError, ConditionError, ResourceError};
use crate::evaluate::{evaluate_entries, Reschedule};
use crate::guid::Guid;
use crate::scheduler::PendingCall;
use crate::state::{ResourceState, StateTimes};
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

/// Narrow view handed to behavior hooks
///
/// Hooks run under the resource's exclusivity lock, so they receive the
/// attribute store directly instead of the resource itself.
pub struct BehaviorContext<'a> {
    pub guid: Guid,
    pub type_name: &'a str,
    pub attrs: &'a mut AttributeStore,
}

/// Type-specific lifecycle logic for a concrete resource kind
///
/// Concrete types (compute node, process, link) live in the embedding
/// system; every hook defaults to a no-op so a type implements only the
/// stages it cares about.
pub trait ResourceBehavior: Send + Sync + std::fmt::Debug {
    fn do_discover(&self, _ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        Ok(())
    }

    fn do_reserve(&self, _ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        Ok(())
    }

    fn do_provision(&self, _ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        Ok(())
    }

    fn do_configure(&self, _ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        Ok(())
    }

    fn do_start(&self, _ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        Ok(())
    }

    fn do_stop(&self, _ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        Ok(())
    }

    fn do_release(&self, _ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        Ok(())
    }
}

/// Behavior with no type-specific logic
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpBehavior;

impl ResourceBehavior for NoOpBehavior {}

/// Outcome of one `*_with_conditions` driver pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverOutcome {
    /// The real operation ran
    Dispatched,
    /// A callback was (re)submitted to the scheduler
    Rescheduled(Duration),
    /// The resource is released or already past the target; nothing to do
    Skipped,
}

struct Lifecycle {
    state: ResourceState,
    times: StateTimes,
}

/// One managed resource: current state, stage timestamps, peer set, and
/// registered conditions
pub struct ResourceManager {
    guid: Guid,
    type_name: String,
    behavior: Box<dyn ResourceBehavior>,
    cell: Mutex<Lifecycle>,
    attrs: Mutex<AttributeStore>,
    peers: Mutex<BTreeSet<Guid>>,
    conditions: RwLock<ConditionTable>,
}

impl ResourceManager {
    /// Create a resource in state `New`
    pub fn new(guid: Guid, type_name: impl Into<String>, behavior: Box<dyn ResourceBehavior>) -> Self {
        Self {
            guid,
            type_name: type_name.into(),
            behavior,
            cell: Mutex::new(Lifecycle {
                state: ResourceState::New,
                times: StateTimes::new(),
            }),
            attrs: Mutex::new(AttributeStore::new()),
            peers: Mutex::new(BTreeSet::new()),
            conditions: RwLock::new(ConditionTable::new()),
        }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn state(&self) -> ResourceState {
        self.lock_cell().state
    }

    /// When the resource entered the given stage, if it ever did
    pub fn entered(&self, state: ResourceState) -> Option<Instant> {
        self.lock_cell().times.entered(state)
    }

    // === Attributes ===

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.lock_attrs().get(name).map(str::to_string)
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.lock_attrs().set(name, value);
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.lock_attrs().has_attribute(name)
    }

    /// Whether this resource's failure is fatal to resources waiting on it
    pub fn is_critical(&self) -> bool {
        self.lock_attrs().critical()
    }

    /// Whether the controller should drop this resource after release
    pub fn is_hard_release(&self) -> bool {
        self.lock_attrs().hard_release()
    }

    // === Peer connections ===

    pub fn register_connection(&self, peer: Guid) {
        self.lock_peers().insert(peer);
    }

    pub fn unregister_connection(&self, peer: Guid) {
        self.lock_peers().remove(&peer);
    }

    pub fn connections(&self) -> BTreeSet<Guid> {
        self.lock_peers().clone()
    }

    // === Conditions ===

    pub fn register_condition(&self, action: Action, entry: ConditionEntry) {
        self.conditions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .register(action, entry);
    }

    pub fn unregister_condition(&self, group: &BTreeSet<Guid>, action: Option<Action>) {
        self.conditions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .unregister(group, action);
    }

    /// Snapshot of the registered conditions for an action
    pub fn conditions(&self, action: Action) -> Vec<ConditionEntry> {
        self.conditions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .for_action(action)
            .to_vec()
    }

    // === Lifecycle operations ===

    pub fn discover<E: Experiment>(&self, experiment: &E) -> Result<(), ResourceError> {
        self.advance(experiment, ResourceState::Discovered, "discover", |b, ctx| {
            b.do_discover(ctx)
        })
    }

    pub fn reserve<E: Experiment>(&self, experiment: &E) -> Result<(), ResourceError> {
        self.advance(experiment, ResourceState::Reserved, "reserve", |b, ctx| {
            b.do_reserve(ctx)
        })
    }

    pub fn provision<E: Experiment>(&self, experiment: &E) -> Result<(), ResourceError> {
        self.advance(experiment, ResourceState::Provisioned, "provision", |b, ctx| {
            b.do_provision(ctx)
        })
    }

    pub fn configure<E: Experiment>(&self, experiment: &E) -> Result<(), ResourceError> {
        self.advance(experiment, ResourceState::Ready, "configure", |b, ctx| {
            b.do_configure(ctx)
        })
    }

    /// Run the remaining deployment stages up to `Ready`
    pub fn deploy<E: Experiment>(&self, experiment: &E) -> Result<(), ResourceError> {
        self.discover(experiment)?;
        self.reserve(experiment)?;
        self.provision(experiment)?;
        self.configure(experiment)
    }

    /// Start the resource. Requires `Ready` or `Stopped`.
    pub fn start<E: Experiment>(&self, experiment: &E) -> Result<(), ResourceError> {
        let now = experiment.clock().now();
        let mut cell = self.lock_cell();
        if cell.state.is_terminal() {
            return Ok(());
        }
        if !matches!(cell.state, ResourceState::Ready | ResourceState::Stopped) {
            return Err(ResourceError::WrongState {
                guid: self.guid,
                op: "start",
                state: cell.state,
            });
        }
        match self.run_step(|b, ctx| b.do_start(ctx)) {
            Ok(()) => {
                cell.state = ResourceState::Started;
                cell.times.record(ResourceState::Started, now);
                tracing::debug!(guid = %self.guid, "resource started");
                Ok(())
            }
            Err(source) => self.trap_failure(cell, experiment, "start", source, now),
        }
    }

    /// Stop the resource. Requires `Started`.
    pub fn stop<E: Experiment>(&self, experiment: &E) -> Result<(), ResourceError> {
        let now = experiment.clock().now();
        let mut cell = self.lock_cell();
        if cell.state.is_terminal() {
            return Ok(());
        }
        if cell.state != ResourceState::Started {
            return Err(ResourceError::WrongState {
                guid: self.guid,
                op: "stop",
                state: cell.state,
            });
        }
        match self.run_step(|b, ctx| b.do_stop(ctx)) {
            Ok(()) => {
                cell.state = ResourceState::Stopped;
                cell.times.record(ResourceState::Stopped, now);
                tracing::debug!(guid = %self.guid, "resource stopped");
                Ok(())
            }
            Err(source) => self.trap_failure(cell, experiment, "stop", source, now),
        }
    }

    /// Release the resource
    ///
    /// Never raises: a failing release hook is logged and the resource is
    /// forced to `Released` regardless, because leaving it
    /// reachable-but-broken is worse than an inaccurate release record.
    pub fn release<E: Experiment>(&self, experiment: &E) {
        let now = experiment.clock().now();
        let mut cell = self.lock_cell();
        if cell.state.is_terminal() {
            return;
        }
        if let Err(error) = self.run_step(|b, ctx| b.do_release(ctx)) {
            tracing::warn!(
                guid = %self.guid,
                kind = %self.type_name,
                %error,
                "release hook failed; forcing released"
            );
        }
        cell.state = ResourceState::Released;
        cell.times.record(ResourceState::Released, now);
        tracing::debug!(guid = %self.guid, "resource released");
    }

    /// Force the resource into `Failed` and report it to the controller
    pub fn fail<E: Experiment>(&self, experiment: &E) {
        let now = experiment.clock().now();
        let mut cell = self.lock_cell();
        if cell.state.is_terminal() {
            return;
        }
        cell.state = ResourceState::Failed;
        cell.times.record(ResourceState::Failed, now);
        drop(cell);
        tracing::warn!(guid = %self.guid, kind = %self.type_name, "resource failed");
        experiment.inform_failure(self.guid);
    }

    // === Condition-gated drivers ===

    /// Deploy once every registered deploy condition holds
    pub fn deploy_with_conditions<E: Experiment>(
        &self,
        experiment: &E,
    ) -> Result<DriverOutcome, ResourceError> {
        let state = self.state();
        if state.is_terminal() || state.at_least(ResourceState::Ready) {
            return Ok(DriverOutcome::Skipped);
        }
        match self.evaluate(experiment, Action::Deploy, None) {
            Ok(Reschedule::Proceed) => {
                self.deploy(experiment)?;
                Ok(DriverOutcome::Dispatched)
            }
            Ok(Reschedule::Wait(delay)) => {
                Ok(self.resubmit(experiment, delay, PendingCall::Deploy))
            }
            Err(source) => self.unsatisfiable(experiment, source),
        }
    }

    /// Start once the resource is deployed and every start condition holds
    pub fn start_with_conditions<E: Experiment>(
        &self,
        experiment: &E,
    ) -> Result<DriverOutcome, ResourceError> {
        let state = self.state();
        if state.is_terminal() {
            return Ok(DriverOutcome::Skipped);
        }
        if !matches!(state, ResourceState::Ready | ResourceState::Stopped) {
            // expected while deployment is still in flight: retry, don't raise
            return Ok(self.resubmit(experiment, experiment.default_delay(), PendingCall::Start));
        }
        match self.evaluate(experiment, Action::Start, None) {
            Ok(Reschedule::Proceed) => {
                self.start(experiment)?;
                Ok(DriverOutcome::Dispatched)
            }
            Ok(Reschedule::Wait(delay)) => Ok(self.resubmit(experiment, delay, PendingCall::Start)),
            Err(source) => self.unsatisfiable(experiment, source),
        }
    }

    /// Stop once the resource is running and every stop condition holds
    pub fn stop_with_conditions<E: Experiment>(
        &self,
        experiment: &E,
    ) -> Result<DriverOutcome, ResourceError> {
        let state = self.state();
        if state.is_terminal() {
            return Ok(DriverOutcome::Skipped);
        }
        if state != ResourceState::Started {
            return Ok(self.resubmit(experiment, experiment.default_delay(), PendingCall::Stop));
        }
        match self.evaluate(experiment, Action::Stop, None) {
            Ok(Reschedule::Proceed) => {
                self.stop(experiment)?;
                Ok(DriverOutcome::Dispatched)
            }
            Ok(Reschedule::Wait(delay)) => Ok(self.resubmit(experiment, delay, PendingCall::Stop)),
            Err(source) => self.unsatisfiable(experiment, source),
        }
    }

    /// Set an attribute once this resource is live and the given condition
    /// (plus any registered set-attribute conditions) holds
    ///
    /// Attribute propagation is only meaningful once the destination is
    /// `Started`; until then the call retries on the default delay.
    pub fn set_attribute_with_conditions<E: Experiment>(
        &self,
        experiment: &E,
        name: &str,
        value: &str,
        condition: ConditionEntry,
    ) -> Result<DriverOutcome, ResourceError> {
        let state = self.state();
        if state.is_terminal() {
            return Ok(DriverOutcome::Skipped);
        }
        let pending = || PendingCall::SetAttribute {
            name: name.to_string(),
            value: value.to_string(),
            condition: condition.clone(),
        };
        if state != ResourceState::Started {
            return Ok(self.resubmit(experiment, experiment.default_delay(), pending()));
        }
        match self.evaluate(experiment, Action::SetAttribute, Some(&condition)) {
            Ok(Reschedule::Proceed) => {
                self.set_attribute(name, value);
                tracing::debug!(guid = %self.guid, attribute = name, "attribute propagated");
                Ok(DriverOutcome::Dispatched)
            }
            Ok(Reschedule::Wait(delay)) => Ok(self.resubmit(experiment, delay, pending())),
            Err(source) => self.unsatisfiable(experiment, source),
        }
    }

    // === Internals ===

    fn lock_cell(&self) -> MutexGuard<'_, Lifecycle> {
        self.cell.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_attrs(&self) -> MutexGuard<'_, AttributeStore> {
        self.attrs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_peers(&self) -> MutexGuard<'_, BTreeSet<Guid>> {
        self.peers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Advance to `target` if not already at-or-past it; no-op otherwise
    fn advance<E: Experiment>(
        &self,
        experiment: &E,
        target: ResourceState,
        op: &'static str,
        step: impl FnOnce(&dyn ResourceBehavior, &mut BehaviorContext<'_>) -> Result<(), BehaviorError>,
    ) -> Result<(), ResourceError> {
        let now = experiment.clock().now();
        let mut cell = self.lock_cell();
        if cell.state.is_terminal() || cell.state.at_least(target) {
            return Ok(());
        }
        match self.run_step(step) {
            Ok(()) => {
                cell.state = target;
                cell.times.record(target, now);
                tracing::debug!(guid = %self.guid, state = %target, "resource advanced");
                Ok(())
            }
            Err(source) => self.trap_failure(cell, experiment, op, source, now),
        }
    }

    fn run_step(
        &self,
        step: impl FnOnce(&dyn ResourceBehavior, &mut BehaviorContext<'_>) -> Result<(), BehaviorError>,
    ) -> Result<(), BehaviorError> {
        let mut attrs = self.lock_attrs();
        let mut ctx = BehaviorContext {
            guid: self.guid,
            type_name: &self.type_name,
            attrs: &mut attrs,
        };
        step(self.behavior.as_ref(), &mut ctx)
    }

    /// Failure trap: force `Failed`, log, notify the controller, re-raise
    fn trap_failure<E: Experiment>(
        &self,
        mut cell: MutexGuard<'_, Lifecycle>,
        experiment: &E,
        op: &'static str,
        source: BehaviorError,
        now: Instant,
    ) -> Result<(), ResourceError> {
        cell.state = ResourceState::Failed;
        cell.times.record(ResourceState::Failed, now);
        drop(cell);
        tracing::error!(
            guid = %self.guid,
            kind = %self.type_name,
            op,
            error = %source,
            "lifecycle step failed"
        );
        experiment.inform_failure(self.guid);
        Err(ResourceError::StepFailed {
            guid: self.guid,
            kind: self.type_name.clone(),
            op,
            source,
        })
    }

    fn evaluate<E: Experiment>(
        &self,
        experiment: &E,
        action: Action,
        extra: Option<&ConditionEntry>,
    ) -> Result<Reschedule, ConditionError> {
        let table = self.conditions.read().unwrap_or_else(|e| e.into_inner());
        evaluate_entries(experiment, table.for_action(action).iter().chain(extra))
    }

    fn resubmit<E: Experiment>(
        &self,
        experiment: &E,
        delay: Duration,
        call: PendingCall,
    ) -> DriverOutcome {
        tracing::debug!(
            guid = %self.guid,
            call = %call,
            delay = %humantime::format_duration(delay),
            "conditions pending; rescheduled"
        );
        experiment.schedule(delay, self.guid, call);
        DriverOutcome::Rescheduled(delay)
    }

    fn unsatisfiable<E: Experiment>(
        &self,
        experiment: &E,
        source: ConditionError,
    ) -> Result<DriverOutcome, ResourceError> {
        self.fail(experiment);
        Err(ResourceError::UnsatisfiableCondition {
            guid: self.guid,
            source,
        })
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("guid", &self.guid)
            .field("type_name", &self.type_name)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
