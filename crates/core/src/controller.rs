// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Experiment controller: owns every resource and pumps the delay queue
//!
//! The controller is the single scheduler for an experiment. Resources do
//! not hold a reference back to it; every operation that needs peer
//! lookup, scheduling, or failure reporting takes the controller as an
//! argument, so ownership stays one-directional.

use crate::clock::Clock;
use crate::condition::{Action, ConditionEntry};
use crate::error::{FactoryError, ResourceError};
use crate::factory::ResourceFactory;
use crate::guid::{Guid, GuidAllocator};
use crate::resource::ResourceManager;
use crate::scheduler::{DelayQueue, PendingCall, ScheduledCall, Scheduler};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// The contract the engine consumes from its controller
///
/// Everything a resource needs from the outside world: the clock, the
/// default reschedule delay, live peer lookup, and failure reporting. The
/// `Scheduler` supertrait contributes the suspension mechanism.
pub trait Experiment: Scheduler {
    type Clock: Clock;

    fn clock(&self) -> &Self::Clock;

    /// Fixed delay used when a condition is unmet with no better estimate
    fn default_delay(&self) -> Duration;

    /// Live resource lookup; returns the instance registered under `guid`
    fn resource(&self, guid: Guid) -> Option<Arc<ResourceManager>>;

    /// Record a failure so the controller can cascade it to dependents
    fn inform_failure(&self, guid: Guid);
}

/// Controller tunables
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Reschedule delay when a condition is unmet with no precise wait
    #[serde(with = "humantime_serde")]
    pub default_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_delay: Duration::from_millis(500),
        }
    }
}

/// Owns the resources of one experiment and drives their scheduling
pub struct Controller<C: Clock> {
    clock: C,
    config: ControllerConfig,
    factory: ResourceFactory,
    guids: GuidAllocator,
    resources: Mutex<HashMap<Guid, Arc<ResourceManager>>>,
    queue: Mutex<DelayQueue>,
    failed: Mutex<HashSet<Guid>>,
}

impl<C: Clock> Controller<C> {
    pub fn new(factory: ResourceFactory, clock: C) -> Self {
        Self {
            clock,
            config: ControllerConfig::default(),
            factory,
            guids: GuidAllocator::new(),
            resources: Mutex::new(HashMap::new()),
            queue: Mutex::new(DelayQueue::new()),
            failed: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Create a resource of a registered type, in state `New`
    pub fn register_resource(&self, type_name: &str) -> Result<Guid, FactoryError> {
        let behavior = self.factory.create(type_name)?;
        let guid = self.guids.next();
        let resource = Arc::new(ResourceManager::new(guid, type_name, behavior));
        self.lock_resources().insert(guid, resource);
        tracing::debug!(%guid, kind = type_name, "resource registered");
        Ok(guid)
    }

    /// Connect two resources as peers (symmetric)
    pub fn register_connection(&self, a: Guid, b: Guid) -> Result<(), ResourceError> {
        let ra = self.resource(a).ok_or(ResourceError::UnknownResource(a))?;
        let rb = self.resource(b).ok_or(ResourceError::UnknownResource(b))?;
        ra.register_connection(b);
        rb.register_connection(a);
        Ok(())
    }

    /// Register a condition gating one of `guid`'s actions
    pub fn register_condition(
        &self,
        guid: Guid,
        action: Action,
        entry: ConditionEntry,
    ) -> Result<(), ResourceError> {
        let resource = self
            .resource(guid)
            .ok_or(ResourceError::UnknownResource(guid))?;
        resource.register_condition(action, entry);
        Ok(())
    }

    /// Remove guids from `guid`'s registered conditions
    pub fn unregister_condition(
        &self,
        guid: Guid,
        group: &BTreeSet<Guid>,
        action: Option<Action>,
    ) -> Result<(), ResourceError> {
        let resource = self
            .resource(guid)
            .ok_or(ResourceError::UnknownResource(guid))?;
        resource.unregister_condition(group, action);
        Ok(())
    }

    /// The deploy pass: one synchronous evaluation per resource
    ///
    /// Resources with unmet conditions reschedule themselves from here;
    /// driver errors mark the resource failed and are logged, not raised,
    /// so one bad resource does not stall the rest of the pass.
    pub fn deploy(&self, guids: &[Guid]) {
        for &guid in guids {
            let Some(resource) = self.resource(guid) else {
                tracing::warn!(%guid, "deploy requested for unknown resource");
                continue;
            };
            if let Err(error) = resource.deploy_with_conditions(self) {
                tracing::error!(%guid, %error, "deploy pass failed");
            }
        }
    }

    /// Drain and dispatch every callback due now; returns how many ran
    pub fn run_ready(&self) -> usize {
        let due = self.lock_queue().poll(self.clock.now());
        let count = due.len();
        for item in due {
            self.dispatch(item);
        }
        count
    }

    /// Time until the next scheduled callback, if any
    pub fn next_fire_in(&self) -> Option<Duration> {
        let next = self.lock_queue().next_fire_time()?;
        Some(next.saturating_duration_since(self.clock.now()))
    }

    /// Number of callbacks currently queued
    pub fn pending_calls(&self) -> usize {
        self.lock_queue().len()
    }

    /// Pump the queue against the wall clock until it drains
    ///
    /// Intended for `SystemClock`-backed controllers; tests drive
    /// `run_ready` with a `FakeClock` instead.
    pub async fn run_until_idle(&self) {
        loop {
            self.run_ready();
            match self.next_fire_in() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => break,
            }
        }
    }

    /// Release one resource; drops it from the registry if `hard_release`
    pub fn release(&self, guid: Guid) {
        let Some(resource) = self.resource(guid) else {
            return;
        };
        resource.release(self);
        if resource.is_hard_release() {
            self.lock_resources().remove(&guid);
            tracing::debug!(%guid, "hard-released resource dropped");
        }
    }

    /// Release every resource (teardown); release never raises
    pub fn release_all(&self) {
        let guids: Vec<Guid> = self.lock_resources().keys().copied().collect();
        for guid in guids {
            self.release(guid);
        }
    }

    /// Whether a failure has been reported for `guid`
    pub fn is_failed(&self, guid: Guid) -> bool {
        self.lock_failed().contains(&guid)
    }

    /// Guids reported failed so far
    pub fn failed_resources(&self) -> BTreeSet<Guid> {
        self.lock_failed().iter().copied().collect()
    }

    fn dispatch(&self, item: ScheduledCall) {
        // dropped by hard release: the callback is stale, nothing to do
        let Some(resource) = self.resource(item.guid) else {
            return;
        };
        let result = match item.call {
            PendingCall::Deploy => resource.deploy_with_conditions(self),
            PendingCall::Start => resource.start_with_conditions(self),
            PendingCall::Stop => resource.stop_with_conditions(self),
            PendingCall::SetAttribute {
                name,
                value,
                condition,
            } => resource.set_attribute_with_conditions(self, &name, &value, condition),
        };
        if let Err(error) = result {
            tracing::error!(guid = %item.guid, %error, "scheduled call failed");
        }
    }

    fn lock_resources(&self) -> MutexGuard<'_, HashMap<Guid, Arc<ResourceManager>>> {
        self.resources.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_queue(&self) -> MutexGuard<'_, DelayQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_failed(&self) -> MutexGuard<'_, HashSet<Guid>> {
        self.failed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Clock> Scheduler for Controller<C> {
    fn schedule(&self, delay: Duration, guid: Guid, call: PendingCall) {
        let fire_at = self.clock.now() + delay;
        let queued = self.lock_queue().push(fire_at, guid, call);
        if queued {
            tracing::debug!(
                %guid,
                delay = %humantime::format_duration(delay),
                "callback scheduled"
            );
        }
    }
}

impl<C: Clock> Experiment for Controller<C> {
    type Clock = C;

    fn clock(&self) -> &C {
        &self.clock
    }

    fn default_delay(&self) -> Duration {
        self.config.default_delay
    }

    fn resource(&self, guid: Guid) -> Option<Arc<ResourceManager>> {
        self.lock_resources().get(&guid).cloned()
    }

    fn inform_failure(&self, guid: Guid) {
        tracing::warn!(%guid, "resource failure reported");
        self.lock_failed().insert(guid);
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
