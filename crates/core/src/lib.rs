//! rig-core: resource lifecycle and condition-gated scheduling for
//! distributed experiment rigs
//!
//! This crate provides:
//! - A per-resource lifecycle state machine with stage timestamps
//! - A condition registry gating deploy/start/stop/set-attribute on peer state
//! - A pure reschedule evaluator with precise minimum-wait delays
//! - A delay queue and the experiment controller that pumps it

pub mod clock;
pub mod guid;

pub mod attrs;
pub mod condition;
pub mod controller;
pub mod error;
pub mod evaluate;
pub mod factory;
pub mod resource;
pub mod scheduler;
pub mod state;

// Re-exports
pub use attrs::AttributeStore;
pub use clock::{Clock, FakeClock, SystemClock};
pub use condition::{Action, ConditionEntry, ConditionTable};
pub use controller::{Controller, ControllerConfig, Experiment};
pub use error::{BehaviorError, ConditionError, FactoryError, ResourceError};
pub use evaluate::{evaluate_entries, needs_reschedule, Reschedule};
pub use factory::ResourceFactory;
pub use guid::{Guid, GuidAllocator};
pub use resource::{
    BehaviorContext, DriverOutcome, NoOpBehavior, ResourceBehavior, ResourceManager,
};
pub use scheduler::{DelayQueue, PendingCall, ScheduledCall, Scheduler};
pub use state::{ResourceState, StateTimes};
