//! Shared helpers for the rig behavioral specs.

use rig_core::{
    BehaviorContext, BehaviorError, Controller, FakeClock, NoOpBehavior, ResourceBehavior,
    ResourceFactory,
};

/// Behavior whose start hook always fails
#[derive(Clone, Debug)]
pub struct BrokenStart;

impl ResourceBehavior for BrokenStart {
    fn do_start(&self, _ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        Err(BehaviorError::new("start refused"))
    }
}

/// Behavior whose release hook always fails
#[derive(Clone, Debug)]
pub struct BrokenRelease;

impl ResourceBehavior for BrokenRelease {
    fn do_release(&self, _ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        Err(BehaviorError::new("release refused"))
    }
}

/// A controller with the standard spec resource types registered
pub fn rig() -> (Controller<FakeClock>, FakeClock) {
    let mut factory = ResourceFactory::new();
    factory.register("node", || NoOpBehavior).unwrap();
    factory.register("app", || NoOpBehavior).unwrap();
    factory.register("broken-start", || BrokenStart).unwrap();
    factory.register("broken-release", || BrokenRelease).unwrap();
    let clock = FakeClock::new();
    (Controller::new(factory, clock.clone()), clock)
}

/// Advance the fake clock to each scheduled callback and dispatch it,
/// for at most `rounds` wake-ups.
pub fn pump(ctl: &Controller<FakeClock>, clock: &FakeClock, rounds: usize) {
    for _ in 0..rounds {
        let Some(delay) = ctl.next_fire_in() else {
            return;
        };
        clock.advance(delay);
        ctl.run_ready();
    }
}
