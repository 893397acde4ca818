//! Wall-clock pumping with the async runtime.

use rig_core::{
    Action, ConditionEntry, Controller, ControllerConfig, Experiment, NoOpBehavior,
    ResourceFactory, ResourceState, SystemClock,
};
use std::time::Duration;

#[tokio::test]
async fn run_until_idle_drains_the_queue() {
    let mut factory = ResourceFactory::new();
    factory.register("node", || NoOpBehavior).unwrap();
    let ctl = Controller::new(factory, SystemClock).with_config(ControllerConfig {
        default_delay: Duration::from_millis(10),
    });

    let a = ctl.register_resource("node").unwrap();
    let b = ctl.register_resource("node").unwrap();
    ctl.register_condition(
        a,
        Action::Start,
        ConditionEntry::new([b], ResourceState::Started)
            .with_min_elapsed(Duration::from_millis(30)),
    )
    .unwrap();

    ctl.deploy(&[a, b]);
    ctl.resource(b).unwrap().start(&ctl).unwrap();
    ctl.resource(a).unwrap().start_with_conditions(&ctl).unwrap();

    ctl.run_until_idle().await;

    assert_eq!(ctl.resource(a).unwrap().state(), ResourceState::Started);
    assert_eq!(ctl.pending_calls(), 0);
}
