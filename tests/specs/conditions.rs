//! Condition-gated scheduling across peers.

use crate::prelude::*;
use rig_core::{Action, ConditionEntry, DriverOutcome, Experiment, ResourceState};
use std::time::Duration;

#[test]
fn start_waits_until_the_peer_has_started() {
    let (ctl, clock) = rig();
    let a = ctl.register_resource("app").unwrap();
    let b = ctl.register_resource("node").unwrap();
    ctl.register_connection(a, b).unwrap();
    ctl.register_condition(
        a,
        Action::Start,
        ConditionEntry::new([b], ResourceState::Started),
    )
    .unwrap();

    ctl.deploy(&[a]);
    let ra = ctl.resource(a).unwrap();
    let outcome = ra.start_with_conditions(&ctl).unwrap();
    assert!(matches!(outcome, DriverOutcome::Rescheduled(_)));

    // b is still New: the driver keeps polling without starting a
    pump(&ctl, &clock, 3);
    assert_eq!(ra.state(), ResourceState::Ready);

    let rb = ctl.resource(b).unwrap();
    rb.deploy(&ctl).unwrap();
    rb.start(&ctl).unwrap();

    // the next scheduled evaluation goes through
    pump(&ctl, &clock, 2);
    assert_eq!(ra.state(), ResourceState::Started);
}

#[test]
fn min_elapsed_wakes_exactly_when_the_condition_can_hold() {
    let (ctl, clock) = rig();
    let a = ctl.register_resource("app").unwrap();
    let b = ctl.register_resource("node").unwrap();
    ctl.register_condition(
        a,
        Action::Start,
        ConditionEntry::new([b], ResourceState::Started).with_min_elapsed(Duration::from_secs(2)),
    )
    .unwrap();

    ctl.deploy(&[a, b]);
    let rb = ctl.resource(b).unwrap();
    rb.start(&ctl).unwrap();

    // one second into the two-second requirement: one second remains,
    // not the default polling delay
    clock.advance(Duration::from_secs(1));
    let ra = ctl.resource(a).unwrap();
    let outcome = ra.start_with_conditions(&ctl).unwrap();
    assert_eq!(outcome, DriverOutcome::Rescheduled(Duration::from_secs(1)));

    // past the requirement the queued evaluation dispatches
    clock.advance(Duration::from_millis(1100));
    ctl.run_ready();
    assert_eq!(ra.state(), ResourceState::Started);
}

#[test]
fn deploy_order_follows_deploy_conditions() {
    let (ctl, clock) = rig();
    let server = ctl.register_resource("app").unwrap();
    let client = ctl.register_resource("app").unwrap();
    ctl.register_condition(
        client,
        Action::Deploy,
        ConditionEntry::new([server], ResourceState::Ready),
    )
    .unwrap();

    // one pass over both; the client defers itself
    ctl.deploy(&[client, server]);
    assert_eq!(ctl.resource(server).unwrap().state(), ResourceState::Ready);
    assert_eq!(ctl.resource(client).unwrap().state(), ResourceState::New);

    pump(&ctl, &clock, 2);
    assert_eq!(ctl.resource(client).unwrap().state(), ResourceState::Ready);
}

#[test]
fn stop_can_be_gated_on_a_peer_group() {
    let (ctl, clock) = rig();
    let a = ctl.register_resource("app").unwrap();
    let b = ctl.register_resource("app").unwrap();
    ctl.register_condition(
        a,
        Action::Stop,
        ConditionEntry::new([b], ResourceState::Stopped),
    )
    .unwrap();

    ctl.deploy(&[a, b]);
    let ra = ctl.resource(a).unwrap();
    let rb = ctl.resource(b).unwrap();
    ra.start(&ctl).unwrap();
    rb.start(&ctl).unwrap();

    let outcome = ra.stop_with_conditions(&ctl).unwrap();
    assert!(matches!(outcome, DriverOutcome::Rescheduled(_)));
    assert_eq!(ra.state(), ResourceState::Started);

    rb.stop(&ctl).unwrap();
    pump(&ctl, &clock, 2);
    assert_eq!(ra.state(), ResourceState::Stopped);
}

#[test]
fn attribute_propagation_waits_for_target_and_condition() {
    let (ctl, clock) = rig();
    let sink = ctl.register_resource("app").unwrap();
    let source = ctl.register_resource("node").unwrap();

    ctl.deploy(&[sink, source]);
    let rs = ctl.resource(sink).unwrap();

    // the sink is only Ready: the set retries without touching attributes
    let condition = ConditionEntry::new([source], ResourceState::Started);
    let outcome = rs
        .set_attribute_with_conditions(&ctl, "endpoint", "10.0.0.2:9000", condition)
        .unwrap();
    assert!(matches!(outcome, DriverOutcome::Rescheduled(_)));
    assert!(!rs.has_attribute("endpoint"));

    rs.start(&ctl).unwrap();
    ctl.resource(source).unwrap().start(&ctl).unwrap();

    pump(&ctl, &clock, 2);
    assert_eq!(rs.get_attribute("endpoint"), Some("10.0.0.2:9000".into()));
}

#[test]
fn registered_set_attribute_conditions_gate_too() {
    let (ctl, clock) = rig();
    let sink = ctl.register_resource("app").unwrap();
    let source = ctl.register_resource("node").unwrap();
    let extra = ctl.register_resource("node").unwrap();

    // a standing condition on every attribute set, plus the per-call one
    ctl.register_condition(
        sink,
        Action::SetAttribute,
        ConditionEntry::new([extra], ResourceState::Ready),
    )
    .unwrap();

    ctl.deploy(&[sink, source]);
    let rs = ctl.resource(sink).unwrap();
    rs.start(&ctl).unwrap();
    ctl.resource(source).unwrap().start(&ctl).unwrap();

    let condition = ConditionEntry::new([source], ResourceState::Started);
    let outcome = rs
        .set_attribute_with_conditions(&ctl, "rate", "5mbit", condition)
        .unwrap();
    // the per-call condition holds but the registered one does not
    assert!(matches!(outcome, DriverOutcome::Rescheduled(_)));
    assert!(!rs.has_attribute("rate"));

    ctl.deploy(&[extra]);
    pump(&ctl, &clock, 2);
    assert_eq!(rs.get_attribute("rate"), Some("5mbit".into()));
}

#[test]
fn unregistering_a_condition_unblocks_the_driver() {
    let (ctl, clock) = rig();
    let a = ctl.register_resource("app").unwrap();
    let b = ctl.register_resource("node").unwrap();
    ctl.register_condition(
        a,
        Action::Start,
        ConditionEntry::new([b], ResourceState::Started),
    )
    .unwrap();

    ctl.deploy(&[a]);
    let ra = ctl.resource(a).unwrap();
    ra.start_with_conditions(&ctl).unwrap();
    pump(&ctl, &clock, 1);
    assert_eq!(ra.state(), ResourceState::Ready);

    // drop b from the condition; the group empties and the entry goes away
    ctl.unregister_condition(a, &[b].into_iter().collect(), None)
        .unwrap();

    pump(&ctl, &clock, 2);
    assert_eq!(ra.state(), ResourceState::Started);
}
