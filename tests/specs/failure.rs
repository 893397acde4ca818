//! Failure trapping and propagation across dependencies.

use crate::prelude::*;
use rig_core::{Action, ConditionEntry, DriverOutcome, Experiment, ResourceError, ResourceState};

#[test]
fn a_failing_hook_fails_the_resource_and_reports_it() {
    let (ctl, _clock) = rig();
    let guid = ctl.register_resource("broken-start").unwrap();
    let rm = ctl.resource(guid).unwrap();
    rm.deploy(&ctl).unwrap();

    let err = rm.start(&ctl).unwrap_err();
    assert!(matches!(err, ResourceError::StepFailed { op: "start", .. }));
    assert_eq!(rm.state(), ResourceState::Failed);
    assert!(rm.entered(ResourceState::Failed).is_some());
    assert!(ctl.is_failed(guid));
}

#[test]
fn critical_dependency_failure_fails_the_waiter() {
    let (ctl, _clock) = rig();
    let a = ctl.register_resource("app").unwrap();
    let b = ctl.register_resource("broken-start").unwrap();
    ctl.register_condition(
        a,
        Action::Start,
        ConditionEntry::new([b], ResourceState::Started),
    )
    .unwrap();

    ctl.deploy(&[a, b]);
    let rb = ctl.resource(b).unwrap();
    assert!(rb.start(&ctl).is_err());
    assert_eq!(rb.state(), ResourceState::Failed);

    // a's driver must fail a rather than poll a dead dependency forever
    let ra = ctl.resource(a).unwrap();
    let err = ra.start_with_conditions(&ctl).unwrap_err();
    assert!(matches!(
        err,
        ResourceError::UnsatisfiableCondition { .. }
    ));
    assert_eq!(ra.state(), ResourceState::Failed);
    assert!(ctl.is_failed(a));
    assert_eq!(ctl.pending_calls(), 0);
}

#[test]
fn non_critical_dependency_failure_is_skipped() {
    let (ctl, _clock) = rig();
    let a = ctl.register_resource("app").unwrap();
    let b = ctl.register_resource("broken-start").unwrap();
    ctl.register_condition(
        a,
        Action::Start,
        ConditionEntry::new([b], ResourceState::Started),
    )
    .unwrap();

    ctl.deploy(&[a, b]);
    let rb = ctl.resource(b).unwrap();
    rb.set_attribute("critical", "false");
    assert!(rb.start(&ctl).is_err());

    let ra = ctl.resource(a).unwrap();
    let outcome = ra.start_with_conditions(&ctl).unwrap();
    assert_eq!(outcome, DriverOutcome::Dispatched);
    assert_eq!(ra.state(), ResourceState::Started);
}

#[test]
fn failed_resources_do_not_block_teardown() {
    let (ctl, _clock) = rig();
    let a = ctl.register_resource("broken-start").unwrap();
    let b = ctl.register_resource("node").unwrap();

    ctl.deploy(&[a, b]);
    assert!(ctl.resource(a).unwrap().start(&ctl).is_err());

    ctl.release_all();
    assert_eq!(ctl.resource(a).unwrap().state(), ResourceState::Released);
    assert_eq!(ctl.resource(b).unwrap().state(), ResourceState::Released);
}
