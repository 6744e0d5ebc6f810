//! Integration tests for the intent → cascade → publish pipeline.
//!
//! Drives [`ZoneService`] directly with the mock channel and sink, so every
//! publish and state change can be asserted in order.

use valvecontrol::app::commands::{AppCommand, Intent, Origin};
use valvecontrol::app::events::ZoneEvent;
use valvecontrol::app::service::ZoneService;
use valvecontrol::config::{Policy, PolicyConfig};
use valvecontrol::error::EngineError;
use valvecontrol::zones::ZoneDefinition;

use crate::mock_channel::{MockChannel, RecordingSink, all_policies, pump_and_lawn, pump_with_two};

fn setup(zones: &[ZoneDefinition], policy: PolicyConfig) -> (ZoneService, MockChannel, RecordingSink) {
    let mut service = ZoneService::new();
    let mut sink = RecordingSink::new();
    service.install_config(zones, policy, &mut sink).unwrap();
    sink.events.clear();
    (service, MockChannel::new(), sink)
}

// ── Activation ────────────────────────────────────────────────

#[test]
fn local_activation_is_idempotent() {
    let (mut s, mut ch, mut sink) = setup(&pump_with_two(), all_policies());

    s.handle_intent(Intent::local(3, true), &mut ch, &mut sink).unwrap();
    assert!(s.is_active(3));
    assert_eq!(ch.take(), vec![(3, true)]);

    s.handle_intent(Intent::local(3, true), &mut ch, &mut sink).unwrap();
    assert!(s.is_active(3));
    assert!(ch.sent().is_empty(), "repeat request must not publish");
}

#[test]
fn dependent_activation_opens_master_first() {
    let (mut s, mut ch, mut sink) = setup(&pump_and_lawn(), all_policies());

    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();

    assert_eq!(ch.sent(), vec![(0, true), (1, true)]);
    assert_eq!(sink.transitions(), vec![(0, true), (1, true)]);
}

#[test]
fn second_dependent_does_not_republish_open_master() {
    let (mut s, mut ch, mut sink) = setup(&pump_with_two(), all_policies());
    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();
    ch.take();

    s.handle_intent(Intent::local(2, true), &mut ch, &mut sink).unwrap();
    assert_eq!(ch.sent(), vec![(2, true)]);
}

#[test]
fn auto_open_master_off_opens_dependent_alone() {
    let policy = all_policies().with(Policy::AutoOpenMaster, false);
    let (mut s, mut ch, mut sink) = setup(&pump_and_lawn(), policy);

    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();
    assert!(!s.is_active(0));
    assert_eq!(ch.sent(), vec![(1, true)]);
}

#[test]
fn disabled_master_is_not_opened() {
    let zones = vec![
        ZoneDefinition::master("Pump").with_enabled(false),
        ZoneDefinition::dependent("Lawn", 0),
    ];
    let (mut s, mut ch, mut sink) = setup(&zones, all_policies());

    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();
    assert!(!s.is_active(0));
    assert_eq!(ch.sent(), vec![(1, true)]);
}

// ── Deactivation ──────────────────────────────────────────────

#[test]
fn closing_master_closes_dependents_first() {
    let (mut s, mut ch, mut sink) = setup(&pump_with_two(), all_policies());
    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();
    s.handle_intent(Intent::local(2, true), &mut ch, &mut sink).unwrap();
    ch.take();

    s.handle_intent(Intent::local(0, false), &mut ch, &mut sink).unwrap();

    let sent = ch.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent[..2].contains(&(1, false)));
    assert!(sent[..2].contains(&(2, false)));
    assert_eq!(sent[2], (0, false), "master closes last");
    assert!(!s.is_active(0) && !s.is_active(1) && !s.is_active(2));
}

#[test]
fn closing_last_dependent_closes_master() {
    let (mut s, mut ch, mut sink) = setup(&pump_with_two(), all_policies());
    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();
    s.handle_intent(Intent::local(2, true), &mut ch, &mut sink).unwrap();
    ch.take();

    s.handle_intent(Intent::local(1, false), &mut ch, &mut sink).unwrap();
    assert!(s.is_active(0), "Beds still needs the pump");
    assert_eq!(ch.take(), vec![(1, false)]);

    s.handle_intent(Intent::local(2, false), &mut ch, &mut sink).unwrap();
    assert!(!s.is_active(0));
    assert_eq!(ch.sent(), vec![(2, false), (0, false)]);
}

#[test]
fn closing_free_zone_sweeps_idle_masters() {
    let (mut s, mut ch, mut sink) = setup(&pump_with_two(), all_policies());
    s.handle_intent(Intent::local(0, true), &mut ch, &mut sink).unwrap();
    s.handle_intent(Intent::local(3, true), &mut ch, &mut sink).unwrap();
    ch.take();

    s.handle_intent(Intent::local(3, false), &mut ch, &mut sink).unwrap();
    assert_eq!(ch.sent(), vec![(3, false), (0, false)]);
}

#[test]
fn auto_close_master_off_leaves_master_open() {
    let policy = all_policies().with(Policy::AutoCloseMaster, false);
    let (mut s, mut ch, mut sink) = setup(&pump_and_lawn(), policy);
    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();
    ch.take();

    s.handle_intent(Intent::local(1, false), &mut ch, &mut sink).unwrap();
    assert!(s.is_active(0));
    assert_eq!(ch.sent(), vec![(1, false)]);
}

#[test]
fn auto_close_dependents_off_leaves_dependents_open() {
    let policy = all_policies().with(Policy::AutoCloseDependents, false);
    let (mut s, mut ch, mut sink) = setup(&pump_and_lawn(), policy);
    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();
    ch.take();

    s.handle_intent(Intent::local(0, false), &mut ch, &mut sink).unwrap();
    assert!(s.is_active(1));
    assert!(!s.is_active(0));
    assert_eq!(ch.sent(), vec![(0, false)]);
}

// ── Echo suppression ──────────────────────────────────────────

#[test]
fn remote_dependent_on_publishes_only_master() {
    let (mut s, mut ch, mut sink) = setup(&pump_and_lawn(), all_policies());

    s.handle_intent(Intent::remote(1, true), &mut ch, &mut sink).unwrap();

    assert!(s.is_active(0) && s.is_active(1));
    assert_eq!(ch.sent(), vec![(0, true)]);
}

#[test]
fn remote_master_off_publishes_dependents_only() {
    let (mut s, mut ch, mut sink) = setup(&pump_with_two(), all_policies());
    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();
    s.handle_intent(Intent::local(2, true), &mut ch, &mut sink).unwrap();
    ch.take();

    s.handle_intent(Intent::remote(0, false), &mut ch, &mut sink).unwrap();

    let mut sent = ch.sent();
    sent.sort_unstable();
    assert_eq!(sent, vec![(1, false), (2, false)]);
    assert!(!s.is_active(0));
    assert_eq!(sink.transitions().last(), Some(&(0, false)));
}

#[test]
fn remote_dependent_off_still_publishes_idle_master() {
    let (mut s, mut ch, mut sink) = setup(&pump_and_lawn(), all_policies());
    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();
    ch.take();

    s.handle_intent(Intent::remote(1, false), &mut ch, &mut sink).unwrap();
    assert_eq!(ch.sent(), vec![(0, false)]);
    assert!(!s.is_active(0));
}

#[test]
fn remote_echo_of_local_command_is_a_no_op() {
    let (mut s, mut ch, mut sink) = setup(&pump_and_lawn(), all_policies());
    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();
    ch.take();
    sink.events.clear();

    s.handle_intent(Intent::remote(0, true), &mut ch, &mut sink).unwrap();
    s.handle_intent(Intent::remote(1, true), &mut ch, &mut sink).unwrap();
    assert!(ch.sent().is_empty());
    assert!(sink.events.is_empty());
}

// ── Pump/Lawn scenario ────────────────────────────────────────

#[test]
fn pump_and_lawn_scenario() {
    let (mut s, mut ch, mut sink) = setup(&pump_and_lawn(), all_policies());

    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();
    assert_eq!(ch.take(), vec![(0, true), (1, true)]);
    assert!(s.is_active(0) && s.is_active(1));

    s.handle_intent(Intent::local(0, false), &mut ch, &mut sink).unwrap();
    assert_eq!(ch.take(), vec![(1, false), (0, false)]);
    assert!(!s.is_active(0) && !s.is_active(1));
}

// ── Rejections and no-ops ─────────────────────────────────────

#[test]
fn disabled_zone_is_ignored() {
    let zones = vec![ZoneDefinition::master("Pump"), ZoneDefinition::dependent("Lawn", 0).with_enabled(false)];
    let (mut s, mut ch, mut sink) = setup(&zones, all_policies());

    s.handle_intent(Intent::remote(1, true), &mut ch, &mut sink).unwrap();

    assert!(!s.is_active(0) && !s.is_active(1));
    assert!(ch.sent().is_empty());
    assert_eq!(
        sink.events,
        vec![ZoneEvent::IntentIgnored { zone: 1, origin: Origin::Remote }]
    );
}

#[test]
fn unknown_zone_fails_without_mutation() {
    let (mut s, mut ch, mut sink) = setup(&pump_and_lawn(), all_policies());
    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();
    ch.take();
    sink.events.clear();

    let err = s.handle_intent(Intent::remote(5, false), &mut ch, &mut sink);
    assert_eq!(err, Err(EngineError::NotFound(5)));
    assert!(s.is_active(0) && s.is_active(1));
    assert!(ch.sent().is_empty());
    assert!(sink.events.is_empty());
}

#[test]
fn stale_master_reference_on_master_is_ignored() {
    let mut pump = ZoneDefinition::master("Pump");
    pump.master_zone = 1;
    let zones = vec![pump, ZoneDefinition::master("Well")];
    let (mut s, mut ch, mut sink) = setup(&zones, all_policies());

    s.handle_intent(Intent::local(0, true), &mut ch, &mut sink).unwrap();
    assert!(!s.is_active(1), "a master never pulls in another master");
    assert_eq!(ch.sent(), vec![(0, true)]);
}

// ── Disconnected channel ──────────────────────────────────────

#[test]
fn state_tracks_locally_while_disconnected() {
    let (mut s, mut ch, mut sink) = setup(&pump_and_lawn(), all_policies());
    ch.set_connected(false);

    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();
    assert!(s.is_active(0) && s.is_active(1));
    assert!(ch.sent().is_empty());

    ch.set_connected(true);
    s.handle_intent(Intent::local(0, false), &mut ch, &mut sink).unwrap();
    assert_eq!(ch.sent(), vec![(1, false), (0, false)]);
}

// ── Configuration changes ─────────────────────────────────────

#[test]
fn policy_change_applies_to_next_intent() {
    let (mut s, mut ch, mut sink) = setup(&pump_and_lawn(), all_policies());
    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();

    s.handle_command(
        AppCommand::SetPolicy { policy: Policy::AutoCloseMaster, on: false },
        &mut ch,
        &mut sink,
    )
    .unwrap();
    assert!(sink.events.iter().any(|e| matches!(e, ZoneEvent::PolicyChanged(_))));
    ch.take();

    s.handle_intent(Intent::local(1, false), &mut ch, &mut sink).unwrap();
    assert!(s.is_active(0));
    assert_eq!(ch.sent(), vec![(1, false)]);
}

#[test]
fn unchanged_policy_emits_nothing() {
    let (mut s, mut ch, mut sink) = setup(&pump_and_lawn(), all_policies());
    s.handle_command(AppCommand::ReplacePolicies(all_policies()), &mut ch, &mut sink)
        .unwrap();
    assert!(sink.events.is_empty());
}

#[test]
fn reinstall_resets_every_zone() {
    let (mut s, mut ch, mut sink) = setup(&pump_with_two(), all_policies());
    s.handle_intent(Intent::local(1, true), &mut ch, &mut sink).unwrap();
    s.handle_intent(Intent::local(3, true), &mut ch, &mut sink).unwrap();
    ch.take();

    s.install_config(&pump_with_two(), all_policies(), &mut sink).unwrap();
    assert!((0..4).all(|z| !s.is_active(z)));
    assert!(ch.sent().is_empty(), "install never publishes");
    assert_eq!(sink.events.last(), Some(&ZoneEvent::ConfigInstalled { zones: 4 }));
}
