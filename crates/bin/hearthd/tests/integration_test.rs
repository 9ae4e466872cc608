//! End-to-end tests for the full hearthd stack.
//!
//! Each test builds the complete application (in-memory stores, virtual
//! devices, real executor, event bus and rule scheduler) through
//! [`Hearth::build`] and drives it through the stores and devices.

use std::time::Duration;

use serde_json::json;
use tokio::runtime::Handle;

use hearth_adapter_virtual::{LIGHT_ID, SENSOR_ID, SWITCH_ID};
use hearth_app::ports::DeviceRegistry;
use hearth_domain::id::UserId;
use hearth_domain::rule::Rule;
use hearthd::{Config, Hearth};

const SEED: &str = r#"{
    "actions": [
        {"id": 1, "name": "Cool down", "subActions": [
            {"type": 0, "deviceId": 2, "property": "on", "value": true},
            {"type": 2, "category": 1, "message": "fan started"}
        ]},
        {"id": 2, "name": "Later", "subActions": [
            {"type": 2, "category": 3, "message": "reminder", "timeout": 10000}
        ]}
    ],
    "rules": [
        {"name": "Too warm",
         "condition": {"type": "device", "device_id": 3, "property": "temperature",
                       "value1": 25, "compare": "greater"},
         "effect": {"name": "cool", "subActions": [{"type": 5, "actionId": 1}]}},
        {"name": "Freezing",
         "condition": {"type": "device", "device_id": 3, "property": "temperature",
                       "value1": 0, "compare": "less"},
         "effect": {"name": "remind", "subActions": [{"type": 5, "actionId": 2}]}}
    ]
}"#;

fn hearth() -> Hearth {
    Hearth::build(&Config::default(), Handle::current()).expect("stack should build")
}

fn seeded() -> Hearth {
    let hearth = hearth();
    hearth.seed(SEED).expect("seed should load");
    hearth
}

fn nightly_rule(hearth: &Hearth) -> Rule {
    Rule::from_json(
        &json!({
            "name": "Nightly",
            "condition": {"type": "time", "kind": "hour_min_sec", "compare": "equals",
                          "time1": 82_800},
            "effect": {"name": "lights off", "subActions": [
                {"type": 0, "deviceId": 1, "property": "on", "value": false}
            ]}
        }),
        &hearth.registry,
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_register_scheduler_on_bus_when_built() {
    let hearth = hearth();

    assert_eq!(hearth.bus.handler_count(), 1);
    assert_eq!(hearth.devices.devices().len(), 3);
    assert!(!hearth.scheduler.is_running());
}

#[tokio::test]
async fn should_build_without_devices_when_virtual_integration_disabled() {
    let mut config = Config::default();
    config.integrations.virtual_enabled = false;

    let hearth = Hearth::build(&config, Handle::current()).unwrap();

    assert!(hearth.devices.devices().is_empty());
}

#[tokio::test]
async fn should_fail_to_build_when_seed_file_is_missing() {
    let mut config = Config::default();
    config.storage.seed_file = Some("does/not/exist.json".into());

    let result = Hearth::build(&config, Handle::current());

    assert!(result.is_err());
}

#[tokio::test]
async fn should_seed_stores() {
    let hearth = hearth();

    let summary = hearth.seed(SEED).unwrap();

    assert_eq!(summary.actions, 2);
    assert_eq!(summary.rules, 2);
    assert_eq!(hearth.rules.len(), 2);
}

// ---------------------------------------------------------------------------
// Event-driven rules
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn should_run_rule_effect_when_sensor_crosses_threshold() {
    let hearth = seeded();
    let mut notifications = hearth.notifier.subscribe();

    hearth
        .devices
        .simulate(SENSOR_ID, "temperature", json!(30))
        .unwrap();

    let switch = hearth
        .devices
        .get_device(SWITCH_ID, UserId::SYSTEM)
        .unwrap()
        .unwrap();
    assert_eq!(switch.property_value("on"), Some(&json!(true)));
    let payload = notifications.try_recv().unwrap();
    assert_eq!(payload["notification"]["message"], "fan started");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn should_not_run_effect_when_condition_does_not_hold() {
    let hearth = seeded();

    hearth
        .devices
        .simulate(SENSOR_ID, "temperature", json!(22))
        .unwrap();

    let switch = hearth
        .devices
        .get_device(SWITCH_ID, UserId::SYSTEM)
        .unwrap()
        .unwrap();
    assert_eq!(switch.property_value("on"), Some(&json!(false)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn should_deliver_delayed_notification_after_timeout() {
    let mut config = Config::default();
    config.automation.max_sub_action_delay_ms = 50;
    let hearth = Hearth::build(&config, Handle::current()).unwrap();
    hearth.seed(SEED).unwrap();
    let mut notifications = hearth.notifier.subscribe();

    hearth
        .devices
        .simulate(SENSOR_ID, "temperature", json!(-5))
        .unwrap();
    assert_eq!(hearth.executor.pending_count(), 1);

    let payload = tokio::time::timeout(Duration::from_secs(2), notifications.recv())
        .await
        .expect("delayed notification should arrive")
        .unwrap();
    assert_eq!(payload["notification"]["message"], "reminder");
}

// ---------------------------------------------------------------------------
// Time-based rules
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn should_queue_time_rule_added_after_start() {
    let hearth = seeded();
    hearth.start().unwrap();

    let id = hearth
        .rules
        .add(nightly_rule(&hearth), Some(UserId::new(1)))
        .unwrap();

    assert_eq!(hearth.scheduler.queued(), vec![id]);
    assert!(hearth.scheduler.next_wake().is_some());
    hearth.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn should_dequeue_time_rule_when_removed() {
    let hearth = hearth();
    let id = hearth.rules.add(nightly_rule(&hearth), None).unwrap();
    hearth.start().unwrap();
    assert_eq!(hearth.scheduler.queued(), vec![id]);

    hearth.rules.remove(id, None).unwrap();

    assert!(hearth.scheduler.queued().is_empty());
    hearth.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn should_dequeue_time_rule_when_disabled() {
    let hearth = hearth();
    let id = hearth.rules.add(nightly_rule(&hearth), None).unwrap();
    hearth.start().unwrap();

    let mut rule = hearth.rules.get_rule(id).unwrap();
    rule.enabled = false;
    hearth.rules.update(rule, None).unwrap();

    assert!(!hearth.scheduler.is_queued(id));
    hearth.shutdown();
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn should_cancel_delayed_work_and_stop_scheduler_on_shutdown() {
    let hearth = seeded();
    hearth.start().unwrap();
    let mut notifications = hearth.notifier.subscribe();
    hearth
        .devices
        .simulate(SENSOR_ID, "temperature", json!(-5))
        .unwrap();

    hearth.shutdown();

    assert!(!hearth.scheduler.is_running());
    assert_eq!(hearth.bus.handler_count(), 0);
    assert_eq!(hearth.executor.pending_count(), 0);
    hearth.shutdown();
    assert!(notifications.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn should_leave_devices_untouched_after_shutdown() {
    let hearth = seeded();
    hearth.shutdown();

    hearth
        .devices
        .simulate(SENSOR_ID, "temperature", json!(30))
        .unwrap();

    let light = hearth
        .devices
        .get_device(LIGHT_ID, UserId::SYSTEM)
        .unwrap()
        .unwrap();
    let switch = hearth
        .devices
        .get_device(SWITCH_ID, UserId::SYSTEM)
        .unwrap()
        .unwrap();
    assert_eq!(light.property_value("on"), Some(&json!(false)));
    assert_eq!(switch.property_value("on"), Some(&json!(false)));
}
