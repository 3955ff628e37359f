#![forbid(unsafe_code)]

//! Integration tests: control-to-source propagation, echo suppression and
//! validation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use scenebind_core::{BindingMode, HAS_ERRORS, ObservableHost, Value};
use scenebind_harness::fixtures::Player;
use scenebind_harness::headless;

fn name_required(value: &Value) -> Option<String> {
    match value.as_text() {
        Some(text) if !text.trim().is_empty() => None,
        _ => Some("name required".to_owned()),
    }
}

// ============================================================================
// Echo suppression
// ============================================================================

#[test]
fn each_edit_is_read_and_written_once() {
    let (scene, tree, binders) = headless();
    let spin = scene.spawn("%Health", "SpinBox");
    let player = Player::new(tree, binders);
    player
        .bind_property("%Health", "value", "Health", BindingMode::TwoWay, None)
        .unwrap();

    let source_writes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&source_writes);
    let _sub = player.observable().subscribe_property_changed(move |e| {
        if e.property == "Health" {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    spin.reset_counters();

    const EDITS: usize = 25;
    for n in 1..=EDITS {
        spin.user_edit("value", n as f64);
    }

    assert_eq!(player.health(), EDITS as i64);
    assert_eq!(source_writes.load(Ordering::SeqCst), EDITS);
    assert_eq!(spin.read_count(), EDITS);
    assert_eq!(spin.write_count(), 0);
}

#[test]
fn source_change_writes_control_once() {
    let (scene, tree, binders) = headless();
    let spin = scene.spawn("%Health", "SpinBox");
    let player = Player::new(tree, binders);
    player
        .bind_property("%Health", "value", "Health", BindingMode::TwoWay, None)
        .unwrap();
    spin.reset_counters();

    player.set_health(7);

    assert_eq!(spin.property("value"), Value::Float(7.0));
    assert_eq!(spin.write_count(), 1);
    assert_eq!(spin.read_count(), 0);
}

#[test]
fn other_bindings_see_the_edit() {
    let (scene, tree, binders) = headless();
    let edit = scene.spawn("%NameEdit", "LineEdit");
    let label = scene.spawn("%NameLabel", "Label");
    let player = Player::new(tree, binders);
    player
        .bind_property("%NameEdit", "text", "Name", BindingMode::TwoWay, None)
        .unwrap();
    player
        .bind_property("%NameLabel", "text", "Name", BindingMode::OneWay, None)
        .unwrap();

    edit.user_edit("text", "Bea");

    assert_eq!(player.name(), "Bea");
    assert_eq!(label.text("text"), "Bea");
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn failing_validator_blocks_the_write() {
    let (scene, tree, binders) = headless();
    let edit = scene.spawn("%Name", "LineEdit");
    let player = Player::new(tree, binders);
    let handle = player
        .bind_property("%Name", "text", "Name", BindingMode::TwoWay, None)
        .unwrap();
    handle.add_validator(name_required);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let _sub = player
        .observable()
        .subscribe_validation_changed(move |e| sink.lock().unwrap().push(e.clone()));

    edit.user_edit("text", "   ");

    assert_eq!(player.name(), "Ayla");
    {
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(!events[0].is_valid);
        assert_eq!(events[0].binding, handle.id());
        assert_eq!(events[0].property, "text");
        assert_eq!(events[0].message.as_deref(), Some("name required"));
    }
    assert!(player.observable().has_errors());
    assert_eq!(
        player.observable().validation_errors(),
        vec![(handle.id(), "name required".to_owned())]
    );

    edit.user_edit("text", "Bea");
    assert_eq!(player.name(), "Bea");
    assert_eq!(events.lock().unwrap().len(), 2);
    assert!(events.lock().unwrap()[1].is_valid);
    assert!(!player.observable().has_errors());
}

#[test]
fn validators_run_in_order_and_stop_at_first_failure() {
    let (scene, tree, binders) = headless();
    let spin = scene.spawn("%Health", "SpinBox");
    let player = Player::new(tree, binders);
    let second_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&second_calls);

    player
        .bind_property("%Health", "value", "Health", BindingMode::TwoWay, None)
        .unwrap()
        .add_validator(|v| {
            (v.as_float().unwrap_or(0.0) < 0.0).then(|| "negative".to_owned())
        })
        .add_validator(move |v| {
            calls.fetch_add(1, Ordering::SeqCst);
            (v.as_float().unwrap_or(0.0) > 500.0).then(|| "too high".to_owned())
        });

    spin.user_edit("value", -5.0);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    assert_eq!(player.health(), 100);

    spin.user_edit("value", 900.0);
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    assert_eq!(player.health(), 100);

    spin.user_edit("value", 250.0);
    assert_eq!(player.health(), 250);
}

#[test]
fn validation_handler_sees_control_and_message() {
    let (scene, tree, binders) = headless();
    let edit = scene.spawn("%Name", "LineEdit");
    let player = Player::new(tree, binders);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    player
        .bind_property("%Name", "text", "Name", BindingMode::TwoWay, None)
        .unwrap()
        .add_validator(name_required)
        .add_validation_handler(move |control, is_valid, message| {
            sink.lock()
                .unwrap()
                .push((control.kind().to_owned(), is_valid, message.map(str::to_owned)));
        });

    edit.user_edit("text", "");
    edit.user_edit("text", "Zed");

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ("LineEdit".to_owned(), false, Some("name required".to_owned())),
            ("LineEdit".to_owned(), true, None),
        ]
    );
}

#[test]
fn has_errors_is_bindable() {
    let (scene, tree, binders) = headless();
    let edit = scene.spawn("%Name", "LineEdit");
    let badge = scene.spawn("%ErrorBadge", "Label");
    let player = Player::new(tree, binders);
    player
        .bind_property("%Name", "text", "Name", BindingMode::TwoWay, None)
        .unwrap()
        .add_validator(name_required);
    player
        .bind_property("%ErrorBadge", "text", HAS_ERRORS, BindingMode::OneWay, None)
        .unwrap();
    assert_eq!(badge.text("text"), "false");

    edit.user_edit("text", "");
    assert_eq!(badge.text("text"), "true");

    // Still failing: no flip, no extra write.
    let writes = badge.write_count();
    edit.user_edit("text", " ");
    assert_eq!(badge.write_count(), writes);

    edit.user_edit("text", "Bea");
    assert_eq!(badge.text("text"), "false");
}

#[test]
fn one_way_to_target_validates_edits() {
    let (scene, tree, binders) = headless();
    let edit = scene.spawn("%Name", "LineEdit");
    edit.user_edit("text", "Bea");
    let player = Player::new(tree, binders);

    let handle = player
        .bind_property("%Name", "text", "Name", BindingMode::OneWayToTarget, None)
        .unwrap();
    handle.add_validator(name_required);
    assert_eq!(player.name(), "Bea");

    edit.user_edit("text", "");
    assert_eq!(player.name(), "Bea");
    assert!(player.observable().has_errors());
}
