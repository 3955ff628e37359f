#![forbid(unsafe_code)]

//! Integration tests: source-to-control propagation.

use scenebind_core::{BindingMode, ObservableHost, Value, ValueFormatter};
use scenebind_harness::fixtures::{Player, Weapon};
use scenebind_harness::headless;

// ============================================================================
// Scalar properties
// ============================================================================

#[test]
fn label_shows_latest_value() {
    let (scene, tree, binders) = headless();
    let label = scene.spawn("%Health", "Label");
    let player = Player::new(tree, binders);

    player
        .bind_property("%Health", "text", "Health", BindingMode::OneWay, None)
        .unwrap();
    assert_eq!(label.text("text"), "100");

    for hp in [90, 75, 75, 3] {
        player.set_health(hp);
        assert_eq!(label.text("text"), hp.to_string());
    }
    assert_eq!(label.write_count(), 5);
}

#[test]
fn format_control_shapes_display() {
    let (scene, tree, binders) = headless();
    let label = scene.spawn("%Health", "Label");
    let player = Player::new(tree, binders);
    let formatter =
        ValueFormatter::new().with_format_control(|v| Value::from(format!("HP {v}")));

    player
        .bind_property("%Health", "text", "Health", BindingMode::OneWay, Some(formatter))
        .unwrap();
    player.set_health(42);

    assert_eq!(label.text("text"), "HP 42");
}

#[test]
fn one_way_ignores_control_edits() {
    let (scene, tree, binders) = headless();
    let edit = scene.spawn("%Name", "LineEdit");
    let player = Player::new(tree, binders);

    player
        .bind_property("%Name", "text", "Name", BindingMode::OneWay, None)
        .unwrap();
    edit.user_edit("text", "Mallory");

    assert_eq!(player.name(), "Ayla");
}

#[test]
fn invert_bool_drives_disabled_flag() {
    let (scene, tree, binders) = headless();
    let button = scene.spawn("%Attack", "Button");
    let player = Player::new(tree, binders);

    player
        .bind_property(
            "%Attack",
            "disabled",
            "Alive",
            BindingMode::OneWay,
            Some(ValueFormatter::invert_bool()),
        )
        .unwrap();
    assert_eq!(button.property("disabled"), Value::Bool(false));

    player.set_alive(false);
    assert_eq!(button.property("disabled"), Value::Bool(true));
}

#[test]
fn several_controls_on_one_property() {
    let (scene, tree, binders) = headless();
    let a = scene.spawn("Hud/%Name", "Label");
    let b = scene.spawn("Menu/%Name", "Label");
    let player = Player::new(tree, binders);

    for path in ["Hud/%Name", "Menu/%Name"] {
        player
            .bind_property(path, "text", "Name", BindingMode::OneWay, None)
            .unwrap();
    }
    player.set_name("Bea");

    assert_eq!(a.text("text"), "Bea");
    assert_eq!(b.text("text"), "Bea");
    assert_eq!(player.observable().binding_count(), 2);
}

// ============================================================================
// Nested paths
// ============================================================================

#[test]
fn nested_path_follows_reassignment() {
    let (scene, tree, binders) = headless();
    let label = scene.spawn("%Damage", "Label");
    let player = Player::new(tree, binders);

    player
        .bind_property("%Damage", "text", "Weapon.Damage", BindingMode::OneWay, None)
        .unwrap();
    // No weapon yet: the path is broken and the control is left alone.
    assert_eq!(label.write_count(), 0);

    let sword = Weapon::new("Sword", 10);
    player.set_weapon(Some(sword.clone()));
    assert_eq!(label.text("text"), "10");

    sword.set_damage(12);
    assert_eq!(label.text("text"), "12");

    let axe = Weapon::new("Axe", 30);
    player.set_weapon(Some(axe.clone()));
    assert_eq!(label.text("text"), "30");

    sword.set_damage(99);
    assert_eq!(label.text("text"), "30");
    axe.set_damage(31);
    assert_eq!(label.text("text"), "31");

    let writes = label.write_count();
    player.set_weapon(None);
    assert_eq!(label.write_count(), writes);
    assert_eq!(label.text("text"), "31");
}

#[test]
fn nested_two_way_writes_current_leaf_owner() {
    let (scene, tree, binders) = headless();
    let spin = scene.spawn("%Damage", "SpinBox");
    let player = Player::new(tree, binders);
    let sword = Weapon::new("Sword", 10);
    let axe = Weapon::new("Axe", 30);
    player.set_weapon(Some(sword.clone()));

    player
        .bind_property("%Damage", "value", "Weapon.Damage", BindingMode::TwoWay, None)
        .unwrap();
    assert_eq!(spin.property("value"), Value::Float(10.0));

    player.set_weapon(Some(axe.clone()));
    spin.user_edit("value", 44.0);

    assert_eq!(axe.damage(), 44);
    assert_eq!(sword.damage(), 10);
}

// ============================================================================
// One-way to target
// ============================================================================

#[test]
fn one_way_to_target_pulls_control_value() {
    let (scene, tree, binders) = headless();
    let edit = scene.spawn("%Name", "LineEdit");
    edit.user_edit("text", "Bea");
    let player = Player::new(tree, binders);

    player
        .bind_property("%Name", "text", "Name", BindingMode::OneWayToTarget, None)
        .unwrap();
    assert_eq!(player.name(), "Bea");

    edit.user_edit("text", "Cyd");
    assert_eq!(player.name(), "Cyd");

    player.set_name("Dax");
    assert_eq!(edit.text("text"), "Cyd");
    assert_eq!(edit.write_count(), 0);
}

#[test]
fn to_text_round_trips_numbers() {
    let (scene, tree, binders) = headless();
    let edit = scene.spawn("%Health", "LineEdit");
    let player = Player::new(tree, binders);

    player
        .bind_property(
            "%Health",
            "text",
            "Health",
            BindingMode::TwoWay,
            Some(ValueFormatter::to_text()),
        )
        .unwrap();
    assert_eq!(edit.text("text"), "100");

    edit.user_edit("text", "42");
    assert_eq!(player.health(), 42);

    // Not a number: the source refuses it and keeps its value.
    edit.user_edit("text", "lots");
    assert_eq!(player.health(), 42);
}
