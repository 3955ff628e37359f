#![forbid(unsafe_code)]

//! Stock binders for [`TestControl`] kinds.
//!
//! | Kind           | Properties                 | Items | Selection  |
//! |----------------|----------------------------|-------|------------|
//! | `Label`        | `text`                     |       |            |
//! | `LineEdit`     | `text`                     |       |            |
//! | `CheckBox`     | `button_pressed`           |       |            |
//! | `Button`       | `disabled`, `text`         |       |            |
//! | `SpinBox`      | `value`                    |       |            |
//! | `ItemList`     |                            | yes   |            |
//! | `OptionButton` | `selected`                 | yes   | `selected` |
//!
//! Writes are coerced to the property's storage type the way a widget
//! setter would: `text` stores display text, flags store booleans, `value`
//! stores a float.

use scenebind_core::{
    Control, ControlBinder, ControlBinderProvider, ControlChanged, DisplayRecord, ListBinder,
    Subscription, Value,
};

use crate::control::TestControl;

pub const BASIC_KINDS: &[&str] = &["Label", "LineEdit", "CheckBox", "Button", "SpinBox"];
pub const LIST_KINDS: &[&str] = &["ItemList", "OptionButton"];

fn as_test(control: &dyn Control) -> Option<&TestControl> {
    control.as_any().downcast_ref::<TestControl>()
}

fn coerce(property: &str, value: Value) -> Value {
    match property {
        "text" => Value::Text(value.to_string()),
        "button_pressed" | "disabled" => Value::Bool(value.as_bool().unwrap_or(false)),
        "value" => Value::Float(value.as_float().unwrap_or(0.0)),
        "selected" => Value::Int(value.as_int().unwrap_or(-1)),
        _ => value,
    }
}

fn read(control: &dyn Control, property: &str) -> Option<Value> {
    as_test(control)?.read(property)
}

fn write(control: &dyn Control, property: &str, value: Value) {
    if let Some(control) = as_test(control) {
        control.write(property, coerce(property, value));
    }
}

fn watch(control: &dyn Control, property: &str, callback: ControlChanged) -> Option<Subscription> {
    let control = as_test(control)?;
    let property = property.to_owned();
    Some(control.subscribe_changes(move |edit| {
        if edit.property == property {
            callback(&edit.value);
        }
    }))
}

/// Scalar properties of the simple widget kinds.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicBinder;

impl ControlBinder for BasicBinder {
    fn supports(&self, control: &dyn Control) -> bool {
        BASIC_KINDS.contains(&control.kind())
    }

    fn get(&self, control: &dyn Control, property: &str) -> Option<Value> {
        read(control, property)
    }

    fn set(&self, control: &dyn Control, property: &str, value: Value) {
        write(control, property, value);
    }

    fn subscribe_change(
        &self,
        control: &dyn Control,
        property: &str,
        callback: ControlChanged,
    ) -> Option<Subscription> {
        watch(control, property, callback)
    }
}

/// Item lists and option buttons.
#[derive(Clone, Copy, Debug, Default)]
pub struct ListControlBinder;

impl ControlBinder for ListControlBinder {
    fn supports(&self, control: &dyn Control) -> bool {
        LIST_KINDS.contains(&control.kind())
    }

    fn get(&self, control: &dyn Control, property: &str) -> Option<Value> {
        read(control, property)
    }

    fn set(&self, control: &dyn Control, property: &str, value: Value) {
        write(control, property, value);
    }

    fn subscribe_change(
        &self,
        control: &dyn Control,
        property: &str,
        callback: ControlChanged,
    ) -> Option<Subscription> {
        watch(control, property, callback)
    }

    fn as_list(&self, _control: &dyn Control) -> Option<&dyn ListBinder> {
        Some(self)
    }
}

impl ListBinder for ListControlBinder {
    fn insert_item(&self, control: &dyn Control, index: usize, record: &DisplayRecord) {
        if let Some(control) = as_test(control) {
            control.insert_item(index, record.clone());
        }
    }

    fn remove_item(&self, control: &dyn Control, index: usize) {
        if let Some(control) = as_test(control) {
            control.remove_item(index);
        }
    }

    fn set_item(&self, control: &dyn Control, index: usize, record: &DisplayRecord) {
        if let Some(control) = as_test(control) {
            control.set_item(index, record.clone());
        }
    }

    fn clear_items(&self, control: &dyn Control) {
        if let Some(control) = as_test(control) {
            control.clear_items();
        }
    }

    fn selection_property(&self, control: &dyn Control) -> Option<&str> {
        (control.kind() == "OptionButton").then_some("selected")
    }
}

/// Provider preloaded with [`BasicBinder`] and [`ListControlBinder`].
#[must_use]
pub fn standard_binders() -> ControlBinderProvider {
    ControlBinderProvider::new()
        .with(BasicBinder)
        .with(ListControlBinder)
}
