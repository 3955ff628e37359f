#![forbid(unsafe_code)]

//! The control access boundary.
//!
//! Controls belong to the host scene graph. The binding engine sees them
//! through three seams:
//!
//! - [`SceneTree`] resolves a control path to a [`ControlHandle`].
//! - [`ControlBinder`] reads, writes and watches one property of a control
//!   kind; [`ListBinder`] edits the items of list-capable kinds.
//! - [`WeakControl`] is the only reference a binding keeps. It never extends
//!   a control's lifetime.
//!
//! Binders are registered with a [`ControlBinderProvider`], which picks the
//! most recently registered binder that supports a control.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;

use crate::subscription::Subscription;
use crate::value::{DisplayRecord, Value};

/// A control owned by the host scene graph.
pub trait Control: Send + Sync + 'static {
    /// Control kind, used to pick a binder (`"LineEdit"`, `"OptionButton"`).
    fn kind(&self) -> &str;

    /// Downcast hook for binders.
    fn as_any(&self) -> &dyn Any;

    /// Subscribe to the control's destruction signal, if it has one.
    fn on_destroyed(&self, _callback: Box<dyn Fn() + Send + Sync>) -> Option<Subscription> {
        None
    }
}

/// Strong reference to a control, only held transiently.
pub type ControlHandle = Arc<dyn Control>;

/// Non-owning reference to a control.
#[derive(Clone)]
pub struct WeakControl(Weak<dyn Control>);

impl WeakControl {
    #[must_use]
    pub fn new(control: &ControlHandle) -> Self {
        Self(Arc::downgrade(control))
    }

    /// Resolve the reference; `None` once the scene dropped the control.
    #[must_use]
    pub fn upgrade(&self) -> Option<ControlHandle> {
        self.0.upgrade()
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for WeakControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakControl")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Resolves control paths in the host scene.
pub trait SceneTree: Send + Sync {
    fn resolve(&self, path: &str) -> Option<ControlHandle>;
}

/// Callback fired by a control when a watched property changes.
pub type ControlChanged = Box<dyn Fn(&Value) + Send + Sync>;

/// Property access shim for one family of control kinds.
pub trait ControlBinder: Send + Sync {
    fn supports(&self, control: &dyn Control) -> bool;

    fn get(&self, control: &dyn Control, property: &str) -> Option<Value>;

    fn set(&self, control: &dyn Control, property: &str, value: Value);

    /// Watch `property` for edits. `None` if the control cannot report them.
    fn subscribe_change(
        &self,
        control: &dyn Control,
        property: &str,
        callback: ControlChanged,
    ) -> Option<Subscription>;

    /// Item editing for list-capable controls.
    fn as_list(&self, _control: &dyn Control) -> Option<&dyn ListBinder> {
        None
    }
}

/// Incremental item editing of a list control.
pub trait ListBinder: Send + Sync {
    fn insert_item(&self, control: &dyn Control, index: usize, record: &DisplayRecord);

    fn remove_item(&self, control: &dyn Control, index: usize);

    fn set_item(&self, control: &dyn Control, index: usize, record: &DisplayRecord);

    fn clear_items(&self, control: &dyn Control);

    /// Name of the selected-index property, if the control has one.
    fn selection_property(&self, _control: &dyn Control) -> Option<&str> {
        None
    }
}

/// Registry of [`ControlBinder`]s, read on every `bind_*` call.
pub struct ControlBinderProvider {
    binders: ArcSwap<Vec<Arc<dyn ControlBinder>>>,
}

impl ControlBinderProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            binders: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(self, binder: impl ControlBinder + 'static) -> Self {
        self.register(binder);
        self
    }

    /// Add a binder. Later registrations take precedence.
    pub fn register(&self, binder: impl ControlBinder + 'static) {
        let binder: Arc<dyn ControlBinder> = Arc::new(binder);
        self.binders.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&binder));
            next
        });
    }

    /// The binder for `control`, if any supports it.
    #[must_use]
    pub fn binder_for(&self, control: &dyn Control) -> Option<Arc<dyn ControlBinder>> {
        self.binders
            .load()
            .iter()
            .rev()
            .find(|b| b.supports(control))
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.binders.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ControlBinderProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ControlBinderProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlBinderProvider")
            .field("binders", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Knob;

    impl Control for Knob {
        fn kind(&self) -> &str {
            "Knob"
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct FixedBinder {
        kind: &'static str,
        answer: i64,
    }

    impl ControlBinder for FixedBinder {
        fn supports(&self, control: &dyn Control) -> bool {
            control.kind() == self.kind
        }
        fn get(&self, _control: &dyn Control, _property: &str) -> Option<Value> {
            Some(Value::Int(self.answer))
        }
        fn set(&self, _control: &dyn Control, _property: &str, _value: Value) {}
        fn subscribe_change(
            &self,
            _control: &dyn Control,
            _property: &str,
            _callback: ControlChanged,
        ) -> Option<Subscription> {
            None
        }
    }

    #[test]
    fn weak_control_does_not_keep_control_alive() {
        let control: ControlHandle = Arc::new(Knob);
        let weak = WeakControl::new(&control);
        assert!(weak.is_alive());
        assert!(weak.upgrade().is_some());

        drop(control);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn provider_prefers_latest_registration() {
        let provider = ControlBinderProvider::new()
            .with(FixedBinder {
                kind: "Knob",
                answer: 1,
            })
            .with(FixedBinder {
                kind: "Knob",
                answer: 2,
            });
        assert_eq!(provider.len(), 2);

        let binder = provider.binder_for(&Knob).unwrap();
        assert_eq!(binder.get(&Knob, "value"), Some(Value::Int(2)));
    }

    #[test]
    fn provider_without_match() {
        let provider = ControlBinderProvider::new().with(FixedBinder {
            kind: "Slider",
            answer: 0,
        });
        assert!(provider.binder_for(&Knob).is_none());
        assert!(ControlBinderProvider::default().is_empty());
    }
}
