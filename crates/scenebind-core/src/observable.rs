#![forbid(unsafe_code)]

//! Observable objects and the binding registration API.
//!
//! An application type becomes bindable by embedding an
//! [`ObservableObject`], implementing [`Bindable`] (named property access
//! plus the notifier) and [`ObservableHost`] (access to the embedded
//! object). The `bind_*` methods then live on `Arc<Self>`:
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use scenebind_core::*;
//!
//! struct NoScene;
//! impl SceneTree for NoScene {
//!     fn resolve(&self, _path: &str) -> Option<ControlHandle> {
//!         None
//!     }
//! }
//!
//! struct Player {
//!     observable: ObservableObject,
//!     health: Mutex<i64>,
//! }
//!
//! impl Bindable for Player {
//!     fn notifier(&self) -> &ChangeNotifier {
//!         self.observable.notifier()
//!     }
//!     fn get_property(&self, name: &str) -> Option<Value> {
//!         (name == "Health").then(|| Value::Int(*self.health.lock().unwrap()))
//!     }
//! }
//!
//! impl ObservableHost for Player {
//!     fn observable(&self) -> &ObservableObject {
//!         &self.observable
//!     }
//! }
//!
//! let player = Arc::new(Player {
//!     observable: ObservableObject::new(Arc::new(NoScene), Arc::new(ControlBinderProvider::new())),
//!     health: Mutex::new(100),
//! });
//! let err = player
//!     .bind_property("%HealthLabel", "text", "Health", BindingMode::OneWay, None)
//!     .unwrap_err();
//! assert!(matches!(err, ResolutionError::ControlNotFound { .. }));
//! assert_eq!(player.observable().binding_count(), 0);
//! ```
//!
//! # Invariants
//!
//! 1. A failed resolution creates no binding; the error is returned and
//!    logged at `warn`.
//! 2. Bindings are registered in the owner's registry and dropped with it.
//! 3. `has_errors` reflects the latest validation outcome of every binding;
//!    each flip notifies [`HAS_ERRORS`].

use std::fmt;
use std::sync::{Arc, Mutex};

use ahash::AHashMap;

use crate::binding::{Binding, BindingHandle, BindingId, ValidationChanged};
use crate::config::{BindingConfiguration, BindingMode, NoSelection, ObservableConfig};
use crate::control::{ControlBinder, ControlBinderProvider, ControlHandle, SceneTree};
use crate::error::{PropertyError, ResolutionError};
use crate::formatter::ValueFormatter;
use crate::list::ObservableList;
use crate::notifier::{ChangeNotifier, ObjectId, PropertyChanged};
use crate::path::PropertyPath;
use crate::subscription::{ListenerSet, Subscription, lock};
use crate::value::{BindableEnum, EnumValue, Value};

/// Property notified whenever [`ObservableObject::has_errors`] flips.
pub const HAS_ERRORS: &str = "HasErrors";

/// Named property access over an application object.
///
/// `get_property` returns `None` for names the object does not expose.
/// Objects nested in a path are exposed as [`Value::Object`].
pub trait Bindable: Send + Sync + 'static {
    fn notifier(&self) -> &ChangeNotifier;

    fn get_property(&self, name: &str) -> Option<Value>;

    /// Store a value coming from a control. Read-only unless overridden.
    fn set_property(&self, name: &str, value: Value) -> Result<(), PropertyError> {
        let _ = value;
        Err(PropertyError::read_only(name))
    }
}

// ---------------------------------------------------------------------------
// ObservableObject
// ---------------------------------------------------------------------------

/// Binding state embedded in every bindable application object.
pub struct ObservableObject {
    notifier: ChangeNotifier,
    scene: Arc<dyn SceneTree>,
    binders: Arc<ControlBinderProvider>,
    config: ObservableConfig,
    validation: Arc<ListenerSet<ValidationChanged>>,
    errors: Arc<Mutex<AHashMap<BindingId, String>>>,
    _error_tracking: Subscription,
}

impl ObservableObject {
    #[must_use]
    pub fn new(scene: Arc<dyn SceneTree>, binders: Arc<ControlBinderProvider>) -> Self {
        Self::with_config(scene, binders, ObservableConfig::default())
    }

    #[must_use]
    pub fn with_config(
        scene: Arc<dyn SceneTree>,
        binders: Arc<ControlBinderProvider>,
        config: ObservableConfig,
    ) -> Self {
        let notifier = ChangeNotifier::with_policy(config.sweep);
        let validation = Arc::new(ListenerSet::new());
        let errors: Arc<Mutex<AHashMap<BindingId, String>>> = Arc::default();

        let error_tracking = {
            let errors = Arc::clone(&errors);
            let notifier = notifier.clone();
            validation.subscribe(move |event: &ValidationChanged| {
                let (before, after) = {
                    let mut errors = lock(&errors);
                    let before = !errors.is_empty();
                    if event.is_valid {
                        errors.remove(&event.binding);
                    } else {
                        errors.insert(event.binding, event.message.clone().unwrap_or_default());
                    }
                    (before, !errors.is_empty())
                };
                if before != after {
                    notifier.notify(HAS_ERRORS);
                }
            })
        };

        Self {
            notifier,
            scene,
            binders,
            config,
            validation,
            errors,
            _error_tracking: error_tracking,
        }
    }

    #[must_use]
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.notifier.id()
    }

    #[must_use]
    pub fn config(&self) -> &ObservableConfig {
        &self.config
    }

    #[must_use]
    pub fn scene(&self) -> &Arc<dyn SceneTree> {
        &self.scene
    }

    #[must_use]
    pub fn binders(&self) -> &Arc<ControlBinderProvider> {
        &self.binders
    }

    /// Broadcast a property change. See [`ChangeNotifier::notify`].
    pub fn notify(&self, property: &str) {
        self.notifier.notify(property);
    }

    /// Assign and notify. See [`ChangeNotifier::set_and_notify`].
    pub fn set_value<T>(&self, slot: &Mutex<T>, value: T, property: &str) {
        self.notifier.set_and_notify(slot, value, property);
    }

    pub fn subscribe_property_changed(
        &self,
        callback: impl Fn(&PropertyChanged) + Send + Sync + 'static,
    ) -> Subscription {
        self.notifier.subscribe(callback)
    }

    /// Observe validation outcomes of every binding of this object.
    pub fn subscribe_validation_changed(
        &self,
        callback: impl Fn(&ValidationChanged) + Send + Sync + 'static,
    ) -> Subscription {
        self.validation.subscribe(callback)
    }

    /// Whether any binding's latest validation failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !lock(&self.errors).is_empty()
    }

    /// Latest failure message per binding, ordered by binding id.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<(BindingId, String)> {
        let mut errors: Vec<_> = lock(&self.errors)
            .iter()
            .map(|(id, message)| (*id, message.clone()))
            .collect();
        errors.sort_by_key(|(id, _)| *id);
        errors
    }

    /// Bindings currently held, invalid ones included until swept.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.notifier.registry().len()
    }

    #[must_use]
    pub fn bindings(&self) -> Vec<BindingHandle> {
        self.notifier
            .registry()
            .snapshot()
            .iter()
            .map(Binding::handle)
            .collect()
    }

    /// Prune invalid bindings now, on the calling thread. Returns the count removed.
    pub fn sweep_now(&self) -> usize {
        self.notifier.registry().prune_invalid()
    }

    /// Block until a background sweep in flight has finished.
    pub fn wait_for_sweep(&self) {
        self.notifier.registry().wait_for_sweep();
    }

    // -- registration --------------------------------------------------------

    fn resolve_target(
        &self,
        control_path: &str,
    ) -> Result<(ControlHandle, Arc<dyn ControlBinder>), ResolutionError> {
        let control =
            self.scene
                .resolve(control_path)
                .ok_or_else(|| ResolutionError::ControlNotFound {
                    path: control_path.to_owned(),
                })?;
        let binder =
            self.binders
                .binder_for(&*control)
                .ok_or_else(|| ResolutionError::UnsupportedControl {
                    path: control_path.to_owned(),
                    kind: control.kind().to_owned(),
                })?;
        Ok((control, binder))
    }

    fn install(
        &self,
        root: &Arc<dyn Bindable>,
        config: BindingConfiguration,
        binder: Arc<dyn ControlBinder>,
    ) -> BindingHandle {
        let binding = Binding::new(
            config,
            binder,
            Arc::downgrade(root),
            Arc::clone(&self.validation),
        );
        binding.bind_control();
        tracing::debug!(
            binding_id = binding.id().get(),
            control_path = binding.config().control_path(),
            path = %binding.config().path(),
            mode = ?binding.config().mode(),
            "binding created"
        );
        let handle = binding.handle();
        self.notifier.registry().add(binding);
        handle
    }

    pub(crate) fn attach_property(
        &self,
        root: &Arc<dyn Bindable>,
        control_path: &str,
        control_property: &str,
        source_path: &str,
        mode: BindingMode,
        formatter: Option<ValueFormatter>,
    ) -> Result<BindingHandle, ResolutionError> {
        let path = PropertyPath::parse(source_path);
        if path.is_empty() {
            return Err(report(control_path, ResolutionError::EmptySourcePath));
        }
        let (control, binder) = self
            .resolve_target(control_path)
            .map_err(|e| report(control_path, e))?;
        let config =
            BindingConfiguration::property(mode, &control, control_path, control_property, path)
                .with_formatter(formatter);
        Ok(self.install(root, config, binder))
    }

    pub(crate) fn attach_list(
        &self,
        root: &Arc<dyn Bindable>,
        control_path: &str,
        source_path: &str,
        mode: BindingMode,
        formatter: Option<ValueFormatter>,
    ) -> Result<BindingHandle, ResolutionError> {
        let path = PropertyPath::parse(source_path);
        if path.is_empty() {
            return Err(report(control_path, ResolutionError::EmptySourcePath));
        }
        let (control, binder) = self
            .resolve_target(control_path)
            .map_err(|e| report(control_path, e))?;
        if binder.as_list(&*control).is_none() {
            let error = ResolutionError::NotAListControl {
                path: control_path.to_owned(),
                kind: control.kind().to_owned(),
            };
            return Err(report(control_path, error));
        }
        if mode.writes_source() {
            tracing::debug!(
                control_path,
                ?mode,
                "list bindings only propagate source to control"
            );
        }
        let config = BindingConfiguration::list(mode, &control, control_path, path)
            .with_formatter(formatter);
        Ok(self.install(root, config, binder))
    }

    pub(crate) fn attach_enum<E: BindableEnum>(
        &self,
        root: &Arc<dyn Bindable>,
        control_path: &str,
        selected_path: Option<&str>,
    ) -> Result<BindingHandle, ResolutionError> {
        let (control, binder) = self
            .resolve_target(control_path)
            .map_err(|e| report(control_path, e))?;
        let Some(list_binder) = binder.as_list(&*control) else {
            let error = ResolutionError::NotAListControl {
                path: control_path.to_owned(),
                kind: control.kind().to_owned(),
            };
            return Err(report(control_path, error));
        };
        let selection = list_binder.selection_property(&*control).map(str::to_owned);
        let selected_path = selected_path
            .map(PropertyPath::parse)
            .filter(|path| !path.is_empty());
        if selected_path.is_some() && selection.is_none() {
            let error = ResolutionError::MissingSelection {
                path: control_path.to_owned(),
                kind: control.kind().to_owned(),
            };
            return Err(report(control_path, error));
        }

        let items: ObservableList<EnumValue> =
            E::variants().iter().map(|v| v.to_enum_value()).collect();
        let items_config = BindingConfiguration::list(
            BindingMode::OneWay,
            &control,
            control_path,
            PropertyPath::default(),
        )
        .with_target_override(Arc::new(items.clone()));
        let items_handle = self.install(root, items_config, Arc::clone(&binder));

        let (Some(path), Some(selection)) = (selected_path, selection) else {
            return Ok(items_handle);
        };
        let formatter = enum_selection(items, self.config.no_selection);
        let config =
            BindingConfiguration::property(BindingMode::TwoWay, &control, control_path, selection, path)
                .with_formatter(Some(formatter));
        Ok(self.install(root, config, binder))
    }
}

fn report(control_path: &str, error: ResolutionError) -> ResolutionError {
    tracing::warn!(control_path, %error, "binding not created");
    error
}

/// Maps an enum value to its index in `items` and a selected index back to
/// the item. `-1` follows `no_selection`; other out-of-range indices give `Nil`.
fn enum_selection(items: ObservableList<EnumValue>, no_selection: NoSelection) -> ValueFormatter {
    let lookup = items.clone();
    ValueFormatter::new()
        .with_format_control(move |value| {
            let index = match value {
                Value::Enum(e) => lookup.index_of(e),
                Value::Int(d) => lookup.with(|xs| xs.iter().position(|x| x.discriminant == *d)),
                _ => None,
            };
            Value::Int(index.map_or(-1, |i| i as i64))
        })
        .with_format_target(move |value| {
            let index = match value.as_int() {
                Some(-1) | None => match no_selection {
                    NoSelection::FirstItem => 0,
                    NoSelection::Clear => return Value::Nil,
                },
                Some(i) => i,
            };
            usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .map_or(Value::Nil, Value::Enum)
        })
}

impl Drop for ObservableObject {
    fn drop(&mut self) {
        self.notifier.registry().clear();
    }
}

impl fmt::Debug for ObservableObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableObject")
            .field("id", &self.id())
            .field("bindings", &self.binding_count())
            .field("has_errors", &self.has_errors())
            .field("config", &self.config)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ObservableHost
// ---------------------------------------------------------------------------

/// Registration API for application objects embedding an [`ObservableObject`].
///
/// `Bindable::notifier` must return the embedded object's notifier.
pub trait ObservableHost: Bindable + Sized {
    fn observable(&self) -> &ObservableObject;

    /// Bind `control_property` of the control at `control_path` to `source_path`.
    fn bind_property(
        self: &Arc<Self>,
        control_path: &str,
        control_property: &str,
        source_path: &str,
        mode: BindingMode,
        formatter: Option<ValueFormatter>,
    ) -> Result<BindingHandle, ResolutionError> {
        let root: Arc<dyn Bindable> = self.clone();
        self.observable().attach_property(
            &root,
            control_path,
            control_property,
            source_path,
            mode,
            formatter,
        )
    }

    /// Bind the items of a list control to an [`ObservableList`] property.
    ///
    /// Only source-to-control propagation happens, whatever `mode` says.
    fn bind_list_property(
        self: &Arc<Self>,
        control_path: &str,
        source_path: &str,
        mode: BindingMode,
        formatter: Option<ValueFormatter>,
    ) -> Result<BindingHandle, ResolutionError> {
        let root: Arc<dyn Bindable> = self.clone();
        self.observable()
            .attach_list(&root, control_path, source_path, mode, formatter)
    }

    /// Fill a list control with the variants of `E` and, when
    /// `selected_path` is given, bind its selected index two-way to that
    /// enum-valued property.
    ///
    /// Returns the selection binding's handle if one was created, the item
    /// binding's otherwise.
    fn bind_enum_property<E: BindableEnum>(
        self: &Arc<Self>,
        control_path: &str,
        selected_path: Option<&str>,
    ) -> Result<BindingHandle, ResolutionError> {
        let root: Arc<dyn Bindable> = self.clone();
        self.observable()
            .attach_enum::<E>(&root, control_path, selected_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyScene;

    impl SceneTree for EmptyScene {
        fn resolve(&self, _path: &str) -> Option<ControlHandle> {
            None
        }
    }

    struct Model {
        observable: ObservableObject,
    }

    impl Bindable for Model {
        fn notifier(&self) -> &ChangeNotifier {
            self.observable.notifier()
        }
        fn get_property(&self, _name: &str) -> Option<Value> {
            None
        }
    }

    impl ObservableHost for Model {
        fn observable(&self) -> &ObservableObject {
            &self.observable
        }
    }

    fn model() -> Arc<Model> {
        Arc::new(Model {
            observable: ObservableObject::new(
                Arc::new(EmptyScene),
                Arc::new(ControlBinderProvider::new()),
            ),
        })
    }

    #[test]
    fn empty_source_path_is_rejected_first() {
        let m = model();
        let err = m
            .bind_property("%Missing", "text", " . ", BindingMode::OneWay, None)
            .unwrap_err();
        assert_eq!(err, ResolutionError::EmptySourcePath);
        assert_eq!(m.observable().binding_count(), 0);
    }

    #[test]
    fn unresolved_control_creates_nothing() {
        let m = model();
        let err = m
            .bind_list_property("%Items", "Items", BindingMode::OneWay, None)
            .unwrap_err();
        assert!(matches!(err, ResolutionError::ControlNotFound { ref path } if path == "%Items"));
        assert!(m.observable().bindings().is_empty());
    }

    #[test]
    fn default_set_property_is_read_only() {
        let m = model();
        assert_eq!(
            m.set_property("Anything", Value::Int(1)),
            Err(PropertyError::read_only("Anything"))
        );
    }

    #[test]
    fn validation_events_drive_has_errors() {
        let m = model();
        let flips = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&flips);
        let _sub = m.observable().subscribe_property_changed(move |e| {
            if e.property == HAS_ERRORS {
                *sink.lock().unwrap() += 1;
            }
        });

        struct Dummy;
        impl crate::control::Control for Dummy {
            fn kind(&self) -> &str {
                "Dummy"
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
        let control: ControlHandle = Arc::new(Dummy);
        let (first, second) = (BindingId::next(), BindingId::next());
        let event = |binding: BindingId, message: Option<&str>| ValidationChanged {
            binding,
            control: Arc::clone(&control),
            property: "text".into(),
            message: message.map(str::to_owned),
            is_valid: message.is_none(),
        };

        let obs = m.observable();
        obs.validation.emit(&event(first, Some("too long")));
        obs.validation.emit(&event(second, Some("empty")));
        assert!(obs.has_errors());
        assert_eq!(obs.validation_errors().len(), 2);

        obs.validation.emit(&event(first, None));
        assert!(obs.has_errors());
        obs.validation.emit(&event(second, None));
        assert!(!obs.has_errors());
        assert_eq!(*flips.lock().unwrap(), 2);
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Mode {
        A,
        B,
        C,
    }

    impl BindableEnum for Mode {
        const TYPE_NAME: &'static str = "Mode";
        fn variants() -> &'static [Self] {
            &[Mode::A, Mode::B, Mode::C]
        }
        fn name(self) -> &'static str {
            match self {
                Mode::A => "A",
                Mode::B => "B",
                Mode::C => "C",
            }
        }
        fn discriminant(self) -> i64 {
            self as i64
        }
    }

    fn items() -> ObservableList<EnumValue> {
        Mode::variants().iter().map(|v| v.to_enum_value()).collect()
    }

    #[test]
    fn enum_selection_maps_both_ways() {
        let f = enum_selection(items(), NoSelection::FirstItem);
        assert_eq!(f.format_control(&Mode::B.to_value()), Value::Int(1));
        assert_eq!(f.format_control(&Value::Int(2)), Value::Int(2));
        assert_eq!(f.format_control(&Value::Nil), Value::Int(-1));
        assert_eq!(f.format_target(&Value::Int(2)), Mode::C.to_value());
        assert_eq!(f.format_target(&Value::Int(-1)), Mode::A.to_value());
        assert_eq!(f.format_target(&Value::Int(9)), Value::Nil);
    }

    #[test]
    fn enum_selection_clear_policy() {
        let f = enum_selection(items(), NoSelection::Clear);
        assert_eq!(f.format_target(&Value::Int(-1)), Value::Nil);
        assert_eq!(f.format_target(&Value::Int(0)), Mode::A.to_value());
    }
}
