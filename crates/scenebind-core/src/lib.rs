#![forbid(unsafe_code)]

//! scenebind core
//!
//! Property bindings between application-defined observable objects and the
//! controls of a host scene graph.
//!
//! # Key Components
//!
//! - [`ChangeNotifier`] - per-object property-changed fan-out plus the
//!   `set_and_notify` field helper
//! - [`ObservableList`] - ordered container emitting structural change events
//! - [`ValueFormatter`] - bidirectional value transform attached to a binding
//! - [`ControlBinder`] - per-control-kind get/set/subscribe shim supplied by the host
//! - [`BindingConfiguration`] - immutable wiring of one binding
//! - [`Binding`] - the live link, its validators and its health
//! - [`BindingRegistry`] - bindings owned by one object, pruned by a background sweep
//! - [`ObservableObject`] / [`ObservableHost`] - the registration API
//!   (`bind_property`, `bind_list_property`, `bind_enum_property`)
//!
//! # Data flow
//!
//! A field mutation calls [`ChangeNotifier::notify`]; every binding whose path
//! passes through that property re-reads the source, formats it and writes it
//! to the control through its [`ControlBinder`]. Control-side edits travel the
//! other way for two-way bindings, passing validators first. A per-binding
//! re-entrancy guard suppresses the echo of each write.
//!
//! # Threading
//!
//! All property and control access happens on the host's UI thread. The only
//! concurrent activity is the invalid-binding sweep, which runs on a worker
//! thread and touches nothing but the registry's bookkeeping list.

pub mod binding;
pub mod config;
pub mod control;
pub mod diff;
pub mod error;
pub mod formatter;
pub mod list;
pub mod notifier;
pub mod observable;
pub mod path;
pub mod registry;
pub mod subscription;
pub mod value;

pub use binding::{
    Binding, BindingHandle, BindingId, BindingStatus, ValidationChanged, ValidationHandler,
    Validator,
};
pub use config::{BindingConfiguration, BindingMode, NoSelection, ObservableConfig, SweepPolicy};
pub use control::{
    Control, ControlBinder, ControlBinderProvider, ControlChanged, ControlHandle, ListBinder,
    SceneTree, WeakControl,
};
pub use diff::{ListEdit, apply_edits, diff_lists};
pub use error::{IndexOutOfBounds, PropertyError, ResolutionError};
pub use formatter::{FormatFn, ValueFormatter};
pub use list::{ListChange, ListChangeKind, ObservableCollection, ObservableList};
pub use notifier::{ChangeNotifier, ObjectId, PropertyChanged};
pub use observable::{Bindable, HAS_ERRORS, ObservableHost, ObservableObject};
pub use path::PropertyPath;
pub use registry::{BindingRegistry, Reclaimable};
pub use subscription::{ListenerSet, Subscription};
pub use value::{BindableEnum, DisplayRecord, EnumValue, Value};
