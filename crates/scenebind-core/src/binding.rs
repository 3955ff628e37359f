#![forbid(unsafe_code)]

//! The live link between a source property and a control property.
//!
//! A [`Binding`] is built from a [`BindingConfiguration`] and a
//! [`ControlBinder`]. [`Binding::bind_control`] subscribes to the source path
//! and, for bindings that write back, to the control's change signal, then
//! performs the initial synchronisation.
//!
//! # State machine
//!
//! `Active` → `Invalid`, never back. A binding turns invalid when its weak
//! control reference no longer resolves (checked on every control access,
//! whichever direction triggered it), when the control's destruction signal
//! fires, or when it is unbound explicitly. Invalid bindings stop reacting
//! and release their subscriptions; the owning registry reclaims them on the
//! next sweep.
//!
//! # Propagation
//!
//! - Source → control: read the value by walking the path from the owner,
//!   apply `format_control`, write through the binder.
//! - Control → source (two-way and one-way-to-target): read the control
//!   value through the binder, run validators in registration order (the
//!   first failure reports `is_valid = false` and aborts the write), apply
//!   `format_target`, write the leaf property of the source.
//!
//! Both writes run under the binding's re-entrancy guard, so the echo each
//! one causes (the control's own change signal, or the source's
//! property-changed notification) is ignored by this binding for that cycle.
//! Other bindings on the same property still see it.
//!
//! # Nested paths
//!
//! For `"Selected.Health"` the binding watches `Selected` on the owner and
//! `Health` on whatever `Selected` currently points to. When an intermediate
//! link fires, the chain is re-resolved and re-subscribed before the value
//! is pushed again.
//!
//! # List bindings
//!
//! List bindings keep the records last pushed to the control. Each
//! [`ListChange`] becomes the matching single-row edit, followed by `Set`s
//! for rows whose positional id shifted; `Reset`, a snapshot
//! mismatch, or reassignment of the list property trigger a resync (full
//! rebuild for `Reset`, snapshot diff for reassignment).

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::config::BindingConfiguration;
use crate::control::{Control, ControlBinder, ControlChanged, ControlHandle, ListBinder};
use crate::diff::{ListEdit, diff_lists};
use crate::list::{ListChange, ObservableCollection};
use crate::observable::Bindable;
use crate::subscription::{ListenerSet, Subscription, lock};
use crate::value::{DisplayRecord, Value};

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a binding, unique within the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    pub(crate) fn next() -> Self {
        Self(NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Health of a binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingStatus {
    Active,
    /// Terminal; the binding no longer propagates and awaits reclamation.
    Invalid,
}

/// Checks a control value headed for the source; `Some(message)` rejects it.
pub type Validator = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Per-binding observer of validation outcomes: `(control, is_valid, message)`.
pub type ValidationHandler = Arc<dyn Fn(&ControlHandle, bool, Option<&str>) + Send + Sync>;

/// Broadcast whenever a binding's validators pass or fail.
#[derive(Clone)]
pub struct ValidationChanged {
    pub binding: BindingId,
    pub control: ControlHandle,
    pub property: String,
    pub message: Option<String>,
    pub is_valid: bool,
}

impl fmt::Debug for ValidationChanged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationChanged")
            .field("binding", &self.binding)
            .field("control", &self.control.kind())
            .field("property", &self.property)
            .field("message", &self.message)
            .field("is_valid", &self.is_valid)
            .finish()
    }
}

#[derive(Default)]
struct ListSync {
    source: Option<usize>,
    records: Vec<DisplayRecord>,
    subscription: Option<Subscription>,
}

struct BindingInner {
    id: BindingId,
    config: BindingConfiguration,
    binder: Arc<dyn ControlBinder>,
    root: Weak<dyn Bindable>,
    invalid: AtomicBool,
    updating: AtomicBool,
    validators: Mutex<Vec<Validator>>,
    handlers: Mutex<Vec<ValidationHandler>>,
    validation_events: Arc<ListenerSet<ValidationChanged>>,
    source_links: Mutex<Vec<Subscription>>,
    control_links: Mutex<Vec<Subscription>>,
    list: Mutex<ListSync>,
}

/// An active link; cheap to clone, clones share state.
#[derive(Clone)]
pub struct Binding {
    inner: Arc<BindingInner>,
}

impl Binding {
    /// Create an unwired binding. Call [`bind_control`](Self::bind_control) to activate it.
    ///
    /// `root` is the object source paths are walked from; it is held weakly.
    #[must_use]
    pub fn new(
        config: BindingConfiguration,
        binder: Arc<dyn ControlBinder>,
        root: Weak<dyn Bindable>,
        validation_events: Arc<ListenerSet<ValidationChanged>>,
    ) -> Self {
        Self {
            inner: Arc::new(BindingInner {
                id: BindingId::next(),
                config,
                binder,
                root,
                invalid: AtomicBool::new(false),
                updating: AtomicBool::new(false),
                validators: Mutex::new(Vec::new()),
                handlers: Mutex::new(Vec::new()),
                validation_events,
                source_links: Mutex::new(Vec::new()),
                control_links: Mutex::new(Vec::new()),
                list: Mutex::new(ListSync::default()),
            }),
        }
    }

    /// Subscribe both sides and perform the initial synchronisation.
    pub fn bind_control(&self) {
        self.inner.bind_control();
    }

    #[must_use]
    pub fn id(&self) -> BindingId {
        self.inner.id
    }

    #[must_use]
    pub fn status(&self) -> BindingStatus {
        if self.is_invalid() {
            BindingStatus::Invalid
        } else {
            BindingStatus::Active
        }
    }

    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.inner.is_invalid()
    }

    #[must_use]
    pub fn config(&self) -> &BindingConfiguration {
        &self.inner.config
    }

    /// Weak handle for application code.
    #[must_use]
    pub fn handle(&self) -> BindingHandle {
        BindingHandle {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Mark the binding invalid and drop its subscriptions.
    pub fn unbind(&self) {
        self.inner.invalidate("unbound");
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.inner.id)
            .field("status", &self.status())
            .field("config", &self.inner.config)
            .field("validators", &lock(&self.inner.validators).len())
            .finish()
    }
}

impl BindingInner {
    fn is_invalid(&self) -> bool {
        self.invalid.load(Ordering::Acquire)
    }

    fn is_updating(&self) -> bool {
        self.updating.load(Ordering::Acquire)
    }

    fn invalidate(&self, reason: &'static str) {
        if self.invalid.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(
            binding_id = self.id.0,
            control_path = self.config.control_path(),
            reason,
            "binding invalidated"
        );
        let source = std::mem::take(&mut *lock(&self.source_links));
        let control = std::mem::take(&mut *lock(&self.control_links));
        let list = lock(&self.list).subscription.take();
        drop((source, control, list));
    }

    /// Resolve the weak control reference, invalidating on failure.
    fn resolve_control(&self) -> Option<ControlHandle> {
        let control = self.config.control().upgrade();
        if control.is_none() {
            self.invalidate("control destroyed");
        }
        control
    }

    /// Run `f` with the re-entrancy guard raised.
    fn guarded<R>(&self, f: impl FnOnce() -> R) -> R {
        let was = self.updating.swap(true, Ordering::AcqRel);
        let out = f();
        self.updating.store(was, Ordering::Release);
        out
    }

    fn bind_control(self: &Arc<Self>) {
        let Some(control) = self.resolve_control() else {
            return;
        };

        let mut control_links = Vec::new();
        let weak = Arc::downgrade(self);
        let destroyed = control.on_destroyed(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.invalidate("control destroyed");
            }
        }));
        control_links.extend(destroyed);

        let mode = self.config.mode();
        if self.config.is_list_binding() {
            *lock(&self.control_links) = control_links;
            if let Some(list_binder) = self.binder.as_list(&*control) {
                self.guarded(|| list_binder.clear_items(&*control));
            }
            drop(control);
            if self.config.target_override().is_none() {
                self.link_source();
            }
            self.sync_list();
            return;
        }

        if mode.writes_source() {
            if let Some(property) = self.config.control_property() {
                let weak = Arc::downgrade(self);
                let callback: ControlChanged = Box::new(move |_| {
                    if let Some(inner) = weak.upgrade() {
                        inner.on_control_changed();
                    }
                });
                match self.binder.subscribe_change(&*control, property, callback) {
                    Some(subscription) => control_links.push(subscription),
                    None => tracing::debug!(
                        binding_id = self.id.0,
                        property,
                        "control cannot report edits, binding stays source-to-control"
                    ),
                }
            }
        }
        *lock(&self.control_links) = control_links;
        drop(control);

        if mode.reads_source() {
            self.link_source();
            self.push_to_control();
        } else {
            self.pull_from_control();
        }
    }

    // -- source side ---------------------------------------------------------

    /// Object holding the leaf property, found by walking the path.
    fn resolve_parent(&self) -> Option<Arc<dyn Bindable>> {
        let mut current = self.root.upgrade()?;
        for segment in self.config.path().parents() {
            match current.get_property(segment) {
                Some(Value::Object(next)) => current = next,
                _ => return None,
            }
        }
        Some(current)
    }

    fn read_source(&self) -> Option<Value> {
        let leaf = self.config.path().leaf()?;
        self.resolve_parent()?.get_property(leaf)
    }

    fn write_source(&self, value: Value) {
        let Some(leaf) = self.config.path().leaf() else {
            return;
        };
        let Some(parent) = self.resolve_parent() else {
            tracing::debug!(
                binding_id = self.id.0,
                path = %self.config.path(),
                "source path unresolved, control value dropped"
            );
            return;
        };
        if let Err(error) = parent.set_property(leaf, value) {
            tracing::warn!(
                binding_id = self.id.0,
                path = %self.config.path(),
                %error,
                "source rejected control value"
            );
        }
    }

    /// (Re)subscribe to every link of the source path.
    fn link_source(self: &Arc<Self>) {
        if self.is_invalid() {
            return;
        }
        let segments = self.config.path().segments();
        let mut links = Vec::with_capacity(segments.len());
        let mut current = self.root.upgrade();

        for (depth, segment) in segments.iter().enumerate() {
            let Some(object) = current.take() else {
                break;
            };
            let is_leaf = depth + 1 == segments.len();
            let weak = Arc::downgrade(self);
            let name = segment.clone();
            links.push(object.notifier().subscribe(move |event| {
                if event.property != name {
                    return;
                }
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if !is_leaf {
                    inner.link_source();
                }
                inner.on_source_changed();
            }));
            if !is_leaf {
                current = match object.get_property(segment) {
                    Some(Value::Object(next)) => Some(next),
                    _ => None,
                };
            }
        }

        if !self.is_invalid() {
            *lock(&self.source_links) = links;
        }
    }

    fn on_source_changed(self: &Arc<Self>) {
        if self.is_invalid() || self.is_updating() {
            return;
        }
        if self.config.is_list_binding() {
            self.sync_list();
        } else {
            self.push_to_control();
        }
    }

    fn push_to_control(&self) {
        let Some(control) = self.resolve_control() else {
            return;
        };
        let Some(property) = self.config.control_property() else {
            return;
        };
        let Some(value) = self.read_source() else {
            tracing::trace!(
                binding_id = self.id.0,
                path = %self.config.path(),
                "source path unresolved, control left unchanged"
            );
            return;
        };
        let value = match self.config.formatter() {
            Some(formatter) => formatter.format_control(&value),
            None => value,
        };
        tracing::trace!(binding_id = self.id.0, direction = "source_to_control", "propagating");
        self.guarded(|| self.binder.set(&*control, property, value));
    }

    // -- control side --------------------------------------------------------

    fn on_control_changed(&self) {
        if self.is_invalid() || self.is_updating() || !self.config.mode().writes_source() {
            return;
        }
        self.pull_from_control();
    }

    fn pull_from_control(&self) {
        let Some(control) = self.resolve_control() else {
            return;
        };
        let Some(property) = self.config.control_property() else {
            return;
        };
        let Some(value) = self.binder.get(&*control, property) else {
            return;
        };

        let validators = lock(&self.validators).clone();
        if !validators.is_empty() {
            let failure = validators.iter().find_map(|validate| validate(&value));
            let passed = failure.is_none();
            self.report_validation(&control, property, failure);
            if !passed {
                return;
            }
        }

        let value = match self.config.formatter() {
            Some(formatter) => formatter.format_target(&value),
            None => value,
        };
        tracing::trace!(binding_id = self.id.0, direction = "control_to_source", "propagating");
        self.guarded(|| self.write_source(value));
    }

    fn report_validation(&self, control: &ControlHandle, property: &str, message: Option<String>) {
        let is_valid = message.is_none();
        let handlers = lock(&self.handlers).clone();
        for handler in &handlers {
            handler(control, is_valid, message.as_deref());
        }
        self.validation_events.emit(&ValidationChanged {
            binding: self.id,
            control: Arc::clone(control),
            property: property.to_owned(),
            message,
            is_valid,
        });
    }

    // -- lists ---------------------------------------------------------------

    fn current_collection(&self) -> Option<Arc<dyn ObservableCollection>> {
        if let Some(list) = self.config.target_override() {
            return Some(Arc::clone(list));
        }
        match self.read_source() {
            Some(Value::List(list)) => Some(list),
            _ => None,
        }
    }

    fn format_record(&self, value: &Value, index: usize) -> DisplayRecord {
        let formatted = match self.config.formatter() {
            Some(formatter) => formatter.format_control(value),
            None => value.clone(),
        };
        DisplayRecord::from_value(formatted, index as i64)
    }

    fn format_records(&self, values: &[Value]) -> Vec<DisplayRecord> {
        values
            .iter()
            .enumerate()
            .map(|(index, value)| self.format_record(value, index))
            .collect()
    }

    /// Re-read the bound collection, re-subscribe to it and bring the
    /// control in line through a snapshot diff.
    fn sync_list(self: &Arc<Self>) {
        let Some(control) = self.resolve_control() else {
            return;
        };
        let Some(list_binder) = self.binder.as_list(&*control) else {
            return;
        };

        let collection = self.current_collection();
        let records = collection
            .as_ref()
            .map(|c| self.format_records(&c.values()))
            .unwrap_or_default();
        let subscription = collection.as_ref().map(|c| {
            let weak = Arc::downgrade(self);
            c.subscribe_values(Box::new(move |change| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_list_changed(change);
                }
            }))
        });

        let previous = {
            let mut state = lock(&self.list);
            state.source = collection.as_ref().map(|c| c.identity());
            state.subscription = if self.is_invalid() { None } else { subscription };
            std::mem::replace(&mut state.records, records.clone())
        };
        let edits = diff_lists(&previous, &records);
        tracing::trace!(
            binding_id = self.id.0,
            edits = edits.len(),
            "list resynchronised"
        );
        self.guarded(|| apply_list_edits(list_binder, &*control, &edits));
    }

    fn on_list_changed(&self, change: &ListChange<Value>) {
        if self.is_invalid() {
            return;
        }
        let Some(control) = self.resolve_control() else {
            return;
        };
        let Some(list_binder) = self.binder.as_list(&*control) else {
            return;
        };

        let record = match change {
            ListChange::Add { index, item } => Some(self.format_record(item, *index)),
            ListChange::Replace { index, new, .. } => Some(self.format_record(new, *index)),
            _ => None,
        };
        let expected = self
            .current_collection()
            .map(|c| self.format_records(&c.values()));
        let edits = {
            let mut state = lock(&self.list);
            snapshot_edits(&mut state.records, change, record)
                .zip(expected)
                .and_then(|(edits, expected)| align_records(&mut state.records, edits, &expected))
        };
        match edits {
            Some(edits) => self.guarded(|| apply_list_edits(list_binder, &*control, &edits)),
            None => self.rebuild_list(list_binder, &*control),
        }
    }

    /// Clear the control and insert every item again.
    fn rebuild_list(&self, list_binder: &dyn ListBinder, control: &dyn Control) {
        let records = self
            .current_collection()
            .map(|c| self.format_records(&c.values()))
            .unwrap_or_default();
        lock(&self.list).records = records.clone();
        tracing::trace!(binding_id = self.id.0, items = records.len(), "list rebuilt");
        self.guarded(|| {
            list_binder.clear_items(control);
            for (index, record) in records.iter().enumerate() {
                list_binder.insert_item(control, index, record);
            }
        });
    }
}

/// Apply `change` to the pushed snapshot and return the matching control
/// edits, or `None` when a full rebuild is needed (reset, or the snapshot
/// disagrees with the event).
fn snapshot_edits(
    records: &mut Vec<DisplayRecord>,
    change: &ListChange<Value>,
    record: Option<DisplayRecord>,
) -> Option<Vec<ListEdit<DisplayRecord>>> {
    match (change, record) {
        (ListChange::Add { index, .. }, Some(record)) if *index <= records.len() => {
            records.insert(*index, record.clone());
            Some(vec![ListEdit::Insert {
                index: *index,
                item: record,
            }])
        }
        (ListChange::Remove { index, .. }, _) if *index < records.len() => {
            records.remove(*index);
            Some(vec![ListEdit::Remove { index: *index }])
        }
        (ListChange::Replace { index, .. }, Some(record)) if *index < records.len() => {
            records[*index] = record.clone();
            Some(vec![ListEdit::Set {
                index: *index,
                item: record,
            }])
        }
        (ListChange::Move { from, to, .. }, _) if *from < records.len() && *to < records.len() => {
            let moved = records.remove(*from);
            records.insert(*to, moved.clone());
            Some(vec![
                ListEdit::Remove { index: *from },
                ListEdit::Insert {
                    index: *to,
                    item: moved,
                },
            ])
        }
        _ => None,
    }
}

/// Rewrite rows of the snapshot that no longer match a fresh formatting of
/// the list. Items without their own id take their position as id, so an
/// insert, removal or move shifts the ids of the rows behind it.
fn align_records(
    records: &mut [DisplayRecord],
    mut edits: Vec<ListEdit<DisplayRecord>>,
    expected: &[DisplayRecord],
) -> Option<Vec<ListEdit<DisplayRecord>>> {
    if records.len() != expected.len() {
        return None;
    }
    for edit in &mut edits {
        if let ListEdit::Insert { index, item } | ListEdit::Set { index, item } = edit {
            let want = expected.get(*index)?;
            item.clone_from(want);
            records[*index].clone_from(want);
        }
    }
    for (index, (have, want)) in records.iter_mut().zip(expected).enumerate() {
        if have != want {
            have.clone_from(want);
            edits.push(ListEdit::Set {
                index,
                item: want.clone(),
            });
        }
    }
    Some(edits)
}

fn apply_list_edits(
    list_binder: &dyn ListBinder,
    control: &dyn Control,
    edits: &[ListEdit<DisplayRecord>],
) {
    for edit in edits {
        match edit {
            ListEdit::Insert { index, item } => list_binder.insert_item(control, *index, item),
            ListEdit::Remove { index } => list_binder.remove_item(control, *index),
            ListEdit::Set { index, item } => list_binder.set_item(control, *index, item),
        }
    }
}

// ---------------------------------------------------------------------------
// BindingHandle
// ---------------------------------------------------------------------------

/// Application-facing handle returned by the `bind_*` calls.
///
/// Holds the binding weakly: once the registry reclaims it, the handle
/// reports [`BindingStatus::Invalid`] and configuration calls are no-ops.
#[derive(Clone)]
pub struct BindingHandle {
    id: BindingId,
    inner: Weak<BindingInner>,
}

impl BindingHandle {
    #[must_use]
    pub fn id(&self) -> BindingId {
        self.id
    }

    #[must_use]
    pub fn status(&self) -> BindingStatus {
        match self.inner.upgrade() {
            Some(inner) if !inner.is_invalid() => BindingStatus::Active,
            _ => BindingStatus::Invalid,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status() == BindingStatus::Active
    }

    /// Append a validator for control-to-source writes.
    pub fn add_validator(
        &self,
        validator: impl Fn(&Value) -> Option<String> + Send + Sync + 'static,
    ) -> &Self {
        if let Some(inner) = self.inner.upgrade() {
            lock(&inner.validators).push(Arc::new(validator));
        }
        self
    }

    /// Observe this binding's validation outcomes.
    pub fn add_validation_handler(
        &self,
        handler: impl Fn(&ControlHandle, bool, Option<&str>) + Send + Sync + 'static,
    ) -> &Self {
        if let Some(inner) = self.inner.upgrade() {
            lock(&inner.handlers).push(Arc::new(handler));
        }
        self
    }

    /// Mark the binding invalid; the next sweep reclaims it.
    pub fn unbind(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.invalidate("unbound");
        }
    }
}

impl fmt::Debug for BindingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingHandle")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}
