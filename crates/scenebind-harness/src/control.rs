#![forbid(unsafe_code)]

//! In-memory controls.
//!
//! A [`TestControl`] stores named properties and a row list, emits a change
//! signal on every property edit and a destruction signal when dropped. It
//! counts binder reads, binder writes and item edits so tests can assert how
//! much traffic a binding generated.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahash::AHashMap;
use scenebind_core::{Control, DisplayRecord, ListenerSet, Subscription, Value};

/// `(property, new value)` as emitted by a control's change signal.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyEdit {
    pub property: String,
    pub value: Value,
}

/// One item edit applied to a list control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemOp {
    Insert(usize),
    Remove(usize),
    Set(usize),
    Clear,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct TestControl {
    kind: String,
    name: String,
    properties: Mutex<AHashMap<String, Value>>,
    items: Mutex<Vec<DisplayRecord>>,
    item_ops: Mutex<Vec<ItemOp>>,
    changed: ListenerSet<PropertyEdit>,
    destroyed: ListenerSet<()>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl TestControl {
    /// A control of `kind` with the kind's default properties.
    #[must_use]
    pub fn new(kind: &str, name: &str) -> Arc<Self> {
        let mut properties = AHashMap::new();
        for (property, value) in defaults(kind) {
            properties.insert(property.to_owned(), value);
        }
        Arc::new(Self {
            kind: kind.to_owned(),
            name: name.to_owned(),
            properties: Mutex::new(properties),
            items: Mutex::new(Vec::new()),
            item_ops: Mutex::new(Vec::new()),
            changed: ListenerSet::new(),
            destroyed: ListenerSet::new(),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value of `property`, `Nil` if unset. Not counted.
    #[must_use]
    pub fn property(&self, property: &str) -> Value {
        lock(&self.properties)
            .get(property)
            .cloned()
            .unwrap_or_default()
    }

    /// Display text of `property`.
    #[must_use]
    pub fn text(&self, property: &str) -> String {
        self.property(property).to_string()
    }

    /// Counted read, as a binder performs it.
    pub fn read(&self, property: &str) -> Option<Value> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        lock(&self.properties).get(property).cloned()
    }

    /// Counted programmatic write. Emits the change signal, like a widget
    /// whose setter fires its own "changed" notification.
    pub fn write(&self, property: &str, value: Value) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.store_and_emit(property, value);
    }

    /// Simulate the user editing `property`. Not counted as a write.
    pub fn user_edit(&self, property: &str, value: impl Into<Value>) {
        self.store_and_emit(property, value.into());
    }

    fn store_and_emit(&self, property: &str, value: Value) {
        lock(&self.properties).insert(property.to_owned(), value.clone());
        self.changed.emit(&PropertyEdit {
            property: property.to_owned(),
            value,
        });
    }

    pub fn subscribe_changes(
        &self,
        callback: impl Fn(&PropertyEdit) + Send + Sync + 'static,
    ) -> Subscription {
        self.changed.subscribe(callback)
    }

    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.reads.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
        lock(&self.item_ops).clear();
    }

    // -- rows ----------------------------------------------------------------

    #[must_use]
    pub fn items(&self) -> Vec<DisplayRecord> {
        lock(&self.items).clone()
    }

    #[must_use]
    pub fn item_texts(&self) -> Vec<String> {
        lock(&self.items).iter().map(|r| r.text.clone()).collect()
    }

    /// Item edits applied since creation or the last [`reset_counters`](Self::reset_counters).
    #[must_use]
    pub fn item_ops(&self) -> Vec<ItemOp> {
        lock(&self.item_ops).clone()
    }

    pub fn insert_item(&self, index: usize, record: DisplayRecord) {
        let mut items = lock(&self.items);
        let index = index.min(items.len());
        items.insert(index, record);
        lock(&self.item_ops).push(ItemOp::Insert(index));
    }

    pub fn remove_item(&self, index: usize) {
        let mut items = lock(&self.items);
        if index < items.len() {
            items.remove(index);
            lock(&self.item_ops).push(ItemOp::Remove(index));
        }
    }

    pub fn set_item(&self, index: usize, record: DisplayRecord) {
        let mut items = lock(&self.items);
        if let Some(slot) = items.get_mut(index) {
            *slot = record;
            lock(&self.item_ops).push(ItemOp::Set(index));
        }
    }

    pub fn clear_items(&self) {
        lock(&self.items).clear();
        lock(&self.item_ops).push(ItemOp::Clear);
    }
}

/// Initial properties per control kind.
fn defaults(kind: &str) -> Vec<(&'static str, Value)> {
    match kind {
        "CheckBox" => vec![("button_pressed", Value::Bool(false))],
        "Button" => vec![("disabled", Value::Bool(false)), ("text", Value::from(""))],
        "SpinBox" => vec![("value", Value::Float(0.0))],
        "OptionButton" | "ItemList" => vec![("selected", Value::Int(-1))],
        _ => vec![("text", Value::from(""))],
    }
}

impl Control for TestControl {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn on_destroyed(&self, callback: Box<dyn Fn() + Send + Sync>) -> Option<Subscription> {
        Some(self.destroyed.subscribe(move |_| callback()))
    }
}

impl Drop for TestControl {
    fn drop(&mut self) {
        tracing::trace!(kind = %self.kind, name = %self.name, "control destroyed");
        self.destroyed.emit(&());
    }
}

impl fmt::Debug for TestControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestControl")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("items", &lock(&self.items).len())
            .field("reads", &self.read_count())
            .field("writes", &self.write_count())
            .finish()
    }
}
