#![forbid(unsafe_code)]

//! Source-side change signal.
//!
//! Every observable object owns a [`ChangeNotifier`]. Setters call
//! [`ChangeNotifier::set_and_notify`] (or [`notify`](ChangeNotifier::notify)
//! after assigning themselves); there is no implicit interception, a
//! mutation that does not notify is invisible to bindings.
//!
//! # Invariants
//!
//! 1. `notify` broadcasts synchronously, on the calling thread, to every
//!    subscriber in registration order.
//! 2. `set_and_notify` always notifies, even when the new value equals the
//!    old one.
//! 3. After broadcasting, invalid bindings in the notifier's registry are
//!    swept according to the [`SweepPolicy`]; the background policy never
//!    delays the broadcast.
//!
//! Clones share the subscriber list and the registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::SweepPolicy;
use crate::registry::BindingRegistry;
use crate::subscription::{ListenerSet, Subscription, lock};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an observable object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// `(owner, property)` broadcast on every source mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyChanged {
    pub owner: ObjectId,
    pub property: String,
}

struct NotifierInner {
    id: ObjectId,
    listeners: ListenerSet<PropertyChanged>,
    registry: Arc<BindingRegistry>,
    sweep: SweepPolicy,
}

#[derive(Clone)]
pub struct ChangeNotifier {
    inner: Arc<NotifierInner>,
}

impl ChangeNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(SweepPolicy::default())
    }

    #[must_use]
    pub fn with_policy(sweep: SweepPolicy) -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                id: ObjectId::next(),
                listeners: ListenerSet::new(),
                registry: Arc::new(BindingRegistry::new()),
                sweep,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    #[must_use]
    pub fn sweep_policy(&self) -> SweepPolicy {
        self.inner.sweep
    }

    /// Bindings owned by this object.
    #[must_use]
    pub fn registry(&self) -> &Arc<BindingRegistry> {
        &self.inner.registry
    }

    /// Observe every property change of this object.
    pub fn subscribe(
        &self,
        callback: impl Fn(&PropertyChanged) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.listeners.subscribe(callback)
    }

    /// Broadcast that `property` changed, then sweep invalid bindings.
    ///
    /// An empty name is ignored.
    pub fn notify(&self, property: &str) {
        if property.is_empty() {
            return;
        }
        let event = PropertyChanged {
            owner: self.inner.id,
            property: property.to_owned(),
        };
        self.inner.listeners.emit(&event);

        match self.inner.sweep {
            SweepPolicy::Background => self.inner.registry.schedule_sweep(),
            SweepPolicy::Inline => {
                self.inner.registry.prune_invalid();
            }
            SweepPolicy::Manual => {}
        }
    }

    /// Assign `value` to `slot` unconditionally, then [`notify`](Self::notify).
    pub fn set_and_notify<T>(&self, slot: &Mutex<T>, value: T, property: &str) {
        *lock(slot) = value;
        self.notify(property);
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("id", &self.inner.id)
            .field("subscribers", &self.inner.listeners.len())
            .field("bindings", &self.inner.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(notifier: &ChangeNotifier) -> (Arc<Mutex<Vec<String>>>, Subscription) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let sub = notifier.subscribe(move |e| sink.lock().unwrap().push(e.property.clone()));
        (log, sub)
    }

    #[test]
    fn notify_carries_owner_and_name() {
        let notifier = ChangeNotifier::new();
        let owner = notifier.id();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let _sub = notifier.subscribe(move |e| *sink.lock().unwrap() = Some(e.clone()));

        notifier.notify("Health");
        assert_eq!(
            *seen.lock().unwrap(),
            Some(PropertyChanged {
                owner,
                property: "Health".into()
            })
        );
    }

    #[test]
    fn set_and_notify_never_short_circuits() {
        let notifier = ChangeNotifier::new();
        let (log, _sub) = record(&notifier);
        let slot = Mutex::new(5);

        notifier.set_and_notify(&slot, 5, "Value");
        notifier.set_and_notify(&slot, 5, "Value");
        notifier.set_and_notify(&slot, 6, "Value");

        assert_eq!(*slot.lock().unwrap(), 6);
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[test]
    fn empty_name_is_ignored() {
        let notifier = ChangeNotifier::new();
        let (log, _sub) = record(&notifier);
        notifier.notify("");
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn subscriber_may_read_slot_during_notify() {
        let notifier = ChangeNotifier::new();
        let slot = Arc::new(Mutex::new(0));
        let observed = Arc::new(Mutex::new(Vec::new()));
        let (s, o) = (Arc::clone(&slot), Arc::clone(&observed));
        let _sub = notifier.subscribe(move |_| o.lock().unwrap().push(*s.lock().unwrap()));

        for v in 1..=3 {
            notifier.set_and_notify(&slot, v, "Value");
        }
        assert_eq!(*observed.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn ids_are_unique_and_clones_share_them() {
        let a = ChangeNotifier::new();
        let b = ChangeNotifier::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }
}
