#![forbid(unsafe_code)]

//! Weak listener fan-out and the RAII [`Subscription`] guard.
//!
//! A [`ListenerSet`] stores callbacks as `Weak` pointers. The strong side
//! lives in the [`Subscription`] returned to whoever subscribed, so dropping
//! the subscription is enough to disconnect; dead entries are cleaned up
//! lazily on the next emit.
//!
//! # Invariants
//!
//! 1. Listeners are called in registration order.
//! 2. No lock is held while a listener runs, so listeners may subscribe,
//!    unsubscribe or emit again.
//! 3. A listener dropped before an emit starts is not called by that emit.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// RAII guard keeping a callback registered.
///
/// Dropping the guard removes the callback before the next notification.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Box<dyn Any + Send + Sync>,
}

impl Subscription {
    /// Wrap anything whose lifetime should bound a registration.
    pub fn new<G: Any + Send + Sync>(guard: G) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

type Callback<E> = dyn Fn(&E) + Send + Sync;

/// Ordered set of weakly held listeners for events of type `E`.
pub struct ListenerSet<E> {
    listeners: Mutex<Vec<Weak<Callback<E>>>>,
}

impl<E: 'static> ListenerSet<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Register `callback`; it stays registered while the returned guard lives.
    pub fn subscribe(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        let strong: Arc<Callback<E>> = Arc::new(callback);
        lock(&self.listeners).push(Arc::downgrade(&strong));
        Subscription::new(strong)
    }

    /// Call every live listener with `event`, in registration order.
    pub fn emit(&self, event: &E) {
        let live: Vec<Arc<Callback<E>>> = {
            let mut listeners = lock(&self.listeners);
            listeners.retain(|w| w.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in live {
            callback(event);
        }
    }

    /// Number of listeners still alive.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.listeners)
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: 'static> Default for ListenerSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> fmt::Debug for ListenerSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}
