#![forbid(unsafe_code)]

//! Per-object binding list and the invalid-binding sweep.
//!
//! A [`BindingRegistry`] holds every binding created by one observable
//! object. Bindings never leave the list on their own: when one turns
//! invalid (its control died) it stays until a sweep prunes it.
//!
//! # Sweep protocol
//!
//! [`BindingRegistry::schedule_sweep`] is called after each notification.
//! It is a no-op unless an invalid binding exists. Otherwise it records a
//! request and, if no worker is running, spawns one. The worker prunes,
//! then re-checks the request flag before exiting, so a request made while
//! a prune was in progress is never lost and at most one worker runs at a
//! time.
//!
//! The worker only edits the bookkeeping list. Dropping a pruned binding
//! releases its subscriptions and its weak control reference; neither
//! touches the control itself.
//!
//! # Invariants
//!
//! 1. `add` and `prune_invalid` serialize on the same lock; a binding added
//!    during a sweep is never lost.
//! 2. At most one sweep worker is in flight per registry.
//! 3. A sweep requested after a mutation prunes a snapshot at least as new
//!    as that mutation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::binding::Binding;
use crate::subscription::lock;

/// Something the registry can hold and eventually reclaim.
pub trait Reclaimable: Clone + Send + Sync + 'static {
    /// `true` once the entry is dead and may be dropped by a sweep.
    fn is_reclaimable(&self) -> bool;
}

impl Reclaimable for Binding {
    fn is_reclaimable(&self) -> bool {
        self.is_invalid()
    }
}

#[derive(Default)]
struct SweepState {
    requested: AtomicBool,
    running: AtomicBool,
    serial: Mutex<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Bindings owned by one observable object.
pub struct BindingRegistry<B: Reclaimable = Binding> {
    entries: Mutex<Vec<B>>,
    sweep: SweepState,
}

impl<B: Reclaimable> BindingRegistry<B> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            sweep: SweepState::default(),
        }
    }

    /// Append an entry.
    pub fn add(&self, entry: B) {
        lock(&self.entries).push(entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    /// Clone of the current entries.
    #[must_use]
    pub fn snapshot(&self) -> Vec<B> {
        lock(&self.entries).clone()
    }

    #[must_use]
    pub fn invalid_count(&self) -> usize {
        lock(&self.entries)
            .iter()
            .filter(|e| e.is_reclaimable())
            .count()
    }

    #[must_use]
    pub fn has_invalid(&self) -> bool {
        lock(&self.entries).iter().any(Reclaimable::is_reclaimable)
    }

    /// Remove every reclaimable entry and return how many went.
    ///
    /// Removed entries are dropped after the lock is released.
    pub fn prune_invalid(&self) -> usize {
        let _serial = lock(&self.sweep.serial);
        let (removed, remaining) = {
            let mut entries = lock(&self.entries);
            let mut removed = Vec::new();
            entries.retain(|e| {
                if e.is_reclaimable() {
                    removed.push(e.clone());
                    false
                } else {
                    true
                }
            });
            (removed, entries.len())
        };
        let count = removed.len();
        drop(removed);
        if count > 0 {
            tracing::debug!(removed = count, remaining, "pruned invalid bindings");
        }
        count
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *lock(&self.entries));
        drop(drained);
    }

    /// Request a background sweep if any entry is reclaimable.
    ///
    /// Never blocks on the sweep itself.
    pub fn schedule_sweep(self: &Arc<Self>) {
        if !self.has_invalid() {
            return;
        }
        self.sweep.requested.store(true, Ordering::SeqCst);
        if self
            .sweep
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let registry = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("scenebind-sweep".into())
            .spawn(move || registry.run_sweeps());
        match spawned {
            Ok(handle) => {
                *lock(&self.sweep.worker) = Some(handle);
            }
            Err(error) => {
                tracing::warn!(%error, "failed to spawn binding sweep worker");
                self.sweep.running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn run_sweeps(&self) {
        loop {
            self.sweep.requested.store(false, Ordering::SeqCst);
            self.prune_invalid();
            self.sweep.running.store(false, Ordering::SeqCst);

            if !self.sweep.requested.load(Ordering::SeqCst) {
                break;
            }
            // A request slipped in while pruning; take it over unless a
            // freshly spawned worker already did.
            if self
                .sweep
                .running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                break;
            }
        }
    }

    /// `true` while a sweep worker is in flight.
    #[must_use]
    pub fn sweep_in_flight(&self) -> bool {
        self.sweep.running.load(Ordering::SeqCst)
    }

    /// Block until no sweep worker is in flight.
    pub fn wait_for_sweep(&self) {
        loop {
            let handle = lock(&self.sweep.worker).take();
            match handle {
                Some(handle) => {
                    if handle.join().is_err() {
                        tracing::warn!("binding sweep worker panicked");
                    }
                }
                None if self.sweep_in_flight() => thread::yield_now(),
                None => return,
            }
        }
    }
}

impl<B: Reclaimable> Default for BindingRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Reclaimable> fmt::Debug for BindingRegistry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("len", &self.len())
            .field("sweep_in_flight", &self.sweep_in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Clone)]
    struct Entry {
        id: u32,
        dead: Arc<AtomicBool>,
    }

    impl Entry {
        fn new(id: u32) -> Self {
            Self {
                id,
                dead: Arc::new(AtomicBool::new(false)),
            }
        }

        fn kill(&self) {
            self.dead.store(true, Ordering::SeqCst);
        }
    }

    impl Reclaimable for Entry {
        fn is_reclaimable(&self) -> bool {
            self.dead.load(Ordering::SeqCst)
        }
    }

    fn ids(registry: &BindingRegistry<Entry>) -> Vec<u32> {
        registry.snapshot().iter().map(|e| e.id).collect()
    }

    #[test]
    fn prune_removes_only_invalid() {
        let registry = BindingRegistry::new();
        let entries: Vec<Entry> = (0..5).map(Entry::new).collect();
        for e in &entries {
            registry.add(e.clone());
        }
        entries[1].kill();
        entries[3].kill();

        assert_eq!(registry.invalid_count(), 2);
        assert_eq!(registry.prune_invalid(), 2);
        assert_eq!(ids(&registry), vec![0, 2, 4]);
        assert_eq!(registry.prune_invalid(), 0);
    }

    #[test]
    fn schedule_without_invalid_spawns_nothing() {
        let registry = Arc::new(BindingRegistry::new());
        registry.add(Entry::new(1));
        registry.schedule_sweep();
        assert!(!registry.sweep_in_flight());
        registry.wait_for_sweep();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn background_sweep_reclaims() {
        let registry = Arc::new(BindingRegistry::new());
        let doomed = Entry::new(1);
        registry.add(doomed.clone());
        registry.add(Entry::new(2));
        doomed.kill();

        registry.schedule_sweep();
        registry.wait_for_sweep();
        assert_eq!(ids(&registry), vec![2]);
        assert!(!registry.sweep_in_flight());
    }

    #[test]
    fn adds_during_sweeps_are_never_lost() {
        let registry = Arc::new(BindingRegistry::new());
        let adder = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for id in 0..500 {
                    let e = Entry::new(id);
                    if id % 2 == 0 {
                        e.kill();
                    }
                    registry.add(e);
                    if id % 25 == 0 {
                        registry.schedule_sweep();
                        thread::sleep(Duration::from_micros(50));
                    }
                }
            })
        };
        for _ in 0..50 {
            registry.schedule_sweep();
            thread::yield_now();
        }
        adder.join().unwrap();
        registry.schedule_sweep();
        registry.wait_for_sweep();
        registry.prune_invalid();

        let survivors = ids(&registry);
        assert_eq!(survivors.len(), 250);
        assert!(survivors.iter().all(|id| id % 2 == 1));
    }

    #[test]
    fn clear_drops_everything() {
        let registry = BindingRegistry::new();
        registry.add(Entry::new(1));
        registry.add(Entry::new(2));
        registry.clear();
        assert!(registry.is_empty());
    }
}
