#![forbid(unsafe_code)]

//! Observable ordered collections.
//!
//! [`ObservableList<T>`] is a shared, mutable sequence that emits one
//! [`ListChange`] per structural mutation, synchronously, after the mutation
//! is applied and the internal lock released. List bindings consume these
//! events to edit a control row by row instead of rebuilding it.
//!
//! # Invariants
//!
//! 1. Every successful mutation emits exactly one event; failed ones emit none.
//! 2. `clear` emits a single [`ListChange::Reset`], never N removals.
//! 3. Replaying the events in order on a copy of the list reproduces the list.
//! 4. Order is the caller's; nothing is sorted implicitly. Duplicates are allowed.
//!
//! Clones share the same storage and listeners, like the reactive
//! `Observable` handles elsewhere in this crate.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::IndexOutOfBounds;
use crate::subscription::{ListenerSet, Subscription, lock};
use crate::value::Value;

/// Discriminant of a [`ListChange`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListChangeKind {
    Add,
    Remove,
    Replace,
    Move,
    Reset,
}

/// A structural change to an [`ObservableList`].
#[derive(Clone, Debug, PartialEq)]
pub enum ListChange<T> {
    Add { index: usize, item: T },
    Remove { index: usize, item: T },
    Replace { index: usize, old: T, new: T },
    Move { from: usize, to: usize, item: T },
    /// The contents changed wholesale; re-read everything.
    Reset,
}

impl<T> ListChange<T> {
    #[must_use]
    pub fn kind(&self) -> ListChangeKind {
        match self {
            Self::Add { .. } => ListChangeKind::Add,
            Self::Remove { .. } => ListChangeKind::Remove,
            Self::Replace { .. } => ListChangeKind::Replace,
            Self::Move { .. } => ListChangeKind::Move,
            Self::Reset => ListChangeKind::Reset,
        }
    }

    /// Convert the carried items.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> ListChange<U> {
        match self {
            Self::Add { index, item } => ListChange::Add {
                index: *index,
                item: f(item),
            },
            Self::Remove { index, item } => ListChange::Remove {
                index: *index,
                item: f(item),
            },
            Self::Replace { index, old, new } => ListChange::Replace {
                index: *index,
                old: f(old),
                new: f(new),
            },
            Self::Move { from, to, item } => ListChange::Move {
                from: *from,
                to: *to,
                item: f(item),
            },
            Self::Reset => ListChange::Reset,
        }
    }
}

struct ListInner<T> {
    items: Mutex<Vec<T>>,
    listeners: ListenerSet<ListChange<T>>,
}

/// Shared ordered sequence with change events.
pub struct ObservableList<T> {
    inner: Arc<ListInner<T>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ObservableList<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            inner: Arc::new(ListInner {
                items: Mutex::new(items),
                listeners: ListenerSet::new(),
            }),
        }
    }

    /// Subscribe to change events.
    pub fn subscribe(
        &self,
        callback: impl Fn(&ListChange<T>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.listeners.subscribe(callback)
    }

    fn emit(&self, change: ListChange<T>) {
        self.inner.listeners.emit(&change);
    }

    /// Append `item`.
    pub fn add(&self, item: T) {
        let index = {
            let mut items = lock(&self.inner.items);
            items.push(item.clone());
            items.len() - 1
        };
        self.emit(ListChange::Add { index, item });
    }

    /// Insert `item` at `index` (`index == len` appends).
    pub fn insert(&self, index: usize, item: T) -> Result<(), IndexOutOfBounds> {
        {
            let mut items = lock(&self.inner.items);
            if index > items.len() {
                return Err(IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, item.clone());
        }
        self.emit(ListChange::Add { index, item });
        Ok(())
    }

    /// Remove and return the item at `index`.
    pub fn remove_at(&self, index: usize) -> Result<T, IndexOutOfBounds> {
        let item = {
            let mut items = lock(&self.inner.items);
            if index >= items.len() {
                return Err(IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.remove(index)
        };
        self.emit(ListChange::Remove {
            index,
            item: item.clone(),
        });
        Ok(item)
    }

    /// Overwrite the item at `index`, returning the previous one.
    pub fn replace(&self, index: usize, item: T) -> Result<T, IndexOutOfBounds> {
        let old = {
            let mut items = lock(&self.inner.items);
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or(IndexOutOfBounds { index, len })?;
            std::mem::replace(slot, item.clone())
        };
        self.emit(ListChange::Replace {
            index,
            old: old.clone(),
            new: item,
        });
        Ok(old)
    }

    /// Move the item at `from` so it ends up at `to`.
    pub fn move_item(&self, from: usize, to: usize) -> Result<(), IndexOutOfBounds> {
        let item = {
            let mut items = lock(&self.inner.items);
            let len = items.len();
            if from >= len || to >= len {
                return Err(IndexOutOfBounds {
                    index: from.max(to),
                    len,
                });
            }
            if from == to {
                return Ok(());
            }
            let item = items.remove(from);
            items.insert(to, item.clone());
            item
        };
        self.emit(ListChange::Move { from, to, item });
        Ok(())
    }

    /// Remove everything, emitting a single [`ListChange::Reset`].
    pub fn clear(&self) {
        lock(&self.inner.items).clear();
        self.emit(ListChange::Reset);
    }

    /// Replace the whole contents, emitting a single [`ListChange::Reset`].
    pub fn reset(&self, items: Vec<T>) {
        *lock(&self.inner.items) = items;
        self.emit(ListChange::Reset);
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        lock(&self.inner.items).get(index).cloned()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        lock(&self.inner.items).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.inner.items).is_empty()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        lock(&self.inner.items).clone()
    }

    /// Read the items without cloning them.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&lock(&self.inner.items))
    }

    /// `true` when both handles share storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ObservableList<T> {
    /// Position of the first item equal to `item`.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize> {
        lock(&self.inner.items).iter().position(|x| x == item)
    }

    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }

    /// Remove the first item equal to `item`. Returns `false` if absent.
    pub fn remove(&self, item: &T) -> bool {
        let removed = {
            let mut items = lock(&self.inner.items);
            match items.iter().position(|x| x == item) {
                Some(index) => Some((index, items.remove(index))),
                None => None,
            }
        };
        match removed {
            Some((index, item)) => {
                self.emit(ListChange::Remove { index, item });
                true
            }
            None => false,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> FromIterator<T> for ObservableList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Clone + Send + Sync + fmt::Debug + 'static> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("items", &self.to_vec())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Type-erased view used by list bindings
// ---------------------------------------------------------------------------

/// An observable collection seen through [`Value`]s.
pub trait ObservableCollection: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn values(&self) -> Vec<Value>;

    fn value_at(&self, index: usize) -> Option<Value>;

    fn index_of_value(&self, value: &Value) -> Option<usize>;

    fn subscribe_values(
        &self,
        callback: Box<dyn Fn(&ListChange<Value>) + Send + Sync>,
    ) -> Subscription;

    /// Storage identity; equal for handles sharing the same items.
    fn identity(&self) -> usize;
}

impl<T> ObservableCollection for ObservableList<T>
where
    T: Clone + Into<Value> + Send + Sync + 'static,
{
    fn len(&self) -> usize {
        self.count()
    }

    fn values(&self) -> Vec<Value> {
        self.with(|items| items.iter().cloned().map(Into::into).collect())
    }

    fn value_at(&self, index: usize) -> Option<Value> {
        self.get(index).map(Into::into)
    }

    fn index_of_value(&self, value: &Value) -> Option<usize> {
        self.with(|items| {
            items
                .iter()
                .position(|item| Into::<Value>::into(item.clone()) == *value)
        })
    }

    fn subscribe_values(
        &self,
        callback: Box<dyn Fn(&ListChange<Value>) + Send + Sync>,
    ) -> Subscription {
        self.subscribe(move |change| callback(&change.map(|item| item.clone().into())))
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl<T> From<ObservableList<T>> for Value
where
    T: Clone + Into<Value> + Send + Sync + 'static,
{
    fn from(list: ObservableList<T>) -> Self {
        Value::List(Arc::new(list))
    }
}
