//! Change notifications for the loaded-objects collection.

use std::collections::HashMap;
use std::sync::Arc;

use crate::executor::QueryExecutor;
use crate::page::Pager;

/// Listener for mutations of a pager's loaded objects.
///
/// Callbacks run on the thread that completed the fetch, while the pager's
/// lock is held. Read accessors may be called from a callback; blocking on
/// another thread that uses the same pager will deadlock.
pub trait PagerObserver<E: QueryExecutor>: Send + Sync {
    /// A change of unknown shape, such as the whole collection being replaced
    fn on_changed(&self, _pager: &Pager<E>) {}

    /// `count` items starting at `start` were replaced
    fn on_item_range_changed(&self, pager: &Pager<E>, start: usize, count: usize);

    /// `count` items were inserted at `start`
    fn on_item_range_inserted(&self, pager: &Pager<E>, start: usize, count: usize);

    /// Reserved for move-based diffing; never emitted by the current merge
    fn on_item_range_moved(&self, _pager: &Pager<E>, _from: usize, _to: usize, _count: usize) {}

    /// Reserved; never emitted by the current merge
    fn on_item_range_removed(&self, _pager: &Pager<E>, _start: usize, _count: usize) {}
}

/// A single range mutation of the loaded objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeChange {
    Reset,
    Changed { start: usize, count: usize },
    Inserted { start: usize, count: usize },
    Moved { from: usize, to: usize, count: usize },
    Removed { start: usize, count: usize },
}

impl RangeChange {
    /// Deliver this change to the matching observer callback
    pub fn dispatch<E: QueryExecutor>(&self, observer: &dyn PagerObserver<E>, pager: &Pager<E>) {
        match *self {
            RangeChange::Reset => observer.on_changed(pager),
            RangeChange::Changed { start, count } => {
                observer.on_item_range_changed(pager, start, count)
            }
            RangeChange::Inserted { start, count } => {
                observer.on_item_range_inserted(pager, start, count)
            }
            RangeChange::Moved { from, to, count } => {
                observer.on_item_range_moved(pager, from, to, count)
            }
            RangeChange::Removed { start, count } => {
                observer.on_item_range_removed(pager, start, count)
            }
        }
    }
}

/// Registered observers, keyed by allocation identity.
///
/// Registering the same `Arc` twice is a no-op. Iteration order is unspecified.
pub(crate) struct ObserverSet<E: QueryExecutor> {
    observers: HashMap<usize, Arc<dyn PagerObserver<E>>>,
}

impl<E: QueryExecutor> ObserverSet<E> {
    pub fn new() -> Self {
        Self {
            observers: HashMap::new(),
        }
    }

    fn key(observer: &Arc<dyn PagerObserver<E>>) -> usize {
        Arc::as_ptr(observer) as *const () as usize
    }

    /// Returns `true` if the observer was not registered yet
    pub fn insert(&mut self, observer: Arc<dyn PagerObserver<E>>) -> bool {
        let key = Self::key(&observer);
        if self.observers.contains_key(&key) {
            return false;
        }
        self.observers.insert(key, observer);
        true
    }

    /// Returns `true` if the observer was registered
    pub fn remove(&mut self, observer: &Arc<dyn PagerObserver<E>>) -> bool {
        self.observers.remove(&Self::key(observer)).is_some()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Owned copy so callbacks can run without borrowing the set
    pub fn snapshot(&self) -> Vec<Arc<dyn PagerObserver<E>>> {
        self.observers.values().cloned().collect()
    }
}
