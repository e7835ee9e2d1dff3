//! Identity-keyed storage that does not keep its keys alive.
//!
//! Per-instance state (observable slots, per-receiver memo cells) lives in a
//! `WeakMap` owned by the property definition, keyed by the receiver's `Rc`
//! allocation. The map only holds `Weak` references, so an entry never
//! extends its receiver's lifetime. Entries for dropped receivers read as
//! absent and are pruned on the next insert.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// A map from `Rc<K>` identity to `V`.
pub struct WeakMap<K, V> {
    entries: RefCell<HashMap<usize, (Weak<K>, V)>>,
}

fn address<K>(key: &Rc<K>) -> usize {
    Rc::as_ptr(key) as usize
}

impl<K, V: Clone> WeakMap<K, V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Get the value stored for `key`.
    pub fn get(&self, key: &Rc<K>) -> Option<V> {
        // The allocation cannot be reused while our `Weak` exists, so a live
        // entry at this address belongs to `key`.
        self.entries
            .borrow()
            .get(&address(key))
            .filter(|(weak, _)| weak.strong_count() > 0)
            .map(|(_, value)| value.clone())
    }

    /// Whether a value is stored for `key`.
    pub fn contains(&self, key: &Rc<K>) -> bool {
        self.get(key).is_some()
    }

    /// Store `value` for `key`, replacing any previous value.
    pub fn insert(&self, key: &Rc<K>, value: V) {
        let evicted = self.prune();
        let replaced = self
            .entries
            .borrow_mut()
            .insert(address(key), (Rc::downgrade(key), value));
        drop(evicted);
        drop(replaced);
    }

    /// Get the value for `key`, creating it with `init` if absent.
    ///
    /// `init` runs without the map borrowed, so it may use the map.
    pub fn get_or_insert_with(&self, key: &Rc<K>, init: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = init();
        self.insert(key, value.clone());
        value
    }

    /// Remove the value for `key`.
    pub fn remove(&self, key: &Rc<K>) -> Option<V> {
        let removed = self.entries.borrow_mut().remove(&address(key));
        removed
            .filter(|(weak, _)| weak.strong_count() > 0)
            .map(|(_, value)| value)
    }

    /// Number of entries whose receiver is still alive.
    pub fn len(&self) -> usize {
        self.entries
            .borrow()
            .values()
            .filter(|(weak, _)| weak.strong_count() > 0)
            .count()
    }

    /// Whether no live entries remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries whose receivers are gone. Returns the evicted values so
    /// the caller can drop them after the borrow is released.
    fn prune(&self) -> Vec<V> {
        let mut entries = self.entries.borrow_mut();
        let dead: Vec<usize> = entries
            .iter()
            .filter(|(_, (weak, _))| weak.strong_count() == 0)
            .map(|(addr, _)| *addr)
            .collect();
        dead.into_iter()
            .filter_map(|addr| entries.remove(&addr))
            .map(|(_, value)| value)
            .collect()
    }
}

impl<K, V: Clone> Default for WeakMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> std::fmt::Debug for WeakMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakMap")
            .field("entries", &self.entries.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Receiver;

    #[test]
    fn values_are_per_receiver() {
        let map = WeakMap::new();
        let a = Rc::new(Receiver);
        let b = Rc::new(Receiver);

        map.insert(&a, 1);
        map.insert(&b, 2);

        assert_eq!(map.get(&a), Some(1));
        assert_eq!(map.get(&b), Some(2));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn entries_do_not_keep_receivers_alive() {
        let map = WeakMap::new();
        let a = Rc::new(Receiver);
        map.insert(&a, "a");

        let weak = Rc::downgrade(&a);
        drop(a);

        assert!(weak.upgrade().is_none());
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn dead_entries_are_pruned_on_insert() {
        let map = WeakMap::new();
        let tracker = Rc::new(());
        {
            let a = Rc::new(Receiver);
            map.insert(&a, tracker.clone());
        }
        assert_eq!(Rc::strong_count(&tracker), 2);

        let b = Rc::new(Receiver);
        map.insert(&b, tracker.clone());

        // The dead receiver's value was released, only b's remains.
        assert_eq!(Rc::strong_count(&tracker), 2);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn get_or_insert_runs_init_once() {
        let map = WeakMap::new();
        let a = Rc::new(Receiver);
        let mut calls = 0;

        let first = map.get_or_insert_with(&a, || {
            calls += 1;
            10
        });
        let second = map.get_or_insert_with(&a, || {
            calls += 1;
            20
        });

        assert_eq!((first, second), (10, 10));
        assert_eq!(calls, 1);
        assert_eq!(map.remove(&a), Some(10));
        assert!(!map.contains(&a));
    }
}
