//! Observable maps.

use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use super::{Child, Core, TrackedValue};

/// An observable string-keyed map.
///
/// Unlike [`ObservableObject`](super::ObservableObject), maps are meant
/// for dynamic keys and expose `has`/`delete`/`clear` style operations.
#[derive(Clone)]
pub struct ObservableMap {
    core: Rc<Core<IndexMap<String, Child>>>,
}

impl ObservableMap {
    /// Create an empty deep map.
    pub fn new() -> Self {
        Self::from_entries(Vec::new(), false)
    }

    /// Build a map from key/value pairs. Later duplicates win.
    pub fn from_entries(entries: Vec<(String, Value)>, shallow: bool) -> Self {
        let data = entries
            .into_iter()
            .map(|(key, value)| (key, Child::Raw(value)))
            .collect();
        Self {
            core: Core::new(data, shallow),
        }
    }

    /// Whether nested containers are left unwrapped.
    pub fn is_shallow(&self) -> bool {
        self.core.shallow()
    }

    pub fn get(&self, key: &str) -> Option<TrackedValue> {
        self.core
            .read_mut(|entries, shallow| entries.get_mut(key).map(|child| child.read(shallow)))
    }

    pub fn has(&self, key: &str) -> bool {
        self.core.read(|entries| entries.contains_key(key))
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<TrackedValue>) {
        let child = Child::from_tracked(value.into());
        let key = key.into();
        self.core.write(|entries| {
            entries.insert(key, child);
        });
    }

    /// Remove an entry. Returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        self.core.write_if(|entries| {
            let removed = entries.shift_remove(key).is_some();
            (removed, removed)
        })
    }

    pub fn clear(&self) {
        self.core.write_if(|entries| {
            let changed = !entries.is_empty();
            entries.clear();
            ((), changed)
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.core.read(|entries| entries.keys().cloned().collect())
    }

    pub fn values(&self) -> Vec<TrackedValue> {
        self.core.read_mut(|entries, shallow| {
            entries.values_mut().map(|child| child.read(shallow)).collect()
        })
    }

    pub fn entries(&self) -> Vec<(String, TrackedValue)> {
        self.core.read_mut(|entries, shallow| {
            entries
                .iter_mut()
                .map(|(key, child)| (key.clone(), child.read(shallow)))
                .collect()
        })
    }

    pub fn len(&self) -> usize {
        self.core.read(IndexMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot as a plain JSON object.
    pub fn to_json(&self) -> Value {
        self.core.read(|entries| {
            Value::Object(
                entries
                    .iter()
                    .map(|(key, child)| (key.clone(), child.to_json()))
                    .collect(),
            )
        })
    }

    /// Whether two handles refer to the same map.
    pub fn ptr_eq(&self, other: &ObservableMap) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl Default for ObservableMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObservableMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableMap")
            .field("shallow", &self.is_shallow())
            .finish_non_exhaustive()
    }
}
