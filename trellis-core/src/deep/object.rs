//! Observable objects.

use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{Child, Core, TrackedValue};

/// An observable string-keyed object.
///
/// Clones share the same object.
#[derive(Clone)]
pub struct ObservableObject {
    core: Rc<Core<IndexMap<String, Child>>>,
}

impl ObservableObject {
    /// Create an empty deep object.
    pub fn new() -> Self {
        Self::from_json(Map::new(), false)
    }

    /// Wrap the fields of a JSON object.
    pub fn from_json(fields: Map<String, Value>, shallow: bool) -> Self {
        let data = fields
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
            .read_mut(|fields, shallow| fields.get_mut(key).map(|child| child.read(shallow)))
    }

    pub fn has(&self, key: &str) -> bool {
        self.core.read(|fields| fields.contains_key(key))
    }

    /// Assign a field. Always invalidates.
    pub fn set(&self, key: impl Into<String>, value: impl Into<TrackedValue>) {
        let child = Child::from_tracked(value.into());
        let key = key.into();
        self.core.write(|fields| {
            fields.insert(key, child);
        });
    }

    /// Assign a field whose value is tracked by identity only.
    pub fn set_ref(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.core.write(|fields| {
            fields.insert(key, Child::Ref(value));
        });
    }

    /// Remove a field. Returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.core.write_if(|fields| {
            let removed = fields.shift_remove(key).is_some();
            (removed, removed)
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.core.read(|fields| fields.keys().cloned().collect())
    }

    pub fn values(&self) -> Vec<TrackedValue> {
        self.core.read_mut(|fields, shallow| {
            fields
                .values_mut()
                .map(|child| child.read(shallow))
                .collect()
        })
    }

    pub fn entries(&self) -> Vec<(String, TrackedValue)> {
        self.core.read_mut(|fields, shallow| {
            fields
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
        self.core.read(|fields| {
            Value::Object(
                fields
                    .iter()
                    .map(|(key, child)| (key.clone(), child.to_json()))
                    .collect(),
            )
        })
    }

    /// Whether two handles refer to the same object.
    pub fn ptr_eq(&self, other: &ObservableObject) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl Default for ObservableObject {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObservableObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableObject")
            .field("shallow", &self.is_shallow())
            .finish_non_exhaustive()
    }
}
