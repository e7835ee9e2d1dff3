//! Observable sets.
//!
//! Members are JSON values compared structurally. They are stored keyed by
//! their canonical serialization and are never wrapped.

use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use super::Core;

/// An observable set of JSON values, insertion ordered.
#[derive(Clone)]
pub struct ObservableSet {
    core: Rc<Core<IndexMap<String, Value>>>,
}

fn canonical(value: &Value) -> String {
    value.to_string()
}

impl ObservableSet {
    pub fn new() -> Self {
        Self::from_json(Vec::new(), false)
    }

    /// Build a set from JSON values. Duplicates collapse.
    pub fn from_json(members: Vec<Value>, shallow: bool) -> Self {
        let data = members
            .into_iter()
            .map(|value| (canonical(&value), value))
            .collect();
        Self {
            core: Core::new(data, shallow),
        }
    }

    pub fn is_shallow(&self) -> bool {
        self.core.shallow()
    }

    /// Add a member. Returns whether it was newly inserted.
    pub fn add(&self, value: impl Into<Value>) -> bool {
        let value = value.into();
        let key = canonical(&value);
        self.core.write_if(|members| {
            let inserted = !members.contains_key(&key);
            if inserted {
                members.insert(key, value);
            }
            (inserted, inserted)
        })
    }

    pub fn has(&self, value: &Value) -> bool {
        let key = canonical(value);
        self.core.read(|members| members.contains_key(&key))
    }

    /// Remove a member. Returns whether it was present.
    pub fn delete(&self, value: &Value) -> bool {
        let key = canonical(value);
        self.core.write_if(|members| {
            let removed = members.shift_remove(&key).is_some();
            (removed, removed)
        })
    }

    pub fn clear(&self) {
        self.core.write_if(|members| {
            let changed = !members.is_empty();
            members.clear();
            ((), changed)
        })
    }

    pub fn values(&self) -> Vec<Value> {
        self.core.read(|members| members.values().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.core.read(IndexMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot as a plain JSON array.
    pub fn to_json(&self) -> Value {
        Value::Array(self.values())
    }

    /// Whether two handles refer to the same set.
    pub fn ptr_eq(&self, other: &ObservableSet) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl Default for ObservableSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObservableSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableSet").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::MemoCell;
    use serde_json::json;

    #[test]
    fn structural_membership() {
        let set = ObservableSet::from_json(vec![json!(1), json!(1), json!({ "a": 1 })], false);
        assert_eq!(set.len(), 2);
        assert!(set.has(&json!({ "a": 1 })));

        assert!(set.add("x"));
        assert!(!set.add("x"));
        assert!(set.delete(&json!(1)));
        assert_eq!(set.to_json(), json!([{ "a": 1 }, "x"]));
    }

    #[test]
    fn duplicate_add_does_not_invalidate() {
        let set = ObservableSet::from_json(vec![json!(1)], false);
        let size = {
            let set = set.clone();
            MemoCell::new(move || set.len())
        };

        assert_eq!(size.evaluate(), 1);
        set.add(1);
        assert!(size.is_valid());

        set.add(2);
        assert!(!size.is_valid());
        assert_eq!(size.evaluate(), 2);
    }
}
