//! Observable arrays.

use std::rc::Rc;

use serde_json::Value;

use super::{Child, Core, TrackedValue};

/// An observable list.
///
/// Clones share the same array.
#[derive(Clone)]
pub struct ObservableArray {
    core: Rc<Core<Vec<Child>>>,
}

impl ObservableArray {
    /// Create an empty deep array.
    pub fn new() -> Self {
        Self::from_json(Vec::new(), false)
    }

    /// Wrap the items of a JSON array.
    pub fn from_json(items: Vec<Value>, shallow: bool) -> Self {
        Self {
            core: Core::new(items.into_iter().map(Child::Raw).collect(), shallow),
        }
    }

    /// Whether nested containers are left unwrapped.
    pub fn is_shallow(&self) -> bool {
        self.core.shallow()
    }

    pub fn get(&self, index: usize) -> Option<TrackedValue> {
        self.core
            .read_mut(|items, shallow| items.get_mut(index).map(|child| child.read(shallow)))
    }

    /// Assign an item. Writing past the end pads the gap with nulls.
    pub fn set(&self, index: usize, value: impl Into<TrackedValue>) {
        let child = Child::from_tracked(value.into());
        self.core.write(|items| {
            if index >= items.len() {
                items.resize(index + 1, Child::Raw(Value::Null));
            }
            items[index] = child;
        });
    }

    pub fn push(&self, value: impl Into<TrackedValue>) {
        let child = Child::from_tracked(value.into());
        self.core.write(|items| items.push(child));
    }

    pub fn pop(&self) -> Option<TrackedValue> {
        let shallow = self.core.shallow();
        self.core.write_if(|items| {
            let popped = items.pop().map(|mut child| child.read(shallow));
            let changed = popped.is_some();
            (popped, changed)
        })
    }

    pub fn len(&self) -> usize {
        self.core.read(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Vec<TrackedValue> {
        self.core
            .read_mut(|items, shallow| items.iter_mut().map(|child| child.read(shallow)).collect())
    }

    /// Snapshot as a plain JSON array.
    pub fn to_json(&self) -> Value {
        self.core
            .read(|items| Value::Array(items.iter().map(Child::to_json).collect()))
    }

    /// Whether two handles refer to the same array.
    pub fn ptr_eq(&self, other: &ObservableArray) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl Default for ObservableArray {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObservableArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableArray")
            .field("shallow", &self.is_shallow())
            .finish_non_exhaustive()
    }
}
