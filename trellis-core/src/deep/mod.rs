//! Deep Observable Values
//!
//! This module makes plain JSON data observable. A [`TrackedValue`] is
//! either a plain value or one of four observable collections:
//!
//! - [`ObservableObject`]: string-keyed fields, insertion ordered
//! - [`ObservableArray`]: an indexable list
//! - [`ObservableMap`]: string-keyed entries with map-style operations
//! - [`ObservableSet`]: a set of JSON values
//!
//! # Tracking
//!
//! Each collection owns one marker. Any read (get, has, len, iteration,
//! snapshot) consumes it and any mutation invalidates it through the
//! runtime, so a mutation outside a transaction still flushes reactions.
//!
//! # Depth
//!
//! A deep collection wraps nested objects and arrays the first time they
//! are read and keeps the wrapper, so repeated reads return the same
//! observable. A shallow collection hands nested containers back as plain
//! JSON.

mod array;
mod map;
mod object;
mod set;

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::reactive::Runtime;
use crate::tracking::Marker;

pub use array::ObservableArray;
pub use map::ObservableMap;
pub use object::ObservableObject;
pub use set::ObservableSet;

/// A value that may be observable.
#[derive(Debug, Clone)]
pub enum TrackedValue {
    /// A plain JSON value. Containers held here are not observed.
    Plain(Value),
    Object(ObservableObject),
    Array(ObservableArray),
    Map(ObservableMap),
    Set(ObservableSet),
}

impl TrackedValue {
    /// Whether this value is an observable collection.
    pub fn is_wrapped(&self) -> bool {
        !matches!(self, TrackedValue::Plain(_))
    }

    /// A short name for the value's shape, used in error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            TrackedValue::Plain(value) => json_shape(value),
            TrackedValue::Object(_) => "object",
            TrackedValue::Array(_) => "array",
            TrackedValue::Map(_) => "map",
            TrackedValue::Set(_) => "set",
        }
    }

    pub fn as_plain(&self) -> Option<&Value> {
        match self {
            TrackedValue::Plain(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObservableObject> {
        match self {
            TrackedValue::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ObservableArray> {
        match self {
            TrackedValue::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ObservableMap> {
        match self {
            TrackedValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&ObservableSet> {
        match self {
            TrackedValue::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_plain().and_then(Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_plain().and_then(Value::as_f64)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_plain().and_then(Value::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_plain().and_then(Value::as_bool)
    }

    /// Snapshot the value as plain JSON. Reads through every collection.
    pub fn to_json(&self) -> Value {
        match self {
            TrackedValue::Plain(value) => value.clone(),
            TrackedValue::Object(object) => object.to_json(),
            TrackedValue::Array(array) => array.to_json(),
            TrackedValue::Map(map) => map.to_json(),
            TrackedValue::Set(set) => set.to_json(),
        }
    }
}

impl Default for TrackedValue {
    fn default() -> Self {
        TrackedValue::Plain(Value::Null)
    }
}

/// Plain values compare by value, collections by identity.
impl PartialEq for TrackedValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TrackedValue::Plain(a), TrackedValue::Plain(b)) => a == b,
            (TrackedValue::Object(a), TrackedValue::Object(b)) => a.ptr_eq(b),
            (TrackedValue::Array(a), TrackedValue::Array(b)) => a.ptr_eq(b),
            (TrackedValue::Map(a), TrackedValue::Map(b)) => a.ptr_eq(b),
            (TrackedValue::Set(a), TrackedValue::Set(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl PartialEq<Value> for TrackedValue {
    fn eq(&self, other: &Value) -> bool {
        &self.to_json() == other
    }
}

impl From<Value> for TrackedValue {
    fn from(value: Value) -> Self {
        TrackedValue::Plain(value)
    }
}

macro_rules! plain_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for TrackedValue {
                fn from(value: $ty) -> Self {
                    TrackedValue::Plain(Value::from(value))
                }
            }
        )*
    };
}

plain_from!(bool, i32, i64, u32, u64, f64, String, &str);

impl From<ObservableObject> for TrackedValue {
    fn from(object: ObservableObject) -> Self {
        TrackedValue::Object(object)
    }
}

impl From<ObservableArray> for TrackedValue {
    fn from(array: ObservableArray) -> Self {
        TrackedValue::Array(array)
    }
}

impl From<ObservableMap> for TrackedValue {
    fn from(map: ObservableMap) -> Self {
        TrackedValue::Map(map)
    }
}

impl From<ObservableSet> for TrackedValue {
    fn from(set: ObservableSet) -> Self {
        TrackedValue::Set(set)
    }
}

/// Make `value` observable.
///
/// Plain JSON objects and arrays become observable collections (shallow or
/// deep); scalars and already-wrapped values are returned unchanged.
pub fn wrap(value: TrackedValue, shallow: bool) -> TrackedValue {
    match value {
        TrackedValue::Plain(json) => wrap_json(json, shallow),
        wrapped => wrapped,
    }
}

/// Make a JSON value observable. See [`wrap`].
pub fn wrap_json(value: Value, shallow: bool) -> TrackedValue {
    match value {
        Value::Object(fields) => TrackedValue::Object(ObservableObject::from_json(fields, shallow)),
        Value::Array(items) => TrackedValue::Array(ObservableArray::from_json(items, shallow)),
        scalar => TrackedValue::Plain(scalar),
    }
}

/// Whether `value` is an observable collection.
pub fn is_wrapped(value: &TrackedValue) -> bool {
    value.is_wrapped()
}

pub(crate) fn json_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// A value stored inside a collection.
#[derive(Debug, Clone)]
pub(crate) enum Child {
    /// Plain JSON, wrapped on first read by deep collections.
    Raw(Value),
    /// Plain JSON that is never wrapped.
    Ref(Value),
    /// An observable collection (or a plain value that was read already).
    Tracked(TrackedValue),
}

impl Child {
    pub(crate) fn from_tracked(value: TrackedValue) -> Self {
        match value {
            TrackedValue::Plain(json) => Child::Raw(json),
            wrapped => Child::Tracked(wrapped),
        }
    }

    /// Read the child, wrapping a nested container in place when deep.
    pub(crate) fn read(&mut self, shallow: bool) -> TrackedValue {
        match self {
            Child::Tracked(value) => value.clone(),
            Child::Ref(raw) => TrackedValue::Plain(raw.clone()),
            Child::Raw(raw) if shallow || !is_container(raw) => TrackedValue::Plain(raw.clone()),
            Child::Raw(raw) => {
                let wrapped = wrap_json(std::mem::take(raw), false);
                *self = Child::Tracked(wrapped.clone());
                wrapped
            }
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        match self {
            Child::Raw(raw) | Child::Ref(raw) => raw.clone(),
            Child::Tracked(value) => value.to_json(),
        }
    }
}

/// State shared by every collection type.
pub(crate) struct Core<D> {
    data: RefCell<D>,
    marker: Marker,
    shallow: bool,
    runtime: Runtime,
}

impl<D> Core<D> {
    pub(crate) fn new(data: D, shallow: bool) -> Rc<Self> {
        Rc::new(Self {
            data: RefCell::new(data),
            marker: Marker::new(),
            shallow,
            runtime: Runtime::current(),
        })
    }

    pub(crate) fn shallow(&self) -> bool {
        self.shallow
    }

    /// Tracked read access.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        self.marker.consume();
        f(&self.data.borrow())
    }

    /// Tracked read that may wrap children in place.
    pub(crate) fn read_mut<R>(&self, f: impl FnOnce(&mut D, bool) -> R) -> R {
        self.marker.consume();
        f(&mut self.data.borrow_mut(), self.shallow)
    }

    /// Mutate and invalidate. The borrow is released before reactions run.
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        let result = f(&mut self.data.borrow_mut());
        self.runtime.invalidate(&self.marker);
        result
    }

    /// Mutate, invalidating only if `f` reports a change.
    pub(crate) fn write_if<R>(&self, f: impl FnOnce(&mut D) -> (R, bool)) -> R {
        let (result, changed) = f(&mut self.data.borrow_mut());
        if changed {
            self.runtime.invalidate(&self.marker);
        }
        result
    }
}
