//! Observable State
//!
//! Three ways to hold observable state:
//!
//! - [`Boxed<T>`]: a single value behind one marker.
//! - [`ObservableProp<H, T>`]: a property definition storing one slot per
//!   receiver (`Rc<H>`), created lazily and never keeping the receiver
//!   alive.
//! - The collection factories ([`object`], [`array`], [`map`], [`set`]),
//!   which hand JSON data to the deep substrate.
//!
//! Every write invalidates. There is no equality check, so writing the same
//! value twice re-runs dependents twice.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value};

use super::runtime::Runtime;
use crate::deep::{
    json_shape, wrap, wrap_json, ObservableArray, ObservableMap, ObservableObject, ObservableSet,
    TrackedValue,
};
use crate::error::{ReactiveError, Result};
use crate::tracking::{Marker, WeakMap};

pub use super::provenance::{
    is_boxed_observable, is_observable, is_observable_array, is_observable_map,
    is_observable_object, is_observable_set,
};

/// How a stored value is passed through the deep substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Depth {
    /// Nested objects and arrays become observable when read.
    #[default]
    Deep,
    /// Only the top-level container is observable.
    Shallow,
    /// Stored as-is; only reassignment is tracked.
    Ref,
}

/// Values that can be stored in an observable property.
///
/// Scalars and handles store as-is at every depth. [`TrackedValue`] is
/// wrapped according to the depth.
pub trait Observe: Clone + 'static {
    fn observe(self, depth: Depth) -> Self;
}

impl Observe for TrackedValue {
    fn observe(self, depth: Depth) -> Self {
        match depth {
            Depth::Deep => wrap(self, false),
            Depth::Shallow => wrap(self, true),
            Depth::Ref => self,
        }
    }
}

macro_rules! observe_as_is {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Observe for $ty {
                fn observe(self, _depth: Depth) -> Self {
                    self
                }
            }
        )*
    };
}

observe_as_is!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    String,
    &'static str,
    Value,
);

impl<T: Observe> Observe for Option<T> {
    fn observe(self, depth: Depth) -> Self {
        self.map(|value| value.observe(depth))
    }
}

impl<T: 'static> Observe for Rc<T> {
    fn observe(self, _depth: Depth) -> Self {
        self
    }
}

impl<T: Clone + 'static> Observe for Boxed<T> {
    fn observe(self, _depth: Depth) -> Self {
        self
    }
}

// ----------------------------------------------------------------------------
// Boxed values
// ----------------------------------------------------------------------------

/// A single observable value.
///
/// The value is stored as given; use a [`TrackedValue`] built with
/// [`deep`] if the contents should be observable too.
///
/// # Example
///
/// ```rust
/// use trellis_core::Boxed;
///
/// let count = Boxed::new(1);
/// count.set(count.get() + 1);
/// assert_eq!(count.get(), 2);
/// ```
pub struct Boxed<T> {
    inner: Rc<BoxInner<T>>,
}

struct BoxInner<T> {
    value: RefCell<T>,
    marker: Marker,
    runtime: Runtime,
}

impl<T: Clone + 'static> Boxed<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(BoxInner {
                value: RefCell::new(value),
                marker: Marker::new(),
                runtime: Runtime::current(),
            }),
        }
    }

    /// Read the value, recording a dependency.
    pub fn get(&self) -> T {
        self.inner.marker.consume();
        self.inner.value.borrow().clone()
    }

    /// Read the value without recording a dependency.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Replace the value and invalidate dependents.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.inner.runtime.invalidate(&self.inner.marker);
    }

    /// Modify the value and invalidate dependents.
    ///
    /// `f` works on a copy, so it may read this box.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get_untracked();
        f(&mut value);
        *self.inner.value.borrow_mut() = value;
        self.inner.runtime.invalidate(&self.inner.marker);
    }

    /// Whether two handles refer to the same box.
    pub fn ptr_eq(&self, other: &Boxed<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Boxed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Boxed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Boxed")
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

/// Create a [`Boxed`] value.
pub fn boxed<T: Clone + 'static>(value: T) -> Boxed<T> {
    Boxed::new(value)
}

// ----------------------------------------------------------------------------
// Per-receiver properties
// ----------------------------------------------------------------------------

/// An observable property declared once and stored per receiver.
///
/// Slots are created on first access. A property with an initializer fills
/// the slot with `initializer()` on the first read; without one the slot
/// reads as `None` until set.
pub struct ObservableProp<H, T> {
    inner: Rc<PropInner<H, T>>,
}

struct PropInner<H, T> {
    key: String,
    depth: Depth,
    initializer: Option<Box<dyn Fn() -> T>>,
    slots: WeakMap<H, Rc<Slot<T>>>,
    runtime: Runtime,
}

struct Slot<T> {
    value: RefCell<Option<T>>,
    marker: RefCell<Option<Marker>>,
}

impl<T> Slot<T> {
    fn empty() -> Rc<Self> {
        Rc::new(Slot {
            value: RefCell::new(None),
            marker: RefCell::new(None),
        })
    }
}

impl<H: 'static, T: Observe> ObservableProp<H, T> {
    /// A property with no initializer.
    pub fn new(key: impl Into<String>, depth: Depth) -> Self {
        Self::build(key.into(), depth, None)
    }

    /// A property whose slots start as `initializer()`.
    pub fn with_initializer<F>(key: impl Into<String>, depth: Depth, initializer: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(key.into(), depth, Some(Box::new(initializer)))
    }

    fn build(key: String, depth: Depth, initializer: Option<Box<dyn Fn() -> T>>) -> Self {
        Self {
            inner: Rc::new(PropInner {
                key,
                depth,
                initializer,
                slots: WeakMap::new(),
                runtime: Runtime::current(),
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn depth(&self) -> Depth {
        self.inner.depth
    }

    /// Read the receiver's value, recording a dependency.
    pub fn get(&self, host: &Rc<H>) -> Option<T> {
        let inner = &self.inner;
        let slot = inner.slots.get_or_insert_with(host, Slot::empty);

        if slot.value.borrow().is_none() {
            if let Some(initializer) = &inner.initializer {
                let initial = initializer().observe(inner.depth);
                *slot.value.borrow_mut() = Some(initial);
            }
        }

        slot.marker
            .borrow_mut()
            .get_or_insert_with(Marker::new)
            .consume();
        let value = slot.value.borrow().clone();
        value
    }

    /// Store a value for the receiver and invalidate its readers.
    pub fn set(&self, host: &Rc<H>, value: T) {
        let inner = &self.inner;
        let slot = inner.slots.get_or_insert_with(host, Slot::empty);
        *slot.value.borrow_mut() = Some(value.observe(inner.depth));

        let marker = slot.marker.borrow().clone();
        if let Some(marker) = marker {
            inner.runtime.invalidate(&marker);
        }
    }

    /// Number of live receivers with a slot.
    pub fn slot_count(&self) -> usize {
        self.inner.slots.len()
    }
}

impl<H, T> Clone for ObservableProp<H, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<H, T> std::fmt::Debug for ObservableProp<H, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableProp")
            .field("key", &self.inner.key)
            .field("depth", &self.inner.depth)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Collection factories
// ----------------------------------------------------------------------------

/// Options for the collection factories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionOptions {
    /// Whether nested containers become observable.
    pub deep: bool,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self { deep: true }
    }
}

impl CollectionOptions {
    pub fn shallow() -> Self {
        Self { deep: false }
    }

    fn is_shallow(self) -> bool {
        !self.deep
    }
}

fn invalid(expected: &'static str, actual: &Value) -> ReactiveError {
    ReactiveError::InvalidShape {
        expected,
        actual: json_shape(actual),
    }
}

/// Make any JSON value deeply observable.
pub fn deep(value: Value) -> TrackedValue {
    wrap_json(value, false)
}

/// Make a JSON container observable at the top level only.
pub fn shallow(value: Value) -> TrackedValue {
    wrap_json(value, true)
}

/// Make a JSON object observable.
pub fn object(value: Value) -> Result<TrackedValue> {
    object_with(value, CollectionOptions::default())
}

pub fn object_with(value: Value, options: CollectionOptions) -> Result<TrackedValue> {
    match value {
        Value::Object(fields) => {
            Ok(ObservableObject::from_json(fields, options.is_shallow()).into())
        }
        other if Runtime::current().dev_checks() => Err(invalid("object", &other)),
        other => Ok(wrap_json(other, options.is_shallow())),
    }
}

/// Make a JSON array observable.
pub fn array(value: Value) -> Result<TrackedValue> {
    array_with(value, CollectionOptions::default())
}

pub fn array_with(value: Value, options: CollectionOptions) -> Result<TrackedValue> {
    match value {
        Value::Array(items) => Ok(ObservableArray::from_json(items, options.is_shallow()).into()),
        other if Runtime::current().dev_checks() => Err(invalid("array", &other)),
        other => Ok(wrap_json(other, options.is_shallow())),
    }
}

/// Make an observable map from a JSON object or an array of
/// `[key, value]` pairs.
pub fn map(value: Value) -> Result<TrackedValue> {
    map_with(value, CollectionOptions::default())
}

pub fn map_with(value: Value, options: CollectionOptions) -> Result<TrackedValue> {
    let shallow = options.is_shallow();
    match value {
        Value::Object(fields) => {
            Ok(ObservableMap::from_entries(fields.into_iter().collect(), shallow).into())
        }
        Value::Array(items) => match pairs(&items) {
            Some(entries) => Ok(ObservableMap::from_entries(entries, shallow).into()),
            None if Runtime::current().dev_checks() => Err(ReactiveError::InvalidShape {
                expected: "array of [key, value] pairs",
                actual: "array",
            }),
            None => Ok(ObservableArray::from_json(items, shallow).into()),
        },
        other if Runtime::current().dev_checks() => Err(invalid("object or entries", &other)),
        other => Ok(wrap_json(other, shallow)),
    }
}

fn pairs(items: &[Value]) -> Option<Vec<(String, Value)>> {
    items
        .iter()
        .map(|item| match item.as_array().map(Vec::as_slice) {
            Some([Value::String(key), value]) => Some((key.clone(), value.clone())),
            _ => None,
        })
        .collect()
}

/// Make an observable set from a JSON array.
pub fn set(value: Value) -> Result<TrackedValue> {
    set_with(value, CollectionOptions::default())
}

pub fn set_with(value: Value, options: CollectionOptions) -> Result<TrackedValue> {
    match value {
        Value::Array(members) => Ok(ObservableSet::from_json(members, options.is_shallow()).into()),
        other if Runtime::current().dev_checks() => Err(invalid("array", &other)),
        other => Ok(wrap_json(other, options.is_shallow())),
    }
}

/// Assign extra fields onto an observable object in one transaction.
///
/// The values are stored by reference: they are not made observable, but
/// reassigning a field is tracked.
pub fn extend_observable(target: &ObservableObject, props: Map<String, Value>) {
    Runtime::current().transaction(|| {
        for (key, value) in props {
            target.set_ref(key, value);
        }
    });
}

/// Whether `key` is an observable property of `value`.
///
/// Every field of an observable object is observable. Arrays, maps and
/// sets have no properties in this sense; with development checks on,
/// asking is an error pointing at their own membership queries.
pub fn is_observable_prop(value: &TrackedValue, _key: &str) -> Result<bool> {
    match value {
        TrackedValue::Array(_) | TrackedValue::Map(_) | TrackedValue::Set(_)
            if Runtime::current().dev_checks() =>
        {
            Err(ReactiveError::UnsupportedQuery { kind: value.shape() })
        }
        TrackedValue::Object(_) => Ok(true),
        _ => Ok(false),
    }
}
