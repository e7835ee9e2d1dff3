//! Property Registration
//!
//! A [`Prototype<H>`] is the registration point for the reactive properties
//! of a host type `H`. Each declaration records the key's role and returns
//! a typed descriptor the host uses to read and write the property for a
//! receiver (`Rc<H>`):
//!
//! ```rust
//! use std::rc::Rc;
//! use trellis_core::{Depth, Prototype};
//!
//! struct Counter;
//!
//! let proto = Prototype::<Counter>::new("Counter");
//! let count = proto.observable_with("count", Depth::Deep, || 0_i64);
//! let doubled = {
//!     let count = count.clone();
//!     proto.computed("doubled", move |c: &Rc<Counter>| count.get(c).unwrap_or(0) * 2)
//! };
//!
//! let counter = Rc::new(Counter);
//! count.set(&counter, 21);
//! assert_eq!(doubled.get(&counter), 42);
//! assert!(proto.is_computed_prop("doubled"));
//! ```
//!
//! [`Prototype::decorate`] is the bulk form for JSON-valued fields.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::action::{create_action, Action};
use super::computed::ComputedProp;
use super::observable::{Depth, ObservableProp, Observe};
use super::runtime::Runtime;
use crate::deep::TrackedValue;

/// The role a key was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Observable(Depth),
    Computed,
    Action,
}

/// Role registry and descriptor factory for host type `H`.
pub struct Prototype<H> {
    name: String,
    roles: RefCell<IndexMap<String, Role>>,
    _host: PhantomData<fn() -> H>,
}

impl<H: 'static> Prototype<H> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: RefCell::new(IndexMap::new()),
            _host: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn declare(&self, key: &str, role: Role) {
        let previous = self.roles.borrow_mut().insert(key.to_string(), role);
        match previous {
            Some(previous) if previous != role => tracing::debug!(
                prototype = %self.name,
                key,
                ?previous,
                ?role,
                "property redeclared with a different role"
            ),
            _ => tracing::trace!(prototype = %self.name, key, ?role, "property declared"),
        }
    }

    /// Declare an observable property with no initializer.
    pub fn observable<T: Observe>(&self, key: &str, depth: Depth) -> ObservableProp<H, T> {
        self.declare(key, Role::Observable(depth));
        ObservableProp::new(key, depth)
    }

    /// Declare an observable property whose slots start as `initializer()`.
    pub fn observable_with<T, F>(
        &self,
        key: &str,
        depth: Depth,
        initializer: F,
    ) -> ObservableProp<H, T>
    where
        T: Observe,
        F: Fn() -> T + 'static,
    {
        self.declare(key, Role::Observable(depth));
        ObservableProp::with_initializer(key, depth, initializer)
    }

    /// Declare a computed property.
    pub fn computed<T, G>(&self, key: &str, get: G) -> ComputedProp<H, T>
    where
        T: Clone + 'static,
        G: Fn(&Rc<H>) -> T + 'static,
    {
        self.declare(key, Role::Computed);
        ComputedProp::new(key, get)
    }

    /// Declare a computed property with a setter.
    pub fn computed_with_setter<T, G, S>(&self, key: &str, get: G, set: S) -> ComputedProp<H, T>
    where
        T: Clone + 'static,
        G: Fn(&Rc<H>) -> T + 'static,
        S: Fn(&Rc<H>, T) + 'static,
    {
        self.declare(key, Role::Computed);
        ComputedProp::with_setter(key, get, set)
    }

    /// Declare an action method named after its key.
    ///
    /// The action takes the receiver together with its arguments.
    pub fn action<A, R, F>(&self, key: &str, f: F) -> Action<(Rc<H>, A), R>
    where
        F: Fn(&Rc<H>, A) -> R + 'static,
    {
        self.named_action(key, key, f)
    }

    /// Declare an action method with an explicit name.
    pub fn named_action<A, R, F>(&self, key: &str, name: &str, f: F) -> Action<(Rc<H>, A), R>
    where
        F: Fn(&Rc<H>, A) -> R + 'static,
    {
        self.declare(key, Role::Action);
        create_action(name, move |(host, args): (Rc<H>, A)| f(&host, args))
    }

    /// Declare several JSON-valued observable fields at once.
    pub fn decorate<K, I>(&self, fields: I) -> Fields<H>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Depth)>,
    {
        let props = fields
            .into_iter()
            .map(|(key, depth)| {
                let key = key.into();
                let prop = self.observable::<TrackedValue>(&key, depth);
                (key, prop)
            })
            .collect();
        Fields {
            props,
            runtime: Runtime::current(),
        }
    }

    pub fn role(&self, key: &str) -> Option<Role> {
        self.roles.borrow().get(key).copied()
    }

    pub fn is_observable_prop(&self, key: &str) -> bool {
        matches!(self.role(key), Some(Role::Observable(_)))
    }

    pub fn is_computed_prop(&self, key: &str) -> bool {
        self.role(key) == Some(Role::Computed)
    }

    pub fn is_action_prop(&self, key: &str) -> bool {
        self.role(key) == Some(Role::Action)
    }

    /// Declared keys in declaration order.
    pub fn keys(&self) -> Vec<String> {
        self.roles.borrow().keys().cloned().collect()
    }
}

impl<H> std::fmt::Debug for Prototype<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prototype")
            .field("name", &self.name)
            .field("roles", &self.roles.borrow())
            .finish()
    }
}

/// A set of JSON-valued observable fields produced by
/// [`Prototype::decorate`].
pub struct Fields<H> {
    props: IndexMap<String, ObservableProp<H, TrackedValue>>,
    runtime: Runtime,
}

impl<H: 'static> Fields<H> {
    pub fn prop(&self, key: &str) -> Option<&ObservableProp<H, TrackedValue>> {
        self.props.get(key)
    }

    /// Read a field. `None` for unknown or unset fields.
    pub fn get(&self, host: &Rc<H>, key: &str) -> Option<TrackedValue> {
        self.props.get(key).and_then(|prop| prop.get(host))
    }

    /// Write a field. Returns `false` if `key` was not declared.
    pub fn set(&self, host: &Rc<H>, key: &str, value: impl Into<TrackedValue>) -> bool {
        match self.props.get(key) {
            Some(prop) => {
                prop.set(host, value.into());
                true
            }
            None => false,
        }
    }

    /// Write every declared field present in `values` as one transaction.
    /// Returns the number of fields written.
    pub fn assign(&self, host: &Rc<H>, values: Map<String, Value>) -> usize {
        self.runtime.transaction(|| {
            values
                .into_iter()
                .filter(|(key, value)| self.set(host, key, value.clone()))
                .count()
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.props.keys().cloned().collect()
    }
}

impl<H> std::fmt::Debug for Fields<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fields")
            .field("keys", &self.props.keys().collect::<Vec<_>>())
            .finish()
    }
}
