//! Computed Values
//!
//! A computed value is a memoized derivation. Its getter runs the first
//! time it is read and again only after something it read was invalidated.
//!
//! Two forms:
//!
//! - [`Computed<T>`]: one shared cell, created with [`computed`].
//! - [`ComputedProp<H, T>`]: a derivation declared once and memoized per
//!   receiver. Each receiver gets its own cell on first read; cells are
//!   held weakly by receiver so dropping a receiver drops its cell.
//!
//! Declaring either form runs nothing.

use std::rc::{Rc, Weak};

use super::runtime::Runtime;
use crate::error::{ReactiveError, Result};
use crate::tracking::{MemoCell, WeakMap};

type Setter<T> = Rc<dyn Fn(T)>;

/// A memoized derived value.
pub struct Computed<T> {
    cell: MemoCell<T>,
    setter: Option<Setter<T>>,
    name: Rc<str>,
    runtime: Runtime,
}

/// Create a computed value from a getter.
pub fn computed<T, F>(get: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Computed::build(MemoCell::new(get), None)
}

/// Create a computed value whose `set` forwards to `set`.
pub fn computed_with_setter<T, G, S>(get: G, set: S) -> Computed<T>
where
    T: Clone + 'static,
    G: Fn() -> T + 'static,
    S: Fn(T) + 'static,
{
    Computed::build(MemoCell::new(get), Some(Rc::new(set)))
}

impl<T: Clone + 'static> Computed<T> {
    fn build(cell: MemoCell<T>, setter: Option<Setter<T>>) -> Self {
        Self {
            cell,
            setter,
            name: Rc::from("<computed>"),
            runtime: Runtime::current(),
        }
    }

    /// Set the name used in error messages.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Rc::from(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the value, recomputing if stale.
    pub fn get(&self) -> T {
        self.cell.evaluate()
    }

    /// Pass `value` to the setter.
    ///
    /// Without a setter this is an error when development checks are on
    /// and a no-op otherwise.
    pub fn set(&self, value: T) -> Result<()> {
        match &self.setter {
            Some(setter) => {
                setter(value);
                Ok(())
            }
            None if self.runtime.dev_checks() => Err(ReactiveError::MissingSetter {
                name: self.name.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }

    /// Whether the next read would return the cached value.
    pub fn is_valid(&self) -> bool {
        self.cell.is_valid()
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            setter: self.setter.clone(),
            name: Rc::clone(&self.name),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("name", &self.name)
            .field("has_setter", &self.setter.is_some())
            .finish_non_exhaustive()
    }
}

/// A computed property, memoized per receiver.
pub struct ComputedProp<H, T> {
    inner: Rc<ComputedPropInner<H, T>>,
}

struct ComputedPropInner<H, T> {
    key: String,
    getter: Rc<dyn Fn(&Rc<H>) -> T>,
    setter: Option<Rc<dyn Fn(&Rc<H>, T)>>,
    cells: WeakMap<H, MemoCell<Option<T>>>,
    runtime: Runtime,
}

impl<H: 'static, T: Clone + 'static> ComputedProp<H, T> {
    pub fn new<G>(key: impl Into<String>, get: G) -> Self
    where
        G: Fn(&Rc<H>) -> T + 'static,
    {
        Self::build(key.into(), Rc::new(get), None)
    }

    pub fn with_setter<G, S>(key: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn(&Rc<H>) -> T + 'static,
        S: Fn(&Rc<H>, T) + 'static,
    {
        Self::build(key.into(), Rc::new(get), Some(Rc::new(set)))
    }

    fn build(
        key: String,
        getter: Rc<dyn Fn(&Rc<H>) -> T>,
        setter: Option<Rc<dyn Fn(&Rc<H>, T)>>,
    ) -> Self {
        Self {
            inner: Rc::new(ComputedPropInner {
                key,
                getter,
                setter,
                cells: WeakMap::new(),
                runtime: Runtime::current(),
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Read the receiver's value. The first read creates its cell.
    ///
    /// The cell holds its receiver weakly and yields `None` once the
    /// receiver is gone; the getter then runs directly on `host`.
    pub fn get(&self, host: &Rc<H>) -> T {
        let cell = self.inner.cells.get_or_insert_with(host, || {
            let getter = Rc::clone(&self.inner.getter);
            let weak: Weak<H> = Rc::downgrade(host);
            MemoCell::new(move || weak.upgrade().map(|host| getter(&host)))
        });
        match cell.evaluate() {
            Some(value) => value,
            None => (self.inner.getter)(host),
        }
    }

    /// Invoke the setter for the receiver.
    ///
    /// Without a setter this is an error when development checks are on
    /// and a no-op otherwise.
    pub fn set(&self, host: &Rc<H>, value: T) -> Result<()> {
        match &self.inner.setter {
            Some(setter) => {
                setter(host, value);
                Ok(())
            }
            None if self.inner.runtime.dev_checks() => Err(ReactiveError::MissingSetter {
                name: self.inner.key.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn has_setter(&self) -> bool {
        self.inner.setter.is_some()
    }

    /// Number of live receivers with a cell.
    pub fn cell_count(&self) -> usize {
        self.inner.cells.len()
    }
}

impl<H, T> Clone for ComputedProp<H, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<H, T> std::fmt::Debug for ComputedProp<H, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedProp")
            .field("key", &self.inner.key)
            .field("has_setter", &self.inner.setter.is_some())
            .finish_non_exhaustive()
    }
}
