//! Actions
//!
//! An action is a function that runs inside a transaction and untracked:
//! its writes are batched into one flush, and its reads never become
//! dependencies of whatever computation called it.
//!
//! All the entry points ([`action`], [`named_action`], [`action_for`] and
//! the `Prototype` methods) build an [`Action`] through the same
//! constructor, so every action carries its name for diagnostics and can be
//! recognized with `is_action`.

use std::rc::Rc;

use super::runtime::Runtime;
use crate::tracking::untracked;

/// Name given to actions created without one.
pub const UNNAMED_ACTION: &str = "<unnamed action>";

/// A wrapped function taking `A` and returning `R`.
///
/// Use a tuple for several arguments and `()` for none.
pub struct Action<A, R> {
    name: Rc<str>,
    body: Rc<dyn Fn(A) -> R>,
    runtime: Runtime,
}

pub(crate) fn create_action<A, R, F>(name: &str, body: F) -> Action<A, R>
where
    F: Fn(A) -> R + 'static,
{
    Action {
        name: Rc::from(name),
        body: Rc::new(body),
        runtime: Runtime::current(),
    }
}

impl<A, R> Action<A, R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the body as a transaction, without tracking.
    ///
    /// A panic in the body propagates after the transaction depth is
    /// restored.
    pub fn call(&self, args: A) -> R {
        let _span = tracing::trace_span!("action", name = %self.name).entered();
        self.runtime
            .transaction(|| untracked(|| (self.body)(args)))
    }
}

impl<A, R> Clone for Action<A, R> {
    fn clone(&self) -> Self {
        Self {
            name: Rc::clone(&self.name),
            body: Rc::clone(&self.body),
            runtime: self.runtime.clone(),
        }
    }
}

impl<A, R> std::fmt::Debug for Action<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish()
    }
}

/// Wrap `f` as an unnamed action.
pub fn action<A, R, F>(f: F) -> Action<A, R>
where
    F: Fn(A) -> R + 'static,
{
    create_action(UNNAMED_ACTION, f)
}

/// Wrap `f` as an action called `name`.
pub fn named_action<A, R, F>(name: &str, f: F) -> Action<A, R>
where
    F: Fn(A) -> R + 'static,
{
    create_action(name, f)
}

/// A reusable wrapper that names every action it produces.
#[derive(Debug, Clone)]
pub struct ActionDecorator {
    name: Rc<str>,
}

impl ActionDecorator {
    pub fn wrap<A, R, F>(&self, f: F) -> Action<A, R>
    where
        F: Fn(A) -> R + 'static,
    {
        create_action(&self.name, f)
    }
}

/// Build a decorator producing actions called `name`.
pub fn action_for(name: &str) -> ActionDecorator {
    ActionDecorator {
        name: Rc::from(name),
    }
}

/// Run `f` once as an unnamed action.
pub fn run_in_action<R>(f: impl FnOnce() -> R) -> R {
    run_in_action_named(UNNAMED_ACTION, f)
}

/// Run `f` once as an action called `name`.
pub fn run_in_action_named<R>(name: &str, f: impl FnOnce() -> R) -> R {
    let _span = tracing::trace_span!("action", name).entered();
    Runtime::current().transaction(|| untracked(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::reactive::{autorun, Boxed};
    use crate::tracking::MemoCell;
    use std::cell::Cell;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn names() {
        assert_eq!(action(|()| ()).name(), UNNAMED_ACTION);
        assert_eq!(named_action("save", |()| ()).name(), "save");
        assert_eq!(action_for("load").wrap(|x: i32| x).name(), "load");
    }

    #[test]
    fn call_passes_arguments_and_returns() {
        let add = action(|(a, b): (i32, i32)| a + b);
        assert_eq!(add.call((2, 3)), 5);
        assert_eq!(add.clone().call((1, 1)), 2);
    }

    #[test]
    fn writes_are_batched() {
        let rt = Runtime::new(Config::default());
        let _scope = rt.enter();
        let a = Boxed::new(0);
        let b = Boxed::new(0);
        let runs = Rc::new(Cell::new(0));

        let _disposer = {
            let (a, b, runs) = (a.clone(), b.clone(), runs.clone());
            autorun(move || {
                a.get();
                b.get();
                runs.set(runs.get() + 1);
            })
        };

        let both = {
            let (a, b) = (a.clone(), b.clone());
            action(move |value: i32| {
                a.set(value);
                b.set(value);
            })
        };
        both.call(1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn reads_inside_an_action_are_untracked() {
        let value = Boxed::new(1);
        let read = {
            let value = value.clone();
            action(move |()| value.get())
        };
        let cell = {
            let read = read.clone();
            MemoCell::new(move || read.call(()))
        };

        assert_eq!(cell.evaluate(), 1);
        assert_eq!(cell.dependency_count(), 0);
        value.set(2);
        assert!(cell.is_valid());
    }

    #[test]
    fn action_reads_stay_hidden_when_a_reaction_watches_them() {
        let rt = Runtime::new(Config::default());
        let _scope = rt.enter();
        let value = Boxed::new(1);
        let _watcher = {
            let value = value.clone();
            autorun(move || {
                value.get();
            })
        };
        let read = {
            let value = value.clone();
            action(move |()| value.get())
        };
        let cell = {
            let read = read.clone();
            MemoCell::new(move || read.call(()))
        };

        assert_eq!(cell.evaluate(), 1);
        assert_eq!(cell.dependency_count(), 0);
        value.set(2);
        assert!(cell.is_valid());
        assert_eq!(cell.evaluate(), 1);
    }

    #[test]
    fn run_in_action_returns_value() {
        let value = Boxed::new(1);
        let out = run_in_action(|| {
            value.set(2);
            value.get() * 10
        });
        assert_eq!(out, 20);
        assert_eq!(run_in_action_named("noop", || 7), 7);
    }

    #[test]
    fn panics_propagate_after_unwinding() {
        let rt = Runtime::new(Config::default());
        let _scope = rt.enter();
        let fail = named_action("fail", |()| -> () { panic!("boom") });

        let result = catch_unwind(AssertUnwindSafe(|| fail.call(())));
        assert!(result.is_err());
        assert_eq!(rt.depth(), 0);
    }
}
