//! Trellis Core
//!
//! This crate provides a fine-grained reactive state layer. It implements:
//!
//! - Observable state (boxed values, per-receiver properties, deep JSON
//!   collections)
//! - Memoized computed values
//! - Actions and nested transactions
//! - Reactions (`autorun`, `reaction`, `when`) flushed after each
//!   outermost transaction
//!
//! Dependents re-evaluate exactly when a value they actually read changes.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `tracking`: validity markers, memo cells and the tracking context
//! - `deep`: observable JSON objects, arrays, maps and sets
//! - `reactive`: the runtime, observables, computed values, actions,
//!   reactions and property registration
//! - `config`, `error`: runtime configuration and error types
//!
//! Everything is single threaded. Each thread has its own default
//! [`Runtime`]; tests can create isolated ones with [`Runtime::new`].
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use trellis_core::{autorun, computed, transaction, Boxed};
//!
//! let count = Boxed::new(1);
//! let doubled = {
//!     let count = count.clone();
//!     computed(move || count.get() * 2)
//! };
//!
//! let seen = Rc::new(Cell::new(0));
//! let disposer = {
//!     let seen = seen.clone();
//!     autorun(move || seen.set(doubled.get()))
//! };
//! assert_eq!(seen.get(), 2);
//!
//! // Both writes are observed by a single run.
//! transaction(|| {
//!     count.set(4);
//!     count.set(5);
//! });
//! assert_eq!(seen.get(), 10);
//!
//! disposer.dispose();
//! ```

pub mod config;
pub mod deep;
pub mod error;
pub mod reactive;
pub mod tracking;

pub use config::Config;
pub use deep::{
    is_wrapped, wrap, wrap_json, ObservableArray, ObservableMap, ObservableObject, ObservableSet,
    TrackedValue,
};
pub use error::{ReactiveError, Result};
pub use reactive::observable;
pub use reactive::{
    action, action_for, autorun, autorun_named, computed, computed_with_setter, entries,
    extend_observable, is_action, is_boxed_observable, is_computed, is_observable,
    is_observable_array, is_observable_map, is_observable_object, is_observable_prop,
    is_observable_set, keys, named_action, reaction, reaction_named, run_in_action,
    run_in_action_named, transaction, values, when, when_future, when_future_with, when_with,
    Action, Boxed, Computed, ComputedProp, Depth, Disposer, Fields, ObservableProp, Prototype,
    Runtime, WhenHandle, WhenOptions,
};
pub use tracking::untracked;
