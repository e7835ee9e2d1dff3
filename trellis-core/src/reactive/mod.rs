//! Reactive Layer
//!
//! This module composes the tracking substrate into the user-facing
//! reactive system: observable state, computed values, actions and
//! reactions.
//!
//! # Concepts
//!
//! ## Observables
//!
//! Observable state is anything whose reads are recorded: a [`Boxed`]
//! value, an [`ObservableProp`] slot for some receiver, or one of the deep
//! collections. Every write invalidates the state's marker.
//!
//! ## Computed Values
//!
//! A [`Computed`] is a derivation cached until something it read is
//! invalidated. [`ComputedProp`] does the same per receiver.
//!
//! ## Actions and Transactions
//!
//! A [`transaction`] groups writes: reactions run once, when the outermost
//! transaction returns, and observe the final state. An [`Action`] is a
//! function that always runs as a transaction and untracked.
//!
//! ## Reactions
//!
//! [`autorun`], [`reaction`] and [`when`] register side effects that re-run
//! when their dependencies change. Each returns a [`Disposer`].
//!
//! # Implementation Notes
//!
//! There is no push-based notification. A write only advances the marker's
//! revision; the flush then asks every registered reaction to evaluate,
//! and reactions whose inputs did not change return without running.

mod access;
mod action;
mod computed;
mod decorate;
pub mod observable;
mod provenance;
mod reaction;
mod runtime;

pub use access::{entries, keys, values};
pub use action::{
    action, action_for, named_action, run_in_action, run_in_action_named, Action,
    ActionDecorator, UNNAMED_ACTION,
};
pub use computed::{computed, computed_with_setter, Computed, ComputedProp};
pub use decorate::{Fields, Prototype, Role};
pub use observable::{extend_observable, is_observable_prop, Boxed, Depth, ObservableProp, Observe};
pub use provenance::{
    is_action, is_boxed_observable, is_computed, is_observable, is_observable_array,
    is_observable_map, is_observable_object, is_observable_set, Kind, Provenance,
};
pub use reaction::{
    autorun, autorun_named, reaction, reaction_named, when, when_future, when_future_with,
    when_with, Disposer, WhenHandle, WhenOptions,
};
pub use runtime::{transaction, Runtime, RuntimeGuard};
