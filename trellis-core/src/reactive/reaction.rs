//! Reactions
//!
//! A reaction is a side-effecting computation that re-runs when something
//! it read changes.
//!
//! # How Reactions Work
//!
//! 1. Each reaction is a memoized cell producing `()`. Creating one adds it
//!    to the runtime's queue; outside a transaction that also flushes, so
//!    the reaction runs once straight away to establish its dependencies.
//!
//! 2. When a dependency is invalidated nothing runs yet. The next flush
//!    (when the outermost transaction returns) evaluates every queued cell;
//!    cells that are still valid return immediately.
//!
//! 3. Disposal removes the reaction from the queue and marks it so it is
//!    never evaluated again, even by a flush that already picked it up.
//!
//! # Kinds
//!
//! - [`autorun`]: one tracked body, re-run in full.
//! - [`reaction`]: a tracked read phase whose result feeds an untracked
//!   effect phase.
//! - [`when`]: a one-shot reaction that disposes itself the first time its
//!   predicate holds, then runs an effect or resolves a [`WhenHandle`].

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

use super::runtime::{Runtime, WeakRuntime};
use crate::error::{ReactiveError, Result};
use crate::tracking::{untracked, CellId, MemoCell};

/// A queued reaction.
pub(crate) struct ReactionEntry {
    name: String,
    cell: MemoCell<()>,
    disposed: Cell<bool>,
    runtime: WeakRuntime,
}

impl ReactionEntry {
    /// Build an entry whose body receives the entry itself, so one-shot
    /// reactions can dispose themselves.
    fn new<F>(runtime: &Runtime, name: String, body: F) -> Rc<Self>
    where
        F: Fn(&ReactionEntry) + 'static,
    {
        Rc::new_cyclic(|weak: &Weak<ReactionEntry>| {
            let weak = weak.clone();
            ReactionEntry {
                name,
                cell: MemoCell::new(move || {
                    if let Some(entry) = weak.upgrade() {
                        body(&entry);
                    }
                }),
                disposed: Cell::new(false),
                runtime: runtime.downgrade(),
            }
        })
    }

    pub(crate) fn id(&self) -> CellId {
        self.cell.id()
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Evaluate the reaction's cell. A no-op when disposed or still valid.
    pub(crate) fn run(&self) {
        if self.is_disposed() {
            return;
        }
        let _span = tracing::trace_span!("reaction", name = %self.name).entered();
        self.cell.evaluate();
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.unregister(self.id());
        }
    }
}

/// Handle returned by every reaction registration.
///
/// Dropping a disposer does not dispose the reaction; call
/// [`dispose`](Disposer::dispose). Disposing twice is harmless.
#[derive(Clone)]
pub struct Disposer {
    entry: Rc<ReactionEntry>,
}

impl Disposer {
    /// Stop the reaction. Idempotent.
    pub fn dispose(&self) {
        self.entry.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.entry.is_disposed()
    }

    /// The reaction's name, as given at registration.
    pub fn name(&self) -> &str {
        self.entry.name()
    }

    /// The ID of the reaction's cell (its key in the queue).
    pub fn id(&self) -> CellId {
        self.entry.id()
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer")
            .field("name", &self.name())
            .field("id", &self.id())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn register<F>(name: String, body: F) -> Rc<ReactionEntry>
where
    F: Fn(&ReactionEntry) + 'static,
{
    let runtime = Runtime::current();
    let entry = ReactionEntry::new(&runtime, name, body);
    runtime.register(Rc::clone(&entry));
    entry
}

/// Run `f` now and again whenever anything it read changes.
pub fn autorun<F>(f: F) -> Disposer
where
    F: Fn() + 'static,
{
    autorun_named("<autorun>", f)
}

/// [`autorun`] with a name for diagnostics.
pub fn autorun_named<F>(name: impl Into<String>, f: F) -> Disposer
where
    F: Fn() + 'static,
{
    Disposer {
        entry: register(name.into(), move |_| f()),
    }
}

/// Track `track`, and pass its result to `effect` each time it re-runs.
///
/// Only reads made by `track` are dependencies; `effect` runs untracked.
pub fn reaction<T, Track, Effect>(track: Track, effect: Effect) -> Disposer
where
    T: 'static,
    Track: Fn() -> T + 'static,
    Effect: Fn(T) + 'static,
{
    reaction_named("<reaction>", track, effect)
}

/// [`reaction`] with a name for diagnostics.
pub fn reaction_named<T, Track, Effect>(
    name: impl Into<String>,
    track: Track,
    effect: Effect,
) -> Disposer
where
    T: 'static,
    Track: Fn() -> T + 'static,
    Effect: Fn(T) + 'static,
{
    Disposer {
        entry: register(name.into(), move |_| {
            let data = track();
            untracked(|| effect(data));
        }),
    }
}

/// Options for [`when_with`] and [`when_future_with`].
#[derive(Debug, Clone, Default)]
pub struct WhenOptions {
    pub name: Option<String>,
}

impl WhenOptions {
    fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "<when>".to_string())
    }
}

/// Run `effect` once, the first time `predicate` holds.
pub fn when<P, E>(predicate: P, effect: E) -> Disposer
where
    P: Fn() -> bool + 'static,
    E: FnOnce() + 'static,
{
    when_with(predicate, effect, WhenOptions::default())
}

/// [`when`] with options.
pub fn when_with<P, E>(predicate: P, effect: E, options: WhenOptions) -> Disposer
where
    P: Fn() -> bool + 'static,
    E: FnOnce() + 'static,
{
    let effect = RefCell::new(Some(effect));
    Disposer {
        entry: register(options.name(), move |entry| {
            if predicate() {
                entry.dispose();
                let pending = effect.borrow_mut().take();
                if let Some(effect) = pending {
                    untracked(effect);
                }
            }
        }),
    }
}

/// Resolve a [`WhenHandle`] the first time `predicate` holds.
pub fn when_future<P>(predicate: P) -> WhenHandle
where
    P: Fn() -> bool + 'static,
{
    when_future_with(predicate, WhenOptions::default())
}

/// [`when_future`] with options.
pub fn when_future_with<P>(predicate: P, options: WhenOptions) -> WhenHandle
where
    P: Fn() -> bool + 'static,
{
    let state = Rc::new(RefCell::new(WhenState::default()));
    let entry = {
        let state = Rc::clone(&state);
        register(options.name(), move |entry| {
            if predicate() {
                entry.dispose();
                settle(&state, Ok(()));
            }
        })
    };
    WhenHandle { state, entry }
}

#[derive(Default)]
struct WhenState {
    outcome: Option<Result<()>>,
    waker: Option<Waker>,
}

/// The first outcome wins; later ones are ignored.
fn settle(state: &RefCell<WhenState>, outcome: Result<()>) {
    let waker = {
        let mut state = state.borrow_mut();
        if state.outcome.is_some() {
            return;
        }
        state.outcome = Some(outcome);
        state.waker.take()
    };
    if let Some(waker) = waker {
        waker.wake();
    }
}

/// A pending one-shot reaction.
///
/// Resolves to `Ok(())` once the predicate holds, or to
/// `Err(ReactiveError::WhenCancelled)` if cancelled first.
pub struct WhenHandle {
    state: Rc<RefCell<WhenState>>,
    entry: Rc<ReactionEntry>,
}

impl WhenHandle {
    /// Dispose the reaction and reject the handle. No-op once settled.
    pub fn cancel(&self) {
        if self.is_settled() {
            return;
        }
        self.entry.dispose();
        settle(&self.state, Err(ReactiveError::WhenCancelled));
    }

    /// Whether the handle has resolved or been cancelled.
    pub fn is_settled(&self) -> bool {
        self.state.borrow().outcome.is_some()
    }

    /// The outcome, if settled.
    pub fn outcome(&self) -> Option<Result<()>> {
        self.state.borrow().outcome.clone()
    }

    /// A disposer for the underlying reaction.
    pub fn disposer(&self) -> Disposer {
        Disposer {
            entry: Rc::clone(&self.entry),
        }
    }
}

impl Future for WhenHandle {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.state.borrow_mut();
        match state.outcome.clone() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl std::fmt::Debug for WhenHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhenHandle")
            .field("name", &self.entry.name())
            .field("outcome", &self.outcome())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
