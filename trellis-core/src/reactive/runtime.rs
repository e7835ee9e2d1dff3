//! Reactive Runtime
//!
//! The runtime is the coordination point between writes and reactions. It
//! owns the transaction counter and the reaction queue, and decides when
//! the queue is flushed.
//!
//! # How It Works
//!
//! 1. A write invalidates a marker inside a transaction. A write outside
//!    any explicit transaction is wrapped in an implicit one.
//!
//! 2. Transactions nest. Only when the outermost one returns (the counter
//!    goes back to zero) is the queue flushed.
//!
//! 3. A flush evaluates every queued reaction in registration order.
//!    Reactions whose dependencies are still valid do nothing.
//!
//! 4. A flush requested while a flush is running (a reaction wrote
//!    something) does not nest; it schedules another pass instead.
//!
//! # Scope
//!
//! Every thread has a default runtime. [`Runtime::new`] creates an isolated
//! one and [`Runtime::enter`] makes it current; primitives capture the
//! current runtime when they are created.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::reaction::ReactionEntry;
use crate::config::Config;
use crate::tracking::{CellId, Marker, TrackingFrame};

thread_local! {
    static CURRENT: RefCell<Option<Runtime>> = const { RefCell::new(None) };
}

/// Handle to a reactive runtime.
///
/// Clones share the same context.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

struct RuntimeInner {
    config: Config,
    /// Transaction nesting depth.
    depth: Cell<usize>,
    /// Registered reactions in registration order.
    queue: RefCell<IndexMap<CellId, Rc<ReactionEntry>>>,
    flushing: Cell<bool>,
    /// A flush was requested while one was running.
    rerun: Cell<bool>,
}

/// Non-owning runtime handle, held by reaction entries so a queued entry
/// does not keep its own runtime alive.
#[derive(Clone)]
pub(crate) struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
    pub(crate) fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }
}

/// Guard returned by [`Runtime::enter`].
///
/// Restores the previously current runtime when dropped.
pub struct RuntimeGuard {
    previous: Option<Runtime>,
}

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// Decrements the transaction depth on every exit path.
struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let depth = self.depth.get();
        debug_assert!(depth > 0, "transaction depth underflow");
        self.depth.set(depth.saturating_sub(1));
        tracing::trace!(depth = depth.saturating_sub(1), "transaction exit");
    }
}

/// Resets the flushing flag even if a reaction panics.
struct FlushGuard<'a> {
    flushing: &'a Cell<bool>,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.flushing.set(false);
    }
}

impl Runtime {
    /// Create an isolated runtime with an empty queue and zero depth.
    pub fn new(config: Config) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                depth: Cell::new(0),
                queue: RefCell::new(IndexMap::new()),
                flushing: Cell::new(false),
                rerun: Cell::new(false),
            }),
        }
    }

    /// The runtime current on this thread, created with the default
    /// configuration on first use.
    pub fn current() -> Self {
        CURRENT.with(|current| {
            current
                .borrow_mut()
                .get_or_insert_with(|| Runtime::new(Config::default()))
                .clone()
        })
    }

    /// Make this runtime current until the returned guard is dropped.
    pub fn enter(&self) -> RuntimeGuard {
        let previous = CURRENT.with(|current| current.borrow_mut().replace(self.clone()));
        RuntimeGuard { previous }
    }

    /// The configuration this runtime was created with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Whether development checks are enabled.
    pub fn dev_checks(&self) -> bool {
        self.inner.config.dev_checks
    }

    /// Current transaction nesting depth.
    pub fn depth(&self) -> usize {
        self.inner.depth.get()
    }

    /// Whether a transaction is in progress.
    pub fn in_transaction(&self) -> bool {
        self.depth() > 0
    }

    /// Number of registered reactions.
    pub fn pending_reactions(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Whether two handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Rc::downgrade(&self.inner))
    }

    /// Run `f` as one atomic batch.
    ///
    /// Reactions are flushed once, when the outermost transaction returns.
    /// If `f` panics the depth is still unwound, but no flush happens; the
    /// invalidated reactions run at the next flush.
    pub fn transaction<R>(&self, f: impl FnOnce() -> R) -> R {
        let result = {
            let depth = self.inner.depth.get() + 1;
            self.inner.depth.set(depth);
            tracing::trace!(depth, "transaction enter");
            let _guard = DepthGuard {
                depth: &self.inner.depth,
            };
            f()
        };

        if self.inner.depth.get() == 0 {
            self.flush();
        }

        result
    }

    /// Invalidate `marker` as an (implicit) single-write transaction.
    pub fn invalidate(&self, marker: &Marker) {
        self.transaction(|| marker.invalidate());
    }

    /// Add a reaction to the queue. Registration counts as a transaction,
    /// so outside a batch the new reaction runs immediately.
    pub(crate) fn register(&self, entry: Rc<ReactionEntry>) {
        self.transaction(|| {
            let id = entry.id();
            let mut queue = self.inner.queue.borrow_mut();
            if !queue.contains_key(&id) {
                tracing::debug!(reaction = %entry.name(), %id, "reaction registered");
                queue.insert(id, entry);
            }
        });
    }

    /// Remove a reaction from the queue. Returns whether it was queued.
    pub(crate) fn unregister(&self, id: CellId) -> bool {
        let removed = self.inner.queue.borrow_mut().shift_remove(&id);
        if let Some(entry) = &removed {
            tracing::debug!(reaction = %entry.name(), %id, "reaction disposed");
        }
        removed.is_some()
    }

    /// Whether the reaction with `id` is queued.
    pub fn is_registered(&self, id: CellId) -> bool {
        self.inner.queue.borrow().contains_key(&id)
    }

    /// Evaluate every queued reaction in registration order.
    fn flush(&self) {
        if self.inner.flushing.get() {
            self.inner.rerun.set(true);
            return;
        }
        self.inner.flushing.set(true);
        let _guard = FlushGuard {
            flushing: &self.inner.flushing,
        };
        // Reactions record into their own frames; nothing leaks to the caller.
        let _hidden = TrackingFrame::untracked();

        let max_passes = self.inner.config.max_flush_passes;
        let mut passes = 0;

        loop {
            self.inner.rerun.set(false);
            passes += 1;

            let pending: Vec<Rc<ReactionEntry>> =
                self.inner.queue.borrow().values().cloned().collect();
            tracing::debug!(pass = passes, reactions = pending.len(), "flushing reactions");

            for entry in pending {
                // Entries disposed earlier in this pass are skipped.
                if !entry.is_disposed() {
                    entry.run();
                }
            }

            if !self.inner.rerun.get() {
                break;
            }
            if passes >= max_passes {
                tracing::error!(
                    passes,
                    "reactions did not settle; abandoning flush \
                     (a reaction keeps invalidating its own dependencies)"
                );
                self.inner.rerun.set(false);
                break;
            }
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("depth", &self.depth())
            .field("pending_reactions", &self.pending_reactions())
            .field("flushing", &self.inner.flushing.get())
            .finish()
    }
}

/// Run `f` as a transaction on the current runtime.
pub fn transaction<R>(f: impl FnOnce() -> R) -> R {
    Runtime::current().transaction(f)
}
