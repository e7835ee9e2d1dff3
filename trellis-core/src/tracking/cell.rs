//! Memoized Cells
//!
//! A cell wraps a zero-argument function and caches its result.
//!
//! # How Cells Work
//!
//! 1. On first evaluation, the cell runs its function inside a tracking
//!    frame and remembers every marker the function consumed.
//!
//! 2. The cell also remembers the clock revision at which the run started.
//!
//! 3. On later evaluations, if no consumed marker was invalidated after that
//!    revision, the cached value is returned without running the function.
//!
//! 4. Either way, the cell's markers are consumed again on behalf of the
//!    enclosing frame, so a computation that reads a cell depends on
//!    everything the cell depends on.
//!
//! Cells are lazy: nothing runs until the first evaluation.

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::Rc;

use super::context::{self, Consumed, TrackingFrame};
use super::marker::{self, Revision};
use super::CellId;

/// A memoized computation.
///
/// Clones share the cache.
pub struct MemoCell<T> {
    inner: Rc<CellInner<T>>,
}

struct CellInner<T> {
    id: CellId,
    compute: Box<dyn Fn() -> T>,
    state: RefCell<CellState<T>>,
    computing: Cell<bool>,
}

struct CellState<T> {
    /// The cached value (None if never computed).
    value: Option<T>,
    /// Markers consumed by the last run.
    dependencies: Consumed,
    /// Clock revision at the start of the last run.
    validated_at: Revision,
}

impl<T> CellState<T> {
    fn is_fresh(&self) -> bool {
        self.value.is_some()
            && self
                .dependencies
                .iter()
                .all(|marker| marker.revision() <= self.validated_at)
    }
}

/// Clears the re-entrancy flag even if the computation unwinds.
struct ComputingGuard<'a>(&'a Cell<bool>);

impl<'a> ComputingGuard<'a> {
    fn set(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for ComputingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T: Clone + 'static> MemoCell<T> {
    /// Create a cell. The function is not run until the first evaluation.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self {
            inner: Rc::new(CellInner {
                id: CellId::new(),
                compute: Box::new(compute),
                state: RefCell::new(CellState {
                    value: None,
                    dependencies: Consumed::new(),
                    validated_at: 0,
                }),
                computing: Cell::new(false),
            }),
        }
    }

    /// Get the cell's unique ID.
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Return the cached value, recomputing first if it is stale.
    ///
    /// # Panics
    ///
    /// Panics if the cell's own function evaluates the cell again.
    pub fn evaluate(&self) -> T {
        if self.inner.computing.get() {
            panic!("cycle detected: {} was evaluated while computing itself", self.inner.id);
        }

        {
            let state = self.inner.state.borrow();
            if state.is_fresh() {
                for marker in &state.dependencies {
                    context::consume(marker);
                }
                if let Some(value) = state.value.as_ref() {
                    return value.clone();
                }
            }
        }

        self.recompute()
    }

    fn recompute(&self) -> T {
        let started = marker::now();

        let (value, dependencies) = {
            let _computing = ComputingGuard::set(&self.inner.computing);
            let frame = TrackingFrame::enter(self.inner.id);
            let value = (self.inner.compute)();
            (value, frame.finish())
        };

        for marker in &dependencies {
            context::consume(marker);
        }

        let mut state = self.inner.state.borrow_mut();
        state.value = Some(value.clone());
        state.dependencies = dependencies;
        state.validated_at = started;

        value
    }

    /// Whether the next evaluation would return the cached value.
    pub fn is_valid(&self) -> bool {
        self.inner.state.borrow().is_fresh()
    }

    /// Check if the cell has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.state.borrow().value.is_some()
    }

    /// Get the number of markers consumed by the last run.
    pub fn dependency_count(&self) -> usize {
        self.inner.state.borrow().dependencies.len()
    }
}

impl<T> Clone for MemoCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Debug for MemoCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("MemoCell")
            .field("id", &self.inner.id)
            .field("fresh", &state.is_fresh())
            .field("dependency_count", &state.dependencies.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{untracked, Marker};

    #[test]
    fn cell_computes_on_first_evaluation() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();

        let cell = MemoCell::new(move || {
            calls_clone.set(calls_clone.get() + 1);
            42
        });

        // Not computed yet
        assert!(!cell.has_value());
        assert_eq!(calls.get(), 0);

        // First evaluation triggers computation
        assert_eq!(cell.evaluate(), 42);
        assert_eq!(calls.get(), 1);
        assert!(cell.has_value());
    }

    #[test]
    fn cell_caches_while_dependencies_valid() {
        let calls = Rc::new(Cell::new(0));
        let marker = Marker::new();

        let cell = {
            let calls = calls.clone();
            let marker = marker.clone();
            MemoCell::new(move || {
                marker.consume();
                calls.set(calls.get() + 1);
                7
            })
        };

        assert_eq!(cell.evaluate(), 7);
        assert_eq!(cell.evaluate(), 7);
        assert_eq!(cell.evaluate(), 7);
        assert_eq!(calls.get(), 1);
        assert_eq!(cell.dependency_count(), 1);
    }

    #[test]
    fn cell_recomputes_after_invalidation() {
        let source = Rc::new(Cell::new(1));
        let marker = Marker::new();

        let cell = {
            let source = source.clone();
            let marker = marker.clone();
            MemoCell::new(move || {
                marker.consume();
                source.get() * 10
            })
        };

        assert_eq!(cell.evaluate(), 10);

        source.set(5);
        assert_eq!(cell.evaluate(), 10, "no invalidation, cached value");

        marker.invalidate();
        assert!(!cell.is_valid());
        assert_eq!(cell.evaluate(), 50);
        assert!(cell.is_valid());
    }

    #[test]
    fn nested_cells_propagate_dependencies() {
        let marker = Marker::new();
        let inner = {
            let marker = marker.clone();
            MemoCell::new(move || {
                marker.consume();
                1
            })
        };
        let outer_calls = Rc::new(Cell::new(0));
        let outer = {
            let inner = inner.clone();
            let outer_calls = outer_calls.clone();
            MemoCell::new(move || {
                outer_calls.set(outer_calls.get() + 1);
                inner.evaluate() + 1
            })
        };

        // Inner evaluated first, outer then reads the cached inner.
        assert_eq!(inner.evaluate(), 1);
        assert_eq!(outer.evaluate(), 2);
        assert_eq!(outer.dependency_count(), 1);

        marker.invalidate();
        assert!(!outer.is_valid());
        assert_eq!(outer.evaluate(), 2);
        assert_eq!(outer_calls.get(), 2);
    }

    #[test]
    fn untracked_reads_do_not_become_dependencies() {
        let marker = Marker::new();
        let cell = {
            let marker = marker.clone();
            MemoCell::new(move || untracked(|| marker.consume()))
        };

        cell.evaluate();
        assert_eq!(cell.dependency_count(), 0);

        marker.invalidate();
        assert!(cell.is_valid());
    }

    #[test]
    fn clone_shares_cache() {
        let cell1 = MemoCell::new(|| 42);
        assert_eq!(cell1.evaluate(), 42);

        let cell2 = cell1.clone();
        assert_eq!(cell1.id(), cell2.id());
        assert!(cell2.has_value());
    }

    #[test]
    #[should_panic(expected = "cycle detected")]
    fn self_evaluation_panics() {
        let slot: Rc<RefCell<Option<MemoCell<i32>>>> = Rc::new(RefCell::new(None));
        let cell = {
            let slot = slot.clone();
            MemoCell::new(move || {
                let me = slot.borrow().clone();
                me.map(|cell| cell.evaluate()).unwrap_or(0)
            })
        };
        *slot.borrow_mut() = Some(cell.clone());
        cell.evaluate();
    }
}
