//! Validity markers
//!
//! A marker stands for "this piece of state might have changed". Markers are
//! stamped with a revision from a per-thread clock. Invalidating a marker
//! advances the clock and stamps the marker with the new revision, so any
//! cell that last validated at an older revision knows it is stale.

use std::cell::Cell;
use std::fmt::Debug;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::context;

/// A point on the revision clock.
pub type Revision = u64;

thread_local! {
    static CLOCK: Cell<Revision> = const { Cell::new(1) };
}

/// Counter for generating marker IDs (diagnostics only).
static MARKER_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_marker_id() -> u64 {
    MARKER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// The current revision of this thread's clock.
pub fn now() -> Revision {
    CLOCK.with(Cell::get)
}

fn tick() -> Revision {
    CLOCK.with(|clock| {
        let next = clock.get() + 1;
        clock.set(next);
        next
    })
}

/// An opaque validity marker.
///
/// Clones share the same marker.
#[derive(Clone)]
pub struct Marker {
    inner: Rc<MarkerInner>,
}

struct MarkerInner {
    id: u64,
    revision: Cell<Revision>,
}

impl Marker {
    /// Create a marker stamped with the current revision.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(MarkerInner {
                id: next_marker_id(),
                revision: Cell::new(now()),
            }),
        }
    }

    /// Diagnostic ID of this marker.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The revision at which this marker was last invalidated.
    pub fn revision(&self) -> Revision {
        self.inner.revision.get()
    }

    /// Register a read of this marker with the computation being recorded.
    ///
    /// No-op outside a tracking frame or inside an untracked scope.
    pub fn consume(&self) {
        context::consume(self);
    }

    /// Mark every computation that consumed this marker as stale.
    pub fn invalidate(&self) {
        let revision = tick();
        self.inner.revision.set(revision);
        tracing::trace!(marker = self.inner.id, revision, "marker invalidated");
    }

    /// Whether two handles refer to the same marker.
    pub fn ptr_eq(&self, other: &Marker) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marker")
            .field("id", &self.inner.id)
            .field("revision", &self.revision())
            .finish()
    }
}
