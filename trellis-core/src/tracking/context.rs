//! Tracking Context
//!
//! The tracking context records which markers the currently running cell
//! consumes. This enables automatic dependency tracking: when a marker is
//! consumed, it is attributed to the innermost recording frame.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Evaluating a cell pushes a frame
//! owned by that cell; when the computation completes the frame is popped
//! and its consumed markers become the cell's dependencies.
//!
//! An untracked frame has no owner and swallows reads, which hides them
//! from every enclosing computation. Frames are popped by guards, so the
//! stack stays consistent even if a computation panics.

use std::cell::RefCell;

use smallvec::SmallVec;

use super::{CellId, Marker};

/// Markers consumed by one frame.
pub type Consumed = SmallVec<[Marker; 8]>;

thread_local! {
    static FRAME_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the frame stack.
struct Frame {
    /// The cell being recorded, or `None` for an untracked scope.
    owner: Option<CellId>,
    /// Markers read while this frame was innermost.
    consumed: Consumed,
}

/// Guard that pops its frame when dropped.
pub struct TrackingFrame {
    owner: Option<CellId>,
    finished: bool,
}

impl TrackingFrame {
    /// Start recording reads on behalf of `owner`.
    pub fn enter(owner: CellId) -> Self {
        Self::push(Some(owner))
    }

    /// Start an untracked scope.
    pub fn untracked() -> Self {
        Self::push(None)
    }

    fn push(owner: Option<CellId>) -> Self {
        FRAME_STACK.with(|stack| {
            stack.borrow_mut().push(Frame {
                owner,
                consumed: SmallVec::new(),
            });
        });

        Self {
            owner,
            finished: false,
        }
    }

    /// Pop the frame and return the markers it consumed.
    pub fn finish(mut self) -> Consumed {
        self.finished = true;
        self.pop()
    }

    fn pop(&self) -> Consumed {
        FRAME_STACK.with(|stack| match stack.borrow_mut().pop() {
            Some(frame) => {
                debug_assert_eq!(
                    frame.owner, self.owner,
                    "TrackingFrame mismatch: expected {:?}, got {:?}",
                    self.owner, frame.owner
                );
                frame.consumed
            }
            None => SmallVec::new(),
        })
    }
}

impl Drop for TrackingFrame {
    fn drop(&mut self) {
        if !self.finished {
            self.pop();
        }
    }
}

/// Attribute a read of `marker` to the innermost frame.
pub fn consume(marker: &Marker) {
    FRAME_STACK.with(|stack| {
        if let Some(frame) = stack.borrow_mut().last_mut() {
            if frame.owner.is_some() && !frame.consumed.iter().any(|m| m.ptr_eq(marker)) {
                frame.consumed.push(marker.clone());
            }
        }
    });
}

/// Whether reads are currently being recorded.
pub fn is_tracking() -> bool {
    current_owner().is_some()
}

/// The cell currently recording reads, if any.
pub fn current_owner() -> Option<CellId> {
    FRAME_STACK.with(|stack| stack.borrow().last().and_then(|frame| frame.owner))
}

/// Run `f` so that its reads are invisible to any enclosing computation.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _frame = TrackingFrame::untracked();
    f()
}
