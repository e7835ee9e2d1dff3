//! Dependency-Tracking Substrate
//!
//! This module provides the two primitives the reactive layer is built on:
//!
//! - [`Marker`]: a validity marker that can be consumed (recording a read
//!   against the computation currently running) and invalidated.
//! - [`MemoCell`]: a memoized zero-argument computation that re-runs only
//!   when a marker it consumed has been invalidated.
//!
//! plus [`untracked`], which hides reads from any enclosing computation,
//! and [`WeakMap`], identity-keyed storage for per-instance state.
//!
//! # Implementation Notes
//!
//! Validity is revision based. A per-thread clock advances on every
//! invalidation; a cell is stale when any marker it consumed carries a
//! revision newer than the one at which the cell last ran. This makes
//! invalidation O(1) and pushes all checking to the (lazy) read side.

mod cell;
mod context;
mod id;
mod marker;
mod weak_map;

pub use cell::MemoCell;
pub use context::{consume, current_owner, is_tracking, untracked, Consumed, TrackingFrame};
pub use id::CellId;
pub use marker::{now, Marker, Revision};
pub use weak_map::WeakMap;
