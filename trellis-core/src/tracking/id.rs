//! Identifiers for tracked computations.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a memoized cell.
///
/// Every cell (computed or reaction) gets one when created. Reactions are
/// keyed by their cell's id in the reaction queue, which is what makes
/// re-registration a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    /// Generate a new unique cell ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_ids_are_unique() {
        let id1 = CellId::new();
        let id2 = CellId::new();
        let id3 = CellId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn cell_ids_increase() {
        let id1 = CellId::new();
        let id2 = CellId::new();
        assert!(id2.raw() > id1.raw());
        assert_eq!(id1.to_string(), format!("cell#{}", id1.raw()));
    }
}
