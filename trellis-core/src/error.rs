//! Error types for the reactive layer.

/// Errors surfaced by Trellis operations.
///
/// Shape and setter errors are development aids: with `dev_checks` off
/// (the `production` feature) the offending call proceeds unchecked instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReactiveError {
    /// A collection factory received input of the wrong shape.
    #[error("could not make observable {expected}: got {actual}")]
    InvalidShape {
        expected: &'static str,
        actual: &'static str,
    },

    /// A computed value without a setter was assigned.
    #[error("attempted to set computed `{name}` to a new value but it has no setter")]
    MissingSetter { name: String },

    /// A per-property observability query was made against a collection.
    #[error(
        "is_observable_prop(value, key) is not supported for {kind}s; \
         use has, contains or len on the collection instead"
    )]
    UnsupportedQuery { kind: &'static str },

    /// A pending `when` handle was cancelled before its predicate held.
    #[error("when was cancelled")]
    WhenCancelled,
}

/// Convenience alias for results carrying a [`ReactiveError`].
pub type Result<T> = std::result::Result<T, ReactiveError>;
