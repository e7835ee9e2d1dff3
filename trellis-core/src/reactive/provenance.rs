//! Provenance queries: what kind of reactive value is this?

use serde_json::Value;

use super::action::Action;
use super::computed::Computed;
use super::observable::Boxed;
use crate::deep::TrackedValue;

/// The kinds of value the predicates recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Action,
    Computed,
    BoxedObservable,
    ObservableObject,
    ObservableArray,
    ObservableMap,
    ObservableSet,
}

impl Kind {
    /// Whether values of this kind are observable collections.
    pub fn is_collection(self) -> bool {
        matches!(
            self,
            Kind::ObservableObject
                | Kind::ObservableArray
                | Kind::ObservableMap
                | Kind::ObservableSet
        )
    }
}

/// Implemented by every value the predicates accept.
pub trait Provenance {
    /// `None` for plain values.
    fn kind(&self) -> Option<Kind>;
}

impl<A, R> Provenance for Action<A, R> {
    fn kind(&self) -> Option<Kind> {
        Some(Kind::Action)
    }
}

impl<T> Provenance for Computed<T> {
    fn kind(&self) -> Option<Kind> {
        Some(Kind::Computed)
    }
}

impl<T> Provenance for Boxed<T> {
    fn kind(&self) -> Option<Kind> {
        Some(Kind::BoxedObservable)
    }
}

impl Provenance for TrackedValue {
    fn kind(&self) -> Option<Kind> {
        match self {
            TrackedValue::Plain(_) => None,
            TrackedValue::Object(_) => Some(Kind::ObservableObject),
            TrackedValue::Array(_) => Some(Kind::ObservableArray),
            TrackedValue::Map(_) => Some(Kind::ObservableMap),
            TrackedValue::Set(_) => Some(Kind::ObservableSet),
        }
    }
}

impl Provenance for Value {
    fn kind(&self) -> Option<Kind> {
        None
    }
}

fn is_kind<P: Provenance + ?Sized>(value: &P, kind: Kind) -> bool {
    value.kind() == Some(kind)
}

pub fn is_action<P: Provenance + ?Sized>(value: &P) -> bool {
    is_kind(value, Kind::Action)
}

pub fn is_computed<P: Provenance + ?Sized>(value: &P) -> bool {
    is_kind(value, Kind::Computed)
}

pub fn is_boxed_observable<P: Provenance + ?Sized>(value: &P) -> bool {
    is_kind(value, Kind::BoxedObservable)
}

/// Whether `value` is an observable object, array, map or set.
pub fn is_observable<P: Provenance + ?Sized>(value: &P) -> bool {
    value.kind().is_some_and(Kind::is_collection)
}

pub fn is_observable_object<P: Provenance + ?Sized>(value: &P) -> bool {
    is_kind(value, Kind::ObservableObject)
}

pub fn is_observable_array<P: Provenance + ?Sized>(value: &P) -> bool {
    is_kind(value, Kind::ObservableArray)
}

pub fn is_observable_map<P: Provenance + ?Sized>(value: &P) -> bool {
    is_kind(value, Kind::ObservableMap)
}

pub fn is_observable_set<P: Provenance + ?Sized>(value: &P) -> bool {
    is_kind(value, Kind::ObservableSet)
}
