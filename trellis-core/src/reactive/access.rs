//! Uniform `keys`/`values`/`entries` over plain and observable values.
//!
//! Observable collections are read through their own accessors, so the
//! calls are tracked. Arrays are keyed by index and sets by their members.
//! Scalars have no keys.

use serde_json::Value;

use crate::deep::TrackedValue;

pub fn keys(value: &TrackedValue) -> Vec<Value> {
    match value {
        TrackedValue::Plain(Value::Object(fields)) => {
            fields.keys().cloned().map(Value::String).collect()
        }
        TrackedValue::Plain(Value::Array(items)) => (0..items.len()).map(Value::from).collect(),
        TrackedValue::Plain(_) => Vec::new(),
        TrackedValue::Object(object) => object.keys().into_iter().map(Value::String).collect(),
        TrackedValue::Array(array) => (0..array.len()).map(Value::from).collect(),
        TrackedValue::Map(map) => map.keys().into_iter().map(Value::String).collect(),
        TrackedValue::Set(set) => set.values(),
    }
}

pub fn values(value: &TrackedValue) -> Vec<TrackedValue> {
    match value {
        TrackedValue::Plain(Value::Object(fields)) => {
            fields.values().cloned().map(TrackedValue::Plain).collect()
        }
        TrackedValue::Plain(Value::Array(items)) => {
            items.iter().cloned().map(TrackedValue::Plain).collect()
        }
        TrackedValue::Plain(_) => Vec::new(),
        TrackedValue::Object(object) => object.values(),
        TrackedValue::Array(array) => array.values(),
        TrackedValue::Map(map) => map.values(),
        TrackedValue::Set(set) => set.values().into_iter().map(TrackedValue::Plain).collect(),
    }
}

pub fn entries(value: &TrackedValue) -> Vec<(Value, TrackedValue)> {
    match value {
        TrackedValue::Plain(Value::Object(fields)) => fields
            .iter()
            .map(|(key, value)| (Value::String(key.clone()), TrackedValue::Plain(value.clone())))
            .collect(),
        TrackedValue::Plain(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| (Value::from(index), TrackedValue::Plain(item.clone())))
            .collect(),
        TrackedValue::Plain(_) => Vec::new(),
        TrackedValue::Object(object) => object
            .entries()
            .into_iter()
            .map(|(key, value)| (Value::String(key), value))
            .collect(),
        TrackedValue::Array(array) => array
            .values()
            .into_iter()
            .enumerate()
            .map(|(index, item)| (Value::from(index), item))
            .collect(),
        TrackedValue::Map(map) => map
            .entries()
            .into_iter()
            .map(|(key, value)| (Value::String(key), value))
            .collect(),
        TrackedValue::Set(set) => set
            .values()
            .into_iter()
            .map(|member| (member.clone(), TrackedValue::Plain(member)))
            .collect(),
    }
}
