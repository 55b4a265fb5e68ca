//! crates/shortcut_core/src/document.rs
//!
//! Reference semantics of `FieldUpdate` applied to a plain JSON document.
//! Remote adapters translate updates into backend writes; in-process stores apply
//! them with this function.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::ports::FieldUpdate;

pub fn apply_field_updates(doc: &mut Value, updates: &[FieldUpdate], now: DateTime<Utc>) {
    for update in updates {
        apply_one(doc, update, now);
    }
}

fn apply_one(doc: &mut Value, update: &FieldUpdate, now: DateTime<Utc>) {
    match update {
        FieldUpdate::ArrayUnion { field, value } => {
            let target = slot(doc, std::slice::from_ref(field));
            if !target.is_array() {
                *target = Value::Array(Vec::new());
            }
            if let Value::Array(items) = target {
                let value = Value::String(value.clone());
                if !items.contains(&value) {
                    items.push(value);
                }
            }
        }
        FieldUpdate::ArrayRemove { field, value } => {
            if let Some(Value::Array(items)) = doc.get_mut(field) {
                items.retain(|item| item.as_str() != Some(value.as_str()));
            }
        }
        FieldUpdate::MapSet { field, key, at } => {
            *slot(doc, &[field.clone(), key.clone()]) = Value::String(at.to_rfc3339());
        }
        FieldUpdate::MapDelete { field, key } => {
            if let Some(Value::Object(map)) = doc.get_mut(field) {
                map.remove(key);
            }
        }
        FieldUpdate::Increment { path, by } => {
            let target = slot(doc, path);
            let current = target.as_i64().unwrap_or(0);
            *target = Value::from(current + by);
        }
        FieldUpdate::Set { path, value } => {
            *slot(doc, path) = value.clone();
        }
        FieldUpdate::ServerTimestamp { path } => {
            *slot(doc, path) = Value::String(now.to_rfc3339());
        }
    }
}

/// Walks `path`, turning anything in the way into an object, and returns the leaf.
fn slot<'a>(doc: &'a mut Value, path: &[String]) -> &'a mut Value {
    let mut current = doc;
    for segment in path {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            unreachable!("replaced with an object above")
        };
        current = map.entry(segment.clone()).or_insert(Value::Null);
    }
    current
}
