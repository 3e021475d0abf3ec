//! Helpers for untyped remote values: cleaning, equality and matching

use crate::resource::{Attributes, CONTROL_KEYS, SID};
use serde_json::Value;

/// Strip `null` members from an object.
///
/// Nested objects are always cleaned. With `deep`, arrays are descended
/// into as well, so objects inside lists are cleaned too.
pub fn clean_object(value: Value, deep: bool) -> Value {
    match value {
        Value::Object(map) => Value::Object(clean_attributes(map, deep)),
        Value::Array(items) if deep => Value::Array(
            items
                .into_iter()
                .map(|item| clean_object(item, deep))
                .collect(),
        ),
        other => other,
    }
}

/// [`clean_object`] for an attribute map.
pub fn clean_attributes(attributes: Attributes, deep: bool) -> Attributes {
    attributes
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k, clean_object(v, deep)))
        .collect()
}

/// Structural equality of two values.
///
/// Object member order is irrelevant; numbers compare by representation.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    a == b
}

/// Structural equality of two attribute maps.
pub fn attributes_equal(a: &Attributes, b: &Attributes) -> bool {
    a == b
}

/// JavaScript-style truthiness, used for flags supplied in attribute maps.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Convert a camelCase attribute name to the snake_case spelling remote
/// APIs commonly use in responses.
pub fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Whether a remote object already carries every desired attribute.
///
/// Control keys are ignored. A desired key matches when the remote object
/// has an equal value under the same key or its snake_case spelling.
pub fn matches_remote(found: &Attributes, desired: &Attributes) -> bool {
    desired
        .iter()
        .filter(|(k, _)| !CONTROL_KEYS.contains(&k.as_str()))
        .all(|(k, v)| {
            found
                .get(k)
                .or_else(|| found.get(&to_snake_case(k)))
                .is_some_and(|remote| deep_equal(remote, v))
        })
}

/// The remote identifier (`sid`) of a response, if present.
pub fn remote_id_of(info: &Attributes) -> Option<&str> {
    info.get(SID)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
