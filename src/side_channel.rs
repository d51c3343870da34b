//! Codec for the per-entity side channel.
//!
//! Whatever a walker does not model explicitly is serialized into the
//! entity's side channel so export can restore it. Object residue is encoded
//! as compact JSON with sorted keys; an empty residue encodes to the empty
//! string, never `{}`. Scalar and opaque leaves store a bare JSON value (or a
//! raw string for string-typed leaves), which `decode` deliberately ignores.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Encode every field of `fields` whose key is not listed in `exclude`.
pub fn encode(fields: &Map<String, Value>, exclude: &[&str]) -> String {
    let residue: BTreeMap<&str, &Value> = fields
        .iter()
        .map(|(key, value)| (key.as_str(), value))
        .filter(|(key, _)| !exclude.contains(key))
        .collect();
    if residue.is_empty() {
        return String::new();
    }
    serde_json::to_string(&residue).unwrap_or_default()
}

/// Decode an object side channel back into document fields.
///
/// Empty, unparsable and non-object side channels yield no fields; callers
/// holding a scalar leaf use [`decode_value`] instead.
pub fn decode(side_channel: &str) -> Map<String, Value> {
    match decode_value(side_channel) {
        Some(Value::Object(fields)) => fields,
        _ => Map::new(),
    }
}

/// Encode an arbitrary JSON value for an opaque leaf.
pub fn encode_value(value: &Value) -> String {
    value.to_string()
}

/// Parse a side channel as any JSON value; `None` when empty or unparsable.
pub fn decode_value(side_channel: &str) -> Option<Value> {
    if side_channel.trim().is_empty() {
        return None;
    }
    serde_json::from_str(side_channel).ok()
}
