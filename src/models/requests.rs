//! Request DTOs for the proxy API
//!
//! Every proxied route takes its input as query parameters. They arrive as
//! raw strings and leave the gate as a typed, key-ordered mapping.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

/// Query string exactly as received.
pub type RawQuery = HashMap<String, String>;

/// Validated query parameters.
///
/// Integers are held as JSON numbers and booleans as JSON booleans so that a
/// caller-supplied `count=1` and a defaulted `count` of 1 are the same value.
/// The `BTreeMap` keeps serialization order stable.
pub type QueryParams = BTreeMap<String, Value>;

/// Renders a parameter value the way it is sent upstream.
pub fn param_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flattens validated parameters into upstream query pairs.
pub fn to_query_pairs(params: &QueryParams) -> BTreeMap<String, String> {
    params
        .iter()
        .map(|(k, v)| (k.clone(), param_to_string(v)))
        .collect()
}
