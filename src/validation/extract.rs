// src/validation/extract.rs

use serde_json::{Map, Value};

/// Structured content pulled out of a free-form reply.
#[derive(Clone, Debug, PartialEq)]
pub struct Payload {
    root: Map<String, Value>,
    text: String,
}

impl Payload {
    pub fn new(root: Map<String, Value>) -> Self {
        let text = Value::Object(root.clone()).to_string();
        Self { root, text }
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Compact serialisation, used for substring checks.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mentions(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    pub fn mentions_ci(&self, needle: &str) -> bool {
        self.text.to_lowercase().contains(&needle.to_lowercase())
    }

    /// First value (depth first) whose key normalises to `key`. Keys are
    /// compared lowercased with everything but letters and digits removed, so
    /// `dequeuedValue`, `dequeued_value` and `Dequeued Value` all match.
    pub fn find_key(&self, key: &str) -> Option<&Value> {
        let wanted = normalize(key);
        find_in_map(&self.root, &|k: &str| normalize(k) == wanted)
    }

    /// First value whose normalised key contains `fragment`.
    pub fn find_key_containing(&self, fragment: &str) -> Option<&Value> {
        let wanted = normalize(fragment);
        find_in_map(&self.root, &|k: &str| normalize(k).contains(&wanted))
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.find_key(key).is_some()
    }
}

fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn find_in_map<'a>(map: &'a Map<String, Value>, matches: &dyn Fn(&str) -> bool) -> Option<&'a Value> {
    if let Some((_, v)) = map.iter().find(|(k, _)| matches(k)) {
        return Some(v);
    }
    map.values().find_map(|v| find_in_value(v, matches))
}

fn find_in_value<'a>(value: &'a Value, matches: &dyn Fn(&str) -> bool) -> Option<&'a Value> {
    match value {
        Value::Object(map) => find_in_map(map, matches),
        Value::Array(items) => items.iter().find_map(|v| find_in_value(v, matches)),
        _ => None,
    }
}

/// Takes everything from the first `{` to the last `}` and parses it as a JSON
/// object. Returns `None` when either brace is missing, they are out of order,
/// or the slice does not parse.
pub fn extract(raw: &str) -> Option<Payload> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if start >= end {
        return None;
    }

    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(root)) => Some(Payload::new(root)),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "reply has braces but no parseable object");
            None
        }
    }
}
