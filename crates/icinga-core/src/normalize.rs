//! Response normalization.
//!
//! Icinga answers with a JSON envelope `{"results": [...]}` for most endpoints
//! and with flat objects for some error paths. [`Document`] wraps the decoded
//! body and lets each call site pick the shape it expects: a single object
//! ([`Document::first_result`]) or a collection ([`Document::results`]).
//!
//! Object keys are strings by construction (`serde_json::Map<String, Value>`),
//! at every nesting depth.

use serde_json::{Map, Value};

/// Name of the envelope key.
pub const RESULTS_KEY: &str = "results";

/// A decoded, normalized response body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document(Value);

impl Document {
    /// Wrap an already decoded value.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// Decode a raw body. An empty or whitespace-only body decodes to `null`.
    ///
    /// # Errors
    ///
    /// Returns the decoder error for malformed JSON.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, serde_json::Error> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(Value::Null));
        }
        serde_json::from_slice(raw).map(Self)
    }

    /// Borrow the whole document.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Take the whole document.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Returns true if the document is an object with a `results` key.
    #[must_use]
    pub fn has_results(&self) -> bool {
        self.0.get(RESULTS_KEY).is_some()
    }

    /// Collection view: the `results` array, or the document itself when it is
    /// already an array. A lone object is returned as a one-element list; `null`
    /// is an empty list.
    #[must_use]
    pub fn results(&self) -> Vec<Value> {
        match &self.0 {
            Value::Object(map) => match map.get(RESULTS_KEY) {
                Some(Value::Array(items)) => items.clone(),
                Some(Value::Null) => Vec::new(),
                Some(other) => vec![other.clone()],
                None => vec![self.0.clone()],
            },
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        }
    }

    /// Single-object view: the first `results` entry, or the document itself
    /// when there is no envelope.
    #[must_use]
    pub fn first_result(&self) -> Option<Value> {
        match &self.0 {
            Value::Object(map) => match map.get(RESULTS_KEY) {
                Some(Value::Array(items)) => items.first().cloned(),
                Some(Value::Null) => None,
                Some(other) => Some(other.clone()),
                None => Some(self.0.clone()),
            },
            Value::Array(items) => items.first().cloned(),
            Value::Null => None,
            other => Some(other.clone()),
        }
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Look up a string field.
#[must_use]
pub fn str_field<'a>(object: &'a Value, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

/// Read a numeric field as `f64`, accepting integers, floats and numeric
/// strings. Missing or non-numeric fields read as zero.
#[must_use]
pub fn number_field(object: &Value, key: &str) -> f64 {
    match object.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

/// Read a non-negative counter. The API reports counters as floats (`3.0`).
#[must_use]
pub fn count_field(object: &Value, key: &str) -> u64 {
    let value = number_field(object, key);
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

/// Build a JSON object from key/value pairs, dropping `null` values.
#[must_use]
pub fn compact_object<I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    let map: Map<String, Value> = pairs
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.to_string(), value))
        .collect();
    Value::Object(map)
}
