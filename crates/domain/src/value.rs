//! Observed values carried by bus messages, constraints and actions.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// A dynamically typed value observed on the bus or written in a rule text.
///
/// Values are inferred from text with [`Value::infer`]: booleans first, then
/// numbers, and anything else stays text. Whole numbers serialize as
/// integers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// Infer a typed value from raw text, trimming surrounding whitespace.
    #[must_use]
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        if let Ok(number) = trimmed.parse::<f64>() {
            if number.is_finite() {
                return Self::Number(number);
            }
        }
        Self::Text(trimmed.to_string())
    }

    /// Short name of the variant, used in datatype mismatch errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
        }
    }

    /// Convert into a JSON value (used when writing into JSON payloads).
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => match whole(*n) {
                Some(i) => serde_json::Value::Number(i.into()),
                None => serde_json::Number::from_f64(*n)
                    .map_or(serde_json::Value::Null, serde_json::Value::Number),
            },
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Build a value from a JSON leaf. Objects and arrays are kept as their
    /// serialized text.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map_or_else(|| Self::Text(n.to_string()), Self::Number),
            serde_json::Value::String(s) => Self::infer(s),
            serde_json::Value::Null => Self::Text(String::new()),
            other => Self::Text(other.to_string()),
        }
    }
}

/// The integer a number holds, if it has no fraction and fits an `i64`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]
fn whole(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64).then_some(n as i64)
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => match whole(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => b.fmt(f),
            Self::Number(n) => n.fmt(f),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_infer_booleans_case_insensitively() {
        assert_eq!(Value::infer("true"), Value::Bool(true));
        assert_eq!(Value::infer(" FALSE "), Value::Bool(false));
    }

    #[test]
    fn should_infer_numbers() {
        assert_eq!(Value::infer("21.5"), Value::Number(21.5));
        assert_eq!(Value::infer("-3"), Value::Number(-3.0));
    }

    #[test]
    fn should_keep_other_text() {
        assert_eq!(Value::infer("on"), Value::Text("on".to_string()));
        assert_eq!(Value::infer("NaN"), Value::Text("NaN".to_string()));
    }

    #[test]
    fn should_display_whole_numbers_without_fraction() {
        assert_eq!(Value::Number(1.0).to_string(), "1");
        assert_eq!(Value::Number(0.5).to_string(), "0.5");
    }

    #[test]
    fn should_read_json_leaves() {
        assert_eq!(
            Value::from_json(&serde_json::json!(true)),
            Value::Bool(true)
        );
        assert_eq!(Value::from_json(&serde_json::json!(12)), Value::Number(12.0));
        assert_eq!(
            Value::from_json(&serde_json::json!("42")),
            Value::Number(42.0)
        );
    }

    #[test]
    fn should_write_whole_numbers_as_json_integers() {
        assert_eq!(Value::Number(80.0).to_json().to_string(), "80");
        assert_eq!(Value::Number(-3.0).to_json().to_string(), "-3");
        assert_eq!(Value::Number(21.5).to_json().to_string(), "21.5");
        assert!(Value::Number(1e300).to_json().is_f64());
    }

    #[test]
    fn should_serialize_whole_numbers_as_integers() {
        assert_eq!(serde_json::to_string(&Value::Number(42.0)).unwrap(), "42");
        assert_eq!(serde_json::to_string(&Value::Number(0.25)).unwrap(), "0.25");
        let back: Value = serde_json::from_str("42").unwrap();
        assert_eq!(back, Value::Number(42.0));
    }

    #[test]
    fn should_serialize_untagged() {
        let json = serde_json::to_string(&Value::Text("hello".to_string())).unwrap();
        assert_eq!(json, "\"hello\"");
    }
}
