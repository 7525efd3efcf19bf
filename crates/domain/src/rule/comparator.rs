//! Comparators used by bus constraints.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Comparison written between the observed path and the expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    /// `=` or `==`
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

/// Why an observed value could not be compared.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ComparisonError {
    #[error("datatype mismatch: observed {observed}, expected {expected}")]
    Mismatch {
        observed: &'static str,
        expected: &'static str,
    },
    #[error("invalid pattern {0:?}")]
    Pattern(String),
}

impl Comparator {
    /// Compare an observed value against the expected one.
    ///
    /// Text is matched as a regular expression (the expected value is the
    /// pattern), so only `==` and `!=` can hold for text. Booleans support
    /// `==` and `!=` only as well; every other combination is `false`.
    ///
    /// # Errors
    ///
    /// Returns [`ComparisonError::Mismatch`] when both sides have different
    /// types and [`ComparisonError::Pattern`] when the expected text is not a
    /// valid regular expression.
    #[allow(clippy::float_cmp)]
    pub fn evaluate(self, observed: &Value, expected: &Value) -> Result<bool, ComparisonError> {
        match (observed, expected) {
            (Value::Bool(a), Value::Bool(b)) => Ok(match self {
                Self::Eq => a == b,
                Self::NotEq => a != b,
                _ => false,
            }),
            (Value::Number(a), Value::Number(b)) => Ok(match self {
                Self::Eq => a == b,
                Self::NotEq => a != b,
                Self::Lt => a < b,
                Self::Le => a <= b,
                Self::Gt => a > b,
                Self::Ge => a >= b,
            }),
            (Value::Text(text), Value::Text(pattern)) => {
                let re = Regex::new(pattern)
                    .map_err(|_| ComparisonError::Pattern(pattern.clone()))?;
                let matched = re.is_match(text);
                Ok(match self {
                    Self::Eq => matched,
                    Self::NotEq => !matched,
                    _ => false,
                })
            }
            (observed, expected) => Err(ComparisonError::Mismatch {
                observed: observed.kind(),
                expected: expected.kind(),
            }),
        }
    }

    /// Outcome used when the comparison itself failed: only `!=` holds.
    #[must_use]
    pub fn on_error(self) -> bool {
        self == Self::NotEq
    }
}

impl FromStr for Comparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" | "==" => Ok(Self::Eq),
            "!=" => Ok(Self::NotEq),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            other => Err(format!("unknown comparator {other:?}")),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        })
    }
}
