//! Mode — how an automation combines its constraints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Combination policy applied to an automation's constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Mode {
    /// Every constraint must hold. An automation without constraints never
    /// fires through evaluation.
    #[default]
    And,
    /// At least one constraint must hold.
    Or,
}

impl Mode {
    /// Combine a `(total, triggered)` constraint count into one boolean.
    #[must_use]
    pub fn combine(self, total: usize, triggered: usize) -> bool {
        match self {
            Self::And => total > 0 && triggered == total,
            Self::Or => triggered >= 1,
        }
    }
}

impl FromStr for Mode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("and") {
            Ok(Self::And)
        } else if s.trim().eq_ignore_ascii_case("or") {
            Ok(Self::Or)
        } else {
            Err(ValidationError::UnknownMode(s.to_string()))
        }
    }
}

impl TryFrom<String> for Mode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "AND",
            Self::Or => "OR",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_require_all_constraints_in_and_mode() {
        assert!(Mode::And.combine(2, 2));
        assert!(!Mode::And.combine(2, 1));
    }

    #[test]
    fn should_never_fire_and_mode_without_constraints() {
        assert!(!Mode::And.combine(0, 0));
    }

    #[test]
    fn should_require_one_constraint_in_or_mode() {
        assert!(Mode::Or.combine(3, 1));
        assert!(!Mode::Or.combine(3, 0));
        assert!(!Mode::Or.combine(0, 0));
    }

    #[test]
    fn should_parse_case_insensitively() {
        assert_eq!("AND".parse::<Mode>().unwrap(), Mode::And);
        assert_eq!("or".parse::<Mode>().unwrap(), Mode::Or);
    }

    #[test]
    fn should_reject_unknown_mode() {
        let err = "XOR".parse::<Mode>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownMode("XOR".to_string()));
    }

    #[test]
    fn should_serialize_in_upper_case() {
        assert_eq!(serde_json::to_string(&Mode::Or).unwrap(), "\"OR\"");
    }
}
