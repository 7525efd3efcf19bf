//! Rule — the generic storage unit behind constraints and actions.
//!
//! A rule is created from a line of DSL text in an automation definition.
//! It stays inert until the protocol adapter owning its [`RuleTag`] parses the
//! text and attaches a [`RuleModule`] payload.

mod comparator;
mod module;

pub use comparator::{Comparator, ComparisonError};
pub use module::{CronConstraint, HttpAction, MqttAction, MqttConstraint, RuleModule};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::id::{AutomationId, RuleId};
use crate::time::Timestamp;
use crate::value::Value;

/// Kind of a rule: which protocol owns it and whether it is a constraint or
/// an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleTag {
    #[serde(rename = "constraint/cron")]
    CronConstraint,
    #[serde(rename = "constraint/mqtt")]
    MqttConstraint,
    #[serde(rename = "action/http")]
    HttpAction,
    #[serde(rename = "action/mqtt")]
    MqttAction,
}

impl RuleTag {
    /// Every known tag.
    pub const ALL: [Self; 4] = [
        Self::CronConstraint,
        Self::MqttConstraint,
        Self::HttpAction,
        Self::MqttAction,
    ];

    /// The canonical `kind/protocol` string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CronConstraint => "constraint/cron",
            Self::MqttConstraint => "constraint/mqtt",
            Self::HttpAction => "action/http",
            Self::MqttAction => "action/mqtt",
        }
    }

    /// Whether rules with this tag take part in AND/OR evaluation.
    #[must_use]
    pub fn is_constraint(self) -> bool {
        matches!(self, Self::CronConstraint | Self::MqttConstraint)
    }

    /// Whether rules with this tag are invoked on trigger edges.
    #[must_use]
    pub fn is_action(self) -> bool {
        !self.is_constraint()
    }
}

impl fmt::Display for RuleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| format!("unknown rule tag {s:?}"))
    }
}

/// A constraint or action owned by exactly one automation.
#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    pub id: RuleId,
    pub tag: RuleTag,
    pub automation_id: AutomationId,
    pub text: String,
    pub module: Option<RuleModule>,
    /// For constraints: the condition currently holds.
    /// For actions: the last edge that reached the action was a true edge.
    pub triggered: bool,
    pub triggered_time: Option<Timestamp>,
    pub value: Option<Value>,
    pub value_time: Option<Timestamp>,
    pub initialized: bool,
    /// Last error, empty when the last operation succeeded.
    pub error: String,
}

impl Rule {
    /// Create a fresh, uninitialized rule.
    #[must_use]
    pub fn new(
        id: RuleId,
        tag: RuleTag,
        automation_id: AutomationId,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            tag,
            automation_id,
            text: text.into(),
            module: None,
            triggered: false,
            triggered_time: None,
            value: None,
            value_time: None,
            initialized: false,
            error: String::new(),
        }
    }

    /// Whether this rule currently contributes `true` to its automation.
    ///
    /// Uninitialized rules never contribute, whatever their flag says.
    #[must_use]
    pub fn holds(&self) -> bool {
        self.initialized && self.triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_roundtrip_tag_through_str() {
        for tag in RuleTag::ALL {
            assert_eq!(tag.as_str().parse::<RuleTag>().unwrap(), tag);
        }
    }

    #[test]
    fn should_reject_unknown_tag() {
        assert!("constraint/zigbee".parse::<RuleTag>().is_err());
    }

    #[test]
    fn should_classify_constraints_and_actions() {
        assert!(RuleTag::CronConstraint.is_constraint());
        assert!(RuleTag::MqttConstraint.is_constraint());
        assert!(RuleTag::HttpAction.is_action());
        assert!(RuleTag::MqttAction.is_action());
    }

    #[test]
    fn should_serialize_tag_as_kind_string() {
        let json = serde_json::to_string(&RuleTag::MqttAction).unwrap();
        assert_eq!(json, "\"action/mqtt\"");
    }

    #[test]
    fn should_create_inert_rule() {
        let rule = Rule::new(
            RuleId::from_raw(1),
            RuleTag::MqttConstraint,
            AutomationId::from_raw(3),
            "home/door",
        );
        assert!(!rule.initialized);
        assert!(rule.module.is_none());
        assert!(rule.error.is_empty());
    }

    #[test]
    fn should_not_hold_when_uninitialized() {
        let mut rule = Rule::new(
            RuleId::from_raw(1),
            RuleTag::MqttConstraint,
            AutomationId::from_raw(3),
            "home/door",
        );
        rule.triggered = true;
        assert!(!rule.holds());
        rule.initialized = true;
        assert!(rule.holds());
    }
}
