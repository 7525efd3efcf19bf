//! Protocol payloads attached to rules once their text has been parsed.
//!
//! The engine only reads the common surface ([`RuleModule::reset`],
//! [`RuleModule::timeout`], [`RuleModule::no_trigger`]); every other field
//! belongs to the adapter that produced the payload.

use std::time::Duration;

use serde::Serialize;

use super::Comparator;
use crate::time::Timestamp;
use crate::value::Value;

/// Parsed, protocol specific state of a rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleModule {
    MqttConstraint(MqttConstraint),
    CronConstraint(CronConstraint),
    MqttAction(MqttAction),
    HttpAction(HttpAction),
}

impl RuleModule {
    /// Window after a true edge at which the constraint clears itself.
    #[must_use]
    pub fn reset(&self) -> Duration {
        match self {
            Self::MqttConstraint(m) => m.reset,
            Self::CronConstraint(c) => c.reset,
            Self::MqttAction(_) | Self::HttpAction(_) => Duration::ZERO,
        }
    }

    /// Silence window after which the constraint sets itself.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        match self {
            Self::MqttConstraint(m) => m.timeout,
            _ => Duration::ZERO,
        }
    }

    /// Whether edges of this constraint may fire its automation.
    #[must_use]
    pub fn no_trigger(&self) -> bool {
        match self {
            Self::MqttConstraint(m) => m.no_trigger,
            Self::CronConstraint(c) => c.no_trigger,
            Self::MqttAction(_) | Self::HttpAction(_) => false,
        }
    }

    /// Whether an action payload asks to run on the opposite edge.
    #[must_use]
    pub fn reverse(&self) -> bool {
        match self {
            Self::MqttAction(a) => a.reverse,
            Self::HttpAction(a) => a.reverse,
            Self::MqttConstraint(_) | Self::CronConstraint(_) => false,
        }
    }
}

/// `topic[.json.path] [comparator value] (options…)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MqttConstraint {
    pub topic: String,
    /// Dotted path into a JSON payload; `None` compares the raw payload.
    pub object: Option<String>,
    /// `None` means "any message on the topic".
    pub comparator: Option<Comparator>,
    pub value: Option<Value>,
    /// Ignore retained messages.
    pub block_retained: bool,
    #[serde(with = "humantime_serde")]
    pub reset: Duration,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub no_trigger: bool,
    /// Do not copy observed values onto the automation.
    pub no_value: bool,
}

/// `<cron expression> (options…)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CronConstraint {
    pub expression: String,
    pub next_fire: Option<Timestamp>,
    #[serde(with = "humantime_serde")]
    pub reset: Duration,
    pub no_trigger: bool,
}

/// `topic[.json.path] value (options…)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MqttAction {
    pub topic: String,
    pub object: Option<String>,
    /// Text values are templates rendered against the automation snapshot.
    pub value: Value,
    pub retained: bool,
    pub reverse: bool,
}

/// `<url template> (options…)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpAction {
    pub url: String,
    pub reverse: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mqtt_constraint() -> MqttConstraint {
        MqttConstraint {
            topic: "home/door".to_string(),
            object: None,
            comparator: None,
            value: None,
            block_retained: false,
            reset: Duration::from_secs(5),
            timeout: Duration::from_secs(60),
            no_trigger: true,
            no_value: false,
        }
    }

    #[test]
    fn should_expose_constraint_timings() {
        let module = RuleModule::MqttConstraint(mqtt_constraint());
        assert_eq!(module.reset(), Duration::from_secs(5));
        assert_eq!(module.timeout(), Duration::from_secs(60));
        assert!(module.no_trigger());
    }

    #[test]
    fn should_report_zero_timings_for_actions() {
        let module = RuleModule::HttpAction(HttpAction {
            url: "http://example.com".to_string(),
            reverse: true,
        });
        assert_eq!(module.reset(), Duration::ZERO);
        assert_eq!(module.timeout(), Duration::ZERO);
        assert!(!module.no_trigger());
        assert!(module.reverse());
    }

    #[test]
    fn should_serialize_with_kind_tag_and_human_durations() {
        let module = RuleModule::MqttConstraint(mqtt_constraint());
        let json = serde_json::to_value(&module).unwrap();
        assert_eq!(json["kind"], "mqtt_constraint");
        assert_eq!(json["reset"], "5s");
        assert_eq!(json["timeout"], "1m");
    }
}
