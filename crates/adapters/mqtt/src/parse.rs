//! Text grammar of bus constraints and actions.
//!
//! ```text
//! constraint: topic[.json.path] [comparator value] (Reset 5s) (Timeout 1m)
//!             (BlockRetained true) (NoTrigger true) (NoValue true)
//! action:     topic[.json.path] [=] value (Retained true) (Reverse true)
//! ```

use regex::Regex;

use commander_domain::dsl;
use commander_domain::error::DslError;
use commander_domain::rule::{Comparator, MqttAction, MqttConstraint};
use commander_domain::value::Value;

use crate::template;

/// Parse the text of a bus constraint.
///
/// # Errors
///
/// Returns a [`DslError`] if the topic is missing, the comparator is
/// unknown, a comparator comes without a value, a text value is not a valid
/// regular expression, or an option carries an invalid value.
pub fn constraint(text: &str) -> Result<MqttConstraint, DslError> {
    let malformed = || DslError::Malformed(text.to_string());
    let (path, rest) = split_word(dsl::head(text));
    let (topic, object) = split_path(path).ok_or_else(malformed)?;

    let (comparator, value) = if rest.is_empty() {
        (None, None)
    } else {
        let (word, value) = split_word(rest);
        let comparator: Comparator = word.parse().map_err(|_| malformed())?;
        if value.is_empty() {
            return Err(malformed());
        }
        let value = Value::infer(value);
        if let Value::Text(pattern) = &value {
            Regex::new(pattern).map_err(|_| malformed())?;
        }
        (Some(comparator), Some(value))
    };

    Ok(MqttConstraint {
        topic,
        object,
        comparator,
        value,
        block_retained: dsl::bool_option(text, "BlockRetained")?,
        reset: dsl::duration_option(text, "Reset")?,
        timeout: dsl::duration_option(text, "Timeout")?,
        no_trigger: dsl::bool_option(text, "NoTrigger")?,
        no_value: dsl::bool_option(text, "NoValue")?,
    })
}

/// Parse the text of a bus action. A leading `=`/`==` before the value is
/// accepted and ignored.
///
/// # Errors
///
/// Returns a [`DslError`] if the topic or the value is missing, a text value
/// is not a valid template, or an option carries an invalid value.
pub fn action(text: &str) -> Result<MqttAction, DslError> {
    let malformed = || DslError::Malformed(text.to_string());
    let (path, rest) = split_word(dsl::head(text));
    let (topic, object) = split_path(path).ok_or_else(malformed)?;

    let raw = match split_word(rest) {
        ("=" | "==", value) => value,
        _ => rest,
    };
    if raw.is_empty() {
        return Err(malformed());
    }
    let value = Value::infer(raw);
    if let Value::Text(source) = &value {
        template::check(source).map_err(|err| DslError::Template(err.to_string()))?;
    }

    Ok(MqttAction {
        topic,
        object,
        value,
        retained: dsl::bool_option(text, "Retained")?,
        reverse: dsl::bool_option(text, "Reverse")?,
    })
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

fn split_path(path: &str) -> Option<(String, Option<String>)> {
    let (topic, object) = match path.split_once('.') {
        Some((topic, object)) => (topic, Some(object)),
        None => (path, None),
    };
    if topic.is_empty() || object.is_some_and(str::is_empty) {
        return None;
    }
    Some((topic.to_string(), object.map(str::to_string)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn should_parse_pulse_constraint() {
        let parsed = constraint("home/doorbell").unwrap();
        assert_eq!(parsed.topic, "home/doorbell");
        assert_eq!(parsed.object, None);
        assert_eq!(parsed.comparator, None);
        assert_eq!(parsed.value, None);
    }

    #[test]
    fn should_parse_json_path_comparison_with_options() {
        let parsed =
            constraint("sensors/hall.motion.state == true (Reset 5s) (NoTrigger true)").unwrap();
        assert_eq!(parsed.topic, "sensors/hall");
        assert_eq!(parsed.object.as_deref(), Some("motion.state"));
        assert_eq!(parsed.comparator, Some(Comparator::Eq));
        assert_eq!(parsed.value, Some(Value::Bool(true)));
        assert_eq!(parsed.reset, Duration::from_secs(5));
        assert!(parsed.no_trigger);
        assert!(!parsed.no_value);
    }

    #[test]
    fn should_parse_numeric_threshold() {
        let parsed = constraint("garden/temperature >= 21.5 (Timeout 1m)").unwrap();
        assert_eq!(parsed.comparator, Some(Comparator::Ge));
        assert_eq!(parsed.value, Some(Value::Number(21.5)));
        assert_eq!(parsed.timeout, Duration::from_secs(60));
    }

    #[test]
    fn should_keep_text_value_with_spaces() {
        let parsed = constraint("tv/state != standby mode").unwrap();
        assert_eq!(parsed.comparator, Some(Comparator::NotEq));
        assert_eq!(parsed.value, Some(Value::Text("standby mode".to_string())));
    }

    #[test]
    fn should_reject_unknown_comparator() {
        assert!(matches!(
            constraint("home/door ~ open"),
            Err(DslError::Malformed(_))
        ));
    }

    #[test]
    fn should_reject_comparator_without_value() {
        assert!(constraint("home/door ==").is_err());
    }

    #[test]
    fn should_reject_missing_topic() {
        assert!(constraint("  (Reset 5s)").is_err());
        assert!(constraint(".state == on").is_err());
    }

    #[test]
    fn should_reject_invalid_option() {
        assert!(matches!(
            constraint("home/door (Reset later)"),
            Err(DslError::InvalidOption { option: "Reset", .. })
        ));
    }

    #[test]
    fn should_parse_action_value() {
        let parsed = action("lights/hall/set ON (Retained true)").unwrap();
        assert_eq!(parsed.topic, "lights/hall/set");
        assert_eq!(parsed.value, Value::Text("ON".to_string()));
        assert!(parsed.retained);
        assert!(!parsed.reverse);
    }

    #[test]
    fn should_accept_assignment_in_action() {
        let parsed = action("lights/hall/set.brightness = 80 (Reverse true)").unwrap();
        assert_eq!(parsed.object.as_deref(), Some("brightness"));
        assert_eq!(parsed.value, Value::Number(80.0));
        assert!(parsed.reverse);
    }

    #[test]
    fn should_reject_action_without_value() {
        assert!(action("lights/hall/set").is_err());
    }

    #[test]
    fn should_reject_broken_template() {
        assert!(matches!(
            action("notify/text {{ name"),
            Err(DslError::Template(_))
        ));
    }
}
