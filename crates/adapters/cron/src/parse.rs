//! Text grammar of schedule constraints.
//!
//! ```text
//! constraint: <cron expression> (Reset 5s) (NoTrigger true)
//! ```
//!
//! Expressions use the `sec min hour day-of-month month day-of-week [year]`
//! layout. A classic five field expression is accepted and fires at second 0.

use std::str::FromStr;

use cron::Schedule;

use commander_domain::dsl;
use commander_domain::error::DslError;
use commander_domain::rule::CronConstraint;

use crate::error::CronError;

/// Parse the text of a schedule constraint. `next_fire` is left unset.
///
/// # Errors
///
/// Returns [`DslError::Malformed`] if there is no expression,
/// [`DslError::Schedule`] if it does not parse, or
/// [`DslError::InvalidOption`] for an invalid option value.
pub fn constraint(text: &str) -> Result<CronConstraint, DslError> {
    let expression = normalize(dsl::head(text));
    if expression.is_empty() {
        return Err(DslError::Malformed(text.to_string()));
    }
    schedule(&expression).map_err(|err| DslError::Schedule(format!("{expression:?}: {err}")))?;
    Ok(CronConstraint {
        expression,
        next_fire: None,
        reset: dsl::duration_option(text, "Reset")?,
        no_trigger: dsl::bool_option(text, "NoTrigger")?,
    })
}

/// Collapse whitespace and prepend the seconds field to five field
/// expressions.
#[must_use]
pub fn normalize(expression: &str) -> String {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() == 5 {
        format!("0 {}", fields.join(" "))
    } else {
        fields.join(" ")
    }
}

/// # Errors
///
/// Returns [`CronError::Schedule`] if the expression does not parse.
pub fn schedule(expression: &str) -> Result<Schedule, CronError> {
    Schedule::from_str(expression).map_err(|source| CronError::Schedule {
        expression: expression.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn should_prepend_seconds_to_five_fields() {
        assert_eq!(normalize("*/5  * * * *"), "0 */5 * * * *");
        assert_eq!(normalize("30 0 9 * * Mon-Fri"), "30 0 9 * * Mon-Fri");
    }

    #[test]
    fn should_parse_expression_with_options() {
        let parsed = constraint("0 7 * * * (Reset 5s) (NoTrigger true)").unwrap();
        assert_eq!(parsed.expression, "0 0 7 * * *");
        assert_eq!(parsed.reset, Duration::from_secs(5));
        assert!(parsed.no_trigger);
        assert_eq!(parsed.next_fire, None);
    }

    #[test]
    fn should_accept_shorthand() {
        assert_eq!(constraint("@hourly").unwrap().expression, "@hourly");
    }

    #[test]
    fn should_reject_invalid_expression() {
        assert!(matches!(
            constraint("every morning"),
            Err(DslError::Schedule(_))
        ));
    }

    #[test]
    fn should_reject_empty_expression() {
        assert!(matches!(
            constraint(" (Reset 5s)"),
            Err(DslError::Malformed(_))
        ));
    }

    #[test]
    fn should_reject_invalid_reset() {
        assert!(matches!(
            constraint("0 7 * * * (Reset later)"),
            Err(DslError::InvalidOption { option: "Reset", .. })
        ));
    }
}
