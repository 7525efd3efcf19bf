//! Option helpers shared by every constraint/action text grammar.
//!
//! A rule text is a protocol specific head followed by any number of
//! parenthesised options, e.g. `sensors/door.open == true (Reset 5s)`.
//! Protocol adapters parse the head; the options are read here.

use std::time::Duration;

use regex::Regex;

use crate::error::DslError;

/// Return the head of a rule text: everything before the first option.
#[must_use]
pub fn head(text: &str) -> &str {
    text.split_once('(').map_or(text, |(head, _)| head).trim()
}

/// Find the raw value of `(Name value)` in a rule text.
#[must_use]
pub fn find_option<'t>(text: &'t str, name: &str) -> Option<&'t str> {
    let pattern = format!(r"\({}\s+(\S+?)\)", regex::escape(name));
    // The pattern is built from an escaped literal, so it always compiles.
    let re = Regex::new(&pattern).ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Read a duration option such as `(Reset 5s)`; absent means zero.
///
/// # Errors
///
/// Returns [`DslError::InvalidOption`] if the value is not a valid duration.
pub fn duration_option(text: &str, name: &'static str) -> Result<Duration, DslError> {
    match find_option(text, name) {
        None => Ok(Duration::ZERO),
        Some(raw) => humantime::parse_duration(raw).map_err(|_| DslError::InvalidOption {
            option: name,
            value: raw.to_string(),
        }),
    }
}

/// Read a boolean option such as `(NoTrigger true)`; absent means `false`.
///
/// # Errors
///
/// Returns [`DslError::InvalidOption`] if the value is not a boolean.
pub fn bool_option(text: &str, name: &'static str) -> Result<bool, DslError> {
    match find_option(text, name) {
        None => Ok(false),
        Some("1" | "t" | "T" | "true" | "True" | "TRUE") => Ok(true),
        Some("0" | "f" | "F" | "false" | "False" | "FALSE") => Ok(false),
        Some(raw) => Err(DslError::InvalidOption {
            option: name,
            value: raw.to_string(),
        }),
    }
}
