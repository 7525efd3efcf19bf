//! # commander-adapter-cron
//!
//! Cron adapter — time based constraints.
//!
//! ## Responsibilities
//! - Parse schedule constraints (`<expression> (Reset 5s) (NoTrigger true)`)
//! - Spawn one loop per rule that pulses the constraint at every occurrence,
//!   evaluated in the configured timezone
//! - Hand each loop over to the engine so it stops with its automation
//!
//! ## Dependency rule
//! Same as other adapters: depends on `commander-app` and `commander-domain`.

pub mod deployer;
pub mod error;
pub mod parse;
pub mod task;

pub use deployer::CronDeployer;
pub use error::CronError;

use chrono_tz::Tz;

/// Resolve an IANA timezone name such as `Europe/Paris`.
///
/// # Errors
///
/// Returns [`CronError::Timezone`] if the name is unknown.
pub fn timezone(name: &str) -> Result<Tz, CronError> {
    name.parse::<Tz>()
        .map_err(|_| CronError::Timezone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_resolve_iana_name() {
        assert_eq!(timezone("Europe/Paris").unwrap(), Tz::Europe__Paris);
        assert_eq!(timezone("UTC").unwrap(), Tz::UTC);
    }

    #[test]
    fn should_reject_unknown_name() {
        assert!(matches!(timezone("Mars/Olympus"), Err(CronError::Timezone(_))));
    }
}
