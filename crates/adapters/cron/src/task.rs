//! The schedule loop owned by each deployed cron rule.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;

use commander_app::engine::Engine;
use commander_domain::id::RuleId;
use commander_domain::rule::{CronConstraint, RuleModule};
use commander_domain::time::{self, Timestamp};

/// First occurrence strictly after `after`, evaluated in `timezone`.
#[must_use]
pub fn next_after(schedule: &Schedule, timezone: Tz, after: Timestamp) -> Option<Timestamp> {
    schedule
        .after(&after.with_timezone(&timezone))
        .next()
        .map(|next| next.with_timezone(&Utc))
}

/// Pulse the constraint at every occurrence until the rule goes away.
///
/// The constraint is set, the next occurrence is recorded on the rule and,
/// without a reset window, the constraint is cleared again right away.
pub(crate) async fn run(
    engine: Engine,
    rule_id: RuleId,
    module: CronConstraint,
    schedule: Schedule,
    timezone: Tz,
) {
    let mut next = module.next_fire;
    while let Some(at) = next {
        tokio::time::sleep(until(at)).await;

        let cursor: DateTime<Utc> = at.max(time::now());
        next = next_after(&schedule, timezone, cursor);
        let updated = CronConstraint {
            next_fire: next,
            ..module.clone()
        };
        if engine
            .rules()
            .set_module(rule_id, RuleModule::CronConstraint(updated))
            .is_err()
        {
            break;
        }
        tracing::debug!(rule_id = %rule_id, expression = %module.expression, "schedule fired");
        if engine.set_constraint(rule_id, true).await.is_err() {
            break;
        }
        if module.reset.is_zero() && engine.set_constraint(rule_id, false).await.is_err() {
            break;
        }
    }
    tracing::debug!(rule_id = %rule_id, "schedule loop stopped");
}

fn until(at: Timestamp) -> std::time::Duration {
    (at - time::now()).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::TimeZone;

    use super::*;

    fn schedule(expression: &str) -> Schedule {
        Schedule::from_str(expression).unwrap()
    }

    #[test]
    fn should_evaluate_in_local_timezone() {
        let schedule = schedule("0 30 9 * * *");
        let winter = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2024, 7, 15, 0, 0, 0).unwrap();

        assert_eq!(
            next_after(&schedule, Tz::Europe__Paris, winter),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap())
        );
        assert_eq!(
            next_after(&schedule, Tz::Europe__Paris, summer),
            Some(Utc.with_ymd_and_hms(2024, 7, 15, 7, 30, 0).unwrap())
        );
    }

    #[test]
    fn should_be_strictly_after_cursor() {
        let schedule = schedule("0 * * * * *");
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(
            next_after(&schedule, Tz::UTC, at),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 1, 0).unwrap())
        );
    }

    #[test]
    fn should_end_with_bounded_year() {
        let schedule = schedule("0 0 0 1 1 * 2001");
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(next_after(&schedule, Tz::UTC, at), None);
    }

    #[test]
    fn should_not_wait_for_past_instant() {
        let past = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        assert!(until(past).is_zero());
    }
}
