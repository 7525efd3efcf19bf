//! Deploys schedule constraints: one loop task per rule, owned by its
//! automation.

use chrono_tz::Tz;

use commander_app::engine::Engine;
use commander_app::ports::RuleDeployer;
use commander_domain::error::describe;
use commander_domain::rule::{Rule, RuleModule, RuleTag};
use commander_domain::time;

use crate::error::CronError;
use crate::{parse, task};

/// Owns the `CronConstraint` rule tag. Schedules are evaluated in the
/// configured timezone.
pub struct CronDeployer {
    timezone: Tz,
}

impl CronDeployer {
    #[must_use]
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    fn deploy_rule(&self, engine: &Engine, rule: &Rule) -> Result<(), String> {
        let mut module = parse::constraint(&rule.text).map_err(|err| describe(&err))?;
        let schedule = parse::schedule(&module.expression).map_err(|err| describe(&err))?;
        module.next_fire = task::next_after(&schedule, self.timezone, time::now());
        if module.next_fire.is_none() {
            return Err(CronError::Exhausted(module.expression).to_string());
        }

        engine
            .install(rule.id, RuleModule::CronConstraint(module.clone()))
            .map_err(|err| describe(&err))?;
        let handle = tokio::spawn(task::run(
            engine.clone(),
            rule.id,
            module.clone(),
            schedule,
            self.timezone,
        ));
        engine.attach(rule.id, handle).map_err(|err| describe(&err))?;
        tracing::debug!(
            rule_id = %rule.id,
            expression = %module.expression,
            next_fire = ?module.next_fire,
            "schedule armed"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl RuleDeployer for CronDeployer {
    fn name(&self) -> &'static str {
        "cron"
    }

    async fn deploy(&self, engine: &Engine) -> usize {
        let mut installed = 0;
        let pending = engine
            .rules()
            .all_by_tag(RuleTag::CronConstraint)
            .into_iter()
            .filter(|rule| !rule.initialized && rule.error.is_empty());
        for rule in pending {
            match self.deploy_rule(engine, &rule) {
                Ok(()) => installed += 1,
                Err(message) => {
                    let _ = engine.rules().set_error(rule.id, message);
                }
            }
        }
        installed
    }
}
