use std::sync::Arc;

use commander_domain::error::CommanderError;
use commander_domain::id::{AutomationId, RuleId};
use commander_domain::rule::{Rule, RuleModule, RuleTag};
use commander_domain::value::Value;

use super::{Store, automation_not_found, rule_not_found};
use crate::ports::ActionHandler;

/// Rule operations of the [`Store`].
#[derive(Clone, Copy)]
pub struct RuleStore<'a> {
    store: &'a Store,
}

impl<'a> RuleStore<'a> {
    pub(super) fn new(store: &'a Store) -> Self {
        Self { store }
    }

    fn with<T>(&self, id: RuleId, f: impl FnOnce(&mut Rule) -> T) -> Result<T, CommanderError> {
        let slot = self.store.rule_slot(id).ok_or_else(|| rule_not_found(id))?;
        let mut state = slot.state.write();
        if state.removed {
            return Err(rule_not_found(id));
        }
        state.rule_mut(id).map(f).ok_or_else(|| rule_not_found(id))
    }

    fn matching(&self, keep: impl Fn(&Rule) -> bool) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self
            .store
            .slots()
            .iter()
            .flat_map(|slot| {
                let state = slot.state.read();
                if state.removed {
                    return Vec::new();
                }
                state
                    .rules
                    .iter()
                    .filter(|rule| keep(rule))
                    .cloned()
                    .collect()
            })
            .collect();
        rules.sort_by_key(|rule| rule.id);
        rules
    }

    /// Add a rule to an existing automation.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the automation does not exist.
    pub fn add(
        &self,
        tag: RuleTag,
        automation_id: AutomationId,
        text: impl Into<String>,
    ) -> Result<RuleId, CommanderError> {
        let slot = self
            .store
            .slot(automation_id)
            .ok_or_else(|| automation_not_found(automation_id))?;
        let id = self.store.next_rule_id();
        {
            let mut state = slot.state.write();
            if state.removed {
                return Err(automation_not_found(automation_id));
            }
            state.rules.push(Rule::new(id, tag, automation_id, text));
        }
        self.store
            .membership
            .write()
            .owners
            .insert(id, automation_id);
        Ok(id)
    }

    /// Remove a rule, stopping its timers and tasks first.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the rule does not exist.
    pub fn remove(&self, id: RuleId) -> Result<(), CommanderError> {
        let slot = self.store.rule_slot(id).ok_or_else(|| rule_not_found(id))?;
        {
            let mut state = slot.state.write();
            let before = state.rules.len();
            state.rules.retain(|rule| rule.id != id);
            if state.removed || state.rules.len() == before {
                return Err(rule_not_found(id));
            }
            state.timers.release_rule(id);
        }
        self.store.forget_rules(&[id]);
        Ok(())
    }

    /// Remove every rule owned by an automation, returning how many went away.
    pub fn remove_by_automation(&self, automation_id: AutomationId) -> usize {
        let Some(slot) = self.store.slot(automation_id) else {
            return 0;
        };
        let ids: Vec<RuleId> = {
            let mut state = slot.state.write();
            let ids: Vec<_> = state.rules.drain(..).map(|rule| rule.id).collect();
            for id in &ids {
                state.timers.release_rule(*id);
            }
            ids
        };
        self.store.forget_rules(&ids);
        ids.len()
    }

    #[must_use]
    pub fn get(&self, id: RuleId) -> Option<Rule> {
        let slot = self.store.rule_slot(id)?;
        let state = slot.state.read();
        if state.removed {
            return None;
        }
        state.rule(id).cloned()
    }

    #[must_use]
    pub fn all_by_tag(&self, tag: RuleTag) -> Vec<Rule> {
        self.matching(|rule| rule.tag == tag)
    }

    #[must_use]
    pub fn by_automation(&self, automation_id: AutomationId) -> Vec<Rule> {
        self.store
            .slot(automation_id)
            .map(|slot| {
                let state = slot.state.read();
                if state.removed {
                    Vec::new()
                } else {
                    state.rules.clone()
                }
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn by_automation_and_tag(&self, tag: RuleTag, automation_id: AutomationId) -> Vec<Rule> {
        self.by_automation(automation_id)
            .into_iter()
            .filter(|rule| rule.tag == tag)
            .collect()
    }

    /// Attach a parsed payload and mark the rule initialized. Timers are not
    /// touched; see [`Engine::install`](crate::engine::Engine::install).
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the rule does not exist.
    pub fn set_module(&self, id: RuleId, module: RuleModule) -> Result<(), CommanderError> {
        let slot = self.store.rule_slot(id).ok_or_else(|| rule_not_found(id))?;
        let mut state = slot.state.write();
        if state.removed || !state.set_module(id, module) {
            return Err(rule_not_found(id));
        }
        Ok(())
    }

    /// Register the handler invoked when the action fires.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the rule does not exist.
    pub fn set_trigger_handler(
        &self,
        id: RuleId,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<(), CommanderError> {
        if self.get(id).is_none() {
            return Err(rule_not_found(id));
        }
        self.store.handlers.write().insert(id, handler);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the rule does not exist.
    pub fn set_value(&self, id: RuleId, value: Value) -> Result<(), CommanderError> {
        self.with(id, |rule| {
            rule.value = Some(value);
            rule.value_time = Some(commander_domain::time::now());
        })
    }

    /// Write the trigger flag without evaluating the owner; a true write
    /// stamps `triggered_time`.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the rule does not exist.
    pub fn set_trigger(&self, id: RuleId, triggered: bool) -> Result<(), CommanderError> {
        self.with(id, |rule| write_trigger(rule, triggered))
    }

    /// Record the outcome of the last operation on the rule; an empty message
    /// clears the error.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the rule does not exist.
    pub fn set_error(&self, id: RuleId, message: impl Into<String>) -> Result<(), CommanderError> {
        let message = message.into();
        self.with(id, |rule| {
            if !message.is_empty() {
                tracing::error!(
                    rule_id = %rule.id,
                    automation_id = %rule.automation_id,
                    tag = %rule.tag,
                    text = %rule.text,
                    error = %message,
                    "rule error"
                );
            }
            rule.error = message;
        })
    }

    /// `(total, triggered)` over the rules with `tag` owned by an automation.
    #[must_use]
    pub fn count_triggered(&self, tag: RuleTag, automation_id: AutomationId) -> (usize, usize) {
        self.store
            .slot(automation_id)
            .map(|slot| {
                let state = slot.state.read();
                state.count(|candidate| candidate == tag)
            })
            .unwrap_or_default()
    }
}

pub(crate) fn write_trigger(rule: &mut Rule, triggered: bool) {
    rule.triggered = triggered;
    if triggered {
        rule.triggered_time = Some(commander_domain::time::now());
    }
}

#[cfg(test)]
mod tests {
    use commander_domain::automation::{ActionSpec, AutomationDefinition, ConstraintSpec};
    use commander_domain::rule::HttpAction;

    use super::*;

    fn store_with_automation() -> (Store, AutomationId) {
        let store = Store::default();
        let def = AutomationDefinition::builder()
            .name("Kitchen")
            .constraint(ConstraintSpec::mqtt("kitchen/motion"))
            .constraint(ConstraintSpec::cron("*/5 * * * *"))
            .action(ActionSpec::http("http://lamp/on"))
            .build()
            .unwrap();
        let id = store.automations().add(&def, "kitchen.yml").unwrap();
        (store, id)
    }

    #[test]
    fn should_add_rules_with_definition() {
        let (store, id) = store_with_automation();
        let rules = store.rules().by_automation(id);
        assert_eq!(rules.len(), 3);
        assert!(rules.iter().all(|rule| rule.automation_id == id));
        assert!(rules.iter().all(|rule| !rule.initialized));
        assert_eq!(
            store
                .rules()
                .by_automation_and_tag(RuleTag::CronConstraint, id)
                .len(),
            1
        );
    }

    #[test]
    fn should_list_rules_by_tag() {
        let (store, first) = store_with_automation();
        let rule = store
            .rules()
            .add(RuleTag::HttpAction, first, "http://other")
            .unwrap();
        let actions = store.rules().all_by_tag(RuleTag::HttpAction);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[1].id, rule);
    }

    #[test]
    fn should_mark_rule_initialized_when_module_set() {
        let (store, id) = store_with_automation();
        let action = store.rules().by_automation_and_tag(RuleTag::HttpAction, id)[0].id;
        store
            .rules()
            .set_module(
                action,
                RuleModule::HttpAction(HttpAction {
                    url: "http://lamp/on".to_string(),
                    reverse: false,
                }),
            )
            .unwrap();
        let rule = store.rules().get(action).unwrap();
        assert!(rule.initialized);
        assert!(rule.module.is_some());
    }

    #[test]
    fn should_stamp_time_on_true_write_only() {
        let (store, id) = store_with_automation();
        let rule = store.rules().by_automation(id)[0].id;
        store.rules().set_trigger(rule, false).unwrap();
        assert!(store.rules().get(rule).unwrap().triggered_time.is_none());
        store.rules().set_trigger(rule, true).unwrap();
        let rule = store.rules().get(rule).unwrap();
        assert!(rule.triggered);
        assert!(rule.triggered_time.is_some());
    }

    #[test]
    fn should_count_only_initialized_triggered_rules() {
        let (store, id) = store_with_automation();
        let rule = store
            .rules()
            .by_automation_and_tag(RuleTag::MqttConstraint, id)[0]
            .id;
        store.rules().set_trigger(rule, true).unwrap();
        assert_eq!(
            store.rules().count_triggered(RuleTag::MqttConstraint, id),
            (1, 0)
        );
    }

    #[test]
    fn should_record_and_clear_errors() {
        let (store, id) = store_with_automation();
        let rule = store.rules().by_automation(id)[0].id;
        store.rules().set_error(rule, "boom").unwrap();
        assert_eq!(store.rules().get(rule).unwrap().error, "boom");
        store.rules().set_error(rule, "").unwrap();
        assert!(store.rules().get(rule).unwrap().error.is_empty());
    }

    #[test]
    fn should_set_rule_value() {
        let (store, id) = store_with_automation();
        let rule = store.rules().by_automation(id)[0].id;
        store.rules().set_value(rule, Value::Number(21.0)).unwrap();
        let rule = store.rules().get(rule).unwrap();
        assert_eq!(rule.value, Some(Value::Number(21.0)));
        assert!(rule.value_time.is_some());
    }

    #[test]
    fn should_remove_single_rule() {
        let (store, id) = store_with_automation();
        let rule = store.rules().by_automation(id)[0].id;
        store.rules().remove(rule).unwrap();
        assert!(store.rules().get(rule).is_none());
        assert_eq!(store.rules().by_automation(id).len(), 2);
        assert!(store.rules().remove(rule).is_err());
    }

    #[test]
    fn should_remove_rules_by_automation() {
        let (store, id) = store_with_automation();
        assert_eq!(store.rules().remove_by_automation(id), 3);
        assert!(store.rules().by_automation(id).is_empty());
        assert!(store.automations().get(id).is_some());
    }

    #[test]
    fn should_return_not_found_for_unknown_rule() {
        let store = Store::default();
        let err = store
            .rules()
            .set_trigger(RuleId::from_raw(99), true)
            .unwrap_err();
        assert!(matches!(err, CommanderError::NotFound(_)));
    }

    #[test]
    fn should_remove_automation_with_its_rules() {
        let (store, id) = store_with_automation();
        let rules = store.rules().by_automation(id);
        store.automations().remove(id).unwrap();
        assert!(store.automations().get(id).is_none());
        for rule in rules {
            assert!(store.rules().get(rule.id).is_none());
        }
        assert!(store.automations().remove(id).is_err());
    }

    #[test]
    fn should_remove_automations_by_source() {
        let (store, first) = store_with_automation();
        let def = AutomationDefinition::builder().name("Other").build().unwrap();
        let other = store.automations().add(&def, "other.yml").unwrap();

        let removed = store.automations().remove_by_source("kitchen.yml");
        assert_eq!(removed, vec![first]);
        assert_eq!(store.automations().all().len(), 1);
        assert_eq!(store.automations().all()[0].id, other);
    }

    #[test]
    fn should_list_uninitialized_automations() {
        let (store, id) = store_with_automation();
        assert_eq!(store.automations().uninitialized()[0].id, id);
        assert_eq!(store.automations().by_source("kitchen.yml").len(), 1);
        assert!(store.automations().by_source("nope.yml").is_empty());
    }

    #[test]
    fn should_record_automation_value() {
        let (store, id) = store_with_automation();
        store
            .automations()
            .set_value(id, Value::Text("open".to_string()))
            .unwrap();
        let automation = store.automations().get(id).unwrap();
        assert_eq!(automation.value, Some(Value::Text("open".to_string())));
        assert!(automation.value_time.is_some());
    }

    #[test]
    fn should_reject_invalid_definition() {
        let store = Store::default();
        let def = AutomationDefinition::default();
        assert!(matches!(
            store.automations().add(&def, "x.yml"),
            Err(CommanderError::Validation(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn should_measure_round_trip() {
        let (store, id) = store_with_automation();
        assert_eq!(store.automations().rtt_stop(id).unwrap(), None);

        store
            .automations()
            .rtt_start(id, tokio::time::Instant::now())
            .unwrap();
        tokio::time::advance(std::time::Duration::from_millis(250)).await;
        let rtt = store.automations().rtt_stop(id).unwrap();
        assert_eq!(rtt, Some(std::time::Duration::from_millis(250)));
        assert_eq!(
            store.automations().get(id).unwrap().rtt,
            Some(std::time::Duration::from_millis(250))
        );
    }
}
