use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;

use commander_domain::automation::{Automation, AutomationDefinition};
use commander_domain::error::CommanderError;
use commander_domain::id::AutomationId;
use commander_domain::rule::Rule;
use commander_domain::value::Value;

use super::{Slot, SlotState, Store, automation_not_found};

/// Automation operations of the [`Store`].
#[derive(Clone, Copy)]
pub struct AutomationStore<'a> {
    store: &'a Store,
}

impl<'a> AutomationStore<'a> {
    pub(super) fn new(store: &'a Store) -> Self {
        Self { store }
    }

    fn with<T>(
        &self,
        id: AutomationId,
        f: impl FnOnce(&mut SlotState) -> T,
    ) -> Result<T, CommanderError> {
        let slot = self.store.slot(id).ok_or_else(|| automation_not_found(id))?;
        let mut state = slot.state.write();
        if state.removed {
            return Err(automation_not_found(id));
        }
        Ok(f(&mut state))
    }

    /// Add an automation and every rule its definition declares. The new
    /// automation and its rules start uninitialized.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::Validation`] if the definition is invalid.
    #[tracing::instrument(skip(self, definition), fields(name = %definition.name))]
    pub fn add(
        &self,
        definition: &AutomationDefinition,
        source: &str,
    ) -> Result<AutomationId, CommanderError> {
        definition.validate()?;

        let id = self.store.next_automation_id();
        let rules: Vec<Rule> = definition
            .rules()
            .into_iter()
            .map(|(tag, text)| Rule::new(self.store.next_rule_id(), tag, id, text))
            .collect();
        let rule_ids: Vec<_> = rules.iter().map(|rule| rule.id).collect();
        let automation = Automation::from_definition(id, definition, source);
        let slot = Arc::new(Slot {
            state: RwLock::new(SlotState::new(automation, rules)),
        });

        let mut membership = self.store.membership.write();
        membership.slots.insert(id, slot);
        for rule in rule_ids {
            membership.owners.insert(rule, id);
        }
        tracing::debug!(automation_id = %id, source, "automation added");
        Ok(id)
    }

    /// Stop every timer and task of the automation, then drop it together with
    /// its rules.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the automation does not exist.
    pub fn remove(&self, id: AutomationId) -> Result<(), CommanderError> {
        let slot = self.store.slot(id).ok_or_else(|| automation_not_found(id))?;
        let rule_ids: Vec<_> = {
            let mut state = slot.state.write();
            if state.removed {
                return Err(automation_not_found(id));
            }
            state.removed = true;
            state.timers.shutdown();
            state.rules.iter().map(|rule| rule.id).collect()
        };
        self.store.membership.write().slots.remove(&id);
        self.store.forget_rules(&rule_ids);
        tracing::debug!(automation_id = %id, "automation removed");
        Ok(())
    }

    /// Remove every automation loaded from `source`.
    pub fn remove_by_source(&self, source: &str) -> Vec<AutomationId> {
        let ids: Vec<_> = self
            .by_source(source)
            .into_iter()
            .map(|automation| automation.id)
            .collect();
        ids.into_iter()
            .filter(|id| self.remove(*id).is_ok())
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: AutomationId) -> Option<Automation> {
        let slot = self.store.slot(id)?;
        let state = slot.state.read();
        (!state.removed).then(|| state.automation.clone())
    }

    /// The automation together with the rules it owns.
    #[must_use]
    pub fn get_with_rules(&self, id: AutomationId) -> Option<(Automation, Vec<Rule>)> {
        let slot = self.store.slot(id)?;
        let state = slot.state.read();
        (!state.removed).then(|| (state.automation.clone(), state.rules.clone()))
    }

    /// Every automation, ordered by id.
    #[must_use]
    pub fn all(&self) -> Vec<Automation> {
        self.filtered(|_| true)
    }

    #[must_use]
    pub fn by_source(&self, source: &str) -> Vec<Automation> {
        self.filtered(|automation| automation.source == source)
    }

    /// Automations whose timers have not been armed yet.
    #[must_use]
    pub fn uninitialized(&self) -> Vec<Automation> {
        self.filtered(|automation| !automation.initialized)
    }

    fn filtered(&self, keep: impl Fn(&Automation) -> bool) -> Vec<Automation> {
        self.store
            .slots()
            .iter()
            .filter_map(|slot| {
                let state = slot.state.read();
                (!state.removed && keep(&state.automation)).then(|| state.automation.clone())
            })
            .collect()
    }

    /// Record the last observed value.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the automation does not exist.
    pub fn set_value(&self, id: AutomationId, value: Value) -> Result<(), CommanderError> {
        self.with(id, |state| {
            state.automation.value = Some(value);
            state.automation.value_time = Some(commander_domain::time::now());
        })
    }

    /// Start a round trip measurement; the next true edge stops it.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the automation does not exist.
    pub fn rtt_start(&self, id: AutomationId, at: Instant) -> Result<(), CommanderError> {
        self.with(id, |state| state.rtt_start = Some(at))
    }

    /// Stop a pending round trip measurement and record its duration.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the automation does not exist.
    pub fn rtt_stop(&self, id: AutomationId) -> Result<Option<Duration>, CommanderError> {
        self.with(id, stop_rtt)
    }
}

pub(crate) fn stop_rtt(state: &mut SlotState) -> Option<Duration> {
    let elapsed = state.rtt_start.take()?.elapsed();
    state.automation.rtt = Some(elapsed);
    Some(elapsed)
}
