//! In-memory stores for automations and their rules.
//!
//! Every automation lives in its own [`Slot`]: one `RwLock` covering the
//! automation record, the rules it owns and its timers. Store membership
//! (which slots exist, which slot owns a rule) sits behind a separate,
//! narrower lock. That lock is only held to clone a slot handle out and is
//! never held while a slot lock is being acquired.
//!
//! Two borrowed views expose the operations: [`AutomationStore`] and
//! [`RuleStore`]. Getters return owned snapshots.

mod automations;
mod rules;

pub use automations::AutomationStore;
pub use rules::RuleStore;

pub(crate) use automations::stop_rtt;
pub(crate) use rules::write_trigger;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::time::Instant;

use commander_domain::automation::Automation;
use commander_domain::error::{CommanderError, NotFoundError};
use commander_domain::id::{AutomationId, RuleId};
use commander_domain::rule::{Rule, RuleModule, RuleTag};

use crate::ports::ActionHandler;
use crate::timer::TimerManager;

/// One automation together with everything it owns.
pub(crate) struct Slot {
    pub(crate) state: RwLock<SlotState>,
}

pub(crate) struct SlotState {
    pub(crate) automation: Automation,
    pub(crate) rules: Vec<Rule>,
    pub(crate) timers: TimerManager,
    /// Instant of the last accepted true edge, for the pause window.
    pub(crate) last_edge: Option<Instant>,
    pub(crate) rtt_start: Option<Instant>,
    /// Set under the slot lock before the slot leaves the store.
    pub(crate) removed: bool,
}

impl SlotState {
    fn new(automation: Automation, rules: Vec<Rule>) -> Self {
        Self {
            automation,
            rules,
            timers: TimerManager::default(),
            last_edge: None,
            rtt_start: None,
            removed: false,
        }
    }

    pub(crate) fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    pub(crate) fn rule_mut(&mut self, id: RuleId) -> Option<&mut Rule> {
        self.rules.iter_mut().find(|rule| rule.id == id)
    }

    /// `(total, triggered)` over the rules matching `filter`.
    pub(crate) fn count(&self, filter: impl Fn(RuleTag) -> bool) -> (usize, usize) {
        self.rules
            .iter()
            .filter(|rule| filter(rule.tag))
            .fold((0, 0), |(total, triggered), rule| {
                (total + 1, triggered + usize::from(rule.holds()))
            })
    }

    pub(crate) fn set_module(&mut self, id: RuleId, module: RuleModule) -> bool {
        match self.rule_mut(id) {
            Some(rule) => {
                rule.module = Some(module);
                rule.initialized = true;
                true
            }
            None => false,
        }
    }
}

#[derive(Default)]
struct Membership {
    slots: HashMap<AutomationId, Arc<Slot>>,
    owners: HashMap<RuleId, AutomationId>,
}

/// Registry of every live automation and rule.
pub struct Store {
    membership: RwLock<Membership>,
    handlers: RwLock<HashMap<RuleId, Arc<dyn ActionHandler>>>,
    next_automation: AtomicU64,
    next_rule: AtomicU64,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            membership: RwLock::default(),
            handlers: RwLock::default(),
            next_automation: AtomicU64::new(1),
            next_rule: AtomicU64::new(1),
        }
    }
}

impl Store {
    #[must_use]
    pub fn automations(&self) -> AutomationStore<'_> {
        AutomationStore::new(self)
    }

    #[must_use]
    pub fn rules(&self) -> RuleStore<'_> {
        RuleStore::new(self)
    }

    fn next_automation_id(&self) -> AutomationId {
        AutomationId::from_raw(self.next_automation.fetch_add(1, Ordering::Relaxed))
    }

    fn next_rule_id(&self) -> RuleId {
        RuleId::from_raw(self.next_rule.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn slot(&self, id: AutomationId) -> Option<Arc<Slot>> {
        self.membership.read().slots.get(&id).cloned()
    }

    pub(crate) fn rule_slot(&self, id: RuleId) -> Option<Arc<Slot>> {
        let membership = self.membership.read();
        let owner = membership.owners.get(&id)?;
        membership.slots.get(owner).cloned()
    }

    /// Every slot, ordered by automation id.
    pub(crate) fn slots(&self) -> Vec<Arc<Slot>> {
        let membership = self.membership.read();
        let mut ids: Vec<_> = membership.slots.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| membership.slots.get(&id).cloned())
            .collect()
    }

    pub(crate) fn handler(&self, id: RuleId) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.read().get(&id).cloned()
    }

    /// Drop the membership entries and handlers of rules already taken out of
    /// their slot.
    fn forget_rules(&self, ids: &[RuleId]) {
        {
            let mut membership = self.membership.write();
            for id in ids {
                membership.owners.remove(id);
            }
        }
        let mut handlers = self.handlers.write();
        for id in ids {
            handlers.remove(id);
        }
    }
}

pub(crate) fn automation_not_found(id: AutomationId) -> CommanderError {
    NotFoundError {
        entity: "Automation",
        id: id.to_string(),
    }
    .into()
}

pub(crate) fn rule_not_found(id: RuleId) -> CommanderError {
    NotFoundError {
        entity: "Rule",
        id: id.to_string(),
    }
    .into()
}
