//! Engine — combines constraint states and drives the trigger state machine.
//!
//! ## Evaluation
//! Counting the constraints of an automation, applying the resulting edge
//! and snapshotting the action handlers to invoke all happen under one write
//! lock of its slot, so two concurrent constraint updates can never both
//! observe a stale count and a cleared automation never runs its actions.
//! Action handlers are invoked afterwards, once the lock has been released.
//!
//! ## True edge
//! 1. Already triggered: a retriggerable automation re-runs its actions,
//!    any other one ignores the edge.
//! 2. Inside the pause window since the last accepted edge: ignored.
//! 3. Otherwise the actions run now, or once the delay has elapsed.
//! 4. With a reminder the actions repeat every reminder period.
//!
//! ## False edge
//! Delay and reminder timers stop, the actions are marked stopped and, on a
//! real true→false transition, reverse actions run.

use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, join_all};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use commander_domain::automation::AutomationDefinition;
use commander_domain::error::{CommanderError, describe};
use commander_domain::id::{AutomationId, RuleId};
use commander_domain::rule::{RuleModule, RuleTag};

use crate::ports::{ActionHandler, ActionInvocation, Edge};
use crate::store::{
    AutomationStore, RuleStore, SlotState, Store, automation_not_found, rule_not_found, stop_rtt,
    write_trigger,
};
use crate::timer::{Fire, OnFire, TimerKind};

/// Handlers snapshotted under the slot lock, invoked once it is released.
type Invocations = Vec<(Arc<dyn ActionHandler>, ActionInvocation)>;

#[derive(Default)]
struct Inner {
    store: Store,
    muted: bool,
}

/// The automation trigger engine. Cloning is cheap; every clone drives the
/// same stores.
#[derive(Clone, Default)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine that evaluates everything but never invokes action handlers.
    #[must_use]
    pub fn with_muted(muted: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: Store::default(),
                muted,
            }),
        }
    }

    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.inner.muted
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    #[must_use]
    pub fn automations(&self) -> AutomationStore<'_> {
        self.inner.store.automations()
    }

    #[must_use]
    pub fn rules(&self) -> RuleStore<'_> {
        self.inner.store.rules()
    }

    /// # Errors
    ///
    /// Returns [`CommanderError::Validation`] if the definition is invalid.
    pub fn add(
        &self,
        definition: &AutomationDefinition,
        source: &str,
    ) -> Result<AutomationId, CommanderError> {
        self.automations().add(definition, source)
    }

    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the automation does not exist.
    pub fn remove(&self, id: AutomationId) -> Result<(), CommanderError> {
        self.automations().remove(id)
    }

    pub fn remove_by_source(&self, source: &str) -> Vec<AutomationId> {
        self.automations().remove_by_source(source)
    }

    /// Attach a parsed payload to a rule and arm the timers it asks for.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the rule does not exist.
    pub fn install(&self, rule_id: RuleId, module: RuleModule) -> Result<(), CommanderError> {
        let slot = self
            .inner
            .store
            .rule_slot(rule_id)
            .ok_or_else(|| rule_not_found(rule_id))?;
        let mut state = slot.state.write();
        let (reset, timeout) = (module.reset(), module.timeout());
        if state.removed || !state.set_module(rule_id, module) {
            return Err(rule_not_found(rule_id));
        }
        let owner = state.automation.id;
        if !reset.is_zero() {
            let kind = TimerKind::Reset(rule_id);
            state.timers.ensure(kind, || self.on_fire(owner, kind));
        }
        if !timeout.is_zero() {
            let kind = TimerKind::Timeout(rule_id);
            state.timers.arm(kind, timeout, || self.on_fire(owner, kind));
        }
        Ok(())
    }

    /// Hand a collaborator task over to the rule's automation. The task is
    /// aborted when the automation goes away, or right now if the rule is
    /// already gone.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the rule does not exist.
    pub fn attach(&self, rule_id: RuleId, handle: JoinHandle<()>) -> Result<(), CommanderError> {
        let Some(slot) = self.inner.store.rule_slot(rule_id) else {
            handle.abort();
            return Err(rule_not_found(rule_id));
        };
        let mut state = slot.state.write();
        if state.removed || state.rule(rule_id).is_none() {
            handle.abort();
            return Err(rule_not_found(rule_id));
        }
        state.timers.attach(rule_id, handle);
        Ok(())
    }

    /// Restart the silence window of a constraint with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the rule does not exist.
    pub fn rearm_timeout(&self, rule_id: RuleId) -> Result<(), CommanderError> {
        let slot = self
            .inner
            .store
            .rule_slot(rule_id)
            .ok_or_else(|| rule_not_found(rule_id))?;
        let mut state = slot.state.write();
        if state.removed {
            return Err(rule_not_found(rule_id));
        }
        let timeout = state
            .rule(rule_id)
            .ok_or_else(|| rule_not_found(rule_id))?
            .module
            .as_ref()
            .map_or(Duration::ZERO, RuleModule::timeout);
        if !timeout.is_zero() {
            let owner = state.automation.id;
            let kind = TimerKind::Timeout(rule_id);
            state.timers.arm(kind, timeout, || self.on_fire(owner, kind));
        }
        Ok(())
    }

    /// Write a constraint state and re-evaluate its automation.
    ///
    /// A true write on a constraint with a reset window arms the reset timer.
    /// Constraints flagged `no_trigger` never produce a true edge themselves.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the rule does not exist.
    pub async fn set_constraint(&self, rule_id: RuleId, triggered: bool) -> Result<(), CommanderError> {
        let invocations = {
            let slot = self
                .inner
                .store
                .rule_slot(rule_id)
                .ok_or_else(|| rule_not_found(rule_id))?;
            let mut state = slot.state.write();
            if state.removed {
                return Err(rule_not_found(rule_id));
            }
            let owner = state.automation.id;
            let rule = state.rule_mut(rule_id).ok_or_else(|| rule_not_found(rule_id))?;
            let (reset, no_trigger) = rule
                .module
                .as_ref()
                .map_or((Duration::ZERO, false), |m| (m.reset(), m.no_trigger()));
            write_trigger(rule, triggered);
            if triggered && !reset.is_zero() {
                let kind = TimerKind::Reset(rule_id);
                state.timers.arm(kind, reset, || self.on_fire(owner, kind));
            }
            self.evaluate(&mut state, no_trigger)
        };
        self.invoke(invocations).await;
        Ok(())
    }

    /// Count the constraints of an automation and apply the resulting edge.
    /// With `suppress` a passing count does not produce a true edge; a
    /// failing count always produces a false one.
    pub async fn check_triggered(&self, id: AutomationId, suppress: bool) {
        let invocations = {
            let Some(slot) = self.inner.store.slot(id) else {
                return;
            };
            let mut state = slot.state.write();
            if state.removed {
                return;
            }
            self.evaluate(&mut state, suppress)
        };
        self.invoke(invocations).await;
    }

    /// Apply a true or false edge to an automation directly.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::NotFound`] if the automation does not exist.
    pub async fn set_triggered(&self, id: AutomationId, triggered: bool) -> Result<(), CommanderError> {
        let invocations = {
            let slot = self
                .inner
                .store
                .slot(id)
                .ok_or_else(|| automation_not_found(id))?;
            let mut state = slot.state.write();
            if state.removed {
                return Err(automation_not_found(id));
            }
            self.apply(&mut state, triggered)
        };
        self.invoke(invocations).await;
        Ok(())
    }

    /// Mark every initialized action with a handler as triggered and invoke
    /// the handlers concurrently. Handler errors are recorded on their rule.
    pub async fn run_actions(&self, id: AutomationId) {
        let invocations = {
            let Some(slot) = self.inner.store.slot(id) else {
                return;
            };
            let mut state = slot.state.write();
            if state.removed {
                return;
            }
            self.prepare(&mut state, Edge::Rising)
        };
        self.invoke(invocations).await;
    }

    /// Mark every action of an automation as stopped. No handler is invoked.
    pub fn stop_actions(&self, id: AutomationId) {
        if let Some(slot) = self.inner.store.slot(id) {
            stop_actions(&mut slot.state.write());
        }
    }

    /// Arm the timers of every automation not deployed yet and apply the
    /// initial trigger where requested. Returns how many were deployed.
    #[tracing::instrument(skip(self))]
    pub async fn deploy(&self) -> usize {
        let mut deployed = 0;
        for slot in self.inner.store.slots() {
            let invocations = {
                let mut state = slot.state.write();
                if state.removed || state.automation.initialized {
                    continue;
                }
                state.automation.initialized = true;
                let id = state.automation.id;
                if !state.automation.delay.is_zero() {
                    state
                        .timers
                        .ensure(TimerKind::Delay, || self.on_fire(id, TimerKind::Delay));
                }
                if !state.automation.reminder.is_zero() {
                    state
                        .timers
                        .ensure(TimerKind::Reminder, || self.on_fire(id, TimerKind::Reminder));
                }
                tracing::debug!(
                    automation_id = %id,
                    name = %state.automation.name,
                    source = %state.automation.source,
                    rules = state.rules.len(),
                    "automation deployed"
                );
                if state.automation.initially_triggered {
                    self.apply(&mut state, true)
                } else {
                    Invocations::new()
                }
            };
            deployed += 1;
            self.invoke(invocations).await;
        }
        deployed
    }

    fn evaluate(&self, state: &mut SlotState, suppress: bool) -> Invocations {
        let (total, triggered) = state.count(RuleTag::is_constraint);
        if !state.automation.mode.combine(total, triggered) {
            self.apply(state, false)
        } else if suppress {
            Invocations::new()
        } else {
            self.apply(state, true)
        }
    }

    fn apply(&self, state: &mut SlotState, triggered: bool) -> Invocations {
        if triggered {
            self.rise(state)
        } else {
            self.fall(state)
        }
    }

    fn rise(&self, state: &mut SlotState) -> Invocations {
        let id = state.automation.id;
        let was_triggered = state.automation.triggered;
        if was_triggered {
            if !state.automation.retrigger {
                return Invocations::new();
            }
            state.automation.retrigger_active = true;
        }

        let now = Instant::now();
        if state
            .last_edge
            .is_some_and(|last| now.duration_since(last) < state.automation.pause)
        {
            tracing::trace!(automation_id = %id, "true edge inside pause window");
            return Invocations::new();
        }
        state.last_edge = Some(now);
        state.automation.triggered_time = Some(commander_domain::time::now());

        let delay = state.automation.delay;
        let run = if delay.is_zero() {
            true
        } else {
            state
                .timers
                .arm(TimerKind::Delay, delay, || self.on_fire(id, TimerKind::Delay));
            state.automation.delay_active = true;
            false
        };
        let reminder = state.automation.reminder;
        if !reminder.is_zero() {
            state.timers.arm(TimerKind::Reminder, reminder, || {
                self.on_fire(id, TimerKind::Reminder)
            });
            state.automation.reminder_active = true;
        }

        state.automation.triggered = true;
        if !was_triggered {
            log_transition(state);
        }
        stop_rtt(state);
        if run {
            self.prepare(state, Edge::Rising)
        } else {
            Invocations::new()
        }
    }

    fn fall(&self, state: &mut SlotState) -> Invocations {
        let was_triggered = state.automation.triggered;
        state.automation.retrigger_active = false;
        state.timers.stop(TimerKind::Delay);
        state.automation.delay_active = false;
        state.timers.stop(TimerKind::Reminder);
        state.automation.reminder_active = false;
        stop_actions(state);
        state.automation.triggered = false;
        if was_triggered {
            log_transition(state);
            self.prepare(state, Edge::Falling)
        } else {
            Invocations::new()
        }
    }

    /// Snapshot the handlers to invoke for `edge`. A rising edge marks every
    /// eligible action triggered, reverse ones included.
    fn prepare(&self, state: &mut SlotState, edge: Edge) -> Invocations {
        let now = commander_domain::time::now();
        let automation = state.automation.clone();
        let mut invocations = Vec::new();
        for rule in state
            .rules
            .iter_mut()
            .filter(|rule| rule.tag.is_action() && rule.initialized)
        {
            let Some(handler) = self.inner.store.handler(rule.id) else {
                continue;
            };
            if edge == Edge::Rising {
                rule.triggered = true;
                rule.triggered_time = Some(now);
            }
            let reverse = rule.module.as_ref().is_some_and(RuleModule::reverse);
            if reverse == (edge == Edge::Falling) {
                invocations.push((
                    handler,
                    ActionInvocation {
                        automation: automation.clone(),
                        rule: rule.clone(),
                        edge,
                    },
                ));
            }
        }
        invocations
    }

    async fn invoke(&self, invocations: Invocations) {
        if invocations.is_empty() {
            return;
        }
        if self.inner.muted {
            tracing::debug!(count = invocations.len(), "muted, action handlers skipped");
            return;
        }
        let results = join_all(
            invocations
                .iter()
                .map(|(handler, invocation)| handler.trigger(invocation)),
        )
        .await;
        for ((_, invocation), result) in invocations.iter().zip(results) {
            let message = result.err().map(|err| describe(&err)).unwrap_or_default();
            // the rule may have been removed while its handler ran
            let _ = self.rules().set_error(invocation.rule.id, message);
        }
    }

    async fn fire(&self, id: AutomationId, kind: TimerKind, epoch: u64) -> Fire {
        let invocations = {
            let Some(slot) = self.inner.store.slot(id) else {
                return Fire::Terminate;
            };
            let mut state = slot.state.write();
            if state.removed {
                return Fire::Terminate;
            }
            if !state.timers.is_current(kind, epoch) {
                return Fire::Continue;
            }
            match kind {
                TimerKind::Delay => {
                    if !state.automation.delay_active {
                        return Fire::Continue;
                    }
                    state.automation.delay_active = false;
                    self.prepare(&mut state, Edge::Rising)
                }
                TimerKind::Reminder => {
                    if !state.automation.reminder_active {
                        return Fire::Continue;
                    }
                    self.prepare(&mut state, Edge::Rising)
                }
                TimerKind::Reset(rule_id) | TimerKind::Timeout(rule_id) => {
                    let Some(rule) = state.rule_mut(rule_id) else {
                        return Fire::Terminate;
                    };
                    let no_trigger = rule.module.as_ref().is_some_and(RuleModule::no_trigger);
                    write_trigger(rule, matches!(kind, TimerKind::Timeout(_)));
                    self.evaluate(&mut state, no_trigger)
                }
            }
        };
        tracing::trace!(automation_id = %id, ?kind, "timer fired");
        self.invoke(invocations).await;
        Fire::Continue
    }

    fn on_fire(&self, id: AutomationId, kind: TimerKind) -> OnFire {
        let engine: Weak<Inner> = Arc::downgrade(&self.inner);
        Arc::new(move |epoch| -> BoxFuture<'static, Fire> {
            let engine = engine.clone();
            Box::pin(async move {
                match engine.upgrade() {
                    Some(inner) => Engine { inner }.fire(id, kind, epoch).await,
                    None => Fire::Terminate,
                }
            })
        })
    }
}

fn stop_actions(state: &mut SlotState) {
    for rule in state.rules.iter_mut().filter(|rule| rule.tag.is_action()) {
        rule.triggered = false;
    }
}

fn log_transition(state: &SlotState) {
    let automation = &state.automation;
    tracing::debug!(
        automation_id = %automation.id,
        name = %automation.name,
        source = %automation.source,
        value = ?automation.value,
        triggered = automation.triggered,
        "automation changed"
    );
}
