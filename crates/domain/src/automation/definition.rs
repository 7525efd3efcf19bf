//! Definition — the config-level description of an automation.
//!
//! Definitions are what automation sources produce. They carry the raw rule
//! texts only; parsing those texts is the job of the protocol adapters once
//! the definition has been added to the stores.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Mode;
use crate::error::{CommanderError, ValidationError};
use crate::rule::RuleTag;

/// One entry of the `Constraints` list. Every protocol key present on the
/// entry becomes its own rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConstraintSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
}

impl ConstraintSpec {
    #[must_use]
    pub fn mqtt(text: impl Into<String>) -> Self {
        Self {
            mqtt: Some(text.into()),
            cron: None,
        }
    }

    #[must_use]
    pub fn cron(text: impl Into<String>) -> Self {
        Self {
            mqtt: None,
            cron: Some(text.into()),
        }
    }

    fn rules(&self) -> impl Iterator<Item = (RuleTag, &str)> {
        let cron = self
            .cron
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| (RuleTag::CronConstraint, t));
        let mqtt = self
            .mqtt
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| (RuleTag::MqttConstraint, t));
        cron.into_iter().chain(mqtt)
    }
}

/// One entry of the `Actions` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<String>,
}

impl ActionSpec {
    #[must_use]
    pub fn mqtt(text: impl Into<String>) -> Self {
        Self {
            mqtt: Some(text.into()),
            http: None,
        }
    }

    #[must_use]
    pub fn http(text: impl Into<String>) -> Self {
        Self {
            mqtt: None,
            http: Some(text.into()),
        }
    }

    fn rules(&self) -> impl Iterator<Item = (RuleTag, &str)> {
        let http = self
            .http
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| (RuleTag::HttpAction, t));
        let mqtt = self
            .mqtt
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| (RuleTag::MqttAction, t));
        http.into_iter().chain(mqtt)
    }
}

/// A named automation as written in a source unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutomationDefinition {
    pub name: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub retrigger: bool,
    /// Display hint for status surfaces only.
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, with = "humantime_serde")]
    pub pause: Duration,
    #[serde(default, with = "humantime_serde")]
    pub delay: Duration,
    #[serde(default, with = "humantime_serde")]
    pub reminder: Duration,
    /// Apply a true edge as soon as the automation is deployed.
    #[serde(default)]
    pub triggered: bool,
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

impl AutomationDefinition {
    /// Create a builder for constructing an [`AutomationDefinition`].
    #[must_use]
    pub fn builder() -> DefinitionBuilder {
        DefinitionBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - a constraint or action entry carries no text
    ///   ([`ValidationError::EmptyRule`])
    pub fn validate(&self) -> Result<(), CommanderError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.constraints.iter().any(|c| c.rules().next().is_none()) {
            return Err(ValidationError::EmptyRule("constraint").into());
        }
        if self.actions.iter().any(|a| a.rules().next().is_none()) {
            return Err(ValidationError::EmptyRule("action").into());
        }
        Ok(())
    }

    /// Every rule this definition declares, constraints first, in file order.
    #[must_use]
    pub fn rules(&self) -> Vec<(RuleTag, String)> {
        let constraints = self.constraints.iter().flat_map(ConstraintSpec::rules);
        let actions = self.actions.iter().flat_map(ActionSpec::rules);
        constraints
            .chain(actions)
            .map(|(tag, text)| (tag, text.to_string()))
            .collect()
    }
}

/// Step-by-step builder for [`AutomationDefinition`].
#[derive(Debug, Default)]
pub struct DefinitionBuilder {
    inner: AutomationDefinition,
}

impl DefinitionBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = name.into();
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: Mode) -> Self {
        self.inner.mode = mode;
        self
    }

    #[must_use]
    pub fn retrigger(mut self, retrigger: bool) -> Self {
        self.inner.retrigger = retrigger;
        self
    }

    #[must_use]
    pub fn pause(mut self, pause: Duration) -> Self {
        self.inner.pause = pause;
        self
    }

    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.inner.delay = delay;
        self
    }

    #[must_use]
    pub fn reminder(mut self, reminder: Duration) -> Self {
        self.inner.reminder = reminder;
        self
    }

    #[must_use]
    pub fn triggered(mut self, triggered: bool) -> Self {
        self.inner.triggered = triggered;
        self
    }

    #[must_use]
    pub fn constraint(mut self, constraint: ConstraintSpec) -> Self {
        self.inner.constraints.push(constraint);
        self
    }

    #[must_use]
    pub fn action(mut self, action: ActionSpec) -> Self {
        self.inner.actions.push(action);
        self
    }

    /// Consume the builder, validate, and return the definition.
    ///
    /// # Errors
    ///
    /// Returns [`CommanderError::Validation`] if invariants fail.
    pub fn build(self) -> Result<AutomationDefinition, CommanderError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
