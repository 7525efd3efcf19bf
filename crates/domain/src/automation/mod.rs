//! Automation — a named unit combining constraints with actions and timing
//! policy.
//!
//! ## Parts
//! - [`AutomationDefinition`] is the config-level description produced by
//!   automation sources.
//! - [`Automation`] is the live record kept by the engine: the definition's
//!   timing policy plus derived trigger status.
//! - [`Mode`] decides how constraint states combine.

mod definition;
mod mode;

pub use definition::{ActionSpec, AutomationDefinition, ConstraintSpec, DefinitionBuilder};
pub use mode::Mode;

use std::time::Duration;

use serde::Serialize;

use crate::id::AutomationId;
use crate::time::Timestamp;
use crate::value::Value;

/// Live state of a deployed automation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Automation {
    pub id: AutomationId,
    pub name: String,
    pub mode: Mode,
    pub retrigger: bool,
    pub hidden: bool,
    #[serde(with = "humantime_serde")]
    pub pause: Duration,
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    #[serde(with = "humantime_serde")]
    pub reminder: Duration,
    /// Identity of the source unit the automation was loaded from.
    pub source: String,
    pub triggered: bool,
    pub triggered_time: Option<Timestamp>,
    pub retrigger_active: bool,
    pub delay_active: bool,
    pub reminder_active: bool,
    pub value: Option<Value>,
    pub value_time: Option<Timestamp>,
    /// Last measured time between an inbound message and the trigger edge it
    /// caused.
    #[serde(with = "humantime_serde::option")]
    pub rtt: Option<Duration>,
    /// Timers have been armed by the deploy pass.
    pub initialized: bool,
    /// Apply a true edge when first deployed.
    #[serde(skip)]
    pub initially_triggered: bool,
}

impl Automation {
    /// Build the live record for a freshly loaded definition.
    #[must_use]
    pub fn from_definition(
        id: AutomationId,
        definition: &AutomationDefinition,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: definition.name.clone(),
            mode: definition.mode,
            retrigger: definition.retrigger,
            hidden: definition.hidden,
            pause: definition.pause,
            delay: definition.delay,
            reminder: definition.reminder,
            source: source.into(),
            triggered: false,
            triggered_time: None,
            retrigger_active: false,
            delay_active: false,
            reminder_active: false,
            value: None,
            value_time: None,
            rtt: None,
            initialized: false,
            initially_triggered: definition.triggered,
        }
    }
}
