//! Action port — the side effect behind an action rule.

use commander_domain::automation::Automation;
use commander_domain::error::CommanderError;
use commander_domain::rule::Rule;

/// Which automation edge caused an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// The automation became (or stayed, with retrigger) triggered.
    Rising,
    /// The automation was cleared. Only actions asking for the reverse edge
    /// are invoked on it.
    Falling,
}

/// Everything a handler needs to perform an action, captured under the
/// automation lock and handed over once the lock is released.
#[derive(Debug, Clone)]
pub struct ActionInvocation {
    pub automation: Automation,
    pub rule: Rule,
    pub edge: Edge,
}

/// Performs the I/O of one kind of action rule.
///
/// Handlers are registered per rule in a side table by the deployer owning
/// the rule's tag. The returned error is recorded on the rule.
#[async_trait::async_trait]
pub trait ActionHandler: Send + Sync {
    async fn trigger(&self, invocation: &ActionInvocation) -> Result<(), CommanderError>;
}
