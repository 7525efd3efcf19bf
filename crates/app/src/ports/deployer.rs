//! Deployer port — protocol adapters bringing their rules to life.

use crate::engine::Engine;

/// A protocol collaborator owning one or more rule tags.
///
/// The reload coordinator calls [`deploy`](Self::deploy) before the engine
/// arms the timers of new automations, so action handlers are in place when
/// an initial trigger runs. Implementations walk every rule of
/// their tags that is not initialized yet, parse its text, record parse
/// errors on the rule, install the parsed payload and set up whatever the
/// protocol needs (subscriptions, schedule tasks, action handlers).
#[async_trait::async_trait]
pub trait RuleDeployer: Send + Sync {
    /// Short name used in logs (e.g. `"mqtt"`).
    fn name(&self) -> &'static str;

    /// Deploy every uninitialized rule this collaborator owns and return how
    /// many were installed.
    async fn deploy(&self, engine: &Engine) -> usize;
}
