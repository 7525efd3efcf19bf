//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the engine and the outside world. They are
//! defined here (in `app`) so that both the engine and the adapter layer can
//! depend on them without creating circular dependencies.

pub mod action;
pub mod deployer;
pub mod source;

pub use action::{ActionHandler, ActionInvocation, Edge};
pub use deployer::RuleDeployer;
pub use source::{AutomationSource, Fingerprints};
