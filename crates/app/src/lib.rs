//! # commander-app
//!
//! Application layer — the automation trigger engine and its **port
//! definitions** (traits).
//!
//! ## Responsibilities
//! - Keep the live automations and their rules in per-automation slots, each
//!   guarded by one lock ([`store`])
//! - Combine constraint states with AND/OR and drive the pause, delay,
//!   reminder and retrigger state machine ([`engine`])
//! - Own the delay, reminder, reset and timeout timers together with any
//!   collaborator task attached to a rule ([`timer`])
//! - Diff automation sources by fingerprint and apply them removal first
//!   ([`reload`])
//! - Define the ports protocol adapters implement ([`ports`]):
//!   - `ActionHandler` — perform an action's side effect
//!   - `RuleDeployer` — parse and arm the rules a protocol owns
//!   - `AutomationSource` — list and load automation definitions
//!
//! ## Dependency rule
//! Depends on `commander-domain` only (plus `tokio` for tasks and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod engine;
pub mod ports;
pub mod reload;
pub mod store;
pub mod timer;
