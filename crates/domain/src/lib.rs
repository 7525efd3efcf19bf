//! # commander-domain
//!
//! Pure domain model for the commander automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Automations** (named units combining constraints with actions
//!   and timing policy) and their config-level definitions
//! - Define **Rules** (the generic storage unit behind constraints and actions)
//!   together with the protocol payloads collaborators attach to them
//! - Define observed **Values** and the textual option helpers shared by every
//!   rule DSL
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod automation;
pub mod dsl;
pub mod rule;
pub mod value;
