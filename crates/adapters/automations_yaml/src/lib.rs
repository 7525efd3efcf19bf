//! # commander-adapter-automations-yaml
//!
//! Automation source adapter — YAML files on disk.
//!
//! ## Responsibilities
//! - Walk the automations directory for `.yml`/`.yaml` files
//! - Fingerprint every file by content (SHA-256) so the reload coordinator can
//!   tell new, changed and removed units apart
//! - Deserialize a file into its list of automation definitions
//!
//! ## Dependency rule
//! Same as other adapters: depends on `commander-app` and `commander-domain`.

pub mod error;
pub mod source;

pub use error::SourceError;
pub use source::YamlSource;
