//! # commander-adapter-http
//!
//! HTTP action adapter — fire-and-forget GET requests.
//!
//! ## Responsibilities
//! - Parse HTTP actions (`<url template> (Reverse true)`)
//! - Render the URL with `minijinja` against the automation snapshot and send
//!   it with `reqwest`; transport failures and non-success statuses are
//!   reported back to the engine, which records them on the rule
//!
//! ## Dependency rule
//! Same as other adapters: depends on `commander-app` and `commander-domain`.

pub mod action;
pub mod config;
pub mod deployer;
pub mod error;
pub mod parse;
mod template;

pub use action::HttpActionHandler;
pub use config::HttpConfig;
pub use deployer::HttpDeployer;
pub use error::HttpActionError;
