//! # commander-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a read-only **JSON status API** over the live engine
//!   (`/health`, `/api/status`, `/api/automations`, `/api/automations/{id}`)
//! - Map engine errors into HTTP status codes
//!
//! ## Dependency rule
//! Depends on `commander-app` (for the engine) and `commander-domain` (for the
//! types serialized in responses). Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
