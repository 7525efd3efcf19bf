//! Shared application state for axum handlers.

use commander_app::engine::Engine;

/// Application state shared across all axum handlers. Cloning is cheap: the
/// engine is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Instance name reported by `/api/status`.
    pub name: String,
    pub engine: Engine,
}

impl AppState {
    pub fn new(name: impl Into<String>, engine: Engine) -> Self {
        Self {
            name: name.into(),
            engine,
        }
    }
}
