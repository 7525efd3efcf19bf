//! Instance summary.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Status {
    pub name: String,
    pub muted: bool,
    pub automations: usize,
    pub triggered: usize,
    /// Rules whose last operation failed.
    pub failing_rules: usize,
}

/// `GET /api/status`: instance name and engine counters.
pub async fn get(State(state): State<AppState>) -> Json<Status> {
    let automations = state.engine.automations().all();
    let failing_rules = automations
        .iter()
        .flat_map(|automation| state.engine.rules().by_automation(automation.id))
        .filter(|rule| !rule.error.is_empty())
        .count();
    Json(Status {
        name: state.name.clone(),
        muted: state.engine.is_muted(),
        automations: automations.len(),
        triggered: automations.iter().filter(|a| a.triggered).count(),
        failing_rules,
    })
}
