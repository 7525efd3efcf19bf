//! JSON handlers for automations.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use commander_domain::automation::Automation;
use commander_domain::error::{CommanderError, NotFoundError};
use commander_domain::id::AutomationId;
use commander_domain::rule::Rule;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    /// Include automations flagged `Hidden`.
    pub hidden: bool,
}

/// An automation together with its constraints and actions.
#[derive(Debug, Serialize)]
pub struct AutomationDetail {
    #[serde(flatten)]
    pub automation: Automation,
    pub rules: Vec<Rule>,
}

/// `GET /api/automations`: every automation ordered by id, hidden ones only
/// with `?hidden=true`.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Automation>> {
    let automations = state
        .engine
        .automations()
        .all()
        .into_iter()
        .filter(|automation| query.hidden || !automation.hidden)
        .collect();
    Json(automations)
}

/// `GET /api/automations/{id}`: one automation with its rules.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AutomationDetail>, ApiError> {
    let automation_id = AutomationId::from_str(&id).map_err(|_| ApiError::InvalidId(id.clone()))?;
    let (automation, rules) = state
        .engine
        .automations()
        .get_with_rules(automation_id)
        .ok_or_else(|| {
            CommanderError::from(NotFoundError {
                entity: "Automation",
                id: automation_id.to_string(),
            })
        })?;
    Ok(Json(AutomationDetail { automation, rules }))
}
