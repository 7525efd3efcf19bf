//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the API routes under `/api` and includes a [`TraceLayer`] that logs
/// each HTTP request/response at the `DEBUG` level.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use commander_app::engine::Engine;
    use commander_domain::automation::{ActionSpec, AutomationDefinition, ConstraintSpec};

    use super::*;

    fn engine() -> Engine {
        let engine = Engine::with_muted(true);
        let visible = AutomationDefinition::builder()
            .name("Hall light")
            .constraint(ConstraintSpec::mqtt("hall/motion == true"))
            .action(ActionSpec::http("http://hub/on"))
            .build()
            .unwrap();
        let mut hidden = visible.clone();
        hidden.name = "Internal".to_string();
        hidden.hidden = true;
        engine.add(&visible, "hall.yml").unwrap();
        engine.add(&hidden, "hall.yml").unwrap();
        engine
    }

    async fn call(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = build(AppState::new("home", engine()))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let (status, _) = call("/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn should_report_status() {
        let (status, json) = call("/api/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "home");
        assert_eq!(json["muted"], true);
        assert_eq!(json["automations"], 2);
        assert_eq!(json["triggered"], 0);
    }

    #[tokio::test]
    async fn should_list_visible_automations() {
        let (status, json) = call("/api/automations").await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Hall light"]);
    }

    #[tokio::test]
    async fn should_list_hidden_automations_on_request() {
        let (_, json) = call("/api/automations?hidden=true").await;
        assert_eq!(json.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn should_return_automation_with_rules() {
        let (status, json) = call("/api/automations/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "Hall light");
        assert_eq!(json["mode"], "AND");
        let rules = json["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0]["text"], "hall/motion == true");
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_automation() {
        let (status, json) = call("/api/automations/99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Automation 99 not found");
    }

    #[tokio::test]
    async fn should_reject_invalid_id() {
        let (status, _) = call("/api/automations/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
