//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use commander_domain::error::{CommanderError, describe};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps request and engine failures to an HTTP response.
pub enum ApiError {
    /// A path parameter is not a valid identifier.
    InvalidId(String),
    Engine(CommanderError),
}

impl From<CommanderError> for ApiError {
    fn from(err: CommanderError) -> Self {
        Self::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidId(raw) => (StatusCode::BAD_REQUEST, format!("invalid id {raw:?}")),
            Self::Engine(err) => match &err {
                CommanderError::Validation(_) | CommanderError::Dsl(_) => {
                    (StatusCode::BAD_REQUEST, describe(&err))
                }
                CommanderError::NotFound(inner) => (StatusCode::NOT_FOUND, inner.to_string()),
                CommanderError::External(_) => {
                    tracing::error!(error = %describe(&err), "collaborator error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_string(),
                    )
                }
            },
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
