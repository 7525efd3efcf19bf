//! HTTP adapter error types.

use commander_domain::error::CommanderError;
use commander_domain::id::RuleId;

#[derive(Debug, thiserror::Error)]
pub enum HttpActionError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// The URL template failed to render.
    #[error("failed to render url template")]
    Template(#[from] minijinja::Error),

    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("request to {url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("rule {0} is not an HTTP action")]
    NotAnAction(RuleId),
}

impl From<HttpActionError> for CommanderError {
    fn from(err: HttpActionError) -> Self {
        CommanderError::External(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_status_error() {
        let err = HttpActionError::Status {
            url: "http://lights/on".to_string(),
            status: reqwest::StatusCode::NOT_FOUND,
        };
        assert_eq!(err.to_string(), "request to http://lights/on answered 404 Not Found");
    }

    #[test]
    fn should_convert_into_external_error() {
        let err: CommanderError = HttpActionError::NotAnAction(RuleId::from_raw(4)).into();
        assert!(matches!(err, CommanderError::External(_)));
    }
}
