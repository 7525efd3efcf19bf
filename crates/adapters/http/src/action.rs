//! HTTP actions: render the URL and send it as a GET request.

use commander_app::ports::{ActionHandler, ActionInvocation};
use commander_domain::error::CommanderError;
use commander_domain::rule::RuleModule;

use crate::config::HttpConfig;
use crate::error::HttpActionError;
use crate::template;

/// Sends the request of an HTTP action rule.
#[derive(Clone)]
pub struct HttpActionHandler {
    client: reqwest::Client,
}

impl HttpActionHandler {
    /// # Errors
    ///
    /// Returns [`HttpActionError::Client`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: &HttpConfig) -> Result<Self, HttpActionError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(HttpActionError::Client)?;
        Ok(Self { client })
    }

    async fn send(&self, url: String) -> Result<(), HttpActionError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|source| HttpActionError::Request {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpActionError::Status { url, status });
        }
        tracing::debug!(%url, %status, "request sent");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ActionHandler for HttpActionHandler {
    async fn trigger(&self, invocation: &ActionInvocation) -> Result<(), CommanderError> {
        let Some(RuleModule::HttpAction(action)) = &invocation.rule.module else {
            return Err(HttpActionError::NotAnAction(invocation.rule.id).into());
        };
        let url = template::render(&action.url, &invocation.automation)
            .map_err(HttpActionError::from)?;
        self.send(url).await?;
        Ok(())
    }
}
