//! MQTT adapter error types.

use commander_domain::error::CommanderError;
use commander_domain::id::RuleId;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The configured broker address cannot be used.
    #[error("invalid broker uri {0:?}")]
    InvalidUri(String),

    #[error("invalid QoS level {0}, expected 0, 1 or 2")]
    InvalidQos(u8),

    /// The rumqttc client refused a request.
    #[error("MQTT client error")]
    Client(#[from] rumqttc::ClientError),

    /// An action value template failed to render.
    #[error("failed to render payload template")]
    Template(#[from] minijinja::Error),

    /// The rule handed to the action handler carries no MQTT action payload.
    #[error("rule {0} is not an MQTT action")]
    NotAnAction(RuleId),
}

impl From<MqttError> for CommanderError {
    fn from(err: MqttError) -> Self {
        CommanderError::External(Box::new(err))
    }
}
