//! Bus actions: publish a value, optionally wrapped in a JSON object.

use commander_app::ports::{ActionHandler, ActionInvocation};
use commander_domain::automation::Automation;
use commander_domain::error::CommanderError;
use commander_domain::rule::{MqttAction, RuleModule};
use commander_domain::value::Value;

use crate::broker::Broker;
use crate::error::MqttError;
use crate::template;

/// Publishes the payload of an MQTT action rule.
pub struct MqttActionHandler<B> {
    broker: B,
}

impl<B: Broker> MqttActionHandler<B> {
    pub fn new(broker: B) -> Self {
        Self { broker }
    }
}

/// Build the payload an action publishes for an automation.
///
/// Text values are rendered as templates first; the rendered text is typed
/// again, so `{{ value }}` of a numeric observation publishes a number.
///
/// # Errors
///
/// Returns [`MqttError::Template`] if the value template fails to render.
pub fn payload(action: &MqttAction, automation: &Automation) -> Result<String, MqttError> {
    let value = match &action.value {
        Value::Text(source) => Value::infer(&template::render(source, automation)?),
        other => other.clone(),
    };
    let Some(path) = &action.object else {
        return Ok(value.to_string());
    };
    let document = path
        .rsplit('.')
        .fold(value.to_json(), |inner, key| {
            let mut map = serde_json::Map::new();
            map.insert(key.to_string(), inner);
            serde_json::Value::Object(map)
        });
    Ok(document.to_string())
}

#[async_trait::async_trait]
impl<B: Broker> ActionHandler for MqttActionHandler<B> {
    async fn trigger(&self, invocation: &ActionInvocation) -> Result<(), CommanderError> {
        let Some(RuleModule::MqttAction(action)) = &invocation.rule.module else {
            return Err(MqttError::NotAnAction(invocation.rule.id).into());
        };
        let payload = payload(action, &invocation.automation)?;
        tracing::debug!(
            rule_id = %invocation.rule.id,
            topic = %action.topic,
            %payload,
            edge = ?invocation.edge,
            "publishing action"
        );
        self.broker
            .publish(&action.topic, payload, action.retained)
            .await?;
        Ok(())
    }
}
