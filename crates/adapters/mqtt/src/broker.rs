//! Broker connection: the rumqttc client and its event loop.

use std::future::Future;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Packet, QoS};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use commander_app::engine::Engine;
use commander_domain::rule::{RuleModule, RuleTag};

use crate::config::MqttConfig;
use crate::error::MqttError;
use crate::message;

const REQUEST_CAPACITY: usize = 64;
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// The operations the deployer and the action handler need from a broker.
pub trait Broker: Clone + Send + Sync + 'static {
    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<(), MqttError>> + Send;

    fn publish(
        &self,
        topic: &str,
        payload: String,
        retained: bool,
    ) -> impl Future<Output = Result<(), MqttError>> + Send;
}

/// A rumqttc client. Cloning shares the same connection.
#[derive(Clone)]
pub struct MqttBroker {
    client: AsyncClient,
    qos: QoS,
}

impl MqttBroker {
    /// Create the client and spawn its event loop. Inbound publications are
    /// dispatched to `engine`; every (re)connection re-subscribes the topics
    /// of the initialized bus constraints.
    ///
    /// # Errors
    ///
    /// Returns an [`MqttError`] if the configuration is invalid.
    pub fn connect(config: &MqttConfig, engine: Engine) -> Result<(Self, JoinHandle<()>), MqttError> {
        let options = config.options()?;
        let qos = config.qos()?;
        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let broker = Self { client, qos };
        tracing::info!(client_id = %config.client_id, "connecting to MQTT broker");
        let handle = tokio::spawn(run(eventloop, broker.clone(), engine));
        Ok((broker, handle))
    }

    /// # Errors
    ///
    /// Returns [`MqttError::Client`] if the request queue is closed.
    pub async fn disconnect(&self) -> Result<(), MqttError> {
        self.client.disconnect().await?;
        Ok(())
    }
}

impl Broker for MqttBroker {
    async fn subscribe(&self, topic: &str) -> Result<(), MqttError> {
        self.client.subscribe(topic, self.qos).await?;
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: String, retained: bool) -> Result<(), MqttError> {
        self.client
            .publish(topic, self.qos, retained, payload.into_bytes())
            .await?;
        Ok(())
    }
}

async fn run(mut eventloop: EventLoop, broker: MqttBroker, engine: Engine) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("connected to MQTT broker");
                tokio::spawn(subscribe_all(broker.clone(), engine.clone()));
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let received = Instant::now();
                let engine = engine.clone();
                tokio::spawn(async move {
                    let topic = String::from_utf8_lossy(publish.topic.as_ref());
                    message::dispatch(
                        &engine,
                        &topic,
                        &publish.payload,
                        publish.retain,
                        received,
                    )
                    .await;
                });
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker closed the connection");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "MQTT connection error, retrying");
                tokio::time::sleep(RECONNECT_BACKOFF).await;
            }
        }
    }
}

/// Subscribe the topic of every initialized bus constraint. Returns how many
/// subscriptions succeeded.
pub async fn subscribe_all<B: Broker>(broker: B, engine: Engine) -> usize {
    let mut subscribed = 0;
    for rule in engine.rules().all_by_tag(RuleTag::MqttConstraint) {
        let Some(RuleModule::MqttConstraint(module)) = &rule.module else {
            continue;
        };
        match broker.subscribe(&module.topic).await {
            Ok(()) => subscribed += 1,
            Err(err) => {
                tracing::warn!(topic = %module.topic, error = %err, "resubscription failed");
            }
        }
    }
    tracing::debug!(subscribed, "topics subscribed");
    subscribed
}


#[cfg(test)]
mod tests {
    use commander_domain::automation::{AutomationDefinition, ConstraintSpec};

    use super::fake::FakeBroker;
    use super::*;
    use crate::parse;

    #[tokio::test]
    async fn should_resubscribe_initialized_constraints_only() {
        let engine = Engine::new();
        let definition = AutomationDefinition::builder()
            .name("hall")
            .constraint(ConstraintSpec::mqtt("hall/motion == true"))
            .constraint(ConstraintSpec::mqtt("hall/door == open"))
            .build()
            .unwrap();
        let id = engine.add(&definition, "hall.yml").unwrap();
        let first = engine.rules().by_automation(id)[0].clone();
        engine
            .install(
                first.id,
                RuleModule::MqttConstraint(parse::constraint(&first.text).unwrap()),
            )
            .unwrap();

        let broker = FakeBroker::default();
        assert_eq!(subscribe_all(broker.clone(), engine).await, 1);
        assert_eq!(*broker.subscriptions.lock(), vec!["hall/motion".to_string()]);
    }

    #[tokio::test]
    async fn should_build_client_from_config() {
        let (broker, handle) = MqttBroker::connect(&MqttConfig::default(), Engine::new()).unwrap();
        assert_eq!(broker.qos, QoS::ExactlyOnce);
        handle.abort();
    }
}
