//! Deploys bus constraints (subscriptions) and bus actions (publish handlers).

use std::sync::Arc;

use commander_app::engine::Engine;
use commander_app::ports::{ActionHandler, RuleDeployer};
use commander_domain::error::describe;
use commander_domain::rule::{Rule, RuleModule, RuleTag};

use crate::action::MqttActionHandler;
use crate::broker::Broker;
use crate::parse;

/// Owns the `MqttConstraint` and `MqttAction` rule tags.
pub struct MqttDeployer<B> {
    broker: B,
    handler: Arc<dyn ActionHandler>,
}

impl<B: Broker> MqttDeployer<B> {
    pub fn new(broker: B) -> Self {
        let handler = Arc::new(MqttActionHandler::new(broker.clone()));
        Self { broker, handler }
    }

    async fn deploy_constraint(&self, engine: &Engine, rule: &Rule) -> bool {
        let module = match parse::constraint(&rule.text) {
            Ok(module) => module,
            Err(err) => {
                let _ = engine.rules().set_error(rule.id, describe(&err));
                return false;
            }
        };
        let topic = module.topic.clone();
        if engine
            .install(rule.id, RuleModule::MqttConstraint(module))
            .is_err()
        {
            return false;
        }
        let outcome = self.broker.subscribe(&topic).await;
        let message = outcome.err().map(|err| describe(&err)).unwrap_or_default();
        let _ = engine.rules().set_error(rule.id, message);
        tracing::debug!(rule_id = %rule.id, %topic, "constraint subscribed");
        true
    }

    fn deploy_action(&self, engine: &Engine, rule: &Rule) -> bool {
        let module = match parse::action(&rule.text) {
            Ok(module) => module,
            Err(err) => {
                let _ = engine.rules().set_error(rule.id, describe(&err));
                return false;
            }
        };
        engine
            .install(rule.id, RuleModule::MqttAction(module))
            .and_then(|()| {
                engine
                    .rules()
                    .set_trigger_handler(rule.id, Arc::clone(&self.handler))
            })
            .is_ok()
    }
}

/// Rules not deployed yet. Rules carrying an error failed to parse on an
/// earlier pass and stay as they are until their source changes.
fn pending(engine: &Engine, tag: RuleTag) -> Vec<Rule> {
    engine
        .rules()
        .all_by_tag(tag)
        .into_iter()
        .filter(|rule| !rule.initialized && rule.error.is_empty())
        .collect()
}

#[async_trait::async_trait]
impl<B: Broker> RuleDeployer for MqttDeployer<B> {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    async fn deploy(&self, engine: &Engine) -> usize {
        let mut installed = 0;
        for rule in pending(engine, RuleTag::MqttConstraint) {
            if self.deploy_constraint(engine, &rule).await {
                installed += 1;
            }
        }
        for rule in pending(engine, RuleTag::MqttAction) {
            if self.deploy_action(engine, &rule) {
                installed += 1;
            }
        }
        installed
    }
}
