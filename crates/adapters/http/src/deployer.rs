//! Deploys HTTP actions.

use std::sync::Arc;

use commander_app::engine::Engine;
use commander_app::ports::{ActionHandler, RuleDeployer};
use commander_domain::error::describe;
use commander_domain::rule::{RuleModule, RuleTag};

use crate::action::HttpActionHandler;
use crate::parse;

/// Owns the `HttpAction` rule tag.
pub struct HttpDeployer {
    handler: Arc<dyn ActionHandler>,
}

impl HttpDeployer {
    #[must_use]
    pub fn new(handler: HttpActionHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }
}

#[async_trait::async_trait]
impl RuleDeployer for HttpDeployer {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn deploy(&self, engine: &Engine) -> usize {
        let mut installed = 0;
        for rule in engine.rules().all_by_tag(RuleTag::HttpAction) {
            if rule.initialized || !rule.error.is_empty() {
                continue;
            }
            let module = match parse::action(&rule.text) {
                Ok(module) => module,
                Err(err) => {
                    let _ = engine.rules().set_error(rule.id, describe(&err));
                    continue;
                }
            };
            let result = engine
                .install(rule.id, RuleModule::HttpAction(module))
                .and_then(|()| {
                    engine
                        .rules()
                        .set_trigger_handler(rule.id, Arc::clone(&self.handler))
                });
            if result.is_ok() {
                installed += 1;
            }
        }
        installed
    }
}
