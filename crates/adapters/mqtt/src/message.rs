//! Inbound messages matched against bus constraints.

use tokio::time::Instant;

use commander_app::engine::Engine;
use commander_domain::rule::{MqttConstraint, RuleModule, RuleTag};
use commander_domain::value::Value;

/// What a message means for one constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Any message sets the constraint and, without a reset window, clears
    /// it right away.
    Pulse,
    /// A constraint with a timeout is cleared by every message; silence sets it.
    Clear,
    Hold(bool),
    /// The comparison failed; only `!=` holds.
    Failed { holds: bool, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub value: Value,
    pub verdict: Verdict,
}

/// Read a message for a constraint. `None` means the message is ignored:
/// a blocked retained message, or a JSON path the payload does not have.
#[must_use]
pub fn observe(module: &MqttConstraint, payload: &[u8], retained: bool) -> Option<Observation> {
    if module.block_retained && retained {
        return None;
    }
    let value = extract(module.object.as_deref(), payload)?;
    let verdict = match (&module.comparator, &module.value) {
        (Some(comparator), Some(expected)) => match comparator.evaluate(&value, expected) {
            Ok(holds) => Verdict::Hold(holds),
            Err(err) => Verdict::Failed {
                holds: comparator.on_error(),
                error: err.to_string(),
            },
        },
        _ if module.timeout.is_zero() => Verdict::Pulse,
        _ => Verdict::Clear,
    };
    Some(Observation { value, verdict })
}

fn extract(object: Option<&str>, payload: &[u8]) -> Option<Value> {
    let text = String::from_utf8_lossy(payload);
    let Some(path) = object else {
        return Some(Value::infer(&text));
    };
    let document: serde_json::Value = serde_json::from_str(&text).ok()?;
    let leaf = path.split('.').try_fold(&document, |node, key| match node {
        serde_json::Value::Object(map) => map.get(key),
        serde_json::Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })?;
    Some(Value::from_json(leaf))
}

/// Whether `topic` matches the subscription `filter`, honoring the `+` and
/// `#` wildcards.
#[must_use]
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter = filter.split('/');
    let mut topic = topic.split('/');
    loop {
        match (filter.next(), topic.next()) {
            (Some("#"), _) | (None, None) => return true,
            (Some("+"), Some(_)) => {}
            (Some(expected), Some(level)) if expected == level => {}
            _ => return false,
        }
    }
}

/// Apply one inbound message to every bus constraint subscribed to its
/// topic. Returns how many constraints it was matched against.
pub async fn dispatch(
    engine: &Engine,
    topic: &str,
    payload: &[u8],
    retained: bool,
    received: Instant,
) -> usize {
    let mut matched = 0;
    for rule in engine.rules().all_by_tag(RuleTag::MqttConstraint) {
        let Some(RuleModule::MqttConstraint(module)) = &rule.module else {
            continue;
        };
        if !rule.initialized || !topic_matches(&module.topic, topic) {
            continue;
        }
        matched += 1;
        // results are dropped: the rule may be removed by a reload meanwhile
        let _ = engine.automations().rtt_start(rule.automation_id, received);
        let Some(observation) = observe(module, payload, retained) else {
            continue;
        };

        let _ = engine.rules().set_value(rule.id, observation.value.clone());
        if !module.no_value {
            let _ = engine
                .automations()
                .set_value(rule.automation_id, observation.value);
        }
        if !module.timeout.is_zero() {
            let _ = engine.rearm_timeout(rule.id);
        }

        let error = match observation.verdict {
            Verdict::Pulse => {
                let _ = engine.set_constraint(rule.id, true).await;
                if module.reset.is_zero() {
                    let _ = engine.set_constraint(rule.id, false).await;
                }
                String::new()
            }
            Verdict::Clear => {
                let _ = engine.set_constraint(rule.id, false).await;
                String::new()
            }
            Verdict::Hold(holds) => {
                let _ = engine.set_constraint(rule.id, holds).await;
                String::new()
            }
            Verdict::Failed { holds, error } => {
                let _ = engine.set_constraint(rule.id, holds).await;
                error
            }
        };
        let _ = engine.rules().set_error(rule.id, error);
    }
    tracing::trace!(topic, matched, "message dispatched");
    matched
}
