//! Hot reload — keeps the engine in sync with an automation source.
//!
//! Every pass scans the source, compares the fingerprints against the ones
//! applied last time and then:
//! 1. removes the automations of every unit that disappeared,
//! 2. for every new or changed unit, removes its old automations and loads
//!    the new definitions,
//! 3. runs the rule deployers and the engine deploy pass.
//!
//! A unit that fails to load keeps its new fingerprint, so it is retried
//! only once its content changes again.

use std::sync::Arc;

use commander_domain::error::{CommanderError, describe};

use crate::engine::Engine;
use crate::ports::{AutomationSource, Fingerprints, RuleDeployer};

/// Applies an [`AutomationSource`] to an [`Engine`].
pub struct Reloader<S> {
    source: S,
    engine: Engine,
    deployers: Vec<Arc<dyn RuleDeployer>>,
    applied: Fingerprints,
}

impl<S: AutomationSource> Reloader<S> {
    pub fn new(source: S, engine: Engine) -> Self {
        Self {
            source,
            engine,
            deployers: Vec::new(),
            applied: Fingerprints::new(),
        }
    }

    /// Register a protocol collaborator run on every deploy pass.
    #[must_use]
    pub fn with_deployer(mut self, deployer: Arc<dyn RuleDeployer>) -> Self {
        self.deployers.push(deployer);
        self
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Fingerprints of the units applied so far.
    #[must_use]
    pub fn applied(&self) -> &Fingerprints {
        &self.applied
    }

    /// Run one reload pass and return how many units were affected.
    ///
    /// # Errors
    ///
    /// Returns the source error if scanning fails; nothing is applied then.
    #[tracing::instrument(skip(self))]
    pub async fn reload(&mut self) -> Result<usize, CommanderError> {
        let current = self.source.scan().await?;

        let removed: Vec<String> = self
            .applied
            .keys()
            .filter(|unit| !current.contains_key(*unit))
            .cloned()
            .collect();
        let changed: Vec<(String, String)> = current
            .into_iter()
            .filter(|(unit, fingerprint)| self.applied.get(unit) != Some(fingerprint))
            .collect();

        for unit in &removed {
            let gone = self.engine.remove_by_source(unit);
            self.applied.remove(unit);
            tracing::info!(unit, automations = gone.len(), "automation unit removed");
        }

        for (unit, fingerprint) in &changed {
            self.engine.remove_by_source(unit);
            match self.source.load(unit).await {
                Ok(definitions) => {
                    let mut loaded = 0_usize;
                    for definition in &definitions {
                        match self.engine.add(definition, unit) {
                            Ok(_) => loaded += 1,
                            Err(err) => tracing::warn!(
                                unit,
                                name = %definition.name,
                                error = %describe(&err),
                                "invalid automation skipped"
                            ),
                        }
                    }
                    tracing::info!(unit, automations = loaded, "automation unit loaded");
                }
                Err(err) => {
                    tracing::error!(unit, error = %describe(&err), "unable to load automation unit");
                }
            }
            self.applied.insert(unit.clone(), fingerprint.clone());
        }

        let affected = removed.len() + changed.len();
        if affected > 0 {
            self.deploy().await;
        }
        Ok(affected)
    }

    /// Run every rule deployer, then the engine deploy pass. Returns how many
    /// automations were deployed.
    pub async fn deploy(&self) -> usize {
        for deployer in &self.deployers {
            let rules = deployer.deploy(&self.engine).await;
            tracing::debug!(deployer = deployer.name(), rules, "rules deployed");
        }
        self.engine.deploy().await
    }
}
