//! Automation source port — where automation definitions come from.

use std::collections::BTreeMap;
use std::future::Future;

use commander_domain::automation::AutomationDefinition;
use commander_domain::error::CommanderError;

/// Content fingerprint per source unit, keyed by the unit identity.
pub type Fingerprints = BTreeMap<String, String>;

/// A set of source units (files, documents, …) holding automation
/// definitions.
pub trait AutomationSource: Send + Sync {
    /// List every unit currently present together with its content
    /// fingerprint.
    fn scan(&self) -> impl Future<Output = Result<Fingerprints, CommanderError>> + Send;

    /// Load the definitions of one unit.
    fn load(
        &self,
        unit: &str,
    ) -> impl Future<Output = Result<Vec<AutomationDefinition>, CommanderError>> + Send;
}
