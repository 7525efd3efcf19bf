//! A directory tree of `.yml`/`.yaml` files, each holding a list of
//! automations.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use commander_app::ports::{AutomationSource, Fingerprints};
use commander_domain::automation::AutomationDefinition;
use commander_domain::error::CommanderError;

use crate::error::SourceError;

const EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Automation files below a root directory. Units are identified by their
/// path relative to the root, with `/` separators.
#[derive(Debug, Clone)]
pub struct YamlSource {
    root: PathBuf,
}

impl YamlSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AutomationSource for YamlSource {
    async fn scan(&self) -> Result<Fingerprints, CommanderError> {
        let root = self.root.clone();
        let fingerprints = tokio::task::spawn_blocking(move || scan(&root))
            .await
            .map_err(SourceError::from)??;
        Ok(fingerprints)
    }

    async fn load(&self, unit: &str) -> Result<Vec<AutomationDefinition>, CommanderError> {
        let path = self.root.join(unit);
        let definitions = tokio::task::spawn_blocking(move || load(&path))
            .await
            .map_err(SourceError::from)??;
        Ok(definitions)
    }
}

/// Symlinked directories are not descended into. Entries that cannot be
/// walked or read are logged and left out of the scan; only an unreadable
/// root fails it.
fn scan(root: &Path) -> Result<Fingerprints, SourceError> {
    let mut fingerprints = Fingerprints::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(SourceError::Io {
                    path: root.to_path_buf(),
                    source: err.into(),
                });
            }
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "skipping automation path");
                continue;
            }
        };
        if entry.file_type().is_dir() || !is_automation_file(entry.path()) {
            continue;
        }
        match fs::read(entry.path()) {
            Ok(content) => {
                fingerprints.insert(unit_name(root, entry.path()), fingerprint(&content));
            }
            Err(err) => {
                tracing::warn!(path = %entry.path().display(), error = %err, "skipping unreadable automation file");
            }
        }
    }
    tracing::trace!(root = %root.display(), units = fingerprints.len(), "automation files scanned");
    Ok(fingerprints)
}

fn load(path: &Path) -> Result<Vec<AutomationDefinition>, SourceError> {
    let content = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content).map_err(|source| SourceError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse the content of one automation file. An empty file holds no
/// automations.
///
/// # Errors
///
/// Returns the YAML error if the content is not a list of automations.
pub fn parse(content: &str) -> Result<Vec<AutomationDefinition>, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(content)
}

fn is_automation_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext))
}

fn unit_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn fingerprint(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}
