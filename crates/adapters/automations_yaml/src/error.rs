//! YAML source error types.

use std::path::PathBuf;

use commander_domain::error::CommanderError;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("unable to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid automation file {path}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The blocking filesystem task did not complete.
    #[error("filesystem task failed")]
    Join(#[from] tokio::task::JoinError),
}

impl From<SourceError> for CommanderError {
    fn from(err: SourceError) -> Self {
        CommanderError::External(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_path() {
        let err = SourceError::Io {
            path: PathBuf::from("/etc/commander/automations"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.to_string(), "unable to read /etc/commander/automations");
    }
}
