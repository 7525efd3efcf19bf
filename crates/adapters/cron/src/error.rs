//! Cron adapter error types.

use commander_domain::error::CommanderError;

#[derive(Debug, thiserror::Error)]
pub enum CronError {
    /// The expression was rejected by the schedule parser.
    #[error("invalid schedule {expression:?}")]
    Schedule {
        expression: String,
        #[source]
        source: cron::error::Error,
    },

    /// The schedule has no occurrence after the given instant.
    #[error("schedule {0:?} never fires again")]
    Exhausted(String),

    #[error("unknown timezone {0:?}")]
    Timezone(String),
}

impl From<CronError> for CommanderError {
    fn from(err: CronError) -> Self {
        CommanderError::External(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_exhausted_schedule() {
        let err = CronError::Exhausted("0 0 0 1 1 * 2000".to_string());
        assert_eq!(
            err.to_string(),
            "schedule \"0 0 0 1 1 * 2000\" never fires again"
        );
    }

    #[test]
    fn should_convert_into_external_error() {
        let err: CommanderError = CronError::Timezone("Mars/Base".to_string()).into();
        assert!(matches!(err, CommanderError::External(_)));
    }
}
