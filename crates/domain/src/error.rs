//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`CommanderError`] via `#[from]` (or a `From` impl in the adapter crate).

/// Base error for every port boundary in the workspace.
#[derive(Debug, thiserror::Error)]
pub enum CommanderError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced automation or rule does not exist (anymore).
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A rule's textual DSL could not be parsed.
    #[error("invalid rule text")]
    Dsl(#[from] DslError),

    /// A collaborator (bus, HTTP, filesystem, …) failed.
    #[error("external collaborator error")]
    External(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// An automation must carry a non-empty name.
    #[error("name must not be empty")]
    EmptyName,

    /// The combination mode is neither `AND` nor `OR`.
    #[error("unknown mode {0:?}, expected AND or OR")]
    UnknownMode(String),

    /// A constraint or action entry names no protocol at all.
    #[error("{0} entry has no protocol text")]
    EmptyRule(&'static str),
}

/// Lookup failure for an id that is not (or no longer) in its store.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of the missing record (`"Automation"`, `"Rule"`).
    pub entity: &'static str,
    /// Display form of the missing identifier.
    pub id: String,
}

/// Failure to parse a constraint or action DSL text.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DslError {
    /// The text does not match the protocol grammar.
    #[error("malformed rule text {0:?}")]
    Malformed(String),

    /// An option such as `(Reset 5s)` carries an unparseable value.
    #[error("invalid value {value:?} for option {option}")]
    InvalidOption {
        /// Option name as written in the text.
        option: &'static str,
        /// The offending value.
        value: String,
    },

    /// A payload template failed to compile.
    #[error("invalid template: {0}")]
    Template(String),

    /// A schedule expression failed to parse.
    #[error("invalid schedule expression: {0}")]
    Schedule(String),
}

/// Render an error followed by every source in its chain, `: ` separated.
///
/// Rule errors are stored as plain strings, so the chain is flattened here.
#[must_use]
pub fn describe(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
