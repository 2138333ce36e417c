//! Stage-scoped error reporting
//!
//! Each stage has its own error enum. They all funnel into [`StageError`],
//! which records the stage, a stable kind, the message and the wrapped fault.

use std::fmt;

use thiserror::Error;

use super::state::Stage;

/// Description of the lower-level fault wrapped by a stage error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCause {
    /// Short name of the fault class, e.g. `io/NotFound` or `reqwest/timeout`
    pub kind: String,
    /// The fault's own message
    pub message: String,
}

impl ErrorCause {
    pub fn new(kind: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            kind: kind.into(),
            message: message.to_string(),
        }
    }

    /// Describe an I/O fault
    pub fn io(error: &std::io::Error) -> Self {
        Self::new(format!("io/{:?}", error.kind()), error)
    }
}

/// Implemented by every stage error so the orchestrator can tag it
pub trait StageFailure: std::error::Error {
    /// Stage this error belongs to
    const STAGE: Stage;

    /// Stable variant name
    fn kind(&self) -> &'static str;

    /// Wrapped lower-level fault, if any
    fn fault(&self) -> Option<ErrorCause>;
}

/// A failed pipeline run, tagged with the stage that failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} stage failed [{kind}]: {message}")]
pub struct StageError {
    pub stage: Stage,
    pub kind: &'static str,
    pub message: String,
    pub cause: Option<ErrorCause>,
}

impl StageError {
    /// Single composite message shown to the user
    pub fn user_message(&self) -> String {
        let (cause_kind, cause_message) = match &self.cause {
            Some(cause) => (cause.kind.as_str(), cause.message.as_str()),
            None => ("none", "none"),
        };
        format!(
            "Error [{}/{}]: {}\nCause [{}]: {}",
            self.stage, self.kind, self.message, cause_kind, cause_message
        )
    }
}

impl<E: StageFailure> From<E> for StageError {
    fn from(error: E) -> Self {
        Self {
            stage: E::STAGE,
            kind: error.kind(),
            message: error.to_string(),
            cause: error.fault(),
        }
    }
}
