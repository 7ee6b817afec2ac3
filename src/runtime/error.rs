/// Step-level error taxonomy
///
/// Every failure a step runner can report falls into one of three classes.
/// The engine records the class in the run report and carries on with the
/// next step; none of these ever aborts a run.

use crate::bot::{BotError, SessionError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepError {
    /// Bad configuration or input detected before (or instead of) any side effect
    #[error("{0}")]
    Validation(String),

    /// Bot lookup failed
    #[error(transparent)]
    Bot(#[from] BotError),

    /// Messaging session failure (room validation, alias lookup, send)
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Outbound call to an external service failed
    #[error("{0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Resolution,
    Transport,
}

impl StepError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::Validation(_) => ErrorKind::Validation,
            StepError::Bot(_) => ErrorKind::Resolution,
            StepError::Session(SessionError::InvalidRoom(_)) => ErrorKind::Validation,
            StepError::Session(e) if e.is_resolution() => ErrorKind::Resolution,
            StepError::Session(_) | StepError::Transport(_) => ErrorKind::Transport,
        }
    }
}

impl From<reqwest::Error> for StepError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StepError::Transport(format!("request timed out: {e}"))
        } else {
            StepError::Transport(e.to_string())
        }
    }
}
