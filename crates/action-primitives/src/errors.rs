//! Error types for action primitives

use action_locator::LocatorError;
use dom_adapter::DomError;
use thiserror::Error;

/// Error types for action execution
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    /// The target of an indexed action could not be re-found
    #[error("target not found: {0}")]
    TargetNotFound(String),

    /// Action name outside the closed vocabulary; aborts the whole batch
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// Known action with missing or malformed fields
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Index used against a cycle that is no longer current
    #[error("stale index {index}: {reason}")]
    StaleIndex { index: usize, reason: String },

    /// The page rejected or failed the interaction
    #[error("execution failed: {0}")]
    Execution(String),

    /// Operation was cancelled before it started
    #[error("operation interrupted: {0}")]
    Interrupted(String),

    /// The page channel could not deliver the request
    #[error("page channel error: {0}")]
    Channel(String),

    /// Internal error (should not happen in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::TargetNotFound(_)
                | ActionError::StaleIndex { .. }
                | ActionError::Execution(_)
                | ActionError::Channel(_)
        )
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            ActionError::Internal(_) => 3,
            ActionError::UnknownAction(_) | ActionError::Channel(_) => 2,
            ActionError::TargetNotFound(_)
            | ActionError::StaleIndex { .. }
            | ActionError::Execution(_) => 1,
            _ => 0,
        }
    }
}

impl From<LocatorError> for ActionError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::ElementNotFound(detail) => ActionError::TargetNotFound(detail),
            LocatorError::InvalidEntry(detail) => ActionError::TargetNotFound(detail),
            LocatorError::Document(detail) => ActionError::Execution(detail),
            LocatorError::Internal(detail) => ActionError::Internal(detail),
        }
    }
}

impl From<DomError> for ActionError {
    fn from(err: DomError) -> Self {
        ActionError::Execution(err.to_string())
    }
}
