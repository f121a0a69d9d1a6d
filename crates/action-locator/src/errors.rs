//! Error types for locator system

use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocatorError {
    /// No live element matches the reconstructed selector
    #[error("target not found: {0}")]
    ElementNotFound(String),

    /// The snapshot entry cannot be turned into a selector
    #[error("invalid snapshot entry: {0}")]
    InvalidEntry(String),

    /// The live document rejected a query or interaction
    #[error("document error: {0}")]
    Document(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl LocatorError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, LocatorError::ElementNotFound(_) | LocatorError::Document(_))
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::Internal(_) => 3,
            LocatorError::Document(_) => 2,
            LocatorError::ElementNotFound(_) => 1,
            LocatorError::InvalidEntry(_) => 0,
        }
    }
}

impl From<dom_adapter::DomError> for LocatorError {
    fn from(err: dom_adapter::DomError) -> Self {
        LocatorError::Document(err.to_string())
    }
}
