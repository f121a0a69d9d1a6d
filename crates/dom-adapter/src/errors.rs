//! Error types for the document port.

use thiserror::Error;

use crate::types::NodeId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomError {
    /// Node id does not exist in the currently loaded document.
    #[error("node {0} is detached")]
    Detached(NodeId),

    #[error("node {node} is not an element")]
    NotAnElement { node: NodeId },

    #[error("element {node} cannot be activated: {reason}")]
    NotInteractable { node: NodeId, reason: String },

    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("fixture error: {0}")]
    Fixture(String),
}

impl DomError {
    pub fn invalid_selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }
}
