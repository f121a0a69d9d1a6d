use thiserror::Error;

use crate::model::AgentRole;

/// Errors emitted by the agent-core crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AgentError {
    /// The reasoning collaborator could not be reached or refused the request.
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// A reply that does not match the role's schema.
    #[error("malformed {role} reply: {reason}")]
    MalformedReply { role: AgentRole, reason: String },

    /// The page could not produce state for the next cycle.
    #[error("page error: {0}")]
    Page(String),

    #[error("history store error: {0}")]
    History(String),

    /// Raised when an agent request is malformed or missing required fields.
    #[error("invalid agent request: {0}")]
    InvalidRequest(String),
}

impl AgentError {
    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::Collaborator(message.into())
    }

    pub fn malformed(role: AgentRole, reason: impl Into<String>) -> Self {
        Self::MalformedReply {
            role,
            reason: reason.into(),
        }
    }

    pub fn history(message: impl Into<String>) -> Self {
        Self::History(message.into())
    }

    /// Helper for wrapping static string errors.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}
