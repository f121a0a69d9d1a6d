use action_primitives::ActionError;
use tabpilot_core_types::TabId;
use thiserror::Error;

/// Errors surfaced by the bridge.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BridgeError {
    #[error("tab not found: {0}")]
    TabNotFound(TabId),
    #[error("timeout waiting for {request} after {attempts} attempt(s)")]
    Timeout { request: String, attempts: u32 },
    #[error("channel closed")]
    ChannelClosed,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BridgeError> for ActionError {
    fn from(err: BridgeError) -> Self {
        ActionError::Channel(err.to_string())
    }
}
