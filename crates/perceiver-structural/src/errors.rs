use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PerceiverError {
    #[error("document has no root element: {0}")]
    EmptyDocument(String),
    #[error("index {index} is not part of {cycle}")]
    UnknownIndex { index: usize, cycle: String },
    #[error("internal error: {0}")]
    Internal(String),
}

impl PerceiverError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
