//! Core types for locator system

use dom_adapter::ElementHandle;
use serde::{Deserialize, Serialize};

/// Resolution step that produced a live element.
///
/// Tried in this order; the nested steps recurse on the boundary host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocatorStrategy {
    /// Query the top-level document
    Direct,

    /// Query the isolation root of the located host
    IsolationRoot,

    /// Query the embedded document of the located frame host
    EmbeddedDocument,
}

impl LocatorStrategy {
    /// Label used in logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            LocatorStrategy::Direct => "direct",
            LocatorStrategy::IsolationRoot => "isolation-root",
            LocatorStrategy::EmbeddedDocument => "embedded-document",
        }
    }
}

/// A located, scrolled-into-view element.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub handle: ElementHandle,
    pub strategy: LocatorStrategy,
    pub selector: String,
}
