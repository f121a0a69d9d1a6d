//! Request/response contract between the orchestrator and an in-page agent.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tabpilot_core_types::CycleId;

use crate::errors::ActionError;
use crate::types::{ExtractFormat, ScrollDirection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageRequest {
    /// Rebuild snapshot and index; starts a new cycle.
    GetPageState {
        #[serde(default)]
        capture_screenshot: bool,
    },
    PerformActivate { cycle: CycleId, index: usize },
    PerformSetValue { cycle: CycleId, index: usize, value: String },
    PerformSearch { query: String },
    NavigateToUrl { url: String },
    NavigateBack,
    Scroll {
        direction: ScrollDirection,
        #[serde(default)]
        amount: Option<f64>,
    },
    SendKeys { keys: String },
    ExtractContent { format: ExtractFormat },
    CheckReadiness,
    /// Discard the index map of `cycle` once its batch is done.
    ReleaseCycle { cycle: CycleId },
    /// Remove overlays and retire the current cycle.
    Cleanup,
}

impl PageRequest {
    pub fn name(&self) -> &'static str {
        match self {
            PageRequest::GetPageState { .. } => "get_page_state",
            PageRequest::PerformActivate { .. } => "perform_activate",
            PageRequest::PerformSetValue { .. } => "perform_set_value",
            PageRequest::PerformSearch { .. } => "perform_search",
            PageRequest::NavigateToUrl { .. } => "navigate_to_url",
            PageRequest::NavigateBack => "navigate_back",
            PageRequest::Scroll { .. } => "scroll",
            PageRequest::SendKeys { .. } => "send_keys",
            PageRequest::ExtractContent { .. } => "extract_content",
            PageRequest::CheckReadiness => "check_readiness",
            PageRequest::ReleaseCycle { .. } => "release_cycle",
            PageRequest::Cleanup => "cleanup",
        }
    }

    /// Safe to resend after a lost reply.
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            PageRequest::GetPageState { .. }
                | PageRequest::ExtractContent { .. }
                | PageRequest::CheckReadiness
                | PageRequest::ReleaseCycle { .. }
                | PageRequest::Cleanup
        )
    }
}

/// Indexed state of a page for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageState {
    pub cycle: CycleId,
    pub url: String,
    pub title: String,
    /// `index[:]<tag attrs>text</tag>` lines.
    pub element_list: String,
    pub element_count: usize,
    /// Base64 viewport capture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageResponse {
    State(PageState),
    Ack,
    Content { content: String },
    Ready { ready: bool },
    Failed { error: String, retryable: bool },
}

impl PageResponse {
    pub fn failed(error: &ActionError) -> Self {
        PageResponse::Failed {
            error: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// Transport to one page.
#[async_trait]
pub trait PageChannel: Send + Sync {
    async fn send(&self, request: PageRequest) -> Result<PageResponse, ActionError>;
}
