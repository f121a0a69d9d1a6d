//! In-page agent: answers page requests against one live document.
//!
//! The agent owns the per-cycle perception. A `get_page_state` request
//! starts a new cycle; indexed requests must name that cycle, and any request
//! that may replace the document retires it.

use std::sync::Arc;

use action_primitives::{
    probe_readiness, ActionError, ActionPrimitives, ActionReport, DefaultActionPrimitives,
    ExecCtx, ExecutorSettings, PageRequest, PageResponse, PageState,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use dom_adapter::LiveDocument;
use perceiver_structural::{
    Perception, PerceiverError, SnapshotId, StructuralPerceiver, StructuralPerceiverImpl,
};
use tabpilot_core_types::{CycleId, TabId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct PageAgent {
    tab: TabId,
    doc: Arc<dyn LiveDocument>,
    perceiver: StructuralPerceiverImpl,
    primitives: DefaultActionPrimitives,
    /// Last cycle handed out; cycles are never reused.
    last_cycle: CycleId,
    /// Perception of the live cycle, if any.
    live: Option<Perception>,
    cancel: CancellationToken,
}

impl PageAgent {
    pub fn new(tab: TabId, doc: Arc<dyn LiveDocument>, settings: &ExecutorSettings) -> Self {
        Self {
            tab,
            doc,
            perceiver: StructuralPerceiverImpl::default(),
            primitives: DefaultActionPrimitives::new(settings),
            last_cycle: CycleId::default(),
            live: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn tab(&self) -> &TabId {
        &self.tab
    }

    pub fn document(&self) -> Arc<dyn LiveDocument> {
        self.doc.clone()
    }

    /// The live cycle, if an index map is currently valid.
    pub fn live_cycle(&self) -> Option<CycleId> {
        self.live.as_ref().map(Perception::cycle)
    }

    pub async fn handle(&mut self, request: PageRequest) -> PageResponse {
        let name = request.name();
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(err) => {
                debug!(tab = %self.tab, request = name, %err, "page request failed");
                PageResponse::failed(&err)
            }
        }
    }

    async fn dispatch(&mut self, request: PageRequest) -> Result<PageResponse, ActionError> {
        let ctx = ExecCtx::new(self.doc.clone(), self.cancel.child_token());
        match request {
            PageRequest::GetPageState { capture_screenshot } => {
                self.page_state(capture_screenshot).await.map(PageResponse::State)
            }
            PageRequest::PerformActivate { cycle, index } => {
                let url_before = self.doc.url();
                let outcome = {
                    let (perception, node) = self.target(cycle, index)?;
                    self.primitives.activate(&ctx, &perception.snapshot, node).await
                };
                // Following a link replaces the document behind the map.
                if self.doc.url() != url_before {
                    self.retire("activation navigated");
                }
                outcome.map(ack)
            }
            PageRequest::PerformSetValue {
                cycle,
                index,
                value,
            } => {
                let (perception, node) = self.target(cycle, index)?;
                self.primitives
                    .set_value(&ctx, &perception.snapshot, node, &value)
                    .await
                    .map(ack)
            }
            PageRequest::PerformSearch { query } => {
                self.retire("search");
                self.primitives.search(&ctx, &query).await.map(ack)
            }
            PageRequest::NavigateToUrl { url } => {
                self.retire("navigation");
                self.primitives.navigate(&ctx, &url).await.map(ack)
            }
            PageRequest::NavigateBack => {
                self.retire("history back");
                self.primitives.go_back(&ctx).await.map(ack)
            }
            PageRequest::Scroll { direction, amount } => {
                self.primitives.scroll(&ctx, direction, amount).await.map(ack)
            }
            PageRequest::SendKeys { keys } => self.primitives.send_keys(&ctx, &keys).await.map(ack),
            PageRequest::ExtractContent { format } => {
                let report = self.primitives.extract(&ctx, format).await?;
                Ok(PageResponse::Content {
                    content: report.content.unwrap_or_default(),
                })
            }
            PageRequest::CheckReadiness => Ok(PageResponse::Ready {
                ready: probe_readiness(self.doc.clone()).await,
            }),
            PageRequest::ReleaseCycle { cycle } => {
                if self.live_cycle() == Some(cycle) {
                    self.retire("batch finished");
                }
                Ok(PageResponse::Ack)
            }
            PageRequest::Cleanup => {
                self.primitives.cleanup(&ctx);
                self.retire("cleanup");
                Ok(PageResponse::Ack)
            }
        }
    }

    async fn page_state(&mut self, capture_screenshot: bool) -> Result<PageState, ActionError> {
        self.live = None;
        let cycle = self.last_cycle.next();
        self.last_cycle = cycle;

        let perception = self
            .perceiver
            .perceive(self.doc.clone(), cycle)
            .await
            .map_err(|err| ActionError::Execution(err.to_string()))?;
        let screenshot = capture_screenshot.then(|| STANDARD.encode(self.doc.capture_viewport()));
        let state = PageState {
            cycle,
            url: self.doc.url(),
            title: self.doc.title(),
            element_list: perception.element_list.clone(),
            element_count: perception.index.len(),
            screenshot,
        };
        info!(
            tab = %self.tab,
            cycle = %cycle,
            elements = state.element_count,
            "page state captured"
        );
        self.live = Some(perception);
        Ok(state)
    }

    /// Snapshot node behind `index`, provided `cycle` is still live.
    fn target(&self, cycle: CycleId, index: usize) -> Result<(&Perception, SnapshotId), ActionError> {
        let perception = match &self.live {
            Some(perception) if perception.cycle() == cycle => perception,
            Some(perception) => {
                return Err(ActionError::StaleIndex {
                    index,
                    reason: format!("{cycle} is not the live cycle ({})", perception.cycle()),
                })
            }
            None => {
                return Err(ActionError::StaleIndex {
                    index,
                    reason: format!("{cycle} was retired"),
                })
            }
        };
        let node = perception.index.resolve(index).map_err(|err| match err {
            PerceiverError::UnknownIndex { .. } => {
                ActionError::TargetNotFound(format!("no element with index {index}"))
            }
            other => ActionError::Internal(other.to_string()),
        })?;
        Ok((perception, node))
    }

    fn retire(&mut self, reason: &str) {
        if let Some(perception) = self.live.take() {
            debug!(tab = %self.tab, cycle = %perception.cycle(), reason, "index cycle retired");
        }
    }
}

fn ack(_report: ActionReport) -> PageResponse {
    PageResponse::Ack
}
