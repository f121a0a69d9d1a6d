//! Page readiness: the in-page probe and the bounded waiter around it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dom_adapter::{FrameAccess, LiveDocument};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::protocol::{PageChannel, PageRequest, PageResponse};
use crate::types::ExecutorSettings;

const BUSY_MARKERS: &[&str] = &["[aria-busy=\"true\"]", "[role=\"progressbar\"]"];

/// Whether the page looks stable enough to snapshot.
///
/// Ready means: document `interactive` or `complete`, every same-origin frame
/// `complete`, every image loaded, and no busy markers.
pub async fn probe_readiness(doc: Arc<dyn LiveDocument>) -> bool {
    if !doc.ready_state().is_settled() {
        return false;
    }
    let root = doc.document_node();

    for frame in doc.query_selector_all(root, "iframe").unwrap_or_default() {
        if let FrameAccess::Ready(inner) = doc.frame_document(frame).await {
            if inner.ready_state() != dom_adapter::ReadyState::Complete {
                return false;
            }
        }
    }

    let images = doc.query_selector_all(root, "img").unwrap_or_default();
    if images.iter().any(|img| !doc.resource_complete(*img)) {
        return false;
    }

    for marker in BUSY_MARKERS {
        if !doc.query_selector_all(root, marker).unwrap_or_default().is_empty() {
            return false;
        }
    }
    true
}

/// Waiting strategy trait
#[async_trait]
pub trait WaitStrategy: Send + Sync {
    /// Wait for the page behind `channel` to settle. Returns whether it did
    /// before the deadline; never fails.
    async fn wait(&self, channel: &dyn PageChannel) -> bool;
}

/// Fixed settle delay followed by readiness polling
pub struct DefaultWaitStrategy {
    pub settle_delay: Duration,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for DefaultWaitStrategy {
    fn default() -> Self {
        Self::from_settings(&ExecutorSettings::default())
    }
}

impl DefaultWaitStrategy {
    pub fn from_settings(settings: &ExecutorSettings) -> Self {
        Self {
            settle_delay: settings.settle_delay(),
            timeout: settings.readiness_timeout(),
            poll_interval: settings.readiness_poll(),
        }
    }
}

#[async_trait]
impl WaitStrategy for DefaultWaitStrategy {
    async fn wait(&self, channel: &dyn PageChannel) -> bool {
        if !self.settle_delay.is_zero() {
            sleep(self.settle_delay).await;
        }
        let deadline = Instant::now() + self.timeout;
        loop {
            match channel.send(PageRequest::CheckReadiness).await {
                Ok(PageResponse::Ready { ready: true }) => {
                    debug!("page ready");
                    return true;
                }
                Ok(_) => {}
                Err(err) => debug!(%err, "readiness probe failed"),
            }
            if Instant::now() + self.poll_interval > deadline {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "page not ready before timeout; continuing"
                );
                return false;
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_adapter::{el, MemoryDocument, PageFixture};

    #[tokio::test]
    async fn probe_sees_busy_markers_and_images() {
        let busy = MemoryDocument::shared(
            PageFixture::new("https://ready.test/").child(el("div").attr("aria-busy", "true")),
        );
        assert!(!probe_readiness(busy).await);

        let loading_image = MemoryDocument::shared(
            PageFixture::new("https://ready.test/").child(el("img").attr("src", "/a.png").incomplete()),
        );
        assert!(!probe_readiness(loading_image).await);

        let calm = MemoryDocument::shared(
            PageFixture::new("https://ready.test/").child(el("img").attr("src", "/a.png")),
        );
        assert!(probe_readiness(calm).await);
    }

    #[tokio::test]
    async fn probe_waits_for_loading_documents_and_frames() {
        let doc = MemoryDocument::shared(PageFixture::new("https://ready.test/").settles_after(1));
        assert!(!probe_readiness(doc.clone()).await);
        assert!(probe_readiness(doc).await);

        let framed = MemoryDocument::shared(
            PageFixture::new("https://ready.test/")
                .child(el("iframe").frame(PageFixture::new("https://ready.test/f").settles_after(1))),
        );
        assert!(!probe_readiness(framed.clone()).await);
        assert!(probe_readiness(framed).await);
    }
}
