//! Element resolver with boundary-aware fallback

use std::sync::Arc;

use async_recursion::async_recursion;
use async_trait::async_trait;
use dom_adapter::{ElementHandle, FrameAccess, LiveDocument};
use perceiver_structural::{DomSnapshot, SnapshotId};
use tracing::{debug, warn};

use crate::errors::LocatorError;
use crate::strategies::selector_for;
use crate::types::{LocatorStrategy, Resolution};

/// Element resolver trait
#[async_trait]
pub trait ElementResolver: Send + Sync {
    /// Locate the live element behind a snapshot node and scroll it into view.
    async fn resolve(
        &self,
        doc: Arc<dyn LiveDocument>,
        snapshot: &DomSnapshot,
        node: SnapshotId,
    ) -> Result<Resolution, LocatorError>;
}

/// Default element resolver implementation
#[derive(Debug, Default, Clone)]
pub struct DefaultElementResolver;

impl DefaultElementResolver {
    pub fn new() -> Self {
        Self
    }

    #[async_recursion]
    async fn locate(
        &self,
        doc: Arc<dyn LiveDocument>,
        snapshot: &DomSnapshot,
        node: SnapshotId,
    ) -> Result<Option<(ElementHandle, LocatorStrategy)>, LocatorError> {
        let entry = snapshot
            .get(node)
            .ok_or_else(|| LocatorError::InvalidEntry(format!("{node} is not in the snapshot")))?;
        let selector = selector_for(entry)?;

        // Paths of nested nodes are relative to their boundary root, so the
        // top-level query only applies to top-level nodes.
        if !snapshot.is_nested(node) {
            let root = doc.document_node();
            if let Some(found) = doc.query_selector(root, &selector)? {
                return Ok(Some((
                    ElementHandle::new(doc.clone(), found),
                    LocatorStrategy::Direct,
                )));
            }
            return Ok(None);
        }

        if let Some(host) = snapshot.isolation_host(node) {
            debug!(%node, %host, "resolving through isolation root");
            let Some((host_handle, _)) = self.locate(doc.clone(), snapshot, host).await? else {
                return Ok(None);
            };
            let host_doc = host_handle.document.clone();
            let Some(root) = host_doc.shadow_root(host_handle.node) else {
                return Ok(None);
            };
            return Ok(host_doc
                .query_selector(root, &selector)?
                .map(|found| {
                    (
                        ElementHandle::new(host_doc.clone(), found),
                        LocatorStrategy::IsolationRoot,
                    )
                }));
        }

        if let Some(host) = snapshot.frame_host(node) {
            debug!(%node, %host, "resolving through embedded document");
            let Some((host_handle, _)) = self.locate(doc.clone(), snapshot, host).await? else {
                return Ok(None);
            };
            let inner = match host_handle.document.frame_document(host_handle.node).await {
                FrameAccess::Ready(inner) => inner,
                FrameAccess::CrossOrigin => {
                    warn!(%host, "embedded document became cross-origin");
                    return Ok(None);
                }
                FrameAccess::Unavailable(reason) => {
                    warn!(%host, %reason, "embedded document unavailable");
                    return Ok(None);
                }
            };
            let root = inner.document_node();
            return Ok(inner.query_selector(root, &selector)?.map(|found| {
                (
                    ElementHandle::new(inner.clone(), found),
                    LocatorStrategy::EmbeddedDocument,
                )
            }));
        }

        Ok(None)
    }
}

#[async_trait]
impl ElementResolver for DefaultElementResolver {
    async fn resolve(
        &self,
        doc: Arc<dyn LiveDocument>,
        snapshot: &DomSnapshot,
        node: SnapshotId,
    ) -> Result<Resolution, LocatorError> {
        let selector = snapshot
            .get(node)
            .map(selector_for)
            .transpose()?
            .unwrap_or_default();
        match self.locate(doc, snapshot, node).await? {
            Some((handle, strategy)) => {
                handle.document.scroll_into_view(handle.node)?;
                debug!(
                    %node,
                    strategy = strategy.name(),
                    selector = %selector,
                    "located element"
                );
                Ok(Resolution {
                    handle,
                    strategy,
                    selector,
                })
            }
            None => Err(LocatorError::ElementNotFound(format!(
                "no element matches {selector}"
            ))),
        }
    }
}
