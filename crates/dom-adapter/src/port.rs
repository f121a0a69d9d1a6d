//! Port through which the perceiver and the primitives see a rendered page.
//!
//! Inspection is synchronous, the way an in-page agent reads the DOM. The
//! only suspension point is [`LiveDocument::frame_document`], since an
//! embedded document may still be loading when the traversal reaches it.

use async_trait::async_trait;

use crate::errors::DomError;
use crate::types::{ComputedStyle, DomEvent, FrameAccess, NodeId, NodeKind, ReadyState, Rect, Viewport};

#[async_trait]
pub trait LiveDocument: Send + Sync {
    fn url(&self) -> String;

    fn title(&self) -> String {
        String::new()
    }

    /// The document node; hit-testing context of the top-level tree.
    fn document_node(&self) -> NodeId;

    fn body(&self) -> Option<NodeId>;

    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Lowercase tag name for elements, `None` otherwise.
    fn tag_name(&self, node: NodeId) -> Option<String>;

    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.attributes(node)
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Light-tree children in document order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Parent within the same tree. Shadow roots and the document node have none.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn shadow_root(&self, host: NodeId) -> Option<NodeId>;

    fn shadow_host(&self, root: NodeId) -> Option<NodeId>;

    fn text(&self, node: NodeId) -> Option<String>;

    /// Client rect relative to this document's viewport.
    fn bounding_box(&self, node: NodeId) -> Option<Rect>;

    fn computed_style(&self, node: NodeId) -> ComputedStyle;

    fn viewport(&self) -> Viewport;

    /// Hit-test in a rendering context (document node or shadow root) at client coordinates.
    fn element_from_point(&self, context: NodeId, x: f64, y: f64) -> Option<NodeId>;

    fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, DomError>;

    fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError>;

    /// Nested document of an embedded-frame host.
    async fn frame_document(&self, host: NodeId) -> FrameAccess;

    /// Whether a subresource (image, frame) finished loading.
    fn resource_complete(&self, _node: NodeId) -> bool {
        true
    }

    fn ready_state(&self) -> ReadyState;

    fn active_element(&self) -> Option<NodeId>;

    fn focus(&self, node: NodeId) -> Result<(), DomError>;

    /// Native activation of an element.
    fn click(&self, node: NodeId) -> Result<(), DomError>;

    fn dispatch_event(&self, node: NodeId, event: DomEvent) -> Result<(), DomError>;

    fn value(&self, node: NodeId) -> Option<String>;

    fn set_value(&self, node: NodeId, value: &str) -> Result<(), DomError>;

    fn scroll_into_view(&self, node: NodeId) -> Result<(), DomError>;

    fn scroll_by(&self, dx: f64, dy: f64);

    fn navigate(&self, url: &str) -> Result<(), DomError>;

    /// Returns false when there is no history entry to go back to.
    fn history_back(&self) -> Result<bool, DomError>;

    fn inner_text(&self, node: NodeId) -> String;

    fn inner_html(&self, node: NodeId) -> String;

    fn move_pointer(&self, x: f64, y: f64);

    fn set_highlight(&self, node: NodeId, on: bool);

    /// Remove pointer overlay and highlight markers.
    fn clear_overlays(&self);

    fn capture_viewport(&self) -> Vec<u8>;
}
