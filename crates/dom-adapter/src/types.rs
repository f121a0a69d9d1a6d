use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::port::LiveDocument;

/// Identifier of a node inside one loaded document.
///
/// Ids are never reused by the same document, so an id captured before a
/// navigation resolves to nothing afterwards instead of to an unrelated node.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Document,
    Element,
    Text,
    ShadowRoot,
}

/// Axis-aligned box in CSS pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// The subset of computed style the perceiver cares about.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: f64,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: 1.0,
        }
    }
}

impl ComputedStyle {
    pub fn hides(&self) -> bool {
        self.display == "none"
            || self.visibility == "hidden"
            || self.visibility == "collapse"
            || self.opacity <= 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

impl Viewport {
    /// Visible area in client coordinates.
    pub fn client_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    pub fn is_settled(self) -> bool {
        matches!(self, ReadyState::Interactive | ReadyState::Complete)
    }
}

/// A synthetic DOM event dispatched on an element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomEvent {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl DomEvent {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            key: None,
        }
    }

    pub fn key(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            key: Some(key.into()),
        }
    }
}

/// Result of asking a frame host for its nested document.
pub enum FrameAccess {
    Ready(Arc<dyn LiveDocument>),
    /// The frame belongs to another origin and cannot be inspected.
    CrossOrigin,
    Unavailable(String),
}

impl fmt::Debug for FrameAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameAccess::Ready(doc) => write!(f, "Ready({})", doc.url()),
            FrameAccess::CrossOrigin => f.write_str("CrossOrigin"),
            FrameAccess::Unavailable(reason) => write!(f, "Unavailable({reason})"),
        }
    }
}

/// A live reference to one element: the document that owns it plus its id.
#[derive(Clone)]
pub struct ElementHandle {
    pub document: Arc<dyn LiveDocument>,
    pub node: NodeId,
}

impl ElementHandle {
    pub fn new(document: Arc<dyn LiveDocument>, node: NodeId) -> Self {
        Self { document, node }
    }

    pub fn tag_name(&self) -> Option<String> {
        self.document.tag_name(self.node)
    }

    /// True when both handles point at the same node of the same document.
    pub fn same_as(&self, other: &ElementHandle) -> bool {
        self.node == other.node && Arc::ptr_eq(&self.document, &other.document)
    }
}

impl fmt::Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementHandle")
            .field("document", &self.document.url())
            .field("node", &self.node)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_geometry() {
        let rect = Rect::new(10.0, 10.0, 100.0, 20.0);
        assert_eq!(rect.center(), (60.0, 20.0));
        assert!(rect.contains(10.0, 10.0));
        assert!(!rect.contains(110.0, 10.0));
        assert!(rect.intersects(&Rect::new(100.0, 0.0, 50.0, 50.0)));
        assert!(!rect.intersects(&Rect::new(200.0, 0.0, 50.0, 50.0)));
        assert!(Rect::default().is_empty());
    }

    #[test]
    fn style_hiding() {
        let mut style = ComputedStyle::default();
        assert!(!style.hides());
        style.opacity = 0.0;
        assert!(style.hides());
        style.opacity = 1.0;
        style.visibility = "hidden".into();
        assert!(style.hides());
    }
}
