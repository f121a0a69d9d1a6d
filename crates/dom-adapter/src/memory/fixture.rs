//! JSON page fixtures and the builder API used to assemble them in code.
//!
//! ```json
//! {
//!   "url": "https://shop.test/",
//!   "body": [
//!     {"tag": "button", "text": "Submit"},
//!     {"tag": "a", "attrs": {"href": "/home"}, "text": "Home"},
//!     {"tag": "iframe", "frame": {"access": "cross_origin"}}
//!   ],
//!   "routes": {"https://shop.test/home": {"body": ["Welcome"]}}
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::DomError;
use crate::types::{ReadyState, Rect};

fn default_url() -> String {
    "about:blank".to_string()
}

fn default_ready_state() -> ReadyState {
    ReadyState::Complete
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageFixture {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub viewport: Option<ViewportFixture>,
    #[serde(default = "default_ready_state")]
    pub ready_state: ReadyState,
    /// Number of readiness probes answered with `loading` after the page loads.
    #[serde(default)]
    pub settles_after: u32,
    #[serde(default)]
    pub body: Vec<NodeFixture>,
    /// Pages reachable through navigation, keyed by absolute URL.
    #[serde(default)]
    pub routes: BTreeMap<String, PageFixture>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ViewportFixture {
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeFixture {
    Text(String),
    Element(ElementFixture),
}

impl From<ElementFixture> for NodeFixture {
    fn from(element: ElementFixture) -> Self {
        NodeFixture::Element(element)
    }
}

impl From<&str> for NodeFixture {
    fn from(text: &str) -> Self {
        NodeFixture::Text(text.to_string())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StyleFixture {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "access", rename_all = "snake_case")]
pub enum FrameFixture {
    SameOrigin { page: Box<PageFixture> },
    CrossOrigin,
    Unavailable {
        #[serde(default)]
        reason: String,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElementFixture {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    /// Shorthand for a leading text child.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Absolute `[x, y, width, height]`; omitted boxes are laid out in flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<[f64; 4]>,
    #[serde(default)]
    pub style: StyleFixture,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<i32>,
    #[serde(default)]
    pub children: Vec<NodeFixture>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Vec<NodeFixture>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameFixture>,
    #[serde(default = "default_true")]
    pub complete: bool,
}

impl PageFixture {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            viewport: None,
            ready_state: ReadyState::Complete,
            settles_after: 0,
            body: Vec::new(),
            routes: BTreeMap::new(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, DomError> {
        serde_json::from_str(raw).map_err(|err| DomError::Fixture(err.to_string()))
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = Some(ViewportFixture { width, height });
        self
    }

    pub fn child(mut self, node: impl Into<NodeFixture>) -> Self {
        self.body.push(node.into());
        self
    }

    pub fn route(mut self, url: impl Into<String>, page: PageFixture) -> Self {
        self.routes.insert(url.into(), page);
        self
    }

    pub fn settles_after(mut self, probes: u32) -> Self {
        self.settles_after = probes;
        self
    }
}

impl ElementFixture {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            text: None,
            rect: None,
            style: StyleFixture::default(),
            z: None,
            children: Vec::new(),
            shadow: None,
            frame: None,
            complete: true,
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn rect(mut self, rect: Rect) -> Self {
        self.rect = Some([rect.x, rect.y, rect.width, rect.height]);
        self
    }

    pub fn display(mut self, display: impl Into<String>) -> Self {
        self.style.display = Some(display.into());
        self
    }

    pub fn visibility(mut self, visibility: impl Into<String>) -> Self {
        self.style.visibility = Some(visibility.into());
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.style.opacity = Some(opacity);
        self
    }

    pub fn z(mut self, z: i32) -> Self {
        self.z = Some(z);
        self
    }

    pub fn child(mut self, node: impl Into<NodeFixture>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Append to this element's shadow tree, creating it on first use.
    pub fn shadow_child(mut self, node: impl Into<NodeFixture>) -> Self {
        self.shadow.get_or_insert_with(Vec::new).push(node.into());
        self
    }

    pub fn frame(mut self, page: PageFixture) -> Self {
        self.frame = Some(FrameFixture::SameOrigin {
            page: Box::new(page),
        });
        self
    }

    pub fn cross_origin_frame(mut self) -> Self {
        self.frame = Some(FrameFixture::CrossOrigin);
        self
    }

    pub fn incomplete(mut self) -> Self {
        self.complete = false;
        self
    }
}

/// Shorthand for [`ElementFixture::new`].
pub fn el(tag: &str) -> ElementFixture {
    ElementFixture::new(tag)
}
