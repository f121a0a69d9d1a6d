//! In-memory rendered document.
//!
//! `MemoryDocument` keeps a node arena with laid-out boxes, inherited style,
//! z-ordered hit-testing per rendering context, and a log of every event an
//! element received. It backs the CLI's fixture mode and every test that
//! needs a page.

mod fixture;

pub use fixture::{el, ElementFixture, FrameFixture, NodeFixture, PageFixture, StyleFixture, ViewportFixture};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::debug;
use url::Url;

use crate::errors::DomError;
use crate::port::LiveDocument;
use crate::selector::{self, Selector, SelectorTree};
use crate::types::{
    ComputedStyle, DomEvent, FrameAccess, NodeId, NodeKind, ReadyState, Rect, Viewport,
};

const LINE_HEIGHT: f64 = 24.0;
const FRAME_HEIGHT: f64 = 150.0;
const HIGHLIGHT_ATTR: &str = "data-tabpilot-highlight";
const VOID_TAGS: &[&str] = &["area", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr"];

/// One event received by an element.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedEvent {
    pub node: NodeId,
    pub event: DomEvent,
}

enum FrameSlot {
    Loaded(Arc<MemoryDocument>),
    CrossOrigin,
    Unavailable(String),
}

struct MemNode {
    kind: NodeKind,
    tag: Option<String>,
    attrs: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    shadow_root: Option<NodeId>,
    host: Option<NodeId>,
    explicit_rect: Option<Rect>,
    rect: Rect,
    display: Option<String>,
    visibility: Option<String>,
    opacity: Option<f64>,
    z_index: Option<i32>,
    value: Option<String>,
    frame: Option<FrameSlot>,
    complete: bool,
    paint_order: u32,
}

impl MemNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            tag: None,
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
            parent: None,
            shadow_root: None,
            host: None,
            explicit_rect: None,
            rect: Rect::default(),
            display: None,
            visibility: None,
            opacity: None,
            z_index: None,
            value: None,
            frame: None,
            complete: true,
            paint_order: 0,
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// The currently loaded page: an arena addressed by `NodeId(base + index)`.
struct Page {
    base: u32,
    url: String,
    title: String,
    viewport: Viewport,
    ready_state: ReadyState,
    nodes: Vec<MemNode>,
    document: NodeId,
    body: NodeId,
    active: Option<NodeId>,
    source: PageFixture,
}

impl Page {
    fn build(source: PageFixture, base: u32) -> Self {
        let viewport = source
            .viewport
            .map(|vp| Viewport {
                width: vp.width,
                height: vp.height,
                ..Viewport::default()
            })
            .unwrap_or_default();
        let mut page = Page {
            base,
            url: source.url.clone(),
            title: source.title.clone(),
            viewport,
            ready_state: source.ready_state,
            nodes: Vec::new(),
            document: NodeId(base),
            body: NodeId(base),
            active: None,
            source: PageFixture::new(source.url.clone()),
        };
        let document = page.push(MemNode::new(NodeKind::Document), None);
        let html = page.push_element("html", document);
        let body = page.push_element("body", html);
        page.document = document;
        page.body = body;
        for child in &source.body {
            page.add_fixture(child, body);
        }
        page.source = source;
        page.layout();
        page
    }

    fn push(&mut self, mut node: MemNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.base + self.nodes.len() as u32);
        node.parent = parent;
        self.nodes.push(node);
        if let Some(parent) = parent {
            if let Some(p) = self.get_mut(parent) {
                p.children.push(id);
            }
        }
        id
    }

    fn push_element(&mut self, tag: &str, parent: NodeId) -> NodeId {
        let mut node = MemNode::new(NodeKind::Element);
        node.tag = Some(tag.to_string());
        self.push(node, Some(parent))
    }

    fn add_fixture(&mut self, fixture: &NodeFixture, parent: NodeId) {
        match fixture {
            NodeFixture::Text(text) => {
                let mut node = MemNode::new(NodeKind::Text);
                node.text = Some(text.clone());
                self.push(node, Some(parent));
            }
            NodeFixture::Element(element) => {
                let mut node = MemNode::new(NodeKind::Element);
                node.tag = Some(element.tag.to_ascii_lowercase());
                node.attrs = element
                    .attrs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                node.explicit_rect = element.rect.map(|[x, y, w, h]| Rect::new(x, y, w, h));
                node.display = element.style.display.clone();
                node.visibility = element.style.visibility.clone();
                node.opacity = element.style.opacity;
                node.z_index = element.z;
                node.complete = element.complete;
                node.value = element.attrs.get("value").cloned();
                node.frame = element.frame.as_ref().map(|frame| match frame {
                    FrameFixture::SameOrigin { page } => {
                        FrameSlot::Loaded(Arc::new(MemoryDocument::from_fixture((**page).clone())))
                    }
                    FrameFixture::CrossOrigin => FrameSlot::CrossOrigin,
                    FrameFixture::Unavailable { reason } => FrameSlot::Unavailable(reason.clone()),
                });
                let id = self.push(node, Some(parent));
                if let Some(text) = &element.text {
                    self.add_fixture(&NodeFixture::Text(text.clone()), id);
                }
                for child in &element.children {
                    self.add_fixture(child, id);
                }
                if let Some(shadow) = &element.shadow {
                    let mut root = MemNode::new(NodeKind::ShadowRoot);
                    root.host = Some(id);
                    let root_id = self.push(root, None);
                    if let Some(host) = self.get_mut(id) {
                        host.shadow_root = Some(root_id);
                    }
                    for child in shadow {
                        self.add_fixture(child, root_id);
                    }
                }
            }
        }
    }

    fn index(&self, id: NodeId) -> Option<usize> {
        let idx = id.0.checked_sub(self.base)? as usize;
        (idx < self.nodes.len()).then_some(idx)
    }

    fn get(&self, id: NodeId) -> Option<&MemNode> {
        self.index(id).map(|idx| &self.nodes[idx])
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut MemNode> {
        self.index(id).map(move |idx| &mut self.nodes[idx])
    }

    fn element(&self, id: NodeId) -> Result<&MemNode, DomError> {
        let node = self.get(id).ok_or(DomError::Detached(id))?;
        if node.kind != NodeKind::Element {
            return Err(DomError::NotAnElement { node: id });
        }
        Ok(node)
    }

    fn layout(&mut self) {
        let width = self.viewport.width;
        let height = self.viewport.height;
        let html = self.get(self.document).and_then(|d| d.children.first().copied());
        let content = self.layout_children(self.body, 0.0, 0.0, width, false);
        let page_rect = Rect::new(0.0, 0.0, width, content.max(height));
        if let Some(html) = html {
            if let Some(node) = self.get_mut(html) {
                node.rect = page_rect;
            }
        }
        let body = self.body;
        if let Some(node) = self.get_mut(body) {
            node.rect = page_rect;
        }
        let mut order = 0;
        let document = self.document;
        self.assign_paint_order(document, &mut order);
    }

    fn layout_children(&mut self, id: NodeId, x: f64, y: f64, width: f64, hidden: bool) -> f64 {
        let Some(node) = self.get(id) else {
            return 0.0;
        };
        let mut flow: Vec<NodeId> = Vec::new();
        if let Some(root) = node.shadow_root {
            if let Some(shadow) = self.get(root) {
                flow.extend(shadow.children.iter().copied());
            }
        }
        flow.extend(node.children.iter().copied());

        let mut cursor = y;
        for child in flow {
            cursor += self.layout_node(child, x, cursor, width, hidden);
        }
        cursor - y
    }

    fn layout_node(&mut self, id: NodeId, x: f64, y: f64, width: f64, hidden: bool) -> f64 {
        let Some(node) = self.get(id) else {
            return 0.0;
        };
        let kind = node.kind;
        let empty_text = node.text.as_deref().map_or(true, |t| t.trim().is_empty());
        let display_none = node.display.as_deref() == Some("none");
        let explicit = node.explicit_rect;
        let is_frame = node.tag.as_deref() == Some("iframe");
        match kind {
            NodeKind::Text => {
                let height = if hidden || empty_text { 0.0 } else { LINE_HEIGHT };
                let w = if height > 0.0 { width } else { 0.0 };
                self.set_rect(id, Rect::new(x, y, w, height));
                height
            }
            NodeKind::Element if hidden || display_none => {
                self.set_rect(id, Rect::new(x, y, 0.0, 0.0));
                self.layout_children(id, x, y, 0.0, true);
                0.0
            }
            NodeKind::Element => {
                if let Some(rect) = explicit {
                    self.set_rect(id, rect);
                    self.layout_children(id, rect.x, rect.y, rect.width, false);
                    return 0.0;
                }
                self.set_rect(id, Rect::new(x, y, width, 0.0));
                let content = self.layout_children(id, x, y, width, false);
                let height = if is_frame {
                    FRAME_HEIGHT.max(content)
                } else if content <= 0.0 {
                    LINE_HEIGHT
                } else {
                    content
                };
                self.set_rect(id, Rect::new(x, y, width, height));
                height
            }
            _ => 0.0,
        }
    }

    /// Sets a box and keeps an attached shadow root aligned with its host.
    fn set_rect(&mut self, id: NodeId, rect: Rect) {
        let shadow = match self.get_mut(id) {
            Some(node) => {
                node.rect = rect;
                node.shadow_root
            }
            None => return,
        };
        if let Some(root) = shadow {
            if let Some(root) = self.get_mut(root) {
                root.rect = rect;
            }
        }
    }

    fn assign_paint_order(&mut self, id: NodeId, order: &mut u32) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        node.paint_order = *order;
        *order += 1;
        let shadow = node.shadow_root;
        let children = node.children.clone();
        if let Some(root) = shadow {
            self.assign_paint_order(root, order);
        }
        for child in children {
            self.assign_paint_order(child, order);
        }
    }

    fn tree_root(&self, mut id: NodeId) -> NodeId {
        while let Some(parent) = self.get(id).and_then(|n| n.parent) {
            id = parent;
        }
        id
    }

    /// Walks up through shadow hosts as well as parents.
    fn composed_parent(&self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        node.parent.or(node.host)
    }

    fn effective_visibility(&self, id: NodeId) -> String {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if let Some(vis) = self.get(node_id).and_then(|n| n.visibility.clone()) {
                return vis;
            }
            current = self.composed_parent(node_id);
        }
        "visible".to_string()
    }

    fn display_none_in_chain(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if self.get(node_id).and_then(|n| n.display.as_deref()) == Some("none") {
                return true;
            }
            current = self.composed_parent(node_id);
        }
        false
    }

    fn effective_z(&self, id: NodeId) -> i32 {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if let Some(z) = self.get(node_id).and_then(|n| n.z_index) {
                return z;
            }
            current = self.composed_parent(node_id);
        }
        0
    }

    fn client_rect(&self, id: NodeId) -> Option<Rect> {
        let node = self.get(id)?;
        if !matches!(node.kind, NodeKind::Element | NodeKind::Text) {
            return None;
        }
        Some(
            node.rect
                .translate(-self.viewport.scroll_x, -self.viewport.scroll_y),
        )
    }

    fn hit_test(&self, context: NodeId, x: f64, y: f64) -> Option<NodeId> {
        if x < 0.0 || y < 0.0 || x >= self.viewport.width || y >= self.viewport.height {
            return None;
        }
        let doc_x = x + self.viewport.scroll_x;
        let doc_y = y + self.viewport.scroll_y;
        let mut best: Option<(i32, u32, NodeId)> = None;
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.kind != NodeKind::Element || !node.rect.contains(doc_x, doc_y) {
                continue;
            }
            let id = NodeId(self.base + idx as u32);
            if self.tree_root(id) != context
                || self.display_none_in_chain(id)
                || matches!(self.effective_visibility(id).as_str(), "hidden" | "collapse")
            {
                continue;
            }
            let key = (self.effective_z(id), node.paint_order);
            if best.map_or(true, |(z, order, _)| key > (z, order)) {
                best = Some((key.0, key.1, id));
            }
        }
        best.map(|(_, _, id)| id)
    }

    fn collect_text(&self, id: NodeId, out: &mut Vec<String>) {
        let Some(node) = self.get(id) else {
            return;
        };
        match node.kind {
            NodeKind::Text => {
                if let Some(text) = &node.text {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() && !node.rect.is_empty() {
                        out.push(trimmed.to_string());
                    }
                }
            }
            _ => {
                for child in &node.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match node.kind {
            NodeKind::Text => out.push_str(node.text.as_deref().unwrap_or_default()),
            NodeKind::Element => {
                let tag = node.tag.as_deref().unwrap_or("div");
                out.push('<');
                out.push_str(tag);
                for (key, value) in &node.attrs {
                    out.push_str(&format!(" {}=\"{}\"", key, value.replace('"', "&quot;")));
                }
                out.push('>');
                if VOID_TAGS.contains(&tag) {
                    return;
                }
                for child in &node.children {
                    self.write_html(*child, out);
                }
                out.push_str(&format!("</{}>", tag));
            }
            _ => {
                for child in &node.children {
                    self.write_html(*child, out);
                }
            }
        }
    }
}

impl SelectorTree for Page {
    fn is_element(&self, node: NodeId) -> bool {
        self.get(node).map_or(false, |n| n.kind == NodeKind::Element)
    }

    fn tag(&self, node: NodeId) -> Option<String> {
        self.get(node).and_then(|n| n.tag.clone())
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.get(node).and_then(|n| n.attr(name).map(str::to_string))
    }

    fn tree_parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|n| n.parent)
    }

    fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.get(node)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|child| self.is_element(*child))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A document held entirely in memory.
pub struct MemoryDocument {
    page: RwLock<Page>,
    history: Mutex<Vec<PageFixture>>,
    routes: RwLock<HashMap<String, PageFixture>>,
    events: Mutex<Vec<RecordedEvent>>,
    pointer: Mutex<Option<(f64, f64)>>,
    next_base: AtomicU32,
    pending_ready: AtomicU32,
}

impl MemoryDocument {
    pub fn from_fixture(fixture: PageFixture) -> Self {
        let mut routes = HashMap::new();
        collect_routes(&fixture, &mut routes);
        let settles_after = fixture.settles_after;
        let page = Page::build(fixture, 1);
        let next_base = page.base + page.nodes.len() as u32 + 1;
        Self {
            page: RwLock::new(page),
            history: Mutex::new(Vec::new()),
            routes: RwLock::new(routes),
            events: Mutex::new(Vec::new()),
            pointer: Mutex::new(None),
            next_base: AtomicU32::new(next_base),
            pending_ready: AtomicU32::new(settles_after),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, DomError> {
        Ok(Self::from_fixture(PageFixture::from_json(raw)?))
    }

    pub fn shared(fixture: PageFixture) -> Arc<Self> {
        Arc::new(Self::from_fixture(fixture))
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    pub fn count_events(&self, node: NodeId, kind: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.node == node && e.event.kind == kind)
            .count()
    }

    pub fn events_of_kind(&self, kind: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event.kind == kind)
            .count()
    }

    pub fn pointer(&self) -> Option<(f64, f64)> {
        *self.pointer.lock()
    }

    /// First element of the top-level tree matching `selector`.
    pub fn find(&self, selector: &str) -> Option<NodeId> {
        let page = self.page.read();
        let parsed = Selector::parse(selector).ok()?;
        selector::query_first(&*page, page.document, &parsed)
    }

    /// First element inside the shadow tree of `host` matching `selector`.
    pub fn find_in_shadow(&self, host: NodeId, selector: &str) -> Option<NodeId> {
        let page = self.page.read();
        let root = page.get(host)?.shadow_root?;
        let parsed = Selector::parse(selector).ok()?;
        selector::query_first(&*page, root, &parsed)
    }

    pub fn frame_of(&self, host: NodeId) -> Option<Arc<MemoryDocument>> {
        let page = self.page.read();
        match page.get(host)?.frame.as_ref()? {
            FrameSlot::Loaded(doc) => Some(doc.clone()),
            _ => None,
        }
    }

    /// Replace an attribute on a node; used to simulate page-side mutations.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let mut page = self.page.write();
        let target = page.get_mut(node).ok_or(DomError::Detached(node))?;
        match target.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => target.attrs.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn record(&self, node: NodeId, event: DomEvent) {
        self.events.lock().push(RecordedEvent { node, event });
    }

    fn load(&self, fixture: PageFixture, push_history: bool) {
        {
            let mut routes = self.routes.write();
            let mut discovered = HashMap::new();
            collect_routes(&fixture, &mut discovered);
            for (url, page) in discovered {
                routes.entry(url).or_insert(page);
            }
        }
        self.pending_ready
            .store(fixture.settles_after, Ordering::SeqCst);
        let base = self.next_base.load(Ordering::SeqCst);
        let page = Page::build(fixture, base);
        self.next_base
            .store(base + page.nodes.len() as u32 + 1, Ordering::SeqCst);
        let mut current = self.page.write();
        if push_history {
            self.history.lock().push(current.source.clone());
        }
        debug!(url = %page.url, nodes = page.nodes.len(), "memory document loaded page");
        *current = page;
        *self.pointer.lock() = None;
    }

    fn resolve_url(&self, raw: &str) -> Result<String, DomError> {
        let current = self.page.read().url.clone();
        let resolved = match Url::parse(raw) {
            Ok(url) => url,
            Err(_) => Url::parse(&current)
                .and_then(|base| base.join(raw))
                .map_err(|err| DomError::Navigation(format!("invalid url '{raw}': {err}")))?,
        };
        Ok(resolved.to_string())
    }
}

fn collect_routes(fixture: &PageFixture, into: &mut HashMap<String, PageFixture>) {
    for (url, page) in &fixture.routes {
        let key = Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.clone());
        let mut page = page.clone();
        if page.url == "about:blank" {
            page.url = key.clone();
        }
        collect_routes(&page, into);
        into.entry(key).or_insert(page);
    }
}

#[async_trait]
impl LiveDocument for MemoryDocument {
    fn url(&self) -> String {
        self.page.read().url.clone()
    }

    fn title(&self) -> String {
        self.page.read().title.clone()
    }

    fn document_node(&self) -> NodeId {
        self.page.read().document
    }

    fn body(&self) -> Option<NodeId> {
        Some(self.page.read().body)
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.page.read().get(node).map(|n| n.kind)
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.page.read().get(node).and_then(|n| n.tag.clone())
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.page
            .read()
            .get(node)
            .map(|n| n.attrs.clone())
            .unwrap_or_default()
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.page
            .read()
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.page.read().get(node).and_then(|n| n.parent)
    }

    fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.page.read().get(host).and_then(|n| n.shadow_root)
    }

    fn shadow_host(&self, root: NodeId) -> Option<NodeId> {
        self.page.read().get(root).and_then(|n| n.host)
    }

    fn text(&self, node: NodeId) -> Option<String> {
        self.page.read().get(node).and_then(|n| n.text.clone())
    }

    fn bounding_box(&self, node: NodeId) -> Option<Rect> {
        self.page.read().client_rect(node)
    }

    fn computed_style(&self, node: NodeId) -> ComputedStyle {
        let page = self.page.read();
        let Some(target) = page.get(node) else {
            return ComputedStyle::default();
        };
        ComputedStyle {
            display: target.display.clone().unwrap_or_else(|| "block".to_string()),
            visibility: page.effective_visibility(node),
            opacity: target.opacity.unwrap_or(1.0),
        }
    }

    fn viewport(&self) -> Viewport {
        self.page.read().viewport
    }

    fn element_from_point(&self, context: NodeId, x: f64, y: f64) -> Option<NodeId> {
        self.page.read().hit_test(context, x, y)
    }

    fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        let parsed = Selector::parse(selector)?;
        let page = self.page.read();
        if page.get(scope).is_none() {
            return Err(DomError::Detached(scope));
        }
        Ok(selector::query_first(&*page, scope, &parsed))
    }

    fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let parsed = Selector::parse(selector)?;
        let page = self.page.read();
        if page.get(scope).is_none() {
            return Err(DomError::Detached(scope));
        }
        Ok(selector::query_all(&*page, scope, &parsed))
    }

    async fn frame_document(&self, host: NodeId) -> FrameAccess {
        let access = {
            let page = self.page.read();
            match page.get(host).and_then(|n| n.frame.as_ref()) {
                Some(FrameSlot::Loaded(doc)) => FrameAccess::Ready(doc.clone() as Arc<dyn LiveDocument>),
                Some(FrameSlot::CrossOrigin) => FrameAccess::CrossOrigin,
                Some(FrameSlot::Unavailable(reason)) => FrameAccess::Unavailable(reason.clone()),
                None => FrameAccess::Unavailable(format!("node {host} is not a frame host")),
            }
        };
        tokio::task::yield_now().await;
        access
    }

    fn resource_complete(&self, node: NodeId) -> bool {
        let frame = {
            let page = self.page.read();
            let Some(target) = page.get(node) else {
                return true;
            };
            if !target.complete {
                return false;
            }
            match &target.frame {
                Some(FrameSlot::Loaded(doc)) => Some(doc.clone()),
                _ => None,
            }
        };
        frame.map_or(true, |doc| doc.page.read().ready_state == ReadyState::Complete)
    }

    fn ready_state(&self) -> ReadyState {
        let pending = self
            .pending_ready
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            return ReadyState::Loading;
        }
        self.page.read().ready_state
    }

    fn active_element(&self) -> Option<NodeId> {
        let page = self.page.read();
        page.active.filter(|id| page.get(*id).is_some())
    }

    fn focus(&self, node: NodeId) -> Result<(), DomError> {
        let mut page = self.page.write();
        page.element(node)?;
        page.active = Some(node);
        Ok(())
    }

    fn click(&self, node: NodeId) -> Result<(), DomError> {
        let follow = {
            let mut page = self.page.write();
            let target = page.element(node)?;
            if target.attr("disabled").is_some() {
                return Err(DomError::NotInteractable {
                    node,
                    reason: "element is disabled".to_string(),
                });
            }
            let tag = target.tag.clone().unwrap_or_default();
            let input_type = target.attr("type").map(str::to_ascii_lowercase);
            let href = target.attr("href").map(str::to_string);
            if tag == "input" && matches!(input_type.as_deref(), Some("checkbox") | Some("radio")) {
                if let Some(target) = page.get_mut(node) {
                    match target.attrs.iter().position(|(k, _)| k == "checked") {
                        Some(pos) => {
                            target.attrs.remove(pos);
                        }
                        None => target.attrs.push(("checked".to_string(), String::new())),
                    }
                }
            }
            if tag == "a" {
                href
            } else {
                None
            }
        };
        self.record(node, DomEvent::new("click"));
        if let Some(href) = follow {
            let url = self.resolve_url(&href)?;
            let route = self.routes.read().get(&url).cloned();
            if let Some(route) = route {
                self.load(route, true);
            }
        }
        Ok(())
    }

    fn dispatch_event(&self, node: NodeId, event: DomEvent) -> Result<(), DomError> {
        self.page.read().element(node)?;
        self.record(node, event);
        Ok(())
    }

    fn value(&self, node: NodeId) -> Option<String> {
        self.page.read().get(node).and_then(|n| n.value.clone())
    }

    fn set_value(&self, node: NodeId, value: &str) -> Result<(), DomError> {
        let mut page = self.page.write();
        page.element(node)?;
        if let Some(target) = page.get_mut(node) {
            target.value = Some(value.to_string());
        }
        Ok(())
    }

    fn scroll_into_view(&self, node: NodeId) -> Result<(), DomError> {
        let mut page = self.page.write();
        let rect = page.element(node)?.rect;
        let viewport = page.viewport;
        let top = viewport.scroll_y;
        let bottom = top + viewport.height;
        if rect.y < top || rect.y + rect.height > bottom {
            page.viewport.scroll_y = (rect.y - (viewport.height - rect.height).max(0.0) / 2.0).max(0.0);
        }
        Ok(())
    }

    fn scroll_by(&self, dx: f64, dy: f64) {
        let mut page = self.page.write();
        let max_y = page
            .get(page.body)
            .map(|b| (b.rect.height - page.viewport.height).max(0.0))
            .unwrap_or(0.0);
        page.viewport.scroll_x = (page.viewport.scroll_x + dx).max(0.0);
        page.viewport.scroll_y = (page.viewport.scroll_y + dy).clamp(0.0, max_y);
    }

    fn navigate(&self, url: &str) -> Result<(), DomError> {
        let url = self.resolve_url(url)?;
        let route = self.routes.read().get(&url).cloned();
        let fixture = route.unwrap_or_else(|| PageFixture::new(url.clone()));
        self.load(fixture, true);
        Ok(())
    }

    fn history_back(&self) -> Result<bool, DomError> {
        let previous = self.history.lock().pop();
        match previous {
            Some(fixture) => {
                self.load(fixture, false);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn inner_text(&self, node: NodeId) -> String {
        let page = self.page.read();
        let mut parts = Vec::new();
        page.collect_text(node, &mut parts);
        parts.join("\n")
    }

    fn inner_html(&self, node: NodeId) -> String {
        let page = self.page.read();
        let mut out = String::new();
        if let Some(target) = page.get(node) {
            for child in &target.children {
                page.write_html(*child, &mut out);
            }
        }
        out
    }

    fn move_pointer(&self, x: f64, y: f64) {
        *self.pointer.lock() = Some((x, y));
    }

    fn set_highlight(&self, node: NodeId, on: bool) {
        let mut page = self.page.write();
        if let Some(target) = page.get_mut(node) {
            target.attrs.retain(|(key, _)| key != HIGHLIGHT_ATTR);
            if on {
                target.attrs.push((HIGHLIGHT_ATTR.to_string(), "true".to_string()));
            }
        }
    }

    fn clear_overlays(&self) {
        *self.pointer.lock() = None;
        let mut page = self.page.write();
        for node in page.nodes.iter_mut() {
            node.attrs.retain(|(key, _)| key != HIGHLIGHT_ATTR);
        }
    }

    fn capture_viewport(&self) -> Vec<u8> {
        let page = self.page.read();
        format!(
            "capture url={} scroll={},{} size={}x{} nodes={}",
            page.url,
            page.viewport.scroll_x,
            page.viewport.scroll_y,
            page.viewport.width,
            page.viewport.height,
            page.nodes.len()
        )
        .into_bytes()
    }
}
