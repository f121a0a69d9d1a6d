//! Snapshot builder: one traversal of a live document per cycle.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_recursion::async_recursion;
use dom_adapter::{FrameAccess, LiveDocument, NodeId, NodeKind};
use tracing::{debug, warn};

use crate::errors::PerceiverError;
use crate::judges;
use crate::model::{
    Boundary, DocumentNode, DomSnapshot, EmbeddedContent, PathSegment, SnapshotId, SnapshotKind,
};

#[derive(Clone, Debug)]
pub struct SnapshotOptions {
    /// Nodes deeper than this are not visited.
    pub max_depth: usize,
    /// Text excerpts are cut to this many characters.
    pub max_text_length: usize,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_text_length: 200,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SnapshotBuilder {
    options: SnapshotOptions,
}

/// Where a visit happens: the document being read and its hit-testing context.
#[derive(Clone)]
struct Scope {
    doc: Arc<dyn LiveDocument>,
    context: NodeId,
}

struct Arena {
    nodes: Vec<DocumentNode>,
}

impl Arena {
    fn push(&mut self, mut node: DocumentNode) -> SnapshotId {
        let id = SnapshotId(self.nodes.len() as u32);
        node.id = id;
        self.nodes.push(node);
        id
    }

    fn node_mut(&mut self, id: SnapshotId) -> Option<&mut DocumentNode> {
        self.nodes.get_mut(id.0 as usize)
    }
}

impl SnapshotBuilder {
    pub fn new(options: SnapshotOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SnapshotOptions {
        &self.options
    }

    pub async fn build(&self, doc: Arc<dyn LiveDocument>) -> Result<DomSnapshot, PerceiverError> {
        let url = doc.url();
        let document = doc.document_node();
        let html = first_element(doc.as_ref(), document)
            .ok_or_else(|| PerceiverError::EmptyDocument(url.clone()))?;
        let scope = Scope {
            doc: doc.clone(),
            context: document,
        };
        let mut arena = Arena { nodes: Vec::new() };
        let root_path = vec![PathSegment {
            tag: doc.tag_name(html).unwrap_or_else(|| "html".to_string()),
            sibling_index: 1,
        }];
        let root = self
            .visit(&mut arena, &scope, html, None, root_path, 0)
            .await
            .ok_or_else(|| PerceiverError::EmptyDocument(url.clone()))?;
        debug!(url = %url, nodes = arena.nodes.len(), "snapshot built");
        Ok(DomSnapshot {
            url,
            root,
            nodes: arena.nodes,
        })
    }

    #[async_recursion]
    async fn visit(
        &self,
        arena: &mut Arena,
        scope: &Scope,
        node: NodeId,
        parent: Option<SnapshotId>,
        path: Vec<PathSegment>,
        depth: usize,
    ) -> Option<SnapshotId> {
        if depth > self.options.max_depth {
            return None;
        }
        let doc = scope.doc.as_ref();
        match doc.kind(node)? {
            NodeKind::Text => self.visit_text(arena, doc, node, parent),
            NodeKind::Element => {
                let tag = doc.tag_name(node)?;
                if judges::SKIPPED_TAGS.contains(&tag.as_str()) {
                    return None;
                }
                let attributes: BTreeMap<String, String> = doc.attributes(node).into_iter().collect();
                let is_visible = judges::visible(doc, node).ok;
                let mut is_interactive = judges::interactive(&tag, &attributes).ok;
                let is_topmost = is_visible && judges::topmost(doc, node, scope.context).ok;
                let is_frame = matches!(tag.as_str(), "iframe" | "frame");
                if is_frame {
                    is_interactive = false;
                }
                let id = arena.push(DocumentNode {
                    id: SnapshotId(0),
                    kind: SnapshotKind::Element,
                    tag_name: Some(tag),
                    attributes,
                    structural_path: path.clone(),
                    text_excerpt: None,
                    is_visible,
                    is_interactive,
                    is_topmost,
                    children: Vec::new(),
                    parent,
                    boundary: Boundary::Plain,
                    dom_id: node,
                });

                if is_frame {
                    let boundary = self.visit_frame(arena, scope, node, id, depth).await;
                    if let Some(entry) = arena.node_mut(id) {
                        entry.boundary = boundary;
                    }
                    return Some(id);
                }

                if let Some(shadow) = doc.shadow_root(node) {
                    let root = arena.push(DocumentNode {
                        id: SnapshotId(0),
                        kind: SnapshotKind::IsolationRoot,
                        tag_name: None,
                        attributes: BTreeMap::new(),
                        structural_path: Vec::new(),
                        text_excerpt: None,
                        is_visible: false,
                        is_interactive: false,
                        is_topmost: false,
                        children: Vec::new(),
                        parent: Some(id),
                        boundary: Boundary::Plain,
                        dom_id: shadow,
                    });
                    let inner = Scope {
                        doc: scope.doc.clone(),
                        context: shadow,
                    };
                    let children = self
                        .visit_children(arena, &inner, shadow, root, Vec::new(), depth + 1)
                        .await;
                    if let Some(entry) = arena.node_mut(root) {
                        entry.children = children;
                    }
                    if let Some(entry) = arena.node_mut(id) {
                        entry.boundary = Boundary::IsolationRoot { root };
                    }
                }

                let children = self
                    .visit_children(arena, scope, node, id, path, depth + 1)
                    .await;
                if let Some(entry) = arena.node_mut(id) {
                    entry.children = children;
                }
                Some(id)
            }
            _ => None,
        }
    }

    async fn visit_children(
        &self,
        arena: &mut Arena,
        scope: &Scope,
        node: NodeId,
        owner: SnapshotId,
        path: Vec<PathSegment>,
        depth: usize,
    ) -> Vec<SnapshotId> {
        let doc = scope.doc.as_ref();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut children = Vec::new();
        for child in doc.children(node) {
            let mut child_path = path.clone();
            if let Some(tag) = doc.tag_name(child) {
                let count = seen.entry(tag.clone()).or_insert(0);
                *count += 1;
                child_path.push(PathSegment {
                    tag,
                    sibling_index: *count,
                });
            }
            if let Some(id) = self
                .visit(arena, scope, child, Some(owner), child_path, depth)
                .await
            {
                children.push(id);
            }
        }
        children
    }

    async fn visit_frame(
        &self,
        arena: &mut Arena,
        scope: &Scope,
        host: NodeId,
        host_id: SnapshotId,
        depth: usize,
    ) -> Boundary {
        match scope.doc.frame_document(host).await {
            FrameAccess::Ready(inner) => {
                let Some(html) = first_element(inner.as_ref(), inner.document_node()) else {
                    return Boundary::EmbeddedDocument {
                        content: EmbeddedContent::Unavailable {
                            reason: "embedded document is empty".to_string(),
                        },
                    };
                };
                let inner_scope = Scope {
                    context: inner.document_node(),
                    doc: inner.clone(),
                };
                let path = vec![PathSegment {
                    tag: inner.tag_name(html).unwrap_or_else(|| "html".to_string()),
                    sibling_index: 1,
                }];
                match self
                    .visit(arena, &inner_scope, html, Some(host_id), path, depth + 1)
                    .await
                {
                    Some(root) => Boundary::EmbeddedDocument {
                        content: EmbeddedContent::Loaded { root },
                    },
                    None => Boundary::EmbeddedDocument {
                        content: EmbeddedContent::Unavailable {
                            reason: "embedded document produced no nodes".to_string(),
                        },
                    },
                }
            }
            FrameAccess::CrossOrigin => {
                warn!(host = %host, url = %scope.doc.url(), "cross-origin frame left opaque");
                Boundary::EmbeddedDocument {
                    content: EmbeddedContent::CrossOrigin,
                }
            }
            FrameAccess::Unavailable(reason) => {
                warn!(host = %host, reason = %reason, "embedded document is not accessible");
                Boundary::EmbeddedDocument {
                    content: EmbeddedContent::Unavailable { reason },
                }
            }
        }
    }

    fn visit_text(
        &self,
        arena: &mut Arena,
        doc: &dyn LiveDocument,
        node: NodeId,
        parent: Option<SnapshotId>,
    ) -> Option<SnapshotId> {
        let raw = doc.text(node)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() || !judges::text_visible(doc, node, &doc.viewport()) {
            return None;
        }
        let excerpt: String = trimmed.chars().take(self.options.max_text_length).collect();
        Some(arena.push(DocumentNode {
            id: SnapshotId(0),
            kind: SnapshotKind::Text,
            tag_name: None,
            attributes: BTreeMap::new(),
            structural_path: Vec::new(),
            text_excerpt: Some(excerpt),
            is_visible: true,
            is_interactive: false,
            is_topmost: false,
            children: Vec::new(),
            parent,
            boundary: Boundary::Plain,
            dom_id: node,
        }))
    }
}

fn first_element(doc: &dyn LiveDocument, node: NodeId) -> Option<NodeId> {
    doc.children(node)
        .into_iter()
        .find(|child| doc.kind(*child) == Some(NodeKind::Element))
}
