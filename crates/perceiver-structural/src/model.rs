use std::collections::BTreeMap;
use std::fmt;

use dom_adapter::NodeId;
use serde::{Deserialize, Serialize};

/// Index of a node inside one [`DomSnapshot`] arena.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotId(pub u32);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Element,
    Text,
    IsolationRoot,
}

/// One step of a structural path: tag plus 1-based position among same-tag siblings.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub tag: String,
    pub sibling_index: usize,
}

/// What a node owns beyond its plain children.
///
/// Traversal and locator share this one contract: a node either has no
/// nested tree, owns an encapsulated isolation root, or hosts an embedded
/// document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "boundary", rename_all = "snake_case")]
pub enum Boundary {
    Plain,
    IsolationRoot { root: SnapshotId },
    EmbeddedDocument { content: EmbeddedContent },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EmbeddedContent {
    Loaded { root: SnapshotId },
    /// Opaque placeholder; the frame forbids inspection.
    CrossOrigin,
    Unavailable { reason: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: SnapshotId,
    pub kind: SnapshotKind,
    pub tag_name: Option<String>,
    pub attributes: BTreeMap<String, String>,
    /// Path from the nearest boundary root (document or isolation root).
    pub structural_path: Vec<PathSegment>,
    pub text_excerpt: Option<String>,
    pub is_visible: bool,
    pub is_interactive: bool,
    pub is_topmost: bool,
    pub children: Vec<SnapshotId>,
    pub parent: Option<SnapshotId>,
    pub boundary: Boundary,
    /// Live node this entry was captured from, within its own document.
    pub dom_id: NodeId,
}

impl DocumentNode {
    /// The index invariant: only nodes passing all three judges get an index.
    pub fn is_indexable(&self) -> bool {
        self.kind == SnapshotKind::Element && self.is_visible && self.is_interactive && self.is_topmost
    }

    pub fn nested_root(&self) -> Option<SnapshotId> {
        match &self.boundary {
            Boundary::IsolationRoot { root } => Some(*root),
            _ => None,
        }
    }

    pub fn nested_document(&self) -> Option<SnapshotId> {
        match &self.boundary {
            Boundary::EmbeddedDocument {
                content: EmbeddedContent::Loaded { root },
            } => Some(*root),
            _ => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Arena of snapshot nodes produced by one traversal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomSnapshot {
    pub url: String,
    pub root: SnapshotId,
    pub nodes: Vec<DocumentNode>,
}

impl DomSnapshot {
    pub fn get(&self, id: SnapshotId) -> Option<&DocumentNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first order: node, its isolation root, its children, its embedded document.
    pub fn depth_first(&self) -> Vec<SnapshotId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            order.push(id);
            if let Some(doc) = node.nested_document() {
                stack.push(doc);
            }
            stack.extend(node.children.iter().rev().copied());
            if let Some(root) = node.nested_root() {
                stack.push(root);
            }
        }
        order
    }

    /// Host owning the isolation root that encloses `id`, within the same document.
    pub fn isolation_host(&self, id: SnapshotId) -> Option<SnapshotId> {
        let mut current = id;
        loop {
            let node = self.get(current)?;
            let parent_id = node.parent?;
            if node.kind == SnapshotKind::IsolationRoot {
                return Some(parent_id);
            }
            if self.is_embedded_root(current, parent_id) {
                return None;
            }
            current = parent_id;
        }
    }

    /// Frame host whose embedded document encloses `id`.
    pub fn frame_host(&self, id: SnapshotId) -> Option<SnapshotId> {
        let mut current = id;
        loop {
            let parent_id = self.get(current)?.parent?;
            if self.is_embedded_root(current, parent_id) {
                return Some(parent_id);
            }
            current = parent_id;
        }
    }

    /// True when `id` sits inside an isolation root or embedded document.
    pub fn is_nested(&self, id: SnapshotId) -> bool {
        self.isolation_host(id).is_some() || self.frame_host(id).is_some()
    }

    pub fn has_indexed_ancestor(&self, id: SnapshotId) -> bool {
        let mut current = self.get(id).and_then(|n| n.parent);
        while let Some(ancestor) = current {
            let Some(node) = self.get(ancestor) else {
                return false;
            };
            if node.is_indexable() {
                return true;
            }
            current = node.parent;
        }
        false
    }

    fn is_embedded_root(&self, child: SnapshotId, parent: SnapshotId) -> bool {
        self.get(parent)
            .and_then(|p| p.nested_document())
            .map_or(false, |root| root == child)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeReport {
    pub ok: bool,
    pub reason: String,
}
