use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tabpilot_core_types::CycleId;

use crate::errors::PerceiverError;
use crate::model::{DomSnapshot, SnapshotId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub index: usize,
    pub node: SnapshotId,
}

/// Indices assigned during one perception cycle. Valid only for that cycle.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IndexMap {
    pub cycle: CycleId,
    entries: Vec<IndexEntry>,
    #[serde(skip)]
    by_node: BTreeMap<SnapshotId, usize>,
}

impl IndexMap {
    pub fn get(&self, index: usize) -> Option<SnapshotId> {
        self.entries.get(index).map(|entry| entry.node)
    }

    pub fn resolve(&self, index: usize) -> Result<SnapshotId, PerceiverError> {
        self.get(index).ok_or_else(|| PerceiverError::UnknownIndex {
            index,
            cycle: self.cycle.to_string(),
        })
    }

    pub fn index_of(&self, node: SnapshotId) -> Option<usize> {
        self.by_node.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }
}

/// Assigns consecutive indices, starting at zero, to every indexable node in
/// depth-first order.
#[derive(Debug, Default)]
pub struct ElementIndexer {
    next: usize,
}

impl ElementIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, snapshot: &DomSnapshot, cycle: CycleId) -> IndexMap {
        self.next = 0;
        let mut map = IndexMap {
            cycle,
            ..IndexMap::default()
        };
        for id in snapshot.depth_first() {
            let Some(node) = snapshot.get(id) else {
                continue;
            };
            if !node.is_indexable() {
                continue;
            }
            let index = self.next;
            self.next += 1;
            map.entries.push(IndexEntry { index, node: id });
            map.by_node.insert(id, index);
        }
        map
    }
}
