use std::sync::Arc;

use async_trait::async_trait;
use dom_adapter::LiveDocument;
use serde::{Deserialize, Serialize};
use tabpilot_core_types::CycleId;

use crate::errors::PerceiverError;
use crate::indexer::IndexMap;
use crate::model::{DocumentNode, DomSnapshot};

/// Output of one perception cycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Perception {
    pub snapshot: DomSnapshot,
    pub index: IndexMap,
    pub element_list: String,
}

impl Perception {
    pub fn cycle(&self) -> CycleId {
        self.index.cycle
    }

    /// Snapshot node behind a highlight index of this cycle.
    pub fn entry(&self, index: usize) -> Result<&DocumentNode, PerceiverError> {
        let id = self.index.resolve(index)?;
        self.snapshot
            .get(id)
            .ok_or_else(|| PerceiverError::internal(format!("index {index} points outside the snapshot")))
    }
}

#[async_trait]
pub trait StructuralPerceiver: Send + Sync {
    /// Builds the snapshot, assigns indices and renders the element list.
    async fn perceive(
        &self,
        doc: Arc<dyn LiveDocument>,
        cycle: CycleId,
    ) -> Result<Perception, PerceiverError>;

    async fn snapshot(&self, doc: Arc<dyn LiveDocument>) -> Result<DomSnapshot, PerceiverError>;
}
