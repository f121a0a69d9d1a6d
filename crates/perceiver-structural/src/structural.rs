use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dom_adapter::LiveDocument;
use parking_lot::Mutex;
use tabpilot_core_types::CycleId;

use crate::api::{Perception, StructuralPerceiver};
use crate::errors::PerceiverError;
use crate::events;
use crate::indexer::ElementIndexer;
use crate::model::DomSnapshot;
use crate::serialize;
use crate::snapshot::{SnapshotBuilder, SnapshotOptions};

pub struct StructuralPerceiverImpl {
    builder: SnapshotBuilder,
    indexer: Mutex<ElementIndexer>,
}

impl StructuralPerceiverImpl {
    pub fn new(options: SnapshotOptions) -> Self {
        Self {
            builder: SnapshotBuilder::new(options),
            indexer: Mutex::new(ElementIndexer::new()),
        }
    }
}

impl Default for StructuralPerceiverImpl {
    fn default() -> Self {
        Self::new(SnapshotOptions::default())
    }
}

#[async_trait]
impl StructuralPerceiver for StructuralPerceiverImpl {
    async fn perceive(
        &self,
        doc: Arc<dyn LiveDocument>,
        cycle: CycleId,
    ) -> Result<Perception, PerceiverError> {
        let snapshot = self.snapshot(doc).await?;
        let index = self.indexer.lock().assign(&snapshot, cycle);
        events::emit_index(&snapshot.url, cycle, index.len());
        let element_list = serialize::element_list(&snapshot, &index);
        Ok(Perception {
            snapshot,
            index,
            element_list,
        })
    }

    async fn snapshot(&self, doc: Arc<dyn LiveDocument>) -> Result<DomSnapshot, PerceiverError> {
        let started = Instant::now();
        let snapshot = self.builder.build(doc).await?;
        events::emit_snapshot(&snapshot.url, snapshot.len(), started.elapsed());
        Ok(snapshot)
    }
}
