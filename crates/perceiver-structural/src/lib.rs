//! Structural perception: snapshot, interactive-element index and element list.

pub mod api;
pub mod errors;
pub mod events;
pub mod indexer;
pub mod judges;
pub mod model;
pub mod serialize;
pub mod snapshot;
pub mod structural;

pub use api::{Perception, StructuralPerceiver};
pub use errors::PerceiverError;
pub use indexer::{ElementIndexer, IndexEntry, IndexMap};
pub use model::{
    Boundary, DocumentNode, DomSnapshot, EmbeddedContent, JudgeReport, PathSegment, SnapshotId,
    SnapshotKind,
};
pub use serialize::element_list;
pub use snapshot::{SnapshotBuilder, SnapshotOptions};
pub use structural::StructuralPerceiverImpl;
