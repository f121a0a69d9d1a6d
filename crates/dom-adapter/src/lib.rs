//! Live-document port for tabpilot.
//!
//! The perceiver, the locator and the action primitives only ever talk to a
//! page through [`LiveDocument`]. [`MemoryDocument`] is the in-memory
//! implementation that fixtures and tests run against.

pub mod errors;
pub mod memory;
pub mod port;
pub mod selector;
pub mod types;

pub use errors::DomError;
pub use memory::{el, ElementFixture, MemoryDocument, NodeFixture, PageFixture, RecordedEvent};
pub use port::LiveDocument;
pub use selector::{escape_attr_name, escape_attr_value, Selector};
pub use types::{
    ComputedStyle, DomEvent, ElementHandle, FrameAccess, NodeId, NodeKind, ReadyState, Rect,
    Viewport,
};
