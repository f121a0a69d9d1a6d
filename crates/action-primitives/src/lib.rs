//! Action primitives for tabpilot
//!
//! Two halves of the action layer:
//! - in-page primitives (activate, set_value, navigate, scroll, send_keys,
//!   extract) that act on a [`dom_adapter::LiveDocument`]
//! - the [`BatchExecutor`], which drives a batch of agent actions through a
//!   [`PageChannel`] and waits for the page to settle between them

pub mod errors;
mod executor;
mod primitives;
pub mod protocol;
pub mod types;
mod waiting;

pub use errors::*;
pub use executor::*;
pub use primitives::*;
pub use protocol::*;
pub use types::*;
pub use waiting::*;
