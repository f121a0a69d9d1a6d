//! Page bridge for tabpilot.
//!
//! Every open tab gets an actor that owns its in-page agent and, with it, the
//! per-cycle index map. Callers talk to a tab through a [`TabHandle`], which
//! delivers [`action_primitives::PageRequest`]s with a deadline and retries
//! idempotent ones. The [`PageBridge`] registry tracks open tabs and
//! broadcasts [`BridgeEvent`]s.

mod actor;
pub mod agent;
mod bridge;
pub mod config;
pub mod errors;
pub mod events;

pub use actor::TabHandle;
pub use agent::PageAgent;
pub use bridge::PageBridge;
pub use config::BridgeConfig;
pub use errors::BridgeError;
pub use events::{BridgeEvent, BridgeEventBus};
