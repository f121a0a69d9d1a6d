use serde::{Deserialize, Serialize};
use tabpilot_core_types::TabId;
use tokio::sync::broadcast;

/// Bridge event bus.
pub type BridgeEventBus = broadcast::Sender<BridgeEvent>;

/// Events emitted by the bridge to observers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    TabOpened {
        tab: TabId,
        url: String,
    },
    TabClosed {
        tab: TabId,
    },
    RequestOk {
        tab: TabId,
        request: String,
    },
    RequestFailed {
        tab: TabId,
        request: String,
        error: String,
    },
    RequestRetried {
        tab: TabId,
        request: String,
        attempt: u32,
    },
}
