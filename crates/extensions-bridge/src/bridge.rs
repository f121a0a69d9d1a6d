//! Tab registry: one actor per open tab, addressed by [`TabId`].

use std::sync::Arc;

use action_primitives::{ExecutorSettings, PageRequest, PageResponse};
use dashmap::DashMap;
use dom_adapter::LiveDocument;
use tabpilot_core_types::TabId;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::actor::{TabActor, TabHandle};
use crate::agent::PageAgent;
use crate::config::BridgeConfig;
use crate::errors::BridgeError;
use crate::events::{BridgeEvent, BridgeEventBus};

pub struct PageBridge {
    events: BridgeEventBus,
    config: Arc<BridgeConfig>,
    settings: ExecutorSettings,
    tabs: DashMap<TabId, TabHandle>,
}

impl PageBridge {
    pub fn new(config: BridgeConfig, settings: ExecutorSettings) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            events,
            config: Arc::new(config),
            settings,
            tabs: DashMap::new(),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    /// Attach a live document as a new tab and start its actor.
    ///
    /// Must be called within a tokio runtime.
    pub fn open_tab(&self, doc: Arc<dyn LiveDocument>) -> TabHandle {
        let tab = TabId::new();
        let url = doc.url();
        let (sender, inbox) = mpsc::channel(self.config.mailbox_capacity.max(1));
        let agent = PageAgent::new(tab.clone(), doc, &self.settings);
        tokio::spawn(TabActor::new(agent, inbox).run());

        let handle = TabHandle::new(tab.clone(), sender, self.config.clone(), self.events.clone());
        self.tabs.insert(tab.clone(), handle.clone());
        info!(tab = %tab, url = %url, "tab opened");
        let _ = self.events.send(BridgeEvent::TabOpened { tab, url });
        handle
    }

    pub fn tab(&self, tab: &TabId) -> Result<TabHandle, BridgeError> {
        self.tabs
            .get(tab)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BridgeError::TabNotFound(tab.clone()))
    }

    pub fn tabs(&self) -> Vec<TabId> {
        self.tabs.iter().map(|entry| entry.key().clone()).collect()
    }

    pub async fn send(&self, tab: &TabId, request: PageRequest) -> Result<PageResponse, BridgeError> {
        self.tab(tab)?.request(request).await
    }

    /// Clean up the page and stop the tab's actor once outstanding handles drop.
    pub async fn close_tab(&self, tab: &TabId) -> Result<(), BridgeError> {
        let (_, handle) = self
            .tabs
            .remove(tab)
            .ok_or_else(|| BridgeError::TabNotFound(tab.clone()))?;
        if let Err(err) = handle.request(PageRequest::Cleanup).await {
            debug!(tab = %tab, %err, "cleanup on close failed");
        }
        info!(tab = %tab, "tab closed");
        let _ = self.events.send(BridgeEvent::TabClosed { tab: tab.clone() });
        Ok(())
    }
}
