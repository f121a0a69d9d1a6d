//! Actor-per-tab: a task that owns one [`PageAgent`] and serializes requests to it.

use std::sync::Arc;

use action_primitives::{ActionError, PageChannel, PageRequest, PageResponse};
use async_trait::async_trait;
use tabpilot_core_types::TabId;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::agent::PageAgent;
use crate::config::BridgeConfig;
use crate::errors::BridgeError;
use crate::events::{BridgeEvent, BridgeEventBus};

pub(crate) struct Envelope {
    request: PageRequest,
    reply: oneshot::Sender<PageResponse>,
}

pub(crate) struct TabActor {
    agent: PageAgent,
    inbox: mpsc::Receiver<Envelope>,
}

impl TabActor {
    pub(crate) fn new(agent: PageAgent, inbox: mpsc::Receiver<Envelope>) -> Self {
        Self { agent, inbox }
    }

    /// Runs until every handle to the tab is dropped.
    pub(crate) async fn run(mut self) {
        while let Some(Envelope { request, reply }) = self.inbox.recv().await {
            let response = self.agent.handle(request).await;
            if reply.send(response).is_err() {
                debug!(tab = %self.agent.tab(), "requester went away before the reply");
            }
        }
        debug!(tab = %self.agent.tab(), "tab actor stopped");
    }
}

/// Sending side of one tab.
#[derive(Clone)]
pub struct TabHandle {
    tab: TabId,
    sender: mpsc::Sender<Envelope>,
    config: Arc<BridgeConfig>,
    events: BridgeEventBus,
}

impl TabHandle {
    pub(crate) fn new(
        tab: TabId,
        sender: mpsc::Sender<Envelope>,
        config: Arc<BridgeConfig>,
        events: BridgeEventBus,
    ) -> Self {
        Self {
            tab,
            sender,
            config,
            events,
        }
    }

    pub fn tab(&self) -> &TabId {
        &self.tab
    }

    /// Deliver `request` with a deadline.
    ///
    /// Idempotent requests are retried on timeout with a fixed backoff;
    /// anything else gets a single attempt.
    pub async fn request(&self, request: PageRequest) -> Result<PageResponse, BridgeError> {
        let name = request.name();
        let attempts = if request.is_idempotent() {
            self.config.attempts.max(1)
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            match self.deliver(request.clone()).await {
                Ok(response) => {
                    let event = match &response {
                        PageResponse::Failed { error, .. } => BridgeEvent::RequestFailed {
                            tab: self.tab.clone(),
                            request: name.to_string(),
                            error: error.clone(),
                        },
                        _ => BridgeEvent::RequestOk {
                            tab: self.tab.clone(),
                            request: name.to_string(),
                        },
                    };
                    let _ = self.events.send(event);
                    return Ok(response);
                }
                Err(None) if attempt < attempts => {
                    warn!(tab = %self.tab, request = name, attempt, "page request timed out; retrying");
                    let _ = self.events.send(BridgeEvent::RequestRetried {
                        tab: self.tab.clone(),
                        request: name.to_string(),
                        attempt,
                    });
                    sleep(self.config.retry_backoff()).await;
                    attempt += 1;
                }
                Err(failure) => {
                    let err = failure.unwrap_or_else(|| BridgeError::Timeout {
                        request: name.to_string(),
                        attempts: attempt,
                    });
                    let _ = self.events.send(BridgeEvent::RequestFailed {
                        tab: self.tab.clone(),
                        request: name.to_string(),
                        error: err.to_string(),
                    });
                    return Err(err);
                }
            }
        }
    }

    /// One attempt. `Err(None)` means the deadline passed.
    async fn deliver(&self, request: PageRequest) -> Result<PageResponse, Option<BridgeError>> {
        let deadline = self.config.request_timeout();
        let (reply, response) = oneshot::channel();
        let envelope = Envelope { request, reply };

        match timeout(deadline, self.sender.send(envelope)).await {
            Err(_) => return Err(None),
            Ok(Err(_)) => return Err(Some(BridgeError::ChannelClosed)),
            Ok(Ok(())) => {}
        }
        match timeout(deadline, response).await {
            Err(_) => Err(None),
            Ok(Err(_)) => Err(Some(BridgeError::ChannelClosed)),
            Ok(Ok(response)) => Ok(response),
        }
    }
}

#[async_trait]
impl PageChannel for TabHandle {
    async fn send(&self, request: PageRequest) -> Result<PageResponse, ActionError> {
        Ok(self.request(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast;

    fn stalled_handle(attempts: u32) -> (TabHandle, mpsc::Receiver<Envelope>, broadcast::Receiver<BridgeEvent>) {
        let (sender, inbox) = mpsc::channel(8);
        let (events, observer) = broadcast::channel(16);
        let config = BridgeConfig {
            request_timeout_ms: 20,
            attempts,
            retry_backoff_ms: 5,
            mailbox_capacity: 8,
        };
        let handle = TabHandle::new(TabId::new(), sender, Arc::new(config), events);
        (handle, inbox, observer)
    }

    #[tokio::test]
    async fn idempotent_requests_retry_until_timeout() {
        let (handle, _inbox, mut observer) = stalled_handle(3);

        let err = handle.request(PageRequest::CheckReadiness).await.unwrap_err();
        assert_eq!(
            err,
            BridgeError::Timeout {
                request: "check_readiness".into(),
                attempts: 3
            }
        );

        let mut retried = 0;
        while let Ok(event) = observer.try_recv() {
            if matches!(event, BridgeEvent::RequestRetried { .. }) {
                retried += 1;
            }
        }
        assert_eq!(retried, 2);
    }

    #[tokio::test]
    async fn actions_are_not_resent() {
        let (handle, mut inbox, _observer) = stalled_handle(3);

        let err = handle.request(PageRequest::NavigateBack).await.unwrap_err();
        assert!(matches!(err, BridgeError::Timeout { attempts: 1, .. }));
        assert!(inbox.try_recv().is_ok());
        assert!(inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_actor_closes_the_channel() {
        let (handle, inbox, _observer) = stalled_handle(3);
        drop(inbox);

        let err = handle.send(PageRequest::CheckReadiness).await.unwrap_err();
        assert_eq!(err, ActionError::Channel("channel closed".into()));
    }
}
