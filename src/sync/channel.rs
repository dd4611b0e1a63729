//! Event channel adapter - one live push connection per viewed match
//!
//! The adapter owns reconnection: a lost feed schedules a new connect after
//! a fixed delay, forever, until the owning subscription aborts the task.
//! `Closed` is terminal and only ever set by an explicit unsubscribe.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::feed::FeedConnector;
use super::protocol::decode_delivery;
use super::reconciler::Reconciler;

/// Adapter connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Error,
    ReconnectWait,
    Closed,
}

/// Wraps one push connection scoped to a single match
pub struct ChannelAdapter {
    match_id: Uuid,
    connector: Arc<dyn FeedConnector>,
    reconciler: Arc<Reconciler>,
    reconnect_delay: Duration,
    state_tx: Arc<watch::Sender<ChannelState>>,
    /// Raw bytes of the previously forwarded payload, for replay dedup
    last_payload: Option<String>,
}

impl ChannelAdapter {
    pub fn new(
        match_id: Uuid,
        connector: Arc<dyn FeedConnector>,
        reconciler: Arc<Reconciler>,
        reconnect_delay: Duration,
    ) -> (
        Self,
        Arc<watch::Sender<ChannelState>>,
        watch::Receiver<ChannelState>,
    ) {
        let (state_tx, state_rx) = watch::channel(ChannelState::Connecting);
        let state_tx = Arc::new(state_tx);
        let adapter = Self {
            match_id,
            connector,
            reconciler,
            reconnect_delay,
            state_tx: Arc::clone(&state_tx),
            last_payload: None,
        };
        (adapter, state_tx, state_rx)
    }

    /// Connection loop. Runs until the owning subscription aborts the task.
    pub async fn run(mut self) {
        loop {
            self.set_state(ChannelState::Connecting);
            match self.connector.connect(self.match_id).await {
                Ok(mut feed) => {
                    self.set_state(ChannelState::Open);
                    info!(match_id = %self.match_id, "event channel open");
                    loop {
                        match feed.next_payload().await {
                            Some(Ok(raw)) => self.handle_payload(raw).await,
                            Some(Err(e)) => {
                                warn!(match_id = %self.match_id, error = %e, "event channel lost");
                                break;
                            }
                            None => {
                                warn!(match_id = %self.match_id, "event feed closed by server");
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(match_id = %self.match_id, error = %e, "event channel connect failed");
                }
            }
            self.set_state(ChannelState::Error);
            self.set_state(ChannelState::ReconnectWait);
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn handle_payload(&mut self, raw: String) {
        // The server may replay an unacknowledged batch after a hiccup;
        // a byte-identical repeat of the previous payload carries nothing.
        if self.last_payload.as_deref() == Some(raw.as_str()) {
            debug!(match_id = %self.match_id, "duplicate payload discarded");
            return;
        }
        match decode_delivery(&raw) {
            Ok(events) => {
                self.last_payload = Some(raw);
                for event in events {
                    self.reconciler.apply(event).await;
                }
            }
            Err(e) => {
                warn!(match_id = %self.match_id, error = %e, "undecodable event payload discarded");
            }
        }
    }

    fn set_state(&self, state: ChannelState) {
        let _ = self.state_tx.send(state);
    }
}
