//! Subscription manager - at most one live event channel per match

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::channel::{ChannelAdapter, ChannelState};
use super::feed::FeedConnector;
use super::reconciler::Reconciler;

/// One live subscription: the adapter task plus its state channel
struct Subscription {
    handle: JoinHandle<()>,
    state_tx: Arc<watch::Sender<ChannelState>>,
    state_rx: watch::Receiver<ChannelState>,
}

impl Subscription {
    fn is_live(&self) -> bool {
        !self.handle.is_finished() && *self.state_rx.borrow() != ChannelState::Closed
    }
}

/// Owns the set of open event channel adapters, keyed by match id
pub struct SubscriptionManager {
    connector: Arc<dyn FeedConnector>,
    reconciler: Arc<Reconciler>,
    reconnect_delay: Duration,
    subscriptions: DashMap<Uuid, Subscription>,
}

impl SubscriptionManager {
    pub fn new(
        connector: Arc<dyn FeedConnector>,
        reconciler: Arc<Reconciler>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            connector,
            reconciler,
            reconnect_delay,
            subscriptions: DashMap::new(),
        }
    }

    /// Ensure exactly one live adapter for this match. A no-op when a live
    /// adapter already exists; a terminal-failed one is replaced.
    ///
    /// Check and insert happen under the map entry lock so concurrent
    /// subscribes for the same id cannot both spawn an adapter.
    pub fn subscribe(&self, match_id: Uuid) -> watch::Receiver<ChannelState> {
        match self.subscriptions.entry(match_id) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live() {
                    debug!(match_id = %match_id, "already subscribed");
                    return occupied.get().state_rx.clone();
                }
                let (subscription, state_rx) = self.open_channel(match_id);
                let stale = occupied.insert(subscription);
                stale.handle.abort();
                info!(match_id = %match_id, "subscribed to match events");
                state_rx
            }
            Entry::Vacant(vacant) => {
                let (subscription, state_rx) = self.open_channel(match_id);
                vacant.insert(subscription);
                info!(match_id = %match_id, "subscribed to match events");
                state_rx
            }
        }
    }

    fn open_channel(&self, match_id: Uuid) -> (Subscription, watch::Receiver<ChannelState>) {
        let (adapter, state_tx, state_rx) = ChannelAdapter::new(
            match_id,
            Arc::clone(&self.connector),
            Arc::clone(&self.reconciler),
            self.reconnect_delay,
        );
        let handle = tokio::spawn(adapter.run());
        (
            Subscription {
                handle,
                state_tx,
                state_rx: state_rx.clone(),
            },
            state_rx,
        )
    }

    /// Close and discard the adapter for this match, cancelling its
    /// reconnect timer and any scheduled fetches targeting the match.
    pub fn unsubscribe(&self, match_id: Uuid) {
        if let Some((_, subscription)) = self.subscriptions.remove(&match_id) {
            subscription.handle.abort();
            let _ = subscription.state_tx.send(ChannelState::Closed);
            self.reconciler.cancel(match_id);
            info!(match_id = %match_id, "unsubscribed from match events");
        }
    }

    /// Close every open adapter. Called on process/view teardown.
    pub fn unsubscribe_all(&self) {
        let ids: Vec<Uuid> = self.subscriptions.iter().map(|e| *e.key()).collect();
        for match_id in ids {
            self.unsubscribe(match_id);
        }
    }

    pub fn is_subscribed(&self, match_id: Uuid) -> bool {
        self.subscriptions
            .get(&match_id)
            .map(|s| s.is_live())
            .unwrap_or(false)
    }
}
