//! Engine facade: wires the store, reconciler and subscriptions together
//! and owns the optimistic move submission flow

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{ApiError, HttpMatchApi, MatchServer, RejectReason};
use crate::config::Config;
use crate::game::{self, MatchSnapshot, Move, PendingMove, PlayerRef, Role, TurnStatus};
use crate::store::{MatchStore, PendingMoves};
use crate::sync::{FeedConnector, Reconciler, SseConnector, SubscriptionManager};

/// Move submission failures
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("no local snapshot for this match")]
    UnknownMatch,

    #[error("a move cannot be played right now")]
    InvalidState,

    #[error("move rejected by server: {0}")]
    Rejected(RejectReason),

    #[error(transparent)]
    Server(ApiError),
}

/// Client-side match synchronization engine.
///
/// One instance per authenticated session. The identity is supplied at
/// construction; the engine holds no ambient global state.
pub struct MatchEngine {
    identity: PlayerRef,
    server: Arc<dyn MatchServer>,
    store: Arc<MatchStore>,
    pending: Arc<PendingMoves>,
    reconciler: Arc<Reconciler>,
    subscriptions: SubscriptionManager,
    /// Guards against overlapping list refreshes
    list_refreshing: AtomicBool,
}

impl MatchEngine {
    pub fn new(config: Config, identity: PlayerRef) -> Self {
        let server: Arc<dyn MatchServer> = Arc::new(HttpMatchApi::new(&config));
        let connector: Arc<dyn FeedConnector> = Arc::new(SseConnector::new(&config));
        Self::with_parts(config, identity, server, connector)
    }

    /// Seam constructor for tests and alternative transports
    pub fn with_parts(
        config: Config,
        identity: PlayerRef,
        server: Arc<dyn MatchServer>,
        connector: Arc<dyn FeedConnector>,
    ) -> Self {
        let store = Arc::new(MatchStore::new());
        let pending = Arc::new(PendingMoves::new());
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&server),
            Arc::clone(&store),
            Arc::clone(&pending),
            config.debounce_window,
            config.settle_delay,
        ));
        let subscriptions = SubscriptionManager::new(
            connector,
            Arc::clone(&reconciler),
            config.reconnect_delay,
        );
        Self {
            identity,
            server,
            store,
            pending,
            reconciler,
            subscriptions,
            list_refreshing: AtomicBool::new(false),
        }
    }

    /// Which seat the local player occupies in a match, if any
    pub fn role_in(&self, snapshot: &MatchSnapshot) -> Option<Role> {
        if snapshot.player1.id == self.identity.id {
            Some(Role::Player1)
        } else if snapshot.player2.as_ref().map(|p| p.id) == Some(self.identity.id) {
            Some(Role::Player2)
        } else {
            None
        }
    }

    /// Whether the local player may submit a move right now
    pub fn can_play(&self, match_id: Uuid) -> bool {
        let Some(snapshot) = self.store.get(match_id) else {
            return false;
        };
        let Some(role) = self.role_in(&snapshot) else {
            return false;
        };
        game::can_play(&snapshot, role, self.pending.get(match_id).as_ref())
    }

    /// Enumerated turn state for the local player. `None` when the match is
    /// unknown locally or the local player is not a participant.
    pub fn turn_status(&self, match_id: Uuid) -> Option<TurnStatus> {
        let snapshot = self.store.get(match_id)?;
        let role = self.role_in(&snapshot)?;
        Some(game::turn_status(
            &snapshot,
            role,
            self.pending.get(match_id).as_ref(),
        ))
    }

    /// Optimistically submit a move for the current active turn.
    ///
    /// Fails fast with [`SubmitError::InvalidState`] before any network
    /// call when [`can_play`](Self::can_play) is false. A server refusal
    /// rolls the optimistic pending move back; no automatic retry is
    /// attempted.
    pub async fn submit_move(&self, match_id: Uuid, mv: Move) -> Result<(), SubmitError> {
        let snapshot = self.store.get(match_id).ok_or(SubmitError::UnknownMatch)?;
        let role = self.role_in(&snapshot).ok_or(SubmitError::InvalidState)?;
        if !game::can_play(&snapshot, role, self.pending.get(match_id).as_ref()) {
            return Err(SubmitError::InvalidState);
        }
        let active = game::active_turn(&snapshot).ok_or(SubmitError::InvalidState)?;

        self.pending.set(
            match_id,
            PendingMove {
                turn_index: active.index,
                mv,
            },
        );

        match self.server.submit_move(match_id, active.index, mv).await {
            Ok(()) => {
                info!(match_id = %match_id, turn = active.index, "move accepted");
                self.reconciler.forced_fetch(match_id).await;
                Ok(())
            }
            Err(ApiError::Rejected(reason)) => {
                warn!(match_id = %match_id, turn = active.index, reason = %reason, "move rejected");
                self.pending.clear(match_id);
                Err(SubmitError::Rejected(reason))
            }
            Err(e) => {
                warn!(match_id = %match_id, error = %e, "move submission failed");
                self.pending.clear(match_id);
                Err(SubmitError::Server(e))
            }
        }
    }

    /// Open the live event channel for a match and pull an authoritative
    /// snapshot. Returns a read-only subscription to snapshot changes.
    pub async fn view_match(&self, match_id: Uuid) -> watch::Receiver<Option<MatchSnapshot>> {
        self.subscriptions.subscribe(match_id);
        self.reconciler.forced_fetch(match_id).await;
        self.store.watch(match_id)
    }

    /// Read-only subscription to snapshot changes without opening a channel
    pub fn watch_match(&self, match_id: Uuid) -> watch::Receiver<Option<MatchSnapshot>> {
        self.store.watch(match_id)
    }

    /// Stop following a match: closes its channel and cancels its fetches
    pub fn leave_match(&self, match_id: Uuid) {
        self.subscriptions.unsubscribe(match_id);
    }

    /// Tear down every open subscription
    pub fn shutdown(&self) {
        self.subscriptions.unsubscribe_all();
    }

    pub fn get_match(&self, match_id: Uuid) -> Option<MatchSnapshot> {
        self.store.get(match_id)
    }

    /// All known match snapshots, in insertion order
    pub fn matches(&self) -> Vec<MatchSnapshot> {
        self.store.list()
    }

    /// Create a match with the local player in seat 1 and start following it
    pub async fn create_match(&self) -> Result<MatchSnapshot, ApiError> {
        let snapshot = self.server.create_match().await?;
        let match_id = snapshot.id;
        self.store.upsert(snapshot.clone());
        self.subscriptions.subscribe(match_id);
        info!(match_id = %match_id, "created match");
        Ok(snapshot)
    }

    /// Join an open match as player 2 and start following it
    pub async fn join_match(&self, match_id: Uuid) -> Result<MatchSnapshot, ApiError> {
        let snapshot = self.server.join_match(match_id).await?;
        self.store.upsert(snapshot.clone());
        self.subscriptions.subscribe(match_id);
        info!(match_id = %match_id, "joined match");
        Ok(snapshot)
    }

    /// Authoritative re-read of the full match list. Overlapping calls
    /// collapse into one request.
    pub async fn refresh_matches(&self) -> Result<(), ApiError> {
        if self.list_refreshing.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let result = self.server.list_matches().await;
        self.list_refreshing.store(false, Ordering::Release);
        for snapshot in result? {
            self.store.upsert(snapshot);
        }
        Ok(())
    }
}

impl Drop for MatchEngine {
    fn drop(&mut self) {
        self.subscriptions.unsubscribe_all();
    }
}
